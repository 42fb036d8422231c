use pinfeed::analyzer::*;

fn mk_tokens(terms: &[&str]) -> Vec<TextToken> {
    terms
        .iter()
        .enumerate()
        .map(|(pos, term)| TextToken {
            term: (*term).to_string(),
            pos,
        })
        .collect()
}

fn terms(tokens: Vec<TextToken>) -> Vec<String> {
    tokens.into_iter().map(|t| t.term).collect()
}

// CharacterFilter Tests

#[cfg(test)]
mod character_filter_tests {
    use super::*;

    mod delimiter_char_filter {
        use super::*;

        #[test]
        fn test_empty_string() {
            let filter = DelimiterCharFilter;
            assert_eq!(filter.filter("".to_string()), "");
        }

        #[test]
        fn test_ingredient_list() {
            let filter = DelimiterCharFilter;
            let result = filter.filter("flour,sugar;butter/eggs".to_string());
            assert_eq!(result, "flour sugar butter eggs");
        }

        #[test]
        fn test_ampersand_and_plus() {
            let filter = DelimiterCharFilter;
            let result = filter.filter("salt&pepper+oil|vinegar".to_string());
            assert_eq!(result.split_whitespace().count(), 4);
        }

        #[test]
        fn test_other_punctuation_untouched() {
            let filter = DelimiterCharFilter;
            let result = filter.filter("(optional) chili.".to_string());
            assert_eq!(result, "(optional) chili.");
        }
    }
}

// Tokenizer Tests

#[cfg(test)]
mod tokenizer_tests {
    use super::*;

    mod whitespace_tokenizer {
        use super::*;

        #[test]
        fn test_empty_string() {
            let tokenizer = WhiteSpaceTokenizer;
            assert!(tokenizer.tokenize("".to_string()).is_empty());
        }

        #[test]
        fn test_multiple_words() {
            let tokenizer = WhiteSpaceTokenizer;
            let result = tokenizer.tokenize("Lemon Garlic Chicken".to_string());
            assert_eq!(result, vec!["Lemon", "Garlic", "Chicken"]);
        }

        #[test]
        fn test_tabs_and_newlines() {
            let tokenizer = WhiteSpaceTokenizer;
            let result = tokenizer.tokenize("flour\n\tsugar   \r\nbutter".to_string());
            assert_eq!(result, vec!["flour", "sugar", "butter"]);
        }

        #[test]
        fn test_punctuation_preserved() {
            let tokenizer = WhiteSpaceTokenizer;
            let result = tokenizer.tokenize("Hello, world!".to_string());
            assert_eq!(result, vec!["Hello,", "world!"]);
        }

        #[test]
        fn test_unicode_text() {
            let tokenizer = WhiteSpaceTokenizer;
            let result = tokenizer.tokenize("crème brûlée".to_string());
            assert_eq!(result, vec!["crème", "brûlée"]);
        }
    }

    #[test]
    fn test_analyzer_tokenize_assigns_positions() {
        let analyzer = TextAnalyzer::recipe_text();
        let tokens = analyzer.tokenize("baked lemon tart".to_string());
        let positions: Vec<usize> = tokens.iter().map(|t| t.pos).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }
}

// TokenFilter Tests

#[cfg(test)]
mod token_filter_tests {
    use super::*;

    mod lowercase_token_filter {
        use super::*;

        #[test]
        fn test_empty_vec() {
            assert!(LowerCaseTokenFilter.filter(vec![]).is_empty());
        }

        #[test]
        fn test_mixed_case() {
            let result = LowerCaseTokenFilter.filter(mk_tokens(&["LeMoN", "GARLIC", "tart"]));
            assert_eq!(terms(result), vec!["lemon", "garlic", "tart"]);
        }

        #[test]
        fn test_preserves_positions() {
            let result = LowerCaseTokenFilter.filter(mk_tokens(&["A", "B", "C"]));
            let positions: Vec<usize> = result.iter().map(|t| t.pos).collect();
            assert_eq!(positions, vec![0, 1, 2]);
        }
    }

    mod stopword_token_filter {
        use super::*;

        #[test]
        fn test_removes_common_stopwords() {
            let result = StopWordTokenFilter.filter(mk_tokens(&["the", "chicken", "and", "the", "rice"]));
            assert_eq!(terms(result), vec!["chicken", "rice"]);
        }

        #[test]
        fn test_all_stopwords() {
            let result = StopWordTokenFilter.filter(mk_tokens(&["the", "and", "of", "is"]));
            assert!(result.is_empty());
        }

        #[test]
        fn test_case_sensitive() {
            // Runs after lowercasing in the pipeline, so capitalized words pass through
            let result = StopWordTokenFilter.filter(mk_tokens(&["The", "salad"]));
            assert_eq!(terms(result), vec!["The", "salad"]);
        }

        #[test]
        fn test_keeps_original_positions() {
            let result = StopWordTokenFilter.filter(mk_tokens(&["the", "lemon"]));
            assert_eq!(result[0].pos, 1);
        }
    }

    mod porter_stemmer_token_filter {
        use super::*;

        #[test]
        fn test_plural_to_singular() {
            let result = PorterStemmerTokenFilter.filter(mk_tokens(&["chickens", "lemons", "cats"]));
            assert_eq!(terms(result), vec!["chicken", "lemon", "cat"]);
        }

        #[test]
        fn test_verb_forms() {
            let result = PorterStemmerTokenFilter.filter(mk_tokens(&["running", "roasted"]));
            assert_eq!(terms(result), vec!["run", "roast"]);
        }

        #[test]
        fn test_ies_suffix() {
            let result = PorterStemmerTokenFilter.filter(mk_tokens(&["ponies"]));
            assert_eq!(terms(result), vec!["poni"]);
        }

        #[test]
        fn test_ational_suffix() {
            let result = PorterStemmerTokenFilter.filter(mk_tokens(&["relational"]));
            assert_eq!(terms(result), vec!["relat"]);
        }
    }

    mod punctuation_strip_filter {
        use super::*;

        #[test]
        fn test_strips_surrounding_punctuation() {
            let filter = PunctuationStripFilter::default();
            let result = filter.filter(mk_tokens(&["(optional)", "salt.", "\"fresh\""]));
            assert_eq!(terms(result), vec!["optional", "salt", "fresh"]);
        }

        #[test]
        fn test_drops_short_and_empty_tokens() {
            let filter = PunctuationStripFilter::default();
            let result = filter.filter(mk_tokens(&["!!", "a", "--", "ok"]));
            assert_eq!(terms(result), vec!["ok"]);
        }

        #[test]
        fn test_custom_min_length() {
            let filter = PunctuationStripFilter::new(4);
            let result = filter.filter(mk_tokens(&["egg", "eggs", "oil"]));
            assert_eq!(terms(result), vec!["eggs"]);
        }

        #[test]
        fn test_inner_punctuation_kept() {
            let filter = PunctuationStripFilter::default();
            let result = filter.filter(mk_tokens(&["stir-fry"]));
            assert_eq!(terms(result), vec!["stir-fry"]);
        }
    }

    mod numeric_token_filter {
        use super::*;

        #[test]
        fn test_drops_quantities() {
            let result = NumericTokenFilter.filter(mk_tokens(&["2", "250", "1.5", "1/2"]));
            assert!(result.is_empty());
        }

        #[test]
        fn test_keeps_units_and_words() {
            let result = NumericTokenFilter.filter(mk_tokens(&["250g", "flour", "2"]));
            assert_eq!(terms(result), vec!["250g", "flour"]);
        }
    }

    #[test]
    fn test_chained_filters_lowercase_then_stopword() {
        let tokens = mk_tokens(&["The", "Chicken", "AND", "Rice"]);
        let tokens = LowerCaseTokenFilter.filter(tokens);
        let tokens = StopWordTokenFilter.filter(tokens);
        assert_eq!(terms(tokens), vec!["chicken", "rice"]);
    }
}

// Full pipeline

#[test]
fn test_full_pipeline_ingredient_list() {
    let analyzer = TextAnalyzer::recipe_text();
    let got = terms(analyzer.analyze("2 Lemons, 3 chickens; salt & pepper"));
    assert_eq!(got, vec!["lemon", "chicken", "salt", "pepper"]);
}

#[test]
fn test_terms_are_distinct_in_first_seen_order() {
    let analyzer = TextAnalyzer::recipe_text();
    let got = analyzer.terms("Lemon chicken with lemons and more CHICKENS");
    assert_eq!(&got[..2], &["lemon".to_string(), "chicken".to_string()]);
    assert_eq!(got.iter().filter(|t| *t == "lemon").count(), 1);
}

#[test]
fn test_query_and_document_share_terms() {
    let analyzer = TextAnalyzer::recipe_text();
    let doc = analyzer.terms("Roasted lemon chicken with rice");
    for term in analyzer.terms("roast chickens") {
        assert!(doc.contains(&term), "missing {term}");
    }
}

#[test]
fn test_empty_and_stopword_only_input() {
    let analyzer = TextAnalyzer::recipe_text();
    assert!(analyzer.terms("").is_empty());
    assert!(analyzer.terms("the and of").is_empty());
}
