use porter_stemmer::stem;
use std::collections::HashSet;
use std::sync::OnceLock;

static STOP_WORDS: OnceLock<HashSet<String>> = OnceLock::new();

fn stop_words_set() -> &'static HashSet<String> {
    STOP_WORDS.get_or_init(|| {
        stop_words::get(stop_words::LANGUAGE::English)
            .into_iter()
            .map(|s| String::from(*s))
            .collect()
    })
}

/// A character filter receives the original text and can transform it by adding,
/// removing, or changing characters before tokenization.
pub trait CharacterFilter: Send + Sync {
    fn filter(&self, text: String) -> String;
}

/// Turns list delimiters into whitespace so "salt,pepper;oil" yields three words.
#[derive(Debug, Default)]
pub struct DelimiterCharFilter;

impl CharacterFilter for DelimiterCharFilter {
    fn filter(&self, text: String) -> String {
        text.chars()
            .map(|c| match c {
                ',' | ';' | '/' | '|' | '+' | '&' => ' ',
                other => other,
            })
            .collect()
    }
}

/// A tokenizer breaks text up into individual tokens (usually individual words).
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: String) -> Vec<String>;
}

pub struct WhiteSpaceTokenizer;

impl Tokenizer for WhiteSpaceTokenizer {
    fn tokenize(&self, text: String) -> Vec<String> {
        text.split_whitespace().map(str::to_owned).collect()
    }
}

/// A token filter receives the token stream and may add, remove, or change tokens.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken>;
}

pub struct LowerCaseTokenFilter;

impl TokenFilter for LowerCaseTokenFilter {
    fn filter(&self, mut tokens: Vec<TextToken>) -> Vec<TextToken> {
        for token in tokens.iter_mut() {
            token.term = token.term.to_lowercase();
        }
        tokens
    }
}

pub struct StopWordTokenFilter;

impl TokenFilter for StopWordTokenFilter {
    fn filter(&self, mut tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens.retain(|token| !stop_words_set().contains(&token.term));
        tokens
    }
}

pub struct PorterStemmerTokenFilter;

impl TokenFilter for PorterStemmerTokenFilter {
    fn filter(&self, mut tokens: Vec<TextToken>) -> Vec<TextToken> {
        for token in tokens.iter_mut() {
            token.term = stem(&token.term);
        }
        tokens
    }
}

/// Strips punctuation from tokens and filters out tokens that become empty or are too short
pub struct PunctuationStripFilter {
    min_length: usize,
}

impl PunctuationStripFilter {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }
}

impl Default for PunctuationStripFilter {
    fn default() -> Self {
        Self { min_length: 2 }
    }
}

impl TokenFilter for PunctuationStripFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .filter_map(|mut token| {
                let trimmed: String = token
                    .term
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_string();

                if trimmed.len() >= self.min_length && trimmed.chars().any(|c| c.is_alphanumeric())
                {
                    token.term = trimmed;
                    Some(token)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Filters out tokens that are purely numeric (quantities like "2", "250", "1.5")
pub struct NumericTokenFilter;

impl TokenFilter for NumericTokenFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .filter(|token| token.term.chars().any(|c| c.is_alphabetic()))
            .collect()
    }
}

/// Pure text analysis pipeline - no async, no DB, just text transformations
pub struct TextAnalyzer {
    char_filters: Vec<Box<dyn CharacterFilter>>,
    tokenizer: Box<dyn Tokenizer>,
    token_filters: Vec<Box<dyn TokenFilter>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextToken {
    pub term: String,
    pub pos: usize,
}

impl std::ops::Deref for TextToken {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.term
    }
}

impl TextAnalyzer {
    pub fn new(
        char_filters: Vec<Box<dyn CharacterFilter>>,
        tokenizer: Box<dyn Tokenizer>,
        token_filters: Vec<Box<dyn TokenFilter>>,
    ) -> Self {
        Self {
            char_filters,
            tokenizer,
            token_filters,
        }
    }

    /// The pipeline used for recipe text and search queries alike.
    pub fn recipe_text() -> Self {
        Self::new(
            vec![Box::new(DelimiterCharFilter)],
            Box::new(WhiteSpaceTokenizer),
            vec![
                Box::new(PunctuationStripFilter::default()),
                Box::new(LowerCaseTokenFilter),
                Box::new(NumericTokenFilter),
                Box::new(StopWordTokenFilter),
                Box::new(PorterStemmerTokenFilter),
            ],
        )
    }

    pub fn char_filter(&self, content: String) -> String {
        self.char_filters
            .iter()
            .fold(content, |text, filter| filter.filter(text))
    }

    pub fn tokenize(&self, content: String) -> Vec<TextToken> {
        self.tokenizer
            .tokenize(content)
            .into_iter()
            .enumerate()
            .map(|(pos, term)| TextToken { term, pos })
            .collect()
    }

    pub fn token_filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        self.token_filters
            .iter()
            .fold(tokens, |tokens, filter| filter.filter(tokens))
    }

    /// Run the whole pipeline over `raw_content`.
    pub fn analyze(&self, raw_content: &str) -> Vec<TextToken> {
        let content = self.char_filter(raw_content.to_owned());
        self.token_filter(self.tokenize(content))
    }

    /// Distinct terms of `raw_content`, in first-occurrence order.
    pub fn terms(&self, raw_content: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.analyze(raw_content)
            .into_iter()
            .filter(|t| seen.insert(t.term.clone()))
            .map(|t| t.term)
            .collect()
    }
}
