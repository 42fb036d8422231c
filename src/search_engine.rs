use anyhow::Result;
use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::analyzer::TextAnalyzer;
use crate::data_models::Recipe;
use crate::gateway::{IdentifierBatch, SearchGateway, SearchQuery, SearchRecord, SearchResult};
use crate::store::RecipeStore;

pub fn intersect_two_postings<'a, T>(
    posting_list1: &'a [T],
    posting_list2: &'a [T],
    out: &mut Vec<T>,
) where
    T: Ord + Clone,
{
    let (mut p1i, mut p2i) = (0usize, 0usize);
    while p1i < posting_list1.len() && p2i < posting_list2.len() {
        match posting_list1[p1i].cmp(&posting_list2[p2i]) {
            std::cmp::Ordering::Equal => {
                out.push(posting_list1[p1i].clone());
                p1i += 1;
                p2i += 1;
            }
            std::cmp::Ordering::Less => p1i += 1,
            std::cmp::Ordering::Greater => p2i += 1,
        }
    }
}

struct IndexedRecipe {
    record: SearchRecord,
    terms: Vec<String>,
}

#[derive(Default)]
struct InvertedIndex {
    /// term -> sorted recipe ids
    postings: HashMap<String, Vec<String>>,
    docs: HashMap<String, IndexedRecipe>,
}

impl InvertedIndex {
    fn insert(&mut self, id: &str, record: SearchRecord, terms: Vec<String>) {
        self.remove(id);
        for term in &terms {
            let postings = self.postings.entry(term.clone()).or_default();
            if let Err(pos) = postings.binary_search_by(|p| p.as_str().cmp(id)) {
                postings.insert(pos, id.to_string());
            }
        }
        self.docs
            .insert(id.to_string(), IndexedRecipe { record, terms });
    }

    fn remove(&mut self, id: &str) -> bool {
        let Some(old) = self.docs.remove(id) else {
            return false;
        };
        for term in old.terms {
            if let Some(postings) = self.postings.get_mut(&term) {
                postings.retain(|p| p != id);
                if postings.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
        true
    }
}

/// In-process search service: an inverted index over recipe text.
///
/// Feed pages are random samples of the candidate pool, but the shuffle is seeded
/// by the query terms so consecutive pages of the same query are disjoint.
pub struct SearchEngine {
    analyzer: TextAnalyzer,
    index: RwLock<InvertedIndex>,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(TextAnalyzer::recipe_text())
    }
}

impl SearchEngine {
    pub fn new(analyzer: TextAnalyzer) -> Self {
        Self {
            analyzer,
            index: RwLock::new(InvertedIndex::default()),
        }
    }

    /// Recovers the guard from a poisoned lock; a panic mid-update leaves the
    /// index readable.
    fn read_index(&self) -> RwLockReadGuard<'_, InvertedIndex> {
        self.index.read().unwrap_or_else(|poisoned| {
            log::error!("search index lock poisoned, reading last state");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, InvertedIndex> {
        self.index.write().unwrap_or_else(|poisoned| {
            log::error!("search index lock poisoned, writing over last state");
            PoisonError::into_inner(poisoned)
        })
    }

    pub fn len(&self) -> usize {
        self.read_index().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index_recipe(&self, recipe: &Recipe) {
        let terms = self.analyzer.terms(&recipe.searchable_text());
        let record = SearchRecord {
            id: Some(recipe.id.clone()),
            title: recipe.title.clone(),
            image: (!recipe.image.is_empty()).then(|| recipe.image.clone()),
            relevance_score: None,
        };
        self.write_index().insert(&recipe.id, record, terms);
    }

    pub fn remove(&self, id: &str) -> bool {
        self.write_index().remove(id)
    }

    /// Index every recipe of `collections`. Earlier collections win on id clashes.
    pub async fn rebuild<S>(&self, store: &S, collections: &[String]) -> Result<usize>
    where
        S: RecipeStore + ?Sized,
    {
        let mut seen = HashSet::new();
        let mut indexed = 0usize;
        for collection in collections {
            for recipe in store.all_recipes(collection).await? {
                if seen.insert(recipe.id.clone()) {
                    self.index_recipe(&recipe);
                    indexed += 1;
                }
            }
        }
        log::info!("search index built with {indexed} recipes");
        Ok(indexed)
    }

    fn intersect_postings<T>(posting_lists: &[&[T]]) -> Vec<T>
    where
        T: Ord + Clone,
    {
        if posting_lists.is_empty() {
            return Vec::new();
        }
        let mut smallest_idx = 0usize;
        for (idx, pl) in posting_lists.iter().enumerate() {
            if pl.len() < posting_lists[smallest_idx].len() {
                smallest_idx = idx;
            }
        }
        let mut result: Vec<T> = posting_lists[smallest_idx].to_vec();
        let mut scratch: Vec<T> = Vec::new();
        for (idx, pl) in posting_lists.iter().enumerate() {
            if idx == smallest_idx {
                continue;
            }
            scratch.clear();
            intersect_two_postings(&result, pl, &mut scratch);
            std::mem::swap(&mut result, &mut scratch);
            if result.is_empty() {
                break;
            }
        }

        result
    }

    /// Candidate ids with a relevance score in `(0, 1]`, sorted by id.
    ///
    /// Recipes containing every query term score 1.0. When no recipe contains all
    /// of them, any recipe matching at least one term is a candidate, scored by the
    /// fraction of terms it contains.
    pub fn candidates(&self, query: &str) -> Vec<(String, f64)> {
        let terms = self.analyzer.terms(query);
        if terms.is_empty() {
            return Vec::new();
        }
        let index = self.read_index();

        let posting_lists: Vec<&[String]> = terms
            .iter()
            .map(|t| index.postings.get(t).map(|p| p.as_slice()).unwrap_or(&[]))
            .collect();

        let strict = Self::intersect_postings(&posting_lists);
        if !strict.is_empty() {
            return strict.into_iter().map(|id| (id, 1.0)).collect();
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for list in &posting_lists {
            for id in list.iter() {
                *counts.entry(id.as_str()).or_default() += 1;
            }
        }
        let mut scored: Vec<(String, f64)> = counts
            .into_iter()
            .map(|(id, n)| (id.to_string(), n as f64 / terms.len() as f64))
            .collect();
        scored.sort_by(|a, b| a.0.cmp(&b.0));
        scored
    }

    /// One page of a seeded random permutation of the candidate pool.
    pub fn page(&self, query: &str, page: u32, limit: u32) -> IdentifierBatch {
        let limit = limit.max(1);
        let mut ids: Vec<String> = self
            .candidates(query)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let total = ids.len();

        let mut rng = StdRng::seed_from_u64(self.query_seed(query));
        ids.shuffle(&mut rng);

        let start = (page as usize).saturating_mul(limit as usize).min(total);
        let end = start.saturating_add(limit as usize).min(total);
        IdentifierBatch {
            ids: ids[start..end].to_vec(),
            page,
            limit,
            total,
            has_more: end < total,
        }
    }

    /// The best `number` records, highest relevance first.
    pub fn top_records(&self, query: &str, number: usize) -> Vec<SearchRecord> {
        let mut scored = self.candidates(query);
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let index = self.read_index();
        scored
            .into_iter()
            .take(number)
            .filter_map(|(id, score)| {
                index.docs.get(&id).map(|doc| SearchRecord {
                    relevance_score: Some(score),
                    ..doc.record.clone()
                })
            })
            .collect()
    }

    fn query_seed(&self, query: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.analyzer.terms(query).hash(&mut hasher);
        hasher.finish()
    }
}

#[async_trait]
impl SearchGateway for SearchEngine {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        Ok(match query {
            SearchQuery::Page { query, page, limit } => {
                SearchResult::IdentifierBatch(self.page(query, *page, *limit))
            }
            SearchQuery::Records { query, number } => {
                SearchResult::RecordBatch(self.top_records(query, *number))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_intersect_two_postings() {
        let mut out = Vec::new();
        intersect_two_postings(&ids(&["r1", "r2", "r4"]), &ids(&["r2", "r3", "r4"]), &mut out);
        assert_eq!(out, ids(&["r2", "r4"]));

        out.clear();
        intersect_two_postings(&ids(&["a", "b"]), &ids(&["c"]), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_intersect_starts_from_smallest_list() {
        let lemon = ids(&["a", "b", "c", "d", "e"]);
        let salad = ids(&["b", "d"]);
        let basil = ids(&["b", "c", "d"]);
        let got = SearchEngine::intersect_postings(&[&lemon, &salad, &basil]);
        assert_eq!(got, ids(&["b", "d"]));

        let empty: Vec<String> = Vec::new();
        assert!(SearchEngine::intersect_postings(&[&lemon, &empty]).is_empty());
        assert!(SearchEngine::intersect_postings::<String>(&[]).is_empty());
    }

    #[test]
    fn test_poisoned_lock_keeps_indexing() {
        use crate::data_models::{Author, RecipeDraft};
        use std::sync::Arc;

        let author = Author {
            email: "cook@example.com".to_string(),
            name: "Cook".to_string(),
            image: String::new(),
        };
        let recipe = |title: &str| {
            let draft = RecipeDraft {
                title: title.to_string(),
                description: "bright".to_string(),
                ingredients: "lemon".to_string(),
                instructions: "stir".to_string(),
                ..Default::default()
            };
            Recipe::new(draft, &author)
        };

        let engine = Arc::new(SearchEngine::default());
        engine.index_recipe(&recipe("Lemon Tart"));
        let poisoner = engine.clone();
        let crashed = std::thread::spawn(move || {
            let _guard = poisoner.index.write().unwrap();
            panic!("indexer crashed");
        })
        .join();
        assert!(crashed.is_err());
        assert!(engine.index.is_poisoned());

        engine.index_recipe(&recipe("Lemon Curd"));
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.page("lemon", 0, 10).total, 2);
        assert_eq!(engine.top_records("curd", 5).len(), 1);
    }

    #[test]
    fn test_page_beyond_pool_is_empty() {
        let engine = SearchEngine::default();
        let batch = engine.page("anything", 3, 10);
        assert!(batch.ids.is_empty());
        assert_eq!(batch.total, 0);
        assert!(!batch.has_more);
    }
}
