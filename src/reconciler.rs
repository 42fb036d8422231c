//! Merges search result ids with full recipe documents.

use std::collections::HashSet;

use futures::future::join_all;

use crate::data_models::Recipe;
use crate::store::RecipeStore;

/// Per-session dedup state for "load more" over search results.
///
/// An id is attempted at most once per session: once claimed it stays in the seen
/// set whether or not any collection had it.
#[derive(Debug, Clone)]
pub struct FeedReconciler {
    collections: Vec<String>,
    seen: HashSet<String>,
}

impl FeedReconciler {
    /// `collections` are tried in order for every id.
    pub fn new(collections: Vec<String>) -> Self {
        Self {
            collections,
            seen: HashSet::new(),
        }
    }

    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    pub fn seen(&self) -> &HashSet<String> {
        &self.seen
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn reset(&mut self) {
        self.seen.clear();
    }

    /// Returns the ids of `ids` not attempted before, in order, without
    /// duplicates, and marks them as attempted.
    pub fn claim(&mut self, ids: &[String]) -> Vec<String> {
        ids.iter()
            .filter(|id| self.seen.insert((*id).clone()))
            .cloned()
            .collect()
    }

    /// Claims `ids` and resolves the fresh ones against the store.
    pub async fn reconcile<S>(&mut self, store: &S, ids: &[String]) -> Vec<Recipe>
    where
        S: RecipeStore + ?Sized,
    {
        let fresh = self.claim(ids);
        resolve(store, &self.collections, &fresh).await
    }
}

/// Looks every id up concurrently and waits for all of them. The output keeps the
/// order of `ids`; ids found in no collection are dropped.
pub async fn resolve<S>(store: &S, collections: &[String], ids: &[String]) -> Vec<Recipe>
where
    S: RecipeStore + ?Sized,
{
    let lookups = ids.iter().map(|id| lookup(store, collections, id));
    join_all(lookups).await.into_iter().flatten().collect()
}

/// First hit across `collections`. A failing collection counts as a miss.
async fn lookup<S>(store: &S, collections: &[String], id: &str) -> Option<Recipe>
where
    S: RecipeStore + ?Sized,
{
    for collection in collections {
        match store.find_recipe(collection, id).await {
            Ok(Some(recipe)) => return Some(recipe),
            Ok(None) => {}
            Err(e) => {
                log::warn!("lookup of {id} in {collection} failed: {:#}", e);
            }
        }
    }
    log::debug!("recipe {id} not found in any collection");
    None
}
