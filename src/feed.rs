//! Home and profile feeds: cursor pages over the primary recipe collection.

use std::collections::HashSet;

use tokio::sync::Mutex;

use crate::data_models::Recipe;
use crate::pagination::{Completion, PageTicket, PaginationController, Refusal};
use crate::store::{PageQuery, RecipeStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    /// Every recipe in the collection.
    All,
    /// One author's recipes, by email.
    Author(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The new page, already appended to the session.
    Loaded(Vec<Recipe>),
    Busy,
    Exhausted,
    /// The session was reset while the request was in flight.
    Stale,
}

pub struct FeedSession {
    collection: String,
    scope: FeedScope,
    controller: PaginationController,
    items: Vec<Recipe>,
    /// Ids in `items`.
    rendered: HashSet<String>,
}

impl FeedSession {
    pub fn new(collection: String, scope: FeedScope, page_size: i64) -> Self {
        Self {
            collection,
            scope,
            controller: PaginationController::new(page_size),
            items: Vec::new(),
            rendered: HashSet::new(),
        }
    }

    pub fn items(&self) -> &[Recipe] {
        &self.items
    }

    pub fn controller(&self) -> &PaginationController {
        &self.controller
    }

    /// Start over from the first page.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.items.clear();
        self.rendered.clear();
    }

    fn page_query(&self, ticket: &PageTicket) -> PageQuery {
        PageQuery {
            limit: ticket.limit,
            after: ticket.after.as_ref().map(|c| c.as_str().to_string()),
            author: match &self.scope {
                FeedScope::All => None,
                FeedScope::Author(email) => Some(email.clone()),
            },
        }
    }

    fn apply(&mut self, ticket: &PageTicket, page: Vec<Recipe>) -> LoadOutcome {
        match self.controller.complete(ticket, &page) {
            Completion::Stale => LoadOutcome::Stale,
            Completion::Applied => {
                let page: Vec<Recipe> = page
                    .into_iter()
                    .filter(|r| self.rendered.insert(r.id.clone()))
                    .collect();
                self.items.extend(page.iter().cloned());
                LoadOutcome::Loaded(page)
            }
        }
    }
}

/// Handle one "bottom of the feed is visible" signal.
///
/// The session lock is only held to change state, never across the store call, so
/// a second signal arriving mid-request sees `Loading` and is dropped.
pub async fn load_next<S>(session: &Mutex<FeedSession>, store: &S) -> anyhow::Result<LoadOutcome>
where
    S: RecipeStore + ?Sized,
{
    let (ticket, collection, query) = {
        let mut guard = session.lock().await;
        let ticket = match guard.controller.begin() {
            Ok(ticket) => ticket,
            Err(Refusal::Busy) => return Ok(LoadOutcome::Busy),
            Err(Refusal::Exhausted) => return Ok(LoadOutcome::Exhausted),
        };
        let query = guard.page_query(&ticket);
        (ticket, guard.collection.clone(), query)
    };

    match store.recipe_page(&collection, &query).await {
        Ok(page) => {
            let mut guard = session.lock().await;
            Ok(guard.apply(&ticket, page))
        }
        Err(e) => {
            log::warn!("feed page from {collection} failed: {:#}", e);
            session.lock().await.controller.fail(&ticket);
            Err(e)
        }
    }
}
