//! Text search sessions: a fresh query followed by incremental "load more" batches.

use std::collections::HashSet;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::data_models::Recipe;
use crate::gateway::{SearchGateway, SearchQuery};
use crate::pagination::LoadState;
use crate::reconciler::{FeedReconciler, resolve};
use crate::store::RecipeStore;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Query cannot be empty")]
    EmptyQuery,
    #[error("An error occurred while searching")]
    Upstream(#[source] anyhow::Error),
}

/// A batch request handed out by [`SearchSession::submit`] or [`SearchSession::begin_more`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub epoch: u64,
    pub query: String,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Newly seen records appended to the session (possibly none).
    Appended(Vec<Recipe>),
    Busy,
    Exhausted,
    /// No first page yet; more can only follow a submitted query.
    NotStarted,
    /// The query changed while the request was in flight.
    Stale,
}

pub struct SearchSession {
    query: String,
    page: u32,
    limit: u32,
    epoch: u64,
    state: LoadState,
    exhausted: bool,
    reconciler: FeedReconciler,
    items: Vec<Recipe>,
    /// Ids in `items`.
    rendered: HashSet<String>,
}

impl SearchSession {
    pub fn new(collections: Vec<String>, limit: u32) -> Self {
        Self {
            query: String::new(),
            page: 0,
            limit: limit.max(1),
            epoch: 0,
            state: LoadState::Idle,
            exhausted: false,
            reconciler: FeedReconciler::new(collections),
            items: Vec::new(),
            rendered: HashSet::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Number of batches applied for the current query.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn items(&self) -> &[Recipe] {
        &self.items
    }

    pub fn reconciler(&self) -> &FeedReconciler {
        &self.reconciler
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Start a new query: clear the feed and the seen set, restart the page counter.
    /// Any batch still in flight for the previous query becomes stale.
    pub fn submit(&mut self, query: &str) -> Result<SearchTicket, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        self.query = query.to_string();
        self.page = 0;
        self.epoch += 1;
        self.exhausted = false;
        self.items.clear();
        self.rendered.clear();
        self.reconciler.reset();
        self.state = LoadState::Loading;
        Ok(self.ticket())
    }

    /// Ask for another batch of the current query.
    pub fn begin_more(&mut self) -> Result<SearchTicket, SearchOutcome> {
        if self.state == LoadState::Loading {
            return Err(SearchOutcome::Busy);
        }
        if self.page == 0 {
            return Err(SearchOutcome::NotStarted);
        }
        if self.exhausted {
            return Err(SearchOutcome::Exhausted);
        }
        self.state = LoadState::Loading;
        Ok(self.ticket())
    }

    fn ticket(&self) -> SearchTicket {
        SearchTicket {
            epoch: self.epoch,
            query: self.query.clone(),
            page: self.page,
            limit: self.limit,
        }
    }

    fn is_current(&self, ticket: &SearchTicket) -> bool {
        ticket.epoch == self.epoch
    }

    fn fail(&mut self, ticket: &SearchTicket) {
        if self.is_current(ticket) {
            self.state = LoadState::Idle;
        }
    }

    fn finish(&mut self, ticket: &SearchTicket, records: Vec<Recipe>, has_more: bool) -> SearchOutcome {
        if !self.is_current(ticket) {
            return SearchOutcome::Stale;
        }
        self.state = LoadState::Idle;
        self.page += 1;
        if !has_more {
            self.exhausted = true;
        }
        let records: Vec<Recipe> = records
            .into_iter()
            .filter(|r| self.rendered.insert(r.id.clone()))
            .collect();
        self.items.extend(records.iter().cloned());
        SearchOutcome::Appended(records)
    }
}

/// Run the batch described by `ticket`: ask the gateway for ids, drop the ones this
/// session already tried, resolve the rest, and append them.
///
/// The session lock is released around both network steps; the epoch is checked
/// each time it is re-acquired.
pub async fn run_batch<G, S>(
    session: &Mutex<SearchSession>,
    gateway: &G,
    store: &S,
    ticket: SearchTicket,
) -> Result<SearchOutcome, SearchError>
where
    G: SearchGateway + ?Sized,
    S: RecipeStore + ?Sized,
{
    let request = SearchQuery::Page {
        query: ticket.query.clone(),
        page: ticket.page,
        limit: ticket.limit,
    };
    let result = match gateway.search(&request).await {
        Ok(result) => result,
        Err(e) => {
            log::warn!("search for {:?} failed: {:#}", ticket.query, e);
            session.lock().await.fail(&ticket);
            return Err(SearchError::Upstream(e));
        }
    };
    let has_more = result.has_more();

    let (fresh, collections) = {
        let mut guard = session.lock().await;
        if !guard.is_current(&ticket) {
            return Ok(SearchOutcome::Stale);
        }
        let fresh = guard.reconciler.claim(&result.identifiers());
        (fresh, guard.reconciler.collections().to_vec())
    };

    let records = resolve(store, &collections, &fresh).await;
    log::debug!(
        "search {:?} page {}: {} ids, {} new, {} resolved",
        ticket.query,
        ticket.page,
        result.identifiers().len(),
        fresh.len(),
        records.len()
    );

    let mut guard = session.lock().await;
    Ok(guard.finish(&ticket, records, has_more))
}

/// Submit `query` and load its first batch.
pub async fn submit_query<G, S>(
    session: &Mutex<SearchSession>,
    gateway: &G,
    store: &S,
    query: &str,
) -> Result<SearchOutcome, SearchError>
where
    G: SearchGateway + ?Sized,
    S: RecipeStore + ?Sized,
{
    let ticket = session.lock().await.submit(query)?;
    run_batch(session, gateway, store, ticket).await
}

/// Load the next batch of the current query.
pub async fn load_more<G, S>(
    session: &Mutex<SearchSession>,
    gateway: &G,
    store: &S,
) -> Result<SearchOutcome, SearchError>
where
    G: SearchGateway + ?Sized,
    S: RecipeStore + ?Sized,
{
    let ticket = match session.lock().await.begin_more() {
        Ok(ticket) => ticket,
        Err(outcome) => return Ok(outcome),
    };
    run_batch(session, gateway, store, ticket).await
}
