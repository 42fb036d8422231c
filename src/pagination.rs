//! Cursor pagination state machine shared by the feed and profile views.

use serde::{Deserialize, Serialize};

use crate::data_models::Recipe;

/// Opaque resumption token: the id of the last document of the previous page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor(String);

impl Cursor {
    pub fn after(recipe: &Recipe) -> Self {
        Cursor(recipe.id.clone())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
}

/// A page request handed out by [`PaginationController::begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    pub epoch: u64,
    pub after: Option<Cursor>,
    pub limit: i64,
}

/// Why a load signal produced no request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// A request is already in flight.
    Busy,
    /// The last page came back empty.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The ticket belongs to an earlier epoch; the response must be dropped.
    Stale,
}

/// `Idle -> Loading -> Idle`, at most one request in flight.
///
/// Every reset bumps the epoch; responses carrying an older epoch are rejected by
/// [`PaginationController::complete`].
#[derive(Debug, Clone)]
pub struct PaginationController {
    state: LoadState,
    cursor: Option<Cursor>,
    epoch: u64,
    page_size: i64,
    exhausted: bool,
}

impl PaginationController {
    pub fn new(page_size: i64) -> Self {
        Self {
            state: LoadState::Idle,
            cursor: None,
            epoch: 0,
            page_size: page_size.max(1),
            exhausted: false,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Handle a load signal. Signals while loading are dropped.
    pub fn begin(&mut self) -> Result<PageTicket, Refusal> {
        if self.state == LoadState::Loading {
            return Err(Refusal::Busy);
        }
        if self.exhausted {
            return Err(Refusal::Exhausted);
        }
        self.state = LoadState::Loading;
        Ok(PageTicket {
            epoch: self.epoch,
            after: self.cursor.clone(),
            limit: self.page_size,
        })
    }

    /// Apply a page fetched with `ticket`.
    pub fn complete(&mut self, ticket: &PageTicket, page: &[Recipe]) -> Completion {
        if ticket.epoch != self.epoch {
            return Completion::Stale;
        }
        self.state = LoadState::Idle;
        match page.last() {
            Some(last) => self.cursor = Some(Cursor::after(last)),
            None => self.exhausted = true,
        }
        Completion::Applied
    }

    /// The request for `ticket` failed; the cursor stays where it was.
    pub fn fail(&mut self, ticket: &PageTicket) -> Completion {
        if ticket.epoch != self.epoch {
            return Completion::Stale;
        }
        self.state = LoadState::Idle;
        Completion::Applied
    }

    /// Forget the cursor and any in-flight request.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.state = LoadState::Idle;
        self.cursor = None;
        self.exhausted = false;
    }
}
