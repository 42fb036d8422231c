use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::assistant::CompletionClient;
use crate::config::CONFIG;
use crate::db::{Database, MongoStore};
use crate::feed::FeedSession;
use crate::gateway::{HttpSearchGateway, SearchGateway};
use crate::openai::{OpenAiCompletionClient, OpenAiConfig};
use crate::search::SearchSession;
use crate::search_engine::SearchEngine;
use crate::session::SessionRegistry;
use crate::store::{DocumentStore, MemoryStore};

/// Shared by every request handler.
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    /// In-process index; answers `/search` and stays current with recipe writes.
    pub engine: Arc<SearchEngine>,
    /// Where search sessions and the assistant send their queries.
    pub search: Arc<dyn SearchGateway>,
    pub completion: Arc<dyn CompletionClient>,
    pub collections: Vec<String>,
    pub page_size: i64,
    pub session_ttl: Duration,
    pub feeds: SessionRegistry<FeedSession>,
    pub searches: SessionRegistry<SearchSession>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        engine: Arc<SearchEngine>,
        search: Arc<dyn SearchGateway>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            store,
            engine,
            search,
            completion,
            collections: CONFIG.recipe_collections(),
            page_size: CONFIG.page_size,
            session_ttl: Duration::from_secs(CONFIG.session_ttl_secs.unsigned_abs()),
            feeds: SessionRegistry::new(),
            searches: SessionRegistry::new(),
        }
    }

    pub fn with_collections(mut self, collections: Vec<String>) -> Self {
        self.collections = collections;
        self
    }

    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }

    /// Drop feed and search sessions idle for longer than `session_ttl`.
    pub fn evict_idle_sessions(&self) -> usize {
        let evicted =
            self.feeds.evict_idle(self.session_ttl) + self.searches.evict_idle(self.session_ttl);
        if evicted > 0 {
            log::info!("evicted {evicted} idle sessions");
        }
        evicted
    }

    /// Sweep idle sessions in the background until the state is dropped.
    pub fn spawn_session_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::downgrade(self);
        let period = (self.session_ttl / 2).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(state) = state.upgrade() else {
                    break;
                };
                state.evict_idle_sessions();
            }
        })
    }

    /// The collection feeds page through.
    pub fn primary_collection(&self) -> &str {
        self.collections.first().map(String::as_str).unwrap_or_default()
    }

    /// Build the state from `CONFIG`. `memory` swaps MongoDB for the in-memory store.
    pub async fn from_config(memory: bool) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = if memory {
            log::info!("using in-memory document store");
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(MongoStore::new(Database::from_config().await?))
        };

        let engine = Arc::new(SearchEngine::default());
        let collections = CONFIG.recipe_collections();
        if let Err(e) = engine.rebuild(&*store, &collections).await {
            log::warn!("search index rebuild failed: {:#}", e);
        }

        let search: Arc<dyn SearchGateway> = match &CONFIG.search_api_url {
            Some(url) => {
                log::info!("search queries go to {url}");
                Arc::new(HttpSearchGateway::new(url)?) as Arc<dyn SearchGateway>
            }
            None => engine.clone() as Arc<dyn SearchGateway>,
        };
        if CONFIG.openai_api_key.is_none() {
            log::warn!("OPENAI_API_KEY is not set; assistant requests will fail");
        }
        let completion = Arc::new(OpenAiCompletionClient::new(OpenAiConfig::from_config())?);

        Ok(Self::new(store, engine, search, completion))
    }
}
