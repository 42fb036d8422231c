use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use nanoid::nanoid;
use tokio::sync::Mutex;

struct Entry<T> {
    session: Arc<Mutex<T>>,
    last_access: Instant,
}

/// Live sessions addressed by an opaque handle.
pub struct SessionRegistry<T> {
    sessions: DashMap<String, Entry<T>>,
}

impl<T> Default for SessionRegistry<T> {
    fn default() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }
}

impl<T> SessionRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, session: T) -> (String, Arc<Mutex<T>>) {
        let id = nanoid!();
        let session = Arc::new(Mutex::new(session));
        self.sessions.insert(
            id.clone(),
            Entry {
                session: session.clone(),
                last_access: Instant::now(),
            },
        );
        (id, session)
    }

    /// Look up a session and mark it as used.
    pub fn get(&self, id: &str) -> Option<Arc<Mutex<T>>> {
        self.sessions.get_mut(id).map(|mut entry| {
            entry.last_access = Instant::now();
            entry.session.clone()
        })
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Drop sessions untouched for longer than `ttl`. Returns how many went.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        self.sweep(Instant::now(), ttl)
    }

    fn sweep(&self, now: Instant, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| now.saturating_duration_since(entry.last_access) <= ttl);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
