use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::engine::GameEngine;
use crate::services::game_host::GameHost;

struct Entry<E: GameEngine> {
    host: GameHost<E>,
    last_touched: Instant,
}

/// Hosted sessions of one game mode, keyed by session id.
///
/// Every lookup refreshes the session's idle clock. `reap_idle` drops the
/// sessions nobody has touched for longer than the TTL.
pub struct SessionRegistry<E: GameEngine> {
    hosts: RwLock<HashMap<Uuid, Entry<E>>>,
}

impl<E: GameEngine> Default for SessionRegistry<E> {
    fn default() -> Self {
        Self {
            hosts: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: GameEngine> SessionRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, host: GameHost<E>) -> Uuid {
        let id = Uuid::new_v4();
        let entry = Entry {
            host,
            last_touched: Instant::now(),
        };
        self.hosts.write().await.insert(id, entry);
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<GameHost<E>> {
        let mut hosts = self.hosts.write().await;
        let entry = hosts.get_mut(id)?;
        entry.last_touched = Instant::now();
        Some(entry.host.clone())
    }

    /// Removes the registry's handle; the actor stops once in-flight
    /// requests release theirs.
    pub async fn remove(&self, id: &Uuid) -> bool {
        self.hosts.write().await.remove(id).is_some()
    }

    /// Drops sessions idle for longer than `ttl`. Returns how many went.
    pub async fn reap_idle(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut hosts = self.hosts.write().await;
        let before = hosts.len();
        hosts.retain(|id, entry| {
            let keep = now.duration_since(entry.last_touched) <= ttl;
            if !keep {
                tracing::info!("Reaping idle session: {}", id);
            }
            keep
        });
        before - hosts.len()
    }

    pub async fn len(&self) -> usize {
        self.hosts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.hosts.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{QuizEngine, QuizRules};
    use crate::services::game_host::HostServices;
    use crate::services::question_supply::StaticQuestionTable;
    use crate::services::session_recorder::InMemoryRecorder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn host() -> GameHost<QuizEngine> {
        let services = HostServices {
            supply: Arc::new(StaticQuestionTable::default()),
            recorder: Arc::new(InMemoryRecorder::new()),
            tick_interval: Duration::from_secs(1),
            recorder_timeout: Duration::from_secs(1),
        };
        GameHost::spawn(services, |scheduler| {
            QuizEngine::new(
                QuizRules::default(),
                Box::new(scheduler),
                StdRng::seed_from_u64(9),
            )
        })
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_reaped_after_ttl() {
        let registry = SessionRegistry::new();
        let stale = registry.insert(host()).await;
        let busy = registry.insert(host()).await;

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(registry.get(&busy).await.is_some());
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(registry.reap_idle(Duration::from_secs(60)).await, 1);
        assert!(registry.get(&stale).await.is_none());
        assert!(registry.get(&busy).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn reaped_session_stops_its_host() {
        let registry = SessionRegistry::new();
        let id = registry.insert(host()).await;
        let mut rx = registry.get(&id).await.unwrap().subscribe();

        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(registry.reap_idle(Duration::from_secs(60)).await, 1);

        while rx.changed().await.is_ok() {}
        assert!(registry.is_empty().await);
    }
}
