use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};
use teloxide::dispatching::dialogue::{ErasedStorage, Storage};
use teloxide::types::ChatId;

use super::scoring::ScoreState;

/// Saved progress is only resumed within this window (one hour).
pub const FRESHNESS_WINDOW_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct PersistedState {
    #[serde(flatten)]
    state: ScoreState,
    timestamp: i64,
}

/// In-progress quiz state, one slot per chat, stored as JSON text so it can
/// outlive the in-memory session.
///
/// Every failure is soft: a slot that cannot be read, parsed or is too old is
/// reported as absent and logged.
#[derive(Clone)]
pub struct QuizStateStore {
    storage: Arc<ErasedStorage<String>>,
}

impl QuizStateStore {
    pub fn new(storage: Arc<ErasedStorage<String>>) -> Self {
        Self { storage }
    }

    pub async fn save(&self, chat: ChatId, state: &ScoreState) {
        self.save_at(chat, state, Utc::now().timestamp_millis()).await
    }

    pub async fn save_at(&self, chat: ChatId, state: &ScoreState, timestamp: i64) {
        let record = PersistedState {
            state: state.clone(),
            timestamp,
        };
        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(err) => {
                warn!("Failed to serialize quiz state for {}: {}", chat.0, err);
                return;
            }
        };

        if let Err(err) = self.storage.clone().update_dialogue(chat, json).await {
            warn!("Failed to save quiz state for {}: {}", chat.0, err);
        }
    }

    pub async fn load(&self, chat: ChatId) -> Option<ScoreState> {
        self.load_at(chat, Utc::now().timestamp_millis()).await
    }

    pub async fn load_at(&self, chat: ChatId, now: i64) -> Option<ScoreState> {
        let saved = match self.storage.clone().get_dialogue(chat).await {
            Ok(Some(saved)) => saved,
            Ok(None) => return None,
            Err(err) => {
                warn!("Failed to load quiz state for {}: {}", chat.0, err);
                return None;
            }
        };

        let record: PersistedState = match serde_json::from_str(&saved) {
            Ok(record) => record,
            Err(err) => {
                warn!("Failed to parse quiz state for {}: {}", chat.0, err);
                return None;
            }
        };

        if now - record.timestamp >= FRESHNESS_WINDOW_MS {
            debug!("Ignoring stale quiz state for {}", chat.0);
            return None;
        }
        Some(record.state)
    }

    pub async fn clear(&self, chat: ChatId) {
        // Removing a missing slot errors in teloxide storages; clearing is idempotent here
        if let Err(err) = self.storage.clone().remove_dialogue(chat).await {
            debug!("Nothing to clear for {}: {}", chat.0, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::CategoryId;
    use teloxide::dispatching::dialogue::InMemStorage;

    const CHAT: ChatId = ChatId(42);
    const NOW: i64 = 1_700_000_000_000;

    fn store() -> (QuizStateStore, Arc<ErasedStorage<String>>) {
        let storage = InMemStorage::<String>::new().erase();
        (QuizStateStore::new(storage.clone()), storage)
    }

    fn played(answers: &[CategoryId]) -> ScoreState {
        let mut state = ScoreState::new();
        for category in answers {
            state.record_answer(*category);
        }
        state
    }

    #[tokio::test]
    async fn saved_state_loads_back() {
        let (store, _) = store();
        let state = played(&[CategoryId::Explorer, CategoryId::Villager]);

        store.save_at(CHAT, &state, NOW).await;

        assert_eq!(store.load_at(CHAT, NOW + 1_000).await, Some(state));
    }

    #[tokio::test]
    async fn record_uses_the_documented_layout() {
        let (store, storage) = store();
        store.save_at(CHAT, &played(&[CategoryId::TownPlanner]), NOW).await;

        let raw = storage.get_dialogue(CHAT).await.unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["currentQuestionIndex"], 1);
        assert_eq!(json["scores"]["townPlanner"], 1);
        assert_eq!(json["timestamp"], NOW);
    }

    #[tokio::test]
    async fn state_older_than_an_hour_is_absent() {
        let (store, _) = store();
        store.save_at(CHAT, &played(&[CategoryId::Explorer]), NOW).await;

        assert!(store.load_at(CHAT, NOW + FRESHNESS_WINDOW_MS - 1).await.is_some());
        assert!(store.load_at(CHAT, NOW + FRESHNESS_WINDOW_MS).await.is_none());
        assert!(store.load_at(CHAT, NOW + 2 * FRESHNESS_WINDOW_MS).await.is_none());
    }

    #[tokio::test]
    async fn malformed_state_is_absent() {
        let (store, storage) = store();
        for garbage in ["not json", "{}", r#"{"currentQuestionIndex": -1, "scores": {}, "timestamp": 0}"#] {
            storage.clone().update_dialogue(CHAT, garbage.to_string()).await.unwrap();
            assert!(store.load_at(CHAT, NOW).await.is_none(), "{garbage}");
        }
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let (store, _) = store();
        store.save_at(CHAT, &ScoreState::new(), NOW).await;

        store.clear(CHAT).await;
        store.clear(CHAT).await;

        assert!(store.load_at(CHAT, NOW).await.is_none());
    }

    #[tokio::test]
    async fn slots_are_per_chat() {
        let (store, _) = store();
        store.save_at(CHAT, &played(&[CategoryId::Villager]), NOW).await;

        assert!(store.load_at(ChatId(7), NOW).await.is_none());
        store.clear(ChatId(7)).await;
        assert!(store.load_at(CHAT, NOW).await.is_some());
    }
}
