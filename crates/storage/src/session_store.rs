use std::sync::Arc;

use tracing::warn;
use vote_core::model::{ClientId, Rating, VoteState};

use crate::repository::{KeyValueStore, StorageError};

/// Key holding the persisted client identifier.
pub const CLIENT_ID_KEY: &str = "userId";
/// Key holding the JSON-encoded vote vector.
pub const VOTES_KEY: &str = "userVotes";

/// Typed access to the two persisted session entries.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Load the stored client identifier, if any.
    ///
    /// A blank stored value is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_client_id(&self) -> Result<Option<ClientId>, StorageError> {
        let raw = self.kv.get(CLIENT_ID_KEY).await?;
        Ok(raw.and_then(|value| value.parse().ok()))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    pub async fn save_client_id(&self, id: &ClientId) -> Result<(), StorageError> {
        self.kv.set(CLIENT_ID_KEY, id.as_str()).await
    }

    /// Load the stored vote vector.
    ///
    /// Missing data or a value that is not an array yields an empty vector.
    /// Slots that are not a valid rating are reset to unset; the rest are kept.
    /// Reconciliation pads the result to the dataset length afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_votes(&self) -> Result<VoteState, StorageError> {
        let Some(raw) = self.kv.get(VOTES_KEY).await? else {
            return Ok(VoteState::default());
        };

        Ok(decode_votes(&raw))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if encoding or storing fails.
    pub async fn save_votes(&self, votes: &VoteState) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(votes)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.kv.set(VOTES_KEY, &encoded).await
    }

    /// Forget both the client identifier and the votes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.kv.remove(VOTES_KEY).await?;
        self.kv.remove(CLIENT_ID_KEY).await
    }
}

fn decode_votes(raw: &str) -> VoteState {
    let cells = match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(cells) => cells,
        Err(err) => {
            warn!(error = %err, "discarding unreadable stored votes");
            return VoteState::default();
        }
    };

    let mut reset = 0_usize;
    let slots = cells
        .iter()
        .map(|cell| {
            if cell.is_null() {
                return None;
            }
            let rating = cell
                .as_u64()
                .and_then(|value| u8::try_from(value).ok())
                .and_then(|value| Rating::new(value).ok());
            if rating.is_none() {
                reset += 1;
            }
            rating
        })
        .collect();

    if reset > 0 {
        warn!(reset, total = cells.len(), "reset unreadable stored vote slots");
    }
    VoteState::from_slots(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStore;
    use vote_core::model::PhraseIndex;

    fn store() -> (InMemoryStore, SessionStore) {
        let kv = InMemoryStore::new();
        let session = SessionStore::new(Arc::new(kv.clone()));
        (kv, session)
    }

    #[tokio::test]
    async fn votes_persist_as_json_array() {
        let (kv, session) = store();
        let votes = VoteState::from_slots(vec![Some(Rating::new(3).unwrap()), None]);

        session.save_votes(&votes).await.unwrap();

        assert_eq!(
            kv.get(VOTES_KEY).await.unwrap().as_deref(),
            Some("[3,null]")
        );
        let loaded = session.load_votes().await.unwrap();
        assert_eq!(loaded.get(PhraseIndex::new(0)), Some(Rating::new(3).unwrap()));
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn corrupt_votes_load_as_empty() {
        let (kv, session) = store();
        kv.set(VOTES_KEY, "{not json").await.unwrap();
        assert!(session.load_votes().await.unwrap().is_empty());

        kv.set(VOTES_KEY, "{\"a\":1}").await.unwrap();
        assert!(session.load_votes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_slots_are_reset_and_good_ones_kept() {
        let (kv, session) = store();
        kv.set(VOTES_KEY, "[1,7,null,\"x\",-2,4]").await.unwrap();

        let votes = session.load_votes().await.unwrap();

        assert_eq!(votes.len(), 6);
        assert_eq!(votes.get(PhraseIndex::new(0)), Some(Rating::new(1).unwrap()));
        assert_eq!(votes.get(PhraseIndex::new(5)), Some(Rating::new(4).unwrap()));
        for index in 1..5 {
            assert!(!votes.is_set(PhraseIndex::new(index)));
        }
        assert_eq!(votes.to_wire(), "1,0,0,0,0,4");
    }

    #[tokio::test]
    async fn client_id_round_trip_and_clear() {
        let (_kv, session) = store();
        assert!(session.load_client_id().await.unwrap().is_none());

        let id: ClientId = "user_1_abcdefghi".parse().unwrap();
        session.save_client_id(&id).await.unwrap();
        session
            .save_votes(&VoteState::unset(1))
            .await
            .unwrap();
        assert_eq!(session.load_client_id().await.unwrap(), Some(id));

        session.clear().await.unwrap();
        assert!(session.load_client_id().await.unwrap().is_none());
        assert!(session.load_votes().await.unwrap().is_empty());
    }
}
