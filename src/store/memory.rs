use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::{collections::HashMap, time::Duration};
use tokio::{sync::Mutex, time::Instant};
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    models::{ApiKey, Plan, ReviewState, User, Word},
    store::{CredentialStore, ExpiringStore, ReplaceOutcome, ReviewStore, WordStore},
};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    api_keys: HashMap<String, ApiKey>,
    daily_usage: HashMap<(String, NaiveDate), i64>,
    reviews: HashMap<Uuid, ReviewState>,
    words: HashMap<Uuid, Word>,
}

/// In-process record store. One lock guards all tables, so each trait
/// method is a single atomic step, like a single statement against Postgres.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

/// Entries served by `STORE_BACKEND=memory`, which has no dictionary import.
const SAMPLE_WORDS: &[(&str, &str, &str)] = &[
    ("run", "noun", "an act or spell of running"),
    ("run", "verb", "move at a speed faster than a walk"),
    ("serendipity", "noun", "the occurrence of events by chance in a happy way"),
    ("lexicon", "noun", "the vocabulary of a person, language, or branch of knowledge"),
    ("ephemeral", "adjective", "lasting for a very short time"),
];

pub fn sample_words() -> Vec<Word> {
    SAMPLE_WORDS
        .iter()
        .map(|(word, part_of_speech, definition)| Word {
            id: Uuid::new_v4(),
            word: word.to_string(),
            part_of_speech: part_of_speech.to_string(),
            data: serde_json::json!({ "definitions": [definition] }),
        })
        .collect()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_words(words: impl IntoIterator<Item = Word>) -> Self {
        let state = MemoryState {
            words: words.into_iter().map(|word| (word.id, word)).collect(),
            ..MemoryState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub async fn insert_word(&self, word: Word) {
        let mut state = self.state.lock().await;
        state.words.insert(word.id, word);
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, email: &str, password_hash: &str, plan: Plan) -> Result<User> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == email) {
            return Err(AppError::Conflict("email already registered".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            plan,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn set_plan(&self, id: Uuid, plan: Plan) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.users.get_mut(&id) {
            Some(user) => {
                user.plan = plan;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_api_key(&self, api_key: &ApiKey) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.api_keys.contains_key(&api_key.key)
            || state.api_keys.values().any(|k| k.owner_id == api_key.owner_id)
        {
            return Err(AppError::Conflict("api key already exists".to_string()));
        }

        state.api_keys.insert(api_key.key.clone(), api_key.clone());
        Ok(())
    }

    async fn find_api_key(&self, key: &str) -> Result<Option<ApiKey>> {
        Ok(self.state.lock().await.api_keys.get(key).cloned())
    }

    async fn find_api_key_by_owner(&self, owner_id: Uuid) -> Result<Option<ApiKey>> {
        let state = self.state.lock().await;
        Ok(state.api_keys.values().find(|k| k.owner_id == owner_id).cloned())
    }

    async fn delete_api_key(&self, owner_id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        let before = state.api_keys.len();
        state.api_keys.retain(|_, k| k.owner_id != owner_id);
        Ok(state.api_keys.len() < before)
    }

    async fn increment_daily_usage(&self, key: &str, date: NaiveDate) -> Result<i64> {
        let mut state = self.state.lock().await;
        let count = state
            .daily_usage
            .entry((key.to_string(), date))
            .or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn increment_total_usage(&self, key: &str) -> Result<Option<i64>> {
        let mut state = self.state.lock().await;
        Ok(state.api_keys.get_mut(key).map(|k| {
            k.total_usage += 1;
            k.total_usage
        }))
    }

    async fn daily_usage(&self, key: &str, date: NaiveDate) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state
            .daily_usage
            .get(&(key.to_string(), date))
            .copied()
            .unwrap_or(0))
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn find_or_create(&self, initial: &ReviewState) -> Result<ReviewState> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .reviews
            .values()
            .find(|r| r.owner_id == initial.owner_id && r.word_id == initial.word_id)
        {
            return Ok(existing.clone());
        }

        state.reviews.insert(initial.id, initial.clone());
        Ok(initial.clone())
    }

    async fn find(&self, owner_id: Uuid, word_id: Uuid) -> Result<Option<ReviewState>> {
        let state = self.state.lock().await;
        Ok(state
            .reviews
            .values()
            .find(|r| r.owner_id == owner_id && r.word_id == word_id)
            .cloned())
    }

    async fn replace(&self, review: &ReviewState) -> Result<ReplaceOutcome> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.reviews.get_mut(&review.id) else {
            return Ok(ReplaceOutcome::NotFound);
        };

        if stored.version != review.version {
            return Ok(ReplaceOutcome::Conflict);
        }

        *stored = ReviewState {
            version: review.version + 1,
            ..review.clone()
        };
        Ok(ReplaceOutcome::Applied(stored.clone()))
    }

    async fn list_due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<ReviewState>> {
        let state = self.state.lock().await;
        let mut due: Vec<ReviewState> = state
            .reviews
            .values()
            .filter(|r| r.owner_id == owner_id && r.next_repeat <= now)
            .cloned()
            .collect();
        due.sort_by_key(|r| r.next_repeat);
        Ok(due)
    }
}

#[async_trait]
impl WordStore for MemoryStore {
    async fn find_word(&self, word: &str, part_of_speech: Option<&str>) -> Result<Option<Word>> {
        let state = self.state.lock().await;
        Ok(state
            .words
            .values()
            .filter(|w| w.word == word)
            .filter(|w| part_of_speech.map_or(true, |pos| w.part_of_speech == pos))
            .min_by(|a, b| (&a.part_of_speech, a.id).cmp(&(&b.part_of_speech, b.id)))
            .cloned())
    }

    async fn find_word_by_id(&self, id: Uuid) -> Result<Option<Word>> {
        Ok(self.state.lock().await.words.get(&id).cloned())
    }
}

/// In-process TTL map. Expiry follows the tokio clock, so paused-time tests
/// can advance past a TTL without sleeping.
#[derive(Default)]
pub struct MemoryExpiringStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryExpiringStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExpiringStore for MemoryExpiringStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        if let Some((value, expires_at)) = entries.get(key) {
            if *expires_at > Instant::now() {
                return Ok(Some(value.clone()));
            }
            entries.remove(key);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        Ok(match entries.remove(key) {
            Some((_, expires_at)) => expires_at > Instant::now(),
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expiring_entries_disappear_after_ttl() {
        let store = MemoryExpiringStore::new();
        store.set("refresh:abc", "u1", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.get("refresh:abc").await.unwrap().as_deref(), Some("u1"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(store.get("refresh:abc").await.unwrap(), None);
        assert!(!store.delete("refresh:abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_api_key_unique_per_owner() {
        let store = MemoryStore::new();
        let owner_id = Uuid::new_v4();
        let key = ApiKey {
            key: "oxf_first".to_string(),
            owner_id,
            name: "first".to_string(),
            total_usage: 0,
            created_at: Utc::now(),
        };
        store.create_api_key(&key).await.unwrap();

        let second = ApiKey {
            key: "oxf_second".to_string(),
            ..key.clone()
        };
        assert!(matches!(
            store.create_api_key(&second).await,
            Err(AppError::Conflict(_))
        ));
    }

    fn entry(word: &str, part_of_speech: &str) -> Word {
        Word {
            id: Uuid::new_v4(),
            word: word.to_string(),
            part_of_speech: part_of_speech.to_string(),
            data: serde_json::json!({ "definitions": [] }),
        }
    }

    #[tokio::test]
    async fn test_word_entries_per_part_of_speech() {
        let store = MemoryStore::new();
        let noun = entry("run", "noun");
        let verb = entry("run", "verb");
        store.insert_word(noun.clone()).await;
        store.insert_word(verb.clone()).await;

        let found = store.find_word("run", Some("noun")).await.unwrap().unwrap();
        assert_eq!(found.id, noun.id);
        let found = store.find_word("run", Some("verb")).await.unwrap().unwrap();
        assert_eq!(found.id, verb.id);

        let any = store.find_word("run", None).await.unwrap().unwrap();
        assert_eq!(any.part_of_speech, "noun");
        assert!(store.find_word("run", Some("adjective")).await.unwrap().is_none());

        let by_id = store.find_word_by_id(verb.id).await.unwrap().unwrap();
        assert_eq!(by_id.part_of_speech, "verb");
        assert!(store.find_word_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_detects_stale_version() {
        let store = MemoryStore::new();
        let initial = ReviewState::initial(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        let stored = store.find_or_create(&initial).await.unwrap();

        let first = ReviewState { level: 1, ..stored.clone() };
        let applied = match store.replace(&first).await.unwrap() {
            ReplaceOutcome::Applied(state) => state,
            other => panic!("expected applied, got {:?}", other),
        };
        assert_eq!(applied.version, stored.version + 1);

        // Same base version again: someone else already won.
        let stale = ReviewState { level: 2, ..stored.clone() };
        assert_eq!(store.replace(&stale).await.unwrap(), ReplaceOutcome::Conflict);

        let missing = ReviewState::initial(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        assert_eq!(store.replace(&missing).await.unwrap(), ReplaceOutcome::NotFound);
    }
}
