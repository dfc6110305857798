#![allow(dead_code)]

use base64::{engine::general_purpose, Engine as _};
use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use dictionary_api_server::{
    auth::TokenService,
    config::TokenConfig,
    handlers::AppState,
    models::Word,
    services::account::AccountService,
    store::{MemoryExpiringStore, MemoryStore, Stores},
};

pub const STORE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

pub const RUN_NOUN_ID: Uuid = Uuid::from_u128(0x5eed_0000_0000_0000_0000_0000_0000_0001);
pub const RUN_VERB_ID: Uuid = Uuid::from_u128(0x5eed_0000_0000_0000_0000_0000_0000_0002);

fn encoded(pem: &str) -> String {
    general_purpose::STANDARD.encode(pem)
}

pub fn token_config() -> TokenConfig {
    TokenConfig {
        access_private_key: encoded(include_str!("../fixtures/access_private.pem")),
        access_public_key: encoded(include_str!("../fixtures/access_public.pem")),
        access_token_ttl: Duration::hours(1),
        refresh_private_key: encoded(include_str!("../fixtures/refresh_private.pem")),
        refresh_public_key: encoded(include_str!("../fixtures/refresh_public.pem")),
        refresh_token_ttl: Duration::hours(168),
    }
}

/// Memory-backed stores with a handle kept on the record store so tests can
/// seed dictionary entries.
pub fn memory_stores() -> (Stores, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let stores = Stores {
        credentials: store.clone(),
        reviews: store.clone(),
        expiring: Arc::new(MemoryExpiringStore::new()),
        words: store.clone(),
    };
    (stores, store)
}

/// Token and account services over the given stores.
pub fn account_services(stores: &Stores) -> (Arc<TokenService>, AccountService) {
    let tokens = TokenService::new(&token_config(), stores.expiring.clone(), STORE_TIMEOUT)
        .expect("Failed to build token service");
    let tokens = Arc::new(tokens);
    let accounts = AccountService::new(stores.credentials.clone(), tokens.clone(), STORE_TIMEOUT);
    (tokens, accounts)
}

fn word(id: Uuid, spelling: &str, part_of_speech: &str, definition: &str) -> Word {
    Word {
        id,
        word: spelling.to_string(),
        part_of_speech: part_of_speech.to_string(),
        data: serde_json::json!({ "definitions": [definition] }),
    }
}

pub async fn test_state() -> AppState {
    let (stores, store) = memory_stores();
    store
        .insert_word(word(
            Uuid::new_v4(),
            "serendipity",
            "noun",
            "the occurrence of events by chance in a happy way",
        ))
        .await;
    store
        .insert_word(word(RUN_NOUN_ID, "run", "noun", "an act of running"))
        .await;
    store
        .insert_word(word(RUN_VERB_ID, "run", "verb", "move at a speed faster than a walk"))
        .await;

    AppState::new(&token_config(), stores, STORE_TIMEOUT).expect("Failed to build app state")
}
