use std::{sync::Arc, time::Duration};

use crate::{
    auth::TokenService,
    config::TokenConfig,
    database::Database,
    errors::Result,
    services::{
        account::AccountService, metrics::MetricsService, redis::RedisService,
        review_scheduler::ReviewScheduler, usage_limiter::UsageLimiter,
    },
    store::{Stores, WordStore},
};

pub mod auth;
pub mod health;
pub mod metrics;
pub mod review;
pub mod user;
pub mod words;

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub usage: Arc<UsageLimiter>,
    pub reviews: Arc<ReviewScheduler>,
    pub accounts: Arc<AccountService>,
    pub words: Arc<dyn WordStore>,
    pub metrics: Arc<MetricsService>,
    pub store_timeout: Duration,
    /// Present only for the Postgres/Redis backends; checked by `/ready`.
    pub database: Option<Database>,
    pub redis: Option<RedisService>,
}

impl AppState {
    pub fn new(tokens: &TokenConfig, stores: Stores, store_timeout: Duration) -> Result<Self> {
        let token_service = Arc::new(TokenService::new(
            tokens,
            stores.expiring.clone(),
            store_timeout,
        )?);

        Ok(Self {
            usage: Arc::new(UsageLimiter::new(stores.credentials.clone(), store_timeout)),
            reviews: Arc::new(ReviewScheduler::new(stores.reviews.clone(), store_timeout)),
            accounts: Arc::new(AccountService::new(
                stores.credentials.clone(),
                token_service.clone(),
                store_timeout,
            )),
            tokens: token_service,
            words: stores.words,
            metrics: Arc::new(MetricsService::new()?),
            store_timeout,
            database: None,
            redis: None,
        })
    }

    pub fn with_connections(mut self, database: Database, redis: RedisService) -> Self {
        self.database = Some(database);
        self.redis = Some(redis);
        self
    }
}
