use serde::Serialize;

use super::Plan;

/// Today's count and lifetime total of the caller's API key.
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub plan: Plan,
    pub daily_limit: i64,
    pub today: i64,
    pub total: i64,
}
