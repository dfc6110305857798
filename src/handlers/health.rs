use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use crate::{errors::Result, handlers::AppState};

pub async fn liveness() -> Result<Json<serde_json::Value>> {
    Ok(Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Pings the backing stores. The in-process backend has nothing to ping
/// and is always ready.
pub async fn readiness(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let db_status = match &state.database {
        Some(database) => match database.ping().await {
            Ok(()) => "healthy",
            Err(e) => {
                tracing::error!("Database readiness check failed: {}", e);
                "unhealthy"
            }
        },
        None => "in-memory",
    };

    let redis_status = match &state.redis {
        Some(redis) => match redis.ping().await {
            Ok(()) => "healthy",
            Err(e) => {
                tracing::error!("Redis readiness check failed: {}", e);
                "unhealthy"
            }
        },
        None => "in-memory",
    };

    let ready = db_status != "unhealthy" && redis_status != "unhealthy";
    let (status, overall_status) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    Ok((
        status,
        Json(json!({
            "status": overall_status,
            "checks": {
                "database": db_status,
                "redis": redis_status
            },
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    ))
}
