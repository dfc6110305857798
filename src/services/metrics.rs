use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::errors::{AppError, Result};

pub struct MetricsService {
    registry: Registry,
    tokens_issued: IntCounter,
    token_rejections: IntCounterVec,
    metered_requests: IntCounter,
    quota_denials: IntCounter,
    review_actions: IntCounterVec,
}

impl MetricsService {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("dictionary".to_string()), None)
            .map_err(metrics_error)?;

        let tokens_issued = IntCounter::new("tokens_issued_total", "Token pairs issued")
            .map_err(metrics_error)?;
        let token_rejections = IntCounterVec::new(
            Opts::new("token_rejections_total", "Rejected bearer tokens"),
            &["reason"],
        )
        .map_err(metrics_error)?;
        let metered_requests =
            IntCounter::new("metered_requests_total", "Requests that passed the usage gate")
                .map_err(metrics_error)?;
        let quota_denials = IntCounter::new("quota_denials_total", "Requests over the daily quota")
            .map_err(metrics_error)?;
        let review_actions = IntCounterVec::new(
            Opts::new("review_actions_total", "Applied review actions"),
            &["action"],
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(tokens_issued.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(token_rejections.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(metered_requests.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(quota_denials.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(review_actions.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            tokens_issued,
            token_rejections,
            metered_requests,
            quota_denials,
            review_actions,
        })
    }

    pub fn record_tokens_issued(&self) {
        self.tokens_issued.inc();
    }

    pub fn record_token_rejection(&self, error: &AppError) {
        self.token_rejections.with_label_values(&[error.kind()]).inc();
    }

    pub fn record_metered_request(&self) {
        self.metered_requests.inc();
    }

    pub fn record_quota_denial(&self) {
        self.quota_denials.inc();
    }

    pub fn record_review_action(&self, action: &str) {
        self.review_actions.with_label_values(&[action]).inc();
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;

        String::from_utf8(buffer).map_err(|e| AppError::Internal(e.into()))
    }
}

fn metrics_error(err: prometheus::Error) -> AppError {
    AppError::Internal(anyhow::Error::new(err).context("metrics registry"))
}
