use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::errors::AppError;

/// Subscription tier of a user. Each tier carries a daily request quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
}

pub const FREE_PLAN_USAGE: i64 = 10;
pub const PRO_PLAN_USAGE: i64 = 1000;

impl Plan {
    pub fn daily_limit(self) -> i64 {
        match self {
            Plan::Free => FREE_PLAN_USAGE,
            Plan::Pro => PRO_PLAN_USAGE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }

    pub fn upgrade(self, target: Plan) -> Result<Plan, AppError> {
        match (self, target) {
            (Plan::Free, Plan::Pro) => Ok(target),
            _ => Err(AppError::Validation(format!(
                "invalid upgrade path from {} to {}",
                self, target
            ))),
        }
    }

    pub fn downgrade(self, target: Plan) -> Result<Plan, AppError> {
        match (self, target) {
            (Plan::Pro, Plan::Free) => Ok(target),
            _ => Err(AppError::Validation(format!(
                "invalid downgrade path from {} to {}",
                self, target
            ))),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            other => Err(AppError::Validation(format!("unknown plan: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanChange {
    Upgrade,
    Downgrade,
}

#[derive(Debug, Deserialize)]
pub struct ChangePlanRequest {
    pub change: PlanChange,
    pub plan: Plan,
}
