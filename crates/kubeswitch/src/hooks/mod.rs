//! Hook scheduling
//!
//! Hooks are user-defined maintenance commands with a minimum re-run
//! interval. Per-hook run state is persisted in the state directory so that
//! separate invocations agree on when a hook last ran.
//!
//! # State machine
//!
//! ```text
//!            elapsed >= interval
//!   Idle ─────────────────────────▶ Due
//!    │                               │ selected
//!    │ force                         ▼
//!    └──────────────────────────▶ Running ──▶ Succeeded ─┐
//!                                    │                   │ lastRunAt persisted
//!                                    └──────▶ Failed ────┴──▶ Idle
//! ```

pub mod executor;
pub mod scheduler;
pub mod state;

pub use executor::{CommandExecutor, HookExecutionError, HookExecutor};
pub use scheduler::{HookRun, HookScheduler};
pub use state::{HookStateError, HookStateStore};

use crate::error::ConfigurationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Kill a hook that runs longer than this unless configured otherwise.
pub const DEFAULT_HOOK_TIMEOUT_SECS: u64 = 600;

/// Hook entry of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub hook_type: HookType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub execution: ExecutionSpec,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookType {
    #[default]
    Executable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSpec {
    /// Missing means "every invocation".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<IntervalValue>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ExecutionSpec {
    fn default() -> Self {
        Self {
            interval: None,
            timeout_seconds: DEFAULT_HOOK_TIMEOUT_SECS,
        }
    }
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_HOOK_TIMEOUT_SECS
}

/// `interval: 3600` or `interval: 6h`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalValue {
    Seconds(u64),
    Text(String),
}

/// A validated hook ready to schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    pub name: String,
    pub program: PathBuf,
    pub arguments: Vec<String>,
    pub interval_seconds: u64,
    pub timeout: Duration,
}

impl HookDefinition {
    pub fn resolve(&self) -> Result<Hook, ConfigurationError> {
        let invalid = |message: String| ConfigurationError::InvalidHook {
            name: self.name.clone(),
            message,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".to_string()));
        }

        let program = match self.hook_type {
            HookType::Executable => self
                .path
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .ok_or_else(|| invalid("executable hooks need a 'path'".to_string()))?,
        };

        let interval_seconds = match &self.execution.interval {
            None => 0,
            Some(IntervalValue::Seconds(secs)) => *secs,
            Some(IntervalValue::Text(text)) => parse_interval(text).map_err(invalid)?,
        };

        if self.execution.timeout_seconds == 0 {
            return Err(invalid("timeoutSeconds must be positive".to_string()));
        }

        Ok(Hook {
            name: self.name.clone(),
            program,
            arguments: self.arguments.clone(),
            interval_seconds,
            timeout: Duration::from_secs(self.execution.timeout_seconds),
        })
    }
}

/// Parse `90`, `45s`, `30m`, `6h`, `1d` or combinations such as `1h30m`.
pub fn parse_interval(text: &str) -> Result<u64, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("interval is empty".to_string());
    }
    if let Ok(secs) = text.parse::<u64>() {
        return Ok(secs);
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for ch in text.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let unit = match ch.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            other => return Err(format!("invalid interval '{}': unknown unit '{}'", text, other)),
        };
        let value: u64 = digits
            .parse()
            .map_err(|_| format!("invalid interval '{}': expected a number before '{}'", text, ch))?;
        total = value
            .checked_mul(unit)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| format!("invalid interval '{}': too large", text))?;
        digits.clear();
    }

    if !digits.is_empty() {
        return Err(format!("invalid interval '{}': missing unit after {}", text, digits));
    }
    Ok(total)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookOutcome {
    Succeeded,
    Failed,
}

/// Persisted run state of one hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookRecord {
    pub name: String,
    pub interval_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<HookOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl HookRecord {
    pub fn new(name: impl Into<String>, interval_seconds: u64) -> Self {
        Self {
            name: name.into(),
            interval_seconds,
            last_run_at: None,
            last_outcome: None,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Idle,
    Due,
    Running,
    Succeeded,
    Failed,
}

impl HookState {
    /// Idle or Due, from the last run and the configured interval.
    pub fn evaluate(
        last_run_at: Option<DateTime<Utc>>,
        interval_seconds: u64,
        now: DateTime<Utc>,
    ) -> Self {
        match last_run_at {
            None => HookState::Due,
            Some(last) => {
                let elapsed = now.signed_duration_since(last).num_seconds();
                if elapsed >= 0 && elapsed as u64 >= interval_seconds {
                    HookState::Due
                } else {
                    HookState::Idle
                }
            }
        }
    }

    /// Due -> Running; with `force`, Idle -> Running as well.
    pub fn start(self, force: bool) -> Option<Self> {
        match (self, force) {
            (HookState::Due, _) | (HookState::Idle, true) => Some(HookState::Running),
            _ => None,
        }
    }

    /// Running -> Succeeded | Failed
    pub fn finish(self, success: bool) -> Self {
        match (self, success) {
            (HookState::Running, true) => HookState::Succeeded,
            (HookState::Running, false) => HookState::Failed,
            (other, _) => other,
        }
    }

    /// Succeeded | Failed -> Idle, once `lastRunAt` is persisted.
    pub fn settle(self) -> Self {
        match self {
            HookState::Succeeded | HookState::Failed => HookState::Idle,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookState::Idle => "idle",
            HookState::Due => "due",
            HookState::Running => "running",
            HookState::Succeeded => "succeeded",
            HookState::Failed => "failed",
        }
    }
}
