//! Session settings.
//!
//! Settings are fixed when a [`crate::session::Session`] is created. They can
//! be deserialized from JSON (missing fields take defaults) or read from the
//! environment:
//! - `PATHCHECK_FIX`: apply auto-fixes (default: "false")
//! - `PATHCHECK_THRESHOLD`: lowest severity recorded (default: "warning")
//! - `PATHCHECK_PROFILE`: severity profile name (default: none)
//! - `PATHCHECK_MAX_ERRORS`: not-fixed error cutoff, 0 = unlimited (default: "0")
//! - `PATHCHECK_WORKERS`: node-phase worker permits (default: "8")

use serde::{Deserialize, Serialize};

use crate::error::CheckError;
use crate::problem::{Severity, UnknownSeverity};

fn default_threshold() -> Severity {
    Severity::Warning
}

fn default_workers() -> usize {
    8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether `fixed` flags sent by rules and registry reports are kept.
    /// Normalizer repairs and merges are recorded fixed regardless.
    #[serde(default)]
    pub fix: bool,
    /// Reports below this severity are dropped.
    #[serde(default = "default_threshold")]
    pub threshold: Severity,
    #[serde(default)]
    pub profile: Option<String>,
    /// Once this many not-fixed error cases exist, no new rule invocations
    /// start and rules stop recording not-fixed errors. 0 means unlimited.
    #[serde(default)]
    pub max_errors: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub description: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            fix: false,
            threshold: default_threshold(),
            profile: None,
            max_errors: 0,
            workers: default_workers(),
            description: String::new(),
        }
    }
}

impl Settings {
    /// Reads settings from `PATHCHECK_*` environment variables.
    pub fn from_env() -> Result<Self, CheckError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for
    /// variables that are unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CheckError> {
        let mut settings = Settings::default();

        if let Some(raw) = lookup("PATHCHECK_FIX") {
            settings.fix = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => return Err(invalid("PATHCHECK_FIX", format!("not a boolean: '{other}'"))),
            };
        }
        if let Some(raw) = lookup("PATHCHECK_THRESHOLD") {
            settings.threshold = raw
                .parse()
                .map_err(|e: UnknownSeverity| invalid("PATHCHECK_THRESHOLD", e.to_string()))?;
        }
        if let Some(raw) = lookup("PATHCHECK_PROFILE") {
            let raw = raw.trim();
            settings.profile = (!raw.is_empty()).then(|| raw.to_string());
        }
        if let Some(raw) = lookup("PATHCHECK_MAX_ERRORS") {
            settings.max_errors = raw
                .trim()
                .parse()
                .map_err(|e| invalid("PATHCHECK_MAX_ERRORS", format!("{e}")))?;
        }
        if let Some(raw) = lookup("PATHCHECK_WORKERS") {
            settings.workers = raw
                .trim()
                .parse()
                .map_err(|e| invalid("PATHCHECK_WORKERS", format!("{e}")))?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from JSON text.
    pub fn from_json(text: &str) -> Result<Self, CheckError> {
        let settings: Settings =
            serde_json::from_str(text).map_err(|e| invalid("settings", e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), CheckError> {
        if self.workers == 0 {
            return Err(invalid("workers", "must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn invalid(name: &str, reason: String) -> CheckError {
    CheckError::InvalidSettings {
        name: name.to_string(),
        reason,
    }
}
