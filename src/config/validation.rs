//! Trading configuration validation
//!
//! Checks every constrained field and returns the full violation list, so
//! an operator sees all problems in one pass instead of fixing them one
//! save at a time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::schema::{
    parse_clock, TraderConfig, TradingConfig, MIN_MAX_PAIRS, NUMERIC_FIELDS,
};

/// A single field-level constraint violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted field path, e.g. `options.min_dte`
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, returning every violation found.
///
/// An empty list means the configuration is acceptable.
pub fn validate(cfg: &TraderConfig) -> Vec<Violation> {
    let mut violations = Vec::new();

    for spec in NUMERIC_FIELDS {
        let value = spec.value(cfg);
        if let Some(min) = spec.min {
            if value < min {
                violations.push(Violation::new(
                    spec.path(),
                    format!("{} is below minimum {}", value, min),
                ));
            }
        }
        if let Some(max) = spec.max {
            if value > max {
                violations.push(Violation::new(
                    spec.path(),
                    format!("{} exceeds maximum {}", value, max),
                ));
            }
        }
    }

    for (min_path, max_path, get) in MIN_MAX_PAIRS {
        let (min, max) = get(cfg);
        if min > max {
            violations.push(Violation::new(
                *min_path,
                format!("{} must not exceed {} ({} > {})", min_path, max_path, min, max),
            ));
        }
    }

    if !TradingConfig::MODES.contains(&cfg.trading.mode.as_str()) {
        violations.push(Violation::new(
            "trading.mode",
            format!(
                "'{}' is not one of {:?}",
                cfg.trading.mode,
                TradingConfig::MODES
            ),
        ));
    }

    for (path, value) in [
        ("schedule.start", &cfg.schedule.start),
        ("schedule.stop", &cfg.schedule.stop),
    ] {
        if parse_clock(value).is_none() {
            violations.push(Violation::new(
                path,
                format!("'{}' is not a valid HH:MM 24-hour clock time", value),
            ));
        }
    }

    if cfg.connection.host.trim().is_empty() {
        violations.push(Violation::new("connection.host", "must not be empty"));
    }

    violations
}
