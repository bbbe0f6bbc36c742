//! Trading configuration schema
//!
//! The nested record persisted as `config.toml` and shared with the managed
//! services. Unknown fields are ignored on load so older orchestrators can
//! read configs written by newer services. Every section carries serde
//! defaults so a partial file still loads.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Root trading configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TraderConfig {
    /// Broker connection parameters
    pub connection: ConnectionConfig,
    /// Trading execution limits
    pub trading: TradingConfig,
    /// Option contract filter thresholds
    pub options: OptionsConfig,
    /// Symbol universe filters
    pub universe: UniverseConfig,
    /// Trading hours schedule
    pub schedule: ScheduleConfig,
    /// Alert thresholds and channels
    pub alerts: AlertsConfig,
}

/// Broker connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub client_id: u32,
    pub read_only: bool,
    pub account: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7497,
            client_id: 1,
            read_only: false,
            account: String::new(),
        }
    }
}

/// Trading execution limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Execution mode: "paper" or "live"
    pub mode: String,
    pub max_positions: u32,
    pub max_daily_trades: u32,
    /// Fraction of equity risked per trade (0, 0.5]
    pub risk_per_trade: f64,
}

impl TradingConfig {
    /// Declared value set for `mode`
    pub const MODES: [&'static str; 2] = ["paper", "live"];
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            mode: "paper".to_string(),
            max_positions: 5,
            max_daily_trades: 3,
            risk_per_trade: 0.02,
        }
    }
}

/// Option contract filter thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// Minimum days to expiry; must not exceed `max_dte`
    pub min_dte: u32,
    pub max_dte: u32,
    /// Minimum absolute delta; must not exceed `max_delta`
    pub min_delta: f64,
    pub max_delta: f64,
    pub min_open_interest: u32,
    pub max_bid_ask_spread_pct: f64,
    /// IV rank band; `min_iv_rank` must not exceed `max_iv_rank`
    pub min_iv_rank: f64,
    pub max_iv_rank: f64,
    pub min_reward_risk: f64,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            min_dte: 7,
            max_dte: 45,
            min_delta: 0.25,
            max_delta: 0.45,
            min_open_interest: 100,
            max_bid_ask_spread_pct: 5.0,
            min_iv_rank: 25.0,
            max_iv_rank: 75.0,
            min_reward_risk: 1.0,
        }
    }
}

/// Symbol universe filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    pub min_market_cap: u64,
    pub min_price: f64,
    pub min_volume: u64,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            min_market_cap: 500_000_000,
            min_price: 10.0,
            min_volume: 500_000,
        }
    }
}

/// Trading hours schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Window start, "HH:MM" 24-hour clock
    pub start: String,
    /// Window stop, "HH:MM" 24-hour clock
    pub stop: String,
    /// Carried for the managed services; the orchestrator compares naive
    /// local time
    pub timezone: String,
    pub weekend_trading: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start: "09:30".to_string(),
            stop: "16:00".to_string(),
            timezone: "America/New_York".to_string(),
            weekend_trading: false,
        }
    }
}

impl ScheduleConfig {
    /// Whether the given local weekday/time falls inside the trading window.
    ///
    /// A stop earlier than the start wraps past midnight. Unparseable
    /// clock strings yield `false`; validation reports them separately.
    pub fn contains(&self, weekday: Weekday, time: NaiveTime) -> bool {
        if !self.weekend_trading && matches!(weekday, Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let (Some(start), Some(stop)) = (parse_clock(&self.start), parse_clock(&self.stop)) else {
            return false;
        };
        if start <= stop {
            time >= start && time < stop
        } else {
            time >= start || time < stop
        }
    }
}

/// Alert thresholds and notification channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub max_drawdown_pct: f64,
    pub max_error_rate: f64,
    pub email_enabled: bool,
    pub email_to: String,
    pub slack_enabled: bool,
    pub slack_webhook_url: String,
    pub alert_on_trade: bool,
    pub alert_on_error: bool,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            max_drawdown_pct: 10.0,
            max_error_rate: 0.05,
            email_enabled: false,
            email_to: String::new(),
            slack_enabled: false,
            slack_webhook_url: String::new(),
            alert_on_trade: true,
            alert_on_error: true,
        }
    }
}

/// Parse an "HH:MM" 24-hour clock string
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

/// Declared metadata for a constrained numeric field.
///
/// The validation sweep and external presentation layers (dynamic forms,
/// CLI hints) both read this table, so shape and checks cannot drift apart.
pub struct FieldSpec {
    pub section: &'static str,
    pub key: &'static str,
    /// Inclusive lower bound
    pub min: Option<f64>,
    /// Inclusive upper bound
    pub max: Option<f64>,
    pub(crate) get: fn(&TraderConfig) -> f64,
}

impl FieldSpec {
    /// Dotted field path, e.g. `options.min_dte`
    pub fn path(&self) -> String {
        format!("{}.{}", self.section, self.key)
    }

    /// Current value of this field in `cfg`
    pub fn value(&self, cfg: &TraderConfig) -> f64 {
        (self.get)(cfg)
    }
}

/// Every constrained numeric field of [`TraderConfig`]
pub const NUMERIC_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        section: "connection",
        key: "port",
        min: Some(1.0),
        max: Some(65535.0),
        get: |c| c.connection.port as f64,
    },
    FieldSpec {
        section: "trading",
        key: "max_positions",
        min: Some(1.0),
        max: Some(100.0),
        get: |c| c.trading.max_positions as f64,
    },
    FieldSpec {
        section: "trading",
        key: "max_daily_trades",
        min: Some(1.0),
        max: Some(100.0),
        get: |c| c.trading.max_daily_trades as f64,
    },
    FieldSpec {
        section: "trading",
        key: "risk_per_trade",
        min: Some(0.0001),
        max: Some(0.5),
        get: |c| c.trading.risk_per_trade,
    },
    FieldSpec {
        section: "options",
        key: "min_dte",
        min: Some(0.0),
        max: Some(365.0),
        get: |c| c.options.min_dte as f64,
    },
    FieldSpec {
        section: "options",
        key: "max_dte",
        min: Some(0.0),
        max: Some(365.0),
        get: |c| c.options.max_dte as f64,
    },
    FieldSpec {
        section: "options",
        key: "min_delta",
        min: Some(0.0),
        max: Some(1.0),
        get: |c| c.options.min_delta,
    },
    FieldSpec {
        section: "options",
        key: "max_delta",
        min: Some(0.0),
        max: Some(1.0),
        get: |c| c.options.max_delta,
    },
    FieldSpec {
        section: "options",
        key: "min_open_interest",
        min: Some(0.0),
        max: None,
        get: |c| c.options.min_open_interest as f64,
    },
    FieldSpec {
        section: "options",
        key: "max_bid_ask_spread_pct",
        min: Some(0.0),
        max: Some(100.0),
        get: |c| c.options.max_bid_ask_spread_pct,
    },
    FieldSpec {
        section: "options",
        key: "min_iv_rank",
        min: Some(0.0),
        max: Some(100.0),
        get: |c| c.options.min_iv_rank,
    },
    FieldSpec {
        section: "options",
        key: "max_iv_rank",
        min: Some(0.0),
        max: Some(100.0),
        get: |c| c.options.max_iv_rank,
    },
    FieldSpec {
        section: "options",
        key: "min_reward_risk",
        min: Some(0.0),
        max: None,
        get: |c| c.options.min_reward_risk,
    },
    FieldSpec {
        section: "universe",
        key: "min_market_cap",
        min: Some(0.0),
        max: None,
        get: |c| c.universe.min_market_cap as f64,
    },
    FieldSpec {
        section: "universe",
        key: "min_price",
        min: Some(0.0),
        max: None,
        get: |c| c.universe.min_price,
    },
    FieldSpec {
        section: "universe",
        key: "min_volume",
        min: Some(0.0),
        max: None,
        get: |c| c.universe.min_volume as f64,
    },
    FieldSpec {
        section: "alerts",
        key: "max_drawdown_pct",
        min: Some(0.0),
        max: Some(100.0),
        get: |c| c.alerts.max_drawdown_pct,
    },
    FieldSpec {
        section: "alerts",
        key: "max_error_rate",
        min: Some(0.0),
        max: Some(1.0),
        get: |c| c.alerts.max_error_rate,
    },
];

/// Cross-field min/max pairs: (min path, max path, accessors)
pub(crate) const MIN_MAX_PAIRS: &[(&str, &str, fn(&TraderConfig) -> (f64, f64))] = &[
    ("options.min_dte", "options.max_dte", |c| {
        (c.options.min_dte as f64, c.options.max_dte as f64)
    }),
    ("options.min_delta", "options.max_delta", |c| {
        (c.options.min_delta, c.options.max_delta)
    }),
    ("options.min_iv_rank", "options.max_iv_rank", |c| {
        (c.options.min_iv_rank, c.options.max_iv_rank)
    }),
];
