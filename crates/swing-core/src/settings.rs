use chrono::NaiveDate;
use clap::{CommandFactory, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::consistency::{ConsistencyConfig, DEFAULT_MIN_SAMPLES};
use crate::dispersion::{DEFAULT_OUTLIER_THRESHOLD, DEFAULT_X_METRIC, DEFAULT_Y_METRIC};
use crate::efficiency::{EfficiencyConfig, DEFAULT_MAX_EFFICIENCY};
use crate::error::{Result, SwingError};
use crate::filter::ShotFilter;
use crate::models::Metric;
use crate::progress::{DEFAULT_TREND_THRESHOLD, DEFAULT_WINDOW};
use crate::time_utils::TimezoneHandler;

/// Default per-session row cap.
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

const APP_DIR: &str = ".swing-monitor";

/// Root of the application's files under `base_dir`.
pub fn app_dir_in(base_dir: &Path) -> PathBuf {
    base_dir.join(APP_DIR)
}

/// `~/.swing-monitor`.
pub fn app_dir() -> PathBuf {
    app_dir_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
}

/// Report emitted on stdout.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Sessions found in the store.
    Sessions,
    /// Per-(session, club) indicator table and smash trend.
    Summary,
    Efficiency,
    Consistency,
    Progress,
    Dispersion,
}

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Launch-monitor session analytics
#[derive(Parser, Debug, Clone)]
#[command(
    name = "swing-monitor",
    about = "Launch-monitor session analytics",
    version
)]
pub struct Settings {
    /// Directory holding one CSV export per session
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Report to produce
    #[arg(long, value_enum, default_value_t = View::Sessions)]
    pub view: View,

    /// Restrict to these session ids (repeatable)
    #[arg(long = "session")]
    pub sessions: Vec<String>,

    /// Restrict to these clubs (repeatable)
    #[arg(long = "club")]
    pub clubs: Vec<String>,

    /// First shot date to include (YYYY-MM-DD, in --timezone)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last shot date to include (YYYY-MM-DD, in --timezone)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Metric for consistency and progress
    #[arg(long, value_enum, default_value_t = Metric::CarryDistance)]
    pub metric: Metric,

    /// Horizontal metric for dispersion
    #[arg(long, value_enum, default_value_t = DEFAULT_X_METRIC)]
    pub x_metric: Metric,

    /// Vertical metric for dispersion
    #[arg(long, value_enum, default_value_t = DEFAULT_Y_METRIC)]
    pub y_metric: Metric,

    /// Moving-average window in sessions
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    pub window: usize,

    /// Slope magnitude below which a trend counts as flat
    #[arg(long, default_value_t = DEFAULT_TREND_THRESHOLD)]
    pub trend_threshold: f64,

    /// Mahalanobis distance above which a shot is an outlier
    #[arg(long, default_value_t = DEFAULT_OUTLIER_THRESHOLD)]
    pub outlier_threshold: f64,

    /// Minimum values for a consistency index
    #[arg(long, default_value_t = DEFAULT_MIN_SAMPLES)]
    pub min_samples: usize,

    /// Upper clamp for smash-factor efficiency
    #[arg(long, default_value_t = DEFAULT_MAX_EFFICIENCY)]
    pub max_efficiency: f64,

    /// Maximum rows accepted per session file
    #[arg(long, default_value_t = DEFAULT_MAX_RECORDS)]
    pub max_records: usize,

    /// Timezone for timestamps without an offset (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Copy these CSV exports into the data directory before analysing
    #[arg(long, num_args = 1..)]
    pub import: Vec<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.swing-monitor/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<View>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlier_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        app_dir().join("last_used.json")
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        app_dir_in(base_dir).join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load persisted params from an explicit path.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Atomically write params, creating parent directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    pub fn clear() -> Result<()> {
        Self::clear_at(&Self::config_path())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Self {
        // Build raw ArgMatches so we can query ValueSource.
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. clap keys args by field name, not flag spelling.
        if settings.data_dir.is_none() {
            settings.data_dir = last.data_dir;
        }
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                settings.view = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "metric") {
            if let Some(v) = last.metric {
                settings.metric = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "window") {
            if let Some(v) = last.window {
                settings.window = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "trend_threshold") {
            if let Some(v) = last.trend_threshold {
                settings.trend_threshold = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "outlier_threshold") {
            if let Some(v) = last.outlier_threshold {
                settings.outlier_threshold = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }

        settings = Self::resolve_auto_values(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// Resolve `"auto"` sentinel values and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        settings.timezone = crate::time_utils::resolve_timezone_name(&settings.timezone);

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    /// Reject parameter values no analysis can use.
    pub fn validate(&self) -> Result<()> {
        if !self.trend_threshold.is_finite() || self.trend_threshold < 0.0 {
            return Err(SwingError::Config(format!(
                "--trend-threshold must be >= 0, got {}",
                self.trend_threshold
            )));
        }
        if !self.outlier_threshold.is_finite() || self.outlier_threshold < 0.0 {
            return Err(SwingError::Config(format!(
                "--outlier-threshold must be >= 0, got {}",
                self.outlier_threshold
            )));
        }
        if !self.max_efficiency.is_finite() || self.max_efficiency <= 0.0 {
            return Err(SwingError::Config(format!(
                "--max-efficiency must be > 0, got {}",
                self.max_efficiency
            )));
        }
        if self.max_records == 0 {
            return Err(SwingError::Config("--max-records must be > 0".to_string()));
        }
        if !crate::time_utils::TimezoneHandler::validate_timezone(&self.timezone) {
            return Err(SwingError::InvalidTimezone(self.timezone.clone()));
        }
        Ok(())
    }

    /// Session directory, falling back to `~/.swing-monitor/sessions`.
    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| app_dir().join("sessions"))
    }

    /// `~/.swing-monitor/clubs.json`.
    pub fn clubs_path(&self) -> PathBuf {
        app_dir().join("clubs.json")
    }

    /// Record selection described by `--session`, `--club`, `--from`, `--to`.
    /// Dates are calendar dates in `--timezone`.
    pub fn shot_filter(&self) -> ShotFilter {
        let mut filter = ShotFilter::all();
        if !self.sessions.is_empty() {
            filter = filter.sessions(self.sessions.iter().cloned());
        }
        if !self.clubs.is_empty() {
            filter = filter.clubs(&self.clubs);
        }
        if self.from.is_some() || self.to.is_some() {
            filter = filter
                .dates(self.from, self.to)
                .in_timezone(TimezoneHandler::new(&self.timezone).default_tz());
        }
        filter
    }

    pub fn efficiency_config(&self) -> EfficiencyConfig {
        EfficiencyConfig {
            max_ratio: self.max_efficiency,
        }
    }

    pub fn consistency_config(&self) -> ConsistencyConfig {
        ConsistencyConfig {
            min_samples: self.min_samples,
        }
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data_dir: s.data_dir.clone(),
            view: Some(s.view),
            metric: Some(s.metric),
            window: Some(s.window),
            trend_threshold: Some(s.trend_threshold),
            outlier_threshold: Some(s.outlier_threshold),
            timezone: Some(s.timezone.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
