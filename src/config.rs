use crate::domain::record::ScoreWeights;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, ValueEnum};
use url::Url;

const MAX_SCORE: u32 = 100;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub tracking: TrackingConfig,

    #[command(flatten)]
    pub scoring: ScoringConfig,

    #[command(flatten)]
    pub analytics: AnalyticsConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "OUTREACH_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the public tracking and query API
    #[arg(long, env = "OUTREACH_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management (health) API
    #[arg(long, env = "OUTREACH_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Seconds to wait for in-flight requests after a shutdown signal
    #[arg(long, env = "OUTREACH_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct TrackingConfig {
    /// Public base URL the tracking pixel and click links are served from
    #[arg(long, env = "OUTREACH_PUBLIC_BASE_URL", default_value = "http://localhost:3000")]
    pub public_base_url: Url,

    /// Where a click without a target URL is redirected to
    #[arg(long, env = "OUTREACH_DEFAULT_LANDING_URL", default_value = "/")]
    pub default_landing_url: String,
}

#[derive(Clone, Copy, Debug, Args)]
pub struct ScoringConfig {
    /// Score added by the first open
    #[arg(long = "score-open", env = "OUTREACH_SCORE_OPEN", default_value_t = 25)]
    pub open: u32,

    /// Score added when the first click is on a meeting link
    #[arg(long = "score-meeting-click", env = "OUTREACH_SCORE_MEETING_CLICK", default_value_t = 50)]
    pub meeting_click: u32,

    /// Score added when the first click is on any other link
    #[arg(long = "score-general-click", env = "OUTREACH_SCORE_GENERAL_CLICK", default_value_t = 15)]
    pub general_click: u32,

    /// Score a conversion forces the record to
    #[arg(
        long = "score-conversion",
        env = "OUTREACH_SCORE_CONVERSION",
        default_value_t = 100,
        value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_SCORE))
    )]
    pub conversion: u32,

    /// Upper bound for open and click increments
    #[arg(
        long = "score-cap",
        env = "OUTREACH_SCORE_CAP",
        default_value_t = 100,
        value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_SCORE))
    )]
    pub cap: u32,
}

impl ScoringConfig {
    /// Checks that scores stay within `0..=cap` and the cap within `0..=100`.
    ///
    /// # Errors
    /// Returns an error if the conversion score exceeds the cap or the cap exceeds 100.
    pub fn validate(&self) -> Result<(), String> {
        if self.cap > MAX_SCORE {
            return Err(format!("score cap must be at most {MAX_SCORE}"));
        }
        if self.conversion > self.cap {
            return Err(format!("conversion score {} exceeds the score cap {}", self.conversion, self.cap));
        }
        Ok(())
    }
}

impl From<ScoringConfig> for ScoreWeights {
    fn from(config: ScoringConfig) -> Self {
        Self {
            open: config.open,
            meeting_click: config.meeting_click,
            general_click: config.general_click,
            conversion: config.conversion,
            cap: config.cap,
        }
    }
}

#[derive(Clone, Copy, Debug, Args)]
pub struct AnalyticsConfig {
    /// Number of subject lines reported as top performers
    #[arg(long, env = "OUTREACH_TOP_SUBJECTS", default_value_t = 5)]
    pub top_subjects: usize,

    /// Window used when an analytics query does not name one
    #[arg(long, env = "OUTREACH_DEFAULT_WINDOW_DAYS", default_value_t = 7)]
    pub default_window_days: u32,

    /// Largest window an analytics query may ask for
    #[arg(long, env = "OUTREACH_MAX_WINDOW_DAYS", default_value_t = 3650)]
    pub max_window_days: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP collector endpoint; traces and metrics are only exported when set
    #[arg(long, env = "OUTREACH_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long, env = "OUTREACH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    /// Parses flags and environment, exiting with a usage error if the scoring weights are inconsistent.
    pub fn load() -> Self {
        let config = Self::parse();
        if let Err(msg) = config.scoring.validate() {
            Self::command().error(ErrorKind::ValueValidation, msg).exit();
        }
        config
    }
}
