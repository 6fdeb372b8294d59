//! Run configuration: abstraction levels, log verbosity and scan knobs.

use serde::{Deserialize, Serialize};

use crate::search::{Cost, SearchAlgorithm};

// ─── Abstraction level ───────────────────────────────────────────────

/// Canonicalization granularity of a conditional expression.
/// Higher levels discard more syntactic detail.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Min,
    One,
    Two,
    Max,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Min, Level::One, Level::Two, Level::Max];

    /// Levels used by scanning unless configured otherwise.
    pub const SCAN_DEFAULT: [Level; 2] = [Level::One, Level::Two];

    /// Map a numeric level onto the nearest valid one.
    pub fn clamp_from(value: i64) -> Level {
        match value {
            i64::MIN..=0 => Level::Min,
            1 => Level::One,
            2 => Level::Two,
            _ => Level::Max,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "MIN",
            Self::One => "ONE",
            Self::Two => "TWO",
            Self::Max => "MAX",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Ok(Level::clamp_from(n));
        }
        match trimmed.to_ascii_uppercase().as_str() {
            "MIN" => Ok(Self::Min),
            "ONE" => Ok(Self::One),
            "TWO" => Ok(Self::Two),
            "MAX" => Ok(Self::Max),
            _ => Err(format!("Unknown abstraction level: {}", s)),
        }
    }
}

// ─── Log level ───────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    #[default]
    Error,
    Info,
    Debug,
}

impl LogLevel {
    /// Out-of-range verbosity is normalized rather than rejected.
    pub fn clamp_from(value: i64) -> LogLevel {
        match value {
            i64::MIN..=0 => LogLevel::Error,
            1 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }

    /// Lenient parse used by the CLI: names or numbers, anything unknown is ERROR.
    pub fn parse_lenient(s: &str) -> LogLevel {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return LogLevel::clamp_from(n);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "info" => LogLevel::Info,
            "debug" | "trace" => LogLevel::Debug,
            _ => LogLevel::Error,
        }
    }

    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
        }
    }
}

// ─── Scan configuration ──────────────────────────────────────────────

/// Immutable configuration shared by every component of a run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Maximum edit distance searched for autocorrect suggestions.
    pub max_cost: Cost,
    /// Maximum number of suggestions reported per expression.
    pub max_autocorrections: usize,
    /// Scanner worker threads (also the per-query search fan-out).
    pub num_threads: usize,
    /// Percentage below which a rare exact match is flagged.
    pub anomaly_threshold: f64,
    pub log_level: LogLevel,
    pub algorithm: SearchAlgorithm,
    /// Abstraction levels trained and scanned, in report order.
    pub levels: Vec<Level>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_cost: 2,
            max_autocorrections: 5,
            num_threads: 1,
            anomaly_threshold: 5.0,
            log_level: LogLevel::Error,
            algorithm: SearchAlgorithm::default(),
            levels: Level::SCAN_DEFAULT.to_vec(),
        }
    }
}

impl ScanConfig {
    /// Clamp every field into its valid range.
    pub fn normalized(mut self) -> Self {
        self.num_threads = self.num_threads.max(1);
        if !self.anomaly_threshold.is_finite() || self.anomaly_threshold < 0.0 {
            self.anomaly_threshold = 0.0;
        }
        self.levels.sort();
        self.levels.dedup();
        if self.levels.is_empty() {
            self.levels = Level::SCAN_DEFAULT.to_vec();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_clamp() {
        assert_eq!(Level::clamp_from(-5), Level::Min);
        assert_eq!(Level::clamp_from(0), Level::Min);
        assert_eq!(Level::clamp_from(1), Level::One);
        assert_eq!(Level::clamp_from(2), Level::Two);
        assert_eq!(Level::clamp_from(3), Level::Max);
        assert_eq!(Level::clamp_from(99), Level::Max);
    }

    #[test]
    fn test_level_parse_names_and_numbers() {
        assert_eq!("one".parse::<Level>().unwrap(), Level::One);
        assert_eq!("TWO".parse::<Level>().unwrap(), Level::Two);
        assert_eq!("7".parse::<Level>().unwrap(), Level::Max);
        assert!("three".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_display_roundtrip() {
        for level in Level::ALL {
            assert_eq!(level.to_string().parse::<Level>().unwrap(), level);
        }
    }

    #[test]
    fn test_log_level_normalization() {
        assert_eq!(LogLevel::parse_lenient("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::parse_lenient("1"), LogLevel::Info);
        assert_eq!(LogLevel::parse_lenient("17"), LogLevel::Debug);
        assert_eq!(LogLevel::parse_lenient("-3"), LogLevel::Error);
        assert_eq!(LogLevel::parse_lenient("verbose"), LogLevel::Error);
        assert!(LogLevel::Debug > LogLevel::Info);
    }

    #[test]
    fn test_default_config_matches_documented_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.max_cost, 2);
        assert_eq!(config.max_autocorrections, 5);
        assert_eq!(config.num_threads, 1);
        assert_eq!(config.anomaly_threshold, 5.0);
        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(config.algorithm, SearchAlgorithm::TrieTraversal);
        assert_eq!(config.levels, vec![Level::One, Level::Two]);
    }

    #[test]
    fn test_normalized_clamps_fields() {
        let config = ScanConfig {
            num_threads: 0,
            anomaly_threshold: f64::NAN,
            levels: vec![Level::Two, Level::One, Level::Two],
            ..ScanConfig::default()
        }
        .normalized();
        assert_eq!(config.num_threads, 1);
        assert_eq!(config.anomaly_threshold, 0.0);
        assert_eq!(config.levels, vec![Level::One, Level::Two]);
    }
}
