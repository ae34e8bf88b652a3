use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub market: MarketConfig,
    pub ranking: RankingConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root directory holding one 6-digit `yymmdd` subdirectory per day.
    pub root: PathBuf,
    /// Ledger file path; defaults to `<root>/record.csv` when omitted.
    #[serde(default)]
    pub record_path: Option<PathBuf>,
}

impl DataConfig {
    #[must_use]
    pub fn record_path(&self) -> PathBuf {
        self.record_path
            .clone()
            .unwrap_or_else(|| self.root.join("record.csv"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Base URL of the daily-bar gateway.
    pub api_url: String,
    /// Market segments concatenated into one bulk snapshot per day.
    pub markets: Vec<String>,
    /// Instrument probed to resolve trading days.
    pub reference_code: String,
    /// Per-request timeout; a timed-out probe is "no data", not an error.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Dominant instruments removed from aggregation when the exclusion
    /// toggle is on.
    pub deny: Vec<DenyEntry>,
    /// Default number of themes returned by the themes endpoint.
    pub theme_limit: usize,
    /// Default number of preview rows per theme.
    pub preview_limit: usize,
}

/// One deny-list entry for dominant-instrument exclusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenyEntry {
    pub pattern: String,
    #[serde(default)]
    pub match_kind: MatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Row name must equal the pattern.
    #[default]
    Exact,
    /// Row name must start with the pattern (covers preferred-share
    /// variants that share the listed name).
    Prefix,
}

impl DenyEntry {
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        match self.match_kind {
            MatchKind::Exact => name == self.pattern,
            MatchKind::Prefix => name.starts_with(&self.pattern),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Master switch for the refresh endpoint.
    pub enabled: bool,
    /// Optional shared token checked against the `X-Refresh-Token` header.
    #[serde(default)]
    pub token: String,
    /// External ingestion command; the data root is appended as the final
    /// argument. Scraping itself lives outside this repository.
    #[serde(default)]
    pub command: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            data: DataConfig {
                root: PathBuf::from("data/tema"),
                record_path: None,
            },
            market: MarketConfig {
                api_url: "http://localhost:9400".to_string(),
                markets: vec!["KOSPI".to_string(), "KOSDAQ".to_string()],
                reference_code: "005930".to_string(),
                timeout_secs: 10,
            },
            ranking: RankingConfig {
                deny: vec![
                    DenyEntry {
                        pattern: "삼성전자".to_string(),
                        match_kind: MatchKind::Prefix,
                    },
                    DenyEntry {
                        pattern: "SK하이닉스".to_string(),
                        match_kind: MatchKind::Exact,
                    },
                ],
                theme_limit: 4,
                preview_limit: 4,
            },
            refresh: RefreshConfig {
                enabled: false,
                token: String::new(),
                command: Vec::new(),
            },
        }
    }
}
