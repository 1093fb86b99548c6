//! Dashboard configuration: data sources, fetch timeout, and the exercise catalog

use crate::DatasetKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const WEIGHTLIFTING_URL: &str =
    "https://raw.githubusercontent.com/jrg94/personal-data/main/health/weightlifting.csv";
pub const FITBIT_URL: &str =
    "https://raw.githubusercontent.com/jrg94/personal-data/main/health/fitbit.csv";

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid config {path}: {detail}")]
    Invalid { path: PathBuf, detail: String },
}

/// Where a CSV log lives: a remote URL or a local file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Source {
    Url(String),
    Path(PathBuf),
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Source::Url(s)
        } else {
            Source::Path(PathBuf::from(s))
        }
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Source::from(s.to_string())
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        source.to_string()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => f.write_str(url),
            Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Description and optional demo video for a muscle group or exercise
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
}

impl CatalogEntry {
    fn new(description: &str, video: Option<&str>) -> Self {
        Self {
            description: description.to_string(),
            video: video.map(str::to_string),
        }
    }
}

/// Read-only configuration handed to the loader and views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub exercise_source: Source,
    pub tracker_source: Source,
    pub fetch_timeout_secs: u64,
    pub catalog: BTreeMap<String, CatalogEntry>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let mut catalog = BTreeMap::new();
        catalog.insert(
            "Back".to_string(),
            CatalogEntry::new(
                "To me, the back is a generic muscle group mainly referring to the traps.",
                None,
            ),
        );
        catalog.insert(
            "Dumbbell Rows".to_string(),
            CatalogEntry::new(
                "Dumbbell rows are traditional rows performed bent over using a single arm at a time: \
                 one hand rests on a surface while the other pulls the weight up from the ground.",
                Some("https://www.youtube.com/embed/4ZpQb1kX7Ew"),
            ),
        );
        catalog.insert(
            "Russian Twists".to_string(),
            CatalogEntry::new(
                "Russian twists are an ab exercise that involves sitting on the ground and \
                 twisting with some weight in hand.",
                Some("https://www.youtube.com/embed/Tau0hsW8iR0"),
            ),
        );

        Self {
            exercise_source: Source::Url(WEIGHTLIFTING_URL.to_string()),
            tracker_source: Source::Url(FITBIT_URL.to_string()),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            catalog,
        }
    }
}

impl DashboardConfig {
    /// Load a config file; fields absent from the file keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if config.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                detail: "fetch_timeout_secs must be at least 1".to_string(),
            });
        }
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load the default config file, falling back to built-in defaults if absent
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = crate::config_path();
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn source(&self, kind: DatasetKind) -> &Source {
        match kind {
            DatasetKind::ExerciseLog => &self.exercise_source,
            DatasetKind::TrackerLog => &self.tracker_source,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Catalog entry for a muscle group or exercise name
    pub fn describe(&self, name: &str) -> Option<&CatalogEntry> {
        self.catalog.get(name)
    }
}
