use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Path of the report artifact written at the end of a run.
    pub report_file: PathBuf,

    /// Path of the persisted layer cache file.
    pub cache_file: PathBuf,

    /// Upper bound for a single command-knowledge or enrichment call.
    /// An elapsed timeout is treated as "no packages found", never fatal.
    #[serde(with = "duration_secs")]
    pub command_timeout: Duration,

    /// Image tag applied when building the Dockerfile under analysis.
    pub image_tag: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            report_file: PathBuf::from("report.txt"),
            cache_file: Self::default_cache_file(),
            command_timeout: Duration::from_secs(120),
            image_tag: "layerlens-analysis:latest".to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Default cache location: `~/.layerlens/layer_cache.json`.
    fn default_cache_file() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".layerlens"))
            .unwrap_or_else(|| PathBuf::from(".layerlens"))
            .join("layer_cache.json")
    }
}

/// Serialize `Duration` as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
