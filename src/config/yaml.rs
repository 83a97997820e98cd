use serde::Deserialize;
use std::path::PathBuf;

use crate::core::pregen::PregenTarget;
use crate::core::voices::VoiceProfile;

/// Complete YAML configuration structure
///
/// This structure represents the full configuration that can be loaded from a YAML file.
/// All fields are optional to allow partial configuration. Environment variables fill
/// any values not specified here.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///
/// provider:
///   name: "elevenlabs"
///   api_key: "your-elevenlabs-key"
///
/// cache:
///   path: "/var/cache/voxgate"
///   common_ttl_seconds: 604800
///   dynamic_ttl_seconds: 86400
///
/// synthesis:
///   timeout_ms: 2000
///   max_concurrent_provider_calls: 50
///   fallback_failure_threshold: 3
///
/// monitor:
///   latency_sla_ms: 2000
///   max_error_rate: 0.05
///   alert_webhook_url: "https://alerts.example.com/hook"
///
/// streaming:
///   frame_bytes: 4800
///   idle_timeout_seconds: 60
///
/// pregeneration:
///   interval_seconds: 43200
///   targets:
///     - voice_profile_id: "rachel"
///       language: "en"
///   phrases:
///     - "Hello, thanks for calling!"
///
/// voice_profiles:
///   - id: "rachel"
///     provider_voice_id: "21m00Tcm4TlvDq8ikWAM"
///     languages: ["en", "es"]
///     family: "professional"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub provider: Option<ProviderYaml>,
    pub cache: Option<CacheYaml>,
    pub synthesis: Option<SynthesisYaml>,
    pub monitor: Option<MonitorYaml>,
    pub streaming: Option<StreamingYaml>,
    pub pregeneration: Option<PregenerationYaml>,
    pub voice_profiles: Option<Vec<VoiceProfile>>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Synthesis provider selection from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProviderYaml {
    /// `elevenlabs` or `stub`
    pub name: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Cache configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CacheYaml {
    pub path: Option<PathBuf>,
    pub max_entries: Option<u64>,
    pub common_ttl_seconds: Option<u64>,
    pub dynamic_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisYaml {
    pub timeout_ms: Option<u64>,
    pub max_concurrent_provider_calls: Option<usize>,
    pub fallback_failure_threshold: Option<u32>,
}

/// Anomaly thresholds and window sizing from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MonitorYaml {
    pub latency_sla_ms: Option<u64>,
    pub max_over_sla_fraction: Option<f64>,
    pub quality_floor: Option<f32>,
    pub max_low_quality_fraction: Option<f64>,
    pub max_error_rate: Option<f64>,
    pub min_cache_hit_rate: Option<f64>,
    pub window_seconds: Option<u64>,
    pub window_max_samples: Option<usize>,
    pub min_samples: Option<usize>,
    pub alert_webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StreamingYaml {
    pub frame_bytes: Option<usize>,
    pub idle_timeout_seconds: Option<u64>,
    pub max_sessions: Option<usize>,
    pub outbound_buffer: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PregenerationYaml {
    pub interval_seconds: Option<u64>,
    pub targets: Option<Vec<PregenTarget>>,
    pub phrases: Option<Vec<String>>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Returns
    /// * `Result<Self, Box<dyn std::error::Error>>` - The parsed configuration or an error
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file {}: {e}", path.display()))?;
        Ok(config)
    }
}
