//! Configuration module for the voxgate server
//!
//! This module handles server configuration from various sources: YAML files and
//! environment variables. The configuration is split into logical submodules for
//! maintainability.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use voxgate::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file merged with environment variables
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::core::cache::{CacheConfig, CacheTtls};
use crate::core::monitor::{MonitorConfig, MonitorThresholds};
use crate::core::pregen::PregenTarget;
use crate::core::streaming::StreamingConfig;
use crate::core::synthesis::{CoordinatorConfig, DEFAULT_COMMON_PHRASES};
use crate::core::tts::ProviderConfig;
use crate::core::voices::{VoiceProfile, default_profiles};

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use validation::validate_config;

/// Server configuration
///
/// Contains everything needed to run the gateway:
/// - Server settings (host, port)
/// - Synthesis provider selection and credentials
/// - Cache, synthesis, monitoring and streaming tuning
/// - Pregeneration schedule and voice profiles
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Provider settings
    pub tts_provider: String,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: Option<String>,

    // Cache configuration (filesystem or memory)
    pub cache_path: Option<PathBuf>, // if None, use in-memory cache
    pub cache_max_entries: u64,
    pub cache_common_ttl_seconds: u64,
    pub cache_dynamic_ttl_seconds: u64,

    // Synthesis
    pub synthesis_timeout_ms: u64,
    pub max_concurrent_provider_calls: usize,
    pub fallback_failure_threshold: u32,

    // Monitoring
    pub latency_sla_ms: u64,
    pub max_over_sla_fraction: f64,
    pub quality_floor: f32,
    pub max_low_quality_fraction: f64,
    pub max_error_rate: f64,
    pub min_cache_hit_rate: f64,
    pub monitor_window_seconds: u64,
    pub monitor_window_max_samples: usize,
    pub monitor_min_samples: usize,
    pub alert_webhook_url: Option<String>,

    // Streaming
    pub stream_frame_bytes: usize,
    pub session_idle_timeout_seconds: u64,
    pub max_sessions: usize,
    pub stream_outbound_buffer: usize,

    // Pregeneration
    pub pregen_interval_seconds: u64,
    pub pregen_targets: Vec<PregenTarget>,
    pub common_phrases: Vec<String>,

    pub voice_profiles: Vec<VoiceProfile>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            tts_provider: "elevenlabs".to_string(),
            elevenlabs_api_key: None,
            elevenlabs_base_url: None,
            cache_path: None,
            cache_max_entries: 100_000,
            cache_common_ttl_seconds: 7 * 24 * 60 * 60,
            cache_dynamic_ttl_seconds: 24 * 60 * 60,
            synthesis_timeout_ms: 2000,
            max_concurrent_provider_calls: 50,
            fallback_failure_threshold: 3,
            latency_sla_ms: 2000,
            max_over_sla_fraction: 0.10,
            quality_floor: 0.8,
            max_low_quality_fraction: 0.05,
            max_error_rate: 0.05,
            min_cache_hit_rate: 0.30,
            monitor_window_seconds: 300,
            monitor_window_max_samples: 1000,
            monitor_min_samples: 20,
            alert_webhook_url: None,
            stream_frame_bytes: 4800,
            session_idle_timeout_seconds: 60,
            max_sessions: 1000,
            stream_outbound_buffer: 64,
            pregen_interval_seconds: 12 * 60 * 60,
            pregen_targets: Vec::new(),
            common_phrases: DEFAULT_COMMON_PHRASES.iter().map(|p| p.to_string()).collect(),
            voice_profiles: default_profiles(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file merged with environment variables
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables
    /// 3. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // .env is not loaded here: the YAML file is the source of truth and only
        // real environment variables fill its gaps.
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            name: self.tts_provider.clone(),
            api_key: self.elevenlabs_api_key.clone(),
            base_url: self.elevenlabs_base_url.clone(),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        match &self.cache_path {
            Some(path) => CacheConfig::Filesystem { path: path.clone() },
            None => CacheConfig::Memory {
                max_entries: self.cache_max_entries,
                max_size_bytes: Some(500 * 1024 * 1024),
            },
        }
    }

    pub fn cache_ttls(&self) -> CacheTtls {
        CacheTtls {
            common: Duration::from_secs(self.cache_common_ttl_seconds),
            dynamic: Duration::from_secs(self.cache_dynamic_ttl_seconds),
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            timeout: Duration::from_millis(self.synthesis_timeout_ms),
            fallback_failure_threshold: self.fallback_failure_threshold,
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            thresholds: MonitorThresholds {
                latency_sla_ms: self.latency_sla_ms,
                max_over_sla_fraction: self.max_over_sla_fraction,
                quality_floor: self.quality_floor,
                max_low_quality_fraction: self.max_low_quality_fraction,
                max_error_rate: self.max_error_rate,
                min_cache_hit_rate: self.min_cache_hit_rate,
                min_samples: self.monitor_min_samples,
            },
            window: Duration::from_secs(self.monitor_window_seconds),
            max_samples: self.monitor_window_max_samples,
        }
    }

    pub fn streaming_config(&self) -> StreamingConfig {
        StreamingConfig {
            frame_bytes: self.stream_frame_bytes,
            idle_timeout: Duration::from_secs(self.session_idle_timeout_seconds),
            max_sessions: self.max_sessions,
            outbound_buffer: self.stream_outbound_buffer,
        }
    }

    pub fn pregen_interval(&self) -> Duration {
        Duration::from_secs(self.pregen_interval_seconds)
    }
}
