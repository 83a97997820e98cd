use super::ServerConfig;
use super::merge::merge_config;
use super::validation::validate_config;

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Reads configuration from environment variables, with sensible defaults.
    /// Also loads from .env file if present using dotenvy. Voice profiles and
    /// pregeneration targets can only be set from YAML; the built-in defaults
    /// apply here.
    ///
    /// # Returns
    /// * `Result<Self, Box<dyn std::error::Error>>` - The loaded configuration or an error
    ///
    /// # Errors
    /// Returns an error if:
    /// - Environment variables are malformed
    /// - Configuration validation fails
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = merge_config(None)?;
        validate_config(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::path::PathBuf;

    const VARS: &[&str] = &[
        "HOST",
        "PORT",
        "TTS_PROVIDER",
        "ELEVENLABS_API_KEY",
        "CACHE_PATH",
        "CACHE_COMMON_TTL_SECONDS",
        "MAX_CONCURRENT_PROVIDER_CALLS",
        "STREAM_FRAME_BYTES",
        "MIN_CACHE_HIT_RATE",
    ];

    // Helper to clean up environment variables after tests
    fn cleanup_env_vars() {
        unsafe {
            for var in VARS {
                env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_from_env_with_values() {
        cleanup_env_vars();
        unsafe {
            env::set_var("HOST", "127.0.0.1");
            env::set_var("PORT", "8080");
            env::set_var("TTS_PROVIDER", "elevenlabs");
            env::set_var("ELEVENLABS_API_KEY", "test-key");
            env::set_var("CACHE_PATH", "/tmp/voxgate-cache");
            env::set_var("CACHE_COMMON_TTL_SECONDS", "3600");
            env::set_var("MAX_CONCURRENT_PROVIDER_CALLS", "8");
            env::set_var("STREAM_FRAME_BYTES", "960");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.address(), "127.0.0.1:8080");
        assert_eq!(config.elevenlabs_api_key.as_deref(), Some("test-key"));
        assert_eq!(config.cache_path, Some(PathBuf::from("/tmp/voxgate-cache")));
        assert_eq!(config.cache_common_ttl_seconds, 3600);
        assert_eq!(config.max_concurrent_provider_calls, 8);
        assert_eq!(config.stream_frame_bytes, 960);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_requires_elevenlabs_key() {
        cleanup_env_vars();
        unsafe {
            env::set_var("TTS_PROVIDER", "elevenlabs");
        }

        let result = ServerConfig::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("ELEVENLABS_API_KEY"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_out_of_range_threshold() {
        cleanup_env_vars();
        unsafe {
            env::set_var("TTS_PROVIDER", "stub");
            env::set_var("MIN_CACHE_HIT_RATE", "1.5");
        }

        let result = ServerConfig::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("min_cache_hit_rate"));

        cleanup_env_vars();
    }
}
