use std::env;
use std::path::PathBuf;

use super::ServerConfig;
use super::utils::env_parsed;
use super::yaml::YamlConfig;

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. YAML configuration values
/// 2. Environment variables
/// 3. Default values
///
/// This allows environment variables to provide base configuration while YAML
/// can override specific values for different deployment environments.
///
/// # Arguments
/// * `yaml_config` - Optional YAML configuration to use as overrides
///
/// # Returns
/// * `Result<ServerConfig, Box<dyn std::error::Error>>` - The merged configuration or an error
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml_config.unwrap_or_default();
    let defaults = ServerConfig::default();

    // Helper macro to get value with priority: YAML > ENV > Default
    macro_rules! get_value {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            $yaml_value
                .or_else(|| env::var($env_var).ok())
                .unwrap_or_else(|| $default.to_string())
        };
    }

    // Helper macro for optional values: YAML > ENV
    macro_rules! get_optional {
        ($env_var:expr, $yaml_value:expr) => {
            $yaml_value.or_else(|| env::var($env_var).ok())
        };
    }

    // Helper macro for parsed values: YAML > ENV (parsed) > Default
    macro_rules! get_parsed {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            match $yaml_value {
                Some(value) => value,
                None => env_parsed($env_var)?.unwrap_or($default),
            }
        };
    }

    let server = yaml.server.unwrap_or_default();
    let provider = yaml.provider.unwrap_or_default();
    let cache = yaml.cache.unwrap_or_default();
    let synthesis = yaml.synthesis.unwrap_or_default();
    let monitor = yaml.monitor.unwrap_or_default();
    let streaming = yaml.streaming.unwrap_or_default();
    let pregeneration = yaml.pregeneration.unwrap_or_default();

    // Server configuration
    let host = get_value!("HOST", server.host, defaults.host);
    let port = get_parsed!("PORT", server.port, defaults.port);

    // Provider configuration
    let tts_provider = get_value!("TTS_PROVIDER", provider.name, defaults.tts_provider)
        .to_lowercase();
    let elevenlabs_api_key = get_optional!("ELEVENLABS_API_KEY", provider.api_key);
    let elevenlabs_base_url = get_optional!("ELEVENLABS_BASE_URL", provider.base_url);

    // Cache configuration
    let cache_path = cache
        .path
        .or_else(|| env::var("CACHE_PATH").ok().map(PathBuf::from));
    let cache_max_entries = get_parsed!(
        "CACHE_MAX_ENTRIES",
        cache.max_entries,
        defaults.cache_max_entries
    );
    let cache_common_ttl_seconds = get_parsed!(
        "CACHE_COMMON_TTL_SECONDS",
        cache.common_ttl_seconds,
        defaults.cache_common_ttl_seconds
    );
    let cache_dynamic_ttl_seconds = get_parsed!(
        "CACHE_DYNAMIC_TTL_SECONDS",
        cache.dynamic_ttl_seconds,
        defaults.cache_dynamic_ttl_seconds
    );

    // Synthesis configuration
    let synthesis_timeout_ms = get_parsed!(
        "SYNTHESIS_TIMEOUT_MS",
        synthesis.timeout_ms,
        defaults.synthesis_timeout_ms
    );
    let max_concurrent_provider_calls = get_parsed!(
        "MAX_CONCURRENT_PROVIDER_CALLS",
        synthesis.max_concurrent_provider_calls,
        defaults.max_concurrent_provider_calls
    );
    let fallback_failure_threshold = get_parsed!(
        "FALLBACK_FAILURE_THRESHOLD",
        synthesis.fallback_failure_threshold,
        defaults.fallback_failure_threshold
    );

    // Monitor configuration
    let latency_sla_ms = get_parsed!(
        "LATENCY_SLA_MS",
        monitor.latency_sla_ms,
        defaults.latency_sla_ms
    );
    let max_over_sla_fraction = get_parsed!(
        "MAX_OVER_SLA_FRACTION",
        monitor.max_over_sla_fraction,
        defaults.max_over_sla_fraction
    );
    let quality_floor = get_parsed!("QUALITY_FLOOR", monitor.quality_floor, defaults.quality_floor);
    let max_low_quality_fraction = get_parsed!(
        "MAX_LOW_QUALITY_FRACTION",
        monitor.max_low_quality_fraction,
        defaults.max_low_quality_fraction
    );
    let max_error_rate = get_parsed!(
        "MAX_ERROR_RATE",
        monitor.max_error_rate,
        defaults.max_error_rate
    );
    let min_cache_hit_rate = get_parsed!(
        "MIN_CACHE_HIT_RATE",
        monitor.min_cache_hit_rate,
        defaults.min_cache_hit_rate
    );
    let monitor_window_seconds = get_parsed!(
        "MONITOR_WINDOW_SECONDS",
        monitor.window_seconds,
        defaults.monitor_window_seconds
    );
    let monitor_window_max_samples = get_parsed!(
        "MONITOR_WINDOW_MAX_SAMPLES",
        monitor.window_max_samples,
        defaults.monitor_window_max_samples
    );
    let monitor_min_samples = get_parsed!(
        "MONITOR_MIN_SAMPLES",
        monitor.min_samples,
        defaults.monitor_min_samples
    );
    let alert_webhook_url = get_optional!("ALERT_WEBHOOK_URL", monitor.alert_webhook_url);

    // Streaming configuration
    let stream_frame_bytes = get_parsed!(
        "STREAM_FRAME_BYTES",
        streaming.frame_bytes,
        defaults.stream_frame_bytes
    );
    let session_idle_timeout_seconds = get_parsed!(
        "SESSION_IDLE_TIMEOUT_SECONDS",
        streaming.idle_timeout_seconds,
        defaults.session_idle_timeout_seconds
    );
    let max_sessions = get_parsed!("MAX_SESSIONS", streaming.max_sessions, defaults.max_sessions);
    let stream_outbound_buffer = get_parsed!(
        "STREAM_OUTBOUND_BUFFER",
        streaming.outbound_buffer,
        defaults.stream_outbound_buffer
    );

    // Pregeneration configuration
    let pregen_interval_seconds = get_parsed!(
        "PREGEN_INTERVAL_SECONDS",
        pregeneration.interval_seconds,
        defaults.pregen_interval_seconds
    );
    let pregen_targets = pregeneration.targets.unwrap_or(defaults.pregen_targets);
    let common_phrases = pregeneration.phrases.unwrap_or(defaults.common_phrases);

    let voice_profiles = yaml.voice_profiles.unwrap_or(defaults.voice_profiles);

    Ok(ServerConfig {
        host,
        port,
        tts_provider,
        elevenlabs_api_key,
        elevenlabs_base_url,
        cache_path,
        cache_max_entries,
        cache_common_ttl_seconds,
        cache_dynamic_ttl_seconds,
        synthesis_timeout_ms,
        max_concurrent_provider_calls,
        fallback_failure_threshold,
        latency_sla_ms,
        max_over_sla_fraction,
        quality_floor,
        max_low_quality_fraction,
        max_error_rate,
        min_cache_hit_rate,
        monitor_window_seconds,
        monitor_window_max_samples,
        monitor_min_samples,
        alert_webhook_url,
        stream_frame_bytes,
        session_idle_timeout_seconds,
        max_sessions,
        stream_outbound_buffer,
        pregen_interval_seconds,
        pregen_targets,
        common_phrases,
        voice_profiles,
    })
}
