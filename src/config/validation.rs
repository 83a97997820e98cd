use std::collections::HashSet;

use super::ServerConfig;
use crate::core::limiter::MAX_PERMITS;
use crate::core::voices::VoiceRegistry;

/// Validate a fully merged configuration
///
/// Checks that:
/// - the provider is known, and `elevenlabs` has an API key
/// - concurrency is within 1..=1000 and the synthesis timeout is non-zero
/// - every threshold fraction lies in [0, 1]
/// - sizes and TTLs are non-zero
/// - voice profiles are valid, unique, and fallbacks name known profiles
/// - pregeneration targets reference known profiles
pub fn validate_config(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_provider(config)?;

    if config.max_concurrent_provider_calls == 0 || config.max_concurrent_provider_calls > MAX_PERMITS
    {
        return Err(format!(
            "max_concurrent_provider_calls must be between 1 and {MAX_PERMITS}, got {}",
            config.max_concurrent_provider_calls
        )
        .into());
    }
    if config.synthesis_timeout_ms == 0 {
        return Err("synthesis timeout_ms must be greater than zero".into());
    }

    for (name, value) in [
        ("max_over_sla_fraction", config.max_over_sla_fraction),
        ("quality_floor", config.quality_floor as f64),
        ("max_low_quality_fraction", config.max_low_quality_fraction),
        ("max_error_rate", config.max_error_rate),
        ("min_cache_hit_rate", config.min_cache_hit_rate),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(format!("{name} must be within [0, 1], got {value}").into());
        }
    }

    for (name, value) in [
        ("cache common_ttl_seconds", config.cache_common_ttl_seconds),
        ("cache dynamic_ttl_seconds", config.cache_dynamic_ttl_seconds),
        ("cache max_entries", config.cache_max_entries),
        ("monitor window_seconds", config.monitor_window_seconds),
        ("latency_sla_ms", config.latency_sla_ms),
        ("pregeneration interval_seconds", config.pregen_interval_seconds),
        ("session idle_timeout_seconds", config.session_idle_timeout_seconds),
        ("stream frame_bytes", config.stream_frame_bytes as u64),
        ("stream outbound_buffer", config.stream_outbound_buffer as u64),
        ("max_sessions", config.max_sessions as u64),
        ("monitor window_max_samples", config.monitor_window_max_samples as u64),
    ] {
        if value == 0 {
            return Err(format!("{name} must be greater than zero").into());
        }
    }

    validate_voice_profiles(config)?;
    Ok(())
}

fn validate_provider(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    match config.tts_provider.as_str() {
        "elevenlabs" => {
            if config
                .elevenlabs_api_key
                .as_deref()
                .is_none_or(|k| k.trim().is_empty())
            {
                return Err(
                    "ELEVENLABS_API_KEY is required when TTS_PROVIDER=elevenlabs".into(),
                );
            }
            Ok(())
        }
        "stub" => Ok(()),
        other => Err(format!("Unsupported TTS provider: {other}. Supported: elevenlabs, stub").into()),
    }
}

fn validate_voice_profiles(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.voice_profiles.is_empty() {
        return Err("at least one voice profile must be configured".into());
    }

    // Duplicate ids, parameter ranges and dangling fallbacks
    let registry = VoiceRegistry::new(config.voice_profiles.clone())?;

    let mut seen = HashSet::new();
    for target in &config.pregen_targets {
        registry.resolve(&target.voice_profile_id, &target.language)?;
        if !seen.insert((&target.voice_profile_id, &target.language, target.format)) {
            return Err(format!(
                "duplicate pregeneration target {} / {}",
                target.voice_profile_id, target.language
            )
            .into());
        }
    }

    Ok(())
}
