/*!
 * Tests for application configuration
 */

use anyhow::Result;
use capflow::app_config::{Config, LogLevel};
use capflow::caption_muxer::SubtitleType;
use capflow::subtitle_renderer::SubtitleFormat;

/// Test default configuration is valid and carries expected defaults
#[test]
fn test_config_default_shouldValidateAndCarryDefaults() {
    let config = Config::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.subtitle.format, SubtitleFormat::Srt);
    assert_eq!(config.subtitle.subtitle_type, SubtitleType::Hard);
    assert_eq!(config.engine.ffmpeg_path, "ffmpeg");
    assert_eq!(config.engine.burn_timeout_secs, 600);
    assert_eq!(config.engine.track_timeout_secs, 300);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.language, "eng");
}

/// Test an empty JSON object deserializes to the full default config
#[test]
fn test_config_fromEmptyJson_shouldUseDefaults() -> Result<()> {
    let config: Config = serde_json::from_str("{}")?;

    assert_eq!(config.engine.ffprobe_path, "ffprobe");
    assert_eq!(config.subtitle.style.font_size, 24);
    assert_eq!(config.subtitle.style.font_color, "white");
    Ok(())
}

/// Test serialization round-trips the configuration
#[test]
fn test_config_serdeRoundTrip_shouldPreserveFields() -> Result<()> {
    let mut config = Config::default();
    config.language = "fra".to_string();
    config.engine.burn_timeout_secs = 120;

    let json = serde_json::to_string_pretty(&config)?;
    let parsed: Config = serde_json::from_str(&json)?;

    assert_eq!(parsed.language, "fra");
    assert_eq!(parsed.engine.burn_timeout_secs, 120);
    Ok(())
}

/// Test validation rejects broken settings
#[test]
fn test_config_validate_withBrokenSettings_shouldFail() {
    let mut config = Config::default();
    config.engine.ffmpeg_path = String::new();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.engine.track_timeout_secs = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.subtitle.style.font_size = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.language = "  ".to_string();
    assert!(config.validate().is_err());
}

/// Test subtitle format and type parse from lowercase config values
#[test]
fn test_config_fromJson_withSubtitleOverrides_shouldParse() -> Result<()> {
    let json = r#"{
        "subtitle": {
            "format": "vtt",
            "type": "soft",
            "style": { "font_size": 32, "font_color": "yellow", "position": "top" }
        }
    }"#;

    let config: Config = serde_json::from_str(json)?;

    assert_eq!(config.subtitle.format, SubtitleFormat::Vtt);
    assert_eq!(config.subtitle.subtitle_type, SubtitleType::Soft);
    assert_eq!(config.subtitle.style.font_size, 32);
    Ok(())
}
