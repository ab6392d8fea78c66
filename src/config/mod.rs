mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = parse_config(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./llhls.toml",
        "~/.config/llhls/config.toml",
        "/etc/llhls/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    let hls = &config.hls;

    if hls.segment_duration_ms == 0 {
        anyhow::bail!("hls.segment_duration_ms cannot be 0");
    }
    if hls.fragment_duration_ms == 0 {
        anyhow::bail!("hls.fragment_duration_ms cannot be 0");
    }
    if hls.fragment_duration_ms > hls.segment_duration_ms {
        anyhow::bail!(
            "hls.fragment_duration_ms ({}) exceeds hls.segment_duration_ms ({})",
            hls.fragment_duration_ms,
            hls.segment_duration_ms
        );
    }
    if hls.segment_count == 0 {
        anyhow::bail!("hls.segment_count must be at least 1");
    }
    if hls.channel_size == 0 {
        anyhow::bail!("hls.channel_size must be at least 1");
    }
    if hls.part_target_ms < hls.fragment_duration_ms {
        tracing::warn!(
            "hls.part_target_ms ({}) is below hls.fragment_duration_ms ({}); parts will exceed the advertised target",
            hls.part_target_ms,
            hls.fragment_duration_ms
        );
    }

    let sim = &config.simulate;
    if sim.fps == 0 || sim.gop == 0 {
        anyhow::bail!("simulate.fps and simulate.gop must be positive");
    }

    Ok(())
}
