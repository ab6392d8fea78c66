use llhls_media::RenditionOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub hls: HlsConfig,

    #[serde(default)]
    pub simulate: SimulateConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HlsConfig {
    /// Prefix of every rendition path in the master playlist
    #[serde(default)]
    pub writer_id: u32,

    /// Target segment duration in milliseconds (default: 2000)
    #[serde(default = "default_segment_duration")]
    pub segment_duration_ms: u64,

    /// Duration at which a part closes, in milliseconds (default: 495)
    #[serde(default = "default_fragment_duration")]
    pub fragment_duration_ms: u64,

    /// Advertised PART-TARGET in milliseconds (default: 500)
    #[serde(default = "default_part_target")]
    pub part_target_ms: u64,

    /// Live segments retained per rendition (default: 6)
    #[serde(default = "default_segment_count")]
    pub segment_count: usize,

    /// How long a blocking read waits before timing out (default: 3000)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,

    /// Capacity of the writer's command queue (default: 256)
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,
}

fn default_segment_duration() -> u64 {
    2000
}
fn default_fragment_duration() -> u64 {
    495
}
fn default_part_target() -> u64 {
    500
}
fn default_segment_count() -> usize {
    6
}
fn default_read_timeout() -> u64 {
    3000
}
fn default_channel_size() -> usize {
    256
}

impl Default for HlsConfig {
    fn default() -> Self {
        Self {
            writer_id: 0,
            segment_duration_ms: default_segment_duration(),
            fragment_duration_ms: default_fragment_duration(),
            part_target_ms: default_part_target(),
            segment_count: default_segment_count(),
            read_timeout_ms: default_read_timeout(),
            channel_size: default_channel_size(),
        }
    }
}

impl HlsConfig {
    pub fn segment_duration(&self) -> Duration {
        Duration::from_millis(self.segment_duration_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn rendition_options(&self) -> RenditionOptions {
        RenditionOptions {
            segment_duration: self.segment_duration(),
            fragment_duration: Duration::from_millis(self.fragment_duration_ms),
            part_target: Duration::from_millis(self.part_target_ms),
            segment_count: self.segment_count,
        }
    }
}

/// Synthetic renditions produced by `llhls simulate`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulateConfig {
    /// Video resolutions, one rendition each
    #[serde(default = "default_resolutions")]
    pub resolutions: Vec<(u32, u32)>,

    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Frames between keyframes (default: 30)
    #[serde(default = "default_gop")]
    pub gop: u32,

    /// Add an AAC track to every rendition
    #[serde(default)]
    pub audio: bool,
}

fn default_resolutions() -> Vec<(u32, u32)> {
    vec![(1280, 720), (640, 360)]
}
fn default_fps() -> u32 {
    30
}
fn default_gop() -> u32 {
    30
}

impl Default for SimulateConfig {
    fn default() -> Self {
        Self {
            resolutions: default_resolutions(),
            fps: default_fps(),
            gop: default_gop(),
            audio: false,
        }
    }
}
