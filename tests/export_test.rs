//! Simulated streams written to disk the way `llhls simulate` does it.

mod common;

use std::time::Duration;

use common::*;
use llhls::config::{HlsConfig, SimulateConfig};
use llhls::export::{export, MASTER_FILE};
use llhls::synth::SyntheticSource;
use llhls::HlsStreamer;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_export_writes_playlists_and_media() {
    let dir = tempdir().unwrap();
    let stop = CancellationToken::new();
    let (hls, worker) = HlsStreamer::start(&HlsConfig::default(), stop.clone());

    let mut source = SyntheticSource::new(&SimulateConfig {
        resolutions: vec![(1280, 720), (640, 360)],
        fps: 25,
        gop: 25,
        audio: true,
    });
    for packet in source.take_until(Duration::from_secs(5)) {
        hls.write_packet(packet).await.unwrap();
    }
    hls.flush().await.unwrap();

    let summary = export(&hls, dir.path()).await.unwrap();
    assert_eq!(summary.renditions, 2);
    // 5 s of media: two closed 2 s segments per rendition
    assert_eq!(summary.segments, 4);
    assert!(summary.parts >= 16);

    let master = std::fs::read_to_string(dir.path().join(MASTER_FILE)).unwrap();
    assert!(master.contains("RESOLUTION=640x360,CODECS=\"avc1.64001F,mp4a.40.2\""));
    let first = master.find("640x360").unwrap();
    let second = master.find("1280x720").unwrap();
    assert!(first < second);

    let rendition = dir.path().join("0").join("0");
    let index = std::fs::read_to_string(rendition.join("cubic.m3u8")).unwrap();
    assert!(index.contains("segment/1/cubic.m4s"));

    let init = std::fs::read(rendition.join("init.mp4")).unwrap();
    assert_eq!(track_timescales(&init), vec![(1, 90_000), (2, 48_000)]);
    assert_eq!(video_sample_entry(&init), ("avc1".to_string(), 640, 360));

    let segment = std::fs::read(rendition.join("segment/0/cubic.m4s")).unwrap();
    assert_eq!(kinds(&segment), vec!["styp", "sidx", "sidx", "moof", "mdat"]);
    assert!(rendition.join("fragment/0/0/cubic.m4s").exists());
    assert!(!rendition.join("segment/2/cubic.m4s").exists());

    stop.cancel();
    worker.await.unwrap();
}
