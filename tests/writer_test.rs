//! Writer behaviour across renditions: codec changes, ordering, removal and
//! blocking playlist reads.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::*;
use llhls::config::HlsConfig;
use llhls::{HlsStreamer, MultiRenditionWriter};
use llhls_common::{CodecKind, CodecParametersPair, Error};
use llhls_media::{Deadline, RenditionMuxer, RenditionOptions};
use tokio_util::sync::CancellationToken;

const URL: &str = "rtsp://camera/main";

fn feed(muxer: &RenditionMuxer, url: &str, start: u64, count: u64) {
    let codec = Arc::clone(muxer.params().video.as_ref().unwrap());
    for i in start..start + count {
        muxer
            .write_packet(&video(url, &codec, i, 40, i % 25 == 0))
            .unwrap();
    }
}

#[test]
fn test_codec_change_resets_numbering() {
    let mut writer = MultiRenditionWriter::new(0, RenditionOptions::default());
    let sd = h264(640, 360);
    for i in 0..60 {
        writer.write_packet(&video(URL, &sd, i, 40, i % 25 == 0)).unwrap();
    }
    let old = writer.rendition(0).unwrap();
    assert_eq!(old.current_segment_id(), 1);
    assert_eq!(video_sample_entry(&old.init_segment()), ("avc1".to_string(), 640, 360));

    let hd = h264(1920, 1080);
    writer.write_packet(&video(URL, &hd, 60, 40, true)).unwrap();

    let new = writer.rendition(0).unwrap();
    assert!(old.is_closed());
    assert_eq!(new.current_segment_id(), 0);
    assert_eq!(new.media_sequence(), 0);
    assert!(new.index_manifest().ends_with("URI=\"fragment/0/0/cubic.m4s\"\n"));
    assert_eq!(video_sample_entry(&new.init_segment()), ("avc1".to_string(), 1920, 1080));
}

#[test]
fn test_master_playlist_sorted_by_resolution() {
    let mut writer = MultiRenditionWriter::new(2, RenditionOptions::default());
    let sources = [
        ("rtsp://a", 1920, 1080),
        ("rtsp://b", 320, 180),
        ("rtsp://c", 1280, 720),
    ];
    for (url, w, h) in sources {
        writer.write_packet(&video(url, &h264(w, h), 0, 40, true)).unwrap();
    }

    let master = writer.master_playlist();
    let resolutions: Vec<&str> = master
        .lines()
        .filter_map(|l| l.split("RESOLUTION=").nth(1))
        .map(|rest| rest.split(',').next().unwrap())
        .collect();
    assert_eq!(resolutions, vec!["320x180", "1280x720", "1920x1080"]);

    let uris: Vec<&str> = master.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(uris, vec!["2/0/cubic.m3u8", "2/1/cubic.m3u8", "2/2/cubic.m3u8"]);
    assert!(master.contains("BANDWIDTH=115200,"));
}

#[test]
fn test_unsupported_codec_is_not_listed() {
    let mut writer = MultiRenditionWriter::new(0, RenditionOptions::default());
    let mut mjpeg = (*h264(640, 360)).clone();
    mjpeg.codec = CodecKind::Mjpeg;
    let mjpeg = Arc::new(mjpeg);

    writer.write_packet(&video("rtsp://ok", &h264(640, 360), 0, 40, true)).unwrap();
    assert_matches!(
        writer.write_packet(&video("rtsp://mjpeg", &mjpeg, 0, 40, true)),
        Err(Error::UnsupportedCodec(_))
    );
    assert_matches!(
        writer.write_packet(&video("rtsp://mjpeg", &mjpeg, 1, 40, false)),
        Err(Error::RenditionUnavailable(url)) if url == "rtsp://mjpeg"
    );
    assert_eq!(writer.len(), 1);
    assert!(!writer.master_playlist().contains("mjpeg"));
}

#[tokio::test]
async fn test_blocking_index_two_segments_ahead() {
    let pair = CodecParametersPair::new(URL).with_video((*h264(640, 360)).clone());
    let muxer = Arc::new(RenditionMuxer::new(pair, RenditionOptions::default()).unwrap());

    let reader = {
        let muxer = Arc::clone(&muxer);
        tokio::spawn(async move {
            muxer
                .get_index_manifest(Some(2), None, &Deadline::after(Duration::from_secs(5)))
                .await
        })
    };

    // each segment is 52 frames of 40 ms
    feed(&muxer, URL, 0, 52);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!reader.is_finished());

    feed(&muxer, URL, 52, 52);
    let m3u8 = reader.await.unwrap().unwrap();
    assert!(m3u8.contains("segment/0/cubic.m4s\n"));
    assert!(m3u8.contains("segment/1/cubic.m4s\n"));
    assert!(m3u8.ends_with("#EXT-X-PRELOAD-HINT:TYPE=PART,URI=\"fragment/2/0/cubic.m4s\"\n"));
}

#[tokio::test]
async fn test_blocking_index_cancelled() {
    let pair = CodecParametersPair::new(URL).with_video((*h264(640, 360)).clone());
    let muxer = Arc::new(RenditionMuxer::new(pair, RenditionOptions::default()).unwrap());
    let token = CancellationToken::new();

    let reader = {
        let muxer = Arc::clone(&muxer);
        let deadline = Deadline::new(token.clone());
        tokio::spawn(async move { muxer.get_index_manifest(Some(2), None, &deadline).await })
    };
    feed(&muxer, URL, 0, 52);
    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    assert_matches!(reader.await.unwrap(), Err(Error::Cancelled));
    assert_eq!(muxer.current_segment_id(), 1);
}

#[tokio::test]
async fn test_streamer_end_to_end() {
    let config = HlsConfig {
        writer_id: 7,
        read_timeout_ms: 500,
        ..HlsConfig::default()
    };
    let stop = CancellationToken::new();
    let (hls, worker) = HlsStreamer::start(&config, stop.clone());

    let sd = h264(640, 360);
    let hd = h264(1280, 720);
    for i in 0..60 {
        hls.write_packet(video("rtsp://hd", &hd, i, 40, i % 25 == 0)).await.unwrap();
        hls.write_packet(video("rtsp://sd", &sd, i, 40, i % 25 == 0)).await.unwrap();
    }
    hls.flush().await.unwrap();

    assert_eq!(hls.rendition_count(), 2);
    assert!(hls.master_playlist().contains("7/1/cubic.m3u8"));
    assert_eq!(hls.rendition(0).unwrap().params().url, "rtsp://sd");

    let m3u8 = hls.index_manifest(1, Some(1), None).await.unwrap();
    assert!(m3u8.contains("#EXT-X-PART:DURATION=0.52000,INDEPENDENT=YES,URI=\"fragment/0/0/cubic.m4s\""));
    assert!(m3u8.contains("#EXT-X-PART:DURATION=0.52000,URI=\"fragment/0/2/cubic.m4s\""));

    let segment = hls.segment(1, 0).await.unwrap();
    assert_eq!(kinds(&segment), vec!["styp", "sidx", "moof", "mdat"]);
    assert_matches!(hls.segment(1, 1).await, Err(Error::Timeout(_)));

    hls.remove_source("rtsp://sd").await.unwrap();
    hls.flush().await.unwrap();
    assert_eq!(hls.rendition_count(), 1);
    assert_eq!(hls.rendition(0).unwrap().params().url, "rtsp://hd");

    stop.cancel();
    worker.await.unwrap();
    assert_matches!(hls.flush().await, Err(Error::Closed));
}
