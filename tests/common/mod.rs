//! Shared helpers for integration tests.
//!
//! Packet builders plus a minimal ISO BMFF reader, enough to walk the boxes
//! this crate writes and decode `tfhd`/`trun` back into samples.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use llhls_common::{AudioCodecParameters, Packet, PacketBase, VideoCodecParameters};

pub const AVCC: &[u8] = &[
    0x01, 0x64, 0x00, 0x1F, 0xFF, 0xE1, 0x00, 0x04, 0x67, 0x64, 0x00, 0x1F, 0x01, 0x00, 0x02,
    0x68, 0xEB,
];

pub fn h264(width: u32, height: u32) -> Arc<VideoCodecParameters> {
    Arc::new(VideoCodecParameters::h264(
        width,
        height,
        25,
        u64::from(width) * u64::from(height) * 2,
        Bytes::from_static(AVCC),
    ))
}

pub fn aac() -> Arc<AudioCodecParameters> {
    Arc::new(AudioCodecParameters::aac(
        48_000,
        2,
        128_000,
        Bytes::from_static(&[0x11, 0x90]),
    ))
}

/// Video packet `index` of a stream with fixed `frame_ms` spacing.
pub fn video(
    url: &str,
    codec: &Arc<VideoCodecParameters>,
    index: u64,
    frame_ms: u64,
    keyframe: bool,
) -> Packet {
    let size = if keyframe { 400 } else { 100 + (index % 3) as usize };
    let mut base = PacketBase::new(url, Bytes::from(vec![index as u8; size]));
    base.timestamp = Duration::from_millis(index * frame_ms);
    base.duration = Duration::from_millis(frame_ms);
    Packet::video(base, keyframe, Arc::clone(codec))
}

pub fn audio(url: &str, codec: &Arc<AudioCodecParameters>, index: u64, frame_ms: u64) -> Packet {
    let mut base = PacketBase::new(url, Bytes::from(vec![0xA0; 64]));
    base.timestamp = Duration::from_millis(index * frame_ms);
    base.duration = Duration::from_millis(frame_ms);
    Packet::audio(base, Arc::clone(codec))
}

pub fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

pub fn read_u64(data: &[u8], offset: usize) -> u64 {
    (u64::from(read_u32(data, offset)) << 32) | u64::from(read_u32(data, offset + 4))
}

/// One box: its type and payload (without the 8-byte header).
#[derive(Debug, Clone, Copy)]
pub struct Mp4Box<'a> {
    pub kind: [u8; 4],
    pub payload: &'a [u8],
}

impl<'a> Mp4Box<'a> {
    pub fn kind_str(&self) -> &str {
        std::str::from_utf8(&self.kind).unwrap()
    }

    pub fn children(&self) -> Vec<Mp4Box<'a>> {
        boxes(self.payload)
    }

    pub fn child(&self, kind: &[u8; 4]) -> Mp4Box<'a> {
        find(self.payload, kind)
    }
}

/// Top-level boxes of `data`, in order.
pub fn boxes(data: &[u8]) -> Vec<Mp4Box<'_>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos + 8 <= data.len() {
        let size = read_u32(data, pos) as usize;
        assert!(size >= 8 && pos + size <= data.len(), "bad box size {size} at {pos}");
        let mut kind = [0u8; 4];
        kind.copy_from_slice(&data[pos + 4..pos + 8]);
        out.push(Mp4Box {
            kind,
            payload: &data[pos + 8..pos + size],
        });
        pos += size;
    }
    assert_eq!(pos, data.len(), "trailing bytes");
    out
}

pub fn find<'a>(data: &'a [u8], kind: &[u8; 4]) -> Mp4Box<'a> {
    boxes(data)
        .into_iter()
        .find(|b| &b.kind == kind)
        .unwrap_or_else(|| panic!("no {} box", String::from_utf8_lossy(kind)))
}

pub fn kinds(data: &[u8]) -> Vec<String> {
    boxes(data).iter().map(|b| b.kind_str().to_string()).collect()
}

/// Track id and media timescale of every `trak` in an init segment.
pub fn track_timescales(init: &[u8]) -> Vec<(u32, u32)> {
    let moov = find(init, b"moov");
    moov.children()
        .into_iter()
        .filter(|b| &b.kind == b"trak")
        .map(|trak| {
            let tkhd = trak.child(b"tkhd");
            // tkhd v1: 64-bit creation and modification times, then track id
            let track_id = read_u32(tkhd.payload, 20);
            let mdhd = trak.child(b"mdia").child(b"mdhd");
            // mdhd v1: 64-bit creation and modification times
            let timescale = read_u32(mdhd.payload, 20);
            (track_id, timescale)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedSample {
    pub duration: u32,
    pub size: u32,
    pub flags: u32,
}

impl ParsedSample {
    pub fn is_sync(&self) -> bool {
        self.flags & 0x0001_0000 == 0
    }
}

#[derive(Debug, Clone)]
pub struct ParsedTraf {
    pub track_id: u32,
    pub base_decode_time: u64,
    pub data_offset: i32,
    pub samples: Vec<ParsedSample>,
}

/// Decode every `traf` of a `moof`, applying `tfhd` defaults.
pub fn parse_moof(moof: &Mp4Box<'_>) -> Vec<ParsedTraf> {
    moof.children()
        .into_iter()
        .filter(|b| &b.kind == b"traf")
        .map(|traf| parse_traf(&traf))
        .collect()
}

fn parse_traf(traf: &Mp4Box<'_>) -> ParsedTraf {
    let tfhd = traf.child(b"tfhd").payload;
    let tfhd_flags = read_u32(tfhd, 0) & 0x00FF_FFFF;
    let track_id = read_u32(tfhd, 4);
    let mut pos = 8;
    if tfhd_flags & 0x01 != 0 {
        pos += 8;
    }
    if tfhd_flags & 0x02 != 0 {
        pos += 4;
    }
    let mut field = |flag: u32| {
        if tfhd_flags & flag != 0 {
            let v = read_u32(tfhd, pos);
            pos += 4;
            v
        } else {
            0
        }
    };
    let default_duration = field(0x08);
    let default_size = field(0x10);
    let default_flags = field(0x20);

    let tfdt = traf.child(b"tfdt").payload;
    let base_decode_time = if tfdt[0] == 1 {
        read_u64(tfdt, 4)
    } else {
        u64::from(read_u32(tfdt, 4))
    };

    let trun = traf.child(b"trun").payload;
    let flags = read_u32(trun, 0) & 0x00FF_FFFF;
    let count = read_u32(trun, 4) as usize;
    let mut pos = 8;
    let mut data_offset = 0;
    if flags & 0x001 != 0 {
        data_offset = read_u32(trun, pos) as i32;
        pos += 4;
    }
    let mut first_flags = None;
    if flags & 0x004 != 0 {
        first_flags = Some(read_u32(trun, pos));
        pos += 4;
    }

    let mut samples = Vec::with_capacity(count);
    for i in 0..count {
        let mut next = |flag: u32, default: u32| {
            if flags & flag != 0 {
                let v = read_u32(trun, pos);
                pos += 4;
                v
            } else {
                default
            }
        };
        let duration = next(0x100, default_duration);
        let size = next(0x200, default_size);
        let sample_default = match (i, first_flags) {
            (0, Some(f)) => f,
            _ => default_flags,
        };
        let flags = next(0x400, sample_default);
        samples.push(ParsedSample {
            duration,
            size,
            flags,
        });
    }
    assert_eq!(pos, trun.len(), "trun length mismatch");

    ParsedTraf {
        track_id,
        base_decode_time,
        data_offset,
        samples,
    }
}

/// Sample entry type and coded size of the first video track.
pub fn video_sample_entry(init: &[u8]) -> (String, u16, u16) {
    let trak = find(init, b"moov").child(b"trak");
    let stsd = trak
        .child(b"mdia")
        .child(b"minf")
        .child(b"stbl")
        .child(b"stsd");
    // full box header and entry count precede the entries
    let entry = boxes(&stsd.payload[8..])[0];
    let width = u16::from_be_bytes([entry.payload[24], entry.payload[25]]);
    let height = u16::from_be_bytes([entry.payload[26], entry.payload[27]]);
    (entry.kind_str().to_string(), width, height)
}

/// Offset of `inner` within `outer`.
pub fn offset_of(outer: &[u8], inner: &[u8]) -> usize {
    inner.as_ptr() as usize - outer.as_ptr() as usize
}
