//! ISO BMFF box serialization for the initialization segment.
//!
//! Each box follows the standard layout: 4-byte size (big-endian u32),
//! 4-byte type (ASCII), then box-specific content. Container boxes are
//! opened with a placeholder size and patched once their children are in
//! the buffer.

use bytes::{BufMut, BytesMut};
use llhls_common::{AudioCodecParameters, CodecKind, Error, Result, VideoCodecParameters};

use super::clamp::{clamp_u16, clamp_u32};

/// Brands advertised by both `ftyp` and `styp`.
pub(crate) const MAJOR_BRAND: &[u8; 4] = b"isom";
pub(crate) const MINOR_VERSION: u32 = 0x200;
pub(crate) const COMPATIBLE_BRANDS: [&[u8; 4]; 4] = [b"iso6", b"avc1", b"mp41", b"dash"];

const DEFAULT_AUDIO_BITRATE: u32 = 128_000;

// ---------------------------------------------------------------------------
// Low-level box writing helpers
// ---------------------------------------------------------------------------

/// Open a box: placeholder size + type. Returns the box start for [`end_box`].
pub(crate) fn begin_box(buf: &mut BytesMut, box_type: &[u8; 4]) -> usize {
    let start = buf.len();
    buf.put_u32(0); // placeholder size
    buf.put_slice(box_type);
    start
}

/// Patch the size of the box opened at `start`.
pub(crate) fn end_box(buf: &mut BytesMut, start: usize) {
    let size = clamp_u32((buf.len() - start) as u64, "box size");
    buf[start..start + 4].copy_from_slice(&size.to_be_bytes());
}

/// Write a complete leaf box around an opaque payload.
pub(crate) fn write_box(buf: &mut BytesMut, box_type: &[u8; 4], content: &[u8]) {
    let start = begin_box(buf, box_type);
    buf.put_slice(content);
    end_box(buf, start);
}

/// Full box header (version + flags).
pub(crate) fn put_fullbox_header(buf: &mut BytesMut, version: u8, flags: u32) {
    buf.put_u32(((version as u32) << 24) | (flags & 0x00FF_FFFF));
}

/// Brand list shared by `ftyp` and `styp`.
pub(crate) fn put_brands(buf: &mut BytesMut) {
    buf.put_slice(MAJOR_BRAND);
    buf.put_u32(MINOR_VERSION);
    for brand in COMPATIBLE_BRANDS {
        buf.put_slice(brand);
    }
}

// ---------------------------------------------------------------------------
// ftyp box
// ---------------------------------------------------------------------------

pub(crate) fn write_ftyp(buf: &mut BytesMut) {
    let start = begin_box(buf, b"ftyp");
    put_brands(buf);
    end_box(buf, start);
}

// ---------------------------------------------------------------------------
// mvhd box (movie header, version 1 for 64-bit times)
// ---------------------------------------------------------------------------

pub(crate) fn write_mvhd(buf: &mut BytesMut, timescale: u32, next_track_id: u32) {
    buf.put_u32(120);
    buf.put_slice(b"mvhd");
    put_fullbox_header(buf, 1, 0);
    // creation_time, modification_time
    buf.put_u64(0);
    buf.put_u64(0);
    buf.put_u32(timescale);
    // duration: unknown for live
    buf.put_u64(0);
    // rate = 1.0 (fixed 16.16)
    buf.put_u32(0x00010000);
    // volume = 1.0 (fixed 8.8)
    buf.put_u16(0x0100);
    // reserved (2 + 8 bytes)
    buf.put_bytes(0, 10);
    put_matrix(buf);
    // pre_defined (6 * 4 bytes)
    buf.put_bytes(0, 24);
    buf.put_u32(next_track_id);
}

fn put_matrix(buf: &mut BytesMut) {
    for value in [0x00010000u32, 0, 0, 0, 0x00010000, 0, 0, 0, 0x40000000] {
        buf.put_u32(value);
    }
}

// ---------------------------------------------------------------------------
// tkhd box (track header, version 1)
// ---------------------------------------------------------------------------

pub(crate) fn write_tkhd(buf: &mut BytesMut, track_id: u32, is_video: bool, width: u32, height: u32) {
    buf.put_u32(104);
    buf.put_slice(b"tkhd");
    // flags = 7 (enabled | in_movie | in_preview)
    put_fullbox_header(buf, 1, 7);
    buf.put_u64(0);
    buf.put_u64(0);
    buf.put_u32(track_id);
    // reserved
    buf.put_u32(0);
    // duration
    buf.put_u64(0);
    // reserved (2 * u32)
    buf.put_bytes(0, 8);
    // layer
    buf.put_u16(0);
    // alternate_group: audio tracks form group 1
    buf.put_u16(if is_video { 0 } else { 1 });
    // volume
    buf.put_u16(if is_video { 0 } else { 0x0100 });
    buf.put_u16(0);
    put_matrix(buf);
    // width and height (16.16 fixed point)
    let width = u32::from(clamp_u16(u64::from(width), "tkhd width"));
    let height = u32::from(clamp_u16(u64::from(height), "tkhd height"));
    buf.put_u32(width << 16);
    buf.put_u32(height << 16);
}

// ---------------------------------------------------------------------------
// mdhd box (media header, version 1)
// ---------------------------------------------------------------------------

pub(crate) fn write_mdhd(buf: &mut BytesMut, timescale: u32) {
    buf.put_u32(44);
    buf.put_slice(b"mdhd");
    put_fullbox_header(buf, 1, 0);
    buf.put_u64(0);
    buf.put_u64(0);
    buf.put_u32(timescale);
    buf.put_u64(0);
    // language: undetermined
    buf.put_u16(0x55C4);
    buf.put_u16(0);
}

// ---------------------------------------------------------------------------
// hdlr box (handler reference)
// ---------------------------------------------------------------------------

pub(crate) fn write_hdlr(buf: &mut BytesMut, handler_type: &[u8; 4], name: &[u8]) {
    let start = begin_box(buf, b"hdlr");
    put_fullbox_header(buf, 0, 0);
    buf.put_u32(0);
    buf.put_slice(handler_type);
    buf.put_bytes(0, 12);
    buf.put_slice(name);
    buf.put_u8(0);
    end_box(buf, start);
}

// ---------------------------------------------------------------------------
// dinf, vmhd, smhd
// ---------------------------------------------------------------------------

pub(crate) fn write_dinf(buf: &mut BytesMut) {
    let dinf = begin_box(buf, b"dinf");
    let dref = begin_box(buf, b"dref");
    put_fullbox_header(buf, 0, 0);
    buf.put_u32(1);
    // self-contained data reference
    buf.put_u32(12);
    buf.put_slice(b"url ");
    put_fullbox_header(buf, 0, 1);
    end_box(buf, dref);
    end_box(buf, dinf);
}

pub(crate) fn write_vmhd(buf: &mut BytesMut) {
    buf.put_u32(20);
    buf.put_slice(b"vmhd");
    put_fullbox_header(buf, 0, 1);
    // graphicsmode + opcolor
    buf.put_bytes(0, 8);
}

pub(crate) fn write_smhd(buf: &mut BytesMut) {
    buf.put_u32(16);
    buf.put_slice(b"smhd");
    put_fullbox_header(buf, 0, 0);
    // balance + reserved
    buf.put_bytes(0, 4);
}

// ---------------------------------------------------------------------------
// stsd (sample description)
// ---------------------------------------------------------------------------

/// Sample entry and decoder configuration box types for a video codec.
fn video_entry_types(codec: CodecKind) -> Result<(&'static [u8; 4], &'static [u8; 4])> {
    match codec {
        CodecKind::H264 => Ok((b"avc1", b"avcC")),
        CodecKind::H265 => Ok((b"hev1", b"hvcC")),
        other => Err(Error::unsupported(other.to_string())),
    }
}

fn write_video_stsd(
    buf: &mut BytesMut,
    entry_type: &[u8; 4],
    config_type: &[u8; 4],
    params: &VideoCodecParameters,
) {
    let stsd = begin_box(buf, b"stsd");
    put_fullbox_header(buf, 0, 0);
    buf.put_u32(1);

    let entry = begin_box(buf, entry_type);
    // reserved (6 bytes) + data reference index
    buf.put_bytes(0, 6);
    buf.put_u16(1);
    // pre_defined + reserved
    buf.put_bytes(0, 16);
    buf.put_u16(clamp_u16(u64::from(params.width), "sample entry width"));
    buf.put_u16(clamp_u16(u64::from(params.height), "sample entry height"));
    // 72 dpi horizontal and vertical
    buf.put_u32(0x00480000);
    buf.put_u32(0x00480000);
    buf.put_u32(0);
    // frame count
    buf.put_u16(1);
    // compressor name
    buf.put_bytes(0, 32);
    // depth
    buf.put_u16(0x0018);
    buf.put_i16(-1);

    if !params.decoder_config.is_empty() {
        write_box(buf, config_type, &params.decoder_config);
    }
    end_box(buf, entry);
    end_box(buf, stsd);
}

fn write_audio_stsd(buf: &mut BytesMut, track_id: u32, params: &AudioCodecParameters) {
    let stsd = begin_box(buf, b"stsd");
    put_fullbox_header(buf, 0, 0);
    buf.put_u32(1);

    let entry = begin_box(buf, b"mp4a");
    buf.put_bytes(0, 6);
    buf.put_u16(1);
    // reserved (2 * u32)
    buf.put_bytes(0, 8);
    buf.put_u16(params.channels);
    // sample size
    buf.put_u16(16);
    // pre_defined + reserved
    buf.put_bytes(0, 4);
    // sample rate (fixed 16.16)
    let rate = u32::from(clamp_u16(u64::from(params.sample_rate), "sample rate"));
    buf.put_u32(rate << 16);
    write_esds(buf, track_id, params);
    end_box(buf, entry);
    end_box(buf, stsd);
}

// ---------------------------------------------------------------------------
// esds (MPEG-4 elementary stream descriptor)
// ---------------------------------------------------------------------------

/// Open a descriptor with a 4-byte expandable length, patched by [`end_descriptor`].
fn begin_descriptor(buf: &mut BytesMut, tag: u8) -> usize {
    buf.put_u8(tag);
    let start = buf.len();
    buf.put_bytes(0, 4);
    start
}

fn end_descriptor(buf: &mut BytesMut, start: usize) {
    let len = (buf.len() - start - 4).min(0x0FFF_FFFF);
    buf[start..start + 4].copy_from_slice(&[
        0x80 | ((len >> 21) & 0x7F) as u8,
        0x80 | ((len >> 14) & 0x7F) as u8,
        0x80 | ((len >> 7) & 0x7F) as u8,
        (len & 0x7F) as u8,
    ]);
}

pub(crate) fn write_esds(buf: &mut BytesMut, track_id: u32, params: &AudioCodecParameters) {
    let bitrate = match params.bitrate {
        0 => DEFAULT_AUDIO_BITRATE,
        b => clamp_u32(b, "esds bitrate"),
    };

    let esds = begin_box(buf, b"esds");
    put_fullbox_header(buf, 0, 0);

    let es = begin_descriptor(buf, 0x03);
    buf.put_u16(clamp_u16(u64::from(track_id), "ES_ID"));
    buf.put_u8(0);

    let dcd = begin_descriptor(buf, 0x04);
    // objectTypeIndication: MPEG-4 audio
    buf.put_u8(0x40);
    // streamType audio (0x05) << 2 | reserved bit
    buf.put_u8(0x15);
    // bufferSizeDB (24 bits)
    buf.put_bytes(0, 3);
    buf.put_u32(bitrate);
    buf.put_u32(bitrate);
    let decoder_specific = begin_descriptor(buf, 0x05);
    buf.put_slice(&params.decoder_config);
    end_descriptor(buf, decoder_specific);
    end_descriptor(buf, dcd);

    let sl_config = begin_descriptor(buf, 0x06);
    buf.put_u8(0x02);
    end_descriptor(buf, sl_config);

    end_descriptor(buf, es);
    end_box(buf, esds);
}

// ---------------------------------------------------------------------------
// stbl, minf, mdia, trak
// ---------------------------------------------------------------------------

fn write_empty_table(buf: &mut BytesMut, box_type: &[u8; 4]) {
    buf.put_u32(16);
    buf.put_slice(box_type);
    put_fullbox_header(buf, 0, 0);
    buf.put_u32(0);
}

/// Empty `stts`, `stsc`, `stsz` and `stco`; samples live in the fragments.
fn write_empty_sample_tables(buf: &mut BytesMut) {
    write_empty_table(buf, b"stts");
    write_empty_table(buf, b"stsc");
    buf.put_u32(20);
    buf.put_slice(b"stsz");
    put_fullbox_header(buf, 0, 0);
    // sample size + sample count
    buf.put_bytes(0, 8);
    write_empty_table(buf, b"stco");
}

pub(crate) fn write_video_trak(
    buf: &mut BytesMut,
    track_id: u32,
    timescale: u32,
    params: &VideoCodecParameters,
) -> Result<()> {
    let (entry_type, config_type) = video_entry_types(params.codec)?;

    let trak = begin_box(buf, b"trak");
    write_tkhd(buf, track_id, true, params.width, params.height);
    let mdia = begin_box(buf, b"mdia");
    write_mdhd(buf, timescale);
    write_hdlr(buf, b"vide", b"VideoHandler");
    let minf = begin_box(buf, b"minf");
    write_vmhd(buf);
    write_dinf(buf);
    let stbl = begin_box(buf, b"stbl");
    write_video_stsd(buf, entry_type, config_type, params);
    write_empty_sample_tables(buf);
    end_box(buf, stbl);
    end_box(buf, minf);
    end_box(buf, mdia);
    end_box(buf, trak);
    Ok(())
}

pub(crate) fn write_audio_trak(
    buf: &mut BytesMut,
    track_id: u32,
    timescale: u32,
    params: &AudioCodecParameters,
) -> Result<()> {
    if params.codec != CodecKind::Aac {
        return Err(Error::unsupported(params.codec.to_string()));
    }

    let trak = begin_box(buf, b"trak");
    write_tkhd(buf, track_id, false, 0, 0);
    let mdia = begin_box(buf, b"mdia");
    write_mdhd(buf, timescale);
    write_hdlr(buf, b"soun", b"SoundHandler");
    let minf = begin_box(buf, b"minf");
    write_smhd(buf);
    write_dinf(buf);
    let stbl = begin_box(buf, b"stbl");
    write_audio_stsd(buf, track_id, params);
    write_empty_sample_tables(buf);
    end_box(buf, stbl);
    end_box(buf, minf);
    end_box(buf, mdia);
    end_box(buf, trak);
    Ok(())
}

// ---------------------------------------------------------------------------
// mvex / moov
// ---------------------------------------------------------------------------

pub(crate) fn write_trex(buf: &mut BytesMut, track_id: u32) {
    buf.put_u32(32);
    buf.put_slice(b"trex");
    put_fullbox_header(buf, 0, 0);
    buf.put_u32(track_id);
    // default sample description index
    buf.put_u32(1);
    // default duration, size, flags
    buf.put_bytes(0, 12);
}

/// `moov` for the given `(track_id, trak)` pairs.
pub(crate) fn write_moov(buf: &mut BytesMut, tracks: &[(u32, &[u8])]) {
    let next_track_id = tracks.iter().map(|(id, _)| id + 1).max().unwrap_or(1);

    let moov = begin_box(buf, b"moov");
    write_mvhd(buf, 1000, next_track_id);
    for (_, trak) in tracks {
        buf.put_slice(trak);
    }
    let mvex = begin_box(buf, b"mvex");
    for (id, _) in tracks {
        write_trex(buf, *id);
    }
    end_box(buf, mvex);
    end_box(buf, moov);
}

// ---------------------------------------------------------------------------
// mdat
// ---------------------------------------------------------------------------

/// `mdat` header only; the caller appends the payload. Switches to a 64-bit
/// large size when the payload does not fit a 32-bit box.
pub(crate) fn write_mdat_header(buf: &mut BytesMut, data_size: u64) {
    if data_size + 8 > u32::MAX as u64 {
        buf.put_u32(1);
        buf.put_slice(b"mdat");
        buf.put_u64(data_size + 16);
    } else {
        buf.put_u32((data_size + 8) as u32);
        buf.put_slice(b"mdat");
    }
}
