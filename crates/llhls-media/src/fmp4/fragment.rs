//! Movie fragment boxes: `styp`, `sidx`, `moof` and its children.
//!
//! Unlike the init boxes these are built per read. The `trun` data offset is
//! written as a placeholder and patched by the muxer once the `mdat` header
//! position is known.

use bytes::{BufMut, BytesMut};

use super::boxes::{begin_box, end_box, put_brands, put_fullbox_header};
use super::clamp::clamp_u32;

// tfhd flags
pub(crate) const TFHD_DEFAULT_DURATION: u32 = 0x00_0008;
pub(crate) const TFHD_DEFAULT_SIZE: u32 = 0x00_0010;
pub(crate) const TFHD_DEFAULT_FLAGS: u32 = 0x00_0020;
pub(crate) const TFHD_DEFAULT_BASE_IS_MOOF: u32 = 0x02_0000;

// trun flags
pub(crate) const TRUN_DATA_OFFSET: u32 = 0x00_0001;
pub(crate) const TRUN_FIRST_SAMPLE_FLAGS: u32 = 0x00_0004;
pub(crate) const TRUN_SAMPLE_DURATION: u32 = 0x00_0100;
pub(crate) const TRUN_SAMPLE_SIZE: u32 = 0x00_0200;
pub(crate) const TRUN_SAMPLE_FLAGS: u32 = 0x00_0400;

/// Sample depends on others and is not a sync sample.
pub const SAMPLE_NON_KEYFRAME: u32 = 0x0101_0000;
/// Sample does not depend on others (a keyframe).
pub const SAMPLE_NO_DEPENDENCIES: u32 = 0x0200_0000;

/// A box serialized into a shared fragment buffer.
pub(crate) trait Mp4Box {
    fn box_type(&self) -> &'static [u8; 4];

    fn write_content(&self, buf: &mut BytesMut);

    fn write(&self, buf: &mut BytesMut) {
        let start = begin_box(buf, self.box_type());
        self.write_content(buf);
        end_box(buf, start);
    }
}

pub(crate) struct Styp;

impl Mp4Box for Styp {
    fn box_type(&self) -> &'static [u8; 4] {
        b"styp"
    }

    fn write_content(&self, buf: &mut BytesMut) {
        put_brands(buf);
    }
}

/// Segment index (version 1) with a single media reference.
pub(crate) struct Sidx {
    pub reference_id: u32,
    pub timescale: u32,
    pub earliest_presentation_time: u64,
    /// 31-bit referenced size.
    pub referenced_size: u32,
    pub subsegment_duration: u32,
}

impl Mp4Box for Sidx {
    fn box_type(&self) -> &'static [u8; 4] {
        b"sidx"
    }

    fn write_content(&self, buf: &mut BytesMut) {
        put_fullbox_header(buf, 1, 0);
        buf.put_u32(self.reference_id);
        buf.put_u32(self.timescale);
        buf.put_u64(self.earliest_presentation_time);
        // first_offset
        buf.put_u64(0);
        // reserved + reference_count
        buf.put_u16(0);
        buf.put_u16(1);
        // reference_type 0 (media)
        buf.put_u32(self.referenced_size & 0x7FFF_FFFF);
        buf.put_u32(self.subsegment_duration);
        // starts_with_SAP = 1, SAP_type = 0, SAP_delta_time = 0
        buf.put_u32(1 << 31);
    }
}

pub(crate) struct Mfhd {
    pub sequence_number: u32,
}

impl Mp4Box for Mfhd {
    fn box_type(&self) -> &'static [u8; 4] {
        b"mfhd"
    }

    fn write_content(&self, buf: &mut BytesMut) {
        put_fullbox_header(buf, 0, 0);
        buf.put_u32(self.sequence_number);
    }
}

pub(crate) struct Tfhd {
    pub track_id: u32,
    pub flags: u32,
    pub default_duration: u32,
    pub default_size: u32,
    pub default_flags: u32,
}

impl Mp4Box for Tfhd {
    fn box_type(&self) -> &'static [u8; 4] {
        b"tfhd"
    }

    fn write_content(&self, buf: &mut BytesMut) {
        put_fullbox_header(buf, 0, self.flags);
        buf.put_u32(self.track_id);
        if self.flags & TFHD_DEFAULT_DURATION != 0 {
            buf.put_u32(self.default_duration);
        }
        if self.flags & TFHD_DEFAULT_SIZE != 0 {
            buf.put_u32(self.default_size);
        }
        if self.flags & TFHD_DEFAULT_FLAGS != 0 {
            buf.put_u32(self.default_flags);
        }
    }
}

/// Track fragment decode time, version 1 (64-bit).
pub(crate) struct Tfdt {
    pub base_media_decode_time: u64,
}

impl Mp4Box for Tfdt {
    fn box_type(&self) -> &'static [u8; 4] {
        b"tfdt"
    }

    fn write_content(&self, buf: &mut BytesMut) {
        put_fullbox_header(buf, 1, 0);
        buf.put_u64(self.base_media_decode_time);
    }
}

/// Per-sample values fed to [`Traf::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Sample {
    pub duration: u32,
    pub size: u32,
    pub flags: u32,
}

pub(crate) struct Trun {
    pub flags: u32,
    pub data_offset: i32,
    pub first_sample_flags: u32,
    pub samples: Vec<Sample>,
}

impl Mp4Box for Trun {
    fn box_type(&self) -> &'static [u8; 4] {
        b"trun"
    }

    fn write_content(&self, buf: &mut BytesMut) {
        put_fullbox_header(buf, 0, self.flags);
        let count = clamp_u32(self.samples.len() as u64, "trun sample count");
        buf.put_u32(count);
        if self.flags & TRUN_DATA_OFFSET != 0 {
            buf.put_i32(self.data_offset);
        }
        if self.flags & TRUN_FIRST_SAMPLE_FLAGS != 0 {
            buf.put_u32(self.first_sample_flags);
        }
        for sample in &self.samples {
            if self.flags & TRUN_SAMPLE_DURATION != 0 {
                buf.put_u32(sample.duration);
            }
            if self.flags & TRUN_SAMPLE_SIZE != 0 {
                buf.put_u32(sample.size);
            }
            if self.flags & TRUN_SAMPLE_FLAGS != 0 {
                buf.put_u32(sample.flags);
            }
        }
    }
}

pub(crate) struct Traf {
    pub tfhd: Tfhd,
    pub tfdt: Tfdt,
    pub trun: Trun,
}

impl Traf {
    /// Build the track fragment for `samples`, choosing tfhd defaults so the
    /// run only carries the per-sample fields that actually vary.
    ///
    /// Default duration and size come from the first sample. The default flags
    /// come from the second sample (the first one for single-sample runs), so
    /// a fragment opening on a keyframe marks only sample 0 as independent.
    pub(crate) fn new(track_id: u32, base_media_decode_time: u64, samples: Vec<Sample>) -> Self {
        let first = samples.first().copied().unwrap_or(Sample {
            duration: 0,
            size: 0,
            flags: SAMPLE_NON_KEYFRAME,
        });
        let default_flags = samples.get(1).map_or(first.flags, |s| s.flags);

        let mut trun_flags = TRUN_DATA_OFFSET;
        if first.flags != default_flags {
            trun_flags |= TRUN_FIRST_SAMPLE_FLAGS;
        }
        if samples.iter().any(|s| s.duration != first.duration) {
            trun_flags |= TRUN_SAMPLE_DURATION;
        }
        if samples.iter().any(|s| s.size != first.size) {
            trun_flags |= TRUN_SAMPLE_SIZE;
        }
        if samples
            .iter()
            .skip(1)
            .any(|s| s.flags == SAMPLE_NO_DEPENDENCIES)
        {
            trun_flags |= TRUN_SAMPLE_FLAGS;
        }

        Self {
            tfhd: Tfhd {
                track_id,
                flags: TFHD_DEFAULT_DURATION
                    | TFHD_DEFAULT_SIZE
                    | TFHD_DEFAULT_FLAGS
                    | TFHD_DEFAULT_BASE_IS_MOOF,
                default_duration: first.duration,
                default_size: first.size,
                default_flags,
            },
            tfdt: Tfdt {
                base_media_decode_time,
            },
            trun: Trun {
                flags: trun_flags,
                data_offset: 0,
                first_sample_flags: first.flags,
                samples,
            },
        }
    }

    /// Write the box and return the buffer position of the `trun` data offset.
    pub(crate) fn write(&self, buf: &mut BytesMut) -> usize {
        let start = begin_box(buf, b"traf");
        self.tfhd.write(buf);
        self.tfdt.write(buf);
        // trun header + version/flags + sample count
        let data_offset_pos = buf.len() + 16;
        self.trun.write(buf);
        end_box(buf, start);
        data_offset_pos
    }
}

pub(crate) struct Moof {
    pub mfhd: Mfhd,
    pub trafs: Vec<Traf>,
}

impl Moof {
    /// Write the box and return, per traf, the buffer position of its `trun`
    /// data offset so the caller can patch it once the `mdat` is placed.
    pub(crate) fn write(&self, buf: &mut BytesMut) -> Vec<usize> {
        let start = begin_box(buf, b"moof");
        self.mfhd.write(buf);
        let positions = self.trafs.iter().map(|traf| traf.write(buf)).collect();
        end_box(buf, start);
        positions
    }
}
