//! Fragmented MP4 muxer for one rendition.
//!
//! The muxer owns at most one video and one audio [`Track`]. Packets are
//! accumulated with [`Fmp4Muxer::write_packet`] and turned into a
//! `styp` + `sidx`* + `moof` + `mdat` payload by [`Fmp4Muxer::fragment`].

use bytes::{BufMut, Bytes, BytesMut};
use llhls_common::{CodecParametersPair, Error, Packet, Result};

use super::boxes::{write_ftyp, write_mdat_header, write_moov};
use super::clamp::clamp_i32;
use super::fragment::{Mfhd, Moof, Mp4Box, Styp};
use super::track::Track;

#[derive(Debug, Clone)]
pub struct Fmp4Muxer {
    video: Option<Track>,
    audio: Option<Track>,
}

impl Fmp4Muxer {
    /// Build the tracks for `params`. Fails before producing any bytes when a
    /// codec cannot be carried in fMP4.
    pub fn new(params: &CodecParametersPair) -> Result<Self> {
        if params.is_empty() {
            return Err(Error::NoCodecData);
        }

        let mut next_id = 1;
        let video = match &params.video {
            Some(v) => {
                if !v.codec.is_video() {
                    return Err(Error::unsupported(v.codec.to_string()));
                }
                let track = Track::video(next_id, v)?;
                next_id += 1;
                Some(track)
            }
            None => None,
        };
        let audio = match &params.audio {
            Some(a) => Some(Track::audio(next_id, a)?),
            None => None,
        };

        Ok(Self { video, audio })
    }

    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Whether a packet of this kind has a track to go to.
    pub fn accepts(&self, packet: &Packet) -> bool {
        match packet {
            Packet::Video(_) => self.video.is_some(),
            Packet::Audio(_) => self.audio.is_some(),
        }
    }

    /// A muxer with the same tracks and nothing accumulated.
    pub fn fresh(&self) -> Self {
        Self {
            video: self.video.as_ref().map(Track::fresh),
            audio: self.audio.as_ref().map(Track::fresh),
        }
    }

    fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.video.iter().chain(self.audio.iter())
    }

    /// `ftyp` + `moov` for the configured tracks.
    pub fn init_segment(&self) -> Bytes {
        let traks: Vec<(u32, &[u8])> = self
            .tracks()
            .map(|t| (t.info().track_id, &t.info().trak[..]))
            .collect();
        let capacity = 1024 + traks.iter().map(|(_, trak)| trak.len()).sum::<usize>();
        let mut buf = BytesMut::with_capacity(capacity);
        write_ftyp(&mut buf);
        write_moov(&mut buf, &traks);
        buf.freeze()
    }

    pub fn write_packet(&mut self, packet: Packet) -> Result<()> {
        let track = match &packet {
            Packet::Video(_) => self.video.as_mut().ok_or(Error::TrackMissing("video"))?,
            Packet::Audio(_) => self.audio.as_mut().ok_or(Error::TrackMissing("audio"))?,
        };
        track.push(packet);
        Ok(())
    }

    /// Serialize everything accumulated so far and reset the tracks.
    pub fn fragment(&mut self, sequence_number: u32) -> Bytes {
        let active: Vec<&Track> = self.tracks().filter(|t| !t.is_empty()).collect();
        let data_size: u64 = active.iter().map(|t| t.data_size()).sum();

        let mut buf = BytesMut::with_capacity(1024 + data_size as usize);
        Styp.write(&mut buf);
        for track in &active {
            track.sidx().write(&mut buf);
        }

        let moof_start = buf.len();
        let moof = Moof {
            mfhd: Mfhd { sequence_number },
            trafs: active.iter().map(|t| t.traf()).collect(),
        };
        let data_offset_positions = moof.write(&mut buf);
        write_mdat_header(&mut buf, data_size);

        // Track data follows the mdat header in track order.
        let mut offset = (buf.len() - moof_start) as u64;
        for (pos, track) in data_offset_positions.into_iter().zip(&active) {
            let data_offset = clamp_i32(offset, "trun data offset");
            buf[pos..pos + 4].copy_from_slice(&data_offset.to_be_bytes());
            offset += track.data_size();
        }

        drop(active);
        for track in self.video.iter_mut().chain(self.audio.iter_mut()) {
            for packet in track.take() {
                buf.put_slice(packet.data());
            }
        }
        buf.freeze()
    }
}
