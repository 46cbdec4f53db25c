//! MPEG audio frame headers.
//!
//! Enough of the header to walk an encoded stream frame by frame: version,
//! layer, bitrate, sample rate, padding and channel mode.

use byteorder::{BigEndian, ByteOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Layer1,
    Layer2,
    Layer3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

impl ChannelMode {
    pub fn channel_count(self) -> usize {
        match self {
            ChannelMode::Mono => 1,
            _ => 2,
        }
    }
}

/// Decoded 4-byte frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: Layer,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub channel_mode: ChannelMode,
}

const BITRATES_V1_L1: [u32; 15] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448];
const BITRATES_V1_L2: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384];
const BITRATES_V1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const BITRATES_V2_L1: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
const BITRATES_V2_L23: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

const SAMPLE_RATES_V1: [u32; 3] = [44_100, 48_000, 32_000];

impl FrameHeader {
    /// Parse the header at the start of `bytes`.
    ///
    /// Returns `None` without a frame sync, for reserved field values, and
    /// for free-format streams (bitrate index 0).
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }
        let word = BigEndian::read_u32(&bytes[..4]);
        if word >> 21 != 0x7FF {
            return None;
        }

        let version = match (word >> 19) & 0b11 {
            0b00 => MpegVersion::Mpeg25,
            0b10 => MpegVersion::Mpeg2,
            0b11 => MpegVersion::Mpeg1,
            _ => return None,
        };
        let layer = match (word >> 17) & 0b11 {
            0b01 => Layer::Layer3,
            0b10 => Layer::Layer2,
            0b11 => Layer::Layer1,
            _ => return None,
        };

        let bitrate_index = ((word >> 12) & 0xF) as usize;
        if bitrate_index == 0 || bitrate_index == 0xF {
            return None;
        }
        let table = match (version, layer) {
            (MpegVersion::Mpeg1, Layer::Layer1) => &BITRATES_V1_L1,
            (MpegVersion::Mpeg1, Layer::Layer2) => &BITRATES_V1_L2,
            (MpegVersion::Mpeg1, Layer::Layer3) => &BITRATES_V1_L3,
            (_, Layer::Layer1) => &BITRATES_V2_L1,
            (_, _) => &BITRATES_V2_L23,
        };

        let rate_index = ((word >> 10) & 0b11) as usize;
        if rate_index == 3 {
            return None;
        }
        let sample_rate = match version {
            MpegVersion::Mpeg1 => SAMPLE_RATES_V1[rate_index],
            MpegVersion::Mpeg2 => SAMPLE_RATES_V1[rate_index] / 2,
            MpegVersion::Mpeg25 => SAMPLE_RATES_V1[rate_index] / 4,
        };

        let channel_mode = match (word >> 6) & 0b11 {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        };

        Some(Self {
            version,
            layer,
            bitrate_kbps: table[bitrate_index],
            sample_rate,
            padding: (word >> 9) & 1 == 1,
            channel_mode,
        })
    }

    /// PCM samples per channel carried by one frame
    pub fn samples_per_frame(&self) -> usize {
        match (self.layer, self.version) {
            (Layer::Layer1, _) => 384,
            (Layer::Layer2, _) | (Layer::Layer3, MpegVersion::Mpeg1) => 1152,
            (Layer::Layer3, _) => 576,
        }
    }

    /// Total frame size in bytes, header included
    pub fn frame_length(&self) -> usize {
        let bitrate = self.bitrate_kbps as usize * 1000;
        let rate = self.sample_rate as usize;
        let padding = self.padding as usize;
        match self.layer {
            Layer::Layer1 => (12 * bitrate / rate + padding) * 4,
            Layer::Layer3 if self.version != MpegVersion::Mpeg1 => 72 * bitrate / rate + padding,
            _ => 144 * bitrate / rate + padding,
        }
    }
}

/// Length of a leading ID3v2 tag, 0 if there is none
fn id3v2_len(bytes: &[u8]) -> usize {
    if bytes.len() < 10 || &bytes[0..3] != b"ID3" {
        return 0;
    }
    // Syncsafe integer: 7 bits per byte
    let size = bytes[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | (*b as usize & 0x7F));
    let footer = if bytes[5] & 0x10 != 0 { 10 } else { 0 };
    10 + size + footer
}

/// Iterate over `(offset, header)` for every frame in an MPEG audio stream.
///
/// Bytes that do not start a valid frame are skipped one at a time.
pub fn frames(bytes: &[u8]) -> impl Iterator<Item = (usize, FrameHeader)> + '_ {
    let mut offset = id3v2_len(bytes);
    std::iter::from_fn(move || {
        while offset + 4 <= bytes.len() {
            if let Some(header) = FrameHeader::parse(&bytes[offset..]) {
                let length = header.frame_length();
                if length >= 4 && offset + length <= bytes.len() {
                    let found = (offset, header);
                    offset += length;
                    return Some(found);
                }
            }
            offset += 1;
        }
        None
    })
}

/// Number of complete frames in `bytes`
pub fn count_frames(bytes: &[u8]) -> usize {
    frames(bytes).count()
}
