//! RIFF/WAVE header synthesis for a linear PCM recording.

use crate::audio_capture::{BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE};

/// Size in bytes of the encoded header
pub const HEADER_SIZE: usize = 44;

const FMT_CHUNK_SIZE: u32 = 16;
const FORMAT_PCM: u16 = 1;

/// Fixed-layout container header preceding the raw sample bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    /// File size minus the 8-byte RIFF preamble
    pub total_size: u32,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Payload size in bytes
    pub data_size: u32,
}

/// Build the header for `sample_count` 16-bit mono samples
pub fn encode_header(sample_count: u32) -> WavHeader {
    let block_align = (BITS_PER_SAMPLE / 8) * CHANNELS;
    let data_size = sample_count * 2;

    WavHeader {
        total_size: data_size + HEADER_SIZE as u32 - 8,
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        byte_rate: SAMPLE_RATE * block_align as u32,
        block_align,
        bits_per_sample: BITS_PER_SAMPLE,
        data_size,
    }
}

impl WavHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(b"RIFF");
        out[4..8].copy_from_slice(&self.total_size.to_le_bytes());
        out[8..12].copy_from_slice(b"WAVE");
        out[12..16].copy_from_slice(b"fmt ");
        out[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
        out[20..22].copy_from_slice(&FORMAT_PCM.to_le_bytes());
        out[22..24].copy_from_slice(&self.channels.to_le_bytes());
        out[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        out[28..32].copy_from_slice(&self.byte_rate.to_le_bytes());
        out[32..34].copy_from_slice(&self.block_align.to_le_bytes());
        out[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        out[36..40].copy_from_slice(b"data");
        out[40..44].copy_from_slice(&self.data_size.to_le_bytes());
        out
    }

    /// Header plus payload, the value sent as `Content-Length`
    pub fn file_len(&self) -> usize {
        HEADER_SIZE + self.data_size as usize
    }
}
