//! Fixed-layout wearables datagram
//!
//! ```text
//! offset  size  field
//!      0     4  msgcode        (u32, big-endian)
//!      4    12  reserved
//!     16    16  effect         (ASCII, NUL padded)
//!     32     4  elapsed_ms     (u32, big-endian)
//!     36     4  beat_count     (u32, big-endian)
//!     40     1  hue_median
//!     41     1  hue_deviation
//! ```

use thiserror::Error;

/// Exact datagram length on the wire
pub const WIRE_LEN: usize = 42;

/// Maximum effect name length in bytes
pub const EFFECT_LEN: usize = 16;

/// Message code used by the inter-eye sync publisher
pub const SYNC_MSGCODE: u32 = 0x4559_4531;

const MSGCODE_OFFSET: usize = 0;
const EFFECT_OFFSET: usize = 16;
const ELAPSED_OFFSET: usize = 32;
const BEAT_OFFSET: usize = 36;
const HUE_MEDIAN_OFFSET: usize = 40;
const HUE_DEVIATION_OFFSET: usize = 41;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed wearables datagram: {0}")]
    Malformed(String),

    #[error("Effect name '{0}' exceeds {EFFECT_LEN} bytes")]
    EffectTooLong(String),
}

/// One decoded datagram from the wearables or sync channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WearableMessage {
    pub msgcode: u32,
    pub effect: String,
    pub elapsed_ms: u32,
    pub beat_count: u32,
    pub hue_median: u8,
    pub hue_deviation: u8,
}

impl WearableMessage {
    /// Sync message carrying a canonical token as the effect name
    pub fn sync(token: &str, elapsed_ms: u32) -> Self {
        Self {
            msgcode: SYNC_MSGCODE,
            effect: token.to_string(),
            elapsed_ms,
            beat_count: 0,
            hue_median: 0,
            hue_deviation: 0,
        }
    }
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

pub fn decode(datagram: &[u8]) -> Result<WearableMessage, DecodeError> {
    if datagram.len() != WIRE_LEN {
        return Err(DecodeError::Malformed(format!(
            "expected {} bytes, got {}",
            WIRE_LEN,
            datagram.len()
        )));
    }

    let raw_effect = &datagram[EFFECT_OFFSET..EFFECT_OFFSET + EFFECT_LEN];
    let effect_bytes = match raw_effect.iter().position(|b| *b == 0) {
        Some(end) => {
            if raw_effect[end..].iter().any(|b| *b != 0) {
                return Err(DecodeError::Malformed(format!(
                    "effect padding after byte {} is not all NUL",
                    end
                )));
            }
            &raw_effect[..end]
        }
        None => raw_effect,
    };
    if !effect_bytes.is_ascii() {
        return Err(DecodeError::Malformed(
            "effect name is not ASCII".to_string(),
        ));
    }
    // ASCII was checked above, so this cannot lose data
    let effect = String::from_utf8_lossy(effect_bytes).into_owned();

    Ok(WearableMessage {
        msgcode: read_u32(datagram, MSGCODE_OFFSET),
        effect,
        elapsed_ms: read_u32(datagram, ELAPSED_OFFSET),
        beat_count: read_u32(datagram, BEAT_OFFSET),
        hue_median: datagram[HUE_MEDIAN_OFFSET],
        hue_deviation: datagram[HUE_DEVIATION_OFFSET],
    })
}

pub fn encode(message: &WearableMessage) -> Result<[u8; WIRE_LEN], DecodeError> {
    let effect = message.effect.as_bytes();
    if effect.len() > EFFECT_LEN || !message.effect.is_ascii() {
        return Err(DecodeError::EffectTooLong(message.effect.clone()));
    }

    let mut buf = [0u8; WIRE_LEN];
    buf[MSGCODE_OFFSET..MSGCODE_OFFSET + 4].copy_from_slice(&message.msgcode.to_be_bytes());
    buf[EFFECT_OFFSET..EFFECT_OFFSET + effect.len()].copy_from_slice(effect);
    buf[ELAPSED_OFFSET..ELAPSED_OFFSET + 4].copy_from_slice(&message.elapsed_ms.to_be_bytes());
    buf[BEAT_OFFSET..BEAT_OFFSET + 4].copy_from_slice(&message.beat_count.to_be_bytes());
    buf[HUE_MEDIAN_OFFSET] = message.hue_median;
    buf[HUE_DEVIATION_OFFSET] = message.hue_deviation;
    Ok(buf)
}
