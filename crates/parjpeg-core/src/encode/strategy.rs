//! Choosing how a whole frame reaches the codec.

use serde::{Deserialize, Serialize};

use crate::config::EncoderConfig;

/// How a frame is handed to the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// The caller's buffer is compressed as-is, no conversion or copy.
    Direct,
    /// Rows are converted or copied in parallel into one contiguous buffer,
    /// which is compressed in a single call.
    Contiguous,
    /// Rows are fed to the scanline entry point in batches; no whole-frame
    /// buffer is ever allocated.
    Scanline,
}

/// Picks a [`Strategy`] from the frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategySelector {
    threshold: u64,
}

impl StrategySelector {
    pub fn new(threshold: u64) -> Self {
        Self { threshold }
    }

    pub fn from_config(config: &EncoderConfig) -> Self {
        Self::new(config.batch_threshold_bytes)
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Strategy for a frame of `total_bytes`.
    ///
    /// `direct_available` says whether the input can be handed to the codec
    /// without conversion. A direct buffer needs no new allocation, so it is
    /// preferred at any size; otherwise frames at or above the threshold go
    /// through the scanline path.
    pub fn select(&self, total_bytes: u64, direct_available: bool) -> Strategy {
        if direct_available {
            Strategy::Direct
        } else if total_bytes >= self.threshold {
            Strategy::Scanline
        } else {
            Strategy::Contiguous
        }
    }
}

/// `height * width * bytes_per_pixel`, without overflow.
pub fn total_bytes(width: u32, height: u32, bytes_per_pixel: usize) -> u64 {
    height as u64 * width as u64 * bytes_per_pixel as u64
}
