//! Encoder configuration.
//!
//! Every knob has a default that matches the behavior callers get when they
//! pass nothing, so a config deserialized from an empty document is the same
//! as [`EncoderConfig::default`].

use serde::{Deserialize, Serialize};

use crate::codec::{CodecPreset, CompressParams, SamplingMode};
use crate::parallel::WorkerPool;
use crate::pixel::PixelFormat;

/// Total pixel bytes above which images are never gathered into one buffer.
pub const DEFAULT_BATCH_THRESHOLD_BYTES: u64 = 1_500_000_000;

/// Rows converted per batch on the scanline path.
pub const DEFAULT_SCANLINE_BATCH_ROWS: u32 = 5000;

/// Tuning for every encode entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Worker count; `None` or `Some(0)` uses the detected parallelism.
    pub threads: Option<usize>,
    /// Frames of at least this many bytes (`width * height * bytes_per_pixel`,
    /// 3 or 4 depending on the layout) take the scanline path instead of one
    /// contiguous buffer.
    pub batch_threshold_bytes: u64,
    /// Rows per conversion batch on the scanline path.
    pub scanline_batch_rows: u32,
    /// Chroma subsampling.
    pub sampling: SamplingMode,
    /// Speed/fidelity preset.
    pub preset: CodecPreset,
    /// Layout each tile is converted to before compression.
    pub tile_layout: PixelFormat,
    /// Hand packed words to the codec as BGRX bytes without conversion.
    pub zero_copy: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            threads: None,
            batch_threshold_bytes: DEFAULT_BATCH_THRESHOLD_BYTES,
            scanline_batch_rows: DEFAULT_SCANLINE_BATCH_ROWS,
            sampling: SamplingMode::S420,
            preset: CodecPreset::Fast,
            tile_layout: PixelFormat::Bgr,
            zero_copy: true,
        }
    }
}

impl EncoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count. Zero means detect.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_batch_threshold(mut self, bytes: u64) -> Self {
        self.batch_threshold_bytes = bytes;
        self
    }

    /// Set rows per scanline batch. Zero is treated as one.
    pub fn with_scanline_batch_rows(mut self, rows: u32) -> Self {
        self.scanline_batch_rows = rows;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingMode) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_preset(mut self, preset: CodecPreset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_tile_layout(mut self, layout: PixelFormat) -> Self {
        self.tile_layout = layout;
        self
    }

    pub fn with_zero_copy(mut self, enabled: bool) -> Self {
        self.zero_copy = enabled;
        self
    }

    /// Worker pool sized from `threads`.
    pub fn pool(&self) -> WorkerPool {
        WorkerPool::new(self.threads)
    }

    /// Scanline batch size, never below one row.
    pub fn batch_rows(&self) -> u32 {
        self.scanline_batch_rows.max(1)
    }

    /// Codec parameters for `quality` (clamped into `[1, 100]`).
    pub fn params(&self, quality: i32) -> CompressParams {
        CompressParams::new(quality, self.sampling, self.preset)
    }
}
