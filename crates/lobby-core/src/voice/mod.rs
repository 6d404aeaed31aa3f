//! Per-speaker voice state and the capture/playback pipeline.
//!
//! Frames and codec work are the platform's; this module decides when to
//! capture, where decoded audio goes, and who currently reads as talking.

mod buffer_pool;
mod pipeline;

pub use buffer_pool::{VoiceBuffer, VoiceBufferPool};
pub use pipeline::VoicePipeline;
