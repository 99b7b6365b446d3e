use std::sync::Arc;

use crate::models::audio_models::{AudioFormat, LineInfo, MixerInfo};
use crate::models::error::LineInError;
use crate::traits::capture_line::CaptureLine;

/// Interface to the host's audio subsystem.
///
/// Implemented by:
/// - `CpalSubsystem` (line-in-cpal)
/// - `MockSubsystem` (tests)
pub trait AudioSubsystem: Send + Sync {
    /// Every device the platform exposes, capture-capable or not.
    fn mixers(&self) -> Vec<MixerInfo>;

    /// Target (input) line descriptors of a device, in platform order.
    fn target_line_info(&self, mixer: &MixerInfo) -> Vec<LineInfo>;

    /// Whether any device declares a capture line for `format`.
    fn is_line_supported(&self, format: &AudioFormat) -> bool;

    /// Reserve a capture line of `mixer` for `format`.
    ///
    /// The returned line is not yet open.
    fn get_line(
        &self,
        mixer: &MixerInfo,
        format: &AudioFormat,
    ) -> Result<Arc<dyn CaptureLine>, LineInError>;
}
