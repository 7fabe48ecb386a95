//! Container configuration.

use asdf_format::FileAccessProps;

/// Default width bound for the rendered start time.
pub const DEFAULT_START_TIME_WIDTH: usize = 20;

/// Default width bound for the rendered sampling rate.
pub const DEFAULT_SAMPLING_RATE_WIDTH: usize = 32;

/// Which attributes a waveform declaration writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveformAttrs {
    /// Only `starttime`.
    #[default]
    StartTimeOnly,
    /// `starttime`, `event_id` and `sampling_rate`.
    Extended,
}

/// Options for creating or opening a container.
///
/// ```
/// use asdf::{AsdfConfig, WaveformAttrs};
///
/// let config = AsdfConfig::new()
///     .waveform_attrs(WaveformAttrs::Extended)
///     .start_time_width(24);
/// assert_eq!(config.start_time_width, 24);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsdfConfig {
    pub access: FileAccessProps,
    pub waveform_attrs: WaveformAttrs,
    /// Longest decimal rendering of a start time that is accepted.
    pub start_time_width: usize,
    /// Longest rendering of a sampling rate that is accepted.
    pub sampling_rate_width: usize,
}

impl Default for AsdfConfig {
    fn default() -> Self {
        Self {
            access: FileAccessProps::default(),
            waveform_attrs: WaveformAttrs::default(),
            start_time_width: DEFAULT_START_TIME_WIDTH,
            sampling_rate_width: DEFAULT_SAMPLING_RATE_WIDTH,
        }
    }
}

impl AsdfConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access(mut self, access: FileAccessProps) -> Self {
        self.access = access;
        self
    }

    pub fn waveform_attrs(mut self, attrs: WaveformAttrs) -> Self {
        self.waveform_attrs = attrs;
        self
    }

    pub fn start_time_width(mut self, width: usize) -> Self {
        self.start_time_width = width;
        self
    }

    pub fn sampling_rate_width(mut self, width: usize) -> Self {
        self.sampling_rate_width = width;
        self
    }
}
