//! Text rendering of waveform attribute values.

use crate::error::{Error, Result};

/// Decimal text of a start time, bounded to `width` characters.
pub fn render_start_time(start_time: i64, width: usize) -> Result<String> {
    bounded(start_time.to_string(), width)
}

/// Fixed-point text with 7 fractional digits, bounded to `width` characters.
pub fn render_sampling_rate(rate: f64, width: usize) -> Result<String> {
    if !rate.is_finite() {
        return Err(Error::InvalidSamplingRate(rate));
    }
    bounded(format!("{rate:.7}"), width)
}

fn bounded(value: String, width: usize) -> Result<String> {
    if value.len() > width {
        return Err(Error::ValueTooWide {
            needed: value.len(),
            value,
            width,
        });
    }
    Ok(value)
}
