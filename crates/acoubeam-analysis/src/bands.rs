//! Fractional-octave band synthesis and sound pressure level.

use std::ops::Range;

/// Reference squared sound pressure, `(20 uPa)^2`.
pub const REFERENCE_POWER: f64 = 4e-10;

/// Returned by [`synthesize`] when there is nothing to index.
pub const FALLBACK: [f64; 1] = [1.0];

/// Sound pressure level in dB of a squared pressure, `10 lg(x / 4e-10)`.
///
/// Zero maps to negative infinity and negative input to NaN.
pub fn sound_pressure_level(x: f64) -> f64 {
    10.0 * (x / REFERENCE_POWER).log10()
}

/// [`sound_pressure_level`] of every element.
pub fn sound_pressure_levels(values: &[f64]) -> Vec<f64> {
    values.iter().map(|&x| sound_pressure_level(x)).collect()
}

/// Index of the first element of `sorted` that is not less than `value`.
pub fn search_sorted(sorted: &[f64], value: f64) -> usize {
    sorted.partition_point(|&f| f < value)
}

/// Frequency lines that make up the band around `freq`.
///
/// `num` is the bandwidth as a fraction of an octave (`1` octave, `3` third
/// octave); `0` selects the single line at `freq`. A band narrower than one
/// line covers the next line up. `None` when the axis is empty or the band
/// starts past the last line.
pub fn band_lines(frequencies: &[f64], freq: f64, num: u32) -> Option<Range<usize>> {
    let nf = frequencies.len();
    if num == 0 {
        let f = search_sorted(frequencies, freq);
        return (f < nf).then_some(f..f + 1);
    }
    let half = 0.5 / f64::from(num);
    let f1 = search_sorted(frequencies, freq * 2f64.powf(-half));
    let f2 = search_sorted(frequencies, freq * 2f64.powf(half));
    (f1 < nf).then_some(f1..f2.max(f1 + 1))
}

/// Band-reduce a per-line result.
///
/// `values` holds `frequencies.len()` rows of `width` elements. A band of a
/// single line (see [`band_lines`]) yields that line, a wider band the
/// element-wise sum of its lines. Returns [`FALLBACK`] when there is no such
/// band.
pub fn synthesize(frequencies: &[f64], values: &[f64], width: usize, freq: f64, num: u32) -> Vec<f64> {
    if values.len() < frequencies.len() * width {
        return FALLBACK.to_vec();
    }
    let Some(lines) = band_lines(frequencies, freq, num) else {
        return FALLBACK.to_vec();
    };
    let row = |f: usize| &values[f * width..(f + 1) * width];
    if lines.len() == 1 {
        return row(lines.start).to_vec();
    }
    let mut sum = vec![0.0; width];
    for f in lines {
        for (acc, v) in sum.iter_mut().zip(row(f)) {
            *acc += v;
        }
    }
    sum
}
