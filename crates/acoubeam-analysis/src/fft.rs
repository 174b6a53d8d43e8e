//! FFT wrapper with windowing functions

use rustfft::num_complex::Complex64;
use rustfft::{FftPlanner, num_complex::Complex};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Window function types
///
/// All windows are the symmetric variants (denominator `N - 1`), so the
/// first and last coefficient of Hanning, Bartlett and Blackman are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    /// Rectangular (no windowing)
    #[default]
    #[serde(alias = "rect", alias = "none")]
    Rectangular,
    /// Hanning window (raised cosine)
    #[serde(alias = "hann")]
    Hanning,
    /// Hamming window
    Hamming,
    /// Bartlett (triangular) window
    Bartlett,
    /// Blackman window
    Blackman,
}

impl Window {
    /// Every window, for iteration in tests and UIs.
    pub const ALL: [Window; 5] = [
        Window::Rectangular,
        Window::Hanning,
        Window::Hamming,
        Window::Bartlett,
        Window::Blackman,
    ];

    /// Lowercase name, stable across releases (part of the CSM digest).
    pub fn name(self) -> &'static str {
        match self {
            Window::Rectangular => "rectangular",
            Window::Hanning => "hanning",
            Window::Hamming => "hamming",
            Window::Bartlett => "bartlett",
            Window::Blackman => "blackman",
        }
    }

    /// Get window coefficients
    pub fn coefficients(self, size: usize) -> Vec<f64> {
        if size == 1 {
            return vec![1.0];
        }
        let m = (size as f64 - 1.0).max(1.0);
        (0..size)
            .map(|i| {
                let n = i as f64;
                match self {
                    Window::Rectangular => 1.0,
                    Window::Hanning => 0.5 - 0.5 * (2.0 * PI * n / m).cos(),
                    Window::Hamming => 0.54 - 0.46 * (2.0 * PI * n / m).cos(),
                    Window::Bartlett => 2.0 / m * (m / 2.0 - (n - m / 2.0).abs()),
                    Window::Blackman => {
                        0.42 - 0.5 * (2.0 * PI * n / m).cos() + 0.08 * (4.0 * PI * n / m).cos()
                    }
                }
            })
            .collect()
    }

    /// Energy of the window, `dot(w, w)`.
    pub fn power(self, size: usize) -> f64 {
        self.coefficients(size).iter().map(|w| w * w).sum()
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rectangular" | "rect" | "none" => Ok(Window::Rectangular),
            "hanning" | "hann" => Ok(Window::Hanning),
            "hamming" => Ok(Window::Hamming),
            "bartlett" => Ok(Window::Bartlett),
            "blackman" => Ok(Window::Blackman),
            _ => Err(format!("unknown window '{s}'")),
        }
    }
}

/// FFT processor for real blocks of a fixed size
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f64>>,
    size: usize,
}

impl Fft {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        Self { fft, size }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of non-negative frequency bins, `size / 2 + 1`.
    pub fn num_bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Perform forward FFT on real input
    ///
    /// Input shorter than the FFT size is zero padded. Returns `size/2 + 1`
    /// bins (DC to Nyquist).
    pub fn forward(&self, input: &[f64]) -> Vec<Complex64> {
        let mut buffer = Vec::with_capacity(self.size);
        self.forward_into(input, &mut buffer);
        buffer
    }

    /// Like [`forward`](Self::forward) but reuses `buffer`.
    pub fn forward_into(&self, input: &[f64], buffer: &mut Vec<Complex64>) {
        buffer.clear();
        buffer.extend(input.iter().take(self.size).map(|&x| Complex::new(x, 0.0)));
        buffer.resize(self.size, Complex::new(0.0, 0.0));

        self.fft.process(buffer);

        buffer.truncate(self.num_bins());
    }
}

/// Frequencies of the non-negative bins of a `block_size` real FFT.
///
/// Matches the first `block_size/2 + 1` entries of the usual
/// `fftfreq(n, 1/fs)` layout, except that the Nyquist bin of an even size
/// is reported as `+fs/2` rather than `-fs/2`, so the axis stays ascending
/// for [`search_sorted`](crate::bands::search_sorted). The Nyquist slice is
/// real-symmetric and its map does not depend on the sign.
pub fn rfft_frequencies(block_size: usize, sample_rate: f64) -> Vec<f64> {
    if block_size == 0 {
        return Vec::new();
    }
    let df = sample_rate / block_size as f64;
    (0..block_size / 2 + 1).map(|i| i as f64 * df).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_hanning_symmetric() {
        let w = Window::Hanning.coefficients(9);
        assert!(w[0].abs() < 1e-12);
        assert!(w[8].abs() < 1e-12);
        assert!((w[4] - 1.0).abs() < 1e-12);
        for i in 0..9 {
            assert!((w[i] - w[8 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_window_bartlett_triangle() {
        let w = Window::Bartlett.coefficients(5);
        let expected = [0.0, 0.5, 1.0, 0.5, 0.0];
        for (a, b) in w.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12, "{a} vs {b}");
        }
    }

    #[test]
    fn test_window_hamming_blackman_endpoints() {
        let h = Window::Hamming.coefficients(16);
        assert!((h[0] - 0.08).abs() < 1e-12);
        let b = Window::Blackman.coefficients(16);
        assert!(b[0].abs() < 1e-12);
    }

    #[test]
    fn test_rectangular_power_is_size() {
        assert_eq!(Window::Rectangular.power(256), 256.0);
        assert!(Window::Hanning.power(256) < 256.0 * 0.5);
    }

    #[test]
    fn test_window_parse() {
        assert_eq!("Hanning".parse::<Window>().unwrap(), Window::Hanning);
        assert_eq!("rect".parse::<Window>().unwrap(), Window::Rectangular);
        assert!("kaiser".parse::<Window>().is_err());
        for w in Window::ALL {
            assert_eq!(w.name().parse::<Window>().unwrap(), w);
        }
    }

    #[test]
    fn test_dc_detection() {
        let fft = Fft::new(256);
        let spectrum = fft.forward(&[1.0; 256]);
        assert_eq!(spectrum.len(), 129);
        assert!((spectrum[0].re - 256.0).abs() < 1e-9);
        let other: f64 = spectrum[1..].iter().map(|c| c.norm()).sum();
        assert!(other < 1e-9);
    }

    #[test]
    fn test_bin_centered_tone() {
        let n = 128;
        let fft = Fft::new(n);
        let input: Vec<f64> = (0..n).map(|i| (2.0 * PI * 5.0 * i as f64 / n as f64).cos()).collect();
        let spectrum = fft.forward(&input);
        assert!((spectrum[5].norm() - n as f64 / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_rfft_frequencies() {
        let f = rfft_frequencies(8, 800.0);
        assert_eq!(f, vec![0.0, 100.0, 200.0, 300.0, 400.0]);
        assert!(rfft_frequencies(0, 800.0).is_empty());
    }
}
