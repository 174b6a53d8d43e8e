//! Point-source array simulation.
//!
//! Each source is a monopole in free field: microphone `i` at distance
//! `r_i` receives the source signal delayed by `r_i / c` and attenuated by
//! `1 / r_i`. Delays are fractional; sines are evaluated exactly, noise is
//! linearly interpolated between samples.

use acoubeam_core::geometry::distance;
use acoubeam_core::{MicGeom, SampleStore};
use std::f64::consts::PI;

/// Source waveform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    /// Sine wave.
    Sine {
        /// Frequency in Hz.
        freq: f64,
        /// Peak amplitude at 1 m.
        amplitude: f64,
    },
    /// Deterministic uniform white noise.
    Noise {
        /// RMS at 1 m.
        rms: f64,
        /// Generator seed; equal seeds give equal signals.
        seed: u64,
    },
}

/// A monopole at a fixed position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSource {
    /// Position in metres.
    pub position: [f64; 3],
    /// Emitted signal.
    pub signal: Signal,
}

impl PointSource {
    /// Source emitting `signal` at `position`.
    pub fn new(position: [f64; 3], signal: Signal) -> Self {
        Self { position, signal }
    }
}

/// Xorshift64 generator scaled to unit RMS.
fn noise(seed: u64, len: usize) -> Vec<f64> {
    // a zero state would stay zero
    let mut state = seed | 1;
    let scale = 12f64.sqrt();
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            ((state >> 11) as f64 / (1u64 << 53) as f64 - 0.5) * scale
        })
        .collect()
}

/// Value of `x` at fractional sample position `t`; zero outside the signal.
fn interpolate(x: &[f64], t: f64) -> f64 {
    if t < 0.0 {
        return 0.0;
    }
    let i = t.floor() as usize;
    let frac = t - t.floor();
    match (x.get(i), x.get(i + 1)) {
        (Some(a), Some(b)) => a + (b - a) * frac,
        (Some(a), None) => a * (1.0 - frac),
        _ => 0.0,
    }
}

/// Render `num_samples` frames of what `mics` record from `sources`.
///
/// A non-positive sample rate or speed of sound yields an empty store with
/// one channel per microphone.
pub fn simulate(
    mics: &MicGeom,
    sources: &[PointSource],
    sample_rate: f64,
    num_samples: usize,
    c: f64,
) -> SampleStore {
    let nc = mics.num_mics();
    if sample_rate <= 0.0 || c <= 0.0 {
        tracing::warn!(sample_rate, c, "cannot simulate, returning an empty store");
        return SampleStore::new(sample_rate, nc, Vec::new());
    }

    let mut channels = vec![vec![0.0f64; num_samples]; nc];
    for source in sources {
        let waveform = match source.signal {
            Signal::Noise { rms, seed } => Some((rms, noise(seed, num_samples))),
            Signal::Sine { .. } => None,
        };
        for (out, mic) in channels.iter_mut().zip(mics.positions()) {
            let r = distance(&source.position, mic);
            if r == 0.0 {
                tracing::warn!(position = ?source.position, "source coincides with a microphone, skipped");
                continue;
            }
            let delay = r / c;
            match (source.signal, &waveform) {
                (Signal::Sine { freq, amplitude }, _) => {
                    for (n, y) in out.iter_mut().enumerate() {
                        let t = n as f64 / sample_rate - delay;
                        *y += amplitude / r * (2.0 * PI * freq * t).sin();
                    }
                }
                (Signal::Noise { .. }, Some((rms, x))) => {
                    let shift = delay * sample_rate;
                    for (n, y) in out.iter_mut().enumerate() {
                        *y += rms / r * interpolate(x, n as f64 - shift);
                    }
                }
                (Signal::Noise { .. }, None) => {}
            }
        }
    }

    tracing::debug!(num_mics = nc, num_sources = sources.len(), num_samples, "simulated recording");
    let mut data = Vec::with_capacity(nc * num_samples);
    for n in 0..num_samples {
        data.extend(channels.iter().map(|ch| ch[n] as f32));
    }
    SampleStore::new(sample_rate, nc, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mics() -> MicGeom {
        MicGeom::new(vec![[0.0, 0.0, 0.0], [0.0, 0.0, 1.0]])
    }

    #[test]
    fn noise_has_unit_rms() {
        let x = noise(7, 100_000);
        let rms = (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt();
        assert!((rms - 1.0).abs() < 0.01, "rms {rms}");
        assert_eq!(x, noise(7, 100_000));
        assert_ne!(x[..10], noise(8, 10)[..]);
    }

    #[test]
    fn interpolation() {
        let x = [0.0, 1.0, 3.0];
        assert_eq!(interpolate(&x, -0.5), 0.0);
        assert_eq!(interpolate(&x, 0.5), 0.5);
        assert_eq!(interpolate(&x, 1.25), 1.5);
        assert_eq!(interpolate(&x, 5.0), 0.0);
    }

    #[test]
    fn sine_amplitude_decays_with_distance() {
        // source 1 m and 2 m from the two microphones
        let source = PointSource::new([0.0, 0.0, -1.0], Signal::Sine { freq: 100.0, amplitude: 1.0 });
        let store = simulate(&mics(), &[source], 8000.0, 8000, 343.0);
        assert_eq!(store.num_channels(), 2);
        assert_eq!(store.num_samples(), 8000);
        let peak = |ch: usize| store.channel(ch).iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!((peak(0) - 1.0).abs() < 1e-3);
        assert!((peak(1) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn noise_is_delayed_by_path_difference() {
        // 1 m extra path at c = 800 m/s and 8 kHz is exactly 10 samples
        let source = PointSource::new([0.0, 0.0, -1.0], Signal::Noise { rms: 1.0, seed: 3 });
        let store = simulate(&mics(), &[source], 8000.0, 4000, 800.0);
        let near = store.channel(0);
        let far = store.channel(1);
        for n in 100..4000 {
            assert!((f64::from(far[n]) - 0.5 * f64::from(near[n - 10])).abs() < 1e-5);
        }
    }

    #[test]
    fn invalid_rate_gives_empty_store() {
        let source = PointSource::new([0.0, 0.0, 1.0], Signal::Sine { freq: 100.0, amplitude: 1.0 });
        let store = simulate(&mics(), &[source], 0.0, 100, 343.0);
        assert_eq!(store.num_samples(), 0);
        assert_eq!(store.num_channels(), 2);
    }
}
