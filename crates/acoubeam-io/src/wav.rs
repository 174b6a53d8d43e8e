//! Multichannel WAV reading and writing.

use crate::{Error, Result};
use acoubeam_core::SampleStore;
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of channels (microphones).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let total_samples = u64::from(reader.len()); // total across all channels
    let num_frames = total_samples / u64::from(spec.channels);
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// Read a WAV file into a sample store, keeping every channel.
///
/// Integer PCM is scaled to `[-1, 1)`.
///
/// # Example
/// ```ignore
/// let store = read_sample_store("measurement.wav")?;
/// println!("{} channels x {} samples", store.num_channels(), store.num_samples());
/// ```
pub fn read_sample_store<P: AsRef<Path>>(path: P) -> Result<SampleStore> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if bits == 0 || bits > 32 {
                return Err(Error::UnsupportedFormat(format!("{bits}-bit integer PCM")));
            }
            let max_val = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    tracing::debug!(
        path = %path.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        frames = samples.len() / usize::from(spec.channels.max(1)),
        "loaded WAV"
    );
    Ok(SampleStore::new(
        f64::from(spec.sample_rate),
        usize::from(spec.channels),
        samples,
    ))
}

/// Write a sample store to a WAV file.
///
/// `bits_per_sample` of 32 writes IEEE float, 16 or 24 integer PCM. The
/// sample rate is rounded to whole Hz.
///
/// # Example
/// ```ignore
/// write_sample_store("output.wav", &store, 32)?;
/// ```
pub fn write_sample_store<P: AsRef<Path>>(
    path: P,
    store: &SampleStore,
    bits_per_sample: u16,
) -> Result<()> {
    if !matches!(bits_per_sample, 16 | 24 | 32) {
        return Err(Error::UnsupportedFormat(format!(
            "{bits_per_sample}-bit output (use 16, 24 or 32)"
        )));
    }
    let channels = u16::try_from(store.num_channels())
        .ok()
        .filter(|&c| c > 0)
        .ok_or_else(|| {
            Error::InvalidStore(format!("{} channels", store.num_channels()))
        })?;
    let rate = store.sample_rate().round();
    if !(1.0..=f64::from(u32::MAX)).contains(&rate) {
        return Err(Error::InvalidStore(format!(
            "sample rate {} Hz",
            store.sample_rate()
        )));
    }
    if rate != store.sample_rate() {
        tracing::warn!(
            sample_rate = store.sample_rate(),
            written = rate,
            "sample rate rounded to whole Hz"
        );
    }

    let hound_spec = hound::WavSpec {
        channels,
        sample_rate: rate as u32,
        bits_per_sample,
        sample_format: if bits_per_sample == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };
    let mut writer = WavWriter::create(path, hound_spec)?;

    if bits_per_sample == 32 {
        for &sample in store.samples() {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i32 << (bits_per_sample - 1)) as f32;
        for &sample in store.samples() {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }

    writer.finalize()?;
    Ok(())
}
