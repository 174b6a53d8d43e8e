//! Canonical multichannel time-domain store.

use crate::digest::Digest;

/// Synchronised multichannel recording.
///
/// Samples are stored frame by frame: row `i` holds sample `i` of every
/// channel, so the backing slice has `num_samples * num_channels` entries.
/// The store is immutable; reloading data means building a new store.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStore {
    sample_rate: f64,
    num_channels: usize,
    num_samples: usize,
    data: Vec<f32>,
    digest: Digest,
}

impl SampleStore {
    /// Build a store from interleaved frames.
    ///
    /// A trailing partial frame is dropped with a warning.
    pub fn new(sample_rate: f64, num_channels: usize, mut data: Vec<f32>) -> Self {
        let num_samples = if num_channels == 0 {
            data.clear();
            0
        } else {
            let frames = data.len() / num_channels;
            if frames * num_channels != data.len() {
                tracing::warn!(
                    len = data.len(),
                    num_channels,
                    "sample data is not a whole number of frames, dropping the remainder"
                );
                data.truncate(frames * num_channels);
            }
            frames
        };
        let digest = Digest::builder()
            .str("samples")
            .f64(sample_rate)
            .usize(num_channels)
            .usize(num_samples)
            .f32s(&data)
            .finish();
        Self {
            sample_rate,
            num_channels,
            num_samples,
            data,
            digest,
        }
    }

    /// Build a store from one vector per channel. Channels are cut to the
    /// shortest length.
    pub fn from_channels(sample_rate: f64, channels: &[Vec<f32>]) -> Self {
        let num_samples = channels.iter().map(Vec::len).min().unwrap_or(0);
        let mut data = Vec::with_capacity(num_samples * channels.len());
        for i in 0..num_samples {
            data.extend(channels.iter().map(|ch| ch[i]));
        }
        Self::new(sample_rate, channels.len(), data)
    }

    /// A store with no channels and no samples.
    pub fn empty() -> Self {
        Self::new(0.0, 0, Vec::new())
    }

    /// Sampling frequency in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Number of samples per channel.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Interleaved samples, `num_samples` rows of `num_channels`.
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// One frame (all channels at sample `index`).
    pub fn frame(&self, index: usize) -> &[f32] {
        let start = index * self.num_channels;
        &self.data[start..start + self.num_channels]
    }

    /// Copy out one channel.
    pub fn channel(&self, channel: usize) -> Vec<f32> {
        self.data
            .iter()
            .skip(channel)
            .step_by(self.num_channels.max(1))
            .copied()
            .collect()
    }

    /// Content fingerprint.
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Restrict to samples `start..stop` and drop `invalid_channels`.
    ///
    /// `stop` defaults to the end; out-of-range bounds are clamped and
    /// unknown channel indices ignored.
    pub fn masked(&self, start: usize, stop: Option<usize>, invalid_channels: &[usize]) -> Self {
        let stop = stop.unwrap_or(self.num_samples).min(self.num_samples);
        let start = start.min(stop);
        let keep: Vec<usize> = (0..self.num_channels)
            .filter(|c| !invalid_channels.contains(c))
            .collect();
        let mut data = Vec::with_capacity((stop - start) * keep.len());
        for i in start..stop {
            let frame = self.frame(i);
            data.extend(keep.iter().map(|&c| frame[c]));
        }
        Self::new(self.sample_rate, keep.len(), data)
    }
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_channel() -> SampleStore {
        SampleStore::new(1000.0, 2, vec![0.0, 10.0, 1.0, 11.0, 2.0, 12.0, 3.0, 13.0])
    }

    #[test]
    fn shape_from_interleaved() {
        let s = two_channel();
        assert_eq!(s.num_channels(), 2);
        assert_eq!(s.num_samples(), 4);
        assert_eq!(s.frame(2), &[2.0, 12.0]);
        assert_eq!(s.channel(1), vec![10.0, 11.0, 12.0, 13.0]);
    }

    #[test]
    fn partial_frame_dropped() {
        let s = SampleStore::new(1000.0, 3, vec![1.0; 7]);
        assert_eq!(s.num_samples(), 2);
        assert_eq!(s.samples().len(), 6);
    }

    #[test]
    fn from_channels_matches_interleaved() {
        let a = SampleStore::from_channels(1000.0, &[vec![0.0, 1.0, 2.0, 3.0], vec![10.0, 11.0, 12.0, 13.0]]);
        assert_eq!(a, two_channel());
        assert_eq!(a.digest(), two_channel().digest());
    }

    #[test]
    fn digest_follows_content() {
        let a = two_channel();
        let b = SampleStore::new(1000.0, 2, vec![0.0, 10.0, 1.0, 11.0, 2.0, 12.0, 3.0, 13.5]);
        let c = SampleStore::new(2000.0, 2, a.samples().to_vec());
        assert_ne!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn empty_store() {
        let s = SampleStore::empty();
        assert_eq!(s.num_samples(), 0);
        assert_eq!(s.num_channels(), 0);
        assert!(s.channel(0).is_empty());
    }

    #[test]
    fn masked_range_and_channels() {
        let s = SampleStore::new(
            1000.0,
            3,
            vec![0.0, 10.0, 20.0, 1.0, 11.0, 21.0, 2.0, 12.0, 22.0, 3.0, 13.0, 23.0],
        );
        let m = s.masked(1, Some(3), &[1]);
        assert_eq!(m.num_channels(), 2);
        assert_eq!(m.num_samples(), 2);
        assert_eq!(m.samples(), &[1.0, 21.0, 2.0, 22.0]);
        assert_ne!(m.digest(), s.digest());

        let clamped = s.masked(10, Some(100), &[7]);
        assert_eq!(clamped.num_samples(), 0);
        assert_eq!(clamped.num_channels(), 3);
    }
}
