//! Mono audio clip addressable in milliseconds
//!
//! All mixing happens on mono f32 clips at the internal sample rate. The
//! operations here are the pure buffer half of the audio capability: silence,
//! gain, loop-to-length, and additive overlay.

/// Sample rate used for mixing and export
pub const INTERNAL_SAMPLE_RATE: u32 = 44_100;

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// A mono buffer of f32 samples at a known sample rate
#[derive(Clone, Debug)]
pub struct AudioClip {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioClip {
    /// Create a clip from existing mono samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Create a silent clip of the given duration
    pub fn silent(duration_ms: u64, sample_rate: u32) -> Self {
        let count = ms_to_sample_count(duration_ms, sample_rate);
        Self {
            samples: vec![0.0; count],
            sample_rate,
        }
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// All samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the clip holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in whole milliseconds (floor)
    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Apply a gain in decibels to every sample
    pub fn apply_gain_db(&mut self, db: f32) {
        let linear = db_to_linear(db);
        for sample in &mut self.samples {
            *sample *= linear;
        }
    }

    /// Repeat-append this clip until it reaches `duration_ms`, then cut to
    /// exactly that length
    ///
    /// An empty clip loops to silence rather than spinning forever.
    pub fn looped_to_ms(&self, duration_ms: u64) -> AudioClip {
        let target = ms_to_sample_count(duration_ms, self.sample_rate);
        if self.samples.is_empty() {
            return AudioClip::silent(duration_ms, self.sample_rate);
        }
        let mut out = Vec::with_capacity(target + self.samples.len());
        while out.len() < target {
            out.extend_from_slice(&self.samples);
        }
        out.truncate(target);
        AudioClip {
            samples: out,
            sample_rate: self.sample_rate,
        }
    }

    /// Additively mix `layer` onto this clip starting at `at_ms`
    ///
    /// Material extending past the end of this clip is dropped; no
    /// normalization or limiting is applied afterwards, so clipping above
    /// full scale is possible and accepted.
    pub fn overlay(&mut self, layer: &AudioClip, at_ms: u64) {
        debug_assert_eq!(self.sample_rate, layer.sample_rate);
        let offset = ms_to_sample_count(at_ms, self.sample_rate);
        for (i, &sample) in layer.samples.iter().enumerate() {
            match self.samples.get_mut(offset + i) {
                Some(slot) => *slot += sample,
                None => break,
            }
        }
    }

    /// Peak absolute amplitude
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
    }
}

/// Number of samples covering `ms` milliseconds at `sample_rate`
pub(crate) fn ms_to_sample_count(ms: u64, sample_rate: u32) -> usize {
    (ms * sample_rate as u64 / 1000) as usize
}
