/// Mono audio samples at a fixed sample rate.
///
/// Produced once by the loader (or the synthesizer) and then only read:
/// every analysis borrows slices of it, so several analyses can share one
/// buffer without coordination.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds: length / sample rate.
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Nearest sample index for a time in seconds, clamped to the buffer.
    pub fn sample_index(&self, secs: f32) -> usize {
        let idx = (secs.max(0.0) * self.sample_rate as f32).round() as usize;
        idx.min(self.samples.len())
    }

    /// Samples in `[start, end)` seconds, clamped to the buffer.
    pub fn slice_secs(&self, start: f32, end: f32) -> &[f32] {
        let from = self.sample_index(start);
        let to = self.sample_index(end).max(from);
        &self.samples[from..to]
    }

    /// A new buffer holding `[start, end)` seconds of this one.
    pub fn window(&self, start: f32, end: f32) -> SampleBuffer {
        SampleBuffer::new(self.slice_secs(start, end).to_vec(), self.sample_rate)
    }
}
