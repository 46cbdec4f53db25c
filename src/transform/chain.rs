//! Ordered sequence of transforms applied to one buffer.

use crate::core::SampleBuffer;
use crate::transform::{
    adjust_volume, change_speed, edit, fade_in, fade_out, normalize, reverse, TransformError,
};

/// One step of a [`TransformChain`]
#[derive(Debug, Clone, PartialEq)]
pub enum TransformStep {
    Reverse,
    /// Speed factor
    ChangeSpeed(f64),
    /// Gain in dB
    Volume(f64),
    /// Target peak in dBFS
    Normalize(f64),
    /// Fade length in seconds
    FadeIn(f64),
    /// Fade length in seconds
    FadeOut(f64),
    Trim { start: f64, end: f64 },
    Loop { count: u32, crossfade: f64 },
}

impl TransformStep {
    /// Apply this step to `buffer`
    pub fn apply(&self, buffer: &SampleBuffer) -> Result<SampleBuffer, TransformError> {
        match *self {
            TransformStep::Reverse => Ok(reverse(buffer)),
            TransformStep::ChangeSpeed(factor) => change_speed(buffer, factor),
            TransformStep::Volume(db) => Ok(adjust_volume(buffer, db)),
            TransformStep::Normalize(db) => Ok(normalize(buffer, db)),
            TransformStep::FadeIn(seconds) => Ok(fade_in(buffer, seconds)),
            TransformStep::FadeOut(seconds) => Ok(fade_out(buffer, seconds)),
            TransformStep::Trim { start, end } => edit::trim(buffer, start, end),
            TransformStep::Loop { count, crossfade } => {
                Ok(edit::loop_audio(buffer, count, crossfade))
            }
        }
    }
}

/// Builder for a list of transform steps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformChain {
    steps: Vec<TransformStep>,
}

impl TransformChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, step: TransformStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn reverse(self) -> Self {
        self.then(TransformStep::Reverse)
    }

    pub fn change_speed(self, factor: f64) -> Self {
        self.then(TransformStep::ChangeSpeed(factor))
    }

    pub fn volume(self, gain_db: f64) -> Self {
        self.then(TransformStep::Volume(gain_db))
    }

    pub fn normalize(self, target_db: f64) -> Self {
        self.then(TransformStep::Normalize(target_db))
    }

    pub fn fade_in(self, seconds: f64) -> Self {
        self.then(TransformStep::FadeIn(seconds))
    }

    pub fn fade_out(self, seconds: f64) -> Self {
        self.then(TransformStep::FadeOut(seconds))
    }

    pub fn trim(self, start: f64, end: f64) -> Self {
        self.then(TransformStep::Trim { start, end })
    }

    pub fn repeat(self, count: u32, crossfade: f64) -> Self {
        self.then(TransformStep::Loop { count, crossfade })
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order. Stops at the first failing step.
    pub fn apply(&self, buffer: &SampleBuffer) -> Result<SampleBuffer, TransformError> {
        let mut current = buffer.clone();
        for step in &self.steps {
            current = step.apply(&current)?;
            tracing::trace!(?step, length = current.length(), "Applied transform step");
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> SampleBuffer {
        SampleBuffer::new(10, vec![(0..20).map(|i| i as f32 / 20.0).collect()]).unwrap()
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let buffer = ramp();
        let chain = TransformChain::new();
        assert!(chain.is_empty());
        let out = chain.apply(&buffer).unwrap();
        assert!(out.shares_storage_with(&buffer));
    }

    #[test]
    fn test_steps_run_in_order() {
        let buffer = ramp();
        let chain = TransformChain::new().trim(0.0, 1.0).reverse();
        assert_eq!(chain.steps().len(), 2);

        let out = chain.apply(&buffer).unwrap();
        assert_eq!(out.length(), 10);
        assert_eq!(out.channel(0)[0], 9.0 / 20.0);
        assert_eq!(out.channel(0)[9], 0.0);
    }

    #[test]
    fn test_chain_stops_on_error() {
        let chain = TransformChain::new().change_speed(0.0).reverse();
        assert!(matches!(
            chain.apply(&ramp()),
            Err(TransformError::InvalidSpeed(_))
        ));
    }

    #[test]
    fn test_loop_and_speed() {
        let out = TransformChain::new()
            .repeat(2, 0.0)
            .change_speed(2.0)
            .apply(&ramp())
            .unwrap();
        assert_eq!(out.length(), 20);
    }
}
