//! Fade curves for preview clips
//!
//! Previews fade in from silence and out to silence over the configured
//! margins. Linear is the default; the others are available for events that
//! want a softer edge.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

/// Fade curve shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// v(t) = t
    #[default]
    Linear,
    /// v(t) = t², slow start
    Exponential,
    /// v(t) = 0.5 × (1 - cos(π t))
    SCurve,
    /// v(t) = sin(t × π/2), constant perceived loudness
    EqualPower,
}

impl FadeCurve {
    /// Gain at normalized position `t` (0.0 = silent edge, 1.0 = full volume)
    pub fn gain(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);
        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            FadeCurve::SCurve => 0.5 * (1.0 - (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Ramp the first `fade_frames` frames of an interleaved buffer up from silence
    pub fn apply_fade_in(&self, samples: &mut [f32], channels: usize, fade_frames: usize) {
        let channels = channels.max(1);
        let total_frames = samples.len() / channels;
        let fade_frames = fade_frames.min(total_frames);
        if fade_frames == 0 {
            return;
        }

        for frame in 0..fade_frames {
            let gain = self.gain(frame as f32 / fade_frames as f32);
            for sample in &mut samples[frame * channels..(frame + 1) * channels] {
                *sample *= gain;
            }
        }
    }

    /// Ramp the last `fade_frames` frames of an interleaved buffer down to silence
    pub fn apply_fade_out(&self, samples: &mut [f32], channels: usize, fade_frames: usize) {
        let channels = channels.max(1);
        let total_frames = samples.len() / channels;
        let fade_frames = fade_frames.min(total_frames);
        if fade_frames == 0 {
            return;
        }

        let start = total_frames - fade_frames;
        for i in 0..fade_frames {
            // Last frame reaches zero gain
            let remaining = (fade_frames - 1 - i) as f32 / fade_frames as f32;
            let gain = self.gain(remaining);
            let frame = start + i;
            for sample in &mut samples[frame * channels..(frame + 1) * channels] {
                *sample *= gain;
            }
        }
    }
}
