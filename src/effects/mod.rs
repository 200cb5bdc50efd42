//! The fixed master effects chain.
//!
//! ```text
//! voices ─► distortion ─► chorus ─► delay ─► reverb ─► compressor ─► master
//! ```
//!
//! Every stage has an `enabled` switch. A disabled stage is skipped outright,
//! so its output is bit-identical to its input and its internal state (delay
//! lines, reverb tails) stops advancing.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::chorus::Chorus;
use crate::dsp::compressor::Compressor;
use crate::dsp::delay::StereoDelay;
use crate::dsp::distortion::Distortion;
use crate::dsp::reverb::Reverb;
use crate::dsp::tempo::NoteDivision;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistortionSettings {
    pub enabled: bool,
    pub drive: f32,
    pub mix: f32,
}

impl Default for DistortionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            drive: 2.0,
            mix: 0.5,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChorusSettings {
    pub enabled: bool,
    pub rate: f32,
    /// Modulation depth in milliseconds.
    pub depth: f32,
    pub mix: f32,
}

impl Default for ChorusSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: 0.8,
            depth: 3.0,
            mix: 0.35,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelaySettings {
    pub enabled: bool,
    /// Free delay time in seconds, used when `sync` is `None`.
    pub time: f32,
    pub sync: Option<NoteDivision>,
    pub feedback: f32,
    pub tone: f32,
    pub mix: f32,
}

impl DelaySettings {
    /// Delay time in seconds at `bpm`.
    pub fn effective_time(&self, bpm: f32) -> f32 {
        match self.sync {
            Some(division) => division.seconds(bpm),
            None => self.time,
        }
    }
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            time: 0.35,
            sync: None,
            feedback: 0.35,
            tone: 0.6,
            mix: 0.3,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbSettings {
    pub enabled: bool,
    pub size: f32,
    pub damping: f32,
    pub mix: f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            size: 0.5,
            damping: 0.5,
            mix: 0.25,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    pub enabled: bool,
    pub threshold: f32,
    pub ratio: f32,
    pub attack: f32,
    pub release: f32,
    pub makeup: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.7,
            ratio: 4.0,
            attack: 0.005,
            release: 0.1,
            makeup: 1.5,
        }
    }
}

/// Settings for the whole chain, as stored in the patch.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EffectsSettings {
    pub distortion: DistortionSettings,
    pub chorus: ChorusSettings,
    pub delay: DelaySettings,
    pub reverb: ReverbSettings,
    pub compressor: CompressorSettings,
}

/// Stage state for the master bus.
pub struct EffectsChain {
    settings: EffectsSettings,
    distortion: Distortion,
    chorus: Chorus,
    delay: StereoDelay,
    reverb: Reverb,
    compressor: Compressor,
}

impl EffectsChain {
    pub fn new(sample_rate: f32) -> Self {
        let mut chain = Self {
            settings: EffectsSettings::default(),
            distortion: Distortion::new(1.0, 0.0),
            chorus: Chorus::new(sample_rate),
            delay: StereoDelay::new(sample_rate),
            reverb: Reverb::new(sample_rate),
            compressor: Compressor::new(sample_rate),
        };
        chain.configure(&EffectsSettings::default(), crate::dsp::tempo::DEFAULT_TEMPO);
        chain
    }

    /// Push new settings into every stage. Stages that were just switched
    /// off are cleared so they restart silent.
    pub fn configure(&mut self, settings: &EffectsSettings, bpm: f32) {
        let previous = self.settings;

        self.distortion.set_drive(settings.distortion.drive);
        self.distortion.set_mix(settings.distortion.mix);

        self.chorus.set_rate(settings.chorus.rate);
        self.chorus.set_depth(settings.chorus.depth);
        self.chorus.set_mix(settings.chorus.mix);
        if previous.chorus.enabled && !settings.chorus.enabled {
            self.chorus.reset();
        }

        self.delay.set_time(settings.delay.effective_time(bpm));
        self.delay.set_feedback(settings.delay.feedback);
        self.delay.set_tone(settings.delay.tone);
        self.delay.set_mix(settings.delay.mix);
        if previous.delay.enabled && !settings.delay.enabled {
            self.delay.reset();
        }

        self.reverb.set_size(settings.reverb.size);
        self.reverb.set_damping(settings.reverb.damping);
        self.reverb.set_mix(settings.reverb.mix);
        if previous.reverb.enabled && !settings.reverb.enabled {
            self.reverb.reset();
        }

        self.compressor.set_threshold(settings.compressor.threshold);
        self.compressor.set_ratio(settings.compressor.ratio);
        self.compressor.set_attack(settings.compressor.attack);
        self.compressor.set_release(settings.compressor.release);
        self.compressor.set_makeup(settings.compressor.makeup);
        if previous.compressor.enabled && !settings.compressor.enabled {
            self.compressor.reset();
        }

        self.settings = *settings;
    }

    pub fn settings(&self) -> &EffectsSettings {
        &self.settings
    }

    /// Process split stereo buffers in place.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let s = self.settings;
        if !(s.distortion.enabled
            || s.chorus.enabled
            || s.delay.enabled
            || s.reverb.enabled
            || s.compressor.enabled)
        {
            return;
        }

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (mut x, mut y) = (*l, *r);
            if s.distortion.enabled {
                x = self.distortion.process(x);
                y = self.distortion.process(y);
            }
            if s.chorus.enabled {
                (x, y) = self.chorus.process(x, y);
            }
            if s.delay.enabled {
                (x, y) = self.delay.process(x, y);
            }
            if s.reverb.enabled {
                (x, y) = self.reverb.process(x, y);
            }
            if s.compressor.enabled {
                (x, y) = self.compressor.process(x, y);
            }
            *l = x;
            *r = y;
        }
    }

    pub fn reset(&mut self) {
        self.chorus.reset();
        self.delay.reset();
        self.reverb.reset();
        self.compressor.reset();
    }
}
