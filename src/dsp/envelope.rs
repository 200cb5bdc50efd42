#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::MIN_TIME;

/*
ADSR Envelope Implementation
============================

A linear ADSR envelope generator. Every voice runs three of them: one for
amplitude, one for the filter cutoff and one for pitch.

Vocabulary
----------

  level       The envelope's current output value, always within [0, 1].

  stage       Which phase of the envelope we're in: Idle, Attack, Decay,
              Sustain, or Release.

  peak        The level the attack ramps to. Velocity scales it down:

                  peak = lerp(1.0, velocity, velocity_sensitivity)

              Sensitivity 0 always reaches 1.0; sensitivity 1 makes a soft
              note (velocity 0.2) peak at 0.2.

  sustain     A FRACTION of the peak, so velocity scales the whole shape.


The Shape: Linear Ramps
-----------------------

  Level
   peak ┐     ╱╲
        │    ╱  ╲___________
   S·pk │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release


The State Machine
-----------------

    Idle ──note_on──► Attack ──level=peak──► Decay ──level=S·peak──► Sustain
     ▲                  │                      │                       │
     │                  └──────── note_off ────┴───────────────────────┘
     │                                         ▼
     └────────────── level = 0 ───────────── Release

note_on from ANY stage restarts Attack from the CURRENT level, so a
retriggered or stolen voice ramps up from where it was instead of jumping
to zero. note_off from any non-Idle stage starts Release from the current
level.

Two flags change that:

  retrigger   note_on drops the level to zero first, so every note gets
              the full attack.

  looping     Sustain lasts one sample, then a new Attack starts from the
              sustain level (or from zero with retrigger). The envelope
              cycles until note_off.


Release Timing
--------------

Release snapshots the starting level and converts the release time into a
whole number of samples at note_off:

    total = round(release × sample_rate)
    level = start × (1 - elapsed / total)

After exactly `total` samples the level is 0.0 and the stage is Idle, so
the voice is free within one sample of `release` seconds.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,    // Envelope inactive, level = 0
    Attack,  // Ramping from the trigger level up to peak
    Decay,   // Ramping from peak down to sustain
    Sustain, // Holding while the gate is high
    Release, // Gate went low, ramping down to 0
}

/// Envelope times and levels, shared by all three envelope slots.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrSettings {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    pub velocity_sensitivity: f32,
    /// Every note-on restarts the attack from zero instead of the current level.
    pub retrigger: bool,
    /// Reaching sustain starts a new attack while the gate is high.
    pub looping: bool,
}

impl AdsrSettings {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
            velocity_sensitivity: 0.0,
            retrigger: false,
            looping: false,
        }
    }
}

impl Default for AdsrSettings {
    fn default() -> Self {
        Self::new(0.01, 0.1, 0.7, 0.3)
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,
    velocity_sensitivity: f32,
    retrigger: bool,
    looping: bool,
    sample_rate: f32,

    stage: EnvelopeStage,
    level: f32,
    peak: f32,

    attack_start_level: f32,

    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Envelope {
    pub fn new(sample_rate: f32) -> Self {
        Self::with_settings(AdsrSettings::default(), sample_rate)
    }

    pub fn with_settings(settings: AdsrSettings, sample_rate: f32) -> Self {
        let mut env = Self {
            attack_time: 0.0,
            decay_time: 0.0,
            sustain_level: 0.0,
            release_time: 0.0,
            velocity_sensitivity: 0.0,
            retrigger: false,
            looping: false,
            sample_rate: sample_rate.max(1.0),

            stage: EnvelopeStage::Idle,
            level: 0.0,
            peak: 1.0,
            attack_start_level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        };
        env.apply_settings(settings);
        env
    }

    /// Replace the envelope shape. Takes effect on the next sample; a release
    /// already in progress keeps its original length.
    pub fn apply_settings(&mut self, settings: AdsrSettings) {
        self.attack_time = sanitize_time(settings.attack);
        self.decay_time = sanitize_time(settings.decay);
        self.sustain_level = sanitize_unit(settings.sustain);
        self.release_time = sanitize_time(settings.release);
        self.velocity_sensitivity = sanitize_unit(settings.velocity_sensitivity);
        self.retrigger = settings.retrigger;
        self.looping = settings.looping;
    }

    /// Gate high: start the attack from the current level, or from zero
    /// when `retrigger` is set.
    ///
    /// `velocity` is normalized to [0, 1].
    pub fn note_on(&mut self, velocity: f32) {
        let velocity = sanitize_unit(velocity);
        self.peak = 1.0 + (velocity - 1.0) * self.velocity_sensitivity;
        if self.retrigger {
            self.level = 0.0;
        }
        self.start_attack();
        self.release_elapsed_samples = 0;
    }

    fn start_attack(&mut self) {
        self.attack_start_level = self.level.min(self.peak);
        self.level = self.attack_start_level;
        self.stage = EnvelopeStage::Attack;
    }

    /// Gate low: start the release phase from the current level.
    pub fn note_off(&mut self) {
        if self.stage == EnvelopeStage::Idle {
            return;
        }

        self.release_start_level = self.level;
        self.release_total_samples = (self.release_time * self.sample_rate).round().max(1.0) as u32;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeStage::Release;
    }

    /// Advance the envelope by one sample and return the new level.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }

            EnvelopeStage::Attack => {
                let span = (self.peak - self.attack_start_level).max(0.0);
                self.level += span.max(f32::EPSILON) / (self.attack_time * self.sample_rate);

                if self.level >= self.peak {
                    self.level = self.peak;
                    self.stage = EnvelopeStage::Decay;
                }
            }

            EnvelopeStage::Decay => {
                let target = self.sustain_level * self.peak;
                let total_drop = self.peak - target;
                self.level -= total_drop / (self.decay_time * self.sample_rate);

                if self.level <= target {
                    self.level = target;
                    self.stage = EnvelopeStage::Sustain;
                }
            }

            EnvelopeStage::Sustain => {
                self.level = self.sustain_level * self.peak;
                if self.looping {
                    if self.retrigger {
                        self.level = 0.0;
                    }
                    self.start_attack();
                }
            }

            EnvelopeStage::Release => {
                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = self.release_start_level * (1.0 - progress);

                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }

        self.level = self.level.clamp(0.0, 1.0);
        self.level
    }

    /// Render a block of envelope values into the buffer.
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// Returns true if the envelope is producing output (not idle).
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    /// Jump straight to Idle at zero.
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.release_elapsed_samples = 0;
        self.release_start_level = 0.0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
    }
}

#[inline]
fn sanitize_time(seconds: f32) -> f32 {
    if seconds.is_nan() {
        MIN_TIME
    } else {
        seconds.max(MIN_TIME)
    }
}

#[inline]
fn sanitize_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn render_samples(env: &mut Envelope, samples: usize) {
        for _ in 0..samples {
            env.next_sample();
        }
    }

    fn adsr(a: f32, d: f32, s: f32, r: f32) -> Envelope {
        Envelope::with_settings(AdsrSettings::new(a, d, s, r), SAMPLE_RATE)
    }

    #[test]
    fn attack_reaches_full_level() {
        let mut env = adsr(0.01, 0.1, 0.7, 0.2);

        env.note_on(1.0);
        render_samples(&mut env, (0.01 * SAMPLE_RATE) as usize);

        assert!(env.level() > 0.99, "expected attack to reach full level");
        assert_ne!(env.stage(), EnvelopeStage::Attack);
    }

    #[test]
    fn sustain_holds_target_level() {
        let sustain = 0.6;
        let mut env = adsr(0.01, 0.05, sustain, 0.2);

        env.note_on(1.0);
        render_samples(&mut env, ((0.01 + 0.05) * SAMPLE_RATE) as usize + 5);

        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((env.level() - sustain).abs() < 0.05, "sustain level should be held");
    }

    #[test]
    fn release_reaches_zero_within_one_sample_of_release_time() {
        let release = 0.03;
        let mut env = adsr(0.005, 0.05, 0.5, release);

        env.note_on(1.0);
        render_samples(&mut env, 20);
        env.note_off();

        let release_samples = (release * SAMPLE_RATE) as usize;
        render_samples(&mut env, release_samples - 1);
        assert!(env.level() > 0.0, "release must not finish early");

        render_samples(&mut env, 1);
        assert_eq!(env.level(), 0.0);
        assert_eq!(env.stage(), EnvelopeStage::Idle);
    }

    #[test]
    fn release_during_attack_starts_from_current_level() {
        let mut env = adsr(0.1, 0.1, 0.5, 0.05);
        env.note_on(1.0);
        render_samples(&mut env, 30);
        let before = env.level();

        env.note_off();
        let first = env.next_sample();
        assert!(first <= before && before - first < 0.05, "no jump at release start");
    }

    #[test]
    fn velocity_scales_peak() {
        let mut env = Envelope::with_settings(
            AdsrSettings {
                velocity_sensitivity: 1.0,
                ..AdsrSettings::new(0.005, 0.5, 1.0, 0.1)
            },
            SAMPLE_RATE,
        );
        env.note_on(0.25);
        render_samples(&mut env, 50);
        assert!((env.level() - 0.25).abs() < 0.01, "peak follows velocity: {}", env.level());
    }

    #[test]
    fn retrigger_ramps_from_current_level() {
        let mut env = adsr(0.05, 0.05, 0.5, 0.5);
        env.note_on(1.0);
        render_samples(&mut env, 200);
        env.note_off();
        render_samples(&mut env, 100);
        let level = env.level();

        env.note_on(1.0);
        let next = env.next_sample();
        assert_eq!(env.stage(), EnvelopeStage::Attack);
        assert!(next >= level && next - level < 0.05);
    }

    #[test]
    fn level_stays_in_unit_range_for_wild_settings() {
        let settings = [
            AdsrSettings::new(0.0, 0.0, 2.0, 0.0),
            AdsrSettings::new(f32::NAN, -1.0, -0.5, f32::NAN),
            AdsrSettings::new(1.0e-9, 10.0, 0.3, 1.0e-9),
        ];
        for s in settings {
            let mut env = Envelope::with_settings(s, 48_000.0);
            env.note_on(1.0);
            for i in 0..2000 {
                if i == 1000 {
                    env.note_off();
                }
                let level = env.next_sample();
                assert!((0.0..=1.0).contains(&level), "level {} escaped [0,1]", level);
            }
        }
    }

    #[test]
    fn retrigger_flag_restarts_attack_from_zero() {
        let mut env = Envelope::with_settings(
            AdsrSettings {
                retrigger: true,
                ..AdsrSettings::new(0.05, 0.05, 0.5, 0.5)
            },
            SAMPLE_RATE,
        );
        env.note_on(1.0);
        render_samples(&mut env, 200);
        assert!(env.level() > 0.4);

        env.note_on(1.0);
        assert_eq!(env.stage(), EnvelopeStage::Attack);
        assert_eq!(env.level(), 0.0);
        let next = env.next_sample();
        assert!(next > 0.0 && next < 0.05, "attack restarts at the bottom: {next}");
    }

    #[test]
    fn looping_envelope_cycles_back_to_attack() {
        let mut env = Envelope::with_settings(
            AdsrSettings {
                looping: true,
                ..AdsrSettings::new(0.01, 0.01, 0.5, 0.1)
            },
            SAMPLE_RATE,
        );
        env.note_on(1.0);

        // 10 samples of attack, 10 of decay, one at sustain, then attack again
        let mut attacks = 0;
        let mut previous = env.stage();
        for _ in 0..200 {
            env.next_sample();
            if env.stage() == EnvelopeStage::Attack && previous != EnvelopeStage::Attack {
                attacks += 1;
            }
            previous = env.stage();
            assert!((0.0..=1.0).contains(&env.level()));
        }
        assert!(attacks >= 5, "expected repeated attacks, saw {attacks}");

        env.note_off();
        render_samples(&mut env, 100);
        assert_eq!(env.stage(), EnvelopeStage::Idle);
    }

    #[test]
    fn looping_with_retrigger_drops_to_zero_each_cycle() {
        let mut env = Envelope::with_settings(
            AdsrSettings {
                looping: true,
                retrigger: true,
                ..AdsrSettings::new(0.01, 0.01, 0.5, 0.1)
            },
            SAMPLE_RATE,
        );
        env.note_on(1.0);
        let mut minimum_after_first_cycle = f32::MAX;
        for i in 0..100 {
            let level = env.next_sample();
            if i > 25 {
                minimum_after_first_cycle = minimum_after_first_cycle.min(level);
            }
        }
        assert!(minimum_after_first_cycle < 0.15, "cycle restarts near zero");
    }

    #[test]
    fn without_flags_sustain_holds() {
        let mut env = adsr(0.01, 0.01, 0.5, 0.1);
        env.note_on(1.0);
        render_samples(&mut env, 200);
        assert_eq!(env.stage(), EnvelopeStage::Sustain);
    }

    #[test]
    fn note_off_while_idle_is_ignored() {
        let mut env = adsr(0.01, 0.01, 0.5, 0.01);
        env.note_off();
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert_eq!(env.next_sample(), 0.0);
    }
}
