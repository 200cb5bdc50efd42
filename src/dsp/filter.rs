use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
| type              | passes               | rejects              |
| ----------------- | -------------------- | -------------------- |
| low-pass          | below cutoff         | above cutoff         |
| high-pass         | above cutoff         | below cutoff         |
| band-pass         | around cutoff        | far from cutoff      |
| notch / band-stop | far from cutoff      | around cutoff        |
| all-pass          | everything           | nothing (phase only) |

All five come out of one topology-preserving-transform SVF:

    g = tan(π·fc / fs)       integrator gain
    k = 2 - 2·resonance      damping (2 = flat, 0 = self-oscillation)

    v3 = x - ic2
    v1 = (ic1 + g·v3) / (1 + g(g + k))
    v2 = ic2 + g·v1

    lp = v2    bp = v1    hp = x - k·v1 - v2
    notch = x - k·v1      allpass = x - 2k·v1

The cutoff fed to `tan` is always clamped to [20 Hz, 0.49·fs]. At 0.5·fs
the tangent diverges, so the clamp is what keeps the filter stable under
any amount of envelope or matrix modulation.
*/

/// Lowest cutoff the filter will ever run at.
pub const MIN_CUTOFF_HZ: f32 = 20.0;
/// Highest cutoff as a fraction of the sample rate.
pub const MAX_CUTOFF_RATIO: f32 = 0.49;
/// Resonance is kept just short of 1.0 so k never reaches zero.
pub const MAX_RESONANCE: f32 = 0.98;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    LowPass,
    HighPass,
    BandPass,
    Notch,
    AllPass,
}

impl FilterMode {
    pub const ALL: [FilterMode; 5] = [
        FilterMode::LowPass,
        FilterMode::HighPass,
        FilterMode::BandPass,
        FilterMode::Notch,
        FilterMode::AllPass,
    ];

    pub fn from_index(index: i32) -> Self {
        let last = Self::ALL.len() as i32 - 1;
        Self::ALL[index.clamp(0, last) as usize]
    }

    pub fn index(self) -> i32 {
        Self::ALL.iter().position(|&m| m == self).unwrap_or(0) as i32
    }
}

/// Clamp a cutoff into the stable range for `sample_rate`. NaN maps to the floor.
#[inline]
pub fn clamp_cutoff(cutoff_hz: f32, sample_rate: f32) -> f32 {
    let max = (sample_rate * MAX_CUTOFF_RATIO).max(MIN_CUTOFF_HZ);
    if cutoff_hz.is_nan() {
        return MIN_CUTOFF_HZ;
    }
    cutoff_hz.clamp(MIN_CUTOFF_HZ, max)
}

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
    pub notch: f32,
    pub allpass: f32,
}

impl FilterOutputs {
    #[inline]
    pub fn select(&self, mode: FilterMode) -> f32 {
        match mode {
            FilterMode::LowPass => self.lowpass,
            FilterMode::HighPass => self.highpass,
            FilterMode::BandPass => self.bandpass,
            FilterMode::Notch => self.notch,
            FilterMode::AllPass => self.allpass,
        }
    }
}

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    mode: FilterMode,
    sample_rate: f32,

    // Last values the coefficients were computed for
    cutoff_hz: f32,
    resonance: f32,
    g: f32,
    k: f32,
    h: f32,
}

impl SVFilter {
    pub fn new(mode: FilterMode, sample_rate: f32) -> Self {
        let mut filter = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            mode,
            sample_rate,
            cutoff_hz: f32::NAN,
            resonance: f32::NAN,
            g: 0.0,
            k: 2.0,
            h: 1.0,
        };
        filter.set_params(1000.0, 0.0);
        filter
    }

    pub fn lowpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        let mut filter = Self::new(FilterMode::LowPass, sample_rate);
        filter.set_params(cutoff_hz, 0.0);
        filter
    }

    pub fn highpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        let mut filter = Self::new(FilterMode::HighPass, sample_rate);
        filter.set_params(cutoff_hz, 0.0);
        filter
    }

    /// Update cutoff and resonance. Coefficients are recomputed only when
    /// either clamped value actually changed.
    pub fn set_params(&mut self, cutoff_hz: f32, resonance: f32) {
        let cutoff = clamp_cutoff(cutoff_hz, self.sample_rate);
        let resonance = if resonance.is_nan() {
            0.0
        } else {
            resonance.clamp(0.0, MAX_RESONANCE)
        };

        if cutoff == self.cutoff_hz && resonance == self.resonance {
            return;
        }

        self.cutoff_hz = cutoff;
        self.resonance = resonance;
        self.g = (PI * cutoff / self.sample_rate).tan();
        self.k = 2.0 - 2.0 * resonance;
        self.h = 1.0 / (1.0 + self.g * (self.g + self.k));
    }

    pub fn set_mode(&mut self, mode: FilterMode) {
        self.mode = mode;
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        let (cutoff, resonance) = (self.cutoff_hz, self.resonance);
        self.cutoff_hz = f32::NAN;
        self.set_params(cutoff, resonance);
    }

    #[inline]
    pub fn tick(&mut self, sample: f32) -> FilterOutputs {
        let v3 = sample - self.ic2eq;
        let v1 = self.h * (self.ic1eq + self.g * v3);
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - self.k * v1 - v2,
            notch: sample - self.k * v1,
            allpass: sample - 2.0 * self.k * v1,
        }
    }

    #[inline]
    pub fn next_sample(&mut self, sample: f32) -> f32 {
        let mode = self.mode;
        self.tick(sample).select(mode)
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    /// Cutoff currently in effect, after clamping.
    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }
}
