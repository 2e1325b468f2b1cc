//! Perceptual frequency axes.
//!
//! A [`FrequencyScale`] maps linear frequency in Hz onto a perceptual value
//! and back. The remapper in `specflow-analysis` spaces destination buckets
//! uniformly in perceptual units, so on a [`Decade`](FrequencyScale::Decade)
//! axis every decade occupies the same display width.
//!
//! | Scale | Forward | Inverse |
//! |-------|---------|---------|
//! | `Linear` | `f` | `v` |
//! | `Decade` | `log10(f)` | `10^v` |
//! | `Octave` | `log2(f + 1)` | `2^v - 1` |
//! | `Mel` | `1127 ln(1 + f/440)` | `440 (e^(v/1127) - 1)` |
//! | `Cochlear` | `log10(f/165.4 + 0.88) / 2.1` | `165.4 (10^(2.1 v) - 0.88)` |
//!
//! `Cochlear` is the Greenwood place-frequency function for the human
//! cochlea: the output is the relative distance from the apex, so equal steps
//! correspond to equal lengths of basilar membrane.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Mel corner frequency in Hz.
const MEL_CORNER_HZ: f64 = 440.0;
/// Mel curve gain.
const MEL_GAIN: f64 = 1127.0;

/// Greenwood constants for the human cochlea.
const GREENWOOD_A: f64 = 165.4;
const GREENWOOD_ALPHA: f64 = 2.1;
const GREENWOOD_K: f64 = 0.88;

/// A forward/inverse mapping between linear and perceptual frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum FrequencyScale {
    /// No mapping; buckets are linear in frequency.
    Linear,
    /// Base-10 logarithm. Requires strictly positive frequencies.
    #[default]
    Decade,
    /// Base-2 logarithm of `f + 1`.
    Octave,
    /// Mel-like curve with a 440 Hz corner.
    Mel,
    /// Greenwood cochlear position.
    Cochlear,
}

impl FrequencyScale {
    /// Every scale, in display order.
    pub const ALL: [Self; 5] = [
        Self::Linear,
        Self::Decade,
        Self::Octave,
        Self::Mel,
        Self::Cochlear,
    ];

    /// Kebab-case name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Decade => "decade",
            Self::Octave => "octave",
            Self::Mel => "mel",
            Self::Cochlear => "cochlear",
        }
    }

    /// Maps a frequency in Hz to perceptual units.
    #[inline]
    pub fn to_perceptual(self, frequency: f64) -> f64 {
        match self {
            Self::Linear => frequency,
            Self::Decade => frequency.log10(),
            Self::Octave => (frequency + 1.0).log2(),
            Self::Mel => MEL_GAIN * (frequency / MEL_CORNER_HZ).ln_1p(),
            Self::Cochlear => (frequency / GREENWOOD_A + GREENWOOD_K).log10() / GREENWOOD_ALPHA,
        }
    }

    /// Maps perceptual units back to Hz.
    #[inline]
    pub fn from_perceptual(self, value: f64) -> f64 {
        match self {
            Self::Linear => value,
            Self::Decade => 10f64.powf(value),
            Self::Octave => value.exp2() - 1.0,
            Self::Mel => MEL_CORNER_HZ * (value / MEL_GAIN).exp_m1(),
            Self::Cochlear => GREENWOOD_A * (10f64.powf(GREENWOOD_ALPHA * value) - GREENWOOD_K),
        }
    }

    /// Returns `true` if the forward mapping is undefined at 0 Hz.
    pub fn requires_positive(self) -> bool {
        self == Self::Decade
    }
}

impl fmt::Display for FrequencyScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FrequencyScale {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" | "none" => Ok(Self::Linear),
            "decade" | "log" | "log10" => Ok(Self::Decade),
            "octave" | "log2" => Ok(Self::Octave),
            "mel" => Ok(Self::Mel),
            "cochlear" | "greenwood" => Ok(Self::Cochlear),
            _ => Err(CoreError::UnknownName {
                kind: "scale",
                name: s.to_string(),
            }),
        }
    }
}
