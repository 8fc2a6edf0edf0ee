// Speller configuration and its C layout.

use bytemuck::Zeroable;
use serde::{Deserialize, Serialize};

/// Number of suggestions a keyboard suggestion strip asks for.
pub const KEYBOARD_N_BEST: usize = 3;

/// Weight cut-off used for keyboard suggestions.
pub const KEYBOARD_MAX_WEIGHT: f32 = 4999.99;

/// Penalties applied when a suggestion changes letter case.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseHandlingConfig {
    pub start_penalty: f32,
    pub end_penalty: f32,
    pub mid_penalty: f32,
}

/// Tuning knobs for suggestion generation. `None` means "engine default".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellerConfig {
    /// Maximum number of suggestions.
    pub n_best: Option<usize>,
    /// Suggestions heavier than this are dropped.
    pub max_weight: Option<f32>,
    /// Search beam relative to the best weight found so far.
    pub beam: Option<f32>,
    pub case_handling: Option<CaseHandlingConfig>,
    /// Size of the native search node pool.
    pub node_pool_size: Option<usize>,
}

impl SpellerConfig {
    /// The configuration a keyboard uses for its suggestion strip.
    pub fn keyboard() -> Self {
        Self {
            n_best: Some(KEYBOARD_N_BEST),
            max_weight: Some(KEYBOARD_MAX_WEIGHT),
            ..Self::default()
        }
    }

    pub fn with_n_best(mut self, n_best: usize) -> Self {
        self.n_best = Some(n_best);
        self
    }

    pub fn with_max_weight(mut self, max_weight: f32) -> Self {
        self.max_weight = Some(max_weight);
        self
    }

    /// Whether only `n_best` is set, i.e. the config can be honored without
    /// native support.
    pub fn is_count_only(&self) -> bool {
        self.max_weight.is_none()
            && self.beam.is_none()
            && self.case_handling.is_none()
            && self.node_pool_size.is_none()
    }
}

/// `#[repr(C)]` mirror of [`CaseHandlingConfig`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Zeroable)]
pub struct CCaseHandlingConfig {
    pub start_penalty: f32,
    pub end_penalty: f32,
    pub mid_penalty: f32,
}

/// `#[repr(C)]` mirror of [`SpellerConfig`], passed by pointer.
///
/// Zero in any field means "engine default"; `CSpellerConfig::zeroed()` is
/// therefore the all-defaults configuration.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Zeroable)]
pub struct CSpellerConfig {
    pub n_best: usize,
    pub max_weight: f32,
    pub beam: f32,
    pub case_handling: CCaseHandlingConfig,
    pub node_pool_size: usize,
}

impl From<CaseHandlingConfig> for CCaseHandlingConfig {
    fn from(c: CaseHandlingConfig) -> Self {
        Self {
            start_penalty: c.start_penalty,
            end_penalty: c.end_penalty,
            mid_penalty: c.mid_penalty,
        }
    }
}

impl From<&SpellerConfig> for CSpellerConfig {
    fn from(config: &SpellerConfig) -> Self {
        Self {
            n_best: config.n_best.unwrap_or(0),
            max_weight: config.max_weight.unwrap_or(0.0),
            beam: config.beam.unwrap_or(0.0),
            case_handling: config
                .case_handling
                .map(CCaseHandlingConfig::from)
                .unwrap_or_else(CCaseHandlingConfig::zeroed),
            node_pool_size: config.node_pool_size.unwrap_or(0),
        }
    }
}

impl From<&CSpellerConfig> for SpellerConfig {
    fn from(c: &CSpellerConfig) -> Self {
        let nonzero_f32 = |v: f32| (v != 0.0).then_some(v);
        let nonzero_usize = |v: usize| (v != 0).then_some(v);
        let case = c.case_handling;
        let case_handling = (case != CCaseHandlingConfig::zeroed()).then_some(CaseHandlingConfig {
            start_penalty: case.start_penalty,
            end_penalty: case.end_penalty,
            mid_penalty: case.mid_penalty,
        });
        Self {
            n_best: nonzero_usize(c.n_best),
            max_weight: nonzero_f32(c.max_weight),
            beam: nonzero_f32(c.beam),
            case_handling,
            node_pool_size: nonzero_usize(c.node_pool_size),
        }
    }
}
