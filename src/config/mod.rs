//! Configuration for a matching run.
//!
//! A [`MatchingConfig`] is frozen when a run starts. It can be assembled with
//! the builder, deserialized from JSON, or both (load a file, then override
//! single fields through the builder).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::util::safe_read_to_string;
use crate::error::{MatchError, Result};

/// Seed used when the caller does not supply one, so repeated runs agree
pub const DEFAULT_SEED: u64 = 20_080_519;

/// Matching algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Two-group nearest-neighbor matching with caliper
    NearestNeighbor,
    /// Nearest-neighbor matching that keeps left/right neighbour counts even
    BalancedNearestNeighbor,
    /// Greedy matching on successively rounded scores
    DigitGreedy,
    /// Random-order greedy matching against the closest referent
    CaliperGreedy,
    /// Bin every subject and keep bins that contain all groups
    Complete,
    /// Nearest-neighbor tuples across three or more groups
    NWay,
    /// Branch-and-bound triangle search across exactly three groups
    ThreeWay,
}

impl Algorithm {
    /// All variants, in display order
    pub const ALL: [Self; 7] = [
        Self::NearestNeighbor,
        Self::BalancedNearestNeighbor,
        Self::DigitGreedy,
        Self::CaliperGreedy,
        Self::Complete,
        Self::NWay,
        Self::ThreeWay,
    ];

    /// Stable name used on the command line and in JSON
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NearestNeighbor => "nearest-neighbor",
            Self::BalancedNearestNeighbor => "balanced-nearest-neighbor",
            Self::DigitGreedy => "digit-greedy",
            Self::CaliperGreedy => "caliper-greedy",
            Self::Complete => "complete",
            Self::NWay => "n-way",
            Self::ThreeWay => "three-way",
        }
    }

    /// Caliper used when none is configured; `None` means unbounded
    #[must_use]
    pub const fn default_caliper(self) -> Option<f64> {
        match self {
            Self::NearestNeighbor | Self::BalancedNearestNeighbor | Self::CaliperGreedy => {
                Some(0.05)
            }
            Self::Complete => Some(0.1),
            Self::DigitGreedy | Self::NWay | Self::ThreeWay => None,
        }
    }

    /// Whether the algorithm pairs a treatment group against one referent group
    #[must_use]
    pub const fn is_two_group(self) -> bool {
        matches!(
            self,
            Self::NearestNeighbor
                | Self::BalancedNearestNeighbor
                | Self::DigitGreedy
                | Self::CaliperGreedy
        )
    }

    /// Whether output rows carry a provenance column
    #[must_use]
    pub const fn emits_match_info(self) -> bool {
        self.is_two_group()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|a| a.name() == wanted)
            .ok_or_else(|| {
                MatchError::Config(format!(
                    "Unknown algorithm '{s}', expected one of: {}",
                    Self::ALL.map(Self::name).join(", ")
                ))
            })
    }
}

/// Configuration for the matching process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Which algorithm to run
    pub algorithm: Algorithm,

    /// Number of exposure groups in the input
    pub num_groups: usize,

    /// Group indicator of the treatment group for two-group algorithms
    pub treatment_group: String,

    /// Number of referents to match to each treatment unit
    pub match_ratio: usize,

    /// Keep only sets with exactly `match_ratio` referents
    pub fixed_ratio: bool,

    /// Maximum allowed distance; the algorithm default applies when unset
    pub caliper: Option<f64>,

    /// Single pass with full ratio capacity instead of one pass per ratio level
    pub use_parallel: bool,

    /// First (finest) rounding precision for digit-greedy matching
    pub start_digit: i32,

    /// Last (coarsest) rounding precision for digit-greedy matching
    pub end_digit: i32,

    /// Seed for score perturbation, shuffles and tie-breaking
    pub random_seed: Option<u64>,

    /// Worker threads for N-way heap construction
    pub workers: usize,

    /// Multiplier on the tentative tuple spread used as N-way search radius
    pub radius_scale: f64,

    /// Optional cap on per-group candidates retrieved for each N-way base
    /// member; `usize::MAX` keeps every member inside the search radius
    pub max_candidates_per_group: usize,

    /// Cheapest triangles kept open per base point in three-way matching
    pub triangles_per_query: usize,

    /// Draw progress bars on stderr
    pub show_progress: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::NearestNeighbor,
            num_groups: 2,
            treatment_group: "1".to_string(),
            match_ratio: 1,
            fixed_ratio: false,
            caliper: None,
            use_parallel: true,
            start_digit: 5,
            end_digit: 1,
            random_seed: None,
            workers: 2,
            radius_scale: 2.0,
            max_candidates_per_group: usize::MAX,
            triangles_per_query: 4,
            show_progress: false,
        }
    }
}

impl MatchingConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new builder for constructing matching configuration
    #[must_use]
    pub fn builder() -> MatchingConfigBuilder {
        MatchingConfigBuilder::new()
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = safe_read_to_string(path, "matching configuration")?;
        Self::from_json_str(&text)
    }

    /// Parse a configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Caliper in effect for this run; infinite when the algorithm has none
    #[must_use]
    pub fn effective_caliper(&self) -> f64 {
        self.caliper
            .or(self.algorithm.default_caliper())
            .unwrap_or(f64::INFINITY)
    }

    /// Seed in effect for this run
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.random_seed.unwrap_or(DEFAULT_SEED)
    }

    /// Number of score coordinates each record carries
    #[must_use]
    pub const fn score_dimensions(&self) -> usize {
        self.num_groups.saturating_sub(1)
    }

    /// Check every setting that can be checked without looking at subjects
    pub fn validate(&self) -> Result<()> {
        if self.num_groups < 2 {
            return Err(MatchError::Config(format!(
                "At least 2 groups are required, got {}",
                self.num_groups
            )));
        }

        match self.algorithm {
            a if a.is_two_group() && self.num_groups != 2 => {
                return Err(MatchError::GroupCount {
                    algorithm: a.name(),
                    required: "exactly 2",
                    found: self.num_groups,
                });
            }
            Algorithm::NWay if self.num_groups < 3 => {
                return Err(MatchError::GroupCount {
                    algorithm: Algorithm::NWay.name(),
                    required: "at least 3",
                    found: self.num_groups,
                });
            }
            Algorithm::ThreeWay if self.num_groups != 3 => {
                return Err(MatchError::GroupCount {
                    algorithm: Algorithm::ThreeWay.name(),
                    required: "exactly 3",
                    found: self.num_groups,
                });
            }
            _ => {}
        }

        if let Some(caliper) = self.caliper {
            if caliper.is_nan() || caliper <= 0.0 {
                return Err(MatchError::InvalidCaliper(caliper));
            }
        }

        if self.match_ratio == 0 {
            return Err(MatchError::Config(
                "Match ratio must be at least 1".to_string(),
            ));
        }

        if self.algorithm == Algorithm::DigitGreedy
            && (self.start_digit <= 0 || self.end_digit <= 0 || self.start_digit < self.end_digit)
        {
            return Err(MatchError::InvalidDigits {
                start: self.start_digit,
                end: self.end_digit,
            });
        }

        if self.workers == 0 {
            return Err(MatchError::Config(
                "Worker count must be at least 1".to_string(),
            ));
        }

        if !self.radius_scale.is_finite() || self.radius_scale <= 0.0 {
            return Err(MatchError::Config(format!(
                "Radius scale must be positive, got {}",
                self.radius_scale
            )));
        }

        if self.max_candidates_per_group == 0 || self.triangles_per_query == 0 {
            return Err(MatchError::Config(
                "Candidate and triangle limits must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Convert to a human-readable string representation
    #[must_use]
    pub fn to_string_representation(&self) -> String {
        let caliper = self.effective_caliper();
        format!(
            "Matching Configuration:\n\
             - Algorithm: {}\n\
             - Groups: {}\n\
             - Treatment group: {}\n\
             - Match ratio: 1:{} ({})\n\
             - Caliper: {}\n\
             - Mode: {}\n\
             - Digits: {} down to {}\n\
             - Seed: {}\n\
             - Workers: {}",
            self.algorithm,
            self.num_groups,
            self.treatment_group,
            self.match_ratio,
            if self.fixed_ratio { "fixed" } else { "variable" },
            if caliper.is_finite() {
                format!("{caliper}")
            } else {
                "none".to_string()
            },
            if self.use_parallel { "parallel" } else { "sequential" },
            self.start_digit,
            self.end_digit,
            self.seed(),
            self.workers
        )
    }
}

/// Builder for constructing matching configuration
#[derive(Debug, Clone)]
pub struct MatchingConfigBuilder {
    config: MatchingConfig,
}

impl Default for MatchingConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingConfigBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: MatchingConfig::default(),
        }
    }

    /// Start from an existing configuration
    #[must_use]
    pub const fn from_config(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Set the algorithm
    #[must_use]
    pub const fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    /// Set the number of groups
    #[must_use]
    pub const fn num_groups(mut self, groups: usize) -> Self {
        self.config.num_groups = groups;
        self
    }

    /// Set the treatment group indicator
    #[must_use]
    pub fn treatment_group(mut self, group: impl Into<String>) -> Self {
        self.config.treatment_group = group.into();
        self
    }

    /// Set the matching ratio
    #[must_use]
    pub const fn match_ratio(mut self, ratio: usize) -> Self {
        self.config.match_ratio = ratio;
        self
    }

    /// Require exactly `match_ratio` referents per set
    #[must_use]
    pub const fn fixed_ratio(mut self, fixed: bool) -> Self {
        self.config.fixed_ratio = fixed;
        self
    }

    /// Set the caliper
    #[must_use]
    pub const fn caliper(mut self, caliper: f64) -> Self {
        self.config.caliper = Some(caliper);
        self
    }

    /// Set whether to use parallel (single pass) mode
    #[must_use]
    pub const fn use_parallel(mut self, parallel: bool) -> Self {
        self.config.use_parallel = parallel;
        self
    }

    /// Set the digit range for digit-greedy matching
    #[must_use]
    pub const fn digits(mut self, start: i32, end: i32) -> Self {
        self.config.start_digit = start;
        self.config.end_digit = end;
        self
    }

    /// Set the random seed
    #[must_use]
    pub const fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = Some(seed);
        self
    }

    /// Set the N-way worker count
    #[must_use]
    pub const fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the N-way search radius multiplier
    #[must_use]
    pub const fn radius_scale(mut self, scale: f64) -> Self {
        self.config.radius_scale = scale;
        self
    }

    /// Set the per-group candidate cap for N-way matching
    #[must_use]
    pub const fn max_candidates_per_group(mut self, max: usize) -> Self {
        self.config.max_candidates_per_group = max;
        self
    }

    /// Set the open triangles per base point for three-way matching
    #[must_use]
    pub const fn triangles_per_query(mut self, count: usize) -> Self {
        self.config.triangles_per_query = count;
        self
    }

    /// Show progress bars
    #[must_use]
    pub const fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    /// Build the matching configuration
    #[must_use]
    pub fn build(self) -> MatchingConfig {
        self.config
    }
}
