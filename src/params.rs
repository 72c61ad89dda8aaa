//! Per-run configuration parameters for the progressive alignment workflow.
//!
//! A [`Params`] value describes one benchmark run: which knobs of the
//! workflow configuration template are overridden and how. Every axis is
//! optional; `None` means "leave the template's default in place", so a
//! default `Params` benchmarks the stock configuration.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outgroup selection strategy used by the progressive decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutgroupStrategy {
    /// No outgroups are assigned
    None,
    /// Greedy assignment over internal nodes
    Greedy,
    /// Greedy assignment restricted to leaves
    GreedyLeaves,
}

impl OutgroupStrategy {
    /// The spelling the workflow configuration understands.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutgroupStrategy::None => "none",
            OutgroupStrategy::Greedy => "greedy",
            OutgroupStrategy::GreedyLeaves => "greedyLeaves",
        }
    }
}

impl FromStr for OutgroupStrategy {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(OutgroupStrategy::None),
            "greedy" => Ok(OutgroupStrategy::Greedy),
            "greedyLeaves" => Ok(OutgroupStrategy::GreedyLeaves),
            other => Err(BenchError::UnknownValue {
                axis: "outgroup strategy",
                value: other.to_string(),
            }),
        }
    }
}

/// Single-copy filtering strategy for the coverage stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SingleCopyStrategy {
    /// No single-copy requirement
    None,
    /// Require single-copy in the outgroup only
    Outgroup,
    /// Require single-copy in all genomes
    All,
}

impl SingleCopyStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SingleCopyStrategy::None => "none",
            SingleCopyStrategy::Outgroup => "outgroup",
            SingleCopyStrategy::All => "all",
        }
    }
}

impl FromStr for SingleCopyStrategy {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(SingleCopyStrategy::None),
            "outgroup" => Ok(SingleCopyStrategy::Outgroup),
            "all" => Ok(SingleCopyStrategy::All),
            other => Err(BenchError::UnknownValue {
                axis: "single-copy strategy",
                value: other.to_string(),
            }),
        }
    }
}

/// The caf/bar iteration overrides that are swept together as one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IterationParams {
    /// `minimumChainLength` on the blast iteration's core element
    pub min_chain_length: Option<u32>,
    /// `minimumBlockDegree` on the base iteration
    pub min_block_degree: Option<u32>,
    /// `maximumGroupSize` on the blast iteration's core element
    pub max_group_size: Option<u64>,
}

/// Configuration overrides for one benchmark run.
///
/// Only `Some` fields are patched into the workflow configuration; the
/// template's defaults cover the rest.
///
/// # Example
/// ```
/// use progressive_bench::params::{Params, OutgroupStrategy};
///
/// let params = Params::builder()
///     .outgroup_strategy(OutgroupStrategy::Greedy)
///     .required_fraction(0.67)
///     .build();
///
/// assert_eq!(params.to_string(), "_ogGreedy_cf0.67");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Minimum chain length for the blast (caf) iteration
    pub min_chain_length: Option<u32>,

    /// Minimum block degree for the base (bar) iteration
    pub min_block_degree: Option<u32>,

    /// Maximum group size for the blast iteration
    pub max_group_size: Option<u64>,

    /// Outgroup assignment strategy
    pub outgroup_strategy: Option<OutgroupStrategy>,

    /// Single-copy filtering strategy
    pub single_copy_strategy: Option<SingleCopyStrategy>,

    /// Required coverage fraction (0.0-1.0)
    pub required_fraction: Option<f64>,

    /// Whether genomes are aligned against themselves
    pub self_alignment: Option<bool>,

    /// Maximum subtree size for the decomposition
    pub subtree_size: Option<u32>,

    /// Control run against the unmodified (non-progressive) workflow
    pub vanilla: bool,

    /// Use a kyoto-tycoon database server instead of the file database
    pub kyoto_tycoon: Option<bool>,
}

/// Column headers matching [`Params::as_row`], in order.
pub const PARAMS_HEADER: [&str; 10] = [
    "Style",
    "MinChainLen",
    "MinBlockDeg",
    "MaxGroupSize",
    "Outgroup",
    "SingleCpy",
    "ReqFrac",
    "Self",
    "SubtreeSize",
    "Kyoto",
];

impl Params {
    /// Creates a new parameter builder.
    pub fn builder() -> ParamsBuilder {
        ParamsBuilder::default()
    }

    /// Applies one iteration-axis value onto this parameter set.
    pub fn set_iteration(&mut self, it: IterationParams) {
        self.min_chain_length = it.min_chain_length;
        self.min_block_degree = it.min_block_degree;
        self.max_group_size = it.max_group_size;
    }

    /// Checks that the combination is runnable.
    ///
    /// A vanilla control run exercises the workflow without the progressive
    /// decomposition, so none of the progressive-only axes may be set.
    pub fn validate(&self) -> Result<()> {
        if self.vanilla {
            let progressive_set = self.outgroup_strategy.is_some()
                || self.single_copy_strategy.is_some()
                || self.required_fraction.is_some()
                || self.self_alignment.is_some()
                || self.subtree_size.is_some()
                || self.kyoto_tycoon == Some(true);
            if progressive_set {
                return Err(BenchError::InvalidParams(format!(
                    "vanilla run must not set progressive axes: {self:?}"
                )));
            }
        }
        if let Some(f) = self.required_fraction {
            if !(0.0..=1.0).contains(&f) {
                return Err(BenchError::InvalidParams(format!(
                    "required_fraction must be in [0, 1], got {f}"
                )));
            }
        }
        Ok(())
    }

    /// CSV cells in [`PARAMS_HEADER`] order. Unset axes become empty cells.
    pub fn as_row(&self) -> Vec<String> {
        fn cell<T: fmt::Display>(value: &Option<T>) -> String {
            value.as_ref().map(T::to_string).unwrap_or_default()
        }

        vec![
            if self.vanilla { "Vanilla" } else { "Progressive" }.to_string(),
            cell(&self.min_chain_length),
            cell(&self.min_block_degree),
            cell(&self.max_group_size),
            cell(&self.outgroup_strategy.map(|s| s.as_str())),
            cell(&self.single_copy_strategy.map(|s| s.as_str())),
            cell(&self.required_fraction),
            cell(&self.self_alignment),
            cell(&self.subtree_size),
            cell(&self.kyoto_tycoon),
        ]
    }
}

/// Title-cases a rendered axis value the way run tokens spell them
/// ("greedyLeaves" -> "Greedyleaves", "true" -> "True", "0.67" -> "0.67").
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.extend(chars.flat_map(|c| c.to_lowercase()));
    }
    out
}

impl fmt::Display for Params {
    /// Renders the compact run token used as the run-directory name,
    /// e.g. `_mc4_ogGreedy_cf0.67` or `_Default` when nothing is set.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn item<T: fmt::Display>(token: &mut String, prefix: &str, value: &Option<T>) {
            if let Some(v) = value {
                token.push('_');
                token.push_str(prefix);
                token.push_str(&title_case(&v.to_string()));
            }
        }

        let mut token = String::new();
        item(&mut token, "mc", &self.min_chain_length);
        item(&mut token, "mb", &self.min_block_degree);
        item(&mut token, "mg", &self.max_group_size);
        item(&mut token, "og", &self.outgroup_strategy.map(|s| s.as_str()));
        item(&mut token, "sc", &self.single_copy_strategy.map(|s| s.as_str()));
        item(&mut token, "cf", &self.required_fraction);
        item(&mut token, "sa", &self.self_alignment);
        item(&mut token, "st", &self.subtree_size);
        item(&mut token, "kt", &self.kyoto_tycoon);
        if self.vanilla {
            token.push_str("_Vanilla");
        }
        if token.is_empty() {
            token.push_str("_Default");
        }
        f.write_str(&token)
    }
}

/// Builder for constructing [`Params`] instances.
#[derive(Debug, Default)]
pub struct ParamsBuilder {
    params: Params,
}

impl ParamsBuilder {
    pub fn min_chain_length(mut self, length: u32) -> Self {
        self.params.min_chain_length = Some(length);
        self
    }

    pub fn min_block_degree(mut self, degree: u32) -> Self {
        self.params.min_block_degree = Some(degree);
        self
    }

    pub fn max_group_size(mut self, size: u64) -> Self {
        self.params.max_group_size = Some(size);
        self
    }

    pub fn outgroup_strategy(mut self, strategy: OutgroupStrategy) -> Self {
        self.params.outgroup_strategy = Some(strategy);
        self
    }

    pub fn single_copy_strategy(mut self, strategy: SingleCopyStrategy) -> Self {
        self.params.single_copy_strategy = Some(strategy);
        self
    }

    /// Sets the required coverage fraction. Must be in `[0, 1]`;
    /// checked by [`Params::validate`].
    pub fn required_fraction(mut self, fraction: f64) -> Self {
        self.params.required_fraction = Some(fraction);
        self
    }

    pub fn self_alignment(mut self, enabled: bool) -> Self {
        self.params.self_alignment = Some(enabled);
        self
    }

    pub fn subtree_size(mut self, size: u32) -> Self {
        self.params.subtree_size = Some(size);
        self
    }

    /// Marks this as a vanilla control run.
    pub fn vanilla(mut self) -> Self {
        self.params.vanilla = true;
        self
    }

    pub fn kyoto_tycoon(mut self, enabled: bool) -> Self {
        self.params.kyoto_tycoon = Some(enabled);
        self
    }

    /// Builds the final [`Params`] instance.
    pub fn build(self) -> Params {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_params_render_as_default_token() {
        assert_eq!(Params::default().to_string(), "_Default");
    }

    #[test]
    fn token_covers_all_set_axes_in_order() {
        let params = Params::builder()
            .min_chain_length(4)
            .min_block_degree(2)
            .max_group_size(1_000_000)
            .outgroup_strategy(OutgroupStrategy::GreedyLeaves)
            .single_copy_strategy(SingleCopyStrategy::Outgroup)
            .required_fraction(0.67)
            .self_alignment(true)
            .subtree_size(3)
            .kyoto_tycoon(false)
            .build();
        assert_eq!(
            params.to_string(),
            "_mc4_mb2_mg1000000_ogGreedyleaves_scOutgroup_cf0.67_saTrue_st3_ktFalse"
        );
    }

    #[test]
    fn vanilla_token() {
        let params = Params::builder().vanilla().build();
        assert_eq!(params.to_string(), "_Vanilla");
        params.validate().unwrap();
    }

    #[test]
    fn vanilla_rejects_progressive_axes() {
        let mut params = Params::builder()
            .outgroup_strategy(OutgroupStrategy::Greedy)
            .build();
        params.vanilla = true;
        assert!(params.validate().is_err());
    }

    #[test]
    fn required_fraction_bounds() {
        let params = Params::builder().required_fraction(1.5).build();
        assert!(params.validate().is_err());
        let params = Params::builder().required_fraction(1.0).build();
        params.validate().unwrap();
    }

    #[test]
    fn row_matches_header_width() {
        let params = Params::builder()
            .outgroup_strategy(OutgroupStrategy::None)
            .required_fraction(0.0)
            .build();
        let row = params.as_row();
        assert_eq!(row.len(), PARAMS_HEADER.len());
        assert_eq!(row[0], "Progressive");
        assert_eq!(row[4], "none");
        assert_eq!(row[6], "0");
        assert_eq!(row[1], "");
    }

    #[test]
    fn strategies_round_trip_workflow_spellings() {
        assert_eq!(
            "greedyLeaves".parse::<OutgroupStrategy>().unwrap(),
            OutgroupStrategy::GreedyLeaves
        );
        assert_eq!(OutgroupStrategy::GreedyLeaves.as_str(), "greedyLeaves");
        assert!("Greedy".parse::<OutgroupStrategy>().is_err());
        assert_eq!(
            "outgroup".parse::<SingleCopyStrategy>().unwrap(),
            SingleCopyStrategy::Outgroup
        );
    }
}
