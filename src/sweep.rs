//! Combinatorial sweeps over the workflow parameter axes.
//!
//! A [`Sweep`] holds the candidate values for every axis and enumerates the
//! cartesian product as [`Params`] values. Any axis left at its default
//! (`[None]`) contributes a single "use the template default" choice, so the
//! base sweep yields exactly one default run plus its vanilla control.
//!
//! For every iteration-axis value the enumeration is preceded by one vanilla
//! control run carrying only that iteration's overrides, so each iteration
//! set is benchmarked once against the non-progressive workflow.

use crate::params::{IterationParams, OutgroupStrategy, Params, SingleCopyStrategy};
use itertools::iproduct;

/// Candidate values for each parameter axis.
#[derive(Debug, Clone)]
pub struct Sweep {
    /// Blast/base iteration override triples (outermost loop)
    pub iterations: Vec<Option<IterationParams>>,
    pub outgroup_strategy: Vec<Option<OutgroupStrategy>>,
    pub single_copy_strategy: Vec<Option<SingleCopyStrategy>>,
    pub required_fraction: Vec<Option<f64>>,
    pub self_alignment: Vec<Option<bool>>,
    pub subtree_size: Vec<Option<u32>>,
}

impl Default for Sweep {
    fn default() -> Self {
        Sweep {
            iterations: vec![None],
            outgroup_strategy: vec![None],
            single_copy_strategy: vec![None],
            required_fraction: vec![None],
            self_alignment: vec![None],
            subtree_size: vec![None],
        }
    }
}

impl Sweep {
    /// Every progressive-related combination: 3 outgroup strategies x
    /// 3 single-copy strategies x 3 coverage fractions x 2 self-alignment
    /// settings (54 runs plus the vanilla control).
    pub fn all_progressive() -> Self {
        Sweep {
            outgroup_strategy: vec![
                Some(OutgroupStrategy::None),
                Some(OutgroupStrategy::Greedy),
                Some(OutgroupStrategy::GreedyLeaves),
            ],
            single_copy_strategy: vec![
                Some(SingleCopyStrategy::None),
                Some(SingleCopyStrategy::Outgroup),
                Some(SingleCopyStrategy::All),
            ],
            required_fraction: vec![Some(0.0), Some(0.67), Some(1.0)],
            self_alignment: vec![Some(true), Some(false)],
            ..Default::default()
        }
    }

    /// A smaller sweep over the axes that matter most in practice.
    pub fn basic_progressive() -> Self {
        Sweep {
            outgroup_strategy: vec![
                Some(OutgroupStrategy::None),
                Some(OutgroupStrategy::Greedy),
            ],
            single_copy_strategy: vec![Some(SingleCopyStrategy::Outgroup)],
            required_fraction: vec![Some(0.0)],
            self_alignment: vec![Some(true), Some(false)],
            ..Default::default()
        }
    }

    /// Outgroup on/off only; everything else at template defaults.
    pub fn small_progressive() -> Self {
        Sweep {
            outgroup_strategy: vec![
                Some(OutgroupStrategy::None),
                Some(OutgroupStrategy::Greedy),
            ],
            ..Default::default()
        }
    }

    /// Number of runs the sweep will emit, including vanilla controls.
    pub fn len(&self) -> usize {
        self.iterations.len()
            * (1 + self.outgroup_strategy.len()
                * self.single_copy_strategy.len()
                * self.required_fraction.len()
                * self.self_alignment.len()
                * self.subtree_size.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerates the sweep. Iteration values vary outermost, then outgroup,
    /// single-copy, coverage fraction, self-alignment, and subtree size.
    pub fn params(&self) -> Vec<Params> {
        let mut out = Vec::with_capacity(self.len());
        for it in &self.iterations {
            let mut control = Params {
                vanilla: true,
                ..Default::default()
            };
            if let Some(it) = it {
                control.set_iteration(*it);
            }
            out.push(control);

            for (og, sc, cf, sa, st) in iproduct!(
                &self.outgroup_strategy,
                &self.single_copy_strategy,
                &self.required_fraction,
                &self.self_alignment,
                &self.subtree_size
            ) {
                let mut params = Params::default();
                if let Some(it) = it {
                    params.set_iteration(*it);
                }
                params.outgroup_strategy = *og;
                params.single_copy_strategy = *sc;
                params.required_fraction = *cf;
                params.self_alignment = *sa;
                params.subtree_size = *st;
                out.push(params);
            }
        }
        out
    }

    /// Iterator form of [`Sweep::params`].
    pub fn iter(&self) -> impl Iterator<Item = Params> {
        self.params().into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_sweep_is_control_plus_default_run() {
        let tokens: Vec<String> = Sweep::default().iter().map(|p| p.to_string()).collect();
        assert_eq!(tokens, vec!["_Vanilla".to_string(), "_Default".to_string()]);
    }

    #[test]
    fn all_progressive_tokens_are_unique() {
        let mut seen = HashSet::new();
        for params in Sweep::all_progressive().iter() {
            params.validate().unwrap();
            assert!(seen.insert(params.to_string()), "duplicate token");
        }
        assert_eq!(seen.len(), 55);
    }

    #[test]
    fn exactly_one_vanilla_per_iteration_set() {
        let mut sweep = Sweep::all_progressive();
        sweep.iterations = vec![
            None,
            Some(IterationParams {
                min_chain_length: Some(4),
                ..Default::default()
            }),
        ];
        let vanilla: Vec<Params> = sweep.iter().filter(|p| p.vanilla).collect();
        assert_eq!(vanilla.len(), 2);
        assert_eq!(vanilla[0].to_string(), "_Vanilla");
        assert_eq!(vanilla[1].to_string(), "_mc4_Vanilla");
        assert_eq!(sweep.len(), sweep.params().len());
    }

    #[test]
    fn vanilla_controls_carry_only_iteration_overrides() {
        let mut sweep = Sweep::basic_progressive();
        sweep.iterations = vec![Some(IterationParams {
            min_chain_length: Some(8),
            min_block_degree: Some(2),
            max_group_size: None,
        })];
        let control = sweep.params().into_iter().next().unwrap();
        assert!(control.vanilla);
        assert_eq!(control.min_chain_length, Some(8));
        assert!(control.outgroup_strategy.is_none());
        control.validate().unwrap();
    }

    #[test]
    fn emptiness_tracks_the_emitted_run_count() {
        let mut sweep = Sweep::default();
        sweep.iterations = Vec::new();
        assert!(sweep.is_empty());
        assert!(sweep.params().is_empty());

        // an empty non-iteration axis zeroes the cross product but the
        // per-iteration control still runs
        let mut sweep = Sweep::default();
        sweep.outgroup_strategy = Vec::new();
        assert_eq!(sweep.len(), 1);
        assert_eq!(sweep.params().len(), 1);
        assert!(!sweep.is_empty());
    }

    #[test]
    fn basic_progressive_size() {
        assert_eq!(Sweep::basic_progressive().len(), 5);
        assert_eq!(Sweep::small_progressive().len(), 3);
    }
}
