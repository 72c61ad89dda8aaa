//! Sweep enumeration behavior across presets and iteration values.

use progressive_bench::params::{IterationParams, Params, PARAMS_HEADER};
use progressive_bench::sweep::Sweep;
use std::collections::HashSet;

#[test]
fn every_preset_enumerates_its_advertised_length() {
    for sweep in [
        Sweep::default(),
        Sweep::small_progressive(),
        Sweep::basic_progressive(),
        Sweep::all_progressive(),
    ] {
        assert_eq!(sweep.params().len(), sweep.len());
    }
}

#[test]
fn all_progressive_is_fifty_five_unique_valid_runs() {
    let sweep = Sweep::all_progressive();
    assert_eq!(sweep.len(), 55);

    let mut tokens = HashSet::new();
    for params in sweep.iter() {
        params.validate().unwrap();
        assert!(tokens.insert(params.to_string()), "duplicate run token");
    }
}

#[test]
fn exactly_one_vanilla_control_per_iteration_value() {
    let sweep = Sweep {
        iterations: vec![
            None,
            Some(IterationParams {
                min_chain_length: Some(4),
                ..Default::default()
            }),
        ],
        ..Sweep::basic_progressive()
    };

    let params: Vec<Params> = sweep.params();
    assert_eq!(params.len(), sweep.len());
    let controls: Vec<&Params> = params.iter().filter(|p| p.vanilla).collect();
    assert_eq!(controls.len(), 2);
    assert_eq!(controls[0].to_string(), "_Vanilla");
    assert_eq!(controls[1].to_string(), "_mc4_Vanilla");

    // controls carry nothing but the iteration override
    for control in controls {
        control.validate().unwrap();
        assert!(control.outgroup_strategy.is_none());
        assert!(control.self_alignment.is_none());
    }
}

#[test]
fn rows_line_up_with_the_header_for_every_run() {
    for params in Sweep::all_progressive().iter() {
        assert_eq!(params.as_row().len(), PARAMS_HEADER.len());
    }
}
