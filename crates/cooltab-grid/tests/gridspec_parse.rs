use cooltab_core::GridError;
use cooltab_grid::gridspec::extract_parameter_name;
use cooltab_grid::{expand_range, infer_prefix, parse_grid_ranges, parse_grid_spec};
use proptest::prelude::*;

const GRID_INPUT: &str = "\
title cooling grid
# density sweep
hden -2 vary
grid -2 2 0.5
c a Cloudy-style comment
metals 0.0 log
constant temperature 4 vary
grid 1 3 1
save cooling \"ism_grid/isrf_ism_cooling.txt\" last no hash
";

#[test]
fn integer_steps_expand_inclusively() {
    assert_eq!(expand_range(0.0, 4.0, 1.0).unwrap(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn fractional_steps_end_exactly_at_stop() {
    let values = expand_range(-2.0, 2.0, 0.5).unwrap();
    assert_eq!(values.len(), 9);
    assert_eq!(values[0], -2.0);
    assert_eq!(*values.last().unwrap(), 2.0);
}

#[test]
fn half_step_counts_round_to_even() {
    assert_eq!(expand_range(0.0, 5.0, 2.0).unwrap(), vec![0.0, 2.0, 5.0]);
    assert_eq!(expand_range(0.0, 3.0, 2.0).unwrap(), vec![0.0, 2.0, 3.0]);
    let spec = parse_grid_spec("hden 0 vary\ngrid 0 5 2\n").unwrap();
    assert_eq!(spec.axis_sizes(), vec![3]);
    let ranges = parse_grid_ranges("grid range from 0 to 5 step 2").unwrap();
    assert_eq!(ranges[0].count().unwrap(), 3);
}

#[test]
fn zero_step_is_malformed() {
    let err = expand_range(0.0, 1.0, 0.0).unwrap_err();
    assert!(matches!(err, GridError::MalformedGridSpec(_)));
    assert_eq!(err.info().code, "grid_step_zero");
}

#[test]
fn vary_lines_become_axes_and_sampling() {
    let spec = parse_grid_spec(GRID_INPUT).unwrap();
    assert_eq!(spec.axes.len(), 1);
    assert_eq!(spec.axes[0].name, "hden");
    assert_eq!(spec.axes[0].len(), 9);
    let sampling = spec.sampling.expect("sampling axis");
    assert_eq!(sampling.name, "constant temperature");
    assert_eq!(sampling.values, vec![1.0, 2.0, 3.0]);
    assert_eq!(parse_grid_spec(GRID_INPUT).unwrap().axis_sizes(), vec![9]);
}

#[test]
fn vary_without_grid_line_is_rejected() {
    let text = "hden 0 vary\nmetals 0 vary\ngrid 0 1 1\n";
    let err = parse_grid_spec(text).unwrap_err();
    assert_eq!(err.info().code, "grid_missing");
    assert_eq!(err.info().context.get("line").map(String::as_str), Some("hden 0 vary"));
}

#[test]
fn short_grid_line_is_rejected() {
    let err = parse_grid_spec("hden 0 vary\ngrid 0 1\n").unwrap_err();
    assert!(matches!(err, GridError::MalformedGridSpec(_)));
    assert_eq!(err.info().code, "grid_values");
}

#[test]
fn parameter_name_stops_at_number_or_separator() {
    assert_eq!(extract_parameter_name(&["hden", "-2"]), "hden");
    assert_eq!(extract_parameter_name(&["abundances", "=", "1"]), "abundances");
    assert_eq!(extract_parameter_name(&["radius", "10"]), "radius");
    assert_eq!(extract_parameter_name(&["-2", "x"]), "-2 x");
}

#[test]
fn prefix_comes_from_first_save_command() {
    assert_eq!(infer_prefix(GRID_INPUT, "fallback"), "isrf_ism");
    assert_eq!(
        infer_prefix("save grid \"out/run_grid.grd\"\n", "fallback"),
        "run"
    );
    assert_eq!(infer_prefix("hden 1\n", "fallback"), "fallback");
}

#[test]
fn grid_range_form_is_parsed() {
    let ranges = parse_grid_ranges("Grid range from 1 to 3 step 0.5\ngrid range from -2 to 2 step 1").unwrap();
    assert_eq!(ranges.len(), 2);
    assert_eq!(ranges[0].count().unwrap(), 5);
    assert_eq!(ranges[1].count().unwrap(), 5);
    assert!(parse_grid_ranges("grid range from 1 to 3 step 0").is_err());
}

proptest! {
    #[test]
    fn expansion_is_monotonic_and_snapped(start in -10i32..10, steps in 0usize..40, step_tenths in 1u32..20) {
        let step = f64::from(step_tenths) / 10.0;
        let start = f64::from(start);
        let stop = start + steps as f64 * step;
        let values = expand_range(start, stop, step).unwrap();
        prop_assert_eq!(values.len(), steps + 1);
        prop_assert_eq!(*values.last().unwrap(), stop);
        for pair in values.windows(2) {
            prop_assert!(pair[1] > pair[0]);
        }
    }
}
