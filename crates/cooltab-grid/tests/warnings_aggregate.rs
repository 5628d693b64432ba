use std::collections::BTreeMap;

use cooltab_grid::warnings::{normalize_message, scan_messages, split_blocks, FLAG_RECORD};
use cooltab_grid::WarningAggregator;

fn coordinates() -> BTreeMap<usize, (f64, f64)> {
    [(0, (-2.0, 2.0)), (1, (-1.0, 3.0)), (2, (0.0, 4.0))]
        .into_iter()
        .collect()
}

#[test]
fn severity_lines_are_normalized_and_filtered() {
    let text = "\
 Cloudy 23.01
  WARNING   negative   density
caution this is a caution
  W-Warnings are present.
Problem  with  convergence
PROBLEM with convergence
 BOTCHED monitors
a WARNING mid-line is ignored
";
    assert_eq!(
        scan_messages(text),
        vec![
            "WARNING negative density",
            "caution this is a caution",
            "Problem with convergence",
            "PROBLEM with convergence",
            "BOTCHED monitors",
        ]
    );
    assert_eq!(normalize_message("  C-Cautions   are present "), "C-Cautions are present");
    assert!(scan_messages(" CAUTION Cautions are present\n").is_empty());
}

#[test]
fn identical_messages_from_two_points_are_counted_with_range() {
    let mut aggregator = WarningAggregator::new(&[0, 2], &[0, 1, 2]);
    aggregator.add_output(Some(0), " WARNING negative density\n WARNING  negative density\n");
    aggregator.add_output(Some(2), "WARNING negative density\n");
    let records = aggregator.records(&coordinates());
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.message, "WARNING negative density");
    assert_eq!(record.count, 2);
    assert_eq!((record.density.min, record.density.max), (Some(-2.0), Some(0.0)));
    assert_eq!((record.temperature.min, record.temperature.max), (Some(2.0), Some(4.0)));
    assert_eq!(record.density.describe(), "-2.000-0.000");
}

#[test]
fn unattributed_output_credits_warned_points() {
    let mut aggregator = WarningAggregator::new(&[1, 1], &[0, 1, 2]);
    aggregator.add_output(None, "CAUTION low ionization\n");
    let records = aggregator.records(&coordinates());
    assert_eq!(records[0].count, 1);
    assert_eq!(records[0].density.min, Some(-1.0));

    let mut anonymous = WarningAggregator::new(&[], &[0, 1]);
    anonymous.add_output(None, "CAUTION low ionization\n");
    let records = anonymous.records(&coordinates());
    assert_eq!(records[0].count, 1);
    assert_eq!(records[0].density.describe(), "unknown");
}

#[test]
fn combined_summary_blocks_map_to_sorted_points() {
    let text = "\
# Special.
WARNING first point
# Special.
WARNING second point
# Special.
WARNING third point
";
    assert_eq!(split_blocks(text).len(), 3);

    let mut aggregator = WarningAggregator::new(&[2], &[2, 0, 1]);
    aggregator.add_combined_summary(text);
    let messages = aggregator.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[&Some(2)], vec!["WARNING third point".to_string()]);
}

#[test]
fn short_combined_summary_falls_back_to_warned_points() {
    let text = "# Special.\nWARNING only block\n";
    let mut aggregator = WarningAggregator::new(&[0, 2], &[0, 1, 2]);
    aggregator.add_combined_summary(text);
    let records = aggregator.records(&coordinates());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].count, 2);
    assert_eq!(records[0].temperature.describe(), "2.000-4.000");
}

#[test]
fn point_summaries_of_unwarned_points_are_skipped() {
    let mut aggregator = WarningAggregator::new(&[0], &[0, 1]);
    aggregator.add_point_summary(1, "WARNING ignored\n");
    aggregator.add_point_summary(0, "WARNING kept\n");
    let records = aggregator.records(&coordinates());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, "WARNING kept");
}

#[test]
fn warned_flags_without_messages_become_flag_record() {
    let aggregator = WarningAggregator::new(&[0, 1], &[0, 1, 2]);
    let records = aggregator.records(&coordinates());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, FLAG_RECORD);
    assert_eq!(records[0].count, 2);
    assert_eq!(records[0].density.describe(), "-2.000--1.000");

    assert!(WarningAggregator::new(&[], &[0]).records(&coordinates()).is_empty());
}
