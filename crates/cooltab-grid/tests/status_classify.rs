
use cooltab_core::GridError;
use cooltab_grid::series::load_series;
use cooltab_grid::{
    bind_axes, classify, parse_run_summary, ColumnLayout, GridAssembler, GridCoordinate,
    GridShape, PointFileLocator, PointSource, PointStatus,
};
use fixtures::SummaryRow;

#[test]
fn run_summary_parses_flags_and_parameters() {
    let text = fixtures::run_summary(&[
        SummaryRow::ok(0, -2.0, 2.0),
        SummaryRow::ok(1, -1.0, 2.5).failed(),
        SummaryRow::ok(2, 0.0, 3.0).warned(),
    ]);
    let summary = parse_run_summary(&text, "fixture").unwrap();
    assert_eq!(summary.param_names, vec!["hden=", "constant temperature="]);
    assert_eq!(summary.points.len(), 3);
    assert_eq!(summary.points[0].status, PointStatus::Ok);
    assert_eq!(summary.points[1].status, PointStatus::Failed);
    assert_eq!(summary.points[2].status, PointStatus::Warned);
    assert_eq!(summary.points[2].params, vec![0.0, 3.0]);
}

#[test]
fn short_rows_are_ignored_and_bad_values_rejected() {
    let text = format!(
        "{}\n0\tF\tF\tshort\n1\tF\tF\tok\t0\t1\tabc\t2.0\tstring\n",
        fixtures::RUN_SUMMARY_HEADER
    );
    let err = parse_run_summary(&text, "fixture").unwrap_err();
    assert!(matches!(err, GridError::MalformedArtifact(_)));
    assert_eq!(err.info().code, "run_summary_value");
    assert_eq!(err.info().context.get("line").map(String::as_str), Some("3"));

    let empty = format!("{}\n0\tF\tF\n", fixtures::RUN_SUMMARY_HEADER);
    assert_eq!(
        parse_run_summary(&empty, "fixture").unwrap_err().info().code,
        "run_summary_empty"
    );
}

#[test]
fn axes_bind_by_substring() {
    let names: Vec<String> = ["metals", "HDEN=", "constant temperature="]
        .map(String::from)
        .to_vec();
    let binding = bind_axes(&names).unwrap();
    assert_eq!((binding.density, binding.temperature), (1, 2));

    let err = bind_axes(&["metals".to_string(), "hden".to_string()]).unwrap_err();
    assert!(matches!(err, GridError::AmbiguousAxisBinding(_)));
}

#[test]
fn missing_artifact_downgrades_point() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let summary = parse_run_summary(
        &fixtures::run_summary(&[SummaryRow::ok(0, 0.0, 2.0), SummaryRow::ok(1, 0.0, 3.0)]),
        "fixture",
    )
    .unwrap();
    fixtures::write(
        dir.path(),
        &fixtures::point_name(0, "ism", "heating"),
        &fixtures::heating_file(&[(100.0, 1e-22, 2e-22)]),
    );
    let locator = PointFileLocator::new(dir.path(), "ism");
    let binding = bind_axes(&summary.param_names).unwrap();
    let classes = classify(&summary, &binding, &locator).unwrap();
    assert_eq!(classes.included.len(), 1);
    assert_eq!(classes.included[0].point.index, 0);
    assert_eq!(classes.failed.len(), 1);
    assert_eq!(classes.failed[0].index, 1);
    assert_eq!(classes.failed[0].temperature, 3.0);
}

#[test]
fn three_point_scenario_leaves_gaps_and_reports_failure() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let summary = parse_run_summary(
        &fixtures::run_summary(&[
            SummaryRow::ok(1, -1.0, 2.0),
            SummaryRow::ok(2, 0.0, 2.0).failed(),
            SummaryRow::ok(3, 1.0, 2.0),
        ]),
        "fixture",
    )
    .unwrap();
    for (index, samples) in [(1usize, [1.0, 2.0, 3.0]), (3, [2.0, 3.0, 4.0])] {
        let rows: Vec<(f64, f64, f64)> = samples.iter().map(|&s| (s, s, -s)).collect();
        fixtures::write(
            dir.path(),
            &fixtures::point_name(index, "ism", "heating"),
            &fixtures::heating_file(&rows),
        );
    }
    let locator = PointFileLocator::new(dir.path(), "ism");
    let binding = bind_axes(&summary.param_names).unwrap();
    let classes = classify(&summary, &binding, &locator).unwrap();
    let failed: Vec<usize> = classes.failed.iter().map(|p| p.index).collect();
    assert_eq!(failed, vec![2]);

    let layout = ColumnLayout {
        sample: 1,
        fields: vec![2, 3],
    };
    let points: Vec<PointSource> = classes
        .included
        .iter()
        .map(|p| PointSource {
            flat: p.point.index - 1,
            path: p.path.clone(),
        })
        .collect();
    let assembly = GridAssembler::new(
        GridShape::new(vec![3]).unwrap(),
        layout.clone(),
        vec!["Heating".into(), "Cooling".into()],
    )
    .unwrap()
    .assemble(&points)
    .unwrap();
    let table = &assembly.table;
    assert_eq!(table.sample_axis().values(), &[1.0, 2.0, 3.0, 4.0]);
    let point1 = GridCoordinate::new(vec![0]);
    let point3 = GridCoordinate::new(vec![2]);
    assert!(table.value_at("Heating", &point1, 4.0).unwrap().is_nan());
    assert!(table.value_at("Heating", &point3, 1.0).unwrap().is_nan());
    assert_eq!(table.value_at("Cooling", &point3, 4.0), Some(-4.0));

    let series = load_series(&classes.included[0].path, &layout).unwrap();
    assert_eq!(series.samples, vec![1.0, 2.0, 3.0]);
}
