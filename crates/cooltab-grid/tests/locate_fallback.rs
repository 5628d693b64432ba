
use cooltab_core::GridError;
use cooltab_grid::locate::{grid_index_of, LOG_UNAVAILABLE};
use cooltab_grid::{MapFileLocator, PointFileLocator};

#[test]
fn map_file_lookup_prefers_unpadded_name() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let locator = MapFileLocator::new(dir.path(), "ism");

    let err = locator.locate(5).unwrap_err();
    assert!(matches!(err, GridError::ArtifactNotFound(_)));
    assert!(err.is_point_local());

    let padded = fixtures::write(dir.path(), "ism_run0005.dat", "1 2 3 4\n");
    assert_eq!(locator.locate(5).unwrap(), padded);

    let plain = fixtures::write(dir.path(), "ism_run5.dat", "1 2 3 4\n");
    assert_eq!(locator.locate(5).unwrap(), plain);
}

#[test]
fn txt_variant_is_accepted() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = fixtures::write(dir.path(), "ism_run12.txt", "1 2 3 4\n");
    assert_eq!(MapFileLocator::new(dir.path(), "ism").locate(12).unwrap(), path);
}

#[test]
fn heating_file_falls_back_to_cooling_file() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let locator = PointFileLocator::new(dir.path(), "ism");
    assert!(locator.heating_file(3).is_err());
    assert_eq!(locator.artifact_label(3), LOG_UNAVAILABLE);

    let cooling = fixtures::write(dir.path(), &fixtures::point_name(3, "ism", "cooling"), "");
    assert_eq!(locator.heating_file(3).unwrap(), cooling);

    fixtures::write(dir.path(), &fixtures::point_name(3, "ism", "summary"), "");
    assert_eq!(locator.artifact_label(3), "grid000000003_ism_summary.txt");

    let heating = fixtures::write(dir.path(), &fixtures::point_name(3, "ism", "heating"), "");
    assert_eq!(locator.heating_file(3).unwrap(), heating);
    assert_eq!(locator.artifact_label(3), "grid000000003_ism_heating.txt");
}

#[test]
fn per_point_documents_are_discovered_in_order() {
    let dir = tempfile::tempdir().expect("tmp dir");
    fixtures::write(dir.path(), &fixtures::point_name(2, "ism", "summary"), "");
    fixtures::write(dir.path(), &fixtures::point_name(0, "ism", "summary"), "");
    fixtures::write(dir.path(), "other_summary.txt", "");
    fixtures::write(dir.path(), "ism.out", "");

    let locator = PointFileLocator::new(dir.path(), "ism");
    let indices: Vec<usize> = locator.summary_files().into_iter().map(|(idx, _)| idx).collect();
    assert_eq!(indices, vec![0, 2]);
    assert_eq!(locator.output_files(), vec![dir.path().join("ism.out")]);

    fixtures::write(dir.path(), "grid000000001_ism_run.out", "");
    assert_eq!(
        locator.output_files(),
        vec![dir.path().join("grid000000001_ism_run.out")]
    );
}

#[test]
fn glob_metacharacters_in_prefix_match_literally() {
    let dir = tempfile::tempdir().expect("tmp dir");
    fixtures::write(dir.path(), &fixtures::point_name(0, "ism[1]", "summary"), "");
    fixtures::write(dir.path(), &fixtures::point_name(1, "ism1", "summary"), "");
    fixtures::write(dir.path(), "ism1.out", "");
    fixtures::write(dir.path(), "ism?.out", "");

    let locator = PointFileLocator::new(dir.path(), "ism[1]");
    let indices: Vec<usize> = locator.summary_files().into_iter().map(|(idx, _)| idx).collect();
    assert_eq!(indices, vec![0]);
    assert!(locator.output_files().is_empty());

    let wildcard = PointFileLocator::new(dir.path(), "ism?");
    assert_eq!(wildcard.output_files(), vec![dir.path().join("ism?.out")]);
}

#[test]
fn grid_index_requires_nine_digits() {
    assert_eq!(grid_index_of("grid000000042_ism_heating.txt".as_ref()), Some(42));
    assert_eq!(grid_index_of("grid00042_ism_heating.txt".as_ref()), None);
    assert_eq!(grid_index_of("ism_run5.dat".as_ref()), None);
}
