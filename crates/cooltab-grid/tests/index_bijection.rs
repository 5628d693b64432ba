use cooltab_grid::{coordinate_of, flat_of, GridCoordinate, GridShape};
use proptest::prelude::*;

proptest! {
    #[test]
    fn flat_index_round_trips(sizes in prop::collection::vec(1usize..6, 0..5), seed in any::<usize>()) {
        let total: usize = sizes.iter().product();
        let flat = seed % total;
        let coordinate = coordinate_of(flat, &sizes).unwrap();
        prop_assert_eq!(coordinate.rank(), sizes.len());
        for (idx, size) in coordinate.indices().iter().zip(&sizes) {
            prop_assert!(idx < size);
        }
        prop_assert_eq!(flat_of(&coordinate, &sizes).unwrap(), flat);
    }

    #[test]
    fn coordinates_are_distinct(sizes in prop::collection::vec(1usize..5, 1..4)) {
        let shape = GridShape::new(sizes).unwrap();
        let mut seen = std::collections::BTreeSet::new();
        for flat in 0..shape.total() {
            prop_assert!(seen.insert(shape.coordinate_of(flat).unwrap()));
        }
    }
}

#[test]
fn last_axis_varies_fastest() {
    let sizes = [2, 3];
    let coords: Vec<Vec<usize>> = (0..6)
        .map(|flat| coordinate_of(flat, &sizes).unwrap().indices().to_vec())
        .collect();
    assert_eq!(
        coords,
        vec![
            vec![0, 0],
            vec![0, 1],
            vec![0, 2],
            vec![1, 0],
            vec![1, 1],
            vec![1, 2]
        ]
    );
}

#[test]
fn out_of_range_inputs_are_shape_errors() {
    let err = coordinate_of(6, &[2, 3]).unwrap_err();
    assert_eq!(err.info().code, "flat_out_of_range");

    let err = flat_of(&GridCoordinate::new(vec![0, 3]), &[2, 3]).unwrap_err();
    assert_eq!(err.info().code, "coordinate_out_of_range");

    let err = flat_of(&GridCoordinate::new(vec![0]), &[2, 3]).unwrap_err();
    assert_eq!(err.info().code, "rank_mismatch");

    let err = GridShape::new(vec![2, 0]).unwrap_err();
    assert_eq!(err.info().code, "axis_empty");
}

#[test]
fn grid_without_axes_has_one_point() {
    let shape = GridShape::new(Vec::new()).unwrap();
    assert_eq!(shape.total(), 1);
    let coordinate = shape.coordinate_of(0).unwrap();
    assert_eq!(coordinate.rank(), 0);
    assert_eq!(shape.flat_of(&coordinate).unwrap(), 0);
}
