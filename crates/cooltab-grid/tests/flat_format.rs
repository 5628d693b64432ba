use cooltab_grid::flat::{format_fixed, group_by_density, render_flat_table};
use cooltab_grid::{format_exp, FlatRow};

#[test]
fn exponents_use_signed_two_digit_form() {
    assert_eq!(format_exp(10000.0, 6), "1.000000e+04");
    assert_eq!(format_exp(1.234e-22, 7), "1.2340000e-22");
    assert_eq!(format_exp(0.0, 6), "0.000000e+00");
    assert_eq!(format_exp(-5.5e123, 6), "-5.500000e+123");
    assert_eq!(format_exp(f64::NAN, 6), "nan");
    assert_eq!(format_fixed(0.6, 6), "0.600000");
}

#[test]
fn rates_are_scaled_by_density_squared() {
    let row = FlatRow::from_point(1.0, 2.0, 1.0e-20, 3.0e-20, 0.6);
    assert_eq!(format_exp(row.temperature, 6), "1.000000e+02");
    assert_eq!(format_exp(row.heating, 7), "1.0000000e-22");
    assert_eq!(format_exp(row.cooling, 7), "3.0000000e-22");
}

#[test]
fn rows_group_by_rounded_density_and_sort_by_temperature() {
    let rows = vec![
        FlatRow::from_point(0.0, 3.0, 1.0, 1.0, 0.6),
        FlatRow::from_point(-1.0, 2.0, 1.0, 1.0, 0.6),
        FlatRow::from_point(0.0000001, 2.0, 1.0, 1.0, 0.6),
    ];
    let groups = group_by_density(&rows);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0][0].log_density, -1.0);
    let temperatures: Vec<f64> = groups[1].iter().map(|r| r.log_temperature).collect();
    assert_eq!(temperatures, vec![2.0, 3.0]);
}

#[test]
fn rendered_table_has_fixed_header() {
    let rows = vec![FlatRow::from_point(0.0, 4.0, 2.0e-23, 5.0e-23, 0.61)];
    let text = render_flat_table("Mon Jan 01 00:00:00 2024", &rows);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "# Mon Jan 01 00:00:00 2024",
            "#",
            "# Cooling Map File",
            "#",
            "# Loop values:",
            "# hden 0.000000",
            "#",
            "# Data Columns:",
            "# Te [K]",
            "# Heating [erg s^-1 cm^3]",
            "# Cooling [erg s^-1 cm^3]",
            "# Mean Molecular Weight [amu]",
            "#",
            "#Te\t\tHeating\t\tCooling\t\tMMW",
            "1.000000e+04\t2.0000000e-23\t5.0000000e-23\t0.610000",
        ]
    );
}
