use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const TIMESTAMP: &str = "Tue Mar 05 10:00:00 2024";

fn cooltab(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cooltab"))
        .args(args)
        .current_dir(cwd)
        .env("RUST_LOG", "warn")
        .output()
        .expect("spawn cooltab")
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn populate_run(dir: &Path) {
    write(
        dir,
        "ism_grid.grd",
        "#Index\tFailure?\tWarnings?\tExit code\t#rank\t#seq\thden=\tconstant temperature=\tgrid parameter string\n\
         000000000\tF\tF\tok\t0\t1\t0.000000\t2.000000\thden= 0.000 constant temperature= 2.000\n\
         000000001\tF\tT\tok\t0\t2\t0.000000\t3.000000\thden= 0.000 constant temperature= 3.000\n\
         000000002\tT\tF\tok\t0\t3\t1.000000\t2.000000\thden= 1.000 constant temperature= 2.000\n",
    );
    let header = "#depth cm\tTemp K\tHtot erg/cm3/s\tCtot erg/cm3/s\n";
    write(
        dir,
        "grid000000000_ism_heating.txt",
        &format!("{header}1.0e+00\t1.0e+02\t1.0e-22\t2.0e-22\n"),
    );
    write(
        dir,
        "grid000000001_ism_heating.txt",
        &format!("{header}1.0e+00\t1.0e+03\t3.0e-22\t4.0e-22\n"),
    );
    write(
        dir,
        "grid000000000_ism_summary.txt",
        "#save special output\nMeanMolecularWeight 0.61\n",
    );
    write(
        dir,
        "grid000000001_ism_summary.txt",
        "#save special output\nMeanMolecularWeight 0.59\n WARNING negative density\n",
    );
    write(
        dir,
        "grid000000001_ism_run.out",
        " WARNING negative density\n Cloudy ends: 1 iteration, ExecTime(s) 15.0\n",
    );
}

#[test]
fn postprocess_writes_tables_and_prints_summary() {
    let dir = tempfile::tempdir().expect("tmp dir");
    populate_run(dir.path());

    let output = cooltab(
        &[
            "postprocess",
            "--work-dir",
            ".",
            "--prefix",
            "ism",
            "--output-dir",
            "converted",
            "--timestamp",
            TIMESTAMP,
        ],
        dir.path(),
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("FAILURES: 1 grid points did not complete"));
    assert!(stdout.contains("Wrote 1 flat table(s)"));

    let converted = dir.path().join("converted");
    let table = fs::read_to_string(converted.join("ism_run1.dat")).unwrap();
    assert!(table.starts_with(&format!("# {TIMESTAMP}\n")));
    let stats = fs::read_to_string(converted.join("ism_stats.txt")).unwrap();
    assert!(stats.contains("1 x WARNING negative density"));

    let sidecar: serde_json::Value =
        serde_json::from_slice(&fs::read(converted.join("ism_stats.json")).unwrap()).unwrap();
    assert_eq!(sidecar["included"], 2);
    assert_eq!(sidecar["failed"][0]["index"], 2);
}

#[test]
fn postprocess_exits_non_zero_without_run_summary() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let output = cooltab(&["postprocess", "--prefix", "ism"], dir.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ArtifactNotFound"));
    assert!(!dir.path().join("converted_cooling_tables").exists());
}

#[test]
fn convert_writes_container_and_manifest() {
    let dir = tempfile::tempdir().expect("tmp dir");
    write(
        dir.path(),
        "cool.in",
        "hden -1 vary\ngrid -1 1 1\nconstant temperature 2 vary\ngrid 2 3 1\nsave cooling \"cool_cooling.txt\"\n",
    );
    let header = "# Cooling Map File\n#Te\t\tHeating\t\tCooling\t\tMMW\n";
    write(
        dir.path(),
        "cool_run1.dat",
        &format!("{header}1.0e+02\t1.0e+00\t2.0e+00\t0.6\n1.0e+03\t1.0e+00\t2.0e+00\t0.6\n"),
    );
    write(
        dir.path(),
        "cool_run2.dat",
        &format!("{header}1.0e+02\t2.0e+00\t4.0e+00\t0.6\n1.0e+03\t2.0e+00\t4.0e+00\t0.6\n"),
    );

    let output = cooltab(
        &["convert", "cool.in", "out/cool.cgtb", "--timestamp", "fixed"],
        dir.path(),
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dims [3, 2]"));
    assert!(stdout.contains("Missing runs (1): [3]"));

    let container = fs::read(dir.path().join("out/cool.cgtb")).unwrap();
    assert_eq!(&container[..4], b"CGTB");
    let manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("out/cool.cgtb.json")).unwrap()).unwrap();
    assert_eq!(manifest["prefix"], "cool");
    assert_eq!(manifest["filled_cells"], 4);
}

#[test]
fn convert_exits_non_zero_on_malformed_grid() {
    let dir = tempfile::tempdir().expect("tmp dir");
    write(dir.path(), "bad.in", "hden -1 vary\ngrid -1 1 0\n");
    let output = cooltab(&["convert", "bad.in", "bad.cgtb"], dir.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("grid_step_zero"));
    assert!(!dir.path().join("bad.cgtb").exists());
}
