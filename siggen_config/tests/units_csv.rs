use std::fs::File;
use std::io::Write;

use rstest::rstest;
use siggen_config::{UnitRow, load_units_csv, validate_unit_rows};
use tempfile::tempdir;

fn write_csv(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("units.csv");
    let mut f = File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    (dir, path)
}

#[rstest]
fn loads_rows_with_exact_headers() {
    let (_dir, path) = write_csv("family,name,multiplier\nfrequency,GHz,1e9\nsamplerate,MSa/s,1e6\n");
    let rows = load_units_csv(&path).unwrap();
    assert_eq!(
        rows,
        vec![
            UnitRow {
                family: "frequency".into(),
                name: "GHz".into(),
                multiplier: 1e9,
            },
            UnitRow {
                family: "samplerate".into(),
                name: "MSa/s".into(),
                multiplier: 1e6,
            },
        ]
    );
}

#[rstest]
fn trims_whitespace_around_cells() {
    let (_dir, path) = write_csv("family, name, multiplier\nvoltage , kV , 1000\n");
    let rows = load_units_csv(&path).unwrap();
    assert_eq!(rows[0].name, "kV");
    assert_eq!(rows[0].multiplier, 1000.0);
}

#[rstest]
#[case("fam,name,multiplier\nfrequency,GHz,1e9\n", "must have headers")]
#[case("family,name,multiplier\nfrequency,GHz,abc\n", "invalid csv row 2")]
#[case("family,name,multiplier\nfrequency,GHz,0\n", "positive finite")]
#[case("family,name,multiplier\nfrequency,GHz,-1\n", "positive finite")]
#[case(
    "family,name,multiplier\nfrequency,GHz,1e9\nfrequency,GHz,1e9\n",
    "duplicate unit"
)]
fn rejects_malformed_tables(#[case] csv: &str, #[case] needle: &str) {
    let (_dir, path) = write_csv(csv);
    let err = load_units_csv(&path).expect_err("should reject");
    let msg = format!("{err}").to_lowercase();
    assert!(msg.contains(needle), "unexpected message: {msg}");
}

#[rstest]
fn missing_file_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.csv");
    let err = load_units_csv(&path).expect_err("missing file");
    assert!(format!("{err}").contains("nope.csv"));
}

#[rstest]
fn same_name_in_different_families_is_allowed() {
    let rows = vec![
        UnitRow {
            family: "a".into(),
            name: "x".into(),
            multiplier: 1.0,
        },
        UnitRow {
            family: "b".into(),
            name: "x".into(),
            multiplier: 2.0,
        },
    ];
    validate_unit_rows(&rows).unwrap();
}
