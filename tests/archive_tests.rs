use std::path::Path;

use fet_mobility::analysis::{DRAIN_CURRENT, DRAIN_VOLTAGE, GATE_VOLTAGE};
use fet_mobility::archive::ArchiveError;
use fet_mobility::data::loader::{load_curve, load_file, save_csv, save_parquet};
use fet_mobility::{CurveKind, DataTable, MeasurementArchive, Temperature};

fn curve(kind: &str, vsd: f64) -> DataTable {
    DataTable::from_rows(
        [DRAIN_VOLTAGE, GATE_VOLTAGE, DRAIN_CURRENT],
        vec![
            vec![vsd, 0.0, -1e-12],
            vec![vsd, -20.0, -2.5e-7],
            vec![vsd, -40.0, -7.25e-7],
        ],
    )
    .unwrap()
    .with_attribute("Type", kind)
    .with_attribute("Name", "Dev")
    .with_attribute("Operator", "lee: night shift")
}

fn write(dir: &Path, file: &str, table: &DataTable) {
    save_csv(table, &dir.join(file)).unwrap();
}

#[test]
fn archive_indexes_curves_by_temperature() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Dev-10K-Output.csv", &curve("output", -10.0));
    write(dir.path(), "Dev-10K-Transfer.csv", &curve("transfer", -20.0));
    write(dir.path(), "Dev-Output.csv", &curve("output", -30.0));
    // not ours
    write(dir.path(), "Other-Output.csv", &curve("output", -40.0));
    std::fs::write(dir.path().join("notes.txt"), "not a curve").unwrap();

    let archive = MeasurementArchive::open("Dev", dir.path()).unwrap();
    assert_eq!(archive.name(), "Dev");
    assert_eq!(archive.directory(), dir.path());
    assert_eq!(
        archive.temperatures(),
        &[Temperature::Untagged, Temperature::Kelvin(10.0)]
    );

    assert!(archive.has_output_curve(Temperature::Untagged));
    assert!(!archive.has_transfer_curve(Temperature::Untagged));
    assert!(archive.has_output_curve(Temperature::Kelvin(10.0)));
    assert!(archive.has_transfer_curve(Temperature::Kelvin(10.0)));

    let untagged = archive.output_curve(Temperature::Untagged).unwrap();
    let vsd = untagged.column(DRAIN_VOLTAGE).unwrap();
    assert_eq!(untagged.unique(vsd), vec![-30.0]);
    assert_eq!(
        archive.transfer_curve(Temperature::Untagged),
        Err(ArchiveError::CurveNotFound {
            kind: CurveKind::Transfer,
            temperature: Temperature::Untagged,
        })
    );
    assert!(archive.output_curve(Temperature::Kelvin(77.0)).is_err());

    let points: Vec<_> = archive
        .iter()
        .map(|p| (p.temperature, p.output.is_some(), p.transfer.is_some()))
        .collect();
    assert_eq!(
        points,
        vec![
            (Temperature::Untagged, true, false),
            (Temperature::Kelvin(10.0), true, true),
        ]
    );
}

#[test]
fn duplicate_temperature_spelling_keeps_lexically_first_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Dev-10K-Output.csv", &curve("output", -10.0));
    write(dir.path(), "Dev-10.0K-Output.csv", &curve("output", -99.0));

    let archive = MeasurementArchive::open("Dev", dir.path()).unwrap();
    assert_eq!(archive.temperatures(), &[Temperature::Kelvin(10.0)]);
    let table = archive.output_curve(Temperature::Kelvin(10.0)).unwrap();
    let vsd = table.column(DRAIN_VOLTAGE).unwrap();
    // "Dev-10.0K-…" < "Dev-10K-…"
    assert_eq!(table.unique(vsd), vec![-99.0]);
}

#[test]
fn archive_attribute_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut archive = MeasurementArchive::open("Dev", dir.path()).unwrap();
    assert!(archive.temperatures().is_empty());

    assert!(!archive.has_attribute("Substrate"));
    assert_eq!(
        archive.attribute("Substrate"),
        Err(ArchiveError::AttributeNotFound("Substrate".into()))
    );
    archive.set_attribute("Substrate", "Si/SiO2");
    assert!(archive.has_attribute("Substrate"));
    assert_eq!(archive.attribute("Substrate"), Ok("Si/SiO2"));
}

#[test]
fn unreadable_curve_fails_the_whole_archive() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Dev-Output.csv", &curve("output", -10.0));
    std::fs::write(dir.path().join("Dev-20K-Transfer.csv"), "a,b\n1,oops\n").unwrap();

    let err = MeasurementArchive::open("Dev", dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains("oops"), "{err:#}");
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(MeasurementArchive::open("Dev", dir.path().join("absent")).is_err());
}

#[test]
fn csv_round_trip_keeps_rows_and_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Dev-Transfer.csv");
    let table = curve("transfer", -60.0);
    save_csv(&table, &path).unwrap();

    let loaded = load_file(&path).unwrap();
    assert_eq!(loaded, table);
    assert_eq!(loaded.attribute("Operator"), Some("lee: night shift"));

    let curve = load_curve(&path).unwrap();
    assert_eq!(curve.kind, CurveKind::Transfer);
}

#[test]
fn parquet_round_trip_keeps_rows_and_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Dev-Output.parquet");
    let table = curve("output", -5.0);
    save_parquet(&table, &path).unwrap();

    let loaded = load_file(&path).unwrap();
    assert_eq!(loaded, table);
    assert_eq!(load_curve(&path).unwrap().kind, CurveKind::Output);
}

#[test]
fn curve_without_type_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("untyped.csv");
    let table = DataTable::from_rows(["x"], vec![vec![1.0]]).unwrap();
    save_csv(&table, &path).unwrap();
    assert!(load_curve(&path).is_err());
}
