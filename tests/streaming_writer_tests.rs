// tests/streaming_writer_tests.rs
mod common;

use common::{init_logging, Cell, DbdFixture};
use dbd_rs::netcdf::NcAttribute;
use dbd_rs::writer::{ATTR_N_FILES, ATTR_TOTAL_RECORDS};
use dbd_rs::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn numbered(dir: &TempDir, mission: &str, first: f64, n: usize, name: &str) -> PathBuf {
    let mut fixture = DbdFixture::time_depth(mission);
    for i in 0..n {
        let t = first + i as f64;
        fixture.all_new(&[t, t * 0.5]);
    }
    fixture.write(dir.path(), name)
}

#[test]
fn test_skip_first_record_across_files() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let a = numbered(&dir, "micro.mi", 0.0, 4, "01330000.dbd");
    let b = numbered(&dir, "micro.mi", 3.0, 3, "01330001.dbd");
    let c = numbered(&dir, "micro.mi", 5.0, 2, "01330002.dbd");

    let merged = read_multiple(&[&a, &b], &WriterOptions::default()).unwrap();
    assert_eq!(merged.n_records(), 4 + 3 - 1);
    assert_eq!(merged.summary.n_files, 2);

    let merged = read_multiple(&[&c, &a, &b], &WriterOptions::default()).unwrap();
    assert_eq!(merged.n_records(), 4 + 3 - 1 + 2 - 1);
    assert_eq!(
        merged.data.column("m_present_time"),
        Some(&Column::F64(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
    );

    let keep_all = WriterOptions::default().reader(ReaderOptions::new().skip_first_record(false));
    let merged = read_multiple(&[&a, &b], &keep_all).unwrap();
    assert_eq!(merged.n_records(), 7);
}

#[test]
fn test_union_width_conflict() {
    let dir = TempDir::new().unwrap();
    let mut a = DbdFixture::new("micro.mi", &[("m_present_time", "timestamp", 8), ("x", "m", 4)]);
    a.all_new(&[1.0, 1.5]).all_new(&[2.0, 2.5]);
    let a = a.write(dir.path(), "01330000.dbd");

    let mut b = DbdFixture::new(
        "micro.mi",
        &[("m_present_time", "timestamp", 8), ("x", "m", 2), ("y", "1", 1)],
    );
    b.all_new(&[3.0, 7.0, 1.0]).all_new(&[4.0, 8.0, 2.0]);
    let b = b.write(dir.path(), "01330001.dbd");

    let options = WriterOptions::default().reader(ReaderOptions::new().skip_first_record(false));
    let merged = read_multiple(&[&a, &b], &options).unwrap();

    let names: Vec<String> = merged.summary.columns.iter().map(|c| c.name.clone()).collect();
    assert_eq!(names, vec!["m_present_time", "x", "y"]);
    assert_eq!(merged.summary.columns[1].sensor_type, SensorType::F32);

    let x = merged.data.column("x").unwrap().to_f64_vec();
    assert_eq!(&x[..2], &[1.5, 2.5]);
    assert!(x[2].is_nan() && x[3].is_nan());

    assert_eq!(merged.data.column("y"), Some(&Column::I8(vec![FILL_INT8, FILL_INT8, 1, 2])));
    assert!(merged
        .summary
        .diagnostics
        .iter()
        .any(|(path, msg)| path == &b && msg.contains("x")));
}

#[test]
fn test_netcdf_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut a = DbdFixture::time_depth("micro.mi");
    a.record(&[Cell::New(1.0), Cell::New(10.0)])
        .record(&[Cell::New(2.0), Cell::Absent])
        .record(&[Cell::New(3.0), Cell::Repeat]);
    let a = a.write(dir.path(), "01330000.dcd");

    let mut b = DbdFixture::new("micro.mi", &[("m_present_time", "timestamp", 8), ("m_mode", "enum", 2)]);
    b.all_new(&[3.0, 1.0]).all_new(&[4.0, 2.0]);
    let b = b.write(dir.path(), "01330001.dcd");

    let output = dir.path().join("out.nc");
    let writer = StreamingWriter::new(WriterOptions::default().batch_records(2));
    let summary = writer.write_netcdf(&[&b, &a], &output).unwrap();
    assert_eq!(summary.n_records, 4);
    assert_eq!(summary.n_files, 2);

    let mut nc = NcReader::open(&output).unwrap();
    assert_eq!(nc.num_records(), 4);
    assert_eq!(nc.variable_names(), vec!["m_present_time", "m_depth", "m_mode"]);
    assert_eq!(nc.variable("m_depth").unwrap().units(), Some("m"));
    assert_eq!(nc.attribute(ATTR_TOTAL_RECORDS), Some(&NcAttribute::Ints(vec![4])));
    assert_eq!(nc.attribute(ATTR_N_FILES), Some(&NcAttribute::Ints(vec![2])));

    assert_eq!(
        nc.read_column("m_present_time").unwrap(),
        Column::F64(vec![1.0, 2.0, 3.0, 4.0])
    );
    let depth = nc.read_column("m_depth").unwrap();
    assert_eq!(depth.fill_positions(), vec![1, 3]);
    assert_eq!(depth.get(2), Some(ColumnValue::F32(10.0)));

    let mode = nc.read_column("m_mode").unwrap();
    assert_eq!(mode, Column::I16(vec![FILL_INT16, FILL_INT16, FILL_INT16, 2]));
}

#[test]
fn test_memory_and_netcdf_agree() {
    let dir = TempDir::new().unwrap();
    let files: Vec<PathBuf> = (0..5)
        .map(|i| numbered(&dir, "micro.mi", i as f64 * 10.0, 7, &format!("0133000{}.dbd", i)))
        .collect();

    let options = WriterOptions::default().batch_records(6).pipeline_depth(1);
    let merged = read_multiple(&files, &options).unwrap();

    let output = dir.path().join("out.nc");
    let summary = StreamingWriter::new(options).write_netcdf(&files, &output).unwrap();
    assert_eq!(summary.n_records, merged.n_records());
    assert_eq!(summary.n_records, 5 * 7 - 4);

    let mut nc = NcReader::open(&output).unwrap();
    for spec in merged.data.specs() {
        assert_eq!(&nc.read_column(&spec.name).unwrap(), merged.data.column(&spec.name).unwrap());
    }
}

#[test]
fn test_failing_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    let a = numbered(&dir, "micro.mi", 0.0, 3, "01330000.dbd");
    let bad = dir.path().join("01330001.dbd");
    std::fs::write(&bad, b"garbage without a header").unwrap();
    let c = numbered(&dir, "micro.mi", 2.0, 3, "01330002.dbd");

    let merged = read_multiple(&[&a, &bad, &c], &WriterOptions::default()).unwrap();
    assert_eq!(merged.n_records(), 5);
    assert_eq!(merged.summary.n_files, 2);
    assert_eq!(merged.summary.failed.len(), 1);
    assert_eq!(merged.summary.failed[0].0, bad);
}

#[test]
fn test_empty_union_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("01330000.dbd");
    std::fs::write(&bad, b"\0\0\0\0").unwrap();

    let output = dir.path().join("out.nc");
    let summary = StreamingWriter::new(WriterOptions::default())
        .write_netcdf(&[&bad], &output)
        .unwrap();
    assert!(summary.is_empty());
    assert_eq!(summary.n_records, 0);
    assert_eq!(summary.failed.len(), 1);
    assert!(!output.exists());
}

#[test]
fn test_mission_filter() {
    let dir = TempDir::new().unwrap();
    let a = numbered(&dir, "MICRO.MI", 0.0, 3, "01330000.dbd");
    let b = numbered(&dir, "status.mi", 10.0, 3, "01330001.dbd");

    let options = WriterOptions::default().missions(MissionFilter::exclude(&["status.mi"]));
    let merged = read_multiple(&[&a, &b], &options).unwrap();
    assert_eq!(merged.n_records(), 3);
    assert_eq!(merged.summary.n_files, 1);

    let options = WriterOptions::default().missions(MissionFilter::include(&["micro.mi"]));
    let writer = StreamingWriter::new(options);
    let discovery = writer.discover(&[&a, &b]);
    assert_eq!(discovery.files, vec![a.clone()]);

    assert!(matches!(
        MissionFilter::new(&["a.mi"], &["b.mi"]),
        Err(DbdError::ConflictingMissionFilters)
    ));
}

#[test]
fn test_keep_restricts_union() {
    let dir = TempDir::new().unwrap();
    let a = numbered(&dir, "micro.mi", 0.0, 2, "01330000.dbd");
    let mut b = DbdFixture::new("micro.mi", &[("m_present_time", "timestamp", 8), ("m_roll", "rad", 4)]);
    b.all_new(&[5.0, 0.1]);
    let b = b.write(dir.path(), "01330001.dbd");

    let options = WriterOptions::default().reader(ReaderOptions::new().keep(["m_present_time", "m_roll"]));
    let merged = read_multiple(&[&a, &b], &options).unwrap();
    assert_eq!(merged.data.column_names(), vec!["m_present_time", "m_roll"]);
    assert_eq!(merged.n_records(), 2);
}

#[test]
fn test_large_file_exceeds_batch() {
    let dir = TempDir::new().unwrap();
    let a = numbered(&dir, "micro.mi", 0.0, 3, "01330000.dbd");
    let b = numbered(&dir, "micro.mi", 3.0, 40, "01330001.dbd");

    let mut sink = MemorySink::new();
    let writer = StreamingWriter::new(WriterOptions::default().batch_records(8));
    let summary = writer.write(&[&a, &b], &mut sink).unwrap();
    assert_eq!(summary.n_records, 3 + 40 - 1);
    assert_eq!(sink.n_rows(), summary.n_records);
    assert_eq!(sink.attribute(ATTR_TOTAL_RECORDS), Some(42));
    assert_eq!(sink.attribute(ATTR_N_FILES), Some(2));
    assert!(sink.is_finished());
}
