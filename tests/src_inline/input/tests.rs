use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;

use super::reader::{Delimiter, detect_delimiter};
use super::*;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("kira_coculture_input_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(path: &Path, contents: &str) {
    let mut f = BufWriter::new(File::create(path).unwrap());
    f.write_all(contents.as_bytes()).unwrap();
}

fn write_gz(path: &Path, contents: &str) {
    let mut enc = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    enc.write_all(contents.as_bytes()).unwrap();
    enc.finish().unwrap();
}

#[test]
fn test_load_csv_types_columns() {
    let dir = make_temp_dir();
    let path = dir.join("s1.csv");
    write_file(&path, "FSC-A,SSC-A,Well\n100,20.5,A1\n200,30,A2\n");

    let table = load_sample_table(&path, &[]).unwrap();
    assert_eq!(table.n_rows, 2);
    assert_eq!(table.numeric("FSC-A").unwrap(), &[100.0, 200.0]);
    assert_eq!(table.numeric("SSC-A").unwrap(), &[20.5, 30.0]);
    assert_eq!(table.text("Well").unwrap(), &["A1".to_string(), "A2".to_string()]);
    assert_eq!(table.numeric_names(), vec!["FSC-A", "SSC-A"]);
}

#[test]
fn test_load_drops_time_column() {
    let dir = make_temp_dir();
    let path = dir.join("s2.tsv");
    write_file(&path, "Time\tFL1\n0.1\t5\n0.2\t6\n");

    let table = load_sample_table(&path, &["Time".to_string()]).unwrap();
    assert!(table.column("Time").is_none());
    assert_eq!(table.n_cols(), 1);
}

#[test]
fn test_load_gz_tsv() {
    let dir = make_temp_dir();
    let path = dir.join("s3.tsv.gz");
    write_gz(&path, "A\tB\n1\t2\n3\t4\n5\t6\n");

    let table = load_sample_table(&path, &[]).unwrap();
    assert_eq!(table.n_rows, 3);
    assert_eq!(table.numeric("B").unwrap(), &[2.0, 4.0, 6.0]);
}

#[test]
fn test_ragged_rows_rejected() {
    let dir = make_temp_dir();
    let path = dir.join("bad.csv");
    write_file(&path, "A,B\n1,2\n3\n");

    let err = load_sample_table(&path, &[]).unwrap_err();
    assert!(matches!(err, InputError::InvalidInput(_)));
}

#[test]
fn test_missing_file() {
    let dir = make_temp_dir();
    let err = load_sample_table(&dir.join("nope.csv"), &[]).unwrap_err();
    assert!(matches!(err, InputError::MissingInput(_)));
}

#[test]
fn test_delimiter_detection() {
    assert_eq!(detect_delimiter(Path::new("a.csv")), Delimiter::Comma);
    assert_eq!(detect_delimiter(Path::new("a.tsv.gz")), Delimiter::Tab);
    assert_eq!(detect_delimiter(Path::new("a.TXT")), Delimiter::Tab);
}

#[test]
fn test_default_sample_id() {
    assert_eq!(default_sample_id(Path::new("/d/coculture_01.csv")), "coculture_01");
    assert_eq!(default_sample_id(Path::new("x.tsv.gz")), "x");
}

#[test]
fn test_select_rows_and_projection() {
    let mut table = SampleTable::new(3);
    table.push_numeric("A", vec![1.0, 2.0, 3.0]).unwrap();
    table
        .push_text("L", vec!["a".into(), "b".into(), "c".into()])
        .unwrap();
    table.push_numeric("U", vec![0.1, 0.2, 0.3]).unwrap();

    let sub = table.select_rows(&[0, 2]);
    assert_eq!(sub.n_rows, 2);
    assert_eq!(sub.numeric("A").unwrap(), &[1.0, 3.0]);
    assert_eq!(sub.text("L").unwrap(), &["a".to_string(), "c".to_string()]);

    let proj = table.numeric_projection(&["U"]);
    assert_eq!(proj.numeric_names(), vec!["A"]);
    assert_eq!(proj.numeric_rows(), vec![vec![1.0], vec![2.0], vec![3.0]]);
}

#[test]
fn test_push_rejects_length_mismatch_and_duplicates() {
    let mut table = SampleTable::new(2);
    assert!(table.push_numeric("A", vec![1.0]).is_err());
    table.push_numeric("A", vec![1.0, 2.0]).unwrap();
    assert!(table.push_numeric("A", vec![1.0, 2.0]).is_err());
}
