use std::fs::File;
use std::io::Write;

use els_config::{FeedModeName, load_pitch_csv};
use rstest::rstest;
use tempfile::tempdir;

fn write_csv(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pitches.csv");
    let mut f = File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    (dir, path)
}

#[rstest]
fn loads_mixed_modes() {
    let (_dir, path) = write_csv("mode,pitch\ninch,11.5\nmetric, 1.25\nmodule,0.5\n");
    let rows = load_pitch_csv(&path).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].mode, FeedModeName::Inch);
    assert_eq!(rows[0].pitch, "11.5");
    assert_eq!(rows[1].mode, FeedModeName::Metric);
    assert_eq!(rows[1].pitch, "1.25");
    assert_eq!(rows[2].mode, FeedModeName::Module);
}

#[rstest]
fn rejects_wrong_headers() {
    let (_dir, path) = write_csv("kind,value\ninch,8\n");
    let err = load_pitch_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("headers 'mode,pitch'"));
}

#[rstest]
#[case("mode,pitch\ninch,0\n")]
#[case("mode,pitch\ninch,eight\n")]
#[case("mode,pitch\nfurlong,8\n")]
fn rejects_bad_rows(#[case] body: &str) {
    let (_dir, path) = write_csv(body);
    let err = load_pitch_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("invalid CSV row 2"), "got: {err}");
}

#[rstest]
fn rejects_empty_catalog() {
    let (_dir, path) = write_csv("mode,pitch\n");
    let err = load_pitch_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("has no rows"));
}

#[rstest]
fn missing_file_is_reported() {
    let dir = tempdir().unwrap();
    let err = load_pitch_csv(&dir.path().join("nope.csv")).unwrap_err();
    assert!(format!("{err}").contains("open pitch CSV"));
}
