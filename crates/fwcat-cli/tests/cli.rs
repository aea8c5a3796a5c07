//! End-to-end tests driving the `fwcat` binary.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

use flate2::Compression;
use flate2::write::GzEncoder;

const MANIFEST: &str = r#"{
    "path": "https://downloads.example.com/firmware/",
    "tarball": "{version}/fw-{version}.tar.gz",
    "versions": [
        {"date": "2024-01-10", "md5sum": "aa", "models": "D40,D45", "version": "1_0_9"},
        {"date": "2024-03-02", "md5sum": "bb", "models": "D65", "version": "1_1_0"}
    ],
    "versions2": [
        {"date": "2024-04-20", "md5sum": "cc", "models": "*", "version": "2_0_1"}
    ]
}"#;

fn fwcat(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fwcat"))
        .args(args)
        .env_remove("FWCAT_MANIFEST")
        .env_remove("FWCAT_TIMEOUT")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run fwcat")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_manifest(dir: &Path) -> String {
    let path = dir.join("catalog.json");
    std::fs::write(&path, MANIFEST).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn help_and_version() {
    let output = fwcat(&["--help"]);
    assert!(output.status.success());
    let help = stdout(&output);
    for command in ["list", "latest", "url", "download", "entries"] {
        assert!(help.contains(command), "missing {command} in help");
    }

    let output = fwcat(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("fwcat "));
}

#[test]
fn list_groups_by_branch() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path());

    let output = fwcat(&["--manifest", &manifest, "list"]);
    assert!(output.status.success());
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("Origin: https://downloads.example.com/firmware/"));
    assert_eq!(lines[1], "Branch 2:");
    assert!(lines[2].trim_start().starts_with("2_0_1"));
    assert_eq!(lines[3], "Branch 1:");
    assert!(lines[4].trim_start().starts_with("1_1_0"));
    assert!(lines[5].trim_start().starts_with("1_0_9"));
}

#[test]
fn list_filters_by_model() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path());

    let output = fwcat(&["--manifest", &manifest, "list", "--model", "d45"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("1_0_9"));
    assert!(!text.contains("1_1_0"));
    assert!(!text.contains("2_0_1"));

    let output = fwcat(&["--manifest", &manifest, "list", "--match", "D6*", "--exclude"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(!text.contains("1_1_0"));
    assert!(text.contains("1_0_9"));
}

#[test]
fn latest_and_url() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path());

    let output = fwcat(&["--manifest", &manifest, "latest"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("2_0_1 2024-04-20"));

    let output = fwcat(&["--manifest", &manifest, "latest", "--branch", "1"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("1_1_0"));

    let output = fwcat(&["--manifest", &manifest, "url", "1_0_9"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim(),
        "https://downloads.example.com/firmware/1_0_9/fw-1_0_9.tar.gz"
    );

    let output = fwcat(&["--manifest", &manifest, "url", "9_9_9"]);
    assert!(!output.status.success());
}

#[test]
fn missing_manifest_is_reported() {
    let output = fwcat(&["list"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("FWCAT_MANIFEST"));
}

#[test]
fn entries_lists_local_package() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fw.tar.gz");

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mode(0o644);
    header.set_mtime(1_700_000_000);
    header.set_size(5);
    builder
        .append_data(&mut header, "fw/firmware_D92_1.bin", &b"image"[..])
        .unwrap();
    let bytes = builder.into_inner().unwrap().finish().unwrap();
    std::fs::File::create(&path)
        .unwrap()
        .write_all(&bytes)
        .unwrap();

    let output = fwcat(&["entries", path.to_str().unwrap()]);
    assert!(output.status.success());
    let text = stdout(&output);
    let first = text.lines().next().unwrap();
    assert!(first.starts_with("fw/firmware_D92_1.bin\t5\t"));
    assert!(first.ends_with("\tD92"));
    assert!(text.lines().last().unwrap().starts_with("md5 "));
}

#[test]
fn entries_rejects_plain_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "not a package").unwrap();

    let output = fwcat(&["entries", path.to_str().unwrap()]);
    assert!(!output.status.success());
}
