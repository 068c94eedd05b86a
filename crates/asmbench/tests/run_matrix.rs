//! `run_matrix` with its default tools resolved from the working directory
//! and `PATH`.
//!
//! Kept in its own test binary: it changes the process working directory and
//! `PATH`, so no other test may run alongside it.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use asmbench::{run_matrix, Compiler, OptimizationLevel, Variant};
use asmbench_test::fake_tools::{sh_compiler, write_fake_compiler};

fn write_executable(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{}", body)).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn test_run_matrix_with_default_tools() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();

    write_executable(&dir.path().join("stripasm"), "cat \"$1\"\n");
    // Turns commas into cell borders, like csvtomd without the outer border.
    write_executable(&bin.join("csvtomd"), "sed 's/,/ | /g' \"$1\"\n");

    let script = write_fake_compiler(
        dir.path(),
        "fakecc.sh",
        &[
            ("VR_BASELINE", "-O0", 100),
            ("VR_BASELINE", "-O1", 80),
            ("VR_CURRY", "-O0", 100),
            ("VR_CURRY", "-O1", 40),
        ],
    )
    .unwrap();
    let compiler = sh_compiler("fakecc", &script);

    let path = std::env::var_os("PATH").unwrap_or_default();
    let mut paths = vec![bin.clone()];
    paths.extend(std::env::split_paths(&path));
    std::env::set_var("PATH", std::env::join_paths(paths).unwrap());
    std::env::set_current_dir(dir.path()).unwrap();

    let report = run_matrix(
        "curry.cpp",
        &[
            Variant::new("Baseline", "VR_BASELINE"),
            Variant::new("Curry", "VR_CURRY"),
        ],
        &[Compiler::new(compiler.label, compiler.command).with_args(compiler.args)],
        &[OptimizationLevel::new("-O0"), OptimizationLevel::new("-O1")],
    )
    .unwrap();

    assert_eq!(report.blocks.len(), 2);
    assert_eq!(
        report.blocks[1].csv.rows()[0].cells_csv(),
        "100 *(+0.0%)*,40 *(-50.0%)*"
    );
    assert_eq!(
        report.blocks[1].markdown,
        "| | O0 | O1\n|fakecc | 100 *(+0.0%)* | 40 *(-50.0%)*\n"
    );
    assert_eq!(
        report.to_string(),
        "**Baseline**\n\n| | O0 | O1\n|fakecc | 100 | 80\n\n\n\
         **Curry**\n\n| | O0 | O1\n|fakecc | 100 *(+0.0%)* | 40 *(-50.0%)*\n\n\n"
    );
}
