//! Integration tests for the benchmark matrix driver.

use std::collections::HashSet;

use asmbench::config::{
    CompilerConfig, FlagSetConfig, MarkdownConfig, MatrixConfig, ToolConfig, VariantConfig,
};
use asmbench::{
    BuiltinFormatter, CancellationToken, Compiler, Matrix, MatrixRunner, OptimizationLevel,
    Variant,
};
use asmbench_test::ScriptedMeasurer;

fn counts_for(macros: &[&'static str], levels: &[&'static str]) -> Vec<(&'static str, &'static str, u64)> {
    let mut counts = Vec::new();
    for (m, define) in macros.iter().enumerate() {
        for (l, level) in levels.iter().enumerate() {
            counts.push((*define, *level, 100 + (m as u64) * 10 + l as u64));
        }
    }
    counts
}

#[test]
fn test_table_holds_one_entry_per_cell() {
    let levels = ["-O0", "-O2", "-Ofast"];
    let macros = ["VR_BASELINE", "VR_FN_PTR", "VR_TEMPLATE"];
    let config = MatrixConfig::new()
        .with_variants(vec![
            VariantConfig::new("Baseline", "VR_BASELINE"),
            VariantConfig::new("Function pointer", "VR_FN_PTR"),
            VariantConfig::new("Template parameter", "VR_TEMPLATE"),
        ])
        .with_compilers(vec![
            CompilerConfig::new("g++ 6.2.1", "/bin/g++"),
            CompilerConfig::new("clang++ 3.9.0", "/bin/clang++"),
        ])
        .with_optimization_levels(levels)
        .with_flag_sets(vec![
            FlagSetConfig::default(),
            FlagSetConfig::new(" (-fno-inline)", ["-fno-inline"]),
        ]);
    let matrix = Matrix::from_config(&config).unwrap();
    let mut measurer = ScriptedMeasurer::new(&counts_for(&macros, &levels));

    let results = MatrixRunner::new(matrix)
        .measure("bench.cpp", &mut measurer)
        .unwrap();

    assert_eq!(results.table.len(), 2 * 3 * 2 * 3);
    assert_eq!(results.table.len(), config.cell_count());
    let keys: HashSet<_> = results.table.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(keys.len(), results.table.len());
    assert_eq!(measurer.calls().len(), results.table.len());

    let headings: Vec<&str> = results.blocks.iter().map(|(h, _)| h.as_str()).collect();
    assert_eq!(
        headings,
        vec![
            "Baseline",
            "Function pointer",
            "Template parameter",
            "Baseline (-fno-inline)",
            "Function pointer (-fno-inline)",
            "Template parameter (-fno-inline)",
        ]
    );
}

#[test]
fn test_second_variant_renders_against_baseline() {
    let matrix = Matrix::new(
        vec![
            Variant::new("Baseline", "VR_BASELINE"),
            Variant::new("Curry", "VR_CURRY"),
        ],
        vec![Compiler::new("g++ 7.0.0 20170113", "/usr/local/bin/g++")],
        vec![OptimizationLevel::new("-O0"), OptimizationLevel::new("-O1")],
    )
    .unwrap();
    let mut measurer = ScriptedMeasurer::new(&[
        ("VR_BASELINE", "-O0", 100),
        ("VR_BASELINE", "-O1", 80),
        ("VR_CURRY", "-O0", 100),
        ("VR_CURRY", "-O1", 40),
    ]);

    let results = MatrixRunner::new(matrix)
        .measure("curry.cpp", &mut measurer)
        .unwrap();

    let curry = &results.blocks[1].1;
    assert_eq!(curry.rows()[0].cells_csv(), "100 *(+0.0%)*,40 *(-50.0%)*");
    assert_eq!(
        curry.to_csv(),
        ",O0,O1\ng++ 7.0.0 20170113,100 *(+0.0%)*,40 *(-50.0%)*"
    );
}

#[test]
fn test_only_non_baseline_blocks_are_annotated() {
    let levels = ["-O0", "-O1", "-O2", "-O3", "-Ofast"];
    let macros = ["VR_BASELINE", "VR_FUNCTION_VIEW", "VR_STD_FUNCTION"];
    let matrix = Matrix::new(
        vec![
            Variant::new("Baseline", "VR_BASELINE"),
            Variant::new("`function_view`", "VR_FUNCTION_VIEW"),
            Variant::new("`std::function`", "VR_STD_FUNCTION"),
        ],
        vec![Compiler::new("g++", "g++"), Compiler::new("clang++", "clang++")],
        levels.iter().map(|l| OptimizationLevel::new(*l)).collect(),
    )
    .unwrap();
    let mut measurer = ScriptedMeasurer::new(&counts_for(&macros, &levels));

    let report = MatrixRunner::new(matrix)
        .run("fn.cpp", &mut measurer, &BuiltinFormatter)
        .unwrap();

    let baseline = report.block("Baseline").unwrap();
    assert!(!baseline.markdown.contains("*("));
    assert!(!baseline.csv.to_csv().contains('%'));

    for heading in ["`function_view`", "`std::function`"] {
        let block = report.block(heading).unwrap();
        for row in block.csv.rows() {
            assert_eq!(row.tokens.len(), levels.len());
            assert!(row.tokens.iter().all(|t| t.contains(" *(") && t.ends_with("%)*")));
        }
    }
}

#[test]
fn test_cancelled_config_run_produces_no_report() {
    let token = CancellationToken::new();
    token.cancel();

    let config = MatrixConfig::new().with_markdown(MarkdownConfig::Builtin);
    let result = asmbench::run_with_config(&config, "bench.cpp", token);
    assert!(matches!(result, Err(asmbench::BenchError::Cancelled)));
}

#[test]
fn test_invalid_config_is_rejected_before_running() {
    let config = MatrixConfig::new().with_compilers(vec![]);
    let result = asmbench::run_with_config(&config, "bench.cpp", CancellationToken::new());
    assert!(matches!(result, Err(asmbench::BenchError::Config(_))));
}

#[cfg(unix)]
mod with_fake_compiler {
    use super::*;
    use asmbench::BenchError;
    use asmbench_test::fake_tools::{sh_compiler, write_failing_compiler, write_fake_compiler};

    fn base_config() -> MatrixConfig {
        MatrixConfig::new()
            .with_optimization_levels(["-O0", "-O1"])
            .with_strip_tool(ToolConfig::new("cat"))
            .with_markdown(MarkdownConfig::Builtin)
            .with_timeout_secs(30)
    }

    #[test]
    fn test_end_to_end_report() {
        let dir = tempfile::tempdir().unwrap();
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
        let config = base_config().with_compilers(vec![sh_compiler("fakecc", &script)]);

        let report =
            asmbench::run_with_config(&config, dir.path().join("curry.cpp"), CancellationToken::new())
                .unwrap();

        assert_eq!(report.blocks.len(), 2);
        assert_eq!(report.blocks[0].csv.to_csv(), ",O0,O1\nfakecc,100,80");
        assert_eq!(
            report.blocks[1].csv.rows()[0].cells_csv(),
            "100 *(+0.0%)*,40 *(-50.0%)*"
        );

        let text = report.to_string();
        assert!(text.starts_with("**Baseline**\n\n"));
        assert!(text.contains("**Curry**\n\n"));
    }

    #[test]
    fn test_compiler_stderr_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_failing_compiler(
            dir.path(),
            "broken.sh",
            "bench.cpp:3:1: error: expected ';'",
            1,
        )
        .unwrap();
        let config = base_config().with_compilers(vec![sh_compiler("broken", &script)]);

        let err = asmbench::run_with_config(&config, "bench.cpp", CancellationToken::new())
            .unwrap_err();
        match err {
            BenchError::CompilerDiagnostics { compiler, stderr, .. } => {
                assert_eq!(compiler, "broken");
                assert!(stderr.contains("expected ';'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tolerated_stderr_still_measures() {
        let dir = tempfile::tempdir().unwrap();
        // Warns, exits 0 and writes no assembly: every cell measures 0 lines.
        let script =
            write_failing_compiler(dir.path(), "noisy.sh", "warning: unused variable", 0).unwrap();
        let config = base_config()
            .with_compilers(vec![sh_compiler("noisy", &script)])
            .with_fail_on_compiler_stderr(false);

        let report =
            asmbench::run_with_config(&config, "bench.cpp", CancellationToken::new()).unwrap();

        assert_eq!(
            report.blocks[1].csv.rows()[0].cells_csv(),
            "0 *(+0.0%)*,0 *(+0.0%)*"
        );
    }

    #[test]
    fn test_silent_nonzero_exit_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("silent.sh");
        std::fs::write(&script, "exit 4\n").unwrap();
        let config = base_config()
            .with_compilers(vec![sh_compiler("silent", &script)])
            .with_fail_on_compiler_stderr(false);

        let err = asmbench::run_with_config(&config, "bench.cpp", CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, BenchError::CompilerFailed { .. }));
    }

    #[test]
    fn test_missing_strip_tool_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let script =
            write_fake_compiler(dir.path(), "fakecc.sh", &[("VR_BASELINE", "-O0", 1)]).unwrap();
        let config = base_config()
            .with_compilers(vec![sh_compiler("fakecc", &script)])
            .with_optimization_levels(["-O0"])
            .with_variants(vec![VariantConfig::new("Baseline", "VR_BASELINE")])
            .with_strip_tool(ToolConfig::new(
                dir.path().join("no-such-stripasm").to_string_lossy().into_owned(),
            ));

        let err = asmbench::run_with_config(&config, "bench.cpp", CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, BenchError::Spawn { .. }));
    }
}
