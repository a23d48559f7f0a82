use rtl_bench_core::{CoreError, RepetitionIndex, ResultTally};
use rtl_bench_workflow::*;
use std::fs;
use std::path::Path;

const EPS: f64 = 1e-9;

/// Lay out `root/test_i/<task>/verdict` where the run step just prints the
/// verdict file. Verdicts are space separated, one per repetition; "nobuild"
/// never produces an artifact.
fn stage(root: &Path, verdicts: &[(&str, &str)]) {
    for (task, per_rep) in verdicts {
        for (i, verdict) in per_rep.split_whitespace().enumerate() {
            let dir = trial_dir(root, RepetitionIndex(i), task);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("verdict"), verdict).unwrap();
        }
    }
}

fn executor() -> TrialExecutor {
    let toolchain = ToolchainConfig {
        build_command: "grep -q nobuild verdict || touch simv".to_string(),
        run_command: "cat verdict".to_string(),
        clean_command: "rm -f simv output.txt".to_string(),
        run_timeout_secs: 5,
        ..Default::default()
    };
    TrialExecutor::new(toolchain, SuccessMarker::default())
}

fn tasks(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

// ===== Driver Tests =====

#[tokio::test]
async fn test_run_accumulates_every_trial() {
    let root = tempfile::tempdir().unwrap();
    stage(
        root.path(),
        &[
            ("adder", "pass pass pass"),
            ("fsm", "fail pass nobuild"),
        ],
    );

    let driver = BenchmarkDriver::new(executor(), DriverConfig::default()).unwrap();
    let ids = tasks(&["adder", "fsm"]);
    let acc = ResultAccumulator::with_tasks(ids.iter().cloned());
    let reps = driver
        .run(root.path(), &ids, RepetitionSource::Probe, &acc)
        .await
        .unwrap();

    assert_eq!(reps, 3);
    assert_eq!(
        acc.tally("adder"),
        Some(ResultTally { syntax_success: 3, func_success: 3, trials: 3 })
    );
    assert_eq!(
        acc.tally("fsm"),
        Some(ResultTally { syntax_success: 2, func_success: 1, trials: 3 })
    );
}

#[tokio::test]
async fn test_evaluate_report_with_placeholder() {
    let root = tempfile::tempdir().unwrap();
    stage(
        root.path(),
        &[("good", "pass pass"), ("bad", "fail fail")],
    );

    let config = DriverConfig {
        ks: vec![1],
        max_parallel_trials: 4,
        ..Default::default()
    };
    let driver = BenchmarkDriver::new(executor(), config).unwrap();
    let report = driver
        .evaluate(root.path(), &tasks(&["good", "bad"]), RepetitionSource::Probe, None)
        .await
        .unwrap();

    assert_eq!(report.repetitions, 2);
    assert_eq!(report.pass_at_k.len(), 1);
    let live = &report.pass_at_k[0];
    // Two real tasks plus one zero-score placeholder.
    assert!((live.syntax.average - 2.0 / 3.0).abs() < EPS);
    assert!((live.functional.average - 1.0 / 3.0).abs() < EPS);
    assert_eq!(live.tasks_func_solved, 1);
    assert_eq!(live.tasks_syntax_solved, 2);

    let record = report.to_score_record();
    assert!((record.scores["func pass@1"] - 1.0 / 3.0).abs() < EPS);
    assert!(report.render_text().contains("total_func_success: 1/2"));
}

#[tokio::test]
async fn test_evaluate_without_placeholder() {
    let root = tempfile::tempdir().unwrap();
    stage(root.path(), &[("only", "pass fail fail fail fail")]);

    let config = DriverConfig {
        ks: vec![1, 5],
        placeholder_tasks: 0,
        ..Default::default()
    };
    let driver = BenchmarkDriver::new(executor(), config).unwrap();
    let report = driver
        .evaluate(root.path(), &tasks(&["only"]), RepetitionSource::Probe, Some("m".to_string()))
        .await
        .unwrap();

    assert!((report.pass_at_k[0].functional.average - 0.2).abs() < EPS);
    assert!((report.pass_at_k[1].functional.average - 1.0).abs() < EPS);
    assert_eq!(report.model.as_deref(), Some("m"));
}

#[tokio::test]
async fn test_missing_trial_counts_as_build_failure() {
    let root = tempfile::tempdir().unwrap();
    stage(root.path(), &[("adder", "pass pass")]);

    let driver = BenchmarkDriver::new(executor(), DriverConfig::default()).unwrap();
    let ids = tasks(&["adder", "absent"]);
    let acc = ResultAccumulator::with_tasks(ids.iter().cloned());
    driver
        .run(root.path(), &ids, RepetitionSource::Explicit(2), &acc)
        .await
        .unwrap();

    assert_eq!(
        acc.tally("absent"),
        Some(ResultTally { syntax_success: 0, func_success: 0, trials: 2 })
    );
}

#[tokio::test]
async fn test_no_repetitions_yields_zero_scores() {
    let root = tempfile::tempdir().unwrap();
    let driver = BenchmarkDriver::new(executor(), DriverConfig::default()).unwrap();

    let report = driver
        .evaluate(root.path(), &tasks(&["adder"]), RepetitionSource::Probe, None)
        .await
        .unwrap();

    assert_eq!(report.repetitions, 0);
    assert_eq!(report.pass_at_k[0].functional.average, 0.0);
}

#[tokio::test]
async fn test_progress_events() {
    let root = tempfile::tempdir().unwrap();
    stage(root.path(), &[("a", "pass fail"), ("b", "pass pass")]);

    let mut driver = BenchmarkDriver::new(executor(), DriverConfig::default()).unwrap();
    let mut rx = driver.subscribe();
    let ids = tasks(&["a", "b"]);
    let acc = ResultAccumulator::new();
    driver
        .run(root.path(), &ids, RepetitionSource::Probe, &acc)
        .await
        .unwrap();

    let mut started = 0;
    let mut finished_trials = 0;
    let mut finished_reps = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            DriverEvent::RepetitionStarted { tasks, .. } => {
                assert_eq!(tasks, 2);
                started += 1;
            }
            DriverEvent::TrialFinished(_) => finished_trials += 1,
            DriverEvent::RepetitionFinished { .. } => finished_reps += 1,
        }
    }
    assert_eq!((started, finished_trials, finished_reps), (2, 4, 2));
}

#[tokio::test]
async fn test_cancelled_run() {
    let root = tempfile::tempdir().unwrap();
    stage(root.path(), &[("a", "pass")]);

    let driver = BenchmarkDriver::new(executor(), DriverConfig::default()).unwrap();
    driver.cancellation_token().cancel();
    let acc = ResultAccumulator::new();

    let result = driver
        .run(root.path(), &tasks(&["a"]), RepetitionSource::Probe, &acc)
        .await;

    assert!(matches!(result, Err(CoreError::Cancelled)));
    assert!(acc.is_empty());
}

#[test]
fn test_zero_k_rejected() {
    let config = DriverConfig {
        ks: vec![1, 0],
        ..Default::default()
    };
    assert!(BenchmarkDriver::new(executor(), config).is_err());
}

#[test]
fn test_zero_parallelism_rejected() {
    let config = DriverConfig {
        max_parallel_trials: 0,
        ..Default::default()
    };
    assert!(BenchmarkDriver::new(executor(), config).is_err());
}
