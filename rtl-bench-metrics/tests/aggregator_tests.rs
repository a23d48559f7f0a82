use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use rtl_bench_core::{Criterion, ResultTally};
use rtl_bench_metrics::{pass_at_k, PassAtKAggregator, StatisticalAnalyzer, DEFAULT_PLACEHOLDER_TASKS};
use std::collections::BTreeMap;

fn tally(syntax: u32, func: u32, trials: u32) -> ResultTally {
    ResultTally {
        syntax_success: syntax,
        func_success: func,
        trials,
    }
}

fn sample_tallies() -> BTreeMap<String, ResultTally> {
    let mut tallies = BTreeMap::new();
    tallies.insert("accu".to_string(), tally(5, 5, 5));
    tallies.insert("adder_8bit".to_string(), tally(4, 1, 5));
    tallies.insert("asyn_fifo".to_string(), tally(0, 0, 5));
    tallies
}

// ===== Live Aggregation Tests =====

#[test]
fn test_default_placeholder_count() {
    assert_eq!(DEFAULT_PLACEHOLDER_TASKS, 1);
    assert_eq!(PassAtKAggregator::default().placeholder_tasks(), 1);
}

#[test]
fn test_average_includes_placeholder() {
    let tallies = sample_tallies();
    let summary = PassAtKAggregator::default()
        .aggregate(&tallies, 5, 1, Criterion::Functional)
        .unwrap();

    // (1.0 + 0.2 + 0.0 + placeholder 0.0) / 4
    assert_relative_eq!(summary.average, 1.2 / 4.0, epsilon = 1e-12);
    assert_eq!(summary.per_task.len(), 3);
    assert_eq!(summary.placeholder_tasks, 1);
}

#[test]
fn test_average_without_placeholder() {
    let tallies = sample_tallies();
    let summary = PassAtKAggregator::new(0)
        .aggregate(&tallies, 5, 1, Criterion::Syntax)
        .unwrap();

    let expected = (1.0 + pass_at_k(5, 4, 1).unwrap() + 0.0) / 3.0;
    assert_relative_eq!(summary.average, expected, epsilon = 1e-12);
}

#[test]
fn test_empty_tallies() {
    let tallies = BTreeMap::new();
    let with_placeholder = PassAtKAggregator::default()
        .aggregate(&tallies, 5, 1, Criterion::Syntax)
        .unwrap();
    assert_eq!(with_placeholder.average, 0.0);

    let bare = PassAtKAggregator::new(0)
        .aggregate(&tallies, 5, 1, Criterion::Syntax)
        .unwrap();
    assert_eq!(bare.average, 0.0);
}

#[test]
fn test_tally_exceeding_repetitions_is_rejected() {
    let mut tallies = BTreeMap::new();
    tallies.insert("bad".to_string(), tally(6, 0, 6));
    assert!(PassAtKAggregator::default()
        .aggregate(&tallies, 5, 1, Criterion::Syntax)
        .is_err());
}

#[test]
fn test_report_solved_counts() {
    let tallies = sample_tallies();
    let report = PassAtKAggregator::default().report(&tallies, 5, 1).unwrap();

    assert_eq!(report.tasks_total, 3);
    assert_eq!(report.tasks_syntax_solved, 2);
    assert_eq!(report.tasks_func_solved, 2);
    assert!(report.functional.average <= report.syntax.average);
}

// ===== Score Interval Tests =====

#[test]
fn test_interval_contains_mean() {
    let values = vec![0.2, 0.4, 0.6, 0.8, 1.0];
    let interval = StatisticalAnalyzer::score_interval(&values, 0.95).unwrap();

    assert_relative_eq!(interval.mean, 0.6, epsilon = 1e-12);
    assert!(interval.lower <= interval.mean && interval.mean <= interval.upper);
    assert!(interval.lower >= 0.0 && interval.upper <= 1.0);
}

#[test]
fn test_interval_single_value_collapses() {
    let interval = StatisticalAnalyzer::score_interval(&[0.3], 0.95).unwrap();
    assert_eq!(interval.lower, 0.3);
    assert_eq!(interval.upper, 0.3);
}

#[test]
fn test_interval_empty() {
    assert!(StatisticalAnalyzer::score_interval(&[], 0.95).is_none());
}

#[test]
fn test_interval_wider_at_higher_confidence() {
    let values = vec![0.1, 0.3, 0.35, 0.5, 0.55];
    let narrow = StatisticalAnalyzer::score_interval(&values, 0.80).unwrap();
    let wide = StatisticalAnalyzer::score_interval(&values, 0.99).unwrap();
    assert!(wide.upper - wide.lower >= narrow.upper - narrow.lower);
}
