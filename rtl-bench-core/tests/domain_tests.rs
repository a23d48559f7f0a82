use pretty_assertions::assert_eq;
use rstest::rstest;
use rtl_bench_core::*;
use validator::Validate;

// ===== BenchTask Tests =====

#[test]
fn test_task_prompt_without_interface() {
    let task = BenchTask::new("adder_8bit", "  Implement an 8-bit adder.  \n");
    assert_eq!(task.prompt(), "Implement an 8-bit adder.");
}

#[test]
fn test_task_prompt_appends_interface() {
    let task = BenchTask::new("mux", "Implement a 2:1 mux.\n")
        .with_interface("\nmodule top_module(input a, input b, input sel, output out);\n");
    assert_eq!(
        task.prompt(),
        "Implement a 2:1 mux.\nmodule top_module(input a, input b, input sel, output out);"
    );
}

#[test]
fn test_task_prompt_can_leave_out_interface() {
    let task = BenchTask::new("mux", "Implement a 2:1 mux.")
        .with_interface("module top_module(input a, input b, input sel, output out);")
        .with_interface_in_prompt(false);
    assert_eq!(task.prompt(), "Implement a 2:1 mux.");
}

#[test]
fn test_task_interface_in_prompt_defaults_on_deserialize() {
    let task: BenchTask = serde_json::from_str(
        r#"{"task_id": "inv", "description": "Invert.", "interface": "module inv(input a, output y);",
            "reference": null, "testbench": null}"#,
    )
    .unwrap();
    assert!(task.interface_in_prompt);
    assert_eq!(task.prompt(), "Invert.\nmodule inv(input a, output y);");
}

#[test]
fn test_task_prompt_ignores_blank_interface() {
    let task = BenchTask::new("mux", "Implement a mux.").with_interface("   ");
    assert_eq!(task.prompt(), "Implement a mux.");
}

#[test]
fn test_task_validation_rejects_empty_id() {
    let task = BenchTask::new("", "desc");
    assert!(task.validate().is_err());
}

#[test]
fn test_task_verilog_listing_sections() {
    let task = BenchTask::new("t", "the description")
        .with_reference("module ref(); endmodule")
        .with_testbench("module tb(); endmodule");
    let listing = task.to_verilog_listing();

    let desc = listing.find("Description").unwrap();
    let reference = listing.find("Referred Module").unwrap();
    let testbench = listing.find("Testbench").unwrap();
    assert!(desc < reference && reference < testbench);
    assert!(listing.contains("module ref(); endmodule"));
    assert!(listing.contains("module tb(); endmodule"));
}

// ===== TrialOutcome Tests =====

#[rstest]
#[case(TrialOutcome::BuildFailed, false, false)]
#[case(TrialOutcome::BuildTimedOut, false, false)]
#[case(TrialOutcome::RunTimedOut, true, false)]
#[case(TrialOutcome::SimFailed, true, false)]
#[case(TrialOutcome::SimPassed, true, true)]
fn test_outcome_criteria(#[case] outcome: TrialOutcome, #[case] built: bool, #[case] passed: bool) {
    assert_eq!(outcome.built(), built);
    assert_eq!(outcome.passed(), passed);
}

// ===== ResultTally Tests =====

#[test]
fn test_tally_record_sequence() {
    let mut tally = ResultTally::new();
    for outcome in [
        TrialOutcome::SimPassed,
        TrialOutcome::BuildFailed,
        TrialOutcome::RunTimedOut,
        TrialOutcome::SimFailed,
        TrialOutcome::SimPassed,
    ] {
        tally.record(outcome);
    }

    assert_eq!(tally.trials, 5);
    assert_eq!(tally.syntax_success, 4);
    assert_eq!(tally.func_success, 2);
    assert!(tally.is_consistent());
    assert_eq!(tally.successes(Criterion::Syntax), 4);
    assert_eq!(tally.successes(Criterion::Functional), 2);
}

#[test]
fn test_tally_order_independent() {
    let outcomes = [
        TrialOutcome::SimPassed,
        TrialOutcome::BuildFailed,
        TrialOutcome::SimFailed,
        TrialOutcome::RunTimedOut,
    ];

    let mut forward = ResultTally::new();
    outcomes.iter().for_each(|o| forward.record(*o));
    let mut backward = ResultTally::new();
    outcomes.iter().rev().for_each(|o| backward.record(*o));

    assert_eq!(forward, backward);
}

// ===== RepetitionIndex Tests =====

#[test]
fn test_repetition_dir_name() {
    let index = RepetitionIndex(7);
    assert_eq!(index.dir_name(), "test_7");
    assert_eq!(index.to_string(), "test_7");
}

// ===== SamplingConfig Tests =====

#[test]
fn test_sampling_presets() {
    let high = SamplingConfig::from_preset(SamplingPreset::High);
    assert_eq!(high.temperature, 0.85);
    assert_eq!(high.top_p, Some(0.95));
    assert_eq!(high.effective_batch_size(), 20);

    let low = SamplingConfig::from_preset(SamplingPreset::Low);
    assert_eq!(low.temperature, 0.0);
    assert_eq!(low.effective_batch_size(), 1);
}

#[test]
fn test_zero_temperature_forces_single_sample() {
    let config = SamplingConfig {
        temperature: 0.0,
        batch_size: 20,
        ..SamplingConfig::default()
    };
    assert_eq!(config.effective_batch_size(), 1);
}

#[test]
fn test_sampling_validation() {
    let config = SamplingConfig {
        batch_size: 0,
        ..SamplingConfig::default()
    };
    assert!(config.validate().is_err());
    assert!(SamplingConfig::default().validate().is_ok());
}

#[test]
fn test_sampling_preset_parse() {
    assert_eq!("HIGH".parse::<SamplingPreset>().unwrap(), SamplingPreset::High);
    assert!("medium".parse::<SamplingPreset>().is_err());
}
