use async_trait::async_trait;
use mockall::mock;
use pretty_assertions::assert_eq;
use rtl_bench_core::{
    BenchTask, CompletionRecord, CoreError, GenerationRequest, ModelBackend, Result, SamplingConfig,
};
use rtl_bench_workflow::*;
use std::sync::Arc;

mock! {
    pub Backend {}

    #[async_trait]
    impl ModelBackend for Backend {
        async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>>;
        fn model_name(&self) -> &str;
    }
}

fn answer(module: &str) -> String {
    format!(
        "Here is my design.\n## Code Implementation\n```verilog\n// top\nmodule {}(input a, output y);\n  assign y = a;\nendmodule\n```\n",
        module
    )
}

fn sampling(batch_size: usize) -> SamplingConfig {
    SamplingConfig {
        temperature: 0.8,
        top_p: Some(0.95),
        batch_size,
        max_tokens: 512,
    }
}

#[tokio::test]
async fn test_samples_land_in_repetition_dirs() {
    let mut backend = MockBackend::new();
    backend.expect_model_name().return_const("mock-model".to_string());
    backend
        .expect_generate()
        .withf(|req| req.samples == 3 && req.top_p == Some(0.95))
        .times(2)
        .returning(|req| {
            let module = if req.prompt.contains("buffer") { "buf1" } else { "inv" };
            Ok(vec![answer(module); 3])
        });

    let root = tempfile::tempdir().unwrap();
    let log = root.path().join("completions.jsonl");
    let mut config = GenerationConfig::new(root.path());
    config.completion_log = Some(log.clone());

    let tasks = vec![
        BenchTask::new("buf1", "Write a buffer."),
        BenchTask::new("inv", "Write an inverter.").with_interface("module inv(input a, output y);"),
    ];
    let stage = GenerationStage::new(Arc::new(backend), sampling(3), config);
    let summary = stage.run(&tasks).await.unwrap();

    assert_eq!(summary.tasks, 2);
    assert_eq!(summary.repetitions, 3);
    assert_eq!(summary.candidates_written, 6);
    assert!(summary.failed_tasks.is_empty());

    for i in 0..3 {
        let code = std::fs::read_to_string(root.path().join(format!("test_{}/inv/inv.v", i))).unwrap();
        assert!(code.starts_with("module inv(input a, output y);"));
        assert!(!code.contains("// top"));
    }

    let records: Vec<CompletionRecord> = std::fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), 6);
    assert_eq!(records[0].task_id, "buf1");
    assert_eq!(records[0].code_header, "module buf1(input a, output y);");
    assert_eq!(records[0].completion, "  assign y = a;\nendmodule");
    assert!(!records[0].maintain);
}

#[tokio::test]
async fn test_greedy_sampling_draws_one() {
    let mut backend = MockBackend::new();
    backend.expect_model_name().return_const("mock-model".to_string());
    backend
        .expect_generate()
        .withf(|req| req.samples == 1 && req.temperature == 0.0)
        .times(1)
        .returning(|_| Ok(vec![answer("inv")]));

    let root = tempfile::tempdir().unwrap();
    let mut greedy = sampling(20);
    greedy.temperature = 0.0;
    let stage = GenerationStage::new(Arc::new(backend), greedy, GenerationConfig::new(root.path()));

    let summary = stage
        .run(&[BenchTask::new("inv", "Write an inverter.")])
        .await
        .unwrap();

    assert_eq!(summary.repetitions, 1);
    assert!(root.path().join("test_0/inv/inv.v").is_file());
    assert!(!root.path().join("test_1").exists());
}

#[tokio::test]
async fn test_failed_task_does_not_abort_generation() {
    let mut backend = MockBackend::new();
    backend.expect_model_name().return_const("mock-model".to_string());
    backend.expect_generate().returning(|req| {
        if req.prompt.contains("broken") {
            Err(CoreError::Inference("server returned 500".to_string()))
        } else {
            Ok(vec![answer("ok"), answer("ok")])
        }
    });

    let root = tempfile::tempdir().unwrap();
    let stage = GenerationStage::new(Arc::new(backend), sampling(2), GenerationConfig::new(root.path()));
    let tasks = vec![
        BenchTask::new("ok", "A fine task."),
        BenchTask::new("bad", "A broken task."),
    ];

    let summary = stage.run(&tasks).await.unwrap();

    assert_eq!(summary.candidates_written, 2);
    assert_eq!(summary.failed_tasks, vec!["bad".to_string()]);
    assert!(!root.path().join("test_0/bad").exists());
}

#[tokio::test]
async fn test_extra_samples_are_ignored() {
    let mut backend = MockBackend::new();
    backend.expect_model_name().return_const("mock-model".to_string());
    backend
        .expect_generate()
        .returning(|_| Ok(vec![answer("inv"); 5]));

    let root = tempfile::tempdir().unwrap();
    let stage = GenerationStage::new(Arc::new(backend), sampling(2), GenerationConfig::new(root.path()));

    let summary = stage
        .run(&[BenchTask::new("inv", "Write an inverter.")])
        .await
        .unwrap();

    assert_eq!(summary.candidates_written, 2);
    assert!(!root.path().join("test_2").exists());
}
