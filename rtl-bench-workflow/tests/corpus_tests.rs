use pretty_assertions::assert_eq;
use rtl_bench_workflow::*;
use std::io::Cursor;

const CORPUS: &str = r#"{"task_id": "adder_8bit", "description": "Implement an 8-bit adder.", "prompt": "module adder_8bit(input [7:0] a, input [7:0] b, output [8:0] sum);", "ref_module": "module ref; endmodule", "testbench": "module tb; endmodule"}

{"task_id": "mux", "prompt": "Implement a 2:1 mux.", "interface": "module mux(input a, b, sel, output y);", "canonical_solution": "assign y = sel ? b : a;"}
not json at all
{"description": "no id"}
{"task_id": "mux", "prompt": "duplicate"}
"#;

#[test]
fn test_load_both_dialects() {
    let corpus = CorpusLoader::new()
        .load_from_reader(Cursor::new(CORPUS))
        .unwrap();

    assert_eq!(corpus.task_ids(), vec!["adder_8bit".to_string(), "mux".to_string()]);

    let adder = &corpus.tasks[0];
    assert_eq!(adder.description, "Implement an 8-bit adder.");
    assert_eq!(
        adder.interface.as_deref(),
        Some("module adder_8bit(input [7:0] a, input [7:0] b, output [8:0] sum);")
    );
    assert_eq!(adder.reference.as_deref(), Some("module ref; endmodule"));
    assert_eq!(adder.testbench.as_deref(), Some("module tb; endmodule"));

    let mux = &corpus.tasks[1];
    assert_eq!(mux.description, "Implement a 2:1 mux.");
    assert_eq!(mux.interface.as_deref(), Some("module mux(input a, b, sel, output y);"));
    assert_eq!(mux.reference.as_deref(), Some("assign y = sel ? b : a;"));
}

#[test]
fn test_prompt_follows_dialect() {
    let corpus = CorpusLoader::new()
        .load_from_reader(Cursor::new(CORPUS))
        .unwrap();

    assert_eq!(
        corpus.tasks[0].prompt(),
        "Implement an 8-bit adder.\nmodule adder_8bit(input [7:0] a, input [7:0] b, output [8:0] sum);"
    );
    assert_eq!(corpus.tasks[1].prompt(), "Implement a 2:1 mux.");
}

#[test]
fn test_malformed_lines_are_warnings() {
    let corpus = CorpusLoader::new()
        .load_from_reader(Cursor::new(CORPUS))
        .unwrap();

    let lines: Vec<usize> = corpus.warnings.iter().map(|w| w.line).collect();
    assert_eq!(lines, vec![4, 5, 6]);
    assert!(corpus.warnings[2].reason.contains("duplicate"));
}

#[test]
fn test_invalid_utf8_line_is_warning() {
    let mut input = Vec::new();
    input.extend_from_slice(b"{\"task_id\": \"a\", \"prompt\": \"first\"}\n");
    input.extend_from_slice(b"{\"task_id\": \"b\", \"prompt\": \"\xfe\xff\"}\n");
    input.extend_from_slice(b"{\"task_id\": \"c\", \"prompt\": \"third\"}\n");

    let corpus = CorpusLoader::new()
        .load_from_reader(Cursor::new(input))
        .unwrap();

    assert_eq!(corpus.task_ids(), vec!["a".to_string(), "c".to_string()]);
    assert_eq!(corpus.warnings.len(), 1);
    assert_eq!(corpus.warnings[0].line, 2);
    assert!(corpus.warnings[0].reason.contains("UTF-8"));
}

#[test]
fn test_roster_filter() {
    let corpus = CorpusLoader::new()
        .with_roster(vec!["mux".to_string(), "not_in_corpus".to_string()])
        .load_from_reader(Cursor::new(CORPUS))
        .unwrap();

    assert_eq!(corpus.task_ids(), vec!["mux".to_string()]);
}

#[test]
fn test_missing_corpus_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = CorpusLoader::new().load(dir.path().join("absent.jsonl"));
    assert!(result.is_err());
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corpus.jsonl");
    std::fs::write(&path, CORPUS).unwrap();

    let corpus = CorpusLoader::new().load(&path).unwrap();
    assert_eq!(corpus.len(), 2);
    assert!(!corpus.is_empty());
}

#[test]
fn test_export_listings() {
    let corpus = CorpusLoader::new()
        .load_from_reader(Cursor::new(CORPUS))
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("listings");

    let written = export_listings(&corpus.tasks, &out).unwrap();

    assert_eq!(written, vec![out.join("adder_8bit.v"), out.join("mux.v")]);
    let listing = std::fs::read_to_string(out.join("adder_8bit.v")).unwrap();
    assert!(listing.contains("Description"));
    assert!(listing.contains("Implement an 8-bit adder."));
    assert!(listing.contains("Referred Module"));
    assert!(listing.contains("module ref; endmodule"));
    assert!(listing.contains("Testbench"));
}
