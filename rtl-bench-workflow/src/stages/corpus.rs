use rtl_bench_core::{BenchTask, CoreError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorpusWarning {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub tasks: Vec<BenchTask>,
    pub warnings: Vec<CorpusWarning>,
}

impl Corpus {
    pub fn task_ids(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.task_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Loads a line-delimited JSON task corpus, optionally restricted to a roster.
#[derive(Debug, Clone, Default)]
pub struct CorpusLoader {
    roster: Option<Vec<String>>,
}

impl CorpusLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roster(mut self, roster: Vec<String>) -> Self {
        self.roster = Some(roster);
        self
    }

    /// A missing or unreadable corpus is fatal.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Corpus> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| CoreError::io(&path, e))?;
        tracing::info!("Loading corpus from {}", path.display());
        self.load_lines(BufReader::new(file), &path)
    }

    pub fn load_from_reader<R: BufRead>(&self, reader: R) -> Result<Corpus> {
        self.load_lines(reader, Path::new("<reader>"))
    }

    fn load_lines<R: BufRead>(&self, reader: R, source: &Path) -> Result<Corpus> {
        let mut corpus = Corpus::default();
        let mut seen = HashSet::new();

        for (idx, line) in reader.split(b'\n').enumerate() {
            let line_no = idx + 1;
            let bytes = line.map_err(|e| CoreError::io(source, e))?;
            let line = match std::str::from_utf8(&bytes) {
                Ok(text) => text,
                Err(e) => {
                    corpus.warn(line_no, format!("not valid UTF-8 ({})", e));
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match parse_task(line) {
                Ok(task) => {
                    if !seen.insert(task.task_id.clone()) {
                        corpus.warn(line_no, format!("duplicate task_id '{}'", task.task_id));
                        continue;
                    }
                    corpus.tasks.push(task);
                }
                Err(reason) => corpus.warn(line_no, reason),
            }
        }

        if let Some(roster) = &self.roster {
            let wanted: HashSet<&str> = roster.iter().map(String::as_str).collect();
            corpus.tasks.retain(|t| wanted.contains(t.task_id.as_str()));
            for id in roster {
                if !seen.contains(id) {
                    tracing::warn!("roster task '{}' not found in corpus", id);
                }
            }
        }

        tracing::info!(
            tasks = corpus.tasks.len(),
            skipped = corpus.warnings.len(),
            "corpus loaded"
        );
        Ok(corpus)
    }
}

impl Corpus {
    fn warn(&mut self, line: usize, reason: String) {
        tracing::warn!("corpus line {}: {}, skipped", line, reason);
        self.warnings.push(CorpusWarning { line, reason });
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Accepts both corpus dialects: `description` + `prompt` (module header)
/// and `prompt` (description) + `interface`. Only the first sends the
/// interface to the model.
fn parse_task(line: &str) -> std::result::Result<BenchTask, String> {
    let value: Value = serde_json::from_str(line).map_err(|e| format!("invalid JSON ({})", e))?;

    let task_id = string_field(&value, "task_id").ok_or("missing 'task_id' field")?;

    let (description, interface, interface_in_prompt) = match string_field(&value, "description") {
        Some(description) => (
            description,
            string_field(&value, "interface").or_else(|| string_field(&value, "prompt")),
            true,
        ),
        None => (
            string_field(&value, "prompt").ok_or("missing 'description' or 'prompt' field")?,
            string_field(&value, "interface"),
            false,
        ),
    };

    let task = BenchTask {
        task_id,
        description,
        interface,
        interface_in_prompt,
        reference: string_field(&value, "ref_module")
            .or_else(|| string_field(&value, "canonical_solution")),
        testbench: string_field(&value, "testbench"),
    };
    task.validate().map_err(|e| e.to_string())?;
    Ok(task)
}

/// Write each task to `<dir>/<task_id>.v` with its description, reference
/// module and testbench as commented sections.
pub fn export_listings(tasks: &[BenchTask], dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| CoreError::io(dir, e))?;

    let mut written = Vec::with_capacity(tasks.len());
    for task in tasks {
        let path = dir.join(format!("{}.v", task.task_id));
        std::fs::write(&path, task.to_verilog_listing()).map_err(|e| CoreError::io(&path, e))?;
        written.push(path);
    }
    Ok(written)
}
