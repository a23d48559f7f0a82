use serde::{Deserialize, Serialize};
use validator::Validate;

/// One benchmark design problem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct BenchTask {
    #[validate(length(min = 1, max = 255))]
    pub task_id: String,
    pub description: String,
    pub interface: Option<String>,
    /// Whether [`BenchTask::prompt`] appends the interface. Corpora that
    /// already describe the ports in the description leave it out.
    #[serde(default = "default_interface_in_prompt")]
    pub interface_in_prompt: bool,
    pub reference: Option<String>,
    pub testbench: Option<String>,
}

impl BenchTask {
    pub fn new(task_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            description: description.into(),
            interface: None,
            interface_in_prompt: true,
            reference: None,
            testbench: None,
        }
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    pub fn with_interface_in_prompt(mut self, include: bool) -> Self {
        self.interface_in_prompt = include;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_testbench(mut self, testbench: impl Into<String>) -> Self {
        self.testbench = Some(testbench.into());
        self
    }

    /// The text sent to the model: description, then the interface when one
    /// is known and `interface_in_prompt` is set.
    pub fn prompt(&self) -> String {
        match self.interface.as_deref().map(str::trim) {
            Some(interface) if self.interface_in_prompt && !interface.is_empty() => {
                format!("{}\n{}", self.description.trim(), interface)
            }
            _ => self.description.trim().to_string(),
        }
    }

    /// Render the task as a commented Verilog file with the description,
    /// reference module and testbench in separate sections.
    pub fn to_verilog_listing(&self) -> String {
        let banner = |title: &str| format!("// {}  {} {}", "-".repeat(25), title, "-".repeat(25));
        let mut out = String::new();
        out.push('\n');
        out.push_str(&banner("Description"));
        out.push('\n');
        out.push_str(&self.description);
        out.push_str("\n\n");
        out.push_str(&banner("Referred Module"));
        out.push('\n');
        out.push_str(self.reference.as_deref().unwrap_or_default());
        out.push_str("\n\n");
        out.push_str(&banner("Testbench"));
        out.push('\n');
        out.push_str(self.testbench.as_deref().unwrap_or_default());
        out.push('\n');
        out
    }
}

fn default_interface_in_prompt() -> bool {
    true
}
