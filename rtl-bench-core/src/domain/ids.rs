use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies one benchmark run (generation or evaluation) in logs and score files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RunId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Index of a repetition, rendered as the `test_<n>` directory name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RepetitionIndex(pub usize);

impl RepetitionIndex {
    pub const DIR_PREFIX: &'static str = "test_";

    pub fn dir_name(&self) -> String {
        format!("{}{}", Self::DIR_PREFIX, self.0)
    }
}

impl fmt::Display for RepetitionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}
