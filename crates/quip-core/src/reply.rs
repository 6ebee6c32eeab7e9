use serde::{Deserialize, Serialize};

/// What a script hands back from a handler: one line or an ordered batch.
/// The supervisor sends batch replies in order, one message per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    One(String),
    Many(Vec<String>),
}

impl Reply {
    /// Flatten into the lines to transmit, preserving order.
    pub fn into_lines(self) -> Vec<String> {
        match self {
            Reply::One(line) => vec![line],
            Reply::Many(lines) => lines,
        }
    }

    /// True when there is nothing worth sending.
    pub fn is_empty(&self) -> bool {
        match self {
            Reply::One(line) => line.is_empty(),
            Reply::Many(lines) => lines.iter().all(|l| l.is_empty()),
        }
    }
}

impl From<String> for Reply {
    fn from(line: String) -> Self {
        Reply::One(line)
    }
}

impl From<&str> for Reply {
    fn from(line: &str) -> Self {
        Reply::One(line.to_string())
    }
}

impl From<Vec<String>> for Reply {
    fn from(lines: Vec<String>) -> Self {
        Reply::Many(lines)
    }
}
