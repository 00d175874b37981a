use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Outcome code of an execution.
///
/// The numeric values are the remote judge's status ids and are kept verbatim,
/// so a result from the local sandbox and one from the judge can be handled by
/// the same code. Ids the judge reports that have no dedicated variant
/// (wrong answer, signals, internal error, ...) are carried through as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    NotStarted,
    Accepted,
    CompileError,
    RuntimeError,
    Other(u32),
}

impl Status {
    pub fn id(self) -> u32 {
        match self {
            Status::NotStarted => 0,
            Status::Accepted => 3,
            Status::CompileError => 6,
            Status::RuntimeError => 11,
            Status::Other(id) => id,
        }
    }

    pub fn from_id(id: u32) -> Self {
        match id {
            0 => Status::NotStarted,
            3 => Status::Accepted,
            6 => Status::CompileError,
            11 => Status::RuntimeError,
            other => Status::Other(other),
        }
    }

    /// Whether the run needs the user's attention (error panel, analysis).
    pub fn needs_attention(self) -> bool {
        !matches!(self, Status::Accepted | Status::NotStarted)
    }
}

impl From<u32> for Status {
    fn from(id: u32) -> Self {
        Status::from_id(id)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NotStarted => write!(f, "not_started"),
            Status::Accepted => write!(f, "accepted"),
            Status::CompileError => write!(f, "compile_error"),
            Status::RuntimeError => write!(f, "runtime_error"),
            Status::Other(id) => write!(f, "status_{}", id),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.id())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Status::from_id)
    }
}

/// The untranslated error behind a failed sandbox run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Exception class, e.g. `NameError`
    pub name: String,
    pub message: String,
    /// Line of the user's program the error points at
    #[serde(default)]
    pub line: Option<u32>,
}

impl Diagnostic {
    pub fn new(name: impl Into<String>, message: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            line,
        }
    }

    /// The error as the interpreter would print it: `Name: message`
    pub fn error_line(&self) -> String {
        if self.message.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.message)
        }
    }
}

/// Result of running a piece of code, whatever the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: Status,
    pub output: String,
    /// Only set by the local sandbox, whose `output` is already translated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
}

impl ExecutionResult {
    pub fn new(status: Status, output: impl Into<String>) -> Self {
        Self {
            status,
            output: output.into(),
            diagnostic: None,
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostic = Some(diagnostic);
        self
    }

    pub fn is_accepted(&self) -> bool {
        self.status == Status::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_ids_are_preserved() {
        assert_eq!(Status::NotStarted.id(), 0);
        assert_eq!(Status::Accepted.id(), 3);
        assert_eq!(Status::CompileError.id(), 6);
        assert_eq!(Status::RuntimeError.id(), 11);
        assert_eq!(Status::from_id(4), Status::Other(4));
        assert_eq!(Status::from_id(4).id(), 4);
    }

    #[test]
    fn test_needs_attention() {
        assert!(!Status::Accepted.needs_attention());
        assert!(!Status::NotStarted.needs_attention());
        assert!(Status::CompileError.needs_attention());
        assert!(Status::Other(5).needs_attention());
    }

    #[test]
    fn test_status_serializes_as_number() {
        let result = ExecutionResult::new(Status::RuntimeError, "boom");
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"status":11,"output":"boom"}"#);

        let back: ExecutionResult = serde_json::from_str(r#"{"status":13,"output":""}"#).unwrap();
        assert_eq!(back.status, Status::Other(13));
        assert_eq!(back.diagnostic, None);
    }

    #[test]
    fn test_diagnostic_error_line() {
        let diagnostic = Diagnostic::new("EOFError", "EOF when reading a line", Some(2));
        assert_eq!(diagnostic.error_line(), "EOFError: EOF when reading a line");
        assert_eq!(Diagnostic::new("KeyboardInterrupt", "", None).error_line(), "KeyboardInterrupt");

        let result = ExecutionResult::new(Status::RuntimeError, "运行错误").with_diagnostic(diagnostic);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["diagnostic"]["line"], 2);
    }
}
