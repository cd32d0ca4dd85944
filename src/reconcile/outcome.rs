//! Reconciliation outcome and its delivery to the caller

use crate::error::{ConvergeError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Action decided for one reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Nothing to do
    None,
    /// Bring up a new interface and write its file
    Create,
    /// Re-apply and overwrite an existing or drifted interface
    Update,
    /// Tear the interface down and remove its file
    Delete,
}

impl Action {
    /// Whether performing this action changes the host
    pub fn changes(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Result of one reconciliation, as reported to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Whether the host changed (or would change, on a dry run)
    pub changed: bool,
    /// Whether the reconciliation failed
    pub failed: bool,
    /// Action taken or planned
    pub action: Action,
    /// Whether this was a dry run
    #[serde(default)]
    pub dry_run: bool,
    /// Human-readable summary
    pub message: String,
    /// Interface public key, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Error message on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error category on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Live state changed but the configuration file does not reflect it
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

impl Outcome {
    /// Successful outcome for `action`
    pub fn success(action: Action, message: impl Into<String>, public_key: Option<String>) -> Self {
        Self {
            changed: action.changes(),
            failed: false,
            action,
            dry_run: false,
            message: message.into(),
            public_key,
            error: None,
            error_kind: None,
            partial: false,
        }
    }

    /// Failed outcome; nothing changed unless the error is partial
    pub fn failure(action: Action, err: &ConvergeError) -> Self {
        let partial = err.is_partial();
        Self {
            changed: partial,
            failed: true,
            action,
            dry_run: false,
            message: if partial {
                format!(
                    "{} succeeded on the live interface but the configuration file was not updated",
                    action
                )
            } else if action == Action::None {
                "Reconciliation failed".to_string()
            } else {
                format!("{} failed", action)
            },
            public_key: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
            partial,
        }
    }

    /// Attach the interface public key
    pub fn with_public_key(mut self, public_key: Option<String>) -> Self {
        self.public_key = public_key;
        self
    }

    /// Mark the outcome as coming from a dry run
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Process exit code: 0 ok, 1 failed, 2 partially applied
    pub fn exit_code(&self) -> i32 {
        if self.partial {
            2
        } else if self.failed {
            1
        } else {
            0
        }
    }

    /// Serialize to a single JSON line
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            ConvergeError::Serialization(format!("Failed to serialize outcome: {}", e))
        })
    }
}

/// Delivers an outcome to the caller
pub trait OutcomeReporter {
    /// Report one outcome
    fn report(&mut self, outcome: &Outcome) -> Result<()>;
}

/// Writes each outcome as one JSON line
pub struct JsonReporter<W: Write> {
    writer: W,
}

impl<W: Write> JsonReporter<W> {
    /// Create a reporter over `writer`
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonReporter<std::io::Stdout> {
    /// Reporter on standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> OutcomeReporter for JsonReporter<W> {
    fn report(&mut self, outcome: &Outcome) -> Result<()> {
        let line = outcome.to_json()?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }
}
