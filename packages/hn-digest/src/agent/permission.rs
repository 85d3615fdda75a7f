//! Filesystem confinement for agent-requested actions.
//!
//! Every action an agent session wants to perform is described as a
//! [`PermissionRequest`] and evaluated by a [`PermissionGate`] before it
//! runs. The gate only defends confinement: any path-like argument must
//! resolve inside the sandbox, otherwise the whole action is denied. The
//! action kind itself is not filtered.

use serde_json::Value;
use tracing::{debug, warn};

use crate::vault::SandboxRoot;

/// Argument values the gate ignores (an empty list rendered as text).
const EMPTY_LIST: &str = "[]";

/// One named argument of a requested action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionArgument {
    /// A filesystem path that must stay inside the sandbox
    Path { name: String, value: String },

    /// Anything else
    Value { name: String, value: String },
}

impl PermissionArgument {
    pub fn name(&self) -> &str {
        match self {
            Self::Path { name, .. } | Self::Value { name, .. } => name,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Path { value, .. } | Self::Value { value, .. } => value,
        }
    }
}

/// An action an agent asked to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequest {
    /// Action kind as named by the transport (`read`, `write`, `shell`, ...)
    pub kind: String,
    pub arguments: Vec<PermissionArgument>,
}

impl PermissionRequest {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            arguments: Vec::new(),
        }
    }

    /// Add an argument the transport marked as a path.
    pub fn with_path(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.push(PermissionArgument::Path {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a non-path argument.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.push(PermissionArgument::Value {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Build a request from an untyped argument bag.
    ///
    /// For transports that cannot mark path fields: any key containing
    /// `path` or `file` (case-insensitive) is treated as a path. Arrays of
    /// strings under such keys become one path argument per element; other
    /// non-string values are kept as their JSON text.
    pub fn from_untyped<'a>(
        kind: impl Into<String>,
        bag: impl IntoIterator<Item = (&'a String, &'a Value)>,
    ) -> Self {
        let mut request = Self::new(kind);

        for (name, value) in bag {
            let path_like = is_path_like_key(name);
            match value {
                Value::String(text) if path_like => {
                    request = request.with_path(name.as_str(), text.as_str());
                }
                Value::Array(items)
                    if path_like && items.iter().all(|item| item.is_string()) =>
                {
                    for item in items.iter().filter_map(Value::as_str) {
                        request = request.with_path(name.as_str(), item);
                    }
                }
                Value::String(text) => {
                    request = request.with_value(name.as_str(), text.as_str());
                }
                Value::Null => {}
                other if path_like => {
                    request = request.with_path(name.as_str(), other.to_string());
                }
                other => {
                    request = request.with_value(name.as_str(), other.to_string());
                }
            }
        }

        request
    }

    /// Arguments the gate has to check.
    pub fn paths(&self) -> impl Iterator<Item = (&str, &str)> {
        self.arguments.iter().filter_map(|argument| match argument {
            PermissionArgument::Path { name, value } => Some((name.as_str(), value.as_str())),
            PermissionArgument::Value { .. } => None,
        })
    }
}

/// Whether an argument name looks like it carries a path.
pub fn is_path_like_key(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.contains("path") || name.contains("file")
}

/// Outcome of evaluating a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    Approved,
    Denied { reason: String },
}

impl PermissionDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Approves an action only if every path argument stays inside the sandbox.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    sandbox: SandboxRoot,
}

impl PermissionGate {
    pub fn new(sandbox: SandboxRoot) -> Self {
        Self { sandbox }
    }

    /// The sandbox this gate confines to.
    pub fn sandbox(&self) -> &SandboxRoot {
        &self.sandbox
    }

    /// Evaluate a request.
    ///
    /// Empty values and `[]` are skipped. Relative paths resolve against
    /// the sandbox root, absolute ones are checked as they are. The first
    /// path that fails to resolve denies the whole request.
    pub fn evaluate(&self, request: &PermissionRequest) -> PermissionDecision {
        for (name, value) in request.paths() {
            let value = value.trim();
            if value.is_empty() || value == EMPTY_LIST {
                continue;
            }

            if let Err(e) = self.sandbox.resolve(value) {
                warn!(
                    kind = %request.kind,
                    argument = %name,
                    path = %value,
                    error = %e,
                    "Denied agent action: path outside sandbox"
                );
                return PermissionDecision::Denied {
                    reason: format!("argument '{}': {}", name, e),
                };
            }
        }

        debug!(kind = %request.kind, "Approved agent action");
        PermissionDecision::Approved
    }
}
