//! Diagnostics sink for advisory findings.
//!
//! Components receive a [`SharedDiagnostics`] at construction and report
//! [`Finding`]s to it instead of writing to a global logger. The default sink,
//! [`LogDiagnostics`], forwards to the `log` facade; [`MemoryDiagnostics`] keeps
//! the most recent findings so a front end (or a test) can inspect them.

use chrono::{DateTime, Local};
use log::Level;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

pub const DEFAULT_CAPACITY: usize = 1000;

/// Something worth telling the user that does not stop the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// A configuration name does not end with the `<kind>.xml` suffix.
    NamingConvention { name: String, expected_suffix: String },
    /// An attribute outside the owner's known-property list was accessed.
    UnknownAttribute { owner: String, attribute: String },
    /// The engine has no accessor for the attribute; the call fails.
    UnsupportedAttribute { owner: String, attribute: String },
    /// A creation parameter was not recognized and was skipped.
    IgnoredParameter { owner: String, key: String },
    /// A property lookup by name found nothing.
    PropertyNotFound { owner: String, property: String },
    DuplicateBranch { name: String, id: String },
    ReplacingRoot { previous: String },
    AmbiguousBranch { name: String, id: String, count: usize },
    BranchNotFound { name: String, id: String },
    /// A superclass named by a class is not defined in the loaded schema.
    MissingSuperclass { class_name: String, superclass: String },
    PartialCloseUnsupported,
    UnknownCloseTarget { target: String },
    Note { level: Level, message: String },
}

impl Finding {
    pub fn note(level: Level, message: impl Into<String>) -> Self {
        Self::Note {
            level,
            message: message.into(),
        }
    }

    pub fn level(&self) -> Level {
        match self {
            Finding::UnsupportedAttribute { .. } => Level::Error,
            Finding::NamingConvention { .. }
            | Finding::UnknownAttribute { .. }
            | Finding::IgnoredParameter { .. }
            | Finding::DuplicateBranch { .. }
            | Finding::ReplacingRoot { .. }
            | Finding::AmbiguousBranch { .. }
            | Finding::MissingSuperclass { .. }
            | Finding::PartialCloseUnsupported
            | Finding::UnknownCloseTarget { .. } => Level::Warn,
            Finding::PropertyNotFound { .. } | Finding::BranchNotFound { .. } => Level::Debug,
            Finding::Note { level, .. } => *level,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::NamingConvention {
                name,
                expected_suffix,
            } => write!(
                f,
                "Configuration name '{}' must end with '{}'",
                name, expected_suffix
            ),
            Finding::UnknownAttribute { owner, attribute } => {
                write!(f, "Attribute '{}' is not a known property of {}", attribute, owner)
            }
            Finding::UnsupportedAttribute { owner, attribute } => {
                write!(f, "Attribute '{}' does not exist in {}", attribute, owner)
            }
            Finding::IgnoredParameter { owner, key } => {
                write!(f, "Parameter '{}' is not used when creating {}", key, owner)
            }
            Finding::PropertyNotFound { owner, property } => {
                write!(f, "Property '{}' does not exist in {}", property, owner)
            }
            Finding::DuplicateBranch { name, id } => write!(
                f,
                "Branch with name '{}' and ID '{}' already exists",
                name, id
            ),
            Finding::ReplacingRoot { previous } => write!(
                f,
                "Replacing root branch '{}'; the tree is reset",
                previous
            ),
            Finding::AmbiguousBranch { name, id, count } => write!(
                f,
                "{} branches found with name '{}' and ID '{}', returning the first",
                count, name, id
            ),
            Finding::BranchNotFound { name, id } => {
                write!(f, "Branch with name '{}' and ID '{}' not found", name, id)
            }
            Finding::MissingSuperclass {
                class_name,
                superclass,
            } => write!(
                f,
                "Superclass '{}' of '{}' is not defined",
                superclass, class_name
            ),
            Finding::PartialCloseUnsupported => {
                write!(f, "Partial close is not supported, closing everything")
            }
            Finding::UnknownCloseTarget { target } => {
                write!(f, "'{}' is not loaded, nothing to close", target)
            }
            Finding::Note { message, .. } => f.write_str(message),
        }
    }
}

/// Receiver of advisory findings.
pub trait Diagnostics {
    fn report(&self, finding: Finding);
}

pub type SharedDiagnostics = Rc<dyn Diagnostics>;

/// Forwards findings to the `log` facade.
#[derive(Debug, Clone)]
pub struct LogDiagnostics {
    target: &'static str,
}

impl Default for LogDiagnostics {
    fn default() -> Self {
        Self {
            target: "daq_config",
        }
    }
}

impl Diagnostics for LogDiagnostics {
    fn report(&self, finding: Finding) {
        log::log!(target: self.target, finding.level(), "{}", finding);
    }
}

pub fn log_diagnostics() -> SharedDiagnostics {
    Rc::new(LogDiagnostics::default())
}

/// A recorded finding.
#[derive(Debug, Clone)]
pub struct DiagnosticEntry {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub finding: Finding,
}

/// Keeps the most recent findings in a bounded buffer.
#[derive(Debug)]
pub struct MemoryDiagnostics {
    entries: RefCell<VecDeque<DiagnosticEntry>>,
    capacity: usize,
}

impl Default for MemoryDiagnostics {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MemoryDiagnostics {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RefCell::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity: capacity.max(1),
        }
    }

    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        self.entries.borrow().iter().cloned().collect()
    }

    pub fn findings(&self) -> Vec<Finding> {
        self.entries
            .borrow()
            .iter()
            .map(|entry| entry.finding.clone())
            .collect()
    }

    /// Findings at `Warn` level or more severe.
    pub fn warnings(&self) -> Vec<Finding> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.level <= Level::Warn)
            .map(|entry| entry.finding.clone())
            .collect()
    }

    pub fn contains(&self, predicate: impl Fn(&Finding) -> bool) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|entry| predicate(&entry.finding))
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn report(&self, finding: Finding) {
        let mut entries = self.entries.borrow_mut();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(DiagnosticEntry {
            timestamp: Local::now(),
            level: finding.level(),
            finding,
        });
    }
}
