//! Parser configuration.

use crate::error::Severity;
use crate::location::DEFAULT_TAB_SIZE;

/// Options for the streaming pipeline.
///
/// ```
/// use astn_core::ParserOptions;
///
/// let options = ParserOptions::default().with_tab_size(8);
/// assert_eq!(options.tab_size, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParserOptions {
    /// Columns a tab advances in [`Location::column`](crate::Location).
    pub tab_size: usize,
    /// Used when building a [`Document`](crate::tree::Document).
    pub duplicate_keys: DuplicateKeyPolicy,
}

impl ParserOptions {
    #[must_use]
    pub fn with_tab_size(mut self, tab_size: usize) -> Self {
        self.tab_size = tab_size;
        self
    }

    #[must_use]
    pub fn with_duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_keys = policy;
        self
    }
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            tab_size: DEFAULT_TAB_SIZE,
            duplicate_keys: DuplicateKeyPolicy::default(),
        }
    }
}

/// What to do with a property whose key was already seen in the same object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DuplicateAction {
    /// Keep the first value.
    #[default]
    Ignore,
    /// Replace the earlier value.
    Overwrite,
}

/// How duplicate keys are reported, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DuplicateSeverity {
    #[default]
    Error,
    Warning,
    Silent,
}

impl DuplicateSeverity {
    /// The diagnostic severity to report with, or `None` when silent.
    pub fn severity(self) -> Option<Severity> {
        match self {
            Self::Error => Some(Severity::Error),
            Self::Warning => Some(Severity::Warning),
            Self::Silent => None,
        }
    }
}

/// Single policy surface for duplicate object keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DuplicateKeyPolicy {
    pub severity: DuplicateSeverity,
    pub action: DuplicateAction,
}

impl DuplicateKeyPolicy {
    pub fn new(severity: DuplicateSeverity, action: DuplicateAction) -> Self {
        Self { severity, action }
    }
}
