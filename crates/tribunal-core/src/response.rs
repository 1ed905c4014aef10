use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::callback::CaseData;

/// Result of running handlers for one callback phase.
///
/// Errors block the event in the case platform; warnings require the
/// caseworker to confirm unless the callback set `ignore_warnings`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub data: CaseData,
    #[serde(default)]
    pub errors: BTreeSet<String>,
    #[serde(default)]
    pub warnings: BTreeSet<String>,
}

impl CallbackResponse {
    pub fn new(data: CaseData) -> Self {
        Self {
            data,
            errors: BTreeSet::new(),
            warnings: BTreeSet::new(),
        }
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.insert(error.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.insert(warning.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether the caseworker must confirm before the event commits.
    pub fn requires_confirmation(&self, ignore_warnings: bool) -> bool {
        !ignore_warnings && !self.warnings.is_empty()
    }

    /// Fold a later handler's response into this one.
    ///
    /// The later data replaces ours. Messages accumulate.
    pub fn merge(&mut self, later: CallbackResponse) {
        self.data = later.data;
        self.errors.extend(later.errors);
        self.warnings.extend(later.warnings);
    }
}
