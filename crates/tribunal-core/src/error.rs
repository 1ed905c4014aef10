use thiserror::Error;

use crate::callback::{EventType, Phase};

/// Errors raised while building or reading the callback model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid date-time: {0}")]
    InvalidDateTime(String),

    #[error("Invalid callback payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Downstream integration failures that cannot succeed on retry.
///
/// The set is closed: a message failing with one of these is removed from
/// the queue after a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerminalFailure {
    #[error("Issuing further evidence failed: {0}")]
    IssueFurtherEvidence(String),

    #[error("Post issue further evidence tasks failed: {0}")]
    PostIssueFurtherEvidenceTasks(String),

    #[error("No MRN details: {0}")]
    NoMrnDetails(String),

    #[error("DWP office lookup failed: {0}")]
    DwpAddressLookup(String),

    #[error("PDF store unavailable: {0}")]
    PdfStore(String),

    #[error("Unable to contact third party: {0}")]
    UnableToContactThirdParty(String),

    #[error("Bulk print failed: {0}")]
    BulkPrint(String),

    #[error("Non PDF document sent to bulk print: {0}")]
    NonPdfBulkPrint(String),

    #[error("Client authorisation failed: {0}")]
    ClientAuthorisation(String),
}

impl TerminalFailure {
    /// Short identifier for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IssueFurtherEvidence(_) => "issue_further_evidence",
            Self::PostIssueFurtherEvidenceTasks(_) => "post_issue_further_evidence_tasks",
            Self::NoMrnDetails(_) => "no_mrn_details",
            Self::DwpAddressLookup(_) => "dwp_address_lookup",
            Self::PdfStore(_) => "pdf_store",
            Self::UnableToContactThirdParty(_) => "unable_to_contact_third_party",
            Self::BulkPrint(_) => "bulk_print",
            Self::NonPdfBulkPrint(_) => "non_pdf_bulk_print",
            Self::ClientAuthorisation(_) => "client_authorisation",
        }
    }
}

/// Error returned by a callback handler.
///
/// Business rejections are not errors: handlers report them as data in
/// the [`CallbackResponse`](crate::response::CallbackResponse).
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Terminal(#[from] TerminalFailure),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Handler panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

/// Error returned by the callback dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Missing or ambiguous handler registration. This is a deployment
    /// defect and is never retried.
    #[error("Configuration fault for {phase}/{event}: {message}")]
    Configuration {
        phase: Phase,
        event: EventType,
        message: String,
    },

    #[error("Handler '{handler}' failed: {source}")]
    Handler {
        handler: String,
        #[source]
        source: HandlerError,
    },

    #[error("Handler '{handler}' exceeded its deadline of {timeout_ms}ms")]
    Timeout { handler: String, timeout_ms: u64 },
}

impl DispatchError {
    pub fn configuration(phase: Phase, event: EventType, message: impl Into<String>) -> Self {
        Self::Configuration {
            phase,
            event,
            message: message.into(),
        }
    }

    pub fn is_configuration_fault(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Handler { source, .. } if source.is_terminal())
    }

    /// Classify for the retry policy of the queue consumer.
    pub fn class(&self) -> FailureClass {
        if self.is_configuration_fault() {
            FailureClass::Configuration
        } else if self.is_terminal() {
            FailureClass::Terminal
        } else {
            FailureClass::Transient
        }
    }
}

/// Failure classes used by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Configuration,
    Terminal,
    Transient,
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Terminal => write!(f, "terminal"),
            Self::Transient => write!(f, "transient"),
        }
    }
}
