//! Error taxonomy for the controller core.
//!
//! None of these are fatal: every path that produces one returns the view to
//! an idle, interactive state.

use thiserror::Error;

/// Failure fetching or parsing the model catalog (`GET /models`).
#[derive(Debug, Error)]
pub enum CatalogFetchError {
    /// The server answered with a non-success status.
    #[error("model catalog request failed with status {0}")]
    Status(u16),
    /// The request never produced a response.
    #[error("model catalog request failed")]
    Transport(#[source] ureq::Error),
    /// The response body was not a JSON array of strings.
    #[error("model catalog response was malformed")]
    Malformed(#[source] serde_json::Error),
    /// The fetch task could not be started.
    #[error("model catalog task could not be started")]
    Spawn(#[source] std::io::Error),
}

/// Rejection of a submit before any request is issued.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The prompt was empty or whitespace only.
    #[error("Please enter a prompt.")]
    EmptyPrompt,
    /// No model toggle was checked.
    #[error("Please select at least one model.")]
    NoModelsSelected,
}

/// Why a `generate` action was not started.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum GenerateError {
    /// Preconditions on prompt or selection failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A render cycle is already in flight.
    #[error("A response is already being generated. Please wait for it to finish.")]
    Busy,
}

/// Failure of the single outbound `POST /moa` call.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The server answered with a non-success status.
    #[error("generate request failed with status {0}")]
    Status(u16),
    /// The request never produced a response.
    #[error("generate request failed")]
    Transport(#[source] ureq::Error),
    /// The response body did not match the expected shape.
    #[error("generate response was malformed")]
    Malformed(#[source] serde_json::Error),
    /// The request task could not be started.
    #[error("generate task could not be started")]
    Spawn(#[source] std::io::Error),
}

/// Failure of the math typesetting pass. Logged only.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TypesetError {
    /// A `{` without a matching `}` (or the reverse) inside a math span.
    #[error("unbalanced braces in math at byte {offset}")]
    UnbalancedBraces {
        /// Byte offset of the offending brace within the math source.
        offset: usize,
    },
    /// A `\(` or `\[` opener with no closer.
    #[error("math delimiter opened at byte {offset} is never closed")]
    UnclosedDelimiter {
        /// Byte offset of the opener within the markup.
        offset: usize,
    },
    /// Groups or scripts nested deeper than the typesetter follows.
    #[error("math nested too deeply at byte {offset}")]
    TooDeep {
        /// Byte offset within the math source where the limit was hit.
        offset: usize,
    },
    /// The typesetting task could not be started.
    #[error("typesetting task could not be started")]
    Unscheduled,
}
