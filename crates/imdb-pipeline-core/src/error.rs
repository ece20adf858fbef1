//! Record-level error types.
//!
//! These never abort a batch: the cleaner catches them and routes the
//! offending record into the [`CleanReport`](crate::clean::CleanReport).

use serde::Serialize;
use thiserror::Error;

use crate::models::FieldKind;

/// A raw field could not be turned into its typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("malformed {kind} field {text:?}: {reason}")]
pub struct MalformedFieldError {
    pub kind: FieldKind,
    pub text: String,
    pub reason: String,
}

impl MalformedFieldError {
    pub fn new(kind: FieldKind, text: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

/// A record shares its (title, year) key with a record kept earlier.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("duplicate of row {kept_row} ({title} {year})")]
pub struct DuplicateRecordError {
    pub title: String,
    pub year: u16,
    /// Row number of the record that was kept.
    pub kept_row: usize,
}

/// Why a raw record did not make it into the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RejectReason {
    #[error(transparent)]
    MalformedField(MalformedFieldError),
    #[error(transparent)]
    Duplicate(DuplicateRecordError),
}

impl From<MalformedFieldError> for RejectReason {
    fn from(e: MalformedFieldError) -> Self {
        RejectReason::MalformedField(e)
    }
}

impl From<DuplicateRecordError> for RejectReason {
    fn from(e: DuplicateRecordError) -> Self {
        RejectReason::Duplicate(e)
    }
}
