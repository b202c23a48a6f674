use thiserror::Error;

/// Everything that can go wrong between a button press and a rendered answer.
///
/// Only `Configuration` is fatal; every other variant is reported inside the
/// feature that produced it and waits for the user to try again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StudyError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Extraction(String),

    #[error("no readable text found in the uploaded PDF")]
    NoReadableText,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Generation(String),
}
