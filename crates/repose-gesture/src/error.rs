use thiserror::Error;

use crate::RecognizerKey;

/// Configuration and set-management errors.
///
/// Recognition failures are never reported here; they resolve to
/// [`State::Failed`](crate::State::Failed).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GestureError {
    #[error("{field} must be at least {min}, got {value}")]
    TooSmall {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{min_field} ({min}) exceeds {max_field} ({max})")]
    InvertedRange {
        min_field: &'static str,
        min: f64,
        max_field: &'static str,
        max: f64,
    },
    #[error("{0} needs at least one flag set")]
    EmptyMask(&'static str),
    #[error("recognizer {0:?} is not a member of this set")]
    UnknownRecognizer(RecognizerKey),
    #[error("requiring failure of {dependency:?} from {dependent:?} would create a dependency cycle")]
    DependencyCycle {
        dependent: RecognizerKey,
        dependency: RecognizerKey,
    },
}

pub type Result<T, E = GestureError> = std::result::Result<T, E>;

pub(crate) fn at_least(field: &'static str, value: f64, min: f64) -> Result<()> {
    if value < min || value.is_nan() {
        Err(GestureError::TooSmall { field, min, value })
    } else {
        Ok(())
    }
}

pub(crate) fn ordered(
    min_field: &'static str,
    min: f64,
    max_field: &'static str,
    max: f64,
) -> Result<()> {
    if min > max {
        Err(GestureError::InvertedRange {
            min_field,
            min,
            max_field,
            max,
        })
    } else {
        Ok(())
    }
}
