use core::fmt;

/// Minimal error set for core-domain validation & parsing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CoreError {
    InvalidId,
    InvalidToken,
    InvalidEmail,
    WeightOutOfRange,
    RatingOutOfRange,
    ThresholdTooLong,
    RoleLocked,
    DomainOutOfRange(&'static str),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidId => write!(f, "invalid id"),
            CoreError::InvalidToken => write!(f, "invalid access token"),
            CoreError::InvalidEmail => write!(f, "invalid email"),
            CoreError::WeightOutOfRange => write!(f, "weight out of range 0..=100"),
            CoreError::RatingOutOfRange => write!(f, "rating out of range"),
            CoreError::ThresholdTooLong => write!(f, "threshold too long"),
            CoreError::RoleLocked => write!(f, "role already set"),
            CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
        }
    }
}

impl std::error::Error for CoreError {}
