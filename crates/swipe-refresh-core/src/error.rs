use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    NonPositiveSlingshot { value: f32 },
    NegativeThreshold { value: f32 },
    NonFinite { field: &'static str },
    DampingExponentOutOfRange { value: f32 },
    InvalidAttribute { name: String, value: String },
    UnknownAttribute { name: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::NonPositiveSlingshot { value } => {
                write!(f, "slingshot distance must be positive, got {value}")
            }
            SettingsError::NegativeThreshold { value } => {
                write!(f, "threshold must not be negative, got {value}")
            }
            SettingsError::NonFinite { field } => write!(f, "{field} must be finite"),
            SettingsError::DampingExponentOutOfRange { value } => {
                write!(f, "damping exponent must lie in (0, 1), got {value}")
            }
            SettingsError::InvalidAttribute { name, value } => {
                write!(f, "invalid value {value:?} for attribute {name}")
            }
            SettingsError::UnknownAttribute { name } => write!(f, "unknown attribute {name}"),
        }
    }
}

impl std::error::Error for SettingsError {}

/// Failure reported by a refresh action. The coordinator only logs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshError {
    message: String,
}

impl RefreshError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "refresh failed: {}", self.message)
    }
}

impl std::error::Error for RefreshError {}

impl From<String> for RefreshError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for RefreshError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Problems the coordinator swallows and hands to [`Diagnostics`](crate::Diagnostics).
#[derive(Debug, Clone, PartialEq)]
pub enum GestureFailure {
    MissingTouchPoint { kind: crate::TouchEventKind },
    NonFiniteCoordinate { value: f32 },
    MissingStartCoordinate,
    RefreshRejected(RefreshError),
    RuntimeUnavailable,
}

impl fmt::Display for GestureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GestureFailure::MissingTouchPoint { kind } => {
                write!(f, "{} carried no touch point", kind.event_type())
            }
            GestureFailure::NonFiniteCoordinate { value } => {
                write!(f, "touch coordinate {value} is not finite")
            }
            GestureFailure::MissingStartCoordinate => {
                write!(f, "drag has no recorded start coordinate")
            }
            GestureFailure::RefreshRejected(err) => err.fmt(f),
            GestureFailure::RuntimeUnavailable => {
                write!(f, "runtime shut down before the refresh could be scheduled")
            }
        }
    }
}

impl std::error::Error for GestureFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GestureFailure::RefreshRejected(err) => Some(err),
            _ => None,
        }
    }
}
