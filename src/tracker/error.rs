use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackerErrorCode {
    Config,
    MalformedUrl,
    Transport,
    InvalidArgument,
    Internal,
}

impl TrackerErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerErrorCode::Config => "tracker/config",
            TrackerErrorCode::MalformedUrl => "tracker/malformed-url",
            TrackerErrorCode::Transport => "tracker/transport",
            TrackerErrorCode::InvalidArgument => "tracker/invalid-argument",
            TrackerErrorCode::Internal => "tracker/internal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrackerError {
    pub code: TrackerErrorCode,
    message: String,
}

impl TrackerError {
    pub fn new(code: TrackerErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for TrackerError {}

pub type TrackerResult<T> = Result<T, TrackerError>;

pub fn config_error(message: impl Into<String>) -> TrackerError {
    TrackerError::new(TrackerErrorCode::Config, message)
}

pub fn malformed_url(message: impl Into<String>) -> TrackerError {
    TrackerError::new(TrackerErrorCode::MalformedUrl, message)
}

pub fn transport_error(message: impl Into<String>) -> TrackerError {
    TrackerError::new(TrackerErrorCode::Transport, message)
}

pub fn invalid_argument(message: impl Into<String>) -> TrackerError {
    TrackerError::new(TrackerErrorCode::InvalidArgument, message)
}

pub fn internal_error(message: impl Into<String>) -> TrackerError {
    TrackerError::new(TrackerErrorCode::Internal, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code() {
        let err = malformed_url("unable to parse url `nope`");
        assert_eq!(err.to_string(), "unable to parse url `nope` (tracker/malformed-url)");
        assert_eq!(err.code, TrackerErrorCode::MalformedUrl);
    }
}
