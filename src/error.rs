use std::fmt;

/// Failure to read a colour from the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    /// The point is not covered by any display.
    OutOfBounds { x: i32, y: i32 },
    /// The platform refused or failed the capture.
    CaptureFault(String),
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { x, y } => write!(f, "point ({x}, {y}) is outside every display"),
            Self::CaptureFault(message) => write!(f, "screen capture failed: {message}"),
        }
    }
}

impl std::error::Error for SampleError {}

/// Persistence layer error, reported per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFault {
    pub operation: &'static str,
    pub message: String,
}

impl StoreFault {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }

    pub fn from_sql(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |err| Self::new(operation, err.to_string())
    }
}

impl fmt::Display for StoreFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "colour store {} failed: {}", self.operation, self.message)
    }
}

impl std::error::Error for StoreFault {}

/// The OS denied the global keyboard hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookRegistrationFault(pub String);

impl fmt::Display for HookRegistrationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "global keyboard hook registration failed: {}", self.0)
    }
}

impl std::error::Error for HookRegistrationFault {}
