use thiserror::Error;
#[derive(Debug, Error)]
pub enum InstrumentError {
    #[error("failed to open instrument resource {resource}: {reason}")]
    Open { resource: String, reason: String },
    #[error("instrument {0} did not answer the identification query")]
    Identification(String),
    #[error("instrument reply is not a number: {0:?}")]
    Parse(String),
    #[error("instrument I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("VISA library unavailable: {0}")]
    Library(String),
    #[error("{operation} failed (VISA status {status:#x})")]
    Visa { operation: &'static str, status: i32 },
    #[error("unsupported resource string: {0}")]
    UnsupportedResource(String),
}
impl From<serialport::Error> for InstrumentError {
    fn from(value: serialport::Error) -> Self {
        InstrumentError::Io(value.into())
    }
}
