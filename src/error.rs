use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("failed to parse additional properties JSON\n {0}")]
    OverlayParse(serde_json::Error),
    #[error("additional properties must be a JSON object, found {0}")]
    OverlayNotObject(&'static str),
    #[error("failed to serialize payload JSON\n {0}")]
    Serialize(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PayloadError>;
