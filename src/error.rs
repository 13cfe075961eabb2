use thiserror::Error;

pub type PlotResult<T> = Result<T, PlotError>;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("selection version must be even, got {version}")]
    VersionParity { version: u64 },

    #[error("pending {kind} buffer is full (limit {limit})")]
    PendingLimit { kind: &'static str, limit: usize },

    #[error("unknown canvas id `{0}`")]
    UnknownCanvas(String),

    #[error("renderer failure: {0}")]
    Renderer(String),
}
