/// Result type used across the wall and export APIs.
pub type WallResult<T> = Result<T, WallError>;

/// Error taxonomy for wall configuration and export.
#[derive(thiserror::Error, Debug)]
pub enum WallError {
    /// Invalid wall configuration or export style.
    #[error("config error: {0}")]
    Config(String),

    /// Export requested while no photo is tracked.
    #[error("no photos to export")]
    EmptyExport,

    /// An image reference could not be resolved or fetched.
    #[error("image source error: {0}")]
    Source(String),

    /// Rasterizing the composite failed.
    #[error("render error: {0}")]
    Render(String),

    /// Encoding the composite to PNG or JPEG failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// A live event could not be parsed.
    #[error("event error: {0}")]
    Event(String),

    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WallError {
    /// Build a [`WallError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`WallError::Source`] value.
    pub fn image_source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Build a [`WallError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`WallError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`WallError::Event`] value.
    pub fn event(msg: impl Into<String>) -> Self {
        Self::Event(msg.into())
    }
}
