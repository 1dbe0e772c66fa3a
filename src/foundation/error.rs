/// Crate-wide result alias.
pub type VersecastResult<T> = Result<T, VersecastError>;

/// Error taxonomy shared by every subsystem.
///
/// Malformed input text is never an error (the timeline builder degrades to an empty timeline),
/// and a second concurrent export is rejected by a guard rather than an error.
#[derive(thiserror::Error, Debug)]
pub enum VersecastError {
    /// Invalid caller-supplied value (configuration, frame geometry, paths).
    #[error("validation error: {0}")]
    Validation(String),

    /// A drawing operation could not be carried out (missing font, undecodable image).
    #[error("render error: {0}")]
    Render(String),

    /// A narration provider failed (missing credential, remote failure, malformed response).
    #[error("provider error: {0}")]
    Provider(String),

    /// Capture or finalize failure in the export pipeline.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Operation not valid in the current playback/recording state.
    #[error("state error: {0}")]
    State(String),

    /// Context-wrapped lower level failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VersecastError {
    /// Build a [`VersecastError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`VersecastError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`VersecastError::Provider`].
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Build a [`VersecastError::Encoding`].
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`VersecastError::State`].
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
