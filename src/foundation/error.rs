/// Convenience result type used across badgekit.
pub type BadgeResult<T> = Result<T, BadgeError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum BadgeError {
    /// Malformed or inconsistent template/data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A background or layer bitmap could not be fetched or decoded.
    #[error("image load error: {0}")]
    ImageLoad(String),

    /// A shared-link payload could not be decoded into a template.
    #[error("link decode error: {0}")]
    LinkDecode(String),

    /// Raster backend or export encoder failure.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Key-value or object store collaborator failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// No template could be loaded from any source.
    #[error("no template available: {0}")]
    NoTemplate(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BadgeError {
    /// Build a [`BadgeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`BadgeError::ImageLoad`] value.
    pub fn image_load(msg: impl Into<String>) -> Self {
        Self::ImageLoad(msg.into())
    }

    /// Build a [`BadgeError::LinkDecode`] value.
    pub fn link_decode(msg: impl Into<String>) -> Self {
        Self::LinkDecode(msg.into())
    }

    /// Build a [`BadgeError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`BadgeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`BadgeError::Storage`] value.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Build a [`BadgeError::NoTemplate`] value.
    pub fn no_template(msg: impl Into<String>) -> Self {
        Self::NoTemplate(msg.into())
    }
}

impl From<serde_json::Error> for BadgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
