//! Conversions from JSON text to GraphQL variables and typed values.

use async_graphql::Variables;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read JSON stream: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse JSON text into GraphQL variables.
///
/// `None`, blank text and `null` all produce empty variables. A non-object
/// document also yields empty variables.
///
/// # Errors
/// Returns an error if the text is not valid JSON.
pub fn to_variables(json: Option<&str>) -> Result<Variables, InputError> {
    match json.map(str::trim) {
        None | Some("") => Ok(Variables::default()),
        Some(text) => Ok(value_to_variables(serde_json::from_str(text)?)),
    }
}

/// Convert a parsed JSON value into GraphQL variables.
#[must_use]
pub fn value_to_variables(value: Value) -> Variables {
    Variables::from_json(value)
}

/// Deserialize JSON text into `T`.
///
/// # Errors
/// Returns an error if the text is not valid JSON for `T`.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, InputError> {
    Ok(serde_json::from_str(json)?)
}

/// Read a JSON document from an async reader and deserialize it into `T`.
///
/// # Errors
/// Returns an error if reading fails or the document is not valid JSON for `T`.
pub async fn from_json_async<T, R>(reader: &mut R) -> Result<T, InputError>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer).await?;
    Ok(serde_json::from_slice(&buffer)?)
}

/// JSON conversions on string slices.
///
/// ```ignore
/// let variables = r#"{"id": 1}"#.to_variables()?;
/// ```
pub trait JsonStrExt {
    /// # Errors
    /// Returns an error if the text is not valid JSON.
    fn to_variables(&self) -> Result<Variables, InputError>;

    /// # Errors
    /// Returns an error if the text is not valid JSON for `T`.
    fn parse_json<T: DeserializeOwned>(&self) -> Result<T, InputError>;
}

impl JsonStrExt for str {
    fn to_variables(&self) -> Result<Variables, InputError> {
        to_variables(Some(self))
    }

    fn parse_json<T: DeserializeOwned>(&self) -> Result<T, InputError> {
        from_json(self)
    }
}
