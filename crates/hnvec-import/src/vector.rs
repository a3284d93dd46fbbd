//! Text embedding literals such as `[0.1, 0.2, 0.3]`

use thiserror::Error;

/// Why an embedding literal was rejected. Callers skip the row.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorParseError {
    #[error("empty vector")]
    Empty,

    #[error("invalid vector element '{0}'")]
    InvalidElement(String),

    #[error("empty vector after parse")]
    NoElements,
}

/// Decode a bracketed, comma-separated float list.
///
/// One leading `[` and one trailing `]` are optional. Blank elements are
/// skipped, so `[1.0,,2.0]` yields two values.
pub fn parse_vector(raw: &str) -> Result<Vec<f32>, VectorParseError> {
    let trimmed = raw.trim();
    let inner = trimmed.strip_prefix('[').unwrap_or(trimmed);
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    if inner.is_empty() {
        return Err(VectorParseError::Empty);
    }

    let mut values = Vec::with_capacity(inner.len() / 8 + 1);
    for element in inner.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let value = element
            .parse::<f32>()
            .map_err(|_| VectorParseError::InvalidElement(element.to_string()))?;
        values.push(value);
    }

    if values.is_empty() {
        return Err(VectorParseError::NoElements);
    }
    Ok(values)
}
