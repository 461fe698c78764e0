//! PDF identifiers and the collection names derived from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RagError, Result};

/// Longest accepted identifier, in bytes.
const MAX_ID_LEN: usize = 128;

/// Prefix shared by every collection name.
const COLLECTION_PREFIX: &str = "pdf_";

/// Identity of one uploaded PDF, passed explicitly to every call.
///
/// Generated ids are UUID v4 strings in canonical hyphenated form. Any other
/// non-empty printable string of at most 128 bytes is accepted too, so
/// callers can bring their own ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PdfId(String);

impl PdfId {
    /// A fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    /// Validate and wrap an existing id.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidPdfId`] if the id is empty, longer than
    /// 128 bytes, or contains control characters.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(RagError::InvalidPdfId("id must not be empty".to_string()));
        }
        if id.len() > MAX_ID_LEN {
            return Err(RagError::InvalidPdfId(format!(
                "id is {} bytes, at most {MAX_ID_LEN} allowed",
                id.len()
            )));
        }
        if id.chars().any(char::is_control) {
            return Err(RagError::InvalidPdfId(format!("{id:?} contains control characters")));
        }
        Ok(Self(id))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the vector-store collection holding this PDF's chunks.
    ///
    /// Canonical UUIDs map to `pdf_` plus their 32 hex digits. Every other
    /// id maps to `pdf_x` plus the hex of its bytes; `x` is not a hex digit,
    /// so the two forms cannot collide and the mapping is injective.
    pub fn collection_name(&self) -> String {
        match Uuid::parse_str(&self.0) {
            Ok(uuid) if uuid.hyphenated().to_string() == self.0 => {
                format!("{COLLECTION_PREFIX}{}", uuid.simple())
            }
            _ => {
                let mut name =
                    String::with_capacity(COLLECTION_PREFIX.len() + 1 + self.0.len() * 2);
                name.push_str(COLLECTION_PREFIX);
                name.push('x');
                for byte in self.0.as_bytes() {
                    name.push_str(&format!("{byte:02x}"));
                }
                name
            }
        }
    }
}

impl fmt::Display for PdfId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PdfId {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for PdfId {
    type Error = RagError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PdfId> for String {
    fn from(id: PdfId) -> Self {
        id.0
    }
}

impl AsRef<str> for PdfId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
