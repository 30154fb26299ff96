//! Struct signatures: the ordered field-name list identifying a record shape

use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Ordered, immutable list of field names
///
/// Equality and hashing cover the full sequence, so `["id", "name"]` and
/// `["name", "id"]` are different shapes. Cloning is cheap: the names are
/// shared behind an `Arc`, which lets a slot table key its lookup map and its
/// arena with the same signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructSignature {
    fields: Arc<[String]>,
}

impl StructSignature {
    /// Create a signature from an ordered list of field names
    pub fn new<S: AsRef<str>>(fields: &[S]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.as_ref().to_owned()).collect(),
        }
    }

    /// Create a signature from a possibly absent field list
    ///
    /// An absent list is a caller bug and fails with `NullArgument`; an empty
    /// list is the legal zero-field signature.
    pub fn from_optional<S: AsRef<str>>(fields: Option<&[S]>) -> Result<Self> {
        fields
            .map(Self::new)
            .ok_or_else(|| Error::NullArgument("struct field list is absent".to_string()))
    }

    /// The zero-field signature
    pub fn empty() -> Self {
        Self {
            fields: Arc::from(Vec::new()),
        }
    }

    /// Field names in declaration order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for StructSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.fields.join(", "))
    }
}
