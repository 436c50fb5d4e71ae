//! Provenance classification of provisioned resources.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which actor class last wrote a resource.
///
/// The stored text form is `""` for [`Provenance::None`], `"api"` and
/// `"file"` for the two built-in classes, and the raw tag for anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Provenance {
    /// No recorded provenance; the resource is freely editable.
    #[default]
    None,
    /// Written through the HTTP API.
    Api,
    /// Written by file provisioning.
    File,
    /// Any other actor class, kept as an opaque tag.
    ///
    /// Build with [`Provenance::other`]; a tag of `""`, `"api"` or `"file"`
    /// belongs to a built-in variant and is rejected by the store.
    Other(String),
}

impl Provenance {
    /// Text form as persisted in the `provenance` column.
    pub fn as_str(&self) -> &str {
        match self {
            Provenance::None => "",
            Provenance::Api => "api",
            Provenance::File => "file",
            Provenance::Other(tag) => tag,
        }
    }

    /// Whether this is the default "no provenance" value.
    pub fn is_none(&self) -> bool {
        matches!(self, Provenance::None)
    }

    /// Provenance for an arbitrary tag, mapping reserved tags to their
    /// built-in variants.
    pub fn other(tag: impl Into<String>) -> Self {
        Provenance::from_tag(&tag.into())
    }

    /// Whether the value decodes back to itself from [`Provenance::as_str`].
    pub fn is_canonical(&self) -> bool {
        match self {
            Provenance::Other(tag) => !matches!(tag.as_str(), "" | "api" | "file"),
            _ => true,
        }
    }

    /// Decode a stored tag. Never fails; unknown tags are preserved.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "" => Provenance::None,
            "api" => Provenance::Api,
            "file" => Provenance::File,
            other => Provenance::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::None => write!(f, "none"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

impl FromStr for Provenance {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Provenance::from_tag(s))
    }
}

impl From<String> for Provenance {
    fn from(tag: String) -> Self {
        Provenance::from_tag(&tag)
    }
}

impl From<Provenance> for String {
    fn from(p: Provenance) -> Self {
        p.as_str().to_string()
    }
}
