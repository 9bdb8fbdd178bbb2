//! Value-equality cache keys identifying one logical data request.
use std::fmt;

use serde::Serialize;

/// One primitive component of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum KeyPart {
    /// Free text such as a page name, category or search string.
    Text(String),
    /// Integer parameter.
    Int(i64),
    /// Boolean parameter.
    Flag(bool),
    /// Parameter that is not set. Distinct from empty text.
    Absent,
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for KeyPart {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::Flag(value) => write!(f, "{value}"),
            Self::Absent => f.write_str("~"),
        }
    }
}

/// Ordered tuple of primitives naming a cache entry.
///
/// Two keys address the same entry exactly when their parts are equal in
/// order; the display form is for logs only.
///
/// # Examples
/// ```
/// use dashboard::domain::query_key::QueryKey;
///
/// let a = QueryKey::new("topic").with("SEO").with("rank_score");
/// let b = QueryKey::new("topic").with("SEO").with("rank_score");
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "topic:SEO:rank_score");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    /// Start a key with its scope, usually the page identifier.
    pub fn new(scope: impl Into<String>) -> Self {
        Self(vec![KeyPart::Text(scope.into())])
    }

    /// Return the key extended by one more part.
    #[must_use]
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    /// Borrow the parts in order.
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Leading text part, if any.
    pub fn scope(&self) -> Option<&str> {
        match self.0.first() {
            Some(KeyPart::Text(scope)) => Some(scope.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = self.0.iter();
        if let Some(first) = parts.next() {
            write!(f, "{first}")?;
        }
        for part in parts {
            write!(f, ":{part}")?;
        }
        Ok(())
    }
}
