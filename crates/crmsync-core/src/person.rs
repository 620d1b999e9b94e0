//! Pipedrive person records and response envelopes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Pipedrive person identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(u64);

impl PersonId {
    /// Wrap a raw id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for PersonId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A person as returned by the CRM.
///
/// Always a fresh snapshot; nothing in this crate mutates one after it has
/// been received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Remote identifier
    pub id: PersonId,

    /// Person name
    #[serde(default)]
    pub name: Option<String>,

    /// Every other field the CRM returned
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Person {
    /// Look up a returned field other than `id` and `name`
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// `{ "success": ..., "data": ... }` wrapper around every response
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub(crate) data: Option<T>,
}

/// `data` of a person search response
#[derive(Debug, Deserialize)]
pub(crate) struct SearchData {
    #[serde(default)]
    pub(crate) items: Vec<SearchItem>,
}

/// One search hit
#[derive(Debug, Deserialize)]
pub(crate) struct SearchItem {
    pub(crate) item: Person,
}
