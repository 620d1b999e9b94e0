//! Field mapping from input records to Pipedrive person payloads
//!
//! A mapping table is an ordered list of `(pipedrive_key, input_key)` pairs.
//! Entries are applied in order, so a later entry for the same target field
//! replaces an earlier one.
//!
//! # Example
//!
//! ```yaml
//! mapping:
//!   - pipedrive_key: name
//!     input_key: fullName
//!   - pipedrive_key: email
//!     input_key: contact.email
//!   - pipedrive_key: phone
//!     input_key: contact.phones[0]
//! ```
//!
//! `email` and `phone` are always sent as a single labeled value:
//!
//! ```json
//! { "email": [{ "value": "jane@x.com", "primary": true, "label": "work" }] }
//! ```

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::path::SourcePath;

/// A field on the Pipedrive person schema
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetField {
    /// Person name, also the identifying field
    Name,
    /// Email addresses
    Email,
    /// Phone numbers
    Phone,
    /// Owning user id
    OwnerId,
    /// Linked organization id
    OrgId,
    /// Person label id
    Label,
    /// Visibility group
    VisibleTo,
    /// Marketing consent status
    MarketingStatus,
    /// Tenant-specific custom field key
    Custom(String),
}

impl TargetField {
    /// The field used to find an existing person before deciding create vs. update
    pub const IDENTITY: TargetField = TargetField::Name;

    /// Wire name of the field
    pub fn as_str(&self) -> &str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::OwnerId => "owner_id",
            Self::OrgId => "org_id",
            Self::Label => "label",
            Self::VisibleTo => "visible_to",
            Self::MarketingStatus => "marketing_status",
            Self::Custom(key) => key,
        }
    }

    /// Label applied when this field is wrapped into a labeled value list
    pub fn contact_label(&self) -> Option<ContactLabel> {
        match self {
            Self::Email => Some(ContactLabel::Work),
            Self::Phone => Some(ContactLabel::Home),
            _ => None,
        }
    }
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "name" => Self::Name,
            "email" => Self::Email,
            "phone" => Self::Phone,
            "owner_id" => Self::OwnerId,
            "org_id" => Self::OrgId,
            "label" => Self::Label,
            "visible_to" => Self::VisibleTo,
            "marketing_status" => Self::MarketingStatus,
            "" => return Err(Error::configuration("target field must not be empty")),
            other if other.chars().any(char::is_whitespace) => {
                return Err(Error::configuration(format!(
                    "target field '{other}' must not contain whitespace"
                )));
            }
            other => Self::Custom(other.to_string()),
        })
    }
}

impl TryFrom<String> for TargetField {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TargetField> for String {
    fn from(field: TargetField) -> Self {
        field.as_str().to_string()
    }
}

/// Label attached to multi-value contact fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactLabel {
    /// Used for email
    Work,
    /// Used for phone
    Home,
}

/// One entry of a multi-value contact field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledValue {
    /// The address or number
    pub value: Value,
    /// Whether this is the primary entry
    pub primary: bool,
    /// Entry label
    pub label: ContactLabel,
}

/// A transformed value ready to send
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Sent as-is
    Scalar(Value),
    /// Sent as a labeled value list (`email`, `phone`)
    Labeled(Vec<LabeledValue>),
}

impl FieldValue {
    /// Shape a resolved input value for `field`
    pub fn shape(field: &TargetField, value: &Value) -> Self {
        match field.contact_label() {
            Some(label) => Self::Labeled(vec![LabeledValue {
                value: value.clone(),
                primary: true,
                label,
            }]),
            None => Self::Scalar(value.clone()),
        }
    }
}

/// Body of a person create or update call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonPayload {
    fields: BTreeMap<TargetField, FieldValue>,
}

impl PersonPayload {
    /// Create an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field` from a resolved input value, replacing any earlier value
    pub fn set(&mut self, field: TargetField, value: &Value) {
        let shaped = FieldValue::shape(&field, value);
        self.fields.insert(field, shaped);
    }

    /// Value for `field`, if present
    pub fn get(&self, field: &TargetField) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Whether `field` is present
    pub fn contains(&self, field: &TargetField) -> bool {
        self.fields.contains_key(field)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are set
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in a stable order
    pub fn iter(&self) -> impl Iterator<Item = (&TargetField, &FieldValue)> {
        self.fields.iter()
    }

    /// Render as a JSON object
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Serialize for PersonPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field.as_str(), value)?;
        }
        map.end()
    }
}

/// One `(pipedrive_key, input_key)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Field on the person schema
    #[serde(
        rename = "pipedrive_key",
        alias = "pipedriveKey",
        alias = "target_field"
    )]
    pub target_field: TargetField,

    /// Path into the input record
    #[serde(rename = "input_key", alias = "inputKey", alias = "source_path")]
    pub source_path: SourcePath,
}

impl MappingEntry {
    /// Build an entry from raw strings, validating both sides
    pub fn new(target_field: &str, source_path: &str) -> Result<Self> {
        Ok(Self {
            target_field: target_field.parse()?,
            source_path: source_path.parse()?,
        })
    }
}

/// Ordered mapping table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingTable(Vec<MappingEntry>);

impl MappingTable {
    /// Create a table from entries in application order
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        Self(entries)
    }

    /// Entries in application order
    pub fn entries(&self) -> &[MappingEntry] {
        &self.0
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The entry for the identifying field.
    ///
    /// With duplicates the last one wins, matching [`build_payload`].
    pub fn identity_entry(&self) -> Option<&MappingEntry> {
        self.0
            .iter()
            .rev()
            .find(|entry| entry.target_field == TargetField::IDENTITY)
    }

    /// Build a person payload from `input`
    pub fn build_payload(&self, input: &Value) -> PersonPayload {
        build_payload(input, &self.0)
    }
}

impl FromIterator<MappingEntry> for MappingTable {
    fn from_iter<I: IntoIterator<Item = MappingEntry>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Translate `input` into a person payload.
///
/// Entries whose source resolves to nothing (or to `null`) are skipped, so
/// the payload never carries explicit nulls.
pub fn build_payload(input: &Value, mappings: &[MappingEntry]) -> PersonPayload {
    let mut payload = PersonPayload::new();
    for entry in mappings {
        match entry.source_path.resolve(input) {
            Some(value) => payload.set(entry.target_field.clone(), value),
            None => tracing::trace!(
                field = %entry.target_field,
                path = %entry.source_path,
                "Source value absent, skipping field"
            ),
        }
    }
    payload
}
