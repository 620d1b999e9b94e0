//! Sync orchestration
//!
//! A run moves through a fixed sequence of stages:
//!
//! ```text
//! ValidateMapping → ValidateIdentityValue → BuildPayload → Lookup → Upsert
//! ```
//!
//! The first failure aborts the run. It is reported wrapped in
//! [`Error::Orchestration`] so the message starts with the failing stage.
//! Both validation stages run before any request is made.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::client::PersonDirectory;
use crate::error::{Error, Result};
use crate::mapping::{MappingEntry, MappingTable, PersonPayload, TargetField};
use crate::person::Person;
use crate::upsert::{UpsertAction, upsert};

/// A step of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStage {
    /// The mapping has an entry for the identifying field
    ValidateMapping,
    /// The identifying value resolves to a non-empty string
    ValidateIdentityValue,
    /// The payload is built from the input record
    BuildPayload,
    /// The CRM is searched for an existing person
    Lookup,
    /// The person is created or updated
    Upsert,
}

impl SyncStage {
    /// Prefix used when reporting a failure in this stage
    pub fn context(self) -> &'static str {
        match self {
            Self::ValidateMapping => "mapping validation failed",
            Self::ValidateIdentityValue => "identity resolution failed",
            Self::BuildPayload => "payload construction failed",
            Self::Lookup => "person lookup failed",
            Self::Upsert => "person upsert failed",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ValidateMapping => "validate_mapping",
            Self::ValidateIdentityValue => "validate_identity_value",
            Self::BuildPayload => "build_payload",
            Self::Lookup => "lookup",
            Self::Upsert => "upsert",
        };
        f.write_str(name)
    }
}

/// Output of the local stages of a run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    /// Resolved identifying value
    pub identity: String,
    /// Body that would be sent
    pub payload: PersonPayload,
}

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    /// Identifier of this run, also recorded on its log span
    pub run_id: Uuid,
    /// Whether the person was created or updated
    pub action: UpsertAction,
    /// The person as the CRM now has it
    pub person: Person,
    /// When the run finished
    pub synced_at: DateTime<Utc>,
}

/// Drives one input record through the sync stages
pub struct Synchronizer<'a, D: ?Sized> {
    mapping: &'a MappingTable,
    directory: &'a D,
}

impl<'a, D> Synchronizer<'a, D>
where
    D: PersonDirectory + ?Sized,
{
    /// Create a synchronizer over `mapping` writing to `directory`
    pub fn new(mapping: &'a MappingTable, directory: &'a D) -> Self {
        Self { mapping, directory }
    }

    /// Run the local stages only; no requests are made.
    pub fn plan(&self, input: &Value) -> Result<SyncPlan> {
        plan(self.mapping, input)
    }

    /// Sync `input` into the CRM
    pub async fn sync(&self, input: &Value) -> Result<SyncOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync", %run_id);

        async move {
            let plan = self.plan(input)?;

            debug!(stage = %SyncStage::Lookup, name = %plan.identity, "Entering stage");
            let existing = self
                .directory
                .find_by_name(&plan.identity)
                .await
                .map_err(|e| e.at_stage(SyncStage::Lookup))?;
            let existing_id = existing.map(|person| person.id);

            debug!(
                stage = %SyncStage::Upsert,
                existing = existing_id.map(|id| id.get()),
                "Entering stage"
            );
            let outcome = upsert(self.directory, &plan.payload, existing_id)
                .await
                .map_err(|e| e.at_stage(SyncStage::Upsert))?;

            info!(
                action = %outcome.action,
                person_id = %outcome.person.id,
                "Person synced"
            );

            Ok(SyncOutcome {
                run_id,
                action: outcome.action,
                person: outcome.person,
                synced_at: Utc::now(),
            })
        }
        .instrument(span)
        .await
    }
}

/// Validate `mapping` against `input` and build the payload without a directory
pub fn plan(mapping: &MappingTable, input: &Value) -> Result<SyncPlan> {
    debug!(stage = %SyncStage::ValidateMapping, "Entering stage");
    let entry = identity_entry(mapping).map_err(|e| e.at_stage(SyncStage::ValidateMapping))?;

    debug!(stage = %SyncStage::ValidateIdentityValue, "Entering stage");
    let identity =
        resolve_identity(entry, input).map_err(|e| e.at_stage(SyncStage::ValidateIdentityValue))?;

    debug!(stage = %SyncStage::BuildPayload, "Entering stage");
    let payload = mapping.build_payload(input);
    debug!(fields = payload.len(), "Payload built");

    Ok(SyncPlan { identity, payload })
}

fn identity_entry(mapping: &MappingTable) -> Result<&MappingEntry> {
    mapping.identity_entry().ok_or_else(|| {
        Error::configuration(format!(
            "no mapping for identifying field '{}'",
            TargetField::IDENTITY
        ))
    })
}

fn resolve_identity(entry: &MappingEntry, input: &Value) -> Result<String> {
    entry
        .source_path
        .resolve(input)
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::configuration(format!(
                "missing or non-string identifying value at '{}'",
                entry.source_path
            ))
        })
}
