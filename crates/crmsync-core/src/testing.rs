//! In-memory [`PersonDirectory`] that records every call

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

use crate::client::{PersonDirectory, RemoteOperation};
use crate::error::{Error, Result};
use crate::mapping::{FieldValue, PersonPayload, TargetField};
use crate::person::{Person, PersonId};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Search(String),
    Create(PersonPayload),
    Update(PersonId, PersonPayload),
}

pub(crate) fn person(id: u64, name: &str) -> Person {
    Person {
        id: PersonId::new(id),
        name: Some(name.to_string()),
        fields: Default::default(),
    }
}

pub(crate) struct RecordingDirectory {
    existing: Option<Person>,
    failing: Option<RemoteOperation>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingDirectory {
    pub(crate) fn empty() -> Self {
        Self {
            existing: None,
            failing: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_existing(person: Person) -> Self {
        Self {
            existing: Some(person),
            ..Self::empty()
        }
    }

    pub(crate) fn failing(mut self, operation: RemoteOperation) -> Self {
        self.failing = Some(operation);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn search_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Search(_)))
            .count()
    }

    pub(crate) fn upsert_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create(_) | Call::Update(..)))
            .count()
    }

    fn record(&self, call: Call, operation: RemoteOperation) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing == Some(operation) {
            return Err(Error::remote(operation, "HTTP 500 Internal Server Error"));
        }
        Ok(())
    }

    fn echo(id: PersonId, payload: &PersonPayload) -> Person {
        let name = match payload.get(&TargetField::IDENTITY) {
            Some(FieldValue::Scalar(Value::String(name))) => Some(name.clone()),
            _ => None,
        };
        Person {
            id,
            name,
            fields: Default::default(),
        }
    }
}

#[async_trait]
impl PersonDirectory for RecordingDirectory {
    async fn find_by_name(&self, name: &str) -> Result<Option<Person>> {
        self.record(Call::Search(name.to_string()), RemoteOperation::Search)?;
        Ok(self.existing.clone())
    }

    async fn create_person(&self, payload: &PersonPayload) -> Result<Person> {
        self.record(Call::Create(payload.clone()), RemoteOperation::Create)?;
        Ok(Self::echo(PersonId::new(1), payload))
    }

    async fn update_person(&self, id: PersonId, payload: &PersonPayload) -> Result<Person> {
        self.record(Call::Update(id, payload.clone()), RemoteOperation::Update)?;
        Ok(Self::echo(id, payload))
    }
}
