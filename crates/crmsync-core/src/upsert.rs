//! Create-or-update of a single person

use serde::Serialize;
use std::fmt;

use crate::client::PersonDirectory;
use crate::error::Result;
use crate::mapping::PersonPayload;
use crate::person::{Person, PersonId};

/// Which call an upsert ended up making
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    /// No match existed, a person was created
    Created,
    /// An existing person was overwritten
    Updated,
}

impl fmt::Display for UpsertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
        }
    }
}

/// Result of [`upsert`]
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    /// Call that was made
    pub action: UpsertAction,
    /// The person as the CRM now has it
    pub person: Person,
}

/// Update `existing` if given, otherwise create a new person.
pub async fn upsert<D>(
    directory: &D,
    payload: &PersonPayload,
    existing: Option<PersonId>,
) -> Result<UpsertOutcome>
where
    D: PersonDirectory + ?Sized,
{
    let (action, person) = match existing {
        Some(id) => (
            UpsertAction::Updated,
            directory.update_person(id, payload).await?,
        ),
        None => (UpsertAction::Created, directory.create_person(payload).await?),
    };

    Ok(UpsertOutcome { action, person })
}
