//! crmsync Core Library
//!
//! This crate provides the core functionality for crmsync:
//! - Configuration parsing and validation
//! - Source path resolution and field mapping
//! - Pipedrive person API client
//! - Create-or-update orchestration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Config    │────▶│   Mapper    │────▶│   Lookup    │────▶│   Upsert    │
//! │   (YAML)    │     │  (payload)  │     │  (search)   │     │ (POST/PUT)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use crmsync_core::{Config, PipedriveClient, Synchronizer};
//!
//! let config = Config::load("./crmsync.yaml")?;
//! config.sync.validate()?;
//! let client = PipedriveClient::new(&config.sync.pipedrive)?;
//! let input = config.load_input()?;
//! let outcome = Synchronizer::new(&config.sync.mapping, &client).sync(&input).await?;
//! println!("{} person {}", outcome.action, outcome.person.id);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod mapping;
pub mod path;
pub mod person;
pub mod sync;
pub mod upsert;

#[cfg(test)]
mod testing;

pub use client::{PersonDirectory, PipedriveClient, RemoteOperation};
pub use config::{Config, ConfigOverrides, PipedriveConfig, SyncConfig};
pub use error::{Error, Result};
pub use mapping::{MappingEntry, MappingTable, PersonPayload, TargetField, build_payload};
pub use path::SourcePath;
pub use person::{Person, PersonId};
pub use sync::{SyncOutcome, SyncPlan, SyncStage, Synchronizer, plan};
pub use upsert::{UpsertAction, UpsertOutcome, upsert};
