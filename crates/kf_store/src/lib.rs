//! Keyfort storage layer.
//!
//! One behavioral contract, two engines. [`Repository`] defines every
//! operation the service is allowed to perform; [`sqlite::SqliteRepository`]
//! and [`mongo::MongoRepository`] implement it with identical observable
//! behavior, and [`factory::open_repository`] picks between them at startup.
//!
//! Parity rules that keep the engines interchangeable:
//! - ids are repository-minted UUID strings, opaque to callers
//! - timestamps cross the boundary as UTC RFC 3339 strings with microsecond
//!   precision, in both engines
//! - listings order by creation time with id as tiebreaker
//! - duplicate username/email surfaces as [`StoreError::UniquenessViolation`],
//!   enforced by each engine's native uniqueness machinery

pub mod entities;
pub mod error;
pub mod factory;
pub mod mongo;
pub mod repository;
pub mod sqlite;

pub use entities::{
    EntryUpdate, NewEntry, NewOwner, OwnerProfile, VaultEntry, VaultOwner,
};
pub use error::StoreError;
pub use factory::{open_repository, BackendKind, StoreConfig};
pub use mongo::MongoRepository;
pub use repository::Repository;
pub use sqlite::SqliteRepository;
