//! Storage access passed explicitly to every handler through `AppState`.

pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;

use crate::filter::ListFilter;
use crate::schema::{Association, EntitySchema, Row};

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use models::{NewPrincipal, Principal, Role};
pub use postgres::PgStore;

/// Registered principals, looked up by API key on every authenticated request.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fails with `Duplicate` when the email or API key is taken; nothing is written then.
    async fn register(&self, principal: NewPrincipal) -> Result<i64, DatabaseError>;

    async fn find_by_key(&self, api_key: &str) -> Result<Option<Principal>, DatabaseError>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<Principal>, DatabaseError>;

    async fn delete(&self, id: i64) -> Result<(), DatabaseError>;
}

/// Single-table operations for any entity described by an [`EntitySchema`].
///
/// Rows go in as validated by the schema and come back decoded, with
/// `id` and any lookup columns included.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, schema: &EntitySchema, filter: &ListFilter) -> Result<Vec<Row>, DatabaseError>;

    async fn count(&self, schema: &EntitySchema) -> Result<i64, DatabaseError>;

    async fn get(&self, schema: &EntitySchema, id: i64) -> Result<Option<Row>, DatabaseError>;

    /// Returns the assigned id. Ids are never reused.
    async fn insert(&self, schema: &EntitySchema, row: Row) -> Result<i64, DatabaseError>;

    /// Overwrites the given columns; `NotFound` when no row has this id.
    async fn replace(&self, schema: &EntitySchema, id: i64, row: Row) -> Result<(), DatabaseError>;

    /// Hard delete returning the removed row; `NotFound` when no row has this id.
    async fn delete(&self, schema: &EntitySchema, id: i64) -> Result<Row, DatabaseError>;

    /// Insert-or-ignore; returns how many links were new.
    async fn link(&self, assoc: &Association, owner_id: i64, member_ids: &[i64]) -> Result<u64, DatabaseError>;

    async fn linked(
        &self,
        assoc: &Association,
        member: &EntitySchema,
        owner_id: i64,
    ) -> Result<Vec<Row>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}
