//! Collaborator interfaces consumed by the backup engine
//!
//! The snapshot builder only reads through [`Repository`]. The restore
//! orchestrator only writes through a [`Transaction`] obtained from a
//! [`TransactionManager`]; nothing it does is visible until `commit`.

use crate::error::PropdeskResult;
use crate::models::{EntityType, NaturalKey, Record};

/// Read access to the current records of each entity type
pub trait Repository {
    /// Fetch every record of an entity type, in storage order
    fn fetch_all(&self, entity_type: EntityType) -> PropdeskResult<Vec<Record>>;
}

/// One flat transaction over the store
///
/// Dropping a transaction without committing discards its changes.
pub trait Transaction {
    /// Look up a record by natural key, seeing this transaction's own writes
    fn find_by_natural_key(
        &self,
        entity_type: EntityType,
        key: &NaturalKey,
    ) -> PropdeskResult<Option<Record>>;

    /// Insert a new record
    ///
    /// Fails with [`PropdeskError::Duplicate`](crate::error::PropdeskError::Duplicate)
    /// when the natural key is already taken. Returns the stored record,
    /// which carries a generated `id` if the input had none.
    fn insert(&mut self, record: Record) -> PropdeskResult<Record>;

    /// Replace the record sharing the input's `id`
    fn update(&mut self, record: Record) -> PropdeskResult<Record>;

    /// Append a record without any uniqueness check
    fn append(&mut self, record: Record) -> PropdeskResult<Record>;

    /// Make every write of this transaction durable and visible
    fn commit(self: Box<Self>) -> PropdeskResult<()>;

    /// Discard every write of this transaction
    fn rollback(self: Box<Self>) -> PropdeskResult<()>;
}

/// Opens transactions
pub trait TransactionManager {
    fn begin(&self) -> PropdeskResult<Box<dyn Transaction + '_>>;
}
