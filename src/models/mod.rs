//! Core data models for Propdesk
//!
//! The backup engine treats every entity generically: a [`Record`] is a JSON
//! object tagged with its [`EntityType`].

pub mod entity;
pub mod record;

pub use entity::EntityType;
pub use record::{NaturalKey, Record, ID_FIELD};
