//! Command implementations

pub mod changeset;
pub mod profile;
