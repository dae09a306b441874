//! Domain types shared across Nexus services.
//!
//! This crate contains only pure types with no framework dependencies.
//! Import in `usecase/` and `domain/` layers freely; `infra/` converts them
//! to and from storage rows.

pub mod id;
pub mod pagination;
