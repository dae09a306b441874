//! Service plumbing shared by Nexus HTTP services: tracing setup, request-id
//! middleware, health probes and timestamp serializers.

pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
