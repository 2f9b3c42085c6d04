//! # logfleet-model
//!
//! Declarative configuration model for logfleet logging stacks.
//!
//! ## Design Principles
//!
//! - A [`LoggingStack`] is the user-authored desired state: a named
//!   deployment owning an ordered collection of [`NodeAgent`] entries.
//! - Every field of a node agent may be left unset, meaning "use the
//!   default". Unset is expressed with `Option` (or an empty collection),
//!   never with sentinel values.
//! - The model is plain data with serde derives; the reconciliation
//!   engine merges defaults into pass-local copies and never writes back
//!   into the stored stack.
//! - Opaque manifest fragments (resource requirements, probes, security
//!   contexts) are carried as `serde_json::Value` in the resource store's
//!   native schema; they are configuration data, not modeled types.

mod agent;
mod stack;

pub use agent::{
    BufferStorage, CloudMetadataFilter, ForwardOptions, Metrics, NodeAgent, Platform, Security,
    TailInput, Toleration, WorkloadOverrides,
};
pub use stack::LoggingStack;
