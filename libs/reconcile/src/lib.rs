//! # logfleet-reconcile
//!
//! Desired-state reconciliation engine for node logging agents.
//!
//! Given a [`LoggingStack`](logfleet_model::LoggingStack) snapshot, a
//! reconciliation pass:
//!
//! 1. layers defaults into a pass-local copy of each node agent spec
//!    (base profile first, then the platform profile selected by the
//!    spec's discriminator),
//! 2. walks a fixed, ordered list of resource factories for each agent,
//!    building one desired object per managed kind, and
//! 3. hands every desired object to the external [`ResourceApplier`]
//!    together with its desired state.
//!
//! ## Invariants
//!
//! - A set field is never overwritten by a default; the base profile
//!   wins any field both profiles define.
//! - The factory order is fixed and the pass stops at the first requeue
//!   or failure; nothing later in the pipeline runs in that pass.
//! - Passes share no mutable state: profiles are fresh literals and the
//!   stored stack is never mutated, so an unchanged stack reconciles to
//!   the same applies every pass.
//! - No rollback: an aborted pass leaves already-applied objects in
//!   place and relies on the applier's idempotence on the next pass.

mod agent_config;
mod apply;
pub mod defaults;
mod error;
mod instance;
mod kind;
mod reconciler;
mod resources;

pub use agent_config::{config_checksum, render_agent_config};
pub use apply::{DesiredState, ManagedObject, Requeue, ResourceApplier};
pub use error::{ApplyError, BuildError, ReconcileError, ReconcileResult};
pub use kind::ResourceKind;
pub use reconciler::Reconciler;
