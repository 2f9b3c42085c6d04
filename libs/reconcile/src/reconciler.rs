//! Top-level reconciler: drives every node agent declared on a logging
//! stack through its resource pipeline.

use logfleet_merge::Merge;
use logfleet_model::{LoggingStack, NodeAgent, Platform};
use tracing::{debug, info, instrument};

use crate::apply::{Requeue, ResourceApplier};
use crate::defaults;
use crate::error::{ReconcileError, ReconcileResult};
use crate::instance::NodeAgentInstance;

/// Reconciles the managed objects of one logging stack.
///
/// A pass walks the stack's node agents in declared order and stops at
/// the first requeue or failure. Passes hold no state between runs:
/// every pass re-merges defaults into pass-local copies of the user
/// specs, so re-running a pass against an unchanged stack is free of
/// side effects. Concurrent passes over the same stack are not
/// coordinated here and must be serialized by the caller.
pub struct Reconciler<A> {
    stack: LoggingStack,
    applier: A,
}

impl<A: ResourceApplier> Reconciler<A> {
    /// Create a reconciler for one stack snapshot.
    pub fn new(stack: LoggingStack, applier: A) -> Self {
        Self { stack, applier }
    }

    /// The stack snapshot this reconciler drives toward.
    pub fn stack(&self) -> &LoggingStack {
        &self.stack
    }

    /// Run one reconciliation pass.
    ///
    /// Returns `Ok(None)` when every node agent converged, `Ok(Some(_))`
    /// when an underlying resource is still converging and the caller
    /// should retry later, and an error naming the failing node agent
    /// otherwise. Entries after the aborting one are not processed.
    #[instrument(skip(self), fields(stack = %self.stack.name))]
    pub async fn reconcile(&self) -> ReconcileResult<Option<Requeue>> {
        for entry in &self.stack.node_agents {
            let agent = self.merged_agent(entry);
            let instance = NodeAgentInstance {
                agent,
                stack: &self.stack,
                applier: &self.applier,
            };

            match instance.reconcile().await {
                Ok(None) => {
                    debug!(agent = %entry.name, "node agent converged");
                }
                Ok(Some(requeue)) => {
                    info!(agent = %entry.name, "node agent still converging, requeueing pass");
                    return Ok(Some(requeue));
                }
                Err(source) => {
                    return Err(ReconcileError::NodeAgent {
                        name: entry.name.clone(),
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(None)
    }

    /// Layer defaults into a pass-local copy of one user spec. The
    /// stored stack is never mutated.
    fn merged_agent(&self, entry: &NodeAgent) -> NodeAgent {
        let mut agent = entry.clone();
        agent.merge_from(&defaults::base());
        match agent.platform() {
            Platform::Windows => agent.merge_from(&defaults::windows()),
            Platform::Linux => agent.merge_from(&defaults::linux()),
        }
        agent
    }
}
