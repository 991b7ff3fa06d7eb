//! Application layer
//!
//! Use-case orchestration over the ports.

mod agents;
mod assignment;
mod pipeline;
mod queue;
mod tickets;

pub use agents::{AgentRemoval, AgentService, AgentStats, AgentUpdate, NewAgent};
pub use assignment::{AssignTarget, AssignmentOutcome, AssignmentService};
pub use pipeline::{
    Classified, Drafted, PipelineSettings, PipelineStage, Retrieved, TicketPipeline,
};
pub use queue::{ProcessingJob, ProcessingQueue, TicketProcessor};
pub use tickets::{NewTicket, TicketCreated, TicketService};

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Serializes read-modify-write sequences on tickets and agent load.
/// AI calls never run while it is held.
#[derive(Clone, Default)]
pub struct WriteLock(Arc<Mutex<()>>);

impl WriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock().await
    }
}
