//! Processing queue
//!
//! Ticket creation enqueues a [`ProcessingJob`]; a worker task drains the
//! queue and runs the pipeline. Delivery is at-least-once: jobs that fail on
//! storage are re-queued until `max_attempts`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::assignment::{AssignmentOutcome, AssignmentService};
use super::pipeline::{PipelineStage, TicketPipeline};
use super::WriteLock;
use crate::domain::value_objects::TicketId;
use crate::error::{DeskError, DeskResult};
use crate::ports::{EventPublisher, TicketRepository};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessingJob {
    pub ticket_id: TicketId,
    /// 1-based delivery attempt
    pub attempt: u32,
}

impl ProcessingJob {
    pub fn new(ticket_id: TicketId) -> Self {
        Self { ticket_id, attempt: 1 }
    }

    fn next_attempt(self) -> Self {
        Self { attempt: self.attempt + 1, ..self }
    }
}

/// Runs the pipeline for one ticket and persists the annotation
pub struct TicketProcessor {
    tickets: Arc<dyn TicketRepository>,
    events: Arc<dyn EventPublisher>,
    pipeline: Arc<TicketPipeline>,
    assignment: Option<Arc<AssignmentService>>,
    lock: WriteLock,
}

impl TicketProcessor {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        events: Arc<dyn EventPublisher>,
        pipeline: Arc<TicketPipeline>,
        lock: WriteLock,
    ) -> Self {
        Self { tickets, events, pipeline, assignment: None, lock }
    }

    /// Auto-assign annotated tickets through `assignment`
    pub fn with_auto_assignment(mut self, assignment: Arc<AssignmentService>) -> Self {
        self.assignment = Some(assignment);
        self
    }

    pub async fn process(&self, ticket_id: &TicketId) -> DeskResult<PipelineStage> {
        let snapshot = self
            .tickets
            .find_by_id(ticket_id)
            .await?
            .ok_or_else(|| DeskError::ticket_not_found(ticket_id.as_str()))?;

        let drafted = self.pipeline.run(&snapshot).await;

        let (applied, confidence, assigned) = {
            let _guard = self.lock.acquire().await;
            // Re-read so updates made while the AI stages ran are kept
            let mut ticket = self
                .tickets
                .find_by_id(ticket_id)
                .await?
                .ok_or_else(|| DeskError::ticket_not_found(ticket_id.as_str()))?;
            let applied = self.pipeline.annotate(&mut ticket, drafted);
            let confidence = ticket.ai().map(|a| a.confidence).unwrap_or_default();
            self.tickets.save(&ticket).await?;
            self.events.publish(ticket.take_events()).await?;
            (applied, confidence, ticket.assigned_to().is_some())
        };
        info!(ticket_id = %ticket_id, confidence, auto_applied = applied, stage = %PipelineStage::Annotated, "ticket annotated");

        let Some(assignment) = self.assignment.as_ref().filter(|_| !assigned) else {
            return Ok(PipelineStage::PendingAssignment);
        };
        match assignment.auto_assign(ticket_id).await? {
            AssignmentOutcome::Assigned { agent, .. } => {
                info!(ticket_id = %ticket_id, agent_id = %agent.agent_id, "ticket auto-assigned");
                Ok(PipelineStage::AutoAssigned)
            }
            AssignmentOutcome::Unassigned { reason, .. } => {
                info!(ticket_id = %ticket_id, reason = %reason, "ticket pending assignment");
                Ok(PipelineStage::PendingAssignment)
            }
        }
    }
}

/// Handle for submitting jobs; cloning shares the same worker
#[derive(Clone)]
pub struct ProcessingQueue {
    sender: mpsc::UnboundedSender<ProcessingJob>,
}

impl ProcessingQueue {
    /// Spawn the worker. The worker stops once every queue handle is dropped.
    pub fn start(processor: Arc<TicketProcessor>, max_attempts: u32) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ProcessingJob>();
        let retry = sender.downgrade();
        let max_attempts = max_attempts.max(1);

        let worker = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let processor = processor.clone();
                let retry = retry.clone();
                tokio::spawn(async move {
                    let ticket_id = job.ticket_id.clone();
                    match processor.process(&ticket_id).await {
                        Ok(stage) => info!(ticket_id = %ticket_id, attempt = job.attempt, stage = %stage, "processing complete"),
                        Err(e) if e.is_retryable() && job.attempt < max_attempts => {
                            warn!(ticket_id = %ticket_id, attempt = job.attempt, error = %e, "processing failed, re-queueing");
                            tokio::time::sleep(Duration::from_millis(50 * u64::from(job.attempt))).await;
                            match retry.upgrade() {
                                Some(sender) => {
                                    if sender.send(job.next_attempt()).is_err() {
                                        warn!(ticket_id = %ticket_id, "queue closed before retry");
                                    }
                                }
                                None => warn!(ticket_id = %ticket_id, "queue closed before retry"),
                            }
                        }
                        Err(e) => error!(ticket_id = %ticket_id, attempt = job.attempt, error = %e, "processing abandoned"),
                    }
                });
            }
            info!("processing queue closed");
        });

        (Self { sender }, worker)
    }

    pub fn submit(&self, ticket_id: TicketId) -> DeskResult<()> {
        self.sender
            .send(ProcessingJob::new(ticket_id))
            .map_err(|_| DeskError::ServiceUnavailable("processing queue is closed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pipeline::tests::{article, pipeline};
    use crate::domain::aggregates::Ticket;
    use crate::domain::value_objects::{Category, Email, TicketSource};
    use crate::infrastructure::{InMemoryEventLog, InMemoryTicketRepository};
    use crate::ports::{RepositoryError, TicketFilter};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` saves
    struct FlakyRepository {
        inner: InMemoryTicketRepository,
        failures: AtomicU32,
    }

    #[async_trait]
    impl TicketRepository for FlakyRepository {
        async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, RepositoryError> {
            self.inner.find_by_id(id).await
        }
        async fn exists(&self, id: &TicketId) -> Result<bool, RepositoryError> {
            self.inner.exists(id).await
        }
        async fn save(&self, ticket: &Ticket) -> Result<(), RepositoryError> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(RepositoryError::Connection("write timeout".into()));
            }
            self.inner.save(ticket).await
        }
        async fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, RepositoryError> {
            self.inner.list(filter).await
        }
        async fn created_since(&self, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, RepositoryError> {
            self.inner.created_since(since).await
        }
    }

    fn ticket() -> Ticket {
        Ticket::create(
            TicketId::generate(Utc::now()),
            Email::new("jane@example.com").unwrap(),
            "Order hasn't shipped",
            "Order #2021 is late",
            TicketSource::Web,
        )
    }

    async fn wait_for_annotation(repo: &dyn TicketRepository, id: &TicketId) -> Ticket {
        for _ in 0..100 {
            if let Some(t) = repo.find_by_id(id).await.unwrap() {
                if t.ai().is_some() {
                    return t;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("ticket {id} was never annotated");
    }

    #[tokio::test]
    async fn test_processor_annotates_and_publishes() {
        let repo = Arc::new(InMemoryTicketRepository::new());
        let events = Arc::new(InMemoryEventLog::new());
        let t = ticket();
        repo.save(&t).await.unwrap();

        let processor = TicketProcessor::new(repo.clone(), events.clone(), Arc::new(pipeline(0.95, vec![article("KB001")], false)), WriteLock::new());
        let stage = processor.process(t.id()).await.unwrap();
        assert_eq!(stage, PipelineStage::PendingAssignment);

        let stored = repo.find_by_id(t.id()).await.unwrap().unwrap();
        assert_eq!(stored.category(), Some(Category::Shipping));
        assert_eq!(events.count("ticket.annotated"), 1);
    }

    #[tokio::test]
    async fn test_processor_missing_ticket() {
        let repo = Arc::new(InMemoryTicketRepository::new());
        let processor = TicketProcessor::new(repo, Arc::new(InMemoryEventLog::new()), Arc::new(pipeline(0.95, vec![], false)), WriteLock::new());
        let err = processor.process(&TicketId::from_string("TKT-missing")).await.unwrap_err();
        assert!(matches!(err, DeskError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_queue_retries_storage_failures() {
        let repo = Arc::new(FlakyRepository { inner: InMemoryTicketRepository::new(), failures: AtomicU32::new(0) });
        let t = ticket();
        repo.save(&t).await.unwrap();
        repo.failures.store(2, Ordering::SeqCst);

        let processor = Arc::new(TicketProcessor::new(repo.clone(), Arc::new(InMemoryEventLog::new()), Arc::new(pipeline(0.95, vec![], false)), WriteLock::new()));
        let (queue, _worker) = ProcessingQueue::start(processor, 3);
        queue.submit(t.id().clone()).unwrap();

        let annotated = wait_for_annotation(repo.as_ref(), t.id()).await;
        assert_eq!(annotated.category(), Some(Category::Shipping));
        assert_eq!(repo.failures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_worker_stops_when_queue_dropped() {
        let repo = Arc::new(InMemoryTicketRepository::new());
        let processor = Arc::new(TicketProcessor::new(repo, Arc::new(InMemoryEventLog::new()), Arc::new(pipeline(0.95, vec![], false)), WriteLock::new()));
        let (queue, worker) = ProcessingQueue::start(processor, 3);
        drop(queue);
        tokio::time::timeout(Duration::from_secs(1), worker).await.unwrap().unwrap();
    }
}
