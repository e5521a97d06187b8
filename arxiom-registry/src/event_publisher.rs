//! Event Publisher - ordered notifications for registry state changes
//!
//! Every committed `post_problem`, `submit_solution` and `select_winner`
//! produces one [`RegistryEvent`]. The publisher appends it to an in-memory
//! audit log and fans it out to live subscribers. Observers that missed the
//! live stream can replay the log.

use crate::models::{ProblemId, RegistryEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Configuration for the event publisher
#[derive(Debug, Clone)]
pub struct EventPublisherConfig {
    /// Buffered events per live subscriber before it starts lagging
    pub channel_capacity: usize,
}

impl Default for EventPublisherConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// An event as stored in the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    /// Position in the log, starting at 0
    pub sequence: u64,
    pub event: RegistryEvent,
    pub created_at: DateTime<Utc>,
}

pub struct EventPublisher {
    log: RwLock<Vec<EventRecord>>,
    sender: broadcast::Sender<EventRecord>,
}

impl EventPublisher {
    pub fn new(config: EventPublisherConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));

        Self {
            log: RwLock::new(Vec::new()),
            sender,
        }
    }

    /// Append an event to the log and notify subscribers
    pub async fn publish(&self, event: RegistryEvent) -> EventRecord {
        let mut log = self.log.write().await;

        let record = EventRecord {
            id: Uuid::new_v4(),
            sequence: log.len() as u64,
            event,
            created_at: Utc::now(),
        };
        log.push(record.clone());

        info!(
            "Published {} event #{} for problem {}",
            record.event.name(),
            record.sequence,
            record.event.problem_id()
        );

        // Sending under the log guard keeps live delivery in log order.
        if self.sender.send(record.clone()).is_err() {
            debug!("No live subscribers for event #{}", record.sequence);
        }

        record
    }

    /// Receive events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    /// Full audit log in publication order
    pub async fn events(&self) -> Vec<EventRecord> {
        self.log.read().await.clone()
    }

    /// Audit log entries for one problem
    pub async fn events_for_problem(&self, problem_id: ProblemId) -> Vec<EventRecord> {
        self.log
            .read()
            .await
            .iter()
            .filter(|record| record.event.problem_id() == problem_id)
            .cloned()
            .collect()
    }

    pub async fn event_count(&self) -> usize {
        self.log.read().await.len()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(EventPublisherConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posted(problem_id: ProblemId) -> RegistryEvent {
        RegistryEvent::ProblemPosted {
            problem_id,
            creator: "researcher".into(),
            bounty_amount: 100,
            metadata_ipfs: "QmProblem".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_assigns_sequence() {
        let publisher = EventPublisher::default();

        let first = publisher.publish(posted(1)).await;
        let second = publisher.publish(posted(2)).await;

        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_ne!(first.id, second.id);
        assert_eq!(publisher.event_count().await, 2);
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let publisher = EventPublisher::default();
        let mut receiver = publisher.subscribe();

        publisher.publish(posted(1)).await;
        publisher.publish(posted(2)).await;

        assert_eq!(receiver.recv().await.unwrap().event.problem_id(), 1);
        assert_eq!(receiver.recv().await.unwrap().event.problem_id(), 2);
    }

    #[tokio::test]
    async fn test_events_for_problem_filters() {
        let publisher = EventPublisher::default();
        publisher.publish(posted(1)).await;
        publisher
            .publish(RegistryEvent::SolutionSubmitted {
                problem_id: 2,
                solver: "solver".into(),
                solution_ipfs: "QmSolution".to_string(),
            })
            .await;
        publisher.publish(posted(2)).await;

        let events = publisher.events_for_problem(2).await;
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|r| r.event.problem_id() == 2));
    }
}
