//! # Event Bus System
//!
//! Provides an event-driven view of catalog scans using `tokio::sync::broadcast`.
//! Status pages and host applications subscribe to the bus instead of polling
//! the progress tracker.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for scans and library changes
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐     subscribe    ┌────────────┐
//! │ Scan runner  ├──────────────>│ EventBus  ├─────────────────>│ Subscriber │
//! └──────────────┘               │ (broadcast│                  └────────────┘
//! ┌──────────────┐     emit      │  channel) │     subscribe    ┌────────────┐
//! │ Orphan reaper├──────────────>│           ├─────────────────>│ Subscriber │
//! └──────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, ScanEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Scan(ScanEvent::Started {
//!         scan_id: "scan-1".to_string(),
//!         full: false,
//!     }))
//!     .ok();
//!
//! assert!(receiver.try_recv().is_ok());
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Emitting with no subscribers returns `SendError`; publishers ignore it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Scan lifecycle events
    Scan(ScanEvent),
    /// Library content changes
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Scan(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Scan(ScanEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Scan(ScanEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Scan(ScanEvent::Started { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Scan Events
// ============================================================================

/// Events emitted while a catalog scan runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ScanEvent {
    /// Scan accepted and started.
    Started {
        /// Unique identifier for this scan.
        scan_id: String,
        /// Whether this is a full resync or an incremental scan.
        full: bool,
    },
    /// The scan moved to a new phase.
    PhaseChanged {
        scan_id: String,
        /// Phase name (e.g. "scanning_catalog").
        phase: String,
    },
    /// Counter update.
    Progress {
        scan_id: String,
        phase: String,
        /// Tracks read from the remote catalog so far.
        scanned: u64,
        /// Queued tracks processed by enrichment so far.
        enriched: u64,
        /// Total queued tracks.
        enrich_total: u64,
    },
    /// Scan finished successfully.
    Completed {
        scan_id: String,
        inserted: u64,
        replaced: u64,
        /// Recordings removed by the orphan reaper.
        deleted: u64,
        /// Canonical ids the resolver did not return.
        unresolved: u64,
        duration_ms: u64,
    },
    /// Scan aborted.
    Failed {
        scan_id: String,
        /// Phase in which the failure happened.
        phase: String,
        /// Index of the lookup batch being written, if any.
        batch_index: Option<u64>,
        /// Human-readable error message.
        message: String,
    },
}

impl ScanEvent {
    fn description(&self) -> &str {
        match self {
            ScanEvent::Started { .. } => "Scan started",
            ScanEvent::PhaseChanged { .. } => "Scan phase changed",
            ScanEvent::Progress { .. } => "Scan in progress",
            ScanEvent::Completed { .. } => "Scan completed successfully",
            ScanEvent::Failed { .. } => "Scan failed",
        }
    }

    /// Scan identifier carried by every variant.
    pub fn scan_id(&self) -> &str {
        match self {
            ScanEvent::Started { scan_id, .. }
            | ScanEvent::PhaseChanged { scan_id, .. }
            | ScanEvent::Progress { scan_id, .. }
            | ScanEvent::Completed { scan_id, .. }
            | ScanEvent::Failed { scan_id, .. } => scan_id,
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events related to library content changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A lookup batch was committed.
    BatchCommitted {
        batch_index: u64,
        inserted: u64,
        replaced: u64,
    },
    /// Orphaned rows were removed after a completed pass.
    OrphansReaped {
        recordings: u64,
        artists: u64,
        tags: u64,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::BatchCommitted { .. } => "Lookup batch committed",
            LibraryEvent::OrphansReaped { .. } => "Orphaned entries removed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for core events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers that fall behind by more than `capacity` events receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let scans_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Scan(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events that match `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(id: &str) -> CoreEvent {
        CoreEvent::Scan(ScanEvent::Started {
            scan_id: id.to_string(),
            full: true,
        })
    }

    #[test]
    fn test_emit_without_subscribers_is_an_error() {
        let bus = EventBus::new(10);
        assert!(bus.emit(started("scan-1")).is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit(started("scan-1")).unwrap();
        bus.emit(CoreEvent::Library(LibraryEvent::OrphansReaped {
            recordings: 3,
            artists: 1,
            tags: 0,
        }))
        .unwrap();

        assert_eq!(rx.recv().await.unwrap(), started("scan-1"));
        assert!(matches!(
            rx.recv().await.unwrap(),
            CoreEvent::Library(LibraryEvent::OrphansReaped { recordings: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_event_stream_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Scan(ScanEvent::Failed { .. })));

        bus.emit(started("scan-1")).unwrap();
        bus.emit(CoreEvent::Scan(ScanEvent::Failed {
            scan_id: "scan-1".to_string(),
            phase: "enriching_metadata".to_string(),
            batch_index: Some(2),
            message: "disk full".to_string(),
        }))
        .unwrap();

        let event = stream.recv().await.unwrap();
        assert_eq!(event.severity(), EventSeverity::Error);
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());

        for i in 0..5 {
            bus.emit(started(&format!("scan-{i}"))).unwrap();
        }

        assert!(matches!(stream.try_recv(), Some(Err(RecvError::Lagged(_)))));
    }

    #[test]
    fn test_scan_event_serialization() {
        let event = started("scan-7");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Scan\""));
        assert!(json.contains("\"event\":\"Started\""));

        let decoded: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
        if let CoreEvent::Scan(scan) = decoded {
            assert_eq!(scan.scan_id(), "scan-7");
        }
    }
}
