use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ticket::TicketId;

pub const EVENT_PROCESSED: &str = "processed";

/// One line of the observability log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityEvent {
    pub timestamp: DateTime<Utc>,
    pub ticket_id: TicketId,
    pub event_kind: String,
    pub payload: serde_json::Value,
}

impl ObservabilityEvent {
    pub fn new(
        ticket_id: TicketId,
        event_kind: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self { timestamp: Utc::now(), ticket_id, event_kind: event_kind.into(), payload }
    }
}

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("could not open event log `{path}`: {source}")]
    Open { path: PathBuf, source: std::io::Error },
    #[error("could not append to event log `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("could not encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only destination for observability events. Implementations never rewrite or
/// compact earlier entries.
pub trait EventSink: Send + Sync {
    fn append(&self, event: &ObservabilityEvent) -> Result<(), EventLogError>;
}

#[derive(Clone, Default)]
pub struct InMemoryEventSink {
    events: Arc<Mutex<Vec<ObservabilityEvent>>>,
}

impl InMemoryEventSink {
    pub fn events(&self) -> Vec<ObservabilityEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for InMemoryEventSink {
    fn append(&self, event: &ObservabilityEvent) -> Result<(), EventLogError> {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
        Ok(())
    }
}

/// JSON Lines file sink. Each append opens the file in append mode and writes a single
/// line under a process-local lock so concurrent tickets never interleave partial lines.
pub struct JsonlEventSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlEventSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Result<Vec<ObservabilityEvent>, EventLogError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(EventLogError::Open { path: self.path.clone(), source }),
        };

        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(EventLogError::from))
            .collect()
    }
}

impl EventSink for JsonlEventSink {
    fn append(&self, event: &ObservabilityEvent) -> Result<(), EventLogError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| EventLogError::Open { path: self.path.clone(), source })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| EventLogError::Open { path: self.path.clone(), source })?;
        file.write_all(line.as_bytes())
            .map_err(|source| EventLogError::Write { path: self.path.clone(), source })
    }
}
