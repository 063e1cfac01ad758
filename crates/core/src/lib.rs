//! Deterministic ticket routing for the FusionDesk support agent.
//!
//! `support` holds the knowledge-base matcher, the keyword classifier and the decision
//! engine. Everything in this crate is free of I/O except the event log and the optional
//! file loaders for reference data; collaborators are reached through the traits in
//! `support::store` and `events`.

pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod quality;
pub mod support;

pub use domain::customer::{CustomerId, CustomerProfile};
pub use domain::quality::{DataQualityRun, QualityAssessment, QualityIssue, QualityIssueKind};
pub use domain::ticket::{
    Channel, Decision, DecisionResult, EscalationReason, Intent, Priority, Ticket, TicketId,
    TicketPayload, TicketRecord, TicketStatus,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use events::{EventSink, InMemoryEventSink, JsonlEventSink, ObservabilityEvent};
pub use support::engine::{DecisionEngine, DecisionPolicy};
pub use support::knowledge::{KnowledgeBase, KnowledgeBaseMatch, KnowledgeEntry};
pub use support::store::{LookupError, ProfileDirectory, StaticProfileDirectory, TicketStore};
