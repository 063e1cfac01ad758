use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lru::LruCache;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn, Level};

use fusion_core::config::{AppConfig, PersistPolicy, SupportConfig};
use fusion_core::domain::customer::{CustomerId, CustomerProfile};
use fusion_core::domain::ticket::{DecisionResult, Ticket, TicketId, TicketPayload, TicketRecord};
use fusion_core::errors::{ApplicationError, DomainError};
use fusion_core::events::{EventSink, ObservabilityEvent, EVENT_PROCESSED};
use fusion_core::support::engine::DecisionEngine;
use fusion_core::support::knowledge::KnowledgeBase;
use fusion_core::support::store::{LookupError, ProfileDirectory, TicketStore};

use crate::llm::LlmClient;
use crate::prompt::support_reply_prompt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupportSettings {
    pub persist_policy: PersistPolicy,
    pub persist_timeout: Duration,
    pub enrich_with_model: bool,
    pub model_timeout: Duration,
    pub history_limit: u32,
    /// Upper bound on tracked session states and save-failure counters. Least recently
    /// touched ticket ids are evicted first.
    pub session_capacity: usize,
}

impl Default for SupportSettings {
    fn default() -> Self {
        Self {
            persist_policy: PersistPolicy::Escalated,
            persist_timeout: Duration::from_millis(3_000),
            enrich_with_model: false,
            model_timeout: Duration::from_secs(5),
            history_limit: 10,
            session_capacity: 1_024,
        }
    }
}

impl SupportSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            persist_policy: config.support.persist_policy,
            persist_timeout: Duration::from_millis(config.support.persist_timeout_ms),
            enrich_with_model: config.support.enrich_with_model,
            model_timeout: Duration::from_secs(config.llm.timeout_secs),
            history_limit: config.support.history_limit,
            session_capacity: config.support.session_capacity as usize,
        }
    }

    fn should_persist(&self, result: &DecisionResult) -> bool {
        match self.persist_policy {
            PersistPolicy::Escalated => result.is_escalated(),
            PersistPolicy::All => true,
        }
    }

    fn session_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.session_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

/// Severity for a failed save: the first failure for a ticket is a warning, repeats need an
/// operator.
pub fn persist_failure_level(attempts: u32) -> Level {
    if attempts > 1 {
        Level::ERROR
    } else {
        Level::WARN
    }
}

/// Knowledge base from `support.knowledge_base_path`, or the built-in table.
pub fn load_knowledge_base(config: &SupportConfig) -> Result<KnowledgeBase, ApplicationError> {
    match &config.knowledge_base_path {
        Some(path) => KnowledgeBase::from_json_file(path)
            .map_err(|error| ApplicationError::Configuration(error.to_string())),
        None => Ok(KnowledgeBase::default()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Received,
    Decided,
}

/// Routes ticket payloads through lookup, decision, persistence and logging. Holds no
/// business rules of its own.
pub struct SupportRuntime {
    engine: DecisionEngine,
    knowledge_base: KnowledgeBase,
    profiles: Arc<dyn ProfileDirectory>,
    store: Arc<dyn TicketStore>,
    events: Arc<dyn EventSink>,
    llm: Option<Arc<dyn LlmClient>>,
    settings: SupportSettings,
    sessions: Mutex<LruCache<TicketId, SessionState>>,
    persist_failures: Mutex<LruCache<TicketId, u32>>,
}

impl SupportRuntime {
    pub fn new(
        profiles: Arc<dyn ProfileDirectory>,
        store: Arc<dyn TicketStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let settings = SupportSettings::default();
        let capacity = settings.session_capacity();
        Self {
            engine: DecisionEngine::default(),
            knowledge_base: KnowledgeBase::default(),
            profiles,
            store,
            events,
            llm: None,
            settings,
            sessions: Mutex::new(LruCache::new(capacity)),
            persist_failures: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn with_engine(mut self, engine: DecisionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_knowledge_base(mut self, knowledge_base: KnowledgeBase) -> Self {
        self.knowledge_base = knowledge_base;
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_settings(mut self, settings: SupportSettings) -> Self {
        let capacity = settings.session_capacity();
        self.sessions = Mutex::new(LruCache::new(capacity));
        self.persist_failures = Mutex::new(LruCache::new(capacity));
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SupportSettings {
        &self.settings
    }

    pub async fn process_ticket(
        &self,
        payload: TicketPayload,
    ) -> Result<DecisionResult, ApplicationError> {
        let ticket = payload.into_ticket().map_err(|error| {
            warn!(
                event_name = "support.ticket.rejected",
                error = %error,
                "ticket payload failed validation"
            );
            ApplicationError::from(error)
        })?;
        let correlation_id = ticket.id.to_string();

        self.set_session(&ticket.id, SessionState::Received).await;
        info!(
            event_name = "support.ticket.received",
            correlation_id = %correlation_id,
            customer_id = %ticket.customer_id,
            channel = ticket.channel.as_str(),
            "ticket received"
        );

        let profile = self.lookup_profile(&ticket).await;
        let kb_match = self.knowledge_base.match_query(&ticket.message);
        let mut result = self.engine.decide(&ticket, &profile, &kb_match);

        info!(
            event_name = "support.ticket.decided",
            correlation_id = %correlation_id,
            intent = result.intent.as_str(),
            priority = result.priority.as_str(),
            decision = result.decision.as_str(),
            confidence = result.confidence,
            segment = %result.customer_segment,
            "ticket decided"
        );

        if self.settings.should_persist(&result) {
            self.persist(&ticket, &result).await;
        }

        if self.settings.enrich_with_model {
            result.model_text = self.enrich(&ticket, &profile, &result).await;
        }

        self.record_event(&result);
        self.set_session(&ticket.id, SessionState::Decided).await;

        Ok(result)
    }

    pub async fn ticket_history(
        &self,
        customer_id: &CustomerId,
        limit: Option<u32>,
    ) -> Result<Vec<TicketRecord>, ApplicationError> {
        let limit = match limit {
            Some(0) => {
                return Err(DomainError::Validation {
                    field: "limit",
                    reason: "must be greater than zero".into(),
                }
                .into())
            }
            Some(limit) => limit,
            None => self.settings.history_limit,
        };
        self.store.list_tickets(customer_id, limit).await
    }

    /// Last known state for a ticket id among the most recently processed tickets.
    pub async fn session_state(&self, ticket_id: &TicketId) -> Option<SessionState> {
        self.sessions.lock().await.peek(ticket_id).copied()
    }

    async fn set_session(&self, ticket_id: &TicketId, state: SessionState) {
        self.sessions.lock().await.put(ticket_id.clone(), state);
    }

    async fn lookup_profile(&self, ticket: &Ticket) -> CustomerProfile {
        match self.profiles.get_profile(&ticket.customer_id).await {
            Ok(profile) => profile,
            Err(LookupError::NotFound(customer_id)) => {
                debug!(
                    event_name = "support.profile.missing",
                    correlation_id = %ticket.id,
                    customer_id = %customer_id,
                    "no customer profile, using unknown segment"
                );
                CustomerProfile::unknown(ticket.customer_id.clone())
            }
            Err(error) => {
                warn!(
                    event_name = "support.profile.unavailable",
                    correlation_id = %ticket.id,
                    error = %error,
                    "customer directory failed, using unknown segment"
                );
                CustomerProfile::unknown(ticket.customer_id.clone())
            }
        }
    }

    async fn persist(&self, ticket: &Ticket, result: &DecisionResult) {
        let record = TicketRecord::from_decision(ticket, result, Utc::now());
        let status = record.status;

        let failure = match tokio::time::timeout(
            self.settings.persist_timeout,
            self.store.save_ticket(record),
        )
        .await
        {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(error.to_string()),
            Err(_) => Some(format!(
                "save timed out after {}ms",
                self.settings.persist_timeout.as_millis()
            )),
        };

        match failure {
            None => {
                self.persist_failures.lock().await.pop(&ticket.id);
                info!(
                    event_name = "support.ticket.persisted",
                    correlation_id = %ticket.id,
                    status = status.as_str(),
                    "ticket record saved"
                );
            }
            Some(reason) => {
                let attempts = {
                    let mut failures = self.persist_failures.lock().await;
                    let count = failures.get(&ticket.id).copied().unwrap_or(0) + 1;
                    failures.put(ticket.id.clone(), count);
                    count
                };
                if persist_failure_level(attempts) == Level::ERROR {
                    error!(
                        event_name = "support.ticket.persist_failed",
                        correlation_id = %ticket.id,
                        attempts,
                        error = %reason,
                        "ticket record failed to save again; operator attention required"
                    );
                } else {
                    warn!(
                        event_name = "support.ticket.persist_failed",
                        correlation_id = %ticket.id,
                        attempts,
                        error = %reason,
                        "ticket record failed to save; decision stands"
                    );
                }
            }
        }
    }

    /// Returns the number of consecutive save failures recorded for a ticket id.
    pub async fn persist_failure_count(&self, ticket_id: &TicketId) -> u32 {
        self.persist_failures.lock().await.peek(ticket_id).copied().unwrap_or(0)
    }

    async fn enrich(
        &self,
        ticket: &Ticket,
        profile: &CustomerProfile,
        result: &DecisionResult,
    ) -> Option<String> {
        let llm = self.llm.as_ref()?;
        let prompt = support_reply_prompt(ticket, profile, result);

        match tokio::time::timeout(self.settings.model_timeout, llm.complete(&prompt)).await {
            Ok(Ok(text)) => Some(text),
            Ok(Err(error)) => {
                warn!(
                    event_name = "support.model.failed",
                    correlation_id = %ticket.id,
                    error = %error,
                    "model enrichment failed"
                );
                None
            }
            Err(_) => {
                warn!(
                    event_name = "support.model.timeout",
                    correlation_id = %ticket.id,
                    timeout_ms = self.settings.model_timeout.as_millis() as u64,
                    "model enrichment timed out"
                );
                None
            }
        }
    }

    fn record_event(&self, result: &DecisionResult) {
        let payload = match serde_json::to_value(result) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(
                    event_name = "support.event.encode_failed",
                    correlation_id = %result.ticket_id,
                    error = %error,
                    "could not encode decision for the event log"
                );
                return;
            }
        };

        let event = ObservabilityEvent::new(result.ticket_id.clone(), EVENT_PROCESSED, payload);
        if let Err(error) = self.events.append(&event) {
            warn!(
                event_name = "support.event.append_failed",
                correlation_id = %result.ticket_id,
                error = %error,
                "could not append to the event log"
            );
        }
    }
}
