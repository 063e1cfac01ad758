use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::customer::CustomerId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub String);

impl TicketId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Chat,
    Phone,
    Ticket,
    Web,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Chat => "chat",
            Self::Phone => "phone",
            Self::Ticket => "ticket",
            Self::Web => "web",
        }
    }
}

impl FromStr for Channel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "chat" => Ok(Self::Chat),
            "phone" => Ok(Self::Phone),
            "ticket" => Ok(Self::Ticket),
            "web" => Ok(Self::Web),
            other => Err(DomainError::Validation {
                field: "channel",
                reason: format!("unsupported channel `{other}` (expected email|chat|phone|ticket|web)"),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(DomainError::Validation {
                field: "priority",
                reason: format!("unsupported priority `{other}` (expected high|medium|low)"),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Billing,
    Faq,
    Bug,
    Shipping,
    Refund,
    Access,
    Complex,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Billing => "billing",
            Self::Faq => "faq",
            Self::Bug => "bug",
            Self::Shipping => "shipping",
            Self::Refund => "refund",
            Self::Access => "access",
            Self::Complex => "complex",
        }
    }
}

impl FromStr for Intent {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "billing" => Ok(Self::Billing),
            "faq" => Ok(Self::Faq),
            "bug" => Ok(Self::Bug),
            "shipping" => Ok(Self::Shipping),
            "refund" => Ok(Self::Refund),
            "access" => Ok(Self::Access),
            "complex" => Ok(Self::Complex),
            other => Err(DomainError::Validation {
                field: "intent",
                reason: format!("unsupported intent `{other}`"),
            }),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    AutoResolve,
    EscalateHuman,
    ContinueConversation,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoResolve => "AUTO_RESOLVE",
            Self::EscalateHuman => "ESCALATE_HUMAN",
            Self::ContinueConversation => "CONTINUE_CONVERSATION",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscalationReason {
    #[serde(rename = "low confidence")]
    LowConfidence,
    #[serde(rename = "high priority")]
    HighPriority,
}

impl EscalationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowConfidence => "low confidence",
            Self::HighPriority => "high priority",
        }
    }
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Resolved,
    Escalated,
}

impl TicketStatus {
    pub fn from_decision(decision: Decision) -> Self {
        match decision {
            Decision::AutoResolve => Self::Resolved,
            Decision::EscalateHuman => Self::Escalated,
            Decision::ContinueConversation => Self::Open,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::Escalated => "escalated",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "resolved" => Ok(Self::Resolved),
            "escalated" => Ok(Self::Escalated),
            other => Err(DomainError::InvariantViolation(format!("unknown ticket status `{other}`"))),
        }
    }
}

/// Identifier as it arrives from callers: dashboards send numbers, APIs send strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    fn normalized(&self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Text(value) => value.trim().to_string(),
        }
    }
}

impl From<&str> for RawId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for RawId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// Inbound ticket shape. Everything is optional at this layer so that missing fields surface
/// as validation errors instead of deserialization failures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RawId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<RawId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    /// Kept as raw JSON so `24.0`, `"24"` or `-1` reach validation instead of failing to parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla_hours: Option<Value>,
}

impl TicketPayload {
    pub fn new(
        id: impl Into<RawId>,
        customer_id: impl Into<RawId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            customer_id: Some(customer_id.into()),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    pub fn with_sla_hours(mut self, sla_hours: u32) -> Self {
        self.sla_hours = Some(Value::from(sla_hours));
        self
    }

    /// Validates the payload shape and normalizes it into a `Ticket`.
    pub fn into_ticket(self) -> Result<Ticket, DomainError> {
        let id = required_id(self.id.as_ref(), "id")?;
        let customer_id = required_id(self.customer_id.as_ref(), "customer_id")?;

        let message = self.message.map(|value| value.trim().to_string()).unwrap_or_default();
        if message.is_empty() {
            return Err(DomainError::Validation { field: "message", reason: "is required".into() });
        }

        let channel = match self.channel.as_deref().map(str::trim) {
            None | Some("") => Channel::Chat,
            Some(value) => value.parse()?,
        };
        let priority_hint = match self.priority.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(value.parse()?),
        };
        let product =
            self.product.map(|value| value.trim().to_string()).filter(|value| !value.is_empty());
        let sla_hours = parse_sla_hours(self.sla_hours.as_ref())?;

        Ok(Ticket {
            id: TicketId(id),
            customer_id: CustomerId(customer_id),
            message,
            channel,
            product,
            priority_hint,
            sla_hours,
        })
    }
}

fn parse_sla_hours(raw: Option<&Value>) -> Result<Option<u32>, DomainError> {
    let hours = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => return Ok(None),
        Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
        Some(Value::Number(number)) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|hours| hours.fract() == 0.0 && *hours >= 0.0)
                .map(|hours| hours as u64)
        }),
        Some(_) => None,
    };

    match hours.and_then(|hours| u32::try_from(hours).ok()) {
        Some(hours) => Ok(Some(hours)),
        None => Err(DomainError::Validation {
            field: "sla_hours",
            reason: "must be a non-negative whole number of hours".into(),
        }),
    }
}

fn required_id(raw: Option<&RawId>, field: &'static str) -> Result<String, DomainError> {
    let value = raw.map(RawId::normalized).unwrap_or_default();
    if value.is_empty() {
        return Err(DomainError::Validation { field, reason: "is required".into() });
    }
    Ok(value)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub customer_id: CustomerId,
    pub message: String,
    pub channel: Channel,
    pub product: Option<String>,
    pub priority_hint: Option<Priority>,
    pub sla_hours: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub ticket_id: TicketId,
    pub intent: Intent,
    pub priority: Priority,
    pub decision: Decision,
    pub confidence: f64,
    pub response_text: String,
    pub customer_segment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_reason: Option<EscalationReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_text: Option<String>,
}

impl DecisionResult {
    pub fn is_escalated(&self) -> bool {
        self.decision == Decision::EscalateHuman
    }

    /// `escalation_reason` is present exactly when the ticket went to a human.
    pub fn escalation_is_consistent(&self) -> bool {
        self.is_escalated() == self.escalation_reason.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub ticket_id: TicketId,
    pub customer_id: CustomerId,
    pub channel: Channel,
    pub message: String,
    pub intent: Intent,
    pub priority: Priority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub full_result: DecisionResult,
}

impl TicketRecord {
    pub fn from_decision(
        ticket: &Ticket,
        result: &DecisionResult,
        created_at: DateTime<Utc>,
    ) -> Self {
        let status = TicketStatus::from_decision(result.decision);
        Self {
            ticket_id: result.ticket_id.clone(),
            customer_id: ticket.customer_id.clone(),
            channel: ticket.channel,
            message: ticket.message.clone(),
            intent: result.intent,
            priority: result.priority,
            status,
            created_at,
            resolved_at: (status == TicketStatus::Resolved).then_some(created_at),
            full_result: result.clone(),
        }
    }
}
