use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerProfile;
use crate::domain::ticket::{
    Decision, DecisionResult, EscalationReason, Intent, Priority, Ticket,
};
use crate::support::classify::TicketClassifier;
use crate::support::knowledge::KnowledgeBaseMatch;

/// Thresholds for the routing policy. Comparisons are strict: a confidence of exactly
/// `escalate_below` does not escalate and exactly `auto_resolve_above` does not auto-resolve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    pub escalate_below: f64,
    pub auto_resolve_above: f64,
    pub faq_above: f64,
    pub manual_intents: Vec<Intent>,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            escalate_below: 0.5,
            auto_resolve_above: 0.8,
            faq_above: 0.7,
            manual_intents: vec![Intent::Billing, Intent::Refund],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    AutoResolve,
    Continue,
    Escalate(EscalationReason),
}

impl Route {
    fn into_parts(self) -> (Decision, Option<EscalationReason>) {
        match self {
            Self::AutoResolve => (Decision::AutoResolve, None),
            Self::Continue => (Decision::ContinueConversation, None),
            Self::Escalate(reason) => (Decision::EscalateHuman, Some(reason)),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DecisionEngine {
    policy: DecisionPolicy,
    classifier: TicketClassifier,
}

impl DecisionEngine {
    pub fn new(policy: DecisionPolicy, classifier: TicketClassifier) -> Self {
        Self { policy, classifier }
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Routes one ticket. Pure: identical inputs always produce identical results.
    pub fn decide(
        &self,
        ticket: &Ticket,
        profile: &CustomerProfile,
        kb_match: &KnowledgeBaseMatch,
    ) -> DecisionResult {
        let confidence = kb_match.confidence;
        let intent =
            self.classifier.infer_intent(&ticket.message, confidence, self.policy.faq_above);
        let priority = self.classifier.resolve_priority(ticket);

        let route = self.route(confidence, intent, priority);
        let (decision, escalation_reason) = route.into_parts();

        let response_text = match escalation_reason {
            Some(reason) => format!("[escalated: {reason}] {}", kb_match.answer),
            None => kb_match.answer.clone(),
        };

        DecisionResult {
            ticket_id: ticket.id.clone(),
            intent,
            priority,
            decision,
            confidence,
            response_text,
            customer_segment: profile.segment.clone(),
            escalation_reason,
            model_text: None,
        }
    }

    fn route(&self, confidence: f64, intent: Intent, priority: Priority) -> Route {
        if confidence < self.policy.escalate_below {
            return Route::Escalate(EscalationReason::LowConfidence);
        }
        if priority == Priority::High {
            return Route::Escalate(EscalationReason::HighPriority);
        }
        if confidence > self.policy.auto_resolve_above
            && !self.policy.manual_intents.contains(&intent)
        {
            return Route::AutoResolve;
        }
        Route::Continue
    }
}
