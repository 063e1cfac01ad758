use crate::domain::ticket::{Intent, Priority, Ticket};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordFamily {
    pub intent: Intent,
    pub keywords: Vec<String>,
}

impl KeywordFamily {
    pub fn new(intent: Intent, keywords: &[&str]) -> Self {
        Self { intent, keywords: keywords.iter().map(|keyword| keyword.to_lowercase()).collect() }
    }

    fn matches(&self, normalized_message: &str) -> bool {
        self.keywords.iter().any(|keyword| normalized_message.contains(keyword.as_str()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriorityRule {
    pub keyword: String,
    pub priority: Priority,
}

/// Keyword heuristics for intent and priority.
///
/// Intent resolution order: strong domain families, then a confident KB hit (`faq`), then
/// weak families, then `complex`. Priority resolution order: explicit caller priority, SLA
/// hours, keyword table, `medium`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketClassifier {
    strong_families: Vec<KeywordFamily>,
    weak_families: Vec<KeywordFamily>,
    priority_rules: Vec<PriorityRule>,
}

impl Default for TicketClassifier {
    fn default() -> Self {
        Self {
            strong_families: vec![
                KeywordFamily::new(Intent::Refund, &["refund", "money back", "chargeback"]),
                KeywordFamily::new(
                    Intent::Billing,
                    &["payment", "billing", "invoice", "charged", "card"],
                ),
                KeywordFamily::new(Intent::Bug, &["crash", "bug", "error", "broken", "not working"]),
            ],
            weak_families: vec![
                KeywordFamily::new(
                    Intent::Shipping,
                    &["shipping", "delivery", "tracking", "package", "order"],
                ),
                KeywordFamily::new(
                    Intent::Access,
                    &["login", "log in", "sign in", "locked out", "password", "access"],
                ),
            ],
            priority_rules: ["payment", "refund", "crash"]
                .into_iter()
                .map(|keyword| PriorityRule { keyword: keyword.to_string(), priority: Priority::High })
                .collect(),
        }
    }
}

impl TicketClassifier {
    pub fn new(
        strong_families: Vec<KeywordFamily>,
        weak_families: Vec<KeywordFamily>,
        priority_rules: Vec<PriorityRule>,
    ) -> Self {
        let priority_rules = priority_rules
            .into_iter()
            .map(|rule| PriorityRule { keyword: rule.keyword.to_lowercase(), ..rule })
            .collect();
        Self { strong_families, weak_families, priority_rules }
    }

    pub fn infer_intent(&self, message: &str, kb_confidence: f64, faq_above: f64) -> Intent {
        let normalized = message.to_lowercase();

        if let Some(family) = self.strong_families.iter().find(|family| family.matches(&normalized))
        {
            return family.intent;
        }
        if kb_confidence > faq_above {
            return Intent::Faq;
        }
        self.weak_families
            .iter()
            .find(|family| family.matches(&normalized))
            .map(|family| family.intent)
            .unwrap_or(Intent::Complex)
    }

    /// Priority from the message text alone.
    pub fn infer_priority(&self, message: &str) -> Priority {
        let normalized = message.to_lowercase();
        self.priority_rules
            .iter()
            .find(|rule| normalized.contains(rule.keyword.as_str()))
            .map(|rule| rule.priority)
            .unwrap_or(Priority::Medium)
    }

    /// Caller-supplied hints take precedence over the keyword table.
    pub fn resolve_priority(&self, ticket: &Ticket) -> Priority {
        ticket
            .priority_hint
            .or_else(|| ticket.sla_hours.map(priority_from_sla_hours))
            .unwrap_or_else(|| self.infer_priority(&ticket.message))
    }
}

pub fn priority_from_sla_hours(sla_hours: u32) -> Priority {
    match sla_hours {
        0..=4 => Priority::High,
        5..=24 => Priority::Medium,
        _ => Priority::Low,
    }
}
