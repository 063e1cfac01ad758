use fusion_core::domain::customer::CustomerProfile;
use fusion_core::domain::ticket::{Decision, DecisionResult, Ticket};

/// Builds the enrichment prompt. The routing outcome is stated as settled fact; the model
/// only drafts wording.
pub fn support_reply_prompt(
    ticket: &Ticket,
    profile: &CustomerProfile,
    result: &DecisionResult,
) -> String {
    let mut prompt = String::new();
    prompt.push_str("You are a customer support assistant drafting a reply to a ticket.\n\n");
    prompt.push_str(&format!("Ticket {} via {}:\n", ticket.id, ticket.channel.as_str()));
    prompt.push_str(&format!("\"{}\"\n\n", ticket.message));

    prompt.push_str(&format!("Customer segment: {}\n", profile.segment));
    if let Some(name) = &profile.name {
        prompt.push_str(&format!("Customer name: {name}\n"));
    }
    if let Some(plan) = profile.plan.as_ref().or(ticket.product.as_ref()) {
        prompt.push_str(&format!("Plan: {plan}\n"));
    }

    prompt.push_str(&format!(
        "Classified intent: {} (priority {})\n",
        result.intent,
        result.priority.as_str()
    ));
    prompt.push_str(&format!(
        "Knowledge base answer (confidence {:.2}): {}\n\n",
        result.confidence, result.response_text
    ));

    let instruction = match result.decision {
        Decision::AutoResolve => {
            "The ticket is resolved by the knowledge base answer. Rewrite it as a short, \
             friendly reply addressed to the customer."
        }
        Decision::ContinueConversation => {
            "More information is needed. Write a short reply that shares the answer and asks \
             one clarifying question."
        }
        Decision::EscalateHuman => {
            "A human agent will take over this ticket. Write a short acknowledgement that sets \
             expectations without promising a resolution."
        }
    };
    prompt.push_str(instruction);
    prompt.push_str("\nReply with plain text only. Do not change the routing decision.");
    prompt
}
