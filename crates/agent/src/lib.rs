//! Support agent runtime.
//!
//! `runtime` wires a ticket payload through profile lookup, the knowledge base and the
//! deterministic decision engine from `fusion-core`, then persists and logs the outcome.
//! The language model is optional and only ever rewrites wording (`prompt`, `llm`): it never
//! influences intent, priority or the routing decision.

pub mod evaluation;
pub mod llm;
pub mod prompt;
pub mod runtime;

pub use evaluation::{default_gold_cases, evaluate_support, EvaluationReport, GoldCase};
pub use llm::{HttpLlmClient, LlmClient};
pub use runtime::{load_knowledge_base, SessionState, SupportRuntime, SupportSettings};
