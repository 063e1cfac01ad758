use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use fusion_core::domain::ticket::{Intent, TicketPayload};
use fusion_core::errors::ApplicationError;

use crate::runtime::SupportRuntime;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoldCase {
    pub payload: TicketPayload,
    pub expected_intent: Intent,
}

impl GoldCase {
    pub fn new(payload: TicketPayload, expected_intent: Intent) -> Self {
        Self { payload, expected_intent }
    }
}

/// The three canonical support tickets.
pub fn default_gold_cases() -> Vec<GoldCase> {
    vec![
        GoldCase::new(
            TicketPayload::new(11_i64, 1001_i64, "How do I reset password?").with_channel("chat"),
            Intent::Faq,
        ),
        GoldCase::new(
            TicketPayload::new(12_i64, 1002_i64, "My payment failed 3 times").with_channel("email"),
            Intent::Billing,
        ),
        GoldCase::new(
            TicketPayload::new(13_i64, 1003_i64, "App crashes on startup").with_channel("ticket"),
            Intent::Bug,
        ),
    ]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CasePrediction {
    pub ticket_id: String,
    pub expected: Intent,
    pub predicted: Intent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub test_tickets: usize,
    pub accuracy: f64,
    pub per_label: BTreeMap<Intent, LabelMetrics>,
    pub macro_avg: LabelMetrics,
    pub weighted_avg: LabelMetrics,
    pub predictions: Vec<CasePrediction>,
}

/// Replays gold cases through the full runtime, so persistence and event logging apply.
pub async fn evaluate_support(
    runtime: &SupportRuntime,
    cases: &[GoldCase],
) -> Result<EvaluationReport, ApplicationError> {
    let mut predictions = Vec::with_capacity(cases.len());
    for case in cases {
        let result = runtime.process_ticket(case.payload.clone()).await?;
        predictions.push(CasePrediction {
            ticket_id: result.ticket_id.to_string(),
            expected: case.expected_intent,
            predicted: result.intent,
        });
    }

    let report = score(predictions);
    info!(
        event_name = "support.evaluation.completed",
        correlation_id = "evaluation",
        test_tickets = report.test_tickets,
        accuracy = report.accuracy,
        "support evaluation finished"
    );
    Ok(report)
}

pub fn score(predictions: Vec<CasePrediction>) -> EvaluationReport {
    let total = predictions.len();
    let correct = predictions.iter().filter(|case| case.expected == case.predicted).count();

    let labels: BTreeSet<Intent> =
        predictions.iter().flat_map(|case| [case.expected, case.predicted]).collect();

    let per_label: BTreeMap<Intent, LabelMetrics> = labels
        .into_iter()
        .map(|label| {
            let true_positive = predictions
                .iter()
                .filter(|case| case.expected == label && case.predicted == label)
                .count();
            let predicted = predictions.iter().filter(|case| case.predicted == label).count();
            let support = predictions.iter().filter(|case| case.expected == label).count();

            let precision = ratio(true_positive, predicted);
            let recall = ratio(true_positive, support);
            let f1_score = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            (label, LabelMetrics { precision, recall, f1_score, support })
        })
        .collect();

    let macro_avg = average(&per_label, |_| 1.0);
    let weighted_avg = average(&per_label, |metrics| metrics.support as f64);

    EvaluationReport {
        test_tickets: total,
        accuracy: ratio(correct, total),
        per_label,
        macro_avg,
        weighted_avg,
        predictions,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn average(
    per_label: &BTreeMap<Intent, LabelMetrics>,
    weight: impl Fn(&LabelMetrics) -> f64,
) -> LabelMetrics {
    let total_weight: f64 = per_label.values().map(&weight).sum();
    let support = per_label.values().map(|metrics| metrics.support).sum();
    if total_weight == 0.0 {
        return LabelMetrics { precision: 0.0, recall: 0.0, f1_score: 0.0, support };
    }

    let weighted = |field: fn(&LabelMetrics) -> f64| {
        per_label.values().map(|metrics| field(metrics) * weight(metrics)).sum::<f64>()
            / total_weight
    };

    LabelMetrics {
        precision: weighted(|metrics| metrics.precision),
        recall: weighted(|metrics| metrics.recall),
        f1_score: weighted(|metrics| metrics.f1_score),
        support,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fusion_core::domain::ticket::Intent;
    use fusion_core::events::InMemoryEventSink;
    use fusion_core::support::store::StaticProfileDirectory;
    use fusion_db::repositories::InMemoryTicketStore;

    use super::{default_gold_cases, evaluate_support, score, CasePrediction};
    use crate::runtime::SupportRuntime;

    fn prediction(expected: Intent, predicted: Intent) -> CasePrediction {
        CasePrediction { ticket_id: "T".to_string(), expected, predicted }
    }

    #[tokio::test]
    async fn canonical_gold_set_scores_perfectly() {
        let runtime = SupportRuntime::new(
            Arc::new(StaticProfileDirectory::default()),
            Arc::new(InMemoryTicketStore::default()),
            Arc::new(InMemoryEventSink::default()),
        );

        let report = evaluate_support(&runtime, &default_gold_cases()).await.expect("evaluate");

        assert_eq!(report.test_tickets, 3);
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.per_label.len(), 3);
        assert!(report.per_label.values().all(|metrics| metrics.f1_score == 1.0));
        assert_eq!(report.weighted_avg.support, 3);
    }

    #[test]
    fn misclassification_lowers_precision_and_recall() {
        let report = score(vec![
            prediction(Intent::Faq, Intent::Faq),
            prediction(Intent::Billing, Intent::Faq),
            prediction(Intent::Bug, Intent::Bug),
        ]);

        assert!((report.accuracy - 2.0 / 3.0).abs() < 1e-9);

        let faq = &report.per_label[&Intent::Faq];
        assert_eq!(faq.precision, 0.5);
        assert_eq!(faq.recall, 1.0);
        assert_eq!(faq.support, 1);

        let billing = &report.per_label[&Intent::Billing];
        assert_eq!(billing.precision, 0.0);
        assert_eq!(billing.recall, 0.0);
        assert_eq!(billing.f1_score, 0.0);
    }

    #[test]
    fn predicted_only_label_has_zero_support() {
        let report = score(vec![prediction(Intent::Bug, Intent::Complex)]);

        let complex = &report.per_label[&Intent::Complex];
        assert_eq!(complex.support, 0);
        assert_eq!(complex.recall, 0.0);
        assert_eq!(report.accuracy, 0.0);
    }

    #[test]
    fn empty_run_is_zero_not_nan() {
        let report = score(Vec::new());
        assert_eq!(report.test_tickets, 0);
        assert_eq!(report.accuracy, 0.0);
        assert_eq!(report.macro_avg.precision, 0.0);
    }
}
