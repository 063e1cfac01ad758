use std::collections::BTreeMap;

use crate::domain::quality::{QualityAssessment, QualityIssue, QualityIssueKind};
use crate::domain::ticket::TicketPayload;

/// Scores a batch of raw ticket payloads for missing values.
///
/// A row counts once toward the score no matter how many problems it has; `issues` lists
/// each problem kind with the number of rows it affects.
pub fn assess_payloads(rows: &[TicketPayload]) -> QualityAssessment {
    let mut affected_by_kind: BTreeMap<QualityIssueKind, usize> = BTreeMap::new();
    let mut rows_with_issues = 0usize;

    for row in rows {
        let kinds = row_issues(row);
        if !kinds.is_empty() {
            rows_with_issues += 1;
        }
        for kind in kinds {
            *affected_by_kind.entry(kind).or_default() += 1;
        }
    }

    let total = rows.len();
    let quality_score = 1.0 - rows_with_issues as f64 / total.max(1) as f64;
    let issues = affected_by_kind
        .into_iter()
        .map(|(kind, affected_rows)| QualityIssue {
            kind,
            affected_rows,
            detail: describe(kind, affected_rows, total),
        })
        .collect();

    QualityAssessment { row_count: total, quality_score, issues }
}

fn row_issues(row: &TicketPayload) -> Vec<QualityIssueKind> {
    let mut kinds = Vec::new();
    if row.sla_hours.is_none() {
        kinds.push(QualityIssueKind::MissingValues);
    }
    if row.message.as_deref().map(str::trim).unwrap_or_default().is_empty() {
        kinds.push(QualityIssueKind::EmptyMessage);
    }
    if row.channel.as_deref().map(str::trim).unwrap_or_default().is_empty() {
        kinds.push(QualityIssueKind::MissingChannel);
    }
    kinds
}

fn describe(kind: QualityIssueKind, affected: usize, total: usize) -> String {
    match kind {
        QualityIssueKind::MissingValues => {
            format!("{affected} rows have null sla_hours out of {total}.")
        }
        QualityIssueKind::EmptyMessage => {
            format!("{affected} rows have an empty message out of {total}.")
        }
        QualityIssueKind::MissingChannel => {
            format!("{affected} rows have no channel out of {total}.")
        }
    }
}
