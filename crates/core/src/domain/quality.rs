use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityIssueKind {
    MissingValues,
    EmptyMessage,
    MissingChannel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    #[serde(rename = "type")]
    pub kind: QualityIssueKind,
    pub affected_rows: usize,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub row_count: usize,
    pub quality_score: f64,
    pub issues: Vec<QualityIssue>,
}

impl QualityAssessment {
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataQualityRun {
    pub id: Option<i64>,
    pub dataset_name: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub row_count: i64,
    pub issue_count: i64,
    pub score: f64,
    pub result: serde_json::Value,
}

impl DataQualityRun {
    pub fn from_assessment(
        dataset_name: impl Into<String>,
        uploaded_by: impl Into<String>,
        assessment: &QualityAssessment,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            dataset_name: dataset_name.into(),
            uploaded_by: uploaded_by.into(),
            uploaded_at,
            row_count: assessment.row_count as i64,
            issue_count: assessment.issue_count() as i64,
            score: assessment.quality_score,
            result: serde_json::to_value(assessment).unwrap_or(serde_json::Value::Null),
        }
    }
}
