use fusion_agent::llm::HttpLlmClient;
use fusion_agent::runtime::load_knowledge_base;
use fusion_core::config::AppConfig;
use fusion_db::connect_with_config;
use fusion_db::repositories::SqlTicketRepository;
use serde::Serialize;

use crate::commands::support::{block_on, load_config};
use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 4] =
    ["database_schema", "knowledge_base", "event_log_path", "model_readiness"];

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match load_config() {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_database_schema(&config));
            checks.push(check_knowledge_base(&config));
            checks.push(check_event_log_path(&config));
            checks.push(check_model_readiness(&config));
        }
        Err((_, message, _)) => {
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, message));
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| {
                DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                )
            }));
        }
    }

    summarize(checks)
}

fn summarize(checks: Vec<DoctorCheck>) -> DoctorReport {
    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let (overall_status, summary) = if any_failed {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn check_database_schema(config: &AppConfig) -> DoctorCheck {
    let result = block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let count = SqlTicketRepository::new(pool.clone()).count().await.map_err(|error| {
            ("schema", format!("{error}; run `fusion migrate` to create the schema"), 5u8)
        });
        pool.close().await;
        count
    });

    match result {
        Ok(count) => DoctorCheck::new(
            "database_schema",
            CheckStatus::Pass,
            format!("connected using `{}`; {count} tickets stored", config.database.url),
        ),
        Err((_, message, _)) => DoctorCheck::new("database_schema", CheckStatus::Fail, message),
    }
}

fn check_knowledge_base(config: &AppConfig) -> DoctorCheck {
    let source = config
        .support
        .knowledge_base_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in table".to_string());

    match load_knowledge_base(&config.support) {
        Ok(knowledge_base) => DoctorCheck::new(
            "knowledge_base",
            CheckStatus::Pass,
            format!("{} entries loaded from {source}", knowledge_base.entries().len()),
        ),
        Err(error) => DoctorCheck::new("knowledge_base", CheckStatus::Fail, error.to_string()),
    }
}

fn check_event_log_path(config: &AppConfig) -> DoctorCheck {
    let path = &config.support.event_log_path;

    if path.is_dir() {
        return DoctorCheck::new(
            "event_log_path",
            CheckStatus::Fail,
            format!("`{}` is a directory, expected a JSON Lines file", path.display()),
        );
    }

    DoctorCheck::new(
        "event_log_path",
        CheckStatus::Pass,
        format!("events append to `{}`", path.display()),
    )
}

fn check_model_readiness(config: &AppConfig) -> DoctorCheck {
    if !config.support.enrich_with_model {
        return DoctorCheck::new(
            "model_readiness",
            CheckStatus::Skipped,
            "model enrichment disabled (support.enrich_with_model = false)",
        );
    }

    match HttpLlmClient::from_config(&config.llm) {
        Ok(Some(client)) => DoctorCheck::new(
            "model_readiness",
            CheckStatus::Pass,
            format!(
                "{} client configured for model `{}`",
                client.provider().as_str(),
                config.llm.model
            ),
        ),
        Ok(None) => DoctorCheck::new(
            "model_readiness",
            CheckStatus::Fail,
            "enrichment enabled but llm.provider is disabled",
        ),
        Err(error) => DoctorCheck::new("model_readiness", CheckStatus::Fail, format!("{error:#}")),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
