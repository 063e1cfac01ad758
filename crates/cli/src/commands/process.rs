use std::fs;
use std::path::Path;

use anyhow::Context;
use fusion_core::domain::ticket::{RawId, TicketPayload};
use fusion_core::errors::ApplicationError;

use crate::commands::support::{block_on, load_config, open_database, support_runtime, to_data};
use crate::commands::{CommandFailure, CommandResult};
use crate::ProcessArgs;

pub fn run(args: ProcessArgs) -> CommandResult {
    let payload = match payload_from_args(args) {
        Ok(payload) => payload,
        Err(error) => {
            return CommandResult::failure("process", "payload_read", format!("{error:#}"), 2);
        }
    };

    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("process", failure),
    };

    let result = block_on(async {
        let pool = open_database(&config).await?;
        let runtime = support_runtime(&config, pool.clone())?;
        let outcome = runtime.process_ticket(payload).await.map_err(processing_failure);
        pool.close().await;
        outcome
    });

    match result {
        Ok(decision) => CommandResult::success_with_data(
            "process",
            format!(
                "ticket {} routed: {} ({} priority, intent {})",
                decision.ticket_id,
                decision.decision.as_str(),
                decision.priority.as_str(),
                decision.intent
            ),
            to_data(&decision),
        ),
        Err(failure) => CommandResult::from_failure("process", failure),
    }
}

pub(crate) fn processing_failure(error: ApplicationError) -> CommandFailure {
    if error.is_validation() {
        ("validation", error.to_string(), 2)
    } else {
        ("processing", error.to_string(), 5)
    }
}

fn payload_from_args(args: ProcessArgs) -> anyhow::Result<TicketPayload> {
    if let Some(path) = &args.file {
        return read_payload(path);
    }

    Ok(TicketPayload {
        id: args.id.map(RawId::Text),
        customer_id: args.customer.map(RawId::Text),
        message: args.message,
        channel: args.channel,
        priority: args.priority,
        product: args.product,
        sla_hours: args.sla_hours.map(serde_json::Value::from),
    })
}

fn read_payload(path: &Path) -> anyhow::Result<TicketPayload> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read ticket payload `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("ticket payload `{}` is not valid JSON", path.display()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use fusion_core::domain::ticket::RawId;
    use fusion_core::errors::{ApplicationError, DomainError};
    use tempfile::TempDir;

    use super::{payload_from_args, processing_failure};
    use crate::ProcessArgs;

    #[test]
    fn inline_arguments_build_a_text_id_payload() {
        let payload = payload_from_args(ProcessArgs {
            id: Some("11".to_string()),
            customer: Some("1001".to_string()),
            message: Some("How do I reset password?".to_string()),
            ..ProcessArgs::default()
        })
        .expect("payload");

        assert_eq!(payload.id, Some(RawId::Text("11".to_string())));
        assert_eq!(payload.channel, None);
    }

    #[test]
    fn file_payload_accepts_numeric_ids() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("ticket.json");
        fs::write(&path, r#"{"id": 12, "customer_id": 1002, "message": "My payment failed"}"#)
            .expect("write payload");

        let payload =
            payload_from_args(ProcessArgs { file: Some(path), ..ProcessArgs::default() })
                .expect("payload");

        assert_eq!(payload.id, Some(RawId::Number(12)));
        assert_eq!(payload.customer_id, Some(RawId::Number(1002)));
    }

    #[test]
    fn unreadable_file_reports_path() {
        let error = payload_from_args(ProcessArgs {
            file: Some("/nonexistent/ticket.json".into()),
            ..ProcessArgs::default()
        })
        .expect_err("missing file");

        assert!(format!("{error:#}").contains("/nonexistent/ticket.json"));
    }

    #[test]
    fn validation_errors_exit_with_code_two() {
        let error = ApplicationError::Domain(DomainError::Validation {
            field: "message",
            reason: "is required".to_string(),
        });
        let (class, _, code) = processing_failure(error);
        assert_eq!((class, code), ("validation", 2));

        let (class, _, code) = processing_failure(ApplicationError::Persistence("down".into()));
        assert_eq!((class, code), ("processing", 5));
    }
}
