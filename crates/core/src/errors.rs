use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid request: `{field}` {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Malformed input from the caller, as opposed to a collaborator or setup fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Domain(DomainError::Validation { .. }))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The ticket could not be processed. Check the required fields and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The support service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error @ DomainError::Validation { .. }) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Domain(DomainError::InvariantViolation(message)) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn validation_error_maps_to_bad_request_with_field_name() {
        let interface = ApplicationError::from(DomainError::Validation {
            field: "message",
            reason: "is required".to_owned(),
        })
        .into_interface("T-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref message, ref correlation_id }
                if correlation_id == "T-1" && message.contains("`message`")
        ));
        assert_eq!(
            interface.user_message(),
            "The ticket could not be processed. Check the required fields and try again."
        );
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let interface =
            ApplicationError::Persistence("database lock timeout".to_owned()).into_interface("T-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "T-3");
    }

    #[test]
    fn invariant_and_configuration_errors_map_to_internal() {
        let invariant = ApplicationError::from(DomainError::InvariantViolation("x".to_owned()))
            .into_interface("req-1");
        let config =
            ApplicationError::Configuration("bad kb file".to_owned()).into_interface("req-2");

        assert!(matches!(invariant, InterfaceError::Internal { .. }));
        assert!(matches!(config, InterfaceError::Internal { .. }));
        assert_eq!(config.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn only_domain_validation_counts_as_validation() {
        let validation = ApplicationError::from(DomainError::Validation {
            field: "id",
            reason: "is required".to_owned(),
        });
        assert!(validation.is_validation());
        assert!(!ApplicationError::Integration("llm down".to_owned()).is_validation());
    }
}
