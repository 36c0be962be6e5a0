use thiserror::Error;

use crate::adapters::message::MessageRenderer;
use crate::config::{CorsSettings, RateLimitConfig, ServerSettings, Settings, ANY_ORIGIN};
use crate::persistence::pool::is_valid_identifier;
use crate::persistence::StorageConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        errors.extend(Self::validate_server(&settings.server));
        errors.extend(Self::validate_storage(&settings.storage));
        errors.extend(Self::validate_cors(&settings.cors));
        errors.extend(Self::validate_message_template(
            &settings.dispenser.message_template,
        ));
        if let Some(rate_limit) = &settings.rate_limit {
            errors.extend(Self::validate_rate_limit(rate_limit));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        // port 0 asks the OS for an ephemeral port, which tests rely on
        errors
    }

    fn validate_storage(storage: &StorageConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if storage.url.is_empty() {
            errors.push(ValidationError::MissingField("storage.url".to_string()));
        } else if !storage.url.starts_with("sqlite:") {
            errors.push(ValidationError::InvalidValue {
                field: "storage.url".to_string(),
                reason: format!("expected a sqlite: URL, got '{}'", storage.url),
            });
        }

        if storage.max_connections == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "storage.max_connections".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if storage.acquire_timeout_secs == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "storage.acquire_timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        for (field, value) in [("storage.table", &storage.table), ("storage.column", &storage.column)] {
            if !is_valid_identifier(value) {
                errors.push(ValidationError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("'{}' is not a plain SQL identifier", value),
                });
            }
        }

        errors
    }

    fn validate_cors(cors: &CorsSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if cors.allowed_origins.is_empty() {
            errors.push(ValidationError::MissingField(
                "cors.allowed_origins".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for (idx, origin) in cors.allowed_origins.iter().enumerate() {
            if !seen.insert(origin) {
                errors.push(ValidationError::Duplicate(format!(
                    "cors.allowed_origins[{}] '{}'",
                    idx, origin
                )));
                continue;
            }

            if origin == ANY_ORIGIN {
                continue;
            }

            let well_formed = (origin.starts_with("http://") || origin.starts_with("https://"))
                && !origin.ends_with('/')
                && axum::http::HeaderValue::from_str(origin).is_ok();
            if !well_formed {
                errors.push(ValidationError::InvalidValue {
                    field: format!("cors.allowed_origins[{}]", idx),
                    reason: format!(
                        "'{}' must be a scheme://host[:port] origin without a trailing slash",
                        origin
                    ),
                });
            }
        }

        errors
    }

    fn validate_message_template(template: &str) -> Vec<ValidationError> {
        match MessageRenderer::new(template) {
            Ok(_) => Vec::new(),
            Err(e) => vec![ValidationError::InvalidValue {
                field: "dispenser.message_template".to_string(),
                reason: e.to_string(),
            }],
        }
    }

    fn validate_rate_limit(rate_limit: &RateLimitConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if rate_limit.enabled && rate_limit.requests_per_second == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "rate_limit.requests_per_second".to_string(),
                reason: "must be greater than 0 when rate limiting is enabled".to_string(),
            });
        }
        if rate_limit.enabled && rate_limit.burst_size == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "rate_limit.burst_size".to_string(),
                reason: "must be greater than 0 when rate limiting is enabled".to_string(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(ConfigValidator::validate(&Settings::default()).is_ok());
    }

    #[test]
    fn test_rejects_injection_shaped_identifiers() {
        let mut settings = Settings::default();
        settings.storage.table = "tokens; DROP TABLE tokens".to_string();
        settings.storage.column = "1token".to_string();

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::InvalidValue { .. })));
    }

    #[test]
    fn test_rejects_non_sqlite_url() {
        let mut settings = Settings::default();
        settings.storage.url = "postgres://localhost/codes".to_string();

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert!(errors[0].to_string().contains("storage.url"));
    }

    #[test]
    fn test_cors_origin_rules() {
        let mut settings = Settings::default();
        settings.cors.allowed_origins = vec![
            "https://survey.example.org".to_string(),
            "https://survey.example.org".to_string(),
            "survey.example.org".to_string(),
            "https://other.example.org/".to_string(),
        ];

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ValidationError::Duplicate(_)));
    }

    #[test]
    fn test_empty_origin_list_is_rejected() {
        let mut settings = Settings::default();
        settings.cors.allowed_origins.clear();

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert!(matches!(errors[0], ValidationError::MissingField(_)));
    }

    #[test]
    fn test_template_must_show_token() {
        let mut settings = Settings::default();
        settings.dispenser.message_template = "Thanks for participating!".to_string();

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert!(errors[0].to_string().contains("dispenser.message_template"));
    }

    #[test]
    fn test_enabled_rate_limit_needs_positive_quota() {
        let mut settings = Settings::default();
        settings.rate_limit = Some(RateLimitConfig {
            enabled: true,
            requests_per_second: 0,
            burst_size: 0,
        });
        assert_eq!(ConfigValidator::validate(&settings).unwrap_err().len(), 2);

        settings.rate_limit = Some(RateLimitConfig {
            enabled: false,
            requests_per_second: 0,
            burst_size: 0,
        });
        assert!(ConfigValidator::validate(&settings).is_ok());
    }
}
