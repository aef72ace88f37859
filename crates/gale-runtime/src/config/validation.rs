//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{GaleConfig, LogOutput, LoggingConfig, ServerConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &GaleConfig) -> ConfigResult<()> {
    validate_server_config(&config.server)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates server settings.
pub fn validate_server_config(server: &ServerConfig) -> ConfigResult<()> {
    if server.name.trim().is_empty() {
        return Err(ConfigError::missing("server.name"));
    }

    // The name doubles as the queue group, which brokers treat as a token.
    if server.name.contains(char::is_whitespace) {
        return Err(ConfigError::invalid(
            "server.name",
            "must not contain whitespace",
        ));
    }

    validate_url(&server.url)?;

    if server.timeout_ms == 0 {
        return Err(ConfigError::invalid(
            "server.timeout_ms",
            "must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing("logging.file_path"));
    }

    if logging.filters.keys().any(|module| module.trim().is_empty()) {
        return Err(ConfigError::invalid(
            "logging.filters",
            "module name must not be empty",
        ));
    }

    Ok(())
}

/// The connector interprets the URL; only its scheme is checked here.
fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing("server.url"));
    }

    match url.split_once("://") {
        Some((scheme, _)) if !scheme.is_empty() => Ok(()),
        _ => Err(ConfigError::invalid(
            "server.url",
            format!("'{url}' has no scheme"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GaleConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_empty_name() {
        let mut config = GaleConfig::default();
        config.server.name = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
        assert_eq!(err.field(), Some("server.name"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = GaleConfig::default();
        config.server.timeout_ms = 0;
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.field(), Some("server.timeout_ms"));
        assert_eq!(
            err.to_string(),
            "invalid setting `server.timeout_ms`: must be greater than 0"
        );
    }

    #[test]
    fn test_rejects_url_without_scheme() {
        let mut config = GaleConfig::default();
        config.server.url = "localhost:4222".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid { ref field, .. }) if field == "server.url"
        ));

        config.server.url = String::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Missing { .. })
        ));
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = GaleConfig::default();
        config.logging.output = LogOutput::File;
        assert_eq!(
            validate_config(&config).unwrap_err().field(),
            Some("logging.file_path")
        );

        config.logging.file_path = Some(PathBuf::from("gale.log"));
        assert!(validate_config(&config).is_ok());
    }
}
