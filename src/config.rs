// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Configuration
//!
//! Connection parameters and run options come from the environment:
//!
//! | variable               | default     |
//! |------------------------|-------------|
//! | `RABBITMQ_HOST`        | `localhost` |
//! | `RABBITMQ_PORT`        | `15672`     |
//! | `RABBITMQ_USER`        | `guest`     |
//! | `RABBITMQ_PASSWORD`    | `guest`     |
//! | `RABBITMQ_VHOST`       | `/`         |
//! | `RABBITMQ_STATE_TEST`  | `false`     |
//! | `RABBITMQ_STATE_RUNAS` | unset       |
//!
//! Topology documents are JSON files read with `load_document`.

use crate::{
    connection::{ConnectionOverrides, ConnectionParams},
    state::StateOptions,
    topology::TopologyDocument,
};
use std::{env, fs, path::Path};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading the configuration or a topology document.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used
    #[error("invalid value `{1}` for `{0}`")]
    InvalidValue(&'static str, String),

    /// The topology document could not be read
    #[error("failure to read topology document `{0}`: {1}")]
    ReadDocumentError(String, String),

    /// The topology document is not valid
    #[error("failure to parse topology document: {0}")]
    ParseDocumentError(String),
}

/// Connection parameters and options of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateConfigs {
    pub connection: ConnectionParams,
    pub options: StateOptions,
    /// Identity the admin tools run as, the invoking user when unset
    pub runas: Option<String>,
}

impl StateConfigs {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<StateConfigs, ConfigError> {
        StateConfigs::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults for
    /// unset variables.
    pub fn from_lookup<F>(lookup: F) -> Result<StateConfigs, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut connection = ConnectionParams::default();
        if let Some(host) = lookup("RABBITMQ_HOST") {
            connection.host = host;
        }
        if let Some(port) = lookup("RABBITMQ_PORT") {
            connection.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue("RABBITMQ_PORT", port))?;
        }
        if let Some(user) = lookup("RABBITMQ_USER") {
            connection.user = user;
        }
        if let Some(password) = lookup("RABBITMQ_PASSWORD") {
            connection.password = password;
        }
        if let Some(vhost) = lookup("RABBITMQ_VHOST") {
            connection.vhost = vhost;
        }

        let mut options = StateOptions::default();
        if let Some(test) = lookup("RABBITMQ_STATE_TEST") {
            options.test = parse_flag("RABBITMQ_STATE_TEST", test)?;
        }
        let runas = lookup("RABBITMQ_STATE_RUNAS").filter(|user| !user.is_empty());

        debug!(?connection, ?options, ?runas, "configuration loaded");

        Ok(StateConfigs {
            connection,
            options,
            runas,
        })
    }

    /// Connection of a run applying a document with the `overrides` connection
    /// block. Fields the document leaves out keep their configured value.
    pub fn document_connection(&self, overrides: Option<ConnectionOverrides>) -> ConnectionParams {
        match overrides {
            Some(overrides) => self.connection.clone().merge(overrides),
            None => self.connection.clone(),
        }
    }
}

fn parse_flag(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key, value)),
    }
}

/// Reads and parses a JSON topology document.
pub fn load_document(path: &Path) -> Result<TopologyDocument, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|err| {
        ConfigError::ReadDocumentError(path.display().to_string(), err.to_string())
    })?;
    parse_document(&raw)
}

/// Parses a JSON topology document.
pub fn parse_document(raw: &str) -> Result<TopologyDocument, ConfigError> {
    serde_json::from_str(raw).map_err(|err| ConfigError::ParseDocumentError(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = StateConfigs::from_lookup(|_| None).unwrap();

        assert_eq!(cfg.connection, ConnectionParams::default());
        assert!(!cfg.options.test);
        assert_eq!(cfg.runas, None);
    }

    #[test]
    fn reads_every_variable() {
        let cfg = StateConfigs::from_lookup(lookup(&[
            ("RABBITMQ_HOST", "rabbit.internal"),
            ("RABBITMQ_PORT", "15673"),
            ("RABBITMQ_USER", "admin"),
            ("RABBITMQ_PASSWORD", "s3cret"),
            ("RABBITMQ_VHOST", "shop"),
            ("RABBITMQ_STATE_TEST", "yes"),
            ("RABBITMQ_STATE_RUNAS", "rabbitmq"),
        ]))
        .unwrap();

        assert_eq!(
            cfg.connection,
            ConnectionParams::default()
                .host("rabbit.internal")
                .port(15673)
                .credentials("admin", "s3cret")
                .vhost("shop")
        );
        assert_eq!(cfg.options, StateOptions::default().test(true));
        assert_eq!(cfg.runas.as_deref(), Some("rabbitmq"));
    }

    #[test]
    fn document_connection_only_replaces_the_fields_it_sets() {
        let cfg = StateConfigs::from_lookup(lookup(&[
            ("RABBITMQ_HOST", "rabbit.internal"),
            ("RABBITMQ_USER", "admin"),
            ("RABBITMQ_PASSWORD", "s3cret"),
        ]))
        .unwrap();
        let doc = parse_document(r#"{"connection": {"vhost": "shop"}}"#).unwrap();

        let connection = cfg.document_connection(doc.connection);

        assert_eq!(connection.host, "rabbit.internal");
        assert_eq!(connection.user, "admin");
        assert_eq!(connection.password, "s3cret");
        assert_eq!(connection.port, 15672);
        assert_eq!(connection.vhost, "shop");
    }

    #[test]
    fn document_without_connection_keeps_the_environment() {
        let cfg = StateConfigs::from_lookup(lookup(&[("RABBITMQ_VHOST", "shop")])).unwrap();
        let doc = parse_document("{}").unwrap();

        assert_eq!(cfg.document_connection(doc.connection), cfg.connection);
    }

    #[test]
    fn rejects_a_bad_port() {
        let err = StateConfigs::from_lookup(lookup(&[("RABBITMQ_PORT", "http")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue("RABBITMQ_PORT", "http".to_owned())
        );
    }

    #[test]
    fn rejects_a_bad_flag() {
        let err =
            StateConfigs::from_lookup(lookup(&[("RABBITMQ_STATE_TEST", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("RABBITMQ_STATE_TEST", _)));
    }

    #[test]
    fn empty_document_has_no_entries() {
        let doc = parse_document("{}").unwrap();
        assert_eq!(doc, TopologyDocument::default());
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = parse_document(r#"{"queues": [{"durable": true}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ParseDocumentError(_)));
    }

    #[test]
    fn missing_document_is_a_read_error() {
        let err = load_document(Path::new("/nonexistent/topology.json")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadDocumentError(_, _)));
    }
}
