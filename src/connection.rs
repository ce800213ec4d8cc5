// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Management API Connection Parameters
//!
//! Every `rabbitmqadmin` invocation carries the management API endpoint and
//! credentials explicitly. This module holds those parameters and renders them
//! as CLI flags.

use serde::Deserialize;
use std::fmt;

/// Default management API port
pub const DEFAULT_MANAGEMENT_PORT: u16 = 15672;

/// Connection parameters for the RabbitMQ management API.
///
/// Missing fields fall back to the broker's out-of-the-box values: `localhost`,
/// port `15672`, user and password `guest`, vhost `/`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vhost: String,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        ConnectionParams {
            host: "localhost".to_owned(),
            port: DEFAULT_MANAGEMENT_PORT,
            user: "guest".to_owned(),
            password: "guest".to_owned(),
            vhost: "/".to_owned(),
        }
    }
}

impl ConnectionParams {
    /// Sets the management host.
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_owned();
        self
    }

    /// Sets the management port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the user and password used for the management API.
    pub fn credentials(mut self, user: &str, password: &str) -> Self {
        self.user = user.to_owned();
        self.password = password.to_owned();
        self
    }

    /// Sets the virtual host every operation is scoped to.
    pub fn vhost(mut self, vhost: &str) -> Self {
        self.vhost = vhost.to_owned();
        self
    }

    /// Renders the parameters as `rabbitmqadmin` flags.
    pub(crate) fn to_cli_args(&self) -> Vec<String> {
        vec![
            "-H".to_owned(),
            self.host.clone(),
            "-P".to_owned(),
            self.port.to_string(),
            "-u".to_owned(),
            self.user.clone(),
            "-p".to_owned(),
            self.password.clone(),
            "-V".to_owned(),
            self.vhost.clone(),
        ]
    }
}

/// Connection fields set by a topology document.
///
/// Only the fields present in the document replace the ones the run was
/// configured with.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectionOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub vhost: Option<String>,
}

impl ConnectionParams {
    /// Replaces every field `overrides` sets, keeping the others.
    pub fn merge(self, overrides: ConnectionOverrides) -> Self {
        ConnectionParams {
            host: overrides.host.unwrap_or(self.host),
            port: overrides.port.unwrap_or(self.port),
            user: overrides.user.unwrap_or(self.user),
            password: overrides.password.unwrap_or(self.password),
            vhost: overrides.vhost.unwrap_or(self.vhost),
        }
    }
}

impl fmt::Debug for ConnectionOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOverrides")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("vhost", &self.vhost)
            .finish()
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("vhost", &self.vhost)
            .finish()
    }
}
