// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Extended RabbitMQ Admin Client
//!
//! `RabbitMQAdmin` drives `rabbitmqadmin` for exchanges, queues and bindings and
//! `rabbitmqctl` for permission listings. Lookups list every entity of a kind
//! and filter client-side, since the management API is only used through its
//! list/declare/delete verbs here.
//!
//! Mutating calls return an `AdminResponse`: a nonzero exit code is an
//! `AdminError::CommandExecutionError`, output mentioning `Error` is a
//! `Failed` response, anything else succeeded.

use crate::{
    arguments::encode_arguments,
    binding::{BindingDefinition, DestinationType},
    command::{AdminCli, CommandOutput, Program},
    connection::ConnectionParams,
    errors::AdminError,
    exchange::ExchangeDefinition,
    listing::{output_to_map_with, split_values},
    queue::QueueDefinition,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error};

/// What a successful mutating call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Added,
    Deleted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Added => "Added",
            Status::Deleted => "Deleted",
        }
    }
}

/// Normalized response of a declare or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminResponse {
    /// The tool accepted the change; `message` is its output
    Ok { status: Status, message: String },
    /// The tool ran but reported an error for the entity
    Failed(String),
}

impl AdminResponse {
    pub fn is_ok(&self) -> bool {
        matches!(self, AdminResponse::Ok { .. })
    }
}

/// A record of `rabbitmqadmin list exchanges|queues`.
#[derive(Debug, Clone, Deserialize)]
struct NamedRecord {
    name: String,
}

/// A record of `rabbitmqadmin list bindings`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BindingRecord {
    pub source: String,
    pub destination: String,
    pub destination_type: String,
    #[serde(default)]
    pub routing_key: String,
    pub vhost: String,
    #[serde(default)]
    pub properties_key: String,
}

/// Client for the RabbitMQ admin tools scoped to one vhost.
pub struct RabbitMQAdmin {
    cli: Arc<dyn AdminCli>,
    connection: ConnectionParams,
}

impl RabbitMQAdmin {
    /// Creates a client that runs the tools through `cli` against `connection`.
    pub fn new(cli: Arc<dyn AdminCli>, connection: ConnectionParams) -> RabbitMQAdmin {
        RabbitMQAdmin { cli, connection }
    }

    /// The vhost every operation is scoped to.
    pub fn vhost(&self) -> &str {
        &self.connection.vhost
    }

    /// Returns whether an exchange named `name` exists.
    pub async fn exchange_exists(&self, name: &str) -> Result<bool, AdminError> {
        let exchanges: Vec<NamedRecord> = self.list("exchanges").await?;
        Ok(exchanges.iter().any(|ex| ex.name == name))
    }

    /// Returns whether a queue named `name` exists.
    pub async fn queue_exists(&self, name: &str) -> Result<bool, AdminError> {
        let queues: Vec<NamedRecord> = self.list("queues").await?;
        Ok(queues.iter().any(|q| q.name == name))
    }

    /// Returns whether a binding with this identity exists.
    ///
    /// Arguments are not part of a binding's identity.
    pub async fn binding_exists(
        &self,
        source: &str,
        destination: &str,
        destination_type: DestinationType,
        routing_key: &str,
    ) -> Result<bool, AdminError> {
        Ok(self
            .find_binding(source, destination, destination_type, routing_key)
            .await?
            .is_some())
    }

    /// Returns the properties key of the first binding with this identity.
    ///
    /// A binding listed without a properties key cannot be deleted and is
    /// reported as missing.
    pub async fn binding_exists_with_props(
        &self,
        source: &str,
        destination: &str,
        destination_type: DestinationType,
        routing_key: &str,
    ) -> Result<Option<String>, AdminError> {
        Ok(self
            .find_binding(source, destination, destination_type, routing_key)
            .await?
            .map(|b| b.properties_key)
            .filter(|key| !key.is_empty()))
    }

    /// Declares an exchange.
    pub async fn add_exchange(&self, def: &ExchangeDefinition) -> Result<AdminResponse, AdminError> {
        debug!(name = def.name.as_str(), kind = def.kind.as_str(), "declaring exchange");

        let mut args = self.verb("declare", "exchange");
        args.extend([
            format!("name={}", def.name),
            format!("type={}", def.kind.as_str()),
            format!("durable={}", def.durable),
            format!("internal={}", def.internal),
            format!("auto_delete={}", def.auto_delete),
            format!("arguments={}", encode_arguments(&def.arguments)?),
        ]);

        self.mutate(args, Status::Added).await
    }

    /// Declares a queue.
    pub async fn add_queue(&self, def: &QueueDefinition) -> Result<AdminResponse, AdminError> {
        debug!(name = def.name.as_str(), "declaring queue");

        let mut args = self.verb("declare", "queue");
        args.extend([
            format!("name={}", def.name),
            format!("durable={}", def.durable),
            format!("auto_delete={}", def.auto_delete),
            format!("arguments={}", encode_arguments(&def.arguments)?),
        ]);

        self.mutate(args, Status::Added).await
    }

    /// Declares a binding.
    pub async fn add_binding(&self, def: &BindingDefinition) -> Result<AdminResponse, AdminError> {
        debug!(
            source = def.source.as_str(),
            destination = def.destination.as_str(),
            routing_key = def.routing_key.as_str(),
            "declaring binding"
        );

        let mut args = self.verb("declare", "binding");
        args.extend([
            format!("source={}", def.source),
            format!("destination_type={}", def.destination_type.as_str()),
            format!("destination={}", def.destination),
            format!("routing_key={}", def.routing_key),
            format!("arguments={}", encode_arguments(&def.arguments)?),
        ]);

        self.mutate(args, Status::Added).await
    }

    /// Deletes the exchange named `name`.
    pub async fn delete_exchange(&self, name: &str) -> Result<AdminResponse, AdminError> {
        debug!(name, "deleting exchange");
        self.delete("exchange", vec![format!("name={}", name)]).await
    }

    /// Deletes the queue named `name`.
    pub async fn delete_queue(&self, name: &str) -> Result<AdminResponse, AdminError> {
        debug!(name, "deleting queue");
        self.delete("queue", vec![format!("name={}", name)]).await
    }

    /// Deletes the binding identified by its endpoints and `properties_key`.
    pub async fn delete_binding(
        &self,
        source: &str,
        destination: &str,
        destination_type: DestinationType,
        properties_key: &str,
    ) -> Result<AdminResponse, AdminError> {
        debug!(source, destination, properties_key, "deleting binding");
        self.delete(
            "binding",
            vec![
                format!("source={}", source),
                format!("destination={}", destination),
                format!("destination_type={}", destination_type.as_str()),
                format!("properties_key={}", properties_key),
            ],
        )
        .await
    }

    /// Lists `user -> [configure, write, read]` permissions of the vhost.
    pub async fn list_permissions(&self) -> Result<BTreeMap<String, Vec<String>>, AdminError> {
        let args = vec![
            "list_permissions".to_owned(),
            "-q".to_owned(),
            "-p".to_owned(),
            self.connection.vhost.clone(),
        ];
        let out = self.checked(Program::Ctl, args).await?;
        Ok(permission_rows(&out.stdout, "user"))
    }

    /// Lists `vhost -> [configure, write, read]` permissions of `user`.
    pub async fn list_user_permissions(
        &self,
        user: &str,
    ) -> Result<BTreeMap<String, Vec<String>>, AdminError> {
        let args = vec![
            "list_user_permissions".to_owned(),
            "-q".to_owned(),
            user.to_owned(),
        ];
        let out = self.checked(Program::Ctl, args).await?;
        Ok(permission_rows(&out.stdout, "vhost"))
    }

    async fn find_binding(
        &self,
        source: &str,
        destination: &str,
        destination_type: DestinationType,
        routing_key: &str,
    ) -> Result<Option<BindingRecord>, AdminError> {
        let bindings: Vec<BindingRecord> = self.list("bindings").await?;
        let vhost = self.vhost();

        Ok(bindings.into_iter().find(|b| {
            b.source == source
                && b.destination == destination
                && b.destination_type == destination_type.as_str()
                && b.routing_key == routing_key
                && b.vhost == vhost
        }))
    }

    async fn list<T>(&self, kind: &str) -> Result<Vec<T>, AdminError>
    where
        T: DeserializeOwned,
    {
        let mut args = self.verb("list", kind);
        args.push("--format=raw_json".to_owned());

        let out = self.checked(Program::Admin, args).await?;
        match serde_json::from_str(&out.stdout) {
            Ok(items) => Ok(items),
            Err(err) => {
                error!(error = err.to_string(), kind, "unexpected listing output");
                Err(AdminError::ParseListingError(out.raw()))
            }
        }
    }

    async fn delete(&self, kind: &str, keys: Vec<String>) -> Result<AdminResponse, AdminError> {
        let mut args = vec!["delete".to_owned(), kind.to_owned()];
        args.extend(keys);
        args.extend(self.connection.to_cli_args());
        args.push("--format=table".to_owned());

        self.mutate(args, Status::Deleted).await
    }

    async fn mutate(&self, args: Vec<String>, status: Status) -> Result<AdminResponse, AdminError> {
        let out = self.cli.run(Program::Admin, args).await?;
        format_response(out, status)
    }

    /// Runs a command whose output is only useful when it succeeded.
    async fn checked(&self, program: Program, args: Vec<String>) -> Result<CommandOutput, AdminError> {
        let out = self.cli.run(program, args).await?;
        if out.retcode != 0 {
            error!(retcode = out.retcode, program = program.as_str(), "admin command failed");
            return Err(AdminError::CommandExecutionError(out.raw()));
        }
        Ok(out)
    }

    fn verb(&self, verb: &str, kind: &str) -> Vec<String> {
        let mut args = vec![verb.to_owned(), kind.to_owned()];
        args.extend(self.connection.to_cli_args());
        args
    }
}

/// Parses a permission listing keyed by `key_column`.
///
/// `rabbitmqctl` 3.7 and later print a column header even with `-q`.
fn permission_rows(output: &str, key_column: &str) -> BTreeMap<String, Vec<String>> {
    let mut rows = output_to_map_with(output, split_values);
    if rows
        .get(key_column)
        .is_some_and(|values| values.as_slice() == ["configure", "write", "read"])
    {
        rows.remove(key_column);
    }
    rows
}

/// Normalizes the output of a declare or delete.
pub fn format_response(out: CommandOutput, status: Status) -> Result<AdminResponse, AdminError> {
    if out.retcode != 0 {
        error!(retcode = out.retcode, status = status.as_str(), "admin command failed");
        return Err(AdminError::CommandExecutionError(out.raw()));
    }

    let message = out.raw();
    if message.contains("Error") {
        return Ok(AdminResponse::Failed(message));
    }

    Ok(AdminResponse::Ok { status, message })
}
