// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Binding Management for RabbitMQ
//!
//! Bindings route messages from a source exchange to a queue or to another
//! exchange. A binding is identified by its source, destination, destination
//! type and routing key within the vhost; its arguments do not take part in
//! the lookup. Deleting a binding needs the `properties_key` the broker assigns
//! to it, so `absent` resolves that key before deleting.

use crate::{
    arguments::{deserialize_arguments, Arguments},
    client::RabbitMQAdmin,
    errors::AdminError,
    state::{converge, Ensure, StateOptions, StateResult, Target},
};
use serde::Deserialize;
use serde_json::Value;

/// What a binding delivers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationType {
    #[default]
    Queue,
    Exchange,
}

impl DestinationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationType::Queue => "queue",
            DestinationType::Exchange => "exchange",
        }
    }
}

/// Definition of a binding from `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BindingDefinition {
    /// Source exchange, also the name the binding is reported under
    #[serde(alias = "name")]
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub destination_type: DestinationType,
    #[serde(default)]
    pub routing_key: String,
    #[serde(default, deserialize_with = "deserialize_arguments")]
    pub arguments: Arguments,
}

impl BindingDefinition {
    /// Creates a binding from the `source` exchange to the `destination` queue
    /// with an empty routing key.
    pub fn new(source: &str, destination: &str) -> BindingDefinition {
        BindingDefinition {
            source: source.to_owned(),
            destination: destination.to_owned(),
            destination_type: DestinationType::Queue,
            routing_key: String::new(),
            arguments: Arguments::default(),
        }
    }

    /// Binds to an exchange instead of a queue.
    pub fn exchange_destination(mut self) -> Self {
        self.destination_type = DestinationType::Exchange;
        self
    }

    /// Sets the routing key.
    pub fn routing_key(mut self, key: &str) -> Self {
        self.routing_key = key.to_owned();
        self
    }

    /// Adds a single argument to the binding.
    pub fn param(mut self, key: &str, value: Value) -> Self {
        self.arguments.insert(key.to_owned(), value);
        self
    }

    /// Converges the vhost towards `ensure` for this binding.
    pub async fn ensure(
        &self,
        admin: &RabbitMQAdmin,
        opts: &StateOptions,
        ensure: Ensure,
    ) -> Result<StateResult, AdminError> {
        match ensure {
            Ensure::Present => present(admin, opts, self).await,
            Ensure::Absent => absent(admin, opts, self).await,
        }
    }
}

/// Ensures the binding exists, declaring it when missing.
pub async fn present(
    admin: &RabbitMQAdmin,
    opts: &StateOptions,
    def: &BindingDefinition,
) -> Result<StateResult, AdminError> {
    let exists = admin
        .binding_exists(
            &def.source,
            &def.destination,
            def.destination_type,
            &def.routing_key,
        )
        .await?;
    let target = Target::new("Binding", &def.source, admin.vhost());

    converge(target, Ensure::Present, exists, opts, || admin.add_binding(def)).await
}

/// Ensures the binding is gone, deleting the first one matching its identity.
pub async fn absent(
    admin: &RabbitMQAdmin,
    opts: &StateOptions,
    def: &BindingDefinition,
) -> Result<StateResult, AdminError> {
    let properties_key = admin
        .binding_exists_with_props(
            &def.source,
            &def.destination,
            def.destination_type,
            &def.routing_key,
        )
        .await?;
    let target = Target::new("Binding", &def.source, admin.vhost());

    let exists = properties_key.is_some();
    let key = properties_key.unwrap_or_default();
    converge(
        target,
        Ensure::Absent,
        exists,
        opts,
        || {
            admin.delete_binding(
                &def.source,
                &def.destination,
                def.destination_type,
                &key,
            )
        },
    )
    .await
}
