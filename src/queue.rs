// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Management for RabbitMQ
//!
//! This module provides the queue definition used by declarations and the
//! `present`/`absent` states for queues. Besides durability and auto-delete,
//! queues take their behaviour from optional `x-` arguments: message TTL,
//! expiry, length limits, dead-lettering and priorities.

use crate::{
    arguments::{deserialize_arguments, Arguments},
    client::RabbitMQAdmin,
    errors::AdminError,
    state::{converge, Ensure, StateOptions, StateResult, Target},
};
use serde::Deserialize;
use serde_json::Value;

/// Constant for the argument used to specify a dead letter exchange
pub const AMQP_HEADERS_DEAD_LETTER_EXCHANGE: &str = "x-dead-letter-exchange";
/// Constant for the argument used to specify a dead letter routing key
pub const AMQP_HEADERS_DEAD_LETTER_ROUTING_KEY: &str = "x-dead-letter-routing-key";
/// Constant for the argument used to specify message TTL
pub const AMQP_HEADERS_MESSAGE_TTL: &str = "x-message-ttl";
/// Constant for the argument used to specify the unused-queue expiry
pub const AMQP_HEADERS_EXPIRES: &str = "x-expires";
/// Constant for the argument used to specify maximum queue length
pub const AMQP_HEADERS_MAX_LENGTH: &str = "x-max-length";
/// Constant for the argument used to specify maximum queue size in bytes
pub const AMQP_HEADERS_MAX_LENGTH_BYTES: &str = "x-max-length-bytes";
/// Constant for the argument used to specify the highest message priority
pub const AMQP_HEADERS_MAX_PRIORITY: &str = "x-max-priority";

/// Definition of a RabbitMQ queue with its configuration parameters.
///
/// This struct implements the builder pattern to create and configure queue
/// definitions, and is also read from topology documents.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueueDefinition {
    pub name: String,
    #[serde(default)]
    pub durable: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default, deserialize_with = "deserialize_arguments")]
    pub arguments: Arguments,
}

impl QueueDefinition {
    /// Creates a new queue definition with the given name.
    ///
    /// By default, the queue is non-durable, not auto-deleted and has no arguments.
    pub fn new(name: &str) -> QueueDefinition {
        QueueDefinition {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Makes the queue durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Sets the queue to auto-delete when its last consumer goes away.
    pub fn auto_delete(mut self) -> Self {
        self.auto_delete = true;
        self
    }

    /// Sets the message Time-To-Live (TTL) for the queue.
    ///
    /// # Parameters
    /// * `ttl` - TTL in milliseconds
    pub fn ttl(self, ttl: u64) -> Self {
        self.param(AMQP_HEADERS_MESSAGE_TTL, Value::from(ttl))
    }

    /// Deletes the queue after it has been unused for `expires` milliseconds.
    pub fn expires(self, expires: u64) -> Self {
        self.param(AMQP_HEADERS_EXPIRES, Value::from(expires))
    }

    /// Sets the maximum number of messages the queue can hold.
    pub fn max_length(self, max: u64) -> Self {
        self.param(AMQP_HEADERS_MAX_LENGTH, Value::from(max))
    }

    /// Sets the maximum size in bytes the queue can hold.
    pub fn max_length_bytes(self, max_bytes: u64) -> Self {
        self.param(AMQP_HEADERS_MAX_LENGTH_BYTES, Value::from(max_bytes))
    }

    /// Routes rejected and expired messages to `exchange`.
    ///
    /// When `routing_key` is given, dead-lettered messages are published with it
    /// instead of their original routing key.
    pub fn dead_letter(self, exchange: &str, routing_key: Option<&str>) -> Self {
        let def = self.param(AMQP_HEADERS_DEAD_LETTER_EXCHANGE, Value::from(exchange));
        match routing_key {
            Some(key) => def.param(AMQP_HEADERS_DEAD_LETTER_ROUTING_KEY, Value::from(key)),
            None => def,
        }
    }

    /// Enables priorities from 0 up to `max`.
    pub fn max_priority(self, max: u8) -> Self {
        self.param(AMQP_HEADERS_MAX_PRIORITY, Value::from(max))
    }

    /// Adds a single argument to the queue.
    pub fn param(mut self, key: &str, value: Value) -> Self {
        self.arguments.insert(key.to_owned(), value);
        self
    }

    /// Converges the vhost towards `ensure` for this queue.
    pub async fn ensure(
        &self,
        admin: &RabbitMQAdmin,
        opts: &StateOptions,
        ensure: Ensure,
    ) -> Result<StateResult, AdminError> {
        match ensure {
            Ensure::Present => present(admin, opts, self).await,
            Ensure::Absent => absent(admin, opts, &self.name).await,
        }
    }
}

/// Ensures the queue exists, declaring it when missing.
pub async fn present(
    admin: &RabbitMQAdmin,
    opts: &StateOptions,
    def: &QueueDefinition,
) -> Result<StateResult, AdminError> {
    let exists = admin.queue_exists(&def.name).await?;
    let target = Target::new("Queue", &def.name, admin.vhost());

    converge(target, Ensure::Present, exists, opts, || admin.add_queue(def)).await
}

/// Ensures the queue is gone, deleting it when present.
pub async fn absent(
    admin: &RabbitMQAdmin,
    opts: &StateOptions,
    name: &str,
) -> Result<StateResult, AdminError> {
    let exists = admin.queue_exists(name).await?;
    let target = Target::new("Queue", name, admin.vhost());

    converge(target, Ensure::Absent, exists, opts, || admin.delete_queue(name)).await
}
