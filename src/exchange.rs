// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Management for RabbitMQ
//!
//! This module provides the exchange definition used by declarations and the
//! `present`/`absent` states that converge a vhost towards it. Exchanges are
//! declared once and never modified; changing an attribute means removing the
//! exchange and declaring it again.

use crate::{
    arguments::{deserialize_arguments, Arguments},
    client::RabbitMQAdmin,
    errors::AdminError,
    state::{converge, Ensure, StateOptions, StateResult, Target},
};
use serde::Deserialize;
use serde_json::Value;

/// Constant for the argument used to specify the delayed exchange type
pub const AMQP_HEADERS_DELAYED_EXCHANGE_TYPE: &str = "x-delayed-type";

/// Represents the types of exchanges available in RabbitMQ.
///
/// Each exchange type has specific routing behavior:
/// - Fanout: Broadcasts messages to all bound queues regardless of routing keys
/// - Direct: Routes messages to queues based on an exact match of routing keys
/// - Topic: Routes messages based on wildcard pattern matching of routing keys
/// - Headers: Routes based on message header values instead of routing keys
/// - XMessageDelayed: Extension for delayed message delivery (plugin required)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    #[default]
    Fanout,
    Direct,
    Topic,
    Headers,
    #[serde(rename = "x-delayed-message")]
    XMessageDelayed,
}

impl ExchangeKind {
    /// The `type=` value understood by `rabbitmqadmin declare exchange`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeKind::Fanout => "fanout",
            ExchangeKind::Direct => "direct",
            ExchangeKind::Topic => "topic",
            ExchangeKind::Headers => "headers",
            ExchangeKind::XMessageDelayed => "x-delayed-message",
        }
    }
}

/// Routing behavior of a delayed exchange once a message's delay elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayedRouting {
    Fanout,
    Direct,
    Topic,
    Headers,
}

impl From<DelayedRouting> for ExchangeKind {
    fn from(routing: DelayedRouting) -> Self {
        match routing {
            DelayedRouting::Fanout => ExchangeKind::Fanout,
            DelayedRouting::Direct => ExchangeKind::Direct,
            DelayedRouting::Topic => ExchangeKind::Topic,
            DelayedRouting::Headers => ExchangeKind::Headers,
        }
    }
}

/// Definition of a RabbitMQ exchange with its configuration parameters.
///
/// This struct implements the builder pattern and can also be read from a
/// topology document, where the kind is spelled `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExchangeDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ExchangeKind,
    #[serde(default)]
    pub durable: bool,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default, deserialize_with = "deserialize_arguments")]
    pub arguments: Arguments,
}

impl ExchangeDefinition {
    /// Creates a new exchange definition with the given name.
    ///
    /// By default, the exchange is a non-durable Fanout exchange without arguments.
    pub fn new(name: &str) -> ExchangeDefinition {
        ExchangeDefinition {
            name: name.to_owned(),
            kind: ExchangeKind::Fanout,
            durable: false,
            internal: false,
            auto_delete: false,
            arguments: Arguments::default(),
        }
    }

    /// Sets the exchange type.
    pub fn kind(mut self, kind: ExchangeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the exchange type to Direct.
    pub fn direct(self) -> Self {
        self.kind(ExchangeKind::Direct)
    }

    /// Sets the exchange type to Topic.
    pub fn topic(self) -> Self {
        self.kind(ExchangeKind::Topic)
    }

    /// Sets the exchange type to Headers.
    pub fn headers(self) -> Self {
        self.kind(ExchangeKind::Headers)
    }

    /// Creates a delayed exchange routing like `routing`.
    ///
    /// This requires the x-delayed-message plugin to be installed on the RabbitMQ server.
    pub fn delayed(mut self, routing: DelayedRouting) -> Self {
        self.arguments.insert(
            AMQP_HEADERS_DELAYED_EXCHANGE_TYPE.to_owned(),
            Value::String(ExchangeKind::from(routing).as_str().to_owned()),
        );
        self.kind = ExchangeKind::XMessageDelayed;
        self
    }

    /// Adds a single argument to the exchange.
    pub fn param(mut self, key: &str, value: Value) -> Self {
        self.arguments.insert(key.to_owned(), value);
        self
    }

    /// Makes the exchange durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Makes the exchange internal, preventing direct publishing.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// Sets the exchange to auto-delete when no longer used.
    pub fn auto_delete(mut self) -> Self {
        self.auto_delete = true;
        self
    }

    /// Converges the vhost towards `ensure` for this exchange.
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

/// Ensures the exchange exists, declaring it when missing.
pub async fn present(
    admin: &RabbitMQAdmin,
    opts: &StateOptions,
    def: &ExchangeDefinition,
) -> Result<StateResult, AdminError> {
    let exists = admin.exchange_exists(&def.name).await?;
    let target = Target::new("Exchange", &def.name, admin.vhost());

    converge(target, Ensure::Present, exists, opts, || admin.add_exchange(def)).await
}

/// Ensures the exchange is gone, deleting it when present.
pub async fn absent(
    admin: &RabbitMQAdmin,
    opts: &StateOptions,
    name: &str,
) -> Result<StateResult, AdminError> {
    let exists = admin.exchange_exists(name).await?;
    let target = Target::new("Exchange", name, admin.vhost());

    converge(target, Ensure::Absent, exists, opts, || admin.delete_exchange(name)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        command::{CommandOutput, MockAdminCli, Program},
        connection::ConnectionParams,
        state::Changes,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn admin(mock: MockAdminCli) -> RabbitMQAdmin {
        RabbitMQAdmin::new(Arc::new(mock), ConnectionParams::default())
    }

    fn listing(mock: &mut MockAdminCli, body: &'static str) {
        mock.expect_run()
            .withf(|program, args| *program == Program::Admin && args[0] == "list")
            .times(1)
            .returning(move |_, _| Ok(CommandOutput::success(body)));
    }

    #[test]
    fn reads_a_document_entry() {
        let def: ExchangeDefinition = serde_json::from_value(json!({
            "name": "events",
            "type": "topic",
            "durable": true,
            "arguments": [{"alternate-exchange": "unrouted"}]
        }))
        .unwrap();

        assert_eq!(
            def,
            ExchangeDefinition::new("events")
                .topic()
                .durable()
                .param("alternate-exchange", json!("unrouted"))
        );
    }

    #[test]
    fn kind_defaults_to_fanout() {
        let def: ExchangeDefinition = serde_json::from_value(json!({"name": "logs"})).unwrap();
        assert_eq!(def.kind, ExchangeKind::Fanout);
    }

    #[test]
    fn delayed_exchange_records_the_routing_type() {
        let def = ExchangeDefinition::new("later").delayed(DelayedRouting::Direct);

        assert_eq!(def.kind, ExchangeKind::XMessageDelayed);
        assert_eq!(def.arguments[AMQP_HEADERS_DELAYED_EXCHANGE_TYPE], json!("direct"));
    }

    #[test]
    fn delayed_routing_is_always_a_standard_kind() {
        for routing in [
            DelayedRouting::Fanout,
            DelayedRouting::Direct,
            DelayedRouting::Topic,
            DelayedRouting::Headers,
        ] {
            let def = ExchangeDefinition::new("later").delayed(routing);
            assert_ne!(
                def.arguments[AMQP_HEADERS_DELAYED_EXCHANGE_TYPE],
                json!(ExchangeKind::XMessageDelayed.as_str())
            );
        }
    }

    #[tokio::test]
    async fn present_is_a_no_op_when_the_exchange_exists() {
        let mut mock = MockAdminCli::new();
        listing(&mut mock, r#"[{"name": "events", "type": "topic"}]"#);

        let ret = present(&admin(mock), &StateOptions::default(), &ExchangeDefinition::new("events"))
            .await
            .unwrap();

        assert_eq!(ret.result, Some(true));
        assert_eq!(ret.changes, None);
        assert_eq!(ret.comment, "Exchange 'events' for vhost '/' already exists.");
    }

    #[tokio::test]
    async fn present_declares_a_missing_exchange() {
        let mut mock = MockAdminCli::new();
        listing(&mut mock, "[]");
        mock.expect_run()
            .withf(|_, args| args[0] == "declare" && args.contains(&"name=events".to_owned()))
            .times(1)
            .returning(|_, _| Ok(CommandOutput::success("exchange declared")));

        let ret = present(&admin(mock), &StateOptions::default(), &ExchangeDefinition::new("events"))
            .await
            .unwrap();

        assert_eq!(ret.result, Some(true));
        assert_eq!(ret.comment, "exchange declared");
        assert_eq!(ret.changes, Some(Changes::created("events")));
    }

    #[tokio::test]
    async fn present_in_test_mode_only_predicts() {
        let mut mock = MockAdminCli::new();
        listing(&mut mock, "[]");

        let opts = StateOptions::default().test(true);
        let ret = present(&admin(mock), &opts, &ExchangeDefinition::new("events"))
            .await
            .unwrap();

        assert_eq!(ret.result, None);
        assert_eq!(ret.changes, Some(Changes::created("events")));
        assert_eq!(ret.comment, "Exchange 'events' for vhost '/' will be created.");
    }

    #[tokio::test]
    async fn absent_deletes_an_existing_exchange() {
        let mut mock = MockAdminCli::new();
        listing(&mut mock, r#"[{"name": "events"}]"#);
        mock.expect_run()
            .withf(|_, args| args[0] == "delete" && args[2] == "name=events")
            .times(1)
            .returning(|_, _| Ok(CommandOutput::success("exchange deleted")));

        let ret = absent(&admin(mock), &StateOptions::default(), "events")
            .await
            .unwrap();

        assert_eq!(ret.result, Some(true));
        assert_eq!(ret.changes, Some(Changes::removed("events")));
    }

    #[tokio::test]
    async fn absent_reports_a_rejected_delete_as_failed() {
        let mut mock = MockAdminCli::new();
        listing(&mut mock, r#"[{"name": "amq.direct"}]"#);
        mock.expect_run()
            .withf(|_, args| args[0] == "delete")
            .times(1)
            .returning(|_, _| {
                Ok(CommandOutput::success(
                    "*** Error: cannot delete default exchange amq.direct",
                ))
            });

        let ret = absent(&admin(mock), &StateOptions::default(), "amq.direct")
            .await
            .unwrap();

        assert_eq!(ret.result, Some(false));
        assert_eq!(ret.changes, None);
        assert!(ret.comment.contains("cannot delete"));
    }
}
