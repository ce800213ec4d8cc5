// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Topology Convergence
//!
//! This module applies a whole topology at once: exchanges, queues and the
//! bindings between them, each with its desired state. Entries can be added
//! one by one through the `Topology` builder or read from a `TopologyDocument`.
//!
//! `apply` runs removals before creations so that bindings never outlive the
//! entities they connect and are only declared once both ends exist:
//! 1. absent bindings
//! 2. absent queues
//! 3. absent exchanges
//! 4. present exchanges
//! 5. present queues
//! 6. present bindings
//!
//! A state that fails (`result=false`) does not stop the run. An `AdminError`
//! does, and is returned as is.

use crate::{
    binding::BindingDefinition,
    client::RabbitMQAdmin,
    connection::ConnectionOverrides,
    errors::AdminError,
    exchange::ExchangeDefinition,
    queue::QueueDefinition,
    state::{Ensure, StateOptions, StateResult},
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An exchange entry of a topology document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExchangeEntry {
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(flatten)]
    pub def: ExchangeDefinition,
}

/// A queue entry of a topology document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueueEntry {
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(flatten)]
    pub def: QueueDefinition,
}

/// A binding entry of a topology document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BindingEntry {
    #[serde(default)]
    pub ensure: Ensure,
    #[serde(flatten)]
    pub def: BindingDefinition,
}

/// Declarative description of a vhost's topology.
///
/// Fields of `connection` take precedence over the environment one by one.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TopologyDocument {
    pub connection: Option<ConnectionOverrides>,
    pub exchanges: Vec<ExchangeEntry>,
    pub queues: Vec<QueueEntry>,
    pub bindings: Vec<BindingEntry>,
}

/// Trait defining the interface for topology convergence.
#[async_trait]
pub trait Topology {
    /// Adds an exchange and its desired state to the topology.
    fn exchange(self, def: ExchangeDefinition, ensure: Ensure) -> Self;

    /// Adds a queue and its desired state to the topology.
    fn queue(self, def: QueueDefinition, ensure: Ensure) -> Self;

    /// Adds a binding and its desired state to the topology.
    fn binding(self, def: BindingDefinition, ensure: Ensure) -> Self;

    /// Converges the broker towards the topology, one result per entry.
    async fn apply(&self) -> Result<Vec<StateResult>, AdminError>;
}

/// Topology converged through the RabbitMQ admin tools.
pub struct RabbitMQTopology {
    admin: Arc<RabbitMQAdmin>,
    options: StateOptions,
    pub(crate) exchanges: Vec<(ExchangeDefinition, Ensure)>,
    pub(crate) queues: Vec<(QueueDefinition, Ensure)>,
    pub(crate) bindings: Vec<(BindingDefinition, Ensure)>,
}

impl RabbitMQTopology {
    /// Creates an empty topology.
    pub fn new(admin: Arc<RabbitMQAdmin>, options: StateOptions) -> RabbitMQTopology {
        RabbitMQTopology {
            admin,
            options,
            exchanges: vec![],
            queues: vec![],
            bindings: vec![],
        }
    }

    /// Creates a topology holding every entry of `doc`.
    pub fn from_document(
        admin: Arc<RabbitMQAdmin>,
        options: StateOptions,
        doc: TopologyDocument,
    ) -> RabbitMQTopology {
        let topology = doc
            .exchanges
            .into_iter()
            .fold(RabbitMQTopology::new(admin, options), |t, e| {
                t.exchange(e.def, e.ensure)
            });
        let topology = doc
            .queues
            .into_iter()
            .fold(topology, |t, q| t.queue(q.def, q.ensure));

        doc.bindings
            .into_iter()
            .fold(topology, |t, b| t.binding(b.def, b.ensure))
    }
}

#[async_trait]
impl Topology for RabbitMQTopology {
    fn exchange(mut self, def: ExchangeDefinition, ensure: Ensure) -> Self {
        self.exchanges.push((def, ensure));
        self
    }

    fn queue(mut self, def: QueueDefinition, ensure: Ensure) -> Self {
        self.queues.push((def, ensure));
        self
    }

    fn binding(mut self, def: BindingDefinition, ensure: Ensure) -> Self {
        self.bindings.push((def, ensure));
        self
    }

    async fn apply(&self) -> Result<Vec<StateResult>, AdminError> {
        let mut results = vec![];

        self.apply_bindings(Ensure::Absent, &mut results).await?;
        self.apply_queues(Ensure::Absent, &mut results).await?;
        self.apply_exchanges(Ensure::Absent, &mut results).await?;
        self.apply_exchanges(Ensure::Present, &mut results).await?;
        self.apply_queues(Ensure::Present, &mut results).await?;
        self.apply_bindings(Ensure::Present, &mut results).await?;

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        if failed > 0 {
            warn!(failed, total = results.len(), "topology applied with failures");
        } else {
            info!(total = results.len(), test = self.options.test, "topology applied");
        }

        Ok(results)
    }
}

impl RabbitMQTopology {
    async fn apply_exchanges(
        &self,
        ensure: Ensure,
        results: &mut Vec<StateResult>,
    ) -> Result<(), AdminError> {
        for (def, _) in self.exchanges.iter().filter(|(_, e)| *e == ensure) {
            debug!(name = def.name.as_str(), ?ensure, "converging exchange");
            results.push(def.ensure(&self.admin, &self.options, ensure).await?);
        }
        Ok(())
    }

    async fn apply_queues(
        &self,
        ensure: Ensure,
        results: &mut Vec<StateResult>,
    ) -> Result<(), AdminError> {
        for (def, _) in self.queues.iter().filter(|(_, e)| *e == ensure) {
            debug!(name = def.name.as_str(), ?ensure, "converging queue");
            results.push(def.ensure(&self.admin, &self.options, ensure).await?);
        }
        Ok(())
    }

    async fn apply_bindings(
        &self,
        ensure: Ensure,
        results: &mut Vec<StateResult>,
    ) -> Result<(), AdminError> {
        for (def, _) in self.bindings.iter().filter(|(_, e)| *e == ensure) {
            debug!(
                source = def.source.as_str(),
                destination = def.destination.as_str(),
                ?ensure,
                "converging binding"
            );
            results.push(def.ensure(&self.admin, &self.options, ensure).await?);
        }
        Ok(())
    }
}
