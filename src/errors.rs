// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for RabbitMQ Administration
//!
//! This module provides the error types returned while driving the RabbitMQ admin
//! tools. The `AdminError` enum covers everything that aborts a convergence run:
//! missing tools, processes that cannot be spawned, commands that exit with a
//! failure and listings that cannot be parsed.

use thiserror::Error;

/// Represents errors that can occur while administering RabbitMQ through its CLIs.
///
/// A declare or delete that the broker rejects with an `Error` message is not an
/// `AdminError`; it is reported as a failed state instead. The variants here are
/// transport, authorization and tooling failures that should stop the run.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AdminError {
    /// The admin tool is not installed on this host
    #[error("`{0}` was not found in PATH")]
    CommandUnavailable(String),

    /// The admin tool could not be started
    #[error("failure to spawn `{0}`: {1}")]
    SpawnError(String, String),

    /// The admin tool ran and exited with a failure
    #[error("RabbitMQ command failed: {0}")]
    CommandExecutionError(String),

    /// The listing returned by the admin tool is not what we expected
    #[error("failure to parse listing output `{0}`")]
    ParseListingError(String),

    /// Declaration arguments could not be encoded as JSON
    #[error("failure to encode arguments `{0}`")]
    EncodeArgumentsError(String),
}
