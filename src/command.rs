// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Admin Tool Execution
//!
//! This module defines the seam between the extended client and the operating
//! system. `AdminCli` runs one of the RabbitMQ admin tools with a list of
//! arguments and hands back its exit code and output. `ProcessRunner` is the
//! production implementation; tests substitute a mock or an in-memory broker.

use crate::errors::AdminError;
use async_trait::async_trait;
use std::{env, path::Path};
use tokio::process::Command;
use tracing::{debug, error};

/// The RabbitMQ admin tools this crate drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    /// `rabbitmqadmin`, the management HTTP API client
    Admin,
    /// `rabbitmqctl`, the node control tool
    Ctl,
}

impl Program {
    /// Executable name looked up in `PATH`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Program::Admin => "rabbitmqadmin",
            Program::Ctl => "rabbitmqctl",
        }
    }
}

/// Exit code and captured output of one admin tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub retcode: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// An invocation that exited with code zero.
    pub fn success(stdout: &str) -> Self {
        CommandOutput {
            retcode: 0,
            stdout: stdout.to_owned(),
            stderr: String::new(),
        }
    }

    /// An invocation that exited with a nonzero code.
    pub fn failure(retcode: i32, stderr: &str) -> Self {
        CommandOutput {
            retcode,
            stdout: String::new(),
            stderr: stderr.to_owned(),
        }
    }

    /// Everything the tool printed, used when reporting failures.
    pub fn raw(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            (out, "") => out.to_owned(),
            ("", err) => err.to_owned(),
            (out, err) => format!("{}\n{}", out, err),
        }
    }
}

/// Runs the RabbitMQ admin tools.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdminCli: Send + Sync {
    /// Runs `program` with `args` and waits for it to exit.
    async fn run(&self, program: Program, args: Vec<String>) -> Result<CommandOutput, AdminError>;
}

/// Runs the admin tools as local processes.
///
/// When `runas` is set every invocation is wrapped in `sudo -n -u <user> --`,
/// otherwise the tools run as the invoking user.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    runas: Option<String>,
}

impl ProcessRunner {
    /// Creates a runner executing as the invoking user.
    pub fn new() -> Self {
        ProcessRunner::default()
    }

    /// Creates a runner executing as `user`.
    pub fn runas(user: Option<String>) -> Self {
        ProcessRunner { runas: user }
    }

    /// Fails unless both `rabbitmqadmin` and `rabbitmqctl` are installed.
    pub fn ensure_available(&self) -> Result<(), AdminError> {
        for program in [Program::Admin, Program::Ctl] {
            if !is_in_path(program.as_str()) {
                error!(program = program.as_str(), "admin tool is not installed");
                return Err(AdminError::CommandUnavailable(program.as_str().to_owned()));
            }
        }
        Ok(())
    }

    fn command_line(&self, program: Program, args: Vec<String>) -> (String, Vec<String>) {
        match &self.runas {
            Some(user) => {
                let mut wrapped = vec![
                    "-n".to_owned(),
                    "-u".to_owned(),
                    user.clone(),
                    "--".to_owned(),
                    program.as_str().to_owned(),
                ];
                wrapped.extend(args);
                ("sudo".to_owned(), wrapped)
            }
            None => (program.as_str().to_owned(), args),
        }
    }
}

#[async_trait]
impl AdminCli for ProcessRunner {
    async fn run(&self, program: Program, args: Vec<String>) -> Result<CommandOutput, AdminError> {
        // args carry the management password, only the verb is logged
        debug!(
            program = program.as_str(),
            verb = args.first().map(String::as_str).unwrap_or_default(),
            runas = self.runas.as_deref().unwrap_or_default(),
            "running admin tool"
        );

        let (exe, args) = self.command_line(program, args);
        let output = match Command::new(&exe).args(&args).output().await {
            Ok(out) => Ok(out),
            Err(err) => {
                error!(error = err.to_string(), program = exe.as_str(), "failure to spawn");
                Err(AdminError::SpawnError(exe.clone(), err.to_string()))
            }
        }?;

        Ok(CommandOutput {
            retcode: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn is_in_path(program: &str) -> bool {
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| is_file(&dir.join(program))))
        .unwrap_or(false)
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_directly_without_runas() {
        let runner = ProcessRunner::new();
        let (exe, args) = runner.command_line(Program::Admin, vec!["list".to_owned()]);

        assert_eq!(exe, "rabbitmqadmin");
        assert_eq!(args, vec!["list"]);
    }

    #[test]
    fn wraps_in_sudo_with_runas() {
        let runner = ProcessRunner::runas(Some("rabbitmq".to_owned()));
        let (exe, args) = runner.command_line(Program::Ctl, vec!["list_permissions".to_owned()]);

        assert_eq!(exe, "sudo");
        assert_eq!(
            args,
            vec!["-n", "-u", "rabbitmq", "--", "rabbitmqctl", "list_permissions"]
        );
    }

    #[test]
    fn raw_output_joins_stdout_and_stderr() {
        let out = CommandOutput {
            retcode: 1,
            stdout: "partial\n".to_owned(),
            stderr: "*** Access refused\n".to_owned(),
        };
        assert_eq!(out.raw(), "partial\n*** Access refused");
        assert_eq!(CommandOutput::failure(2, "boom").raw(), "boom");
    }
}
