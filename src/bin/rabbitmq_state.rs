// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use clap::{Parser, Subcommand};
use rabbitmq_state::{
    client::RabbitMQAdmin,
    command::ProcessRunner,
    config::{load_document, ConfigError, StateConfigs},
    errors::AdminError,
    topology::{RabbitMQTopology, Topology},
};
use std::{path::PathBuf, process::ExitCode, sync::Arc};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Converge RabbitMQ exchanges, queues and bindings")]
struct RootCli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(
        arg_required_else_help = true,
        about = "apply a JSON topology document"
    )]
    Apply {
        #[arg(short, long, value_name = "FILE", help = "topology document path")]
        file: PathBuf,

        #[arg(long, help = "report the changes without applying them")]
        test: bool,

        #[arg(long, value_name = "USER", help = "run the admin tools as USER")]
        runas: Option<String>,
    },
    #[command(about = "list permissions of the vhost, or of one user")]
    Permissions {
        #[arg(short, long, value_name = "USER", help = "list the vhosts USER can access")]
        user: Option<String>,

        #[arg(long, value_name = "USER", help = "run the admin tools as USER")]
        runas: Option<String>,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error("failure to render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = RootCli::parse();
    setup_logging();

    let outcome = match cli.command {
        Commands::Apply { file, test, runas } => apply(file, test, runas).await,
        Commands::Permissions { user, runas } => permissions(user, runas).await,
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            error!(error = err.to_string(), "run aborted");
            ExitCode::from(1)
        }
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_configs(test: bool, runas: Option<String>) -> Result<StateConfigs, CliError> {
    let mut configs = StateConfigs::from_env()?;
    if test {
        configs.options.test = true;
    }
    if runas.is_some() {
        configs.runas = runas;
    }
    Ok(configs)
}

async fn apply(file: PathBuf, test: bool, runas: Option<String>) -> Result<ExitCode, CliError> {
    let configs = load_configs(test, runas)?;
    let mut doc = load_document(&file)?;
    let connection = configs.document_connection(doc.connection.take());

    let runner = ProcessRunner::runas(configs.runas.clone());
    runner.ensure_available()?;

    info!(
        file = %file.display(),
        host = connection.host.as_str(),
        vhost = connection.vhost.as_str(),
        test = configs.options.test,
        "applying topology"
    );

    let admin = Arc::new(RabbitMQAdmin::new(Arc::new(runner), connection));
    let results = RabbitMQTopology::from_document(admin, configs.options, doc)
        .apply()
        .await?;

    println!("{}", serde_json::to_string_pretty(&results)?);

    if results.iter().all(|r| r.is_ok()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}

async fn permissions(user: Option<String>, runas: Option<String>) -> Result<ExitCode, CliError> {
    let configs = load_configs(false, runas)?;

    let runner = ProcessRunner::runas(configs.runas.clone());
    runner.ensure_available()?;

    let admin = RabbitMQAdmin::new(Arc::new(runner), configs.connection);
    let perms = match user {
        Some(user) => admin.list_user_permissions(&user).await?,
        None => admin.list_permissions().await?,
    };

    println!("{}", serde_json::to_string_pretty(&perms)?);
    Ok(ExitCode::SUCCESS)
}
