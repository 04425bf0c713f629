//! `drover-agent`: runs tasks on a host until the control server says stop.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use drover_agent::{
    AgentConfig, AgentOptions, CommandExecutor, HostIdentity, HttpControlServer, NoopExecutor,
    STATUS_PORT, TaskExecutor, TaskIdentity, exit_code, run_process,
};
use drover_core::mark_process_start;
use drover_observe::{LogContext, LoggerConfig, LoggerFormat, logger_init};

#[derive(Parser)]
#[command(
    name = "drover-agent",
    version,
    about = "Runs tasks handed out by the control server"
)]
struct Cli {
    /// Id of the first task to run.
    #[arg(long)]
    task_id: String,
    /// Secret for the first task.
    #[arg(long)]
    task_secret: String,
    /// Id of this host.
    #[arg(long)]
    host_id: String,
    /// Secret for this host.
    #[arg(long)]
    host_secret: String,
    /// Control server base URL.
    #[arg(long)]
    api_server: String,
    /// PEM certificate to trust for the control server.
    #[arg(long)]
    https_cert: Option<PathBuf>,
    /// Marker file holding this process's pid while it runs.
    #[arg(long)]
    pid_file: Option<PathBuf>,
    /// Port of the local diagnostics listener.
    #[arg(long, default_value_t = STATUS_PORT)]
    status_port: u16,
    /// Log filter directive.
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Log output: text, json or journald.
    #[arg(long, default_value = "text")]
    log_format: String,
    /// Program to run for every task. Without it tasks succeed immediately.
    #[arg(long)]
    task_command: Option<String>,
    /// Argument passed to the task program. Repeatable.
    #[arg(long = "task-arg")]
    task_args: Vec<String>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::from(exit_code::FAILURE as u8)
        }
    }
}

fn run() -> Result<u8> {
    let cli = Cli::parse();
    mark_process_start();

    let options = AgentOptions {
        api_server: cli.api_server,
        task: TaskIdentity::new(cli.task_id, cli.task_secret),
        host: HostIdentity::new(cli.host_id, cli.host_secret),
        https_cert: cli.https_cert,
        pid_file: cli.pid_file,
    };
    let session = options.into_session().context("invalid agent arguments")?;

    let logger = LoggerConfig {
        format: cli
            .log_format
            .parse::<LoggerFormat>()
            .context("invalid --log-format")?,
        level: cli.log_level,
        ..LoggerConfig::default()
    };
    logger_init(&logger).context("initialize logger")?;

    let config = AgentConfig::default().with_status_port(cli.status_port);
    let control = HttpControlServer::new(session.certificate(), config.connect_timeout)
        .context("build control server client")?;
    let executor: Arc<dyn TaskExecutor> = match cli.task_command {
        Some(program) => Arc::new(CommandExecutor::new(program, cli.task_args)),
        None => Arc::new(NoopExecutor),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    let exit = runtime
        .block_on(run_process(
            session,
            Arc::new(control),
            executor,
            &config,
            LogContext::new("drover-agent"),
        ))
        .context("agent startup")?;

    if let Some(err) = &exit.error {
        eprintln!("agent failed after {} task(s): {}", exit.tasks_run, err);
    }
    Ok(u8::try_from(exit.code).unwrap_or(exit_code::FAILURE as u8))
}
