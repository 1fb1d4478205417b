//! ImagePilot entry point.
//!
//! Loads configuration, installs tracing, and runs the controller against an
//! in-memory cluster fed by newline-delimited JSON events on stdin.

mod cli_parser;

use std::future::Future;
use std::pin::Pin;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use imagepilot::config::{self, LogFormat};
use imagepilot::k8s::{Event, MemoryCluster};
use imagepilot::policy::{get_policy, get_policy_from_labels, PolicyOptions};
use imagepilot::{telemetry, Controller, ControllerHandle};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("serve");

    match command {
        "serve" | "" => run_serve().await,
        "check" => run_check(&args),
        "labels" => run_labels(&args),
        "help" | "--help" | "-h" => {
            if let Some(sub) = args.get(2) {
                cli_parser::print_command_help(sub);
            } else {
                cli_parser::print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("imagepilot {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            cli_parser::print_usage();
            ExitCode::from(2u8)
        }
    }
}

async fn run_serve() -> ExitCode {
    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2u8);
        }
    };
    telemetry::init(config.log_format);

    let cluster = match &config.cluster_manifest {
        Some(path) => match MemoryCluster::load(path) {
            Ok(cluster) => cluster,
            Err(e) => {
                tracing::error!(error = %e, path = %path.display(), "failed to load cluster manifest");
                return ExitCode::from(2u8);
            }
        },
        None => {
            tracing::warn!("no cluster manifest configured, starting with an empty cluster");
            MemoryCluster::new()
        }
    };
    let cluster = Arc::new(cluster);

    let (controller, handle) = match Controller::new(cluster.clone(), cluster.clone(), &config) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "failed to create controller");
            return ExitCode::from(2u8);
        }
    };
    let mut worker = tokio::spawn(controller.start());

    // One listener for the whole run so an interrupt is never missed while
    // a submit or the final drain is waiting on the cluster.
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let shutdown = handle.shutdown_token();

    let lines = BufReader::new(tokio::io::stdin()).lines();
    let joined = if feed_events(lines, handle, interrupt.as_mut()).await {
        shutdown.cancel();
        worker.await
    } else {
        tokio::select! {
            joined = &mut worker => joined,
            _ = interrupt.as_mut() => {
                tracing::info!("interrupt received while draining, dropping queued events");
                shutdown.cancel();
                worker.await
            }
        }
    };
    if let Err(e) = joined {
        tracing::error!(error = %e, "controller task failed");
        return ExitCode::FAILURE;
    }

    match serde_json::to_string_pretty(&cluster.manifest()) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to render cluster manifest");
            ExitCode::FAILURE
        }
    }
}

/// Submit event lines until EOF or `interrupt` fires. Returns true when
/// interrupted. The handle is dropped on return so the queue can drain.
async fn feed_events<R, F>(
    lines: Lines<R>,
    handle: ControllerHandle,
    interrupt: Pin<&mut F>,
) -> bool
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        _ = interrupt => {
            tracing::info!("interrupt received, shutting down");
            true
        }
        _ = submit_lines(lines, &handle) => false,
    }
}

/// Forward each JSON event line to the controller. Stops at EOF, on a read
/// error, or once the controller rejects an event.
async fn submit_lines<R>(mut lines: Lines<R>, handle: &ControllerHandle)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(error = %e, "failed to read events");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Event>(&line) {
            Ok(event) => {
                if let Err(e) = handle.submit(event).await {
                    tracing::warn!(error = %e, "event rejected");
                    return;
                }
            }
            Err(e) => tracing::warn!(error = %e, "skipping malformed event line"),
        }
    }
}

fn run_check(args: &[String]) -> ExitCode {
    telemetry::init(LogFormat::Pretty);

    let (Some(policy_name), Some(current), Some(new)) = (
        cli_parser::flag_value(args, "--policy"),
        cli_parser::flag_value(args, "--current"),
        cli_parser::flag_value(args, "--new"),
    ) else {
        cli_parser::print_command_help("check");
        return ExitCode::from(2u8);
    };

    let options = PolicyOptions {
        match_tag: cli_parser::has_flag(args, "--match-tag"),
    };
    let policy = get_policy(policy_name, options);

    match policy.should_update(current, new) {
        Ok(true) => {
            println!("update: {} -> {} ({})", current, new, policy);
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("no update: {} -> {} ({})", current, new, policy);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Cannot evaluate {}: {}", policy, e);
            ExitCode::from(2u8)
        }
    }
}

fn run_labels(args: &[String]) -> ExitCode {
    telemetry::init(LogFormat::Pretty);

    let labels = match cli_parser::parse_labels(args.get(2..).unwrap_or_default()) {
        Ok(labels) => labels,
        Err(e) => {
            eprintln!("{}", e);
            cli_parser::print_command_help("labels");
            return ExitCode::from(2u8);
        }
    };

    let policy = get_policy_from_labels(&labels);
    println!("name: {}", policy.name());
    println!("type: {}", policy.policy_type().as_str());
    ExitCode::SUCCESS
}
