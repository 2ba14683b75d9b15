use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use switchboard_config::{FailurePolicy, TEMPLATE_IDS, WorkflowDef, template};
use switchboard_gateway::{GatewayServer, RunRegistry};
use switchboard_runtime::{RunEvent, RunStatus, Runtime, encode_line};
use switchboard_workflow::{Graph, validate};

mod config;

use config::{AppConfig, default_data_dir};

/// Switchboard - run agent workflow graphs and stream their traces
#[derive(Parser)]
#[command(name = "switchboard")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.switchboard)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to the config file (default: <data_dir>/config.toml)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow, printing one JSON event per line
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: Option<PathBuf>,

    /// Run a built-in template instead of a file
    #[arg(long, conflicts_with = "workflow_file")]
    template: Option<String>,

    /// Run input as JSON (default: read from stdin)
    #[arg(long)]
    input: Option<String>,

    #[command(flatten)]
    limits: LimitArgs,
  },

  /// Validate a workflow file
  Validate {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Serve the HTTP gateway
  Serve {
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[command(flatten)]
    limits: LimitArgs,
  },

  /// List built-in templates
  Templates,

  /// Print a built-in template as JSON
  Template {
    id: String,

    /// Write to a file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
  },
}

/// Overrides for the `[runtime]` config table.
#[derive(clap::Args)]
struct LimitArgs {
  /// Maximum node activations per run
  #[arg(long)]
  step_budget: Option<usize>,

  /// Extra attempts after a retryable node failure
  #[arg(long)]
  max_retries: Option<u32>,

  /// Timeout per node invocation
  #[arg(long)]
  timeout_ms: Option<u64>,

  /// Fail runs in which every branch failed
  #[arg(long)]
  fail_when_all_branches_fail: bool,
}

impl LimitArgs {
  fn apply(&self, config: &mut AppConfig) {
    let runtime = &mut config.runtime;
    if let Some(step_budget) = self.step_budget {
      runtime.step_budget = step_budget;
    }
    if let Some(max_retries) = self.max_retries {
      runtime.max_retries = max_retries;
    }
    if let Some(timeout_ms) = self.timeout_ms {
      runtime.node_timeout_ms = Some(timeout_ms);
    }
    if self.fail_when_all_branches_fail {
      runtime.failure_policy = FailurePolicy::FailWhenAllBranchesFail;
    }
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => default_data_dir()?,
  };
  let mut config = AppConfig::load(cli.config.as_deref(), &data_dir)?;

  match cli.command {
    Some(Commands::Run {
      workflow_file,
      template,
      input,
      limits,
    }) => {
      limits.apply(&mut config);
      let def = load_workflow(workflow_file.as_deref(), template.as_deref())?;
      let input = match input {
        Some(raw) => serde_json::from_str(&raw).context("failed to parse --input JSON")?,
        None => read_payload_from_stdin()?,
      };
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_workflow(def, input, config))
    }
    Some(Commands::Validate { workflow_file }) => validate_workflow(&workflow_file),
    Some(Commands::Serve { host, port, limits }) => {
      limits.apply(&mut config);
      if let Some(host) = host {
        config.gateway.host = host;
      }
      if let Some(port) = port {
        config.gateway.port = port;
      }
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(serve(config))
    }
    Some(Commands::Templates) => {
      list_templates();
      Ok(())
    }
    Some(Commands::Template { id, output }) => export_template(&id, output.as_deref()),
    None => {
      println!("switchboard - use --help to see available commands");
      Ok(())
    }
  }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();
}

fn load_workflow(workflow_file: Option<&Path>, template_id: Option<&str>) -> Result<WorkflowDef> {
  match (workflow_file, template_id) {
    (Some(path), _) => read_workflow_file(path),
    (None, Some(id)) => template(id).with_context(|| {
      format!(
        "unknown template '{}' (available: {})",
        id,
        TEMPLATE_IDS.join(", ")
      )
    }),
    (None, None) => bail!("provide a workflow file or --template"),
  }
}

fn read_workflow_file(path: &Path) -> Result<WorkflowDef> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read workflow file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", path.display()))
}

async fn run_workflow(def: WorkflowDef, input: serde_json::Value, config: AppConfig) -> Result<()> {
  eprintln!("Loaded workflow: {}", def.name);

  let validation = validate(&def);
  for warning in &validation.warnings {
    warn!(workflow_id = %def.workflow_id, warning = %warning, "workflow_warning");
  }
  let graph = Graph::new(def).context("workflow failed validation")?;

  let runtime = Runtime::simulated(config.runtime);
  let handle = runtime.start(graph, input);
  eprintln!("Run started: {}", handle.id());
  info!(run_id = %handle.id(), "run_submitted");

  let mut events = handle.subscribe();
  let mut stdout = io::stdout().lock();
  let mut terminal: Option<RunEvent> = None;
  loop {
    tokio::select! {
      event = events.next() => {
        let Some(event) = event else { break };
        writeln!(stdout, "{}", encode_line(&event)?)?;
        stdout.flush()?;
        if event.is_terminal() {
          terminal = Some(event);
        }
      }
      _ = tokio::signal::ctrl_c() => {
        eprintln!("Cancelling run {}", handle.id());
        let cancelled = handle.cancel();
        info!(run_id = %handle.id(), cancelled, "run_cancel_requested");
      }
    }
  }

  match terminal {
    Some(RunEvent::Error { error, .. }) => bail!("run failed: {}", error),
    Some(RunEvent::Complete {
      status: RunStatus::Cancelled,
      ..
    }) => bail!("run cancelled"),
    Some(_) => {
      eprintln!("Run completed");
      Ok(())
    }
    None => bail!("event stream ended without a terminal event"),
  }
}

fn validate_workflow(workflow_file: &Path) -> Result<()> {
  let def = read_workflow_file(workflow_file)?;
  let validation = validate(&def);

  eprintln!("{}", def.summary());
  println!("{}", serde_json::to_string_pretty(&validation)?);

  if !validation.is_valid() {
    bail!("workflow is invalid: {}", validation);
  }
  Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
  let registry = RunRegistry::new(Runtime::simulated(config.runtime))
    .with_retention(config.gateway.max_retained_runs);
  let server = GatewayServer::new(registry, config.gateway);

  let shutdown = CancellationToken::new();
  let signal = shutdown.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      info!("shutdown_requested");
      signal.cancel();
    }
  });

  server.serve(shutdown).await.context("gateway failed")
}

fn list_templates() {
  for id in TEMPLATE_IDS {
    if let Some(def) = template(id) {
      println!("{}\n{}\n", id, def.summary());
    }
  }
}

fn export_template(id: &str, output: Option<&Path>) -> Result<()> {
  let def = load_workflow(None, Some(id))?;
  let json = serde_json::to_string_pretty(&def)?;
  match output {
    Some(path) => {
      std::fs::write(path, json)
        .with_context(|| format!("failed to write template: {}", path.display()))?;
      eprintln!("Wrote {} to {}", id, path.display());
    }
    None => println!("{}", json),
  }
  Ok(())
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cli_parses_run_overrides() {
    let cli = Cli::try_parse_from([
      "switchboard",
      "run",
      "--template",
      "customer-support",
      "--step-budget",
      "10",
      "--fail-when-all-branches-fail",
    ])
    .unwrap();

    let Some(Commands::Run {
      template, limits, ..
    }) = cli.command
    else {
      panic!("expected run command");
    };
    assert_eq!(template.as_deref(), Some("customer-support"));

    let mut config = AppConfig::default();
    limits.apply(&mut config);
    assert_eq!(config.runtime.step_budget, 10);
    assert_eq!(
      config.runtime.failure_policy,
      FailurePolicy::FailWhenAllBranchesFail
    );
  }

  #[test]
  fn test_cli_rejects_file_and_template() {
    assert!(
      Cli::try_parse_from(["switchboard", "run", "wf.json", "--template", "customer-support"])
        .is_err()
    );
  }

  #[test]
  fn test_load_workflow_sources() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wf.json");
    std::fs::write(
      &path,
      serde_json::to_string(&switchboard_config::content_creation()).unwrap(),
    )
    .unwrap();

    let def = load_workflow(Some(&path), None).unwrap();
    assert_eq!(def.workflow_id, "content-creation");

    let def = load_workflow(None, Some("customer-support")).unwrap();
    assert_eq!(def.workflow_id, "customer-support");

    let err = load_workflow(None, Some("nope")).unwrap_err();
    assert!(err.to_string().contains("available: customer-support, content-creation"));
    assert!(load_workflow(None, None).is_err());
  }

  #[test]
  fn test_export_template_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    export_template("content-creation", Some(&path)).unwrap();

    let def: WorkflowDef = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(def.workflow_id, "content-creation");
    assert!(validate(&def).is_valid());
  }
}
