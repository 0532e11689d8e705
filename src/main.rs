use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use herald_config::Event;
use herald_runtime::{Client, ClientConfig};
use tracing_subscriber::EnvFilter;

mod workflows;

/// Herald - run notification workflows one step at a time
#[derive(Parser)]
#[command(name = "herald")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Fail on undefined template variables instead of rendering them empty
  #[arg(long, global = true)]
  strict_templates: bool,

  /// Resolve a step's providers one after another
  #[arg(long, global = true)]
  sequential_providers: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the discovered workflows, steps and schemas
  Discover,

  /// Execute or preview one step of a workflow
  Execute {
    /// Path to the event JSON (default: stdin)
    #[arg(long)]
    event: Option<PathBuf>,
  },

  /// Print the source descriptor of a workflow or step
  Code {
    #[arg(long)]
    workflow: String,

    #[arg(long)]
    step: Option<String>,
  },

  /// Print the health check
  Health,
}

fn main() -> Result<ExitCode> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("herald=info")),
    )
    .with_writer(io::stderr)
    .init();

  let Some(command) = cli.command else {
    println!("herald - use --help to see available commands");
    return Ok(ExitCode::SUCCESS);
  };

  let config = ClientConfig {
    concurrent_providers: !cli.sequential_providers,
    strict_templates: cli.strict_templates,
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run(command, config).await })
}

async fn run(command: Commands, config: ClientConfig) -> Result<ExitCode> {
  let client = Client::with_config(config);
  client
    .add_workflows(workflows::all())
    .await
    .context("failed to register sample workflows")?;

  match command {
    Commands::Discover => print_json(&client.discover())?,
    Commands::Execute { event } => {
      let event = read_event(event)?;
      match client.execute_workflow(event).await {
        Ok(output) => print_json(&output)?,
        Err(e) => {
          print_json(&e.to_response())?;
          return Ok(ExitCode::FAILURE);
        }
      }
    }
    Commands::Code { workflow, step } => match client.get_code(&workflow, step.as_deref()) {
      Ok(code) => print_json(&code)?,
      Err(e) => {
        print_json(&e.to_response())?;
        return Ok(ExitCode::FAILURE);
      }
    },
    Commands::Health => print_json(&client.health_check())?,
  }

  Ok(ExitCode::SUCCESS)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn read_event(path: Option<PathBuf>) -> Result<Event> {
  let input = match path {
    Some(path) => std::fs::read_to_string(&path)
      .with_context(|| format!("failed to read event file: {}", path.display()))?,
    None => {
      let mut input = String::new();
      io::stdin()
        .read_to_string(&mut input)
        .context("failed to read event from stdin")?;
      input
    }
  };

  serde_json::from_str(&input).context("failed to parse event JSON")
}
