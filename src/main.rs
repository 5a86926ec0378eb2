use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use kiln_data::{ForceSchedulers, Properties};
use kiln_mq::NoopBus;
use kiln_scheduler::{BuildsetMechanism, ForceTrigger, TriggerDefinition, TriggerRegistry};
use kiln_store::SqliteStore;

/// Kiln - build-orchestration master control plane
#[derive(Parser)]
#[command(name = "kiln")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.kiln)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to the master config file (default: <data_dir>/kiln.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Inspect and run force triggers
  Triggers {
    #[command(subcommand)]
    action: TriggerAction,
  },

  /// Read properties of a build or buildset
  Properties {
    #[command(subcommand)]
    target: PropertyTarget,
  },

  /// Manage builders
  Builders {
    #[command(subcommand)]
    action: BuilderAction,
  },
}

#[derive(Subcommand)]
enum TriggerAction {
  /// List registered trigger descriptors
  List {
    /// Only triggers applying to this builder ID
    #[arg(long)]
    builder: Option<i64>,
  },

  /// Print one trigger descriptor, or null if the name does not resolve
  Describe { name: String },

  /// Run the force action on a named trigger
  Force {
    name: String,

    /// Parameter as key=value; the value is parsed as JSON, falling back
    /// to a plain string
    #[arg(short = 'p', long = "prop", value_name = "KEY=VALUE")]
    props: Vec<String>,

    /// Owner attribution (defaults to "user")
    #[arg(long)]
    owner: Option<String>,
  },
}

#[derive(Subcommand)]
enum PropertyTarget {
  /// Properties of a build, merged with its sourcestamp-derived ones
  Build { id: i64 },

  /// Properties of a buildset
  Buildset { id: i64 },
}

#[derive(Subcommand)]
enum BuilderAction {
  /// Register a builder by name, printing its ID
  Add { name: String },
}

/// Master configuration: the trigger definitions registered at load.
#[derive(Deserialize, Default)]
struct MasterConfig {
  #[serde(default)]
  triggers: Vec<TriggerDefinition>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let cli = Cli::parse();

  let data_dir = cli.data_dir.clone().unwrap_or_else(|| {
    dirs::home_dir()
      .expect("could not determine home directory")
      .join(".kiln")
  });

  match cli.command {
    Some(command) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run(command, cli.config, data_dir))
    }
    None => {
      println!("kiln - use --help to see available commands");
      Ok(())
    }
  }
}

async fn run(command: Commands, config: Option<PathBuf>, data_dir: PathBuf) -> Result<()> {
  tokio::fs::create_dir_all(&data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  let store = Arc::new(
    SqliteStore::open(&data_dir.join("kiln.db"))
      .await
      .context("failed to open database")?,
  );

  match command {
    Commands::Triggers { action } => {
      let config_path = config.unwrap_or_else(|| data_dir.join("kiln.json"));
      let registry = Arc::new(load_registry(&config_path, store.clone()).await?);
      let endpoint = ForceSchedulers::new(registry, store);

      match action {
        TriggerAction::List { builder } => {
          let descriptors = endpoint.list(builder).await?;
          println!("{}", serde_json::to_string_pretty(&descriptors)?);
        }
        TriggerAction::Describe { name } => {
          let descriptor = endpoint.describe(&name);
          println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
        TriggerAction::Force { name, props, owner } => {
          let args = parse_params(&props, owner)?;
          match endpoint.force(&name, &args).await {
            Ok(Some(result)) => println!("{}", serde_json::to_string_pretty(&result)?),
            Ok(None) => anyhow::bail!("no trigger named '{}'", name),
            Err(err) => {
              println!("{}", serde_json::to_string_pretty(&err.to_rpc())?);
              anyhow::bail!("force action failed");
            }
          }
        }
      }
    }

    Commands::Properties { target } => {
      let endpoint = Properties::new(store, Arc::new(NoopBus));
      let props = match target {
        PropertyTarget::Build { id } => endpoint.build_properties(id).await?,
        PropertyTarget::Buildset { id } => endpoint.buildset_properties(id).await?,
      };
      println!("{}", serde_json::to_string_pretty(&props)?);
    }

    Commands::Builders { action } => match action {
      BuilderAction::Add { name } => {
        let id = store.insert_builder(&name).await?;
        println!("{}", id);
      }
    },
  }

  Ok(())
}

async fn load_registry(config_path: &PathBuf, store: Arc<SqliteStore>) -> Result<TriggerRegistry> {
  let config: MasterConfig = match tokio::fs::read_to_string(config_path).await {
    Ok(content) => serde_json::from_str(&content)
      .with_context(|| format!("failed to parse config file: {}", config_path.display()))?,
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => MasterConfig::default(),
    Err(err) => {
      return Err(err)
        .with_context(|| format!("failed to read config file: {}", config_path.display()));
    }
  };

  let mechanism = Arc::new(BuildsetMechanism::new(store));
  let triggers = config
    .triggers
    .into_iter()
    .map(|definition| ForceTrigger::new(definition, mechanism.clone()))
    .collect();
  TriggerRegistry::new(triggers).context("invalid trigger configuration")
}

fn parse_params(
  props: &[String],
  owner: Option<String>,
) -> Result<serde_json::Map<String, serde_json::Value>> {
  let mut args = serde_json::Map::new();
  for prop in props {
    let (key, raw) = prop
      .split_once('=')
      .with_context(|| format!("expected KEY=VALUE, got '{}'", prop))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::from(raw));
    args.insert(key.to_string(), value);
  }
  if let Some(owner) = owner {
    args.insert("owner".to_string(), serde_json::Value::from(owner));
  }
  Ok(args)
}
