use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use kubewire_client::{
    Client, FromObject, LogOptions, NamespaceRef, Pod, ReplicationController, WatchEvent,
    WatchEvents,
};

mod config;

use config::{FileConfig, Settings};

/// Kubewire - A command line client for the cluster control-plane REST API
#[derive(Parser, Debug)]
#[command(name = "kubewire")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// API base URL (default: http://localhost:8080/api/v1)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Namespace for namespaced resources (default: default)
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Config file (default: ~/.kubewire/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Show one resource, or list all of a kind
    Get { kind: Kind, name: Option<String> },

    /// Create a resource from a JSON manifest
    Create {
        #[arg(short = 'f', long = "filename", value_name = "FILE")]
        file: PathBuf,
    },

    /// Delete a resource
    Delete { kind: Kind, name: String },

    /// Print the log of a pod
    Logs {
        pod: String,

        /// Container name, when the pod has several
        #[arg(short, long)]
        container: Option<String>,

        /// Number of lines from the end of the log
        #[arg(long)]
        tail: Option<i64>,

        /// Prefix each line with its timestamp
        #[arg(long)]
        timestamps: bool,
    },

    /// Print changes to a kind as they happen
    Watch {
        kind: Kind,

        /// Stop after this many events
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    #[value(alias = "pods", alias = "po")]
    Pod,
    #[value(alias = "replicationcontroller", alias = "replicationcontrollers")]
    Rc,
    #[value(alias = "namespaces", alias = "ns")]
    Namespace,
}

impl Kind {
    fn from_manifest(kind: &str) -> Option<Self> {
        match kind {
            "Pod" => Some(Self::Pod),
            "ReplicationController" => Some(Self::Rc),
            "Namespace" => Some(Self::Namespace),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Rc => "replicationcontroller",
            Self::Namespace => "namespace",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let file = FileConfig::load(args.config.as_deref())?;
    let settings = Settings::resolve(file, args.host, args.namespace);
    debug!("using {} in namespace {}", settings.host, settings.namespace);

    let streaming = matches!(args.command, Command::Watch { .. });
    let client = settings.client(streaming)?;

    match args.command {
        Command::Get { kind, name } => get(&client, kind, name.as_deref()).await,
        Command::Create { file } => create(&client, &file).await,
        Command::Delete { kind, name } => delete(&client, kind, &name).await,
        Command::Logs {
            pod,
            container,
            tail,
            timestamps,
        } => {
            let options = LogOptions {
                container,
                tail_lines: tail,
                timestamps,
                ..Default::default()
            };
            let log = client
                .logs_with(&pod, &options)
                .await
                .with_context(|| format!("Failed to fetch logs for pod {}", pod))?;
            print!("{}", log);
            Ok(())
        }
        Command::Watch { kind, limit } => match kind {
            Kind::Pod => watch(client.watch_pods().await?, kind, limit, Pod::name).await,
            Kind::Rc => {
                let events = client.watch_replication_controllers().await?;
                watch(events, kind, limit, ReplicationController::name).await
            }
            Kind::Namespace => bail!("watching namespaces is not supported"),
        },
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn get(client: &Client, kind: Kind, name: Option<&str>) -> Result<()> {
    let context = || match name {
        Some(name) => format!("Failed to get {} {}", kind.label(), name),
        None => format!("Failed to list {}s", kind.label()),
    };

    match (kind, name) {
        (Kind::Pod, Some(name)) => print_json(&client.get_pod(name).await.with_context(context)?),
        (Kind::Pod, None) => print_json(&client.get_pods().await.with_context(context)?),
        (Kind::Rc, Some(name)) => print_json(
            &client
                .get_replication_controller(name)
                .await
                .with_context(context)?,
        ),
        (Kind::Rc, None) => print_json(
            &client
                .get_replication_controllers()
                .await
                .with_context(context)?,
        ),
        (Kind::Namespace, Some(name)) => {
            print_json(&client.get_namespace(name).await.with_context(context)?)
        }
        (Kind::Namespace, None) => {
            print_json(&client.get_namespaces().await.with_context(context)?)
        }
    }
}

async fn create(client: &Client, path: &Path) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let manifest: Value = serde_json::from_str(&content)
        .with_context(|| format!("Manifest {} is not valid JSON", path.display()))?;

    let kind_field = manifest
        .get("kind")
        .and_then(Value::as_str)
        .context("Manifest has no kind")?;
    let Some(kind) = Kind::from_manifest(kind_field) else {
        bail!("Unsupported kind: {}", kind_field);
    };

    let name = match kind {
        Kind::Pod => client.create_pod(&manifest).await.map(|pod| pod.metadata.name),
        Kind::Rc => client
            .create_replication_controller(&manifest)
            .await
            .map(|rc| rc.metadata.name),
        Kind::Namespace => client
            .create_namespace(&manifest)
            .await
            .map(|ns: NamespaceRef| ns.metadata.name),
    }
    .with_context(|| format!("Failed to create {}", kind.label()))?;

    println!("{}/{} created", kind.label(), name);
    Ok(())
}

async fn delete(client: &Client, kind: Kind, name: &str) -> Result<()> {
    match kind {
        Kind::Pod => client.delete_pod(name).await,
        Kind::Rc => client.delete_replication_controller(name).await,
        Kind::Namespace => client.delete_namespace(name).await,
    }
    .with_context(|| format!("Failed to delete {} {}", kind.label(), name))?;

    println!("{}/{} deleted", kind.label(), name);
    Ok(())
}

/// Print events until the limit, the end of the stream or Ctrl-C
async fn watch<K: FromObject>(
    mut events: WatchEvents<K>,
    kind: Kind,
    limit: Option<usize>,
    name: fn(&K) -> &str,
) -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut seen = 0;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                debug!("interrupted");
                break;
            }
            event = events.next() => match event {
                Some(Ok(event)) => {
                    println!("{}", describe(&event, kind, name));
                    seen += 1;
                    if limit.is_some_and(|limit| seen >= limit) {
                        break;
                    }
                }
                Some(Err(err)) => warn!("skipping event: {}", err),
                None => {
                    debug!("watch closed by server");
                    break;
                }
            },
        }
    }

    events.close();
    Ok(())
}

fn describe<K>(event: &WatchEvent<K>, kind: Kind, name: fn(&K) -> &str) -> String {
    let event_type = event.event_type().as_str();
    match event {
        WatchEvent::Added(object) | WatchEvent::Modified(object) | WatchEvent::Deleted(object) => {
            format!("{} {}/{}", event_type, kind.label(), name(object))
        }
        WatchEvent::Bookmark { resource_version } => format!(
            "{} {}",
            event_type,
            resource_version.as_deref().unwrap_or("-")
        ),
        WatchEvent::Error(status) => format!("{} {}", event_type, status),
    }
}
