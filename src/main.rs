//! ebb CLI: ingest Ethical Black Box triple logs and query them.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use ebb_graph::config::{ServiceConfig, StoreBackend};
use ebb_graph::graph::{GraphStore, open_store};
use ebb_graph::ingest::Ingestor;
use ebb_graph::paths::EbbPaths;
use ebb_graph::query::{InvolvementScope, QueryEngine, Role};
use ebb_graph::report::{self, ActorInteractionRow, EmotionCount, TimelinePoint};
use ebb_graph::table::TripleTable;

#[derive(Parser)]
#[command(name = "ebb", version, about = "Ethical Black Box triple log ingest and queries")]
struct Cli {
    /// Data directory for the durable graph store.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a throwaway in-memory store instead of the durable one.
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config and data directories and a default server.toml.
    Init,

    /// Merge a node1,node2,label CSV file into the graph store.
    Ingest {
        /// Path to the CSV file.
        #[arg(long)]
        file: PathBuf,
    },

    /// List the distinct node identifiers in the graph store.
    Nodes,

    /// Run a query against a CSV file (or the stored graph when no file is given).
    Query {
        /// CSV file to query.
        #[arg(long)]
        file: Option<PathBuf>,

        #[command(subcommand)]
        action: QueryAction,
    },
}

#[derive(Args)]
struct ScopeArg {
    /// Also count interactions where the entity is the objectOfAction.
    #[arg(long)]
    involving: bool,
}

impl ScopeArg {
    fn scope(&self) -> InvolvementScope {
        if self.involving {
            InvolvementScope::PerformedOrObject
        } else {
            InvolvementScope::PerformedBy
        }
    }
}

#[derive(Subcommand)]
enum QueryAction {
    /// Entities holding a role (Robot, Human, Action).
    Roles {
        #[arg(long)]
        role: Role,
    },
    /// The type and label of one entity.
    Attributes {
        #[arg(long)]
        entity: String,
    },
    /// Type and label of every entity of a role.
    SummaryTable {
        #[arg(long)]
        role: Role,
    },
    /// Interactions an entity took part in.
    Interactions {
        #[arg(long)]
        entity: String,
        #[command(flatten)]
        scope: ScopeArg,
    },
    /// Emotional state caused by one interaction.
    Emotion {
        #[arg(long)]
        interaction: String,
    },
    /// Every row about the nodes linked to one interaction.
    Context {
        #[arg(long)]
        interaction: String,
    },
    /// Interaction rows with dates and resulting emotional states.
    Summary {
        #[arg(long)]
        actor: String,
        #[command(flatten)]
        scope: ScopeArg,
    },
    /// Emotional states recorded directly on an entity.
    States {
        #[arg(long)]
        entity: String,
    },
    /// Distinct robot, human and action counts.
    Census,
    /// Interaction rows, emotion counts and timeline for every entity of a role.
    Report {
        #[arg(long)]
        role: Role,
        #[command(flatten)]
        scope: ScopeArg,
    },
}

#[derive(Serialize)]
struct RoleReport {
    rows: Vec<ActorInteractionRow>,
    counts: Vec<EmotionCount>,
    timeline: Vec<TimelinePoint>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn open(cli: &Cli) -> Result<Arc<dyn GraphStore>> {
    let backend = if cli.memory {
        StoreBackend::Memory
    } else {
        StoreBackend::Durable
    };
    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => EbbPaths::resolve()?.graph_dir(),
    };
    Ok(open_store(backend, &data_dir)?)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Init => {
            let paths = EbbPaths::resolve()?;
            paths.ensure_dirs()?;
            let config_file = paths.server_config_file();
            if !config_file.exists() {
                ServiceConfig::default().save(&config_file)?;
            }
            println!("Initialized ebb-graph config at {}", config_file.display());
        }

        Commands::Ingest { file } => {
            let store = open(&cli)?;
            let table = TripleTable::from_path(file)?;
            let report = Ingestor::new(store).ingest_table(&table)?;
            print_json(&report)?;
        }

        Commands::Nodes => {
            let store = open(&cli)?;
            print_json(&store.node_ids()?)?;
        }

        Commands::Query { file, action } => {
            let table = match file {
                Some(path) => TripleTable::from_path(path)?,
                None => open(&cli)?.to_table()?,
            };
            let engine = QueryEngine::new(table);
            run_query(&engine, action)?;
        }
    }

    Ok(())
}

fn run_query(engine: &QueryEngine, action: &QueryAction) -> Result<()> {
    match action {
        QueryAction::Roles { role } => print_json(&engine.entities_of_role(*role)),
        QueryAction::Attributes { entity } => print_json(&engine.attributes_of(entity)),
        QueryAction::SummaryTable { role } => print_json(&engine.attribute_summary(*role)),
        QueryAction::Interactions { entity, scope } => {
            print_json(&engine.interactions_for(entity, scope.scope()))
        }
        QueryAction::Emotion { interaction } => {
            print_json(&engine.emotional_state_for_interaction(interaction))
        }
        QueryAction::Context { interaction } => {
            print_json(&engine.interaction_context(interaction))
        }
        QueryAction::Summary { actor, scope } => {
            print_json(&engine.interaction_summary_for(actor, scope.scope()))
        }
        QueryAction::States { entity } => print_json(&engine.emotional_states_of(entity)),
        QueryAction::Census => print_json(&report::role_census(engine)),
        QueryAction::Report { role, scope } => {
            let rows = report::role_interaction_report(engine, *role, scope.scope());
            print_json(&RoleReport {
                counts: report::emotion_counts(&rows),
                timeline: report::emotional_timeline(&rows),
                rows,
            })
        }
    }
}
