//! provgraph CLI: assemble provenance documents for a pipeline or a notebook.
//!
//! Usage:
//!   provgraph assemble <project dir> --out <dir> [--config file] [--db path]
//!   provgraph notebook <path> --out <dir>

use clap::{Parser, Subcommand, ValueEnum};
use provgraph::{
    AssemblerConfig, FileLimit, GitResolver, GraphStore, MatchStrictness, NotebookProvenanceDriver,
    OpenStore, PipelineAssembler, PipelineProvenance, ProvError, ProvResult, SourceControlResolver,
    SqliteStore, StaticResolver, VersioningOrder,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "provgraph",
    version,
    about = "Provenance graph assembler for notebook pipelines"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the provenance document of a whole pipeline
    Assemble {
        /// Project directory holding the driver script
        #[arg(default_value = ".")]
        project: PathBuf,
        /// Output directory for the documents
        #[arg(long, short)]
        out: PathBuf,
        /// YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Driver script name, relative to the project directory
        #[arg(long)]
        driver: Option<String>,
        /// Files taken per wildcard pattern: a count or "unlimited"
        #[arg(long, value_parser = parse_file_limit)]
        file_limit: Option<FileLimit>,
        #[arg(long, value_enum)]
        strictness: Option<StrictnessArg>,
        #[arg(long, value_enum)]
        order: Option<OrderArg>,
        /// Also describe input files as of the previous checkpoint commit
        #[arg(long)]
        previous_state: bool,
        /// Resolve files without git, against a fixed base URL and commit
        #[arg(long, requires_all = ["base_url", "commit"])]
        offline: bool,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        commit: Option<String>,
        /// Also store the graphs in this SQLite database
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Build the provenance document of a single notebook
    Notebook {
        /// Path to the .ipynb file
        path: PathBuf,
        /// Output directory for the document
        #[arg(long, short)]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrictnessArg {
    Exact,
    IgnoreVersionDigit,
}

impl From<StrictnessArg> for MatchStrictness {
    fn from(arg: StrictnessArg) -> Self {
        match arg {
            StrictnessArg::Exact => MatchStrictness::Exact,
            StrictnessArg::IgnoreVersionDigit => MatchStrictness::IgnoreVersionDigit,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    InputsThenOutputs,
    CellByCell,
}

impl From<OrderArg> for VersioningOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::InputsThenOutputs => VersioningOrder::InputsThenOutputs,
            OrderArg::CellByCell => VersioningOrder::CellByCell,
        }
    }
}

fn parse_file_limit(s: &str) -> Result<FileLimit, String> {
    s.parse().map_err(|e: provgraph::ConfigError| e.to_string())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "provgraph=warn",
        1 => "provgraph=info",
        _ => "provgraph=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct ResolverChoice {
    offline: bool,
    base_url: Option<String>,
    commit: Option<String>,
}

fn open_resolver(
    project: &Path,
    config: &AssemblerConfig,
    choice: ResolverChoice,
) -> ProvResult<Box<dyn SourceControlResolver>> {
    if choice.offline {
        let (Some(base_url), Some(commit)) = (choice.base_url, choice.commit) else {
            return Err(ProvError::Value("--offline needs --base-url and --commit".to_string()));
        };
        return Ok(Box::new(StaticResolver::new(project, base_url, commit)));
    }
    let pattern = config.checkpoint_regex()?;
    Ok(Box::new(GitResolver::open(project, &config.remote_name, pattern)?))
}

fn save_to_db(db: &Path, provenance: &PipelineProvenance) -> ProvResult<()> {
    let store = SqliteStore::open(db)?;
    store.save_graph(&provenance.graph)?;
    for run in &provenance.notebooks {
        store.save_graph(&run.provenance.graph)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_assemble(
    project: PathBuf,
    out: PathBuf,
    config_path: Option<PathBuf>,
    driver: Option<String>,
    file_limit: Option<FileLimit>,
    strictness: Option<StrictnessArg>,
    order: Option<OrderArg>,
    previous_state: bool,
    resolver: ResolverChoice,
    db: Option<PathBuf>,
) -> ProvResult<()> {
    let mut config = AssemblerConfig::load(config_path.as_deref())?;
    if let Some(driver) = driver {
        config = config.with_driver_script(driver);
    }
    if let Some(limit) = file_limit {
        config = config.with_file_limit(limit);
    }
    if let Some(strictness) = strictness {
        config = config.with_match_strictness(strictness.into());
    }
    if let Some(order) = order {
        config = config.with_versioning_order(order.into());
    }
    if previous_state {
        config = config.with_previous_state(true);
    }

    let resolver = open_resolver(&project, &config, resolver)?;
    let provenance = PipelineAssembler::new(&project, config, resolver.as_ref()).assemble()?;
    let path = provenance.write(&out)?;
    if let Some(db) = db {
        save_to_db(&db, &provenance)?;
    }

    println!(
        "Wrote {} ({} steps, {} notebooks, {} files)",
        path.display(),
        provenance.steps.len(),
        provenance.notebooks.len(),
        provenance.files.len()
    );
    Ok(())
}

fn cmd_notebook(path: &Path, out: &Path) -> ProvResult<()> {
    let provenance = NotebookProvenanceDriver::new().run(path, out)?;
    println!(
        "Wrote {} ({} code cells)",
        out.join(provgraph::storage::METADATA_FILE).display(),
        provenance.cells.len()
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Assemble {
            project,
            out,
            config,
            driver,
            file_limit,
            strictness,
            order,
            previous_state,
            offline,
            base_url,
            commit,
            db,
        } => cmd_assemble(
            project,
            out,
            config,
            driver,
            file_limit,
            strictness,
            order,
            previous_state,
            ResolverChoice {
                offline,
                base_url,
                commit,
            },
            db,
        ),
        Commands::Notebook { path, out } => cmd_notebook(&path, &out),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
