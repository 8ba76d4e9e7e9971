//! longbox-id - Comic identification and organization CLI
//!
//! Scans folders of comic archives, identifies each file against the
//! knowledge base and reference sources, and organizes accepted files into
//! the templated library layout. Knowledge-base edits happen here between
//! runs; a run always works against an immutable snapshot.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use longbox_common::config::{load_toml_config, resolve_library_root, TomlConfig};
use longbox_common::events::EventBus;

use longbox_id::config::{load_engine_settings, resolve_comicvine_api_key};
use longbox_id::db::knowledge::{list_knowledge, remove_knowledge, upsert_knowledge};
use longbox_id::db::reference::ReferenceDatabase;
use longbox_id::models::knowledge::KnowledgeBase;
use longbox_id::services::{
    ComicVineClient, Disposition, Organizer, QueueProcessor, RunMode, Scanner,
};
use longbox_id::{ComicKnowledge, MetadataSource};

#[derive(Parser)]
#[command(name = "longbox-id", version, about = "Comic identification and organization engine")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Library root folder organized files are placed under
    #[arg(long, global = true)]
    library_root: Option<PathBuf>,

    /// Concurrent in-flight files during identification
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Path to a read-only reference database file
    #[arg(long, global = true)]
    reference_db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Identify files under a folder and report what each would get (dry run)
    Scan {
        /// Folder to scan for comic archives
        dir: PathBuf,
    },

    /// Identify files under a folder, then organize accepted ones
    Organize {
        /// Folder to scan for comic archives
        dir: PathBuf,

        /// Copy into the library instead of moving (keep originals)
        #[arg(long)]
        copy: bool,

        /// Also organize files identified with status Warning
        #[arg(long)]
        include_warnings: bool,
    },

    /// Edit the knowledge base (between runs)
    Kb {
        #[command(subcommand)]
        command: KbCommand,
    },

    /// Query the local reference database for diagnostics
    Lookup {
        /// Series name to search
        series: String,

        /// Issue number for issue-level details
        issue: Option<String>,
    },
}

#[derive(Subcommand)]
enum KbCommand {
    /// List every knowledge-base record
    List,

    /// Add or update a series record
    Add {
        /// Canonical series name
        series: String,

        #[arg(long)]
        publisher: Option<String>,

        /// Alternate name (repeatable)
        #[arg(long)]
        alias: Vec<String>,

        #[arg(long)]
        start_year: Option<u16>,

        #[arg(long)]
        volumes: Option<u16>,
    },

    /// Remove a series record
    Remove {
        /// Canonical series name
        series: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let toml_config = load_toml_config(cli.config.as_deref())?;
    let db_path = toml_config
        .database_path
        .clone()
        .unwrap_or_else(longbox_common::config::default_database_path);
    let pool = longbox_id::db::init_database_pool(&db_path).await?;

    match cli.command {
        Command::Scan { ref dir } => {
            let dir = dir.clone();
            let processor = build_processor(&cli, &toml_config, &pool).await?;
            run_queue(&processor, &dir, RunMode::DryRun).await?;
        }
        Command::Organize {
            ref dir,
            copy,
            include_warnings,
        } => {
            let dir = dir.clone();
            let mut processor = build_processor(&cli, &toml_config, &pool).await?;
            if copy {
                processor = processor.with_keep_originals();
            }
            run_queue(&processor, &dir, RunMode::Organize { include_warnings }).await?;
        }
        Command::Kb { command } => match command {
            KbCommand::List => {
                let records = list_knowledge(&pool).await?;
                if records.is_empty() {
                    println!("Knowledge base is empty.");
                }
                for record in records {
                    let publisher = record.publisher.as_deref().unwrap_or("-");
                    let aliases = if record.aliases.is_empty() {
                        String::new()
                    } else {
                        format!("  aka: {}", record.aliases.join(", "))
                    };
                    println!("{}  [{}]{}", record.series_name, publisher, aliases);
                }
            }
            KbCommand::Add {
                series,
                publisher,
                alias,
                start_year,
                volumes,
            } => {
                let record = ComicKnowledge {
                    series_name: series.clone(),
                    publisher,
                    aliases: alias,
                    start_year,
                    volume_count: volumes,
                };
                upsert_knowledge(&pool, &record).await?;
                println!("Stored knowledge for \"{}\"", series);
            }
            KbCommand::Remove { series } => {
                if remove_knowledge(&pool, &series).await? {
                    println!("Removed \"{}\"", series);
                } else {
                    println!("No knowledge record for \"{}\"", series);
                }
            }
        },
        Command::Lookup { series, issue } => {
            let path = cli
                .reference_db
                .clone()
                .or_else(|| toml_config.reference_db_path.clone())
                .ok_or_else(|| anyhow!("No reference database configured (--reference-db)"))?;
            let reference = ReferenceDatabase::new(path);
            if !reference.connect().await {
                return Err(anyhow!("Could not open reference database"));
            }

            let candidates = reference.search_series_records(&series).await?;
            if candidates.is_empty() {
                println!("No series matched \"{}\"", series);
            }
            for candidate in &candidates {
                println!(
                    "[{}] {}  publisher: {}  began: {}  issues: {}",
                    candidate.id,
                    candidate.name,
                    candidate.publisher.as_deref().unwrap_or("-"),
                    candidate
                        .year_began
                        .map(|y| y.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    candidate
                        .issue_count
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                );
            }

            if let (Some(issue), Some(first)) = (issue, candidates.first()) {
                match reference.get_issue_details(first.id, &issue).await? {
                    Some(details) => {
                        println!("\n{} #{}", first.name, issue);
                        if let Some(title) = details.title {
                            println!("  title: {}", title);
                        }
                        if let Some(date) = details.publication_date {
                            println!("  published: {}", date);
                        }
                        if let Some(synopsis) = details.synopsis {
                            println!("  synopsis: {}", synopsis);
                        }
                        if let Some(issue_id) = reference.find_issue_id(first.id, &issue).await? {
                            for creator in reference.get_issue_creators(issue_id).await? {
                                println!("  {}: {}", creator.role, creator.name);
                            }
                        }
                    }
                    None => println!("No issue #{} recorded for {}", issue, first.name),
                }
            }
            reference.disconnect().await;
        }
    }

    Ok(())
}

/// Assemble the queue processor from configuration and collaborators
async fn build_processor(
    cli: &Cli,
    toml_config: &TomlConfig,
    pool: &sqlx::SqlitePool,
) -> Result<ProcessorHandle> {
    let library_root = resolve_library_root(cli.library_root.as_deref(), toml_config);
    let mut settings = load_engine_settings(pool, toml_config).await?;
    if let Some(concurrency) = cli.concurrency {
        settings.concurrency = concurrency.max(1);
    }

    let records = list_knowledge(pool).await?;
    tracing::info!(entries = records.len(), "Knowledge base snapshot loaded");
    let knowledge_base = KnowledgeBase::from_records(records);

    let mut sources: Vec<Arc<dyn MetadataSource>> = Vec::new();

    let reference_path = cli
        .reference_db
        .clone()
        .or_else(|| toml_config.reference_db_path.clone());
    if let Some(path) = reference_path {
        let reference = ReferenceDatabase::new(path);
        if reference.connect().await {
            sources.push(Arc::new(reference));
        }
    }

    match resolve_comicvine_api_key(pool, toml_config).await? {
        Some(key) => match ComicVineClient::new(key) {
            Ok(client) => sources.push(Arc::new(client)),
            Err(e) => tracing::warn!(error = %e, "ComicVine client unavailable"),
        },
        None => tracing::debug!("No ComicVine API key; remote enrichment disabled"),
    }

    Ok(ProcessorHandle {
        knowledge_base,
        sources,
        library_root,
        settings,
    })
}

/// Deferred processor construction so CLI flags can adjust settings
struct ProcessorHandle {
    knowledge_base: KnowledgeBase,
    sources: Vec<Arc<dyn MetadataSource>>,
    library_root: PathBuf,
    settings: longbox_id::EngineSettings,
}

impl ProcessorHandle {
    fn with_keep_originals(mut self) -> Self {
        self.settings.keep_originals = true;
        self
    }

    fn build(&self) -> QueueProcessor {
        QueueProcessor::new(
            self.knowledge_base.clone(),
            self.sources.clone(),
            Organizer::new(self.library_root.clone()),
            self.settings.clone(),
            EventBus::new(100),
        )
    }
}

/// Scan a folder, run the queue, and print per-file outcomes
async fn run_queue(handle: &ProcessorHandle, dir: &PathBuf, mode: RunMode) -> Result<()> {
    let paths = Scanner::new()
        .scan(dir)
        .with_context(|| format!("Scanning {}", dir.display()))?;
    if paths.is_empty() {
        println!("No comic archives found under {}", dir.display());
        return Ok(());
    }
    println!("Found {} comic archive(s)", paths.len());

    let processor = handle.build();
    let files = QueueProcessor::queue_files(paths);
    let summary = processor
        .run(files, mode, CancellationToken::new())
        .await;

    for result in &summary.results {
        let confidence = result
            .file
            .confidence
            .map(|c| c.as_str())
            .unwrap_or("-");
        let line = match &result.disposition {
            Disposition::Organized { final_path } => {
                format!("-> {}", final_path.display())
            }
            Disposition::OrganizeFailed { message } => format!("organize failed: {}", message),
            Disposition::Cancelled => "cancelled".to_string(),
            Disposition::Identified => match &result.destination {
                Some(dest) => format!("=> {}", dest),
                None => result
                    .file
                    .error
                    .clone()
                    .unwrap_or_else(|| "unresolved".to_string()),
            },
        };
        println!(
            "[{:7}] [{:6}] {}  {}",
            result.file.status.as_str(),
            confidence,
            result.file.display_name,
            line
        );
    }

    let session = &summary.session;
    println!(
        "\nSession {}: {} ({} file(s), {} error(s))",
        session.session_id,
        format!("{:?}", session.state).to_uppercase(),
        summary.results.len(),
        session.errors.len()
    );

    if matches!(mode, RunMode::Organize { .. }) {
        let log = processor.action_log();
        let log = log.lock().await;
        if !log.is_empty() {
            println!("\nRecent actions:");
            for action in log.actions() {
                println!("  [{}] {}", action.kind.as_str(), action.message);
            }
        }
    }

    Ok(())
}
