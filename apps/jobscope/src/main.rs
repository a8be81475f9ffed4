mod canonical;
mod config;
mod errors;
mod ingest;
mod models;
mod recommender;
mod routes;
mod skills;
mod state;
mod storage;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::ingest::{
    run_clean_stage, CleanContext, KaggleCleaner, RemotiveCleaner, SecondaryCleaner, SourceCleaner,
};
use crate::recommender::{run_train_stage, RecommenderIndex};
use crate::routes::build_router;
use crate::skills::{run_graph_stage, SkillAliases, SkillNormalizer};
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "jobscope",
    version,
    about = "Job-feed canonicalization, skill graph and explainable recommendations"
)]
struct Cli {
    /// Seed for row sampling; defaults to JOBSCOPE_SEED
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve recommendations over HTTP
    Serve(ServeArgs),
    #[command(flatten)]
    Batch(BatchCommand),
}

#[derive(Subcommand, Debug)]
enum BatchCommand {
    /// Clean the Kaggle postings feed
    CleanKaggle(CleanArgs),
    /// Clean the Remotive API dump
    CleanRemotive(CleanArgs),
    /// Clean a secondary Kaggle dump (file or directory)
    CleanSecondary(CleanArgs),
    /// Merge the cleaned feeds into the deduplicated canonical table
    BuildCanonical(CanonicalArgs),
    /// Build the skill co-occurrence graph from the canonical table
    SkillGraph(GraphArgs),
    /// Fit the recommender index and precompute demo recommendations
    TrainRecommender(TrainArgs),
    /// Print recommendations for a profile as JSON
    Recommend(RecommendArgs),
}

#[derive(Args, Debug)]
struct CleanArgs {
    /// Raw feed file (.csv, .json, .jsonl) or directory
    #[arg(long)]
    input: Option<PathBuf>,
    /// Cleaned table (.parquet; a .csv sibling is always written)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Keep at most this many raw rows
    #[arg(long)]
    sample: Option<usize>,
    /// JSON alias table replacing the built-in one
    #[arg(long)]
    aliases: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CanonicalArgs {
    /// Cleaned per-source table; repeat for each feed, in priority order
    #[arg(long = "input")]
    inputs: Vec<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// JSON alias table replacing the built-in one. The table in use is
    /// exported to ARTIFACTS_DIR/skill_aliases.json
    #[arg(long)]
    aliases: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GraphArgs {
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Minimum co-occurrence count for a link
    #[arg(long)]
    min_edge_weight: Option<usize>,
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Canonical table
    #[arg(long)]
    input: Option<PathBuf>,
    /// Model directory
    #[arg(long)]
    output: Option<PathBuf>,
    /// Recommendations per demo profile
    #[arg(long)]
    top_k: Option<usize>,
    #[arg(long)]
    max_features: Option<usize>,
}

#[derive(Args, Debug)]
struct RecommendArgs {
    /// Model directory
    #[arg(long)]
    input: Option<PathBuf>,
    /// Write the JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    /// Free-text profile
    #[arg(long)]
    profile: String,
    #[arg(long)]
    top_k: Option<usize>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Model directory
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Serve(args) => serve(config, args).await,
        Command::Batch(command) => {
            let seed = cli.seed.unwrap_or(config.seed);
            tokio::task::spawn_blocking(move || run_batch(&config, command, seed))
                .await
                .context("stage task panicked")?
        }
    }
}

// ────────────────────────────────────────────────────────────
// Batch stages
// ────────────────────────────────────────────────────────────

fn run_batch(config: &Config, command: BatchCommand, seed: u64) -> Result<()> {
    match command {
        BatchCommand::CleanKaggle(args) => {
            let input = args
                .input
                .clone()
                .unwrap_or_else(|| config.raw_kaggle_dir().join("jobs_kaggle_raw.csv"));
            let cleaner = KaggleCleaner::for_input(&input)?;
            clean(config, &cleaner, input, args, seed, "jobs_kaggle_clean.parquet")
        }
        BatchCommand::CleanRemotive(args) => {
            let input = args
                .input
                .clone()
                .unwrap_or_else(|| config.raw_remotive_dir().join("jobs_remotive_raw.json"));
            clean(config, &RemotiveCleaner, input, args, seed, "jobs_remotive_clean.parquet")
        }
        BatchCommand::CleanSecondary(args) => {
            let input = args
                .input
                .clone()
                .unwrap_or_else(|| config.raw_kaggle_dir().join("secondary"));
            clean(config, &SecondaryCleaner, input, args, seed, "jobs_secondary_clean.parquet")
        }
        BatchCommand::BuildCanonical(args) => {
            let inputs = if args.inputs.is_empty() {
                ["jobs_kaggle_clean.parquet", "jobs_remotive_clean.parquet", "jobs_secondary_clean.parquet"]
                    .iter()
                    .map(|name| config.processed_dir().join(name))
                    .collect()
            } else {
                args.inputs
            };
            let output = args.output.unwrap_or_else(|| config.canonical_path());
            let aliases = load_aliases(args.aliases.as_deref().or(config.skill_aliases_path.as_deref()))?;
            canonical::run_merge_stage(&inputs, &output, &aliases, &config.skill_aliases_export_path())?;
            Ok(())
        }
        BatchCommand::SkillGraph(args) => {
            let input = args.input.unwrap_or_else(|| config.canonical_path());
            let output = args.output.unwrap_or_else(|| config.skill_graph_path());
            let min_edge_weight = args.min_edge_weight.unwrap_or(config.min_edge_weight);
            run_graph_stage(&input, &output, min_edge_weight)?;
            Ok(())
        }
        BatchCommand::TrainRecommender(args) => {
            let input = args.input.unwrap_or_else(|| config.canonical_path());
            let model_dir = args.output.unwrap_or_else(|| config.recommender_dir());
            let report = run_train_stage(
                &input,
                &model_dir,
                &config.artifacts_dir,
                args.top_k.unwrap_or(config.top_k),
                args.max_features.unwrap_or(config.max_features),
            )?;
            info!(
                "Recommender trained: rows={} vocabulary={} demo={}",
                report.manifest.rows,
                report.manifest.vocabulary_size,
                report.demo_recs_path.display()
            );
            Ok(())
        }
        BatchCommand::Recommend(args) => {
            let model_dir = args.input.unwrap_or_else(|| config.recommender_dir());
            let index = RecommenderIndex::load(&model_dir)?;
            let recs = index.recommend(&args.profile, args.top_k.unwrap_or(config.top_k));
            match args.output {
                Some(path) => storage::write_json_atomic(&path, &recs)?,
                None => println!("{}", serde_json::to_string_pretty(&recs)?),
            }
            Ok(())
        }
    }
}

fn clean<C: SourceCleaner>(
    config: &Config,
    cleaner: &C,
    input: PathBuf,
    args: CleanArgs,
    seed: u64,
    default_output: &str,
) -> Result<()> {
    let input = ingest::raw::resolve_data_file(&input)?;
    let output = args
        .output
        .unwrap_or_else(|| config.processed_dir().join(default_output));
    let aliases = load_aliases(args.aliases.as_deref().or(config.skill_aliases_path.as_deref()))?;
    let normalizer = SkillNormalizer::new(aliases);
    let ctx = CleanContext {
        normalizer: &normalizer,
        ingested_at: Utc::now(),
        sample: args.sample,
        seed,
    };
    run_clean_stage(cleaner, &input, &output, &ctx)?;
    Ok(())
}

fn load_aliases(path: Option<&Path>) -> Result<SkillAliases> {
    match path {
        Some(path) => SkillAliases::from_json_file(path)
            .with_context(|| format!("Failed to load skill aliases from {}", path.display())),
        None => Ok(SkillAliases::builtin()),
    }
}

// ────────────────────────────────────────────────────────────
// HTTP server
// ────────────────────────────────────────────────────────────

async fn serve(config: Config, args: ServeArgs) -> Result<()> {
    info!("Starting jobscope v{}", env!("CARGO_PKG_VERSION"));

    let model_dir = args.input.unwrap_or_else(|| config.recommender_dir());
    let port = args.port.unwrap_or(config.port);
    let index = {
        let dir = model_dir.clone();
        tokio::task::spawn_blocking(move || RecommenderIndex::load(&dir))
            .await
            .context("index load task panicked")?
            .with_context(|| format!("Failed to load recommender artifacts from {}", model_dir.display()))?
    };

    let state = AppState::new(Arc::new(config), index, model_dir);
    let app = build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
