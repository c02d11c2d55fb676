//! Deliberatorium CLI
//!
//! Drives the deliberation pipeline over JSON proposition snapshots:
//! - `create`: open a proposition from flags or a request file
//! - `attach`: append evidence to a snapshot
//! - `assess`: classify every evidence item and aggregate scores
//! - `show`: print a snapshot's current standing

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use deliberatorium_core::{
    AssessmentReport, CreatePropositionRequest, CriterionSpec, DeliberationConfig,
    Deliberatorium, EvidenceSubmission, Proposition,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod backend;
mod snapshot;

use backend::{build_classifier, ClassifierArgs};
use snapshot::{load_json, load_proposition, save_proposition};

#[derive(Parser)]
#[command(name = "deliberate")]
#[command(
    author,
    version,
    about = "Deliberatorium: classify evidence and score propositions"
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new proposition and write its snapshot.
    ///
    /// The judging model recorded on the proposition comes from the selected
    /// classifier backend.
    Create {
        /// The question under deliberation, eg. "Ethereum above $2,600 on October 4?"
        #[arg(long, required_unless_present = "request")]
        statement: Option<String>,

        /// Outcome label (repeat for each criterion, in tie-break order)
        #[arg(short = 'c', long = "criterion")]
        criteria: Vec<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        proposer: Option<String>,

        /// Read a full creation request (JSON) instead of the flags above
        #[arg(long, conflicts_with_all = ["statement", "criteria", "category", "proposer"])]
        request: Option<PathBuf>,

        /// Snapshot file to write
        #[arg(short, long)]
        out: PathBuf,

        #[command(flatten)]
        classifier: ClassifierArgs,
    },

    /// Append evidence to a proposition snapshot (no classification).
    Attach {
        /// Proposition snapshot
        snapshot: PathBuf,

        /// Evidence text (repeat for each item)
        #[arg(short = 't', long = "text")]
        texts: Vec<String>,

        /// Participant credited with `--text` items
        #[arg(long, default_value = "cli")]
        participant: String,

        /// Channel credited with `--text` items
        #[arg(long, default_value = "cli")]
        channel: String,

        /// JSON array of evidence submissions (`-` for stdin)
        #[arg(long)]
        from: Option<PathBuf>,

        /// Write here instead of updating the snapshot in place
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Classify all evidence and recompute scores.
    Assess {
        /// Proposition snapshot
        snapshot: PathBuf,

        /// Write here instead of updating the snapshot in place
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Max classification calls in flight (0 = unbounded; default from
        /// DELIBERATORIUM_MAX_CONCURRENCY)
        #[arg(long)]
        max_concurrency: Option<usize>,

        #[command(flatten)]
        classifier: ClassifierArgs,
    },

    /// Print a proposition's criteria, scores and evidence.
    Show {
        /// Proposition snapshot
        snapshot: PathBuf,

        /// Print the raw snapshot JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Create {
            statement,
            criteria,
            category,
            proposer,
            request,
            out,
            classifier,
        } => {
            let request = match request {
                Some(path) => load_json(&path)?,
                None => CreatePropositionRequest {
                    statement: statement.unwrap_or_default(),
                    criteria: criteria.iter().map(|c| CriterionSpec::new(c)).collect(),
                    category,
                    proposer,
                },
            };
            cmd_create(request, &out, &classifier)?;
        }
        Commands::Attach {
            snapshot,
            texts,
            participant,
            channel,
            from,
            out,
        } => {
            let mut items: Vec<EvidenceSubmission> = match from {
                Some(path) => load_json(&path)?,
                None => Vec::new(),
            };
            items.extend(
                texts
                    .iter()
                    .map(|text| EvidenceSubmission::new(text, &participant, &channel)),
            );
            cmd_attach(&snapshot, items, out.as_deref())?;
        }
        Commands::Assess {
            snapshot,
            out,
            max_concurrency,
            classifier,
        } => {
            let mut config = DeliberationConfig::from_env()?;
            if let Some(limit) = max_concurrency {
                config = config.with_max_concurrency(limit);
            }
            cmd_assess(&snapshot, out.as_deref(), &classifier, config).await?;
        }
        Commands::Show { snapshot, json } => {
            cmd_show(&snapshot, json)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_create(request: CreatePropositionRequest, out: &Path, args: &ClassifierArgs) -> Result<()> {
    let deliberatorium = Deliberatorium::new(build_classifier(args)?);
    let proposition = deliberatorium.create(request)?;

    save_proposition(out, &proposition)?;
    eprintln!(
        "{} proposition {} ({} criteria)",
        "created".green().bold(),
        proposition.id,
        proposition.criteria().len()
    );
    eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());
    Ok(())
}

fn cmd_attach(path: &Path, items: Vec<EvidenceSubmission>, out: Option<&Path>) -> Result<()> {
    if items.is_empty() {
        return Err(anyhow!("no evidence given (use --text or --from)"));
    }

    let mut proposition = load_proposition(path)?;
    let ids = proposition.attach_evidence(items)?;

    let out = out.unwrap_or(path);
    save_proposition(out, &proposition)?;
    eprintln!(
        "{} attached {} evidence item(s), {} total",
        "ok".green().bold(),
        ids.len(),
        proposition.evidence().len()
    );
    eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());
    Ok(())
}

async fn cmd_assess(
    path: &Path,
    out: Option<&Path>,
    args: &ClassifierArgs,
    config: DeliberationConfig,
) -> Result<()> {
    let mut proposition = load_proposition(path)?;
    let deliberatorium = Deliberatorium::with_config(build_classifier(args)?, config);

    let report = deliberatorium.assess(&mut proposition).await?;

    let out = out.unwrap_or(path);
    save_proposition(out, &proposition)?;
    print_report(&report);
    print_standing(&proposition);
    eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());
    Ok(())
}

fn cmd_show(path: &Path, json: bool) -> Result<()> {
    let proposition = load_proposition(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&proposition.snapshot()?)?);
    } else {
        print_standing(&proposition);
    }
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn print_report(report: &AssessmentReport) {
    println!(
        "{} classified {}/{} evidence item(s) ({:.0}% coverage)",
        "ok".green().bold(),
        report.labelled,
        report.dispatched,
        report.coverage() * 100.0
    );
    for (evidence_id, reason) in &report.unavailable {
        println!("  {} {evidence_id}: {reason}", "skipped".yellow().bold());
    }
}

fn print_standing(proposition: &Proposition) {
    println!("{}", proposition.statement.bold());
    println!("  id: {}", proposition.id);
    if let Some(category) = &proposition.category {
        println!("  category: {category}");
    }
    for model in &proposition.judging_models {
        println!("  judged by: {} {}", model.provider, model.version);
    }

    let winner = proposition.winning_criterion().map(|c| c.value.as_str());
    println!("  criteria:");
    for criterion in proposition.criteria() {
        let marker = if winner == Some(criterion.value.as_str()) {
            "★".yellow().bold().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "    {marker} {:<12} {:.2}  {}",
            criterion.value,
            criterion.score(),
            criterion.description.dimmed()
        );
    }

    println!(
        "  evidence: {} ({} classified)",
        proposition.evidence().len(),
        proposition.classified_count()
    );
    for item in proposition.evidence() {
        let label = match item.winning_criterion() {
            Some(criterion) => criterion.value.green().to_string(),
            None => "-".dimmed().to_string(),
        };
        println!(
            "    [{label}] {}@{}: {}",
            item.participant, item.channel, item.text
        );
    }
}
