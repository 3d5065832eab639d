// Copyright 2026 Issuu Scout Contributors
// SPDX-License-Identifier: MIT

//! Issuu Scout CLI — entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use issuu_scout::renderer::{CommandInstaller, Remediator};
use issuu_scout::{BatchOrchestrator, ScrapeContext, Scraper};
use issuu_scout_cli::doctor::DoctorReport;
use issuu_scout_cli::report::{self, BatchReport};
use issuu_scout_cli::{load_company_names, logging, DEFAULT_COLUMN};

#[derive(Parser)]
#[command(
    name = "issuu-scout",
    about = "Find Issuu publications that belong to a company",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    /// Platform origin (overrides ISSUU_SCOUT_BASE_URL).
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Chromium binary (overrides discovery).
    #[arg(long, global = true)]
    chromium: Option<PathBuf>,

    /// Skip the static HTML path and always render.
    #[arg(long, global = true)]
    no_static: bool,

    /// Never run the Chromium installer automatically.
    #[arg(long, global = true)]
    no_install: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape one company and print matching / non-matching publications.
    Search {
        /// Company name as typed by the user.
        company: String,

        /// Print JSON instead of tables.
        #[arg(long)]
        json: bool,

        /// Also write JSON to this file (`-` for issuu_results_<name>.json).
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Scrape every company named in a CSV column.
    Batch {
        /// CSV file with a header row.
        #[arg(long)]
        csv: PathBuf,

        /// Column holding company names.
        #[arg(long, default_value = DEFAULT_COLUMN)]
        column: String,

        /// Companies scraped at once.
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Write the JSON report here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check Chromium and installer availability.
    Doctor,

    /// Download Chrome for Testing into ~/.issuu-scout/chromium.
    Install,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   issuu-scout completions bash > ~/.local/share/bash-completion/completions/issuu-scout
    ///   issuu-scout completions zsh > ~/.zfunc/_issuu-scout
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn build_context(cli: &Cli) -> Result<ScrapeContext> {
    let mut ctx = ScrapeContext::from_env()?;
    if let Some(base) = &cli.base_url {
        ctx = ctx.with_base_url(base)?;
    }
    if let Some(path) = &cli.chromium {
        ctx.chromium_path = Some(path.clone());
    }
    if cli.no_static {
        ctx.static_first = false;
    }
    if cli.no_install {
        ctx.remediate = false;
    }
    Ok(ctx)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("cannot write {}", path.display()))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

async fn search(
    ctx: ScrapeContext,
    company: &str,
    json: bool,
    output: Option<String>,
) -> Result<()> {
    let scraper = Scraper::new(ctx);
    let result = scraper.scrape(company).await;

    if json {
        println!("{}", report::search_json(&result)?);
    } else {
        print!("{}", report::render_search(company, &result));
    }

    if let Some(out) = output {
        let path = if out == "-" {
            PathBuf::from(report::default_output_name(company))
        } else {
            PathBuf::from(out)
        };
        write_file(&path, &report::search_json(&result)?)?;
    }
    Ok(())
}

async fn batch(
    ctx: ScrapeContext,
    csv: &Path,
    column: &str,
    concurrency: Option<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    let names = load_company_names(csv, column)?;
    if names.is_empty() {
        anyhow::bail!("no company names in column `{column}` of {}", csv.display());
    }

    let limit = concurrency.unwrap_or(ctx.concurrency).max(1);
    let orchestrator = BatchOrchestrator::new(Arc::new(Scraper::new(ctx)));
    let results = orchestrator.run(&names, limit).await;
    let batch_report = BatchReport::new(limit, results);

    let encoded = serde_json::to_string_pretty(&batch_report)?;
    match output {
        Some(path) => {
            write_file(&path, &encoded)?;
            eprint!("{}", report::render_batch_summary(&batch_report));
        }
        None => println!("{encoded}"),
    }
    Ok(())
}

async fn install() -> Result<()> {
    let installer = CommandInstaller::default_location()?;
    println!("Running: {} {}", installer.program, installer.args.join(" "));
    installer.remediate().await?;
    println!("Chromium installed.");
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "issuu-scout",
                &mut std::io::stdout(),
            );
            Ok(())
        }
        Commands::Install => install().await,
        Commands::Doctor => {
            let ctx = build_context(&cli)?;
            print!("{}", DoctorReport::gather(&ctx).render());
            Ok(())
        }
        Commands::Search {
            company,
            json,
            output,
        } => {
            let ctx = build_context(&cli)?;
            search(ctx, company, *json, output.clone()).await
        }
        Commands::Batch {
            csv,
            column,
            concurrency,
            output,
        } => {
            let ctx = build_context(&cli)?;
            batch(ctx, csv, column, *concurrency, output.clone()).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_json);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
