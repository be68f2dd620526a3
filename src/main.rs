use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use remotejobs_ph::pipeline::{self, writer, BuildOptions, NewListing, Outcome, Pipeline};
use remotejobs_ph::query::present::ListingView;
use remotejobs_ph::query::QueryEngine;
use remotejobs_ph::report::{format_duration, issue_table, summary};
use remotejobs_ph::settings::{Settings, DEFAULT_CONFIG_PATH};
use remotejobs_ph::{Pool, RemoteType, SortMode};

#[derive(Parser)]
#[command(name = "remotejobs_ph", about = "Build and search the remote jobs PH directory")]
struct Cli {
    /// Settings file (missing file means built-in defaults)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the dataset
    Build,
    /// Run the full pipeline and report issues without writing
    Validate,
    /// Merge sources and rewrite the primary source in place
    MergeSources {
        /// Source to include (repeatable, default: every configured source)
        #[arg(long = "source")]
        sources: Vec<String>,
    },
    /// Append one listing to the primary source
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        category: String,
        /// Semicolon-separated (default: the category)
        #[arg(long, default_value = "")]
        tags: String,
        #[arg(long)]
        remote_type: Option<String>,
        /// 1 to 5
        #[arg(long)]
        rating: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        hiring_status: Option<String>,
    },
    /// Query the built dataset
    Search {
        #[arg(short, long)]
        query: Option<String>,
        /// Category filter (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Remote type filter (repeatable)
        #[arg(long = "remote")]
        remote: Vec<RemoteType>,
        /// relevance, name or first:<category>
        #[arg(long, default_value = "relevance")]
        sort: SortMode,
        /// Merge both pools into one list, deduplicated by name
        #[arg(long)]
        browse: bool,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;

    let result = match cli.command {
        Commands::Build => {
            let outcome = run_pipeline(&settings)?;
            print_outcome(&outcome);
            outcome.ensure_publishable().context("build failed, nothing written")?;
            let written = writer::write_dataset(&settings.output_dir, &outcome.dataset)
                .with_context(|| format!("writing dataset to {}", settings.output_dir.display()))?;
            for path in &written {
                println!("Wrote {}", path.display());
            }
            println!(
                "Built {} listings ({} community), {}",
                outcome.dataset.len(),
                outcome.dataset.community.len(),
                summary(&outcome.report)
            );
            Ok(())
        }
        Commands::Validate => {
            let outcome = run_pipeline(&settings)?;
            print_outcome(&outcome);
            if outcome.report.is_empty() {
                println!("Data is valid");
            }
            outcome.ensure_publishable().context("validation failed")?;
            Ok(())
        }
        Commands::MergeSources { sources } => {
            let outcome = pipeline::merge_sources(&settings, &sources, BuildOptions::default())?;
            print_outcome(&outcome);
            outcome.ensure_publishable().context("merge failed, primary source untouched")?;
            if let Some(primary) = settings.primary_source() {
                println!(
                    "Rewrote {} with {} listings",
                    primary.path.display(),
                    outcome.dataset.len()
                );
            }
            Ok(())
        }
        Commands::Add {
            name,
            url,
            category,
            tags,
            remote_type,
            rating,
            description,
            hiring_status,
        } => {
            let entry = NewListing {
                name,
                url,
                category,
                tags,
                remote_type,
                rating,
                description,
                hiring_status,
            };
            match pipeline::add_listing(&settings, entry, BuildOptions::default()) {
                Ok(listing) => {
                    println!("Added {} as '{}' ({})", listing.name, listing.id, listing.url);
                    Ok(())
                }
                Err(report) => {
                    print!("{}", issue_table(&report));
                    bail!("listing not added: {}", summary(&report));
                }
            }
        }
        Commands::Search {
            query,
            categories,
            remote,
            sort,
            browse,
            limit,
        } => {
            let dataset = writer::load_dataset(&settings.output_dir).with_context(|| {
                format!(
                    "reading dataset from {} (run `build` first)",
                    settings.output_dir.display()
                )
            })?;
            let mut engine = QueryEngine::from_settings(&settings.search);
            engine.set_pools(Arc::new(dataset.primary), Arc::new(dataset.community));
            engine.set_categories(&categories);
            engine.set_remote_types(remote);
            engine.set_sort(sort);
            if let Some(q) = query {
                engine.input_query(&q, Instant::now());
                engine.flush_query();
            }
            print_results(&engine, browse, limit);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn run_pipeline(settings: &Settings) -> anyhow::Result<Outcome> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("reading {} source(s)", settings.sources.len()));
    pb.enable_steady_tick(Duration::from_millis(120));

    let pipeline = Pipeline::new(settings, BuildOptions::default())?;
    let outcome = pipeline.run();
    pb.finish_and_clear();
    Ok(outcome?)
}

fn print_outcome(outcome: &Outcome) {
    for line in outcome.stages.lines() {
        println!("{}", line);
    }
    if !outcome.report.is_empty() {
        println!();
        print!("{}", issue_table(&outcome.report));
        println!("\n{}", summary(&outcome.report));
    }
}

fn print_results(engine: &QueryEngine, browse: bool, limit: usize) {
    if browse {
        for view in engine.browse().iter().take(limit) {
            println!("{}", view.render());
        }
    } else {
        for listing in engine.visible_primary().into_iter().take(limit) {
            println!("{}", ListingView::new(listing, Pool::Primary).render());
        }
        let secondary = engine.visible_secondary();
        if !secondary.is_empty() {
            println!("\n--- Community ---");
            for listing in secondary.into_iter().take(limit) {
                println!("{}", ListingView::new(listing, Pool::Community).render());
            }
        }
    }
    println!("\n{}", engine.jump_index().render());
    println!("{}", engine.results_message());
}
