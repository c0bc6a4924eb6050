use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use research_assistant::analysis::PaperAnalyst;
use research_assistant::config::{get_config, Config};
use research_assistant::llm::{generator_from_config, PromptSections};
use research_assistant::models::{PaperRecord, PaperReport, SearchQuery};
use research_assistant::sources::{known_sources, Aggregator, SourceInfo, SourceRegistry};
use research_assistant::utils::HttpClient;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Research Assistant - search scholarly papers and analyze them with a language model
#[derive(Parser, Debug)]
#[command(name = "research-assistant")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search scholarly papers and analyze them with a language model", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if std::io::stdout().is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search all enabled sources for papers
    #[command(alias = "s")]
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(long, short = 'n')]
        max_results: Option<usize>,
    },

    /// Analyze a paper: key findings, methodology, conclusions, limitations, future work
    Analyze {
        /// Paper id or URL (e.g. 2301.12345 or https://arxiv.org/abs/2301.12345v2)
        paper_id: String,
    },

    /// Summarize a paper: objective, methods, findings, significance
    Summarize {
        /// Paper id or URL
        paper_id: String,
    },

    /// List known sources and whether they are enabled
    Sources,

    /// Send a one-line prompt to the configured language model
    PingLlm,
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("research_assistant={}", level)),
    );

    let json = config.logging.format.as_deref() == Some("json");
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = get_config(cli.config.as_deref())?;
    init_tracing(&cli, &config);

    let format = cli.output.resolve();
    let ok = match &cli.command {
        Commands::Search { query, max_results } => {
            run_search(&config, query, *max_results, format).await?
        }
        Commands::Analyze { paper_id } => run_report(&config, paper_id, false, format).await?,
        Commands::Summarize { paper_id } => run_report(&config, paper_id, true, format).await?,
        Commands::Sources => {
            output_sources(&known_sources(&config), format);
            true
        }
        Commands::PingLlm => run_ping(&config).await?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_search(
    config: &Config,
    text: &str,
    max_results: Option<usize>,
    format: OutputFormat,
) -> Result<bool> {
    let client = Arc::new(HttpClient::new(&config.transport)?);
    let registry = SourceRegistry::from_config(config, client);
    let aggregator = Aggregator::from_registry(registry, &config.search);

    let query = SearchQuery::new(text)
        .max_results(max_results.unwrap_or(config.search.default_max_results));

    match aggregator.search_detailed(&query).await {
        Ok(result) => {
            for failure in &result.failures {
                tracing::warn!("{}", failure);
            }
            output_papers(&result.papers, format);
            Ok(true)
        }
        Err(err) => {
            eprintln!("Search for {:?} failed: {}", text, err);
            Ok(false)
        }
    }
}

async fn run_report(
    config: &Config,
    paper_id: &str,
    summary: bool,
    format: OutputFormat,
) -> Result<bool> {
    let analyst = match PaperAnalyst::from_config(config) {
        Ok(analyst) => analyst,
        Err(err) => {
            print_json(&err.to_report(paper_id))?;
            return Ok(false);
        }
    };

    let result = if summary {
        analyst.summarize(paper_id).await
    } else {
        analyst.analyze(paper_id).await
    };

    match result {
        Ok(report) => {
            output_report(&report, format)?;
            Ok(true)
        }
        Err(err) => {
            print_json(&err.to_report(paper_id))?;
            Ok(false)
        }
    }
}

async fn run_ping(config: &Config) -> Result<bool> {
    let generator = generator_from_config(config)?;
    let prompt = PromptSections::new(
        "You are a connectivity check.",
        "Reply with the single word: pong",
    );

    eprintln!(
        "Pinging {} backend with model {}...",
        generator.backend(),
        generator.model_id()
    );
    match generator.generate(&prompt).await {
        Ok(reply) => {
            println!("{}", reply.trim());
            Ok(true)
        }
        Err(err) => {
            eprintln!("Language model unreachable: {}", err);
            Ok(false)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Shorten to `max` characters, marking the cut with "..."
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn output_papers(papers: &[PaperRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Auto => match serde_json::to_string_pretty(papers) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize results: {}", e),
        },
        OutputFormat::Plain => {
            for paper in papers {
                println!(
                    "{} - {} ({})",
                    paper.title(),
                    paper.authors().join(", "),
                    paper.source()
                );
                println!("  ID: {}", paper.id());
                if !paper.venue().is_empty() {
                    println!("  Venue: {}", paper.venue());
                }
                println!();
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Title", "Authors", "Source", "Year", "Citations"]);

            for paper in papers {
                let year = paper.year().map(|y| y.to_string()).unwrap_or_default();
                table.add_row(vec![
                    Cell::new(truncate(paper.title(), 50)).add_attribute(Attribute::Bold),
                    Cell::new(truncate(&paper.authors().join(", "), 30)),
                    Cell::new(paper.source().to_string()),
                    Cell::new(year),
                    Cell::new(paper.citations()),
                ]);
            }
            println!("{table}");
        }
    }
}

fn output_report(report: &PaperReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => print_json(report)?,
        OutputFormat::Plain => {
            println!("Paper: {}", report.paper_id);
            for (key, text) in report.sections.iter() {
                println!("\n[{}]\n{}", key, text);
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, ContentArrangement, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                Cell::new(&report.paper_id).add_attribute(Attribute::Bold),
                Cell::new(""),
            ]);
            for (key, text) in report.sections.iter() {
                table.add_row(vec![Cell::new(key), Cell::new(text)]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn output_sources(sources: &[SourceInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Auto => match serde_json::to_string_pretty(sources) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize sources: {}", e),
        },
        OutputFormat::Plain => {
            for source in sources {
                let state = if source.enabled { "enabled" } else { "disabled" };
                println!("{} ({}) - {}", source.id, source.name, state);
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["ID", "Name", "Enabled"]);
            for source in sources {
                table.add_row(vec![
                    Cell::new(source.id),
                    Cell::new(source.name),
                    Cell::new(if source.enabled { "yes" } else { "no" }),
                ]);
            }
            println!("{table}");
        }
    }
}
