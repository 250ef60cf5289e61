use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use enrich_common::{Config, RunReport};
use enrich_pipeline::table::write_results_csv;
use enrich_pipeline::{Enricher, ExtractionProvider, FailurePolicy, LookupProvider, Table};
use serpapi_client::SerpApiClient;
use sheets_client::{a1_range, quote_sheet_name, SheetsClient};

const DEFAULT_PROMPT: &str = "Find the email address of {entity}";

#[derive(Parser)]
#[command(name = "enrich")]
#[command(about = "Enrich table rows with a web search and an LLM extraction per entity")]
#[command(version)]
struct Cli {
    /// CSV file to read entities from
    #[arg(short, long, required_unless_present = "sheet_id", conflicts_with = "sheet_id")]
    input: Option<PathBuf>,

    /// Google Sheet to read entities from (needs GOOGLE_SHEETS_ACCESS_TOKEN)
    #[arg(long)]
    sheet_id: Option<String>,

    /// Sheet (tab) name within the spreadsheet
    #[arg(long, default_value = "Sheet1")]
    sheet_name: String,

    /// Column holding the entity to search for
    #[arg(short, long)]
    column: String,

    /// Prompt template; {entity} is replaced with each row's value
    #[arg(short, long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Where to write the entity,extracted_info CSV
    #[arg(short, long, default_value = "results.csv")]
    output: PathBuf,

    /// Also write the source table, with the extracted column added, as CSV
    #[arg(long)]
    table_output: Option<PathBuf>,

    /// Write the source table back with the extracted column added
    #[arg(long)]
    update_sheet: bool,

    /// Column that receives extracted values in the augmented table
    #[arg(long, default_value = "Extracted Info")]
    target_column: String,

    /// Max entities in flight at once (overrides ENRICH_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Search results per entity (overrides ENRICH_NUM_RESULTS)
    #[arg(long)]
    num_results: Option<u32>,

    /// Record failing entities and keep going instead of aborting the run
    #[arg(long)]
    keep_going: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::from_default_env()
        .add_directive("enrich=info".parse()?)
        .add_directive("enrich_pipeline=info".parse()?)
        .add_directive("sheets_client=info".parse()?);
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = Config::from_env()?;
    config.log_redacted();

    if cli.update_sheet && cli.sheet_id.is_none() {
        bail!("--update-sheet requires --sheet-id");
    }

    let sheets = match cli.sheet_id {
        Some(_) => {
            let token = config
                .sheets_access_token
                .clone()
                .context("GOOGLE_SHEETS_ACCESS_TOKEN is required to read a sheet")?;
            Some(SheetsClient::new(token))
        }
        None => None,
    };

    // Load the table
    let mut table = match (&cli.input, &cli.sheet_id, &sheets) {
        (Some(path), _, _) => Table::from_csv_path(path)?,
        (None, Some(sheet_id), Some(sheets)) => {
            let values = sheets
                .get_values(sheet_id, &quote_sheet_name(&cli.sheet_name))
                .await
                .context("Failed to read Google Sheet")?;
            Table::from_values(values)?
        }
        _ => bail!("either --input or --sheet-id is required"),
    };
    info!(rows = table.len(), columns = table.headers().len(), "Loaded table");

    let entities: Vec<String> = table
        .column_values(&cli.column)?
        .into_iter()
        .filter(|e| {
            let blank = e.trim().is_empty();
            if blank {
                warn!(column = cli.column.as_str(), "Skipping blank entity cell");
            }
            !blank
        })
        .collect();

    // Build providers once and hand them to the orchestrator
    let call_timeout = Duration::from_secs(config.call_timeout_secs);

    let searcher = SerpApiClient::new(config.serpapi_api_key.clone());
    let lookup = LookupProvider::new(Arc::new(searcher))
        .with_num_results(cli.num_results.unwrap_or(config.num_results))
        .with_call_timeout(call_timeout);

    let mut agent = OpenAi::new(&config.openai_api_key, &config.openai_model);
    if let Some(ref url) = config.openai_base_url {
        agent = agent.with_base_url(url);
    }
    let extraction = ExtractionProvider::new(Arc::new(agent)).with_call_timeout(call_timeout);

    let enricher = Enricher::new(lookup, extraction)
        .with_concurrency(cli.concurrency.unwrap_or(config.concurrency));

    let policy = if cli.keep_going {
        FailurePolicy::CollectErrors
    } else {
        FailurePolicy::AbortOnFirst
    };

    let RunReport { results, failures } = enricher
        .run_with_policy(&entities, &cli.prompt, policy)
        .await?;

    for failure in &failures {
        warn!(
            entity = failure.entity.as_str(),
            error = failure.error.as_str(),
            "Entity not enriched"
        );
    }

    // Results CSV
    let file = std::fs::File::create(&cli.output)
        .with_context(|| format!("Failed to create {}", cli.output.display()))?;
    write_results_csv(&results, file)?;
    info!(
        path = %cli.output.display(),
        results = results.len(),
        failures = failures.len(),
        "Enrichment complete, results written"
    );

    if cli.table_output.is_none() && !cli.update_sheet {
        return Ok(());
    }

    let filled = table.merge_results(&cli.column, &cli.target_column, &results)?;

    // Augmented table as CSV
    if let Some(ref path) = cli.table_output {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        table.write_csv(file)?;
        info!(
            path = %path.display(),
            rows = filled,
            column = cli.target_column.as_str(),
            "Augmented table written"
        );
    }

    // Write back to the sheet
    if cli.update_sheet {
        if let (Some(sheet_id), Some(sheets)) = (&cli.sheet_id, &sheets) {
            sheets
                .update_values(sheet_id, &a1_range(&cli.sheet_name, "A1"), table.to_values())
                .await
                .context("Failed to update Google Sheet")?;
            info!(
                rows = filled,
                column = cli.target_column.as_str(),
                "Google Sheet updated with extracted info"
            );
        }
    }

    Ok(())
}
