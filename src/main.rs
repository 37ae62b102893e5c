use chrono::Utc;
use dap_match::config::Settings;
use dap_match::core::{materialize, DeferredAcceptance};
use dap_match::data::{example_table, ingest, write_data_output, write_round_log, write_summary};
use dap_match::models::RunSummary;
use std::error::Error;
use std::path::Path;
use tracing::{error, info};
use validator::Validate;

fn main() {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging; environment variables override the config file
    let log_level =
        std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format =
        std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&log_level))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    if let Err(e) = settings.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(&settings) {
        error!("Run failed: {}", e);
        std::process::exit(1);
    }
}

fn run(settings: &Settings) -> Result<(), Box<dyn Error>> {
    let schema = settings.column_schema();

    // The seed only drives synthetic data; matching is deterministic once
    // the inputs are fixed
    let seed = settings.market.seed.unwrap_or_else(rand::random);
    info!(
        "Generating example market ({} rows, seed {})",
        settings.market.market_size, seed
    );
    let table = example_table(&settings.market, &schema, seed);
    let market = ingest(&table, &schema)?;

    info!("Data is loaded");
    info!("Applicant characteristics: {}", schema.a_chars.join(", "));
    info!("Applicant MRS: {}", schema.a_mrs.join(", "));
    info!("Reviewer characteristics: {}", schema.b_chars.join(", "));
    info!("Reviewer MRS: {}", schema.b_mrs.join(", "));
    info!("Market size: {}", market.size());

    info!("Starting the matching process...");
    let outcome = DeferredAcceptance::new(&market, false)?.run()?;

    let biased_outcome = if settings.market.bias {
        info!("Starting the bias-mode shadow matching...");
        Some(DeferredAcceptance::new(&market, true)?.run()?)
    } else {
        None
    };

    info!(
        "Converged after {} rounds and {} proposals",
        outcome.iterations, outcome.proposals
    );

    info!("Compiling the results...");
    let records = materialize(
        &market,
        &outcome,
        biased_outcome.as_ref(),
        settings.output.dap_allocation_vars,
    );

    let summary = RunSummary {
        spec_name: settings.output.spec_name.clone(),
        market_size: market.size(),
        iterations: outcome.iterations,
        proposals: outcome.proposals,
        matched_count: outcome.matched_count(),
        unmatched_count: market.size() - outcome.matched_count(),
        bias: settings.market.bias,
        finished_at: Utc::now(),
    };

    if settings.output.save_files {
        let dir = Path::new(&settings.output.output_dir);
        std::fs::create_dir_all(dir)?;
        write_data_output(
            dir,
            &settings.output.spec_name,
            &records,
            settings.output.graphs,
        )?;
        write_round_log(dir, &settings.output.spec_name, &outcome.rounds)?;
        write_summary(dir, &summary)?;
    }

    if settings.output.graphs {
        info!("Chart inputs are included in the output; rendering is left to external tooling");
    }

    info!(
        "Matched {} of {} applicants in {} rounds",
        summary.matched_count, summary.market_size, summary.iterations
    );

    Ok(())
}
