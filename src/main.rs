use std::env;

use anyhow::{Context, Result};
use env_logger::Env;
use log::{info, warn};

use safemap_export::{
    config::{load_api_key, ExportConfig},
    dataset::Dataset,
    export::export_datasets,
    item::api::HttpPageFetcher,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let selectors: Vec<String> = env::args().skip(1).collect();
    let datasets = Dataset::select(selectors.as_slice())?;
    let config = ExportConfig::from_env();

    let service_key = load_api_key(&config.key_file)
        .with_context(|| format!("cannot start without an API key ({})", config.key_file.display()))?;

    let fetcher = HttpPageFetcher::new();
    let execution = export_datasets(&datasets, &config, &service_key, &fetcher)?;

    for step in &execution.steps {
        info!(
            "{}: {:?}, {} rows from {}/{} pages ({} skipped) in {:?}",
            step.name,
            step.status,
            step.write_count,
            step.pages_fetched,
            step.page_count,
            step.pages_skipped,
            step.duration
        );
    }
    for step in execution.failed_steps() {
        match step.failed_page {
            Some(page) => warn!("{}: stopped at page {}", step.name, page),
            None => warn!("{}: output could not be written", step.name),
        }
    }

    Ok(())
}
