//! Helpers shared by the integration tests.
#![allow(dead_code)]

use std::{fs, path::Path};

use safemap_export::{
    config::{load_api_key, ExportConfigBuilder},
    core::job::JobExecution,
    dataset::Dataset,
    error::ExportError,
    export::export_datasets,
    item::{api::HttpPageFetcher, csv::csv_writer::UTF8_BOM},
};

pub const SERVICE_KEY: &str = "test-service-key";

/// Upstream answer holding `items`, each a list of (field, value) pairs.
pub fn response_body(total_count: u64, items: &[Vec<(&str, &str)>]) -> String {
    let items: String = items
        .iter()
        .map(|fields| {
            let children: String = fields
                .iter()
                .map(|(name, value)| format!("<{name}>{value}</{name}>"))
                .collect();
            format!("<item>{children}</item>")
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<response>
  <header><resultCode>00</resultCode><resultMsg>NORMAL SERVICE.</resultMsg></header>
  <body>
    <items>{items}</items>
    <numOfRows>{count}</numOfRows>
    <pageNo>1</pageNo>
    <totalCount>{total_count}</totalCount>
  </body>
</response>"#,
        count = items.len()
    )
}

/// Body of a page whose items only carry an `OBJT_ID`.
pub fn ids_body(total_count: u64, ids: &[&str]) -> String {
    let items: Vec<Vec<(&str, &str)>> = ids.iter().map(|id| vec![("OBJT_ID", *id)]).collect();
    response_body(total_count, &items)
}

/// Runs a full export job against `base_url`, writing into `output_dir`.
///
/// Blocking: call it from `spawn_blocking` when a mock server runs on the
/// test runtime.
pub fn run_export(
    base_url: &str,
    output_dir: &Path,
    page_size: u32,
    datasets: &[Dataset],
) -> Result<JobExecution, ExportError> {
    let key_file = output_dir.join("api_key.txt");
    fs::write(&key_file, format!("{SERVICE_KEY}\n")).expect("write key file");

    let config = ExportConfigBuilder::new()
        .base_url(base_url)
        .key_file(&key_file)
        .output_dir(output_dir)
        .page_size(page_size)
        .build();
    let service_key = load_api_key(&config.key_file)?;

    export_datasets(datasets, &config, &service_key, &HttpPageFetcher::new())
}

/// Lines of a CSV file written by the exporter, after checking its byte order mark.
pub fn read_csv_lines(path: &Path) -> Vec<String> {
    let bytes = fs::read(path).expect("read csv file");
    assert!(bytes.starts_with(UTF8_BOM), "missing byte order mark");
    let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).expect("utf-8 csv");
    text.lines().map(str::to_string).collect()
}
