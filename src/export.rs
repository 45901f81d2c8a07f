//! Wiring of a dataset export from configuration.

use std::fs::File;

use crate::{
    config::{ExportConfig, ServiceKey},
    core::{
        item::{ItemWriter, PageFetcher},
        job::{Job, JobBuilder, JobExecution},
        step::{PaginatedStep, StepBuilder},
    },
    dataset::Dataset,
    error::ExportError,
    item::{
        api::QueryParameters,
        csv::csv_writer::{CsvItemWriter, CsvItemWriterBuilder},
        xml::{Record, RecordExtractorBuilder},
    },
};

/// CSV writer for `dataset`, targeting its file in the output directory.
///
/// The file is created when the writer is opened, not before.
pub fn dataset_writer(dataset: &Dataset, config: &ExportConfig) -> CsvItemWriter<File> {
    CsvItemWriterBuilder::new()
        .headers(dataset.fields)
        .from_path(config.output_path(dataset.file_name))
}

/// Base request parameters of `dataset`.
pub fn dataset_params(
    dataset: &Dataset,
    config: &ExportConfig,
    service_key: &ServiceKey,
) -> QueryParameters {
    QueryParameters::new(
        config.endpoint(dataset.service),
        service_key.clone(),
        config.data_type.as_str(),
    )
}

/// Step exporting `dataset` through `fetcher` into `writer`.
pub fn dataset_step<'a>(
    dataset: &Dataset,
    config: &ExportConfig,
    service_key: &ServiceKey,
    fetcher: &'a dyn PageFetcher,
    writer: &'a dyn ItemWriter<Record>,
) -> Result<PaginatedStep<'a>, ExportError> {
    StepBuilder::new()
        .name(dataset.name)
        .params(dataset_params(dataset, config, service_key))
        .page_size(config.page_size)
        .fetcher(fetcher)
        .extractor(RecordExtractorBuilder::new().fields(dataset.fields).build())
        .writer(writer)
        .build()
}

/// Exports every dataset in order, one step each, within a single job.
///
/// A dataset whose export fails does not prevent the next ones: its failure
/// is recorded in the returned [`JobExecution`]. An error is only returned
/// when the steps cannot be assembled.
pub fn export_datasets(
    datasets: &[Dataset],
    config: &ExportConfig,
    service_key: &ServiceKey,
    fetcher: &dyn PageFetcher,
) -> Result<JobExecution, ExportError> {
    let writers: Vec<_> = datasets
        .iter()
        .map(|dataset| dataset_writer(dataset, config))
        .collect();
    let steps = datasets
        .iter()
        .zip(&writers)
        .map(|(dataset, writer)| dataset_step(dataset, config, service_key, fetcher, writer))
        .collect::<Result<Vec<_>, _>>()?;

    let job = steps
        .iter()
        .fold(JobBuilder::new().name("safemap-export".to_string()), |builder, step| {
            builder.next(step)
        })
        .build();

    job.run()
}
