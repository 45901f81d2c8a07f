use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    error::ExportError,
    item::{
        api::{CountProbe, Paginator, QueryParameters},
        xml::{Record, RecordExtractor},
    },
};

use super::{
    build_name,
    item::{ItemWriter, PageFetcher},
};

/// Status of a step execution.
///
/// ```text
/// Starting -> NoData                      (total count is zero)
/// Starting -> Success                     (every page requested)
/// Starting -> Aborted                     (a page request failed)
/// Starting -> WriteError                  (the output could not be written)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step has started and not finished yet.
    Starting,
    /// The count probe reported no record; nothing was written.
    NoData,
    /// Every page has been requested.
    Success,
    /// A page request failed; later pages were not requested.
    Aborted,
    /// The output could not be opened or written.
    WriteError,
}

impl StepStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepStatus::Aborted | StepStatus::WriteError)
    }
}

/// Represents the execution of a step.
#[derive(Debug)]
pub struct StepExecution {
    /// Unique identifier for this step execution
    pub id: Uuid,
    /// Human-readable name for the step
    pub name: String,
    /// Current status of the step execution
    pub status: StepStatus,
    pub start_time: Instant,
    pub end_time: Instant,
    pub duration: Duration,
    /// Record count reported by the count probe
    pub total_count: u64,
    /// Number of pages the paginator planned
    pub page_count: u32,
    /// Number of pages answered with a success status
    pub pages_fetched: u32,
    /// Number of pages whose body could not be parsed
    pub pages_skipped: u32,
    /// Number of rows written
    pub write_count: usize,
    /// Page whose request failed, if any
    pub failed_page: Option<u32>,
}

impl StepExecution {
    pub fn new(name: &str) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: StepStatus::Starting,
            start_time: now,
            end_time: now,
            duration: Duration::default(),
            total_count: 0,
            page_count: 0,
            pages_fetched: 0,
            pages_skipped: 0,
            write_count: 0,
            failed_page: None,
        }
    }
}

/// A unit of work of a job.
pub trait Step {
    fn get_name(&self) -> &str;

    /// Executes the step, recording its progress in `step_execution`.
    ///
    /// # Returns
    /// - `Ok(())`: the step completed, possibly without any data
    /// - `Err(ExportError)`: the step failed
    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), ExportError>;
}

/// Exports one dataset: probes the total count, then requests every page in
/// order, flattening each body and appending its rows to the writer.
///
/// A page answered with a non-success status (or not answered at all) ends
/// the step; rows of earlier pages stay written. A page whose body cannot be
/// parsed contributes no row and the next page is requested.
pub struct PaginatedStep<'a> {
    name: String,
    params: QueryParameters,
    page_size: u32,
    fetcher: &'a dyn PageFetcher,
    extractor: RecordExtractor,
    writer: &'a dyn ItemWriter<Record>,
}

impl Step for PaginatedStep<'_> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), ExportError> {
        let start_time = Instant::now();
        step_execution.status = StepStatus::Starting;

        info!(
            "Start of step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        let result = self.run(step_execution);

        info!(
            "End of step: {}, id: {}, rows written: {}",
            step_execution.name, step_execution.id, step_execution.write_count
        );

        step_execution.start_time = start_time;
        step_execution.end_time = Instant::now();
        step_execution.duration = start_time.elapsed();

        result
    }
}

impl PaginatedStep<'_> {
    fn run(&self, step_execution: &mut StepExecution) -> Result<(), ExportError> {
        let total_count = CountProbe::new(self.fetcher).total_count(&self.params);
        step_execution.total_count = total_count;

        if total_count == 0 {
            info!("No data found or failed to fetch total count.");
            step_execution.status = StepStatus::NoData;
            return Ok(());
        }

        let paginator = Paginator::new(total_count, self.page_size);
        step_execution.page_count = paginator.page_count();

        if let Err(err) = self.writer.open() {
            error!("Unable to open output: {}", err);
            step_execution.status = StepStatus::WriteError;
            return Err(err);
        }

        let outcome = self.read_pages(&paginator, step_execution);

        // Rows already written stay durable whatever the outcome
        let closed = self.writer.close();

        match (outcome, closed) {
            (Err(err), _) => Err(err),
            (Ok(()), Err(err)) => {
                error!("Unable to close output: {}", err);
                step_execution.status = StepStatus::WriteError;
                Err(err)
            }
            (Ok(()), Ok(())) => {
                step_execution.status = StepStatus::Success;
                Ok(())
            }
        }
    }

    fn read_pages(
        &self,
        paginator: &Paginator,
        step_execution: &mut StepExecution,
    ) -> Result<(), ExportError> {
        let page_count = paginator.page_count();

        for request in paginator.requests(&self.params) {
            let page = request.page_no();

            let response = match self.fetcher.fetch(&request) {
                Ok(response) if response.is_success() => response,
                Ok(response) => {
                    debug!("{}", response.text());
                    return Err(self.abort(
                        step_execution,
                        page,
                        format!("status {}", response.status),
                    ));
                }
                Err(err) => return Err(self.abort(step_execution, page, err.to_string())),
            };
            step_execution.pages_fetched += 1;

            match self.extractor.extract(&response.body) {
                Ok(records) => {
                    if let Err(err) = self.write_page(&records) {
                        error!("Error writing page {}: {}", page, err);
                        step_execution.status = StepStatus::WriteError;
                        return Err(err);
                    }
                    step_execution.write_count += records.len();
                }
                Err(err) => {
                    warn!("Error parsing XML on page {}: {}", page, err);
                    debug!("{}", response.text());
                    step_execution.pages_skipped += 1;
                }
            }

            info!("Page {}/{} fetched and saved.", page, page_count);
        }

        Ok(())
    }

    fn write_page(&self, records: &[Record]) -> Result<(), ExportError> {
        self.writer.write(records)?;
        self.writer.flush()
    }

    fn abort(&self, step_execution: &mut StepExecution, page: u32, reason: String) -> ExportError {
        error!("Error fetching page {}: {}", page, reason);
        step_execution.status = StepStatus::Aborted;
        step_execution.failed_page = Some(page);
        ExportError::PageFetch { page, reason }
    }
}

/// Builder for [`PaginatedStep`].
pub struct StepBuilder<'a> {
    name: Option<String>,
    params: Option<QueryParameters>,
    page_size: u32,
    fetcher: Option<&'a dyn PageFetcher>,
    extractor: Option<RecordExtractor>,
    writer: Option<&'a dyn ItemWriter<Record>>,
}

impl Default for StepBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> StepBuilder<'a> {
    pub fn new() -> Self {
        Self {
            name: None,
            params: None,
            page_size: crate::config::DEFAULT_PAGE_SIZE,
            fetcher: None,
            extractor: None,
            writer: None,
        }
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Base parameters of the dataset; page index and size are set per request.
    pub fn params(mut self, params: QueryParameters) -> Self {
        self.params = Some(params);
        self
    }

    /// Rows requested per page. Zero is ignored.
    pub fn page_size(mut self, page_size: u32) -> Self {
        if page_size > 0 {
            self.page_size = page_size;
        }
        self
    }

    pub fn fetcher(mut self, fetcher: &'a dyn PageFetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn extractor(mut self, extractor: RecordExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn writer(mut self, writer: &'a dyn ItemWriter<Record>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Builds the step. A random name is generated when none was given.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Step` when the parameters, fetcher, extractor or
    /// writer are missing.
    pub fn build(self) -> Result<PaginatedStep<'a>, ExportError> {
        let name = self.name.unwrap_or_else(build_name);
        let missing = |what: &str| ExportError::Step(format!("{}: {} is required", name, what));

        Ok(PaginatedStep {
            params: self.params.ok_or_else(|| missing("query parameters"))?,
            fetcher: self.fetcher.ok_or_else(|| missing("fetcher"))?,
            extractor: self.extractor.ok_or_else(|| missing("extractor"))?,
            writer: self.writer.ok_or_else(|| missing("writer"))?,
            page_size: self.page_size,
            name,
        })
    }
}
