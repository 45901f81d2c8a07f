/*!
 # safemap-export

 Exports the paginated XML records of the safemap.go.kr open-data API to CSV
 files, one file per dataset.

 ## Core Concepts

- **Job:** one export run. A `Job` is composed of one `Step` per dataset.
- **Step:** the export of one dataset. It learns the total record count with a
  one-row probe, then requests every page in order.
- **PageFetcher:** issues one request and hands back the raw answer.
- **RecordExtractor:** flattens the `item` elements of a page into rows
  following the fixed field list of the dataset.
- **ItemWriter:** the output of a `Step`. The CSV writer writes a byte order
  mark and the header once, then every row, page after page.

 ## Failure handling

| **Failure**                         | **Outcome**                                   |
|-------------------------------------|-----------------------------------------------|
| API key file missing or empty       | the run stops before any request              |
| count probe fails                   | the dataset is treated as empty, no file      |
| page body is not well-formed XML    | the page contributes no row, next page follows|
| page request fails or is not 2xx    | the step stops, earlier rows stay written,    |
|                                     | the next dataset still runs                   |

 ## Getting Started

```no_run
use safemap_export::{
    config::{load_api_key, ExportConfig},
    core::job::{Job, JobBuilder},
    dataset::CRASH_ACCIDENT,
    export::{dataset_step, dataset_writer},
    item::api::HttpPageFetcher,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ExportConfig::default();
    let service_key = load_api_key(&config.key_file)?;

    let fetcher = HttpPageFetcher::new();
    let writer = dataset_writer(&CRASH_ACCIDENT, &config);
    let step = dataset_step(&CRASH_ACCIDENT, &config, &service_key, &fetcher, &writer)?;

    let job = JobBuilder::new().start(&step).build();
    job.run()?;

    Ok(())
}
```
 */

/// Run configuration and API key loading
pub mod config;

/// Core module for export operations
pub mod core;

/// Built-in datasets
pub mod dataset;

/// Error types for export operations
pub mod error;

pub mod export;

#[doc(inline)]
pub use error::*;

/// Set of components reading the upstream API and writing CSV files
pub mod item;
