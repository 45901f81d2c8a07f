use log::{debug, error, info};

use crate::{core::item::PageFetcher, error::ExportError, item::xml::find_element_text};

use super::QueryParameters;

/// Element holding the size of the full record set.
pub const TOTAL_COUNT_TAG: &str = "totalCount";

/// Learns the total record count of a dataset with a one-row request.
pub struct CountProbe<'a> {
    fetcher: &'a dyn PageFetcher,
}

impl<'a> CountProbe<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Returns the total record count, or zero when it cannot be determined.
    ///
    /// Failures are logged, never returned: callers treat zero as "no data".
    pub fn total_count(&self, params: &QueryParameters) -> u64 {
        match self.try_total_count(params) {
            Ok(total) => {
                info!("Total records: {}", total);
                total
            }
            Err(err) => {
                error!("{}", err);
                0
            }
        }
    }

    /// Same as [`CountProbe::total_count`] but reports why the count is unknown.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::CountFetch` when the request fails, the status is
    /// not a success, the body is malformed, or the count element is missing
    /// or not a number.
    pub fn try_total_count(&self, params: &QueryParameters) -> Result<u64, ExportError> {
        let response = self
            .fetcher
            .fetch(&params.probe())
            .map_err(|e| ExportError::CountFetch(format!("Error fetching total count: {}", e)))?;

        if !response.is_success() {
            debug!("{}", response.text());
            return Err(ExportError::CountFetch(format!(
                "Error fetching total count: status {}",
                response.status
            )));
        }

        let text = find_element_text(&response.body, TOTAL_COUNT_TAG).map_err(|e| {
            debug!("{}", response.text());
            ExportError::CountFetch(format!("Error parsing XML: {}", e))
        })?;

        match text {
            Some(text) => text.trim().parse::<u64>().map_err(|e| {
                ExportError::CountFetch(format!("Invalid '{}' value '{}': {}", TOTAL_COUNT_TAG, text, e))
            }),
            None => {
                debug!("{}", response.text());
                Err(ExportError::CountFetch(format!(
                    "Unable to find '{}' in the response",
                    TOTAL_COUNT_TAG
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::{mock, predicate::function};

    use super::*;
    use crate::{
        config::ServiceKey,
        core::item::{PageFetcherResult, PageResponse},
    };

    mock! {
        pub Fetcher {}
        impl PageFetcher for Fetcher {
            fn fetch(&self, params: &QueryParameters) -> PageFetcherResult;
        }
    }

    fn base() -> QueryParameters {
        QueryParameters::new("http://localhost/data.do", ServiceKey::new("key"), "XML")
            .for_page(4, 20_000)
    }

    fn fetcher_answering(status: u16, body: &'static str) -> MockFetcher {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .with(function(|p: &QueryParameters| {
                p.page_no() == 1 && p.num_of_rows() == 1
            }))
            .times(1)
            .returning(move |_| Ok(PageResponse::new(status, body)));
        fetcher
    }

    #[test]
    fn probe_requests_a_single_row_and_reads_total_count() {
        let fetcher = fetcher_answering(
            200,
            "<response><body><items><item/></items><totalCount>45210</totalCount></body></response>",
        );

        let total = CountProbe::new(&fetcher).total_count(&base());

        assert_eq!(total, 45210);
    }

    #[test]
    fn non_success_status_counts_as_zero() {
        let fetcher = fetcher_answering(500, "<error/>");
        let probe = CountProbe::new(&fetcher);

        assert_eq!(probe.total_count(&base()), 0);
    }

    #[test]
    fn missing_total_count_is_reported() {
        let fetcher = fetcher_answering(200, "<response><header/></response>");
        let probe = CountProbe::new(&fetcher);

        let result = probe.try_total_count(&base());

        assert!(matches!(result, Err(ExportError::CountFetch(msg)) if msg.contains("totalCount")));
    }

    #[test]
    fn malformed_body_counts_as_zero() {
        let fetcher = fetcher_answering(200, "<response><totalCount>3</totalCount>");

        assert_eq!(CountProbe::new(&fetcher).total_count(&base()), 0);
    }

    #[test]
    fn non_numeric_total_count_counts_as_zero() {
        let fetcher = fetcher_answering(200, "<response><totalCount>many</totalCount></response>");

        assert_eq!(CountProbe::new(&fetcher).total_count(&base()), 0);
    }

    #[test]
    fn transport_error_counts_as_zero() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Err(ExportError::Http("connection refused".to_string())));

        assert_eq!(CountProbe::new(&fetcher).total_count(&base()), 0);
    }
}
