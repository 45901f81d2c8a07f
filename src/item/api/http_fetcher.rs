use log::debug;
use reqwest::blocking::Client;

use crate::{
    core::item::{PageFetcher, PageFetcherResult, PageResponse},
    error::ExportError,
};

use super::QueryParameters;

/// [`PageFetcher`] issuing blocking HTTP GET requests.
///
/// No retry and no explicit timeout: the client defaults apply.
pub struct HttpPageFetcher {
    client: Client,
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpPageFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Uses a preconfigured client, for instance one with a proxy.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch(&self, params: &QueryParameters) -> PageFetcherResult {
        debug!(
            "GET {} pageNo={} numOfRows={}",
            params.url(),
            params.page_no(),
            params.num_of_rows()
        );

        let response = self
            .client
            .get(params.url())
            .query(&params.to_query())
            .send()
            .map_err(|e| ExportError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| ExportError::Http(e.to_string()))?;

        debug!("Received status {} with {} bytes", status, body.len());

        Ok(PageResponse::new(status, body.to_vec()))
    }
}
