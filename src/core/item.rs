use crate::{error::ExportError, item::api::QueryParameters};

/// Type alias for the result of a single upstream request.
pub type PageFetcherResult = Result<PageResponse, ExportError>;

/// Raw answer of the upstream API for one request.
///
/// The status is kept as a plain number so that callers decide what counts as
/// a failure; the body is left undecoded.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl PageResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Lossy text view of the body, used for diagnostics.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issues one request against the upstream service.
///
/// Implementations must not retry: every call maps to exactly one request.
pub trait PageFetcher {
    /// Fetches the page described by `params`.
    ///
    /// # Returns
    /// - `Ok(PageResponse)` whenever the server answered, whatever the status
    /// - `Err(ExportError::Http)` when no answer could be obtained
    fn fetch(&self, params: &QueryParameters) -> PageFetcherResult;
}

/// Represents a destination for flattened rows.
pub trait ItemWriter<W> {
    /// Writes the given items.
    fn write(&self, items: &[W]) -> Result<(), ExportError>;

    /// Flushes buffered rows to the underlying destination.
    fn flush(&self) -> Result<(), ExportError> {
        Ok(())
    }

    /// Opens the destination. Called once, before the first `write`.
    fn open(&self) -> Result<(), ExportError> {
        Ok(())
    }

    /// Closes the destination.
    fn close(&self) -> Result<(), ExportError> {
        Ok(())
    }
}
