//! Access to the paginated upstream API.
//!
//! Every request is described by an immutable [`QueryParameters`] value. The
//! probe and each page get their own value, derived from the base parameters,
//! so no request ever sees state left behind by a previous one.
//!
//! # Components
//!
//! - [`HttpPageFetcher`]: issues blocking GET requests with `reqwest`.
//! - [`CountProbe`]: learns the total record count with a one-row request.
//! - [`Paginator`]: turns the total count into a bounded sequence of page requests.

pub mod count_probe;
pub mod http_fetcher;
pub mod paginator;

pub use count_probe::CountProbe;
pub use http_fetcher::HttpPageFetcher;
pub use paginator::Paginator;

use crate::config::ServiceKey;

/// Parameters of one upstream request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameters {
    url: String,
    service_key: ServiceKey,
    page_no: u32,
    num_of_rows: u32,
    data_type: String,
}

impl QueryParameters {
    /// Creates the base parameters of a dataset run: first page, one row.
    pub fn new<U: Into<String>, D: Into<String>>(
        url: U,
        service_key: ServiceKey,
        data_type: D,
    ) -> Self {
        Self {
            url: url.into(),
            service_key,
            page_no: 1,
            num_of_rows: 1,
            data_type: data_type.into(),
        }
    }

    /// Parameters of the count probe: first page, one row.
    pub fn probe(&self) -> Self {
        self.for_page(1, 1)
    }

    /// Parameters of page `page_no` holding up to `num_of_rows` rows.
    pub fn for_page(&self, page_no: u32, num_of_rows: u32) -> Self {
        Self {
            page_no,
            num_of_rows,
            ..self.clone()
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn page_no(&self) -> u32 {
        self.page_no
    }

    pub fn num_of_rows(&self) -> u32 {
        self.num_of_rows
    }

    /// Query string pairs, in the order the service documents them.
    pub fn to_query(&self) -> [(&'static str, String); 4] {
        [
            ("serviceKey", self.service_key.expose().to_string()),
            ("pageNo", self.page_no.to_string()),
            ("numOfRows", self.num_of_rows.to_string()),
            ("dataType", self.data_type.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> QueryParameters {
        QueryParameters::new("http://localhost/data.do", ServiceKey::new("key"), "XML")
    }

    #[test]
    fn base_parameters_request_one_row_of_first_page() {
        let params = base();

        assert_eq!(params.page_no(), 1);
        assert_eq!(params.num_of_rows(), 1);
        assert_eq!(
            params.to_query(),
            [
                ("serviceKey", "key".to_string()),
                ("pageNo", "1".to_string()),
                ("numOfRows", "1".to_string()),
                ("dataType", "XML".to_string()),
            ]
        );
    }

    #[test]
    fn deriving_a_page_leaves_the_base_untouched() {
        let params = base();

        let page = params.for_page(3, 20_000);

        assert_eq!(page.page_no(), 3);
        assert_eq!(page.num_of_rows(), 20_000);
        assert_eq!(page.url(), params.url());
        assert_eq!(params, base());
        assert_eq!(page.probe(), base());
    }
}
