/// This module provides the upstream API client: query parameters, count probe and paginator.
pub mod api;

/// This module provides the CSV item writer.
pub mod csv;

/// This module provides the XML record extractor.
pub mod xml;
