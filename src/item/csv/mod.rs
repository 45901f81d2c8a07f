//! CSV output of flattened records.
//!
//! This module provides [`csv_writer::CsvItemWriter`], the sink of every dataset
//! export. It writes, in order:
//!
//! 1. an optional UTF-8 byte order mark, so that spreadsheet software detects
//!    the encoding of Korean text,
//! 2. the header row, once,
//! 3. every row handed to [`crate::core::item::ItemWriter::write`], verbatim and
//!    in field order. Rows are never reordered nor deduplicated.
//!
//! # Ownership and Borrowing Considerations
//!
//! The writer takes ownership of its destination when it is opened. To look at
//! an in-memory destination afterwards, call
//! [`csv_writer::CsvItemWriter::into_inner`].
//!
//! # Example
//!
//! ```
//! use safemap_export::core::item::ItemWriter;
//! use safemap_export::item::csv::csv_writer::{CsvItemWriterBuilder, UTF8_BOM};
//! use safemap_export::item::xml::Record;
//!
//! let writer = CsvItemWriterBuilder::new()
//!     .headers(&["OBJT_ID", "STTE_LC"])
//!     .terminator(csv::Terminator::CRLF)
//!     .from_writer(Vec::new());
//!
//! writer.open().unwrap();
//! writer
//!     .write(&[Record::new(vec!["1".to_string(), "서울특별시".to_string()])])
//!     .unwrap();
//!
//! let bytes = writer.into_inner().unwrap();
//! assert!(bytes.starts_with(UTF8_BOM));
//! assert_eq!(
//!     String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap(),
//!     "OBJT_ID,STTE_LC\r\n1,서울특별시\r\n"
//! );
//! ```

/// A module providing facilities for writing CSV data records.
pub mod csv_writer;
