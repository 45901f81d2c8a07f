//! XML support for flattening upstream response bodies.
//!
//! The upstream service answers every request with a document shaped like:
//!
//! ```text
//! <response>
//!   <header>...</header>
//!   <body>
//!     <items>
//!       <item><OBJT_ID>1</OBJT_ID>...</item>
//!     </items>
//!     <numOfRows>20000</numOfRows>
//!     <pageNo>1</pageNo>
//!     <totalCount>45210</totalCount>
//!   </body>
//! </response>
//! ```
//!
//! Parsing relies on `quick-xml`'s event reader. Item elements are located
//! wherever they appear, so the extractor does not depend on the exact
//! envelope of the response.

pub mod record_extractor;

pub use record_extractor::{find_element_text, Record, RecordExtractor, RecordExtractorBuilder};
