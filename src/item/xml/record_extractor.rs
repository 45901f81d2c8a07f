use std::str;

use log::{debug, warn};
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::reader::Reader as XmlReader;
use serde::Serialize;

use crate::error::ExportError;

/// One flattened item: the values of the configured fields, in field order.
///
/// Serializes as a plain sequence of strings so that CSV writers emit it as a
/// single row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    values: Vec<String>,
}

impl Record {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the column at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }
}

/// Builder for [`RecordExtractor`].
///
/// # Examples
///
/// ```
/// use safemap_export::item::xml::RecordExtractorBuilder;
///
/// let extractor = RecordExtractorBuilder::new()
///     .fields(&["OBJT_ID", "X", "Y"])
///     .build();
///
/// let body = br#"
/// <response>
///   <body>
///     <items>
///       <item><OBJT_ID>7</OBJT_ID><Y>37.5</Y></item>
///     </items>
///     <totalCount>1</totalCount>
///   </body>
/// </response>"#;
///
/// let records = extractor.extract(body).unwrap();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].values(), ["7", "", "37.5"]);
/// ```
pub struct RecordExtractorBuilder {
    tag_name: String,
    fields: Vec<String>,
}

impl Default for RecordExtractorBuilder {
    fn default() -> Self {
        Self {
            tag_name: "item".to_string(),
            fields: Vec::new(),
        }
    }
}

impl RecordExtractorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the element name identifying one item. Defaults to `item`.
    pub fn tag<S: AsRef<str>>(mut self, tag_name: S) -> Self {
        self.tag_name = tag_name.as_ref().to_string();
        self
    }

    /// Sets the ordered child elements read from each item.
    pub fn fields<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.fields = fields.iter().map(|f| f.as_ref().to_string()).collect();
        self
    }

    pub fn build(self) -> RecordExtractor {
        RecordExtractor {
            item_tag_name: self.tag_name.into_bytes(),
            fields: self.fields,
        }
    }
}

/// Flattens the items of a response body into [`Record`]s.
///
/// Items are found at any depth, inside other items too, and come out in
/// document order. For each item, the text of the first direct
/// child named after each field becomes the column value; an absent child
/// yields an empty string. A body that is not well-formed yields an error and
/// no record at all.
pub struct RecordExtractor {
    item_tag_name: Vec<u8>,
    fields: Vec<String>,
}

/// Item being collected.
struct OpenItem {
    depth: usize,
    /// Position of the item's record, reserved when the item starts
    slot: usize,
    values: Vec<Option<String>>,
    field: Option<OpenField>,
}

/// Direct child of an item whose text is being collected.
struct OpenField {
    index: usize,
    text: String,
    text_done: bool,
}

impl RecordExtractor {
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Extracts every item of `body`.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::XmlParse` when the body is not a well-formed
    /// document. Missing fields are never an error.
    pub fn extract(&self, body: &[u8]) -> Result<Vec<Record>, ExportError> {
        let mut reader = XmlReader::from_reader(body);
        let mut buffer = Vec::with_capacity(1024);
        let mut scan = DocumentScan::default();
        // Items being collected, innermost last
        let mut open_items: Vec<OpenItem> = Vec::new();
        let mut records = Vec::new();

        loop {
            buffer.clear();
            let event = reader
                .read_event_into(&mut buffer)
                .map_err(|e| xml_error(&reader, e))?;

            match event {
                Event::Start(ref e) => {
                    scan.open()?;
                    let name = e.name();
                    let is_item = name.as_ref() == self.item_tag_name.as_slice();
                    if let Some(item) = open_items.last_mut() {
                        if scan.depth == item.depth + 1 && !is_item {
                            item.field = self
                                .field_index(name.as_ref())
                                .filter(|&index| item.values[index].is_none())
                                .map(|index| OpenField {
                                    index,
                                    text: String::new(),
                                    text_done: false,
                                });
                        } else if let Some(field) = item.field.as_mut() {
                            // Only the text before a nested element belongs to the field
                            field.text_done = true;
                        }
                    }
                    if is_item {
                        open_items.push(OpenItem {
                            depth: scan.depth,
                            slot: records.len(),
                            values: vec![None; self.fields.len()],
                            field: None,
                        });
                        records.push(Record::new(Vec::new()));
                    }
                }
                Event::Empty(ref e) => {
                    scan.empty()?;
                    let name = e.name();
                    let is_item = name.as_ref() == self.item_tag_name.as_slice();
                    if let Some(item) = open_items.last_mut() {
                        if scan.depth == item.depth && !is_item {
                            if let Some(index) = self.field_index(name.as_ref()) {
                                item.values[index].get_or_insert_with(String::new);
                            }
                        } else if let Some(field) = item.field.as_mut() {
                            field.text_done = true;
                        }
                    }
                    if is_item {
                        records.push(Record::new(vec![String::new(); self.fields.len()]));
                    }
                }
                Event::End(_) => {
                    if let Some(item) = open_items.last_mut() {
                        if scan.depth == item.depth + 1 {
                            if let Some(field) = item.field.take() {
                                item.values[field.index].get_or_insert(field.text);
                            }
                        } else if scan.depth == item.depth {
                            if let Some(item) = open_items.pop() {
                                records[item.slot] = Record::new(
                                    item.values
                                        .into_iter()
                                        .map(Option::unwrap_or_default)
                                        .collect(),
                                );
                            }
                        }
                    }
                    scan.close()?;
                }
                Event::Text(ref t) => {
                    let text = decode_text(t)?;
                    scan.text(&text)?;
                    if let Some(field) = open_field(&mut open_items, scan.depth) {
                        field.text.push_str(&text);
                    }
                }
                Event::CData(ref c) => {
                    let bytes: &[u8] = c;
                    let text = str::from_utf8(bytes)
                        .map_err(|e| ExportError::XmlParse(e.to_string()))?;
                    scan.text(text)?;
                    if let Some(field) = open_field(&mut open_items, scan.depth) {
                        field.text.push_str(text);
                    }
                }
                Event::GeneralRef(ref r) => {
                    let bytes: &[u8] = r;
                    let text = resolve_reference(bytes)?;
                    scan.text(&text)?;
                    if let Some(field) = open_field(&mut open_items, scan.depth) {
                        field.text.push_str(&text);
                    }
                }
                Event::Eof => {
                    scan.finish()?;
                    break;
                }
                _ => {}
            }
        }

        debug!("Extracted {} records", records.len());
        Ok(records)
    }

    fn field_index(&self, name: &[u8]) -> Option<usize> {
        self.fields.iter().position(|f| f.as_bytes() == name)
    }
}

/// Finds the text of the first element named `tag_name`, anywhere in `body`.
///
/// The whole document is checked for well-formedness, not only the part
/// before the element.
///
/// # Returns
/// - `Ok(Some(text))` when the element exists
/// - `Ok(None)` when the document is well-formed but has no such element
/// - `Err(ExportError::XmlParse)` when the document is malformed
pub fn find_element_text(body: &[u8], tag_name: &str) -> Result<Option<String>, ExportError> {
    let mut reader = XmlReader::from_reader(body);
    let mut buffer = Vec::with_capacity(256);
    let mut scan = DocumentScan::default();
    let mut found: Option<String> = None;
    let mut collecting_at: Option<usize> = None;

    loop {
        buffer.clear();
        let event = reader
            .read_event_into(&mut buffer)
            .map_err(|e| xml_error(&reader, e))?;

        match event {
            Event::Start(ref e) => {
                scan.open()?;
                if found.is_none() && e.name().as_ref() == tag_name.as_bytes() {
                    found = Some(String::new());
                    collecting_at = Some(scan.depth);
                }
            }
            Event::Empty(ref e) => {
                scan.empty()?;
                if found.is_none() && e.name().as_ref() == tag_name.as_bytes() {
                    found = Some(String::new());
                }
            }
            Event::End(_) => {
                if collecting_at == Some(scan.depth) {
                    collecting_at = None;
                }
                scan.close()?;
            }
            Event::Text(ref t) => {
                let text = decode_text(t)?;
                scan.text(&text)?;
                if let (Some(value), Some(_)) = (found.as_mut(), collecting_at) {
                    value.push_str(&text);
                }
            }
            Event::GeneralRef(ref r) => {
                let bytes: &[u8] = r;
                let text = resolve_reference(bytes)?;
                scan.text(&text)?;
                if let (Some(value), Some(_)) = (found.as_mut(), collecting_at) {
                    value.push_str(&text);
                }
            }
            Event::Eof => {
                scan.finish()?;
                break;
            }
            _ => {}
        }
    }

    Ok(found)
}

/// Tracks the element depth to reject documents the reader lets through:
/// unclosed elements, a missing root, a second root, text outside the root.
#[derive(Default)]
struct DocumentScan {
    depth: usize,
    seen_root: bool,
}

impl DocumentScan {
    fn open(&mut self) -> Result<(), ExportError> {
        self.check_single_root()?;
        self.depth += 1;
        self.seen_root = true;
        Ok(())
    }

    fn empty(&mut self) -> Result<(), ExportError> {
        self.check_single_root()?;
        self.seen_root = true;
        Ok(())
    }

    fn check_single_root(&self) -> Result<(), ExportError> {
        if self.depth == 0 && self.seen_root {
            return Err(ExportError::XmlParse(
                "element found after the root element".to_string(),
            ));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ExportError> {
        self.depth = self.depth.checked_sub(1).ok_or_else(|| {
            ExportError::XmlParse("closing tag without matching opening tag".to_string())
        })?;
        Ok(())
    }

    fn text(&self, text: &str) -> Result<(), ExportError> {
        let blank = text
            .trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
            .is_empty();
        if self.depth == 0 && !blank {
            return Err(ExportError::XmlParse(
                "text found outside of the root element".to_string(),
            ));
        }
        Ok(())
    }

    fn finish(&self) -> Result<(), ExportError> {
        if !self.seen_root {
            return Err(ExportError::XmlParse("no root element found".to_string()));
        }
        if self.depth > 0 {
            return Err(ExportError::XmlParse(format!(
                "unexpected end of document, {} element(s) left open",
                self.depth
            )));
        }
        Ok(())
    }
}

fn open_field(open_items: &mut [OpenItem], depth: usize) -> Option<&mut OpenField> {
    open_items
        .last_mut()
        .filter(|item| depth == item.depth + 1)
        .and_then(|item| item.field.as_mut())
        .filter(|field| !field.text_done)
}

fn decode_text(text: &[u8]) -> Result<String, ExportError> {
    let raw = str::from_utf8(text).map_err(|e| ExportError::XmlParse(e.to_string()))?;
    unescape(raw)
        .map(|s| s.into_owned())
        .map_err(|e| ExportError::XmlParse(e.to_string()))
}

fn resolve_reference(name: &[u8]) -> Result<String, ExportError> {
    let name = str::from_utf8(name).map_err(|e| ExportError::XmlParse(e.to_string()))?;
    match unescape(&format!("&{};", name)) {
        Ok(resolved) => Ok(resolved.into_owned()),
        Err(e) => {
            warn!("Unresolved entity reference '&{};': {}", name, e);
            Err(ExportError::XmlParse(e.to_string()))
        }
    }
}

fn xml_error<R>(reader: &XmlReader<R>, error: quick_xml::Error) -> ExportError {
    ExportError::XmlParse(format!(
        "{} at position {}",
        error,
        reader.buffer_position()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> RecordExtractor {
        RecordExtractorBuilder::new()
            .fields(&["OBJT_ID", "STTE_YEAR", "STTE_LC", "X", "Y"])
            .build()
    }

    #[test]
    fn items_should_be_flattened_in_field_order() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
            <response>
                <header><resultCode>00</resultCode></header>
                <body>
                    <items>
                        <item>
                            <Y>37.56</Y>
                            <X>126.97</X>
                            <OBJT_ID>1</OBJT_ID>
                            <STTE_YEAR>2023</STTE_YEAR>
                            <STTE_LC>서울특별시 중구</STTE_LC>
                        </item>
                        <item>
                            <OBJT_ID>2</OBJT_ID>
                            <STTE_YEAR>2022</STTE_YEAR>
                            <STTE_LC>부산광역시</STTE_LC>
                            <X>129.07</X>
                            <Y>35.17</Y>
                        </item>
                    </items>
                    <totalCount>2</totalCount>
                </body>
            </response>"#;

        let records = extractor().extract(body.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].values(),
            ["1", "2023", "서울특별시 중구", "126.97", "37.56"]
        );
        assert_eq!(records[1].values(), ["2", "2022", "부산광역시", "129.07", "35.17"]);
    }

    #[test]
    fn missing_fields_should_be_empty_strings() {
        let body = b"<items><item><OBJT_ID>9</OBJT_ID><X/></item><item/></items>";

        let records = extractor().extract(body).unwrap();

        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.len(), 5);
        }
        assert_eq!(records[0].values(), ["9", "", "", "", ""]);
        assert_eq!(records[1].values(), ["", "", "", "", ""]);
    }

    #[test]
    fn items_are_found_at_any_depth() {
        let body = b"<a><item><OBJT_ID>1</OBJT_ID></item><b><c><item><OBJT_ID>2</OBJT_ID></item></c></b></a>";

        let records = extractor().extract(body).unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.get(0).unwrap()).collect();
        assert_eq!(ids, ["1", "2"]);
    }

    #[test]
    fn nested_items_yield_their_own_rows_in_document_order() {
        let body = b"<items>\
            <item><OBJT_ID>1</OBJT_ID><item><OBJT_ID>2</OBJT_ID><X>127.0</X></item><X>126.9</X></item>\
            <item><OBJT_ID>3</OBJT_ID><item/></item>\
            </items>";

        let records = extractor().extract(body).unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.get(0).unwrap()).collect();
        assert_eq!(ids, ["1", "2", "3", ""]);
        assert_eq!(records[0].get(3), Some("126.9"));
        assert_eq!(records[1].get(3), Some("127.0"));
        assert!(records.iter().all(|r| r.len() == 5));
    }

    #[test]
    fn only_direct_children_and_first_occurrence_are_used() {
        let body = b"<item>\
            <OBJT_ID>first</OBJT_ID>\
            <OBJT_ID>second</OBJT_ID>\
            <wrapper><X>nested</X></wrapper>\
            </item>";

        let records = extractor().extract(body).unwrap();

        assert_eq!(records[0].get(0), Some("first"));
        assert_eq!(records[0].get(3), Some(""));
    }

    #[test]
    fn entities_and_cdata_are_decoded() {
        let body = b"<item><STTE_LC>A &amp; B &#65;</STTE_LC><X><![CDATA[<1>]]></X></item>";

        let records = extractor().extract(body).unwrap();

        assert_eq!(records[0].get(2), Some("A & B A"));
        assert_eq!(records[0].get(3), Some("<1>"));
    }

    #[test]
    fn document_without_items_yields_no_record() {
        let body = b"<response><body><items/><totalCount>0</totalCount></body></response>";

        let records = extractor().extract(body).unwrap();

        assert!(records.is_empty());
    }

    #[test]
    fn mismatched_tags_are_rejected() {
        let body = b"<items><item><OBJT_ID>1</X></item></items>";

        let result = extractor().extract(body);

        assert!(matches!(result, Err(ExportError::XmlParse(_))));
    }

    #[test]
    fn truncated_document_is_rejected_without_partial_rows() {
        let body = b"<items><item><OBJT_ID>1</OBJT_ID></item><item><OBJT_ID>2";

        let result = extractor().extract(body);

        assert!(matches!(result, Err(ExportError::XmlParse(_))));
    }

    #[test]
    fn second_root_element_is_rejected() {
        let result = extractor().extract(b"<a><item><OBJT_ID>1</OBJT_ID></item></a><b/>");
        assert!(matches!(result, Err(ExportError::XmlParse(_))));

        let result = extractor().extract(b"<a/>\n<a><item/></a>");
        assert!(matches!(result, Err(ExportError::XmlParse(_))));
    }

    #[test]
    fn plain_text_is_rejected() {
        let result = extractor().extract(b"SERVICE KEY IS NOT REGISTERED ERROR.");

        assert!(matches!(result, Err(ExportError::XmlParse(_))));
    }

    #[test]
    fn total_count_is_found_anywhere() {
        let body = b"<response><header/><body><numOfRows>1</numOfRows><totalCount>45210</totalCount></body></response>";

        let total = find_element_text(body, "totalCount").unwrap();

        assert_eq!(total.as_deref(), Some("45210"));
    }

    #[test]
    fn absent_total_count_is_none() {
        let body = b"<OpenAPI_ServiceResponse><cmmMsgHeader><errMsg>SERVICE ERROR</errMsg></cmmMsgHeader></OpenAPI_ServiceResponse>";

        let total = find_element_text(body, "totalCount").unwrap();

        assert!(total.is_none());
    }

    #[test]
    fn total_count_lookup_rejects_second_root() {
        let body = b"<response><totalCount>3</totalCount></response><response/>";

        let result = find_element_text(body, "totalCount");

        assert!(matches!(result, Err(ExportError::XmlParse(_))));
    }

    #[test]
    fn total_count_lookup_rejects_malformed_document() {
        let result = find_element_text(b"<response><totalCount>3</totalCount>", "totalCount");

        assert!(matches!(result, Err(ExportError::XmlParse(_))));
    }
}
