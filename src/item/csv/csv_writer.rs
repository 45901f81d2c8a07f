use std::{
    cell::RefCell,
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
};

use csv::{Terminator, Writer, WriterBuilder};
use log::debug;
use serde::Serialize;

use crate::{core::item::ItemWriter, error::ExportError};

/// Byte order mark prepended to the output so spreadsheets detect UTF-8.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

type Opener<T> = Box<dyn FnOnce() -> io::Result<T>>;

/// Writes rows to a CSV destination.
///
/// The destination is only acquired in [`ItemWriter::open`], which also writes
/// the optional byte order mark and the header row. A writer built with
/// [`CsvItemWriterBuilder::from_path`] therefore creates no file until it is
/// opened.
pub struct CsvItemWriter<T: Write> {
    wrapper: RefCell<Option<Writer<T>>>,
    opener: RefCell<Option<Opener<T>>>,
    headers: Vec<String>,
    delimiter: u8,
    terminator: Terminator,
    bom: bool,
}

impl<T: Write, R: Serialize> ItemWriter<R> for CsvItemWriter<T> {
    fn write(&self, items: &[R]) -> Result<(), ExportError> {
        let mut wrapper = self.wrapper.borrow_mut();
        let writer = wrapper
            .as_mut()
            .ok_or_else(|| ExportError::ItemWriter("CSV writer is not open".to_string()))?;

        for item in items {
            writer
                .serialize(item)
                .map_err(|error| ExportError::ItemWriter(error.to_string()))?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), ExportError> {
        CsvItemWriter::flush(self)
    }

    fn open(&self) -> Result<(), ExportError> {
        CsvItemWriter::open(self)
    }

    fn close(&self) -> Result<(), ExportError> {
        CsvItemWriter::flush(self)
    }
}

impl<T: Write> CsvItemWriter<T> {
    /// Flush the contents of the internal buffer to the underlying writer.
    ///
    /// If there was a problem writing to the underlying writer, then an error
    /// is returned.
    ///
    /// Note that this also flushes the underlying writer.
    pub fn flush(&self) -> Result<(), ExportError> {
        match self.wrapper.borrow_mut().as_mut() {
            Some(writer) => writer
                .flush()
                .map_err(|error| ExportError::ItemWriter(error.to_string())),
            None => Ok(()),
        }
    }

    /// Acquires the destination, then writes the byte order mark and the header.
    ///
    /// Opening an already open writer does nothing.
    pub fn open(&self) -> Result<(), ExportError> {
        let Some(opener) = self.opener.borrow_mut().take() else {
            return Ok(());
        };

        let mut destination =
            opener().map_err(|error| ExportError::ItemWriter(error.to_string()))?;

        if self.bom {
            destination
                .write_all(UTF8_BOM)
                .map_err(|error| ExportError::ItemWriter(error.to_string()))?;
        }

        let mut writer = WriterBuilder::new()
            .flexible(false)
            .has_headers(false)
            .delimiter(self.delimiter)
            .terminator(self.terminator)
            .from_writer(destination);

        if !self.headers.is_empty() {
            writer
                .write_record(&self.headers)
                .map_err(|error| ExportError::ItemWriter(error.to_string()))?;
        }

        debug!("CSV writer opened with {} columns", self.headers.len());
        *self.wrapper.borrow_mut() = Some(writer);
        Ok(())
    }

    /// Returns `true` once the destination has been acquired.
    pub fn is_open(&self) -> bool {
        self.wrapper.borrow().is_some()
    }

    /// Unwraps the writer, returning the underlying destination.
    ///
    /// # Errors
    ///
    /// Fails when the writer was never opened or the final flush fails.
    pub fn into_inner(self) -> Result<T, ExportError> {
        let writer = self
            .wrapper
            .into_inner()
            .ok_or_else(|| ExportError::ItemWriter("CSV writer was never opened".to_string()))?;
        writer
            .into_inner()
            .map_err(|error| ExportError::ItemWriter(error.to_string()))
    }
}

/// Builder for [`CsvItemWriter`].
///
/// # Example
///
/// ```
/// use safemap_export::core::item::ItemWriter;
/// use safemap_export::item::csv::csv_writer::CsvItemWriterBuilder;
/// use safemap_export::item::xml::Record;
///
/// let writer = CsvItemWriterBuilder::new()
///     .headers(&["OBJT_ID", "X", "Y"])
///     .bom(false)
///     .terminator(csv::Terminator::Any(b'\n'))
///     .from_writer(vec![]);
///
/// writer.open().unwrap();
/// writer
///     .write(&[Record::new(vec!["1".into(), "126.97".into(), "37.56".into()])])
///     .unwrap();
///
/// let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
/// assert_eq!(data, "OBJT_ID,X,Y\n1,126.97,37.56\n");
/// ```
pub struct CsvItemWriterBuilder {
    delimiter: u8,
    headers: Vec<String>,
    terminator: Terminator,
    bom: bool,
}

impl Default for CsvItemWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvItemWriterBuilder {
    pub fn new() -> CsvItemWriterBuilder {
        CsvItemWriterBuilder {
            delimiter: b',',
            headers: Vec::new(),
            terminator: platform_terminator(),
            bom: true,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> CsvItemWriterBuilder {
        self.delimiter = delimiter;
        self
    }

    /// Header row written once when the writer is opened.
    pub fn headers<S: AsRef<str>>(mut self, headers: &[S]) -> CsvItemWriterBuilder {
        self.headers = headers.iter().map(|h| h.as_ref().to_string()).collect();
        self
    }

    /// Line terminator. Defaults to CRLF on Windows and LF elsewhere.
    pub fn terminator(mut self, terminator: Terminator) -> CsvItemWriterBuilder {
        self.terminator = terminator;
        self
    }

    /// Whether to start the output with a UTF-8 byte order mark. Defaults to `true`.
    pub fn bom(mut self, yes: bool) -> CsvItemWriterBuilder {
        self.bom = yes;
        self
    }

    /// Writer creating (or truncating) the file at `path` when opened.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> CsvItemWriter<File> {
        let path: PathBuf = path.as_ref().to_path_buf();
        self.build(Box::new(move || {
            debug!("Creating CSV file {}", path.display());
            File::create(&path)
        }))
    }

    pub fn from_writer<W: Write + 'static>(self, wtr: W) -> CsvItemWriter<W> {
        self.build(Box::new(move || Ok(wtr)))
    }

    fn build<T: Write>(self, opener: Opener<T>) -> CsvItemWriter<T> {
        CsvItemWriter {
            wrapper: RefCell::new(None),
            opener: RefCell::new(Some(opener)),
            headers: self.headers,
            delimiter: self.delimiter,
            terminator: self.terminator,
            bom: self.bom,
        }
    }
}

#[cfg(windows)]
fn platform_terminator() -> Terminator {
    Terminator::CRLF
}

#[cfg(not(windows))]
fn platform_terminator() -> Terminator {
    Terminator::Any(b'\n')
}

#[cfg(test)]
mod tests {
    use std::{error::Error, fs};

    use tempfile::tempdir;

    use super::*;
    use crate::item::xml::Record;

    fn record(values: &[&str]) -> Record {
        Record::new(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn header_then_rows_in_order() -> Result<(), Box<dyn Error>> {
        let wtr = CsvItemWriterBuilder::new()
            .headers(&["OBJT_ID", "STTE_LC", "X"])
            .bom(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(vec![]);

        wtr.open()?;
        wtr.write(&[record(&["1", "서울특별시", "126.9"]), record(&["2", "", "127.0"])])?;
        wtr.write(&[record(&["1", "duplicate", ""])])?;

        let data = String::from_utf8(wtr.into_inner()?)?;
        assert_eq!(
            data,
            "OBJT_ID,STTE_LC,X\n1,서울특별시,126.9\n2,,127.0\n1,duplicate,\n"
        );

        Ok(())
    }

    #[test]
    fn output_starts_with_bom() -> Result<(), Box<dyn Error>> {
        let wtr = CsvItemWriterBuilder::new()
            .headers(&["A"])
            .terminator(Terminator::CRLF)
            .from_writer(vec![]);

        wtr.open()?;
        wtr.flush()?;

        let data = wtr.into_inner()?;
        assert_eq!(&data[..3], UTF8_BOM);
        assert_eq!(&data[3..], b"A\r\n");

        Ok(())
    }

    #[test]
    fn values_needing_quotes_are_quoted() -> Result<(), Box<dyn Error>> {
        let wtr = CsvItemWriterBuilder::new()
            .headers(&["A", "B"])
            .bom(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(vec![]);

        wtr.open()?;
        wtr.write(&[record(&["a,b", "say \"hi\""])])?;

        let data = String::from_utf8(wtr.into_inner()?)?;
        assert_eq!(data, "A,B\n\"a,b\",\"say \"\"hi\"\"\"\n");

        Ok(())
    }

    #[test]
    fn writing_before_open_fails() {
        let wtr = CsvItemWriterBuilder::new().from_writer(vec![]);

        let result = wtr.write(&[record(&["1"])]);

        assert!(matches!(result, Err(ExportError::ItemWriter(_))));
    }

    #[test]
    fn file_is_created_only_when_opened() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("out.csv");

        let wtr = CsvItemWriterBuilder::new()
            .headers(&["OBJT_ID"])
            .from_path(&path);
        assert!(!path.exists());
        assert!(!wtr.is_open());

        wtr.open()?;
        wtr.write(&[record(&["42"])])?;
        wtr.flush()?;

        let content = fs::read(&path)?;
        assert!(content.starts_with(UTF8_BOM));
        let text = String::from_utf8(content[3..].to_vec())?;
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["OBJT_ID", "42"]);

        Ok(())
    }

    #[test]
    fn row_length_must_match_header() {
        let wtr = CsvItemWriterBuilder::new()
            .headers(&["A", "B"])
            .from_writer(vec![]);

        wtr.open().unwrap();
        let result = wtr.write(&[record(&["only one"])]);

        assert!(matches!(result, Err(ExportError::ItemWriter(_))));
    }
}
