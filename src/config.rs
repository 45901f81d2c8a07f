use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};

use log::{debug, error, warn};

use crate::error::ExportError;

/// Base URL of the safemap open-data service.
pub const DEFAULT_BASE_URL: &str = "http://safemap.go.kr/openApiService/data";

/// File holding the service key when nothing else is configured.
pub const DEFAULT_KEY_FILE: &str = "api_key.txt";

/// Largest page the upstream service answers reliably.
pub const DEFAULT_PAGE_SIZE: u32 = 20_000;

/// Response format requested from the upstream service.
pub const DEFAULT_DATA_TYPE: &str = "XML";

pub const ENV_BASE_URL: &str = "SAFEMAP_BASE_URL";
pub const ENV_KEY_FILE: &str = "SAFEMAP_KEY_FILE";
pub const ENV_OUTPUT_DIR: &str = "SAFEMAP_OUTPUT_DIR";
pub const ENV_PAGE_SIZE: &str = "SAFEMAP_PAGE_SIZE";

/// Access key of the upstream service.
///
/// The `Debug` output never shows the key itself.
#[derive(Clone, PartialEq)]
pub struct ServiceKey(String);

impl ServiceKey {
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServiceKey(***)")
    }
}

/// Loads the service key from a plain text file.
///
/// The whole file content, trimmed, is the key.
///
/// # Errors
///
/// Returns `ExportError::Credential` when the file cannot be read or holds
/// nothing but whitespace.
pub fn load_api_key<P: AsRef<Path>>(path: P) -> Result<ServiceKey, ExportError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        error!("Failed to read API key file {}: {}", path.display(), e);
        ExportError::Credential(format!(
            "Failed to read API key file {}: {}",
            path.display(),
            e
        ))
    })?;

    let key = content.trim();
    if key.is_empty() {
        return Err(ExportError::Credential(format!(
            "API key file {} is empty",
            path.display()
        )));
    }

    debug!("API key loaded from {}", path.display());
    Ok(ServiceKey::new(key))
}

/// Settings shared by every dataset export of one run.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub base_url: String,
    pub key_file: PathBuf,
    pub output_dir: PathBuf,
    pub page_size: u32,
    pub data_type: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfigBuilder::new().build()
    }
}

impl ExportConfig {
    /// Default configuration overridden by the `SAFEMAP_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Default configuration overridden by whatever `lookup` returns for
    /// `SAFEMAP_BASE_URL`, `SAFEMAP_KEY_FILE`, `SAFEMAP_OUTPUT_DIR` and
    /// `SAFEMAP_PAGE_SIZE`.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let mut builder = ExportConfigBuilder::new();
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            builder = builder.base_url(base_url);
        }
        if let Some(key_file) = lookup(ENV_KEY_FILE) {
            builder = builder.key_file(key_file);
        }
        if let Some(output_dir) = lookup(ENV_OUTPUT_DIR) {
            builder = builder.output_dir(output_dir);
        }
        if let Some(page_size) = lookup(ENV_PAGE_SIZE) {
            match page_size.trim().parse::<u32>() {
                Ok(0) => warn!("Ignoring {}=0", ENV_PAGE_SIZE),
                Ok(page_size) => builder = builder.page_size(page_size),
                Err(e) => warn!("Ignoring {}={}: {}", ENV_PAGE_SIZE, page_size, e),
            }
        }
        builder.build()
    }

    /// Full endpoint URL for the given service path.
    pub fn endpoint(&self, service: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            service.trim_start_matches('/')
        )
    }

    /// Location of the CSV file for the given file name.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

/// Builder for [`ExportConfig`].
///
/// ```
/// use safemap_export::config::ExportConfigBuilder;
///
/// let config = ExportConfigBuilder::new()
///     .base_url("http://localhost:8080/data")
///     .output_dir("/tmp")
///     .build();
///
/// assert_eq!(config.page_size, 20_000);
/// assert_eq!(
///     config.endpoint("getCrashAcdntSttusData.do"),
///     "http://localhost:8080/data/getCrashAcdntSttusData.do"
/// );
/// ```
pub struct ExportConfigBuilder {
    base_url: String,
    key_file: PathBuf,
    output_dir: PathBuf,
    page_size: u32,
    data_type: String,
}

impl Default for ExportConfigBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            key_file: PathBuf::from(DEFAULT_KEY_FILE),
            output_dir: PathBuf::from("."),
            page_size: DEFAULT_PAGE_SIZE,
            data_type: DEFAULT_DATA_TYPE.to_string(),
        }
    }
}

impl ExportConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url<S: AsRef<str>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.as_ref().to_string();
        self
    }

    pub fn key_file<P: AsRef<Path>>(mut self, key_file: P) -> Self {
        self.key_file = key_file.as_ref().to_path_buf();
        self
    }

    pub fn output_dir<P: AsRef<Path>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.as_ref().to_path_buf();
        self
    }

    /// Sets the number of rows requested per page. Zero is ignored.
    pub fn page_size(mut self, page_size: u32) -> Self {
        if page_size > 0 {
            self.page_size = page_size;
        }
        self
    }

    pub fn data_type<S: AsRef<str>>(mut self, data_type: S) -> Self {
        self.data_type = data_type.as_ref().to_string();
        self
    }

    pub fn build(self) -> ExportConfig {
        ExportConfig {
            base_url: self.base_url,
            key_file: self.key_file,
            output_dir: self.output_dir,
            page_size: self.page_size,
            data_type: self.data_type,
        }
    }
}
