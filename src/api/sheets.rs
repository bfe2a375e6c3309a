use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "cafemap/0.1.0";
const FETCH_TIMEOUT_SECS: u64 = 30;

/// A row of a sheet keyed by column header.
pub type Row = HashMap<String, String>;

/// Where a table lives: a published sheet export or a CSV on local disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataLocation {
    Remote(String),
    Local(PathBuf),
}

impl std::fmt::Display for DataLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataLocation::Remote(url) => write!(f, "{}", url),
            DataLocation::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sheet export returned status {0}")]
    Status(u16),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("table has no {0} column")]
    MissingColumn(String),
}

/// A parsed CSV table: header list plus string-keyed rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl RawTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Fail with `MissingColumn` naming the first absent column.
    pub fn require_columns(&self, names: &[&str]) -> Result<(), FetchError> {
        match names.iter().find(|name| !self.has_column(name)) {
            Some(missing) => Err(FetchError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }
}

/// Source of tabular data for the loader.
pub trait TabularSource: Send + Sync {
    fn fetch(&self, location: &DataLocation) -> Result<RawTable, FetchError>;
}

/// Parse CSV text into a `RawTable`.
///
/// Headers are trimmed. Short rows are accepted and their missing cells are
/// simply absent from the row map.
pub fn parse_csv<R: Read>(reader: R) -> Result<RawTable, FetchError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

/// Fetches CSV exports of a published Google spreadsheet, or local CSV files.
pub struct SheetClient {
    http: reqwest::blocking::Client,
}

impl SheetClient {
    pub fn new() -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http })
    }

    fn fetch_remote(&self, url: &str) -> Result<RawTable, FetchError> {
        let response = self.http.get(url).send()?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let body = response.text()?;
        parse_csv(body.as_bytes())
    }

    fn fetch_local(&self, path: &Path) -> Result<RawTable, FetchError> {
        let file = std::fs::File::open(path).map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_csv(std::io::BufReader::new(file))
    }
}

impl TabularSource for SheetClient {
    fn fetch(&self, location: &DataLocation) -> Result<RawTable, FetchError> {
        match location {
            DataLocation::Remote(url) => self.fetch_remote(url),
            DataLocation::Local(path) => self.fetch_local(path),
        }
    }
}

/// CSV export URL for one tab (`gid`) of a spreadsheet.
pub fn sheet_url(spreadsheet_id: &str, gid: &str) -> String {
    format!(
        "https://docs.google.com/spreadsheets/d/{}/gviz/tq?tqx=out:csv&gid={}",
        spreadsheet_id, gid
    )
}
