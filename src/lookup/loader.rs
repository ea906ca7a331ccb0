//! Fetch and decode encoded tables.

use flate2::read::GzDecoder;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

use super::table::{EncodedTable, RangeLookup};
use crate::error::LoadError;

/// Where a table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    Url(Url),
    Path(PathBuf),
}

impl TableSource {
    /// `http(s)://` strings are URLs, anything else is a file path.
    pub fn parse(source: &str) -> Self {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => TableSource::Url(url),
            _ => TableSource::Path(PathBuf::from(source)),
        }
    }

    pub async fn load<T: DeserializeOwned>(
        &self,
        client: &Client,
    ) -> Result<RangeLookup<T>, LoadError> {
        match self {
            TableSource::Url(url) => load_from_url(client, url.as_str()).await,
            TableSource::Path(path) => load_from_path(path),
        }
    }
}

impl std::fmt::Display for TableSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableSource::Url(url) => write!(f, "{}", url),
            TableSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetch a JSON table with a single `GET` and decode it.
///
/// No retries: callers that need them wrap this call.
pub async fn load_from_url<T: DeserializeOwned>(
    client: &Client,
    url: &str,
) -> Result<RangeLookup<T>, LoadError> {
    info!("Fetching postcode table from {}", url);

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(LoadError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let bytes = response.bytes().await?;
    debug!("Fetched {} bytes", bytes.len());

    let encoded: EncodedTable<T> = serde_json::from_slice(&bytes)?;
    Ok(RangeLookup::from_encoded(encoded)?)
}

/// Read a table from disk. Files ending in `.gz` are gunzipped.
pub fn load_from_path<T: DeserializeOwned>(path: &Path) -> Result<RangeLookup<T>, LoadError> {
    info!("Loading postcode table from {}", path.display());

    let file = File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    load_from_reader(BufReader::new(reader))
}

pub fn load_from_reader<T: DeserializeOwned, R: Read>(
    reader: R,
) -> Result<RangeLookup<T>, LoadError> {
    let encoded: EncodedTable<T> = serde_json::from_reader(reader)?;
    let table = RangeLookup::from_encoded(encoded)?;
    info!(
        "Loaded postcode table with {} ranges and {} values",
        table.len(),
        table.values().len()
    );
    Ok(table)
}
