//! CLI command implementations.

pub mod find;
pub mod replicate;
pub mod verify_included;
pub mod watch;

use crate::http::ReqwestClient;
use merklelog_core::BlobMassifReader;
use merklelog_storage::{HttpClient, StoreBackend};
use std::path::PathBuf;
use std::sync::Arc;

/// Result type shared by the commands.
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Where the remote log lives and how it is laid out.
pub struct RemoteArgs {
    /// Remote base URL.
    pub data_url: Option<String>,
    /// Local directory used in place of a remote.
    pub data_local: Option<PathBuf>,
    /// Massif height.
    pub height: u8,
}

impl RemoteArgs {
    /// Opens the remote store.
    pub fn open_store(&self) -> CliResult<Arc<StoreBackend>> {
        let backend = match (&self.data_url, &self.data_local) {
            (Some(url), _) => {
                let client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new()?);
                StoreBackend::open(url, Some(client))?
            }
            (None, Some(dir)) => {
                let location = dir.to_str().ok_or("--data-local must be valid UTF-8")?;
                StoreBackend::open(location, None)?
            }
            (None, None) => return Err("one of --data-url or --data-local is required".into()),
        };
        Ok(Arc::new(backend))
    }

    /// Opens a massif reader over the remote store.
    pub fn open_reader(&self) -> CliResult<BlobMassifReader<Arc<StoreBackend>>> {
        Ok(BlobMassifReader::new(self.open_store()?, self.height)?)
    }
}

/// Decodes a hex argument.
pub fn decode_hex(name: &str, value: &str) -> CliResult<Vec<u8>> {
    let trimmed = value.trim().trim_start_matches("0x");
    hex::decode(trimmed).map_err(|e| format!("{name}: invalid hex '{value}': {e}").into())
}

/// Prints `value` as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
