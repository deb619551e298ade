//! Search commands.

use super::{decode_hex, print_json, CliResult, RemoteArgs};
use merklelog_core::{trie_key, IndexKind, LogId, SearchConfig, SearchResult};
use serde::Serialize;

/// What `find-trie-entries` looks for.
pub struct TrieQuery<'a> {
    /// Tenant whose massifs are scanned.
    pub tenant: &'a str,
    /// Explicit log id, overriding the tenant's encodings.
    pub log_id: Option<&'a str>,
    /// Trie key domain byte.
    pub domain: u8,
    /// Application id.
    pub app_id: &'a str,
}

/// Massif range and output mode.
pub struct Range {
    /// First massif.
    pub start: u32,
    /// Last massif, or until the log ends.
    pub end: Option<u32>,
    /// How matches are reported.
    pub output_index: IndexKind,
}

impl Range {
    fn search_config(&self, height: u8) -> SearchConfig {
        SearchConfig::new()
            .massif_height(height)
            .massif_start(self.start)
            .massif_end(self.end)
    }
}

/// Search output.
#[derive(Debug, Serialize)]
pub struct FindOutput {
    /// Tenant scanned.
    pub tenant: String,
    /// Index kind of `matches`.
    pub index_kind: IndexKind,
    /// Matching indices.
    pub matches: Vec<u64>,
    /// Leaf slots examined.
    pub entries_considered: u64,
}

impl FindOutput {
    fn new(tenant: &str, range: &Range, result: &SearchResult) -> Self {
        Self {
            tenant: tenant.to_string(),
            index_kind: range.output_index,
            matches: result.indices(range.output_index),
            entries_considered: result.entries_considered,
        }
    }
}

/// Trie keys to look for.
fn candidate_keys(query: &TrieQuery<'_>) -> CliResult<Vec<[u8; 32]>> {
    let log_ids = match query.log_id {
        Some(text) => vec![LogId::parse(text)?],
        None => LogId::candidates(query.tenant),
    };
    Ok(log_ids
        .iter()
        .map(|id| trie_key(query.domain, id.as_bytes(), query.app_id.as_bytes()))
        .collect())
}

/// Runs `find-trie-entries`.
pub fn run_trie(
    remote: &RemoteArgs,
    query: &TrieQuery<'_>,
    range: &Range,
    format: &str,
) -> CliResult<()> {
    let reader = remote.open_reader()?;
    let keys = candidate_keys(query)?;
    let result = range
        .search_config(remote.height)
        .find_trie_keys(&reader, query.tenant, &keys)?;
    print_output(&FindOutput::new(query.tenant, range, &result), format)
}

/// Runs `find-mmr-entries`.
pub fn run_mmr(
    remote: &RemoteArgs,
    tenant: &str,
    app_entries: &[String],
    range: &Range,
    format: &str,
) -> CliResult<()> {
    let payloads = app_entries
        .iter()
        .map(|entry| decode_hex("--app-entry", entry))
        .collect::<CliResult<Vec<_>>>()?;
    let reader = remote.open_reader()?;
    let result = range
        .search_config(remote.height)
        .find_mmr_entries(&reader, tenant, &payloads)?;
    print_output(&FindOutput::new(tenant, range, &result), format)
}

fn print_output(output: &FindOutput, format: &str) -> CliResult<()> {
    match format {
        "json" => print_json(output)?,
        _ => {
            println!("Tenant: {}", output.tenant);
            println!("Entries considered: {}", output.entries_considered);
            if output.matches.is_empty() {
                println!("No matches");
            }
            for index in &output.matches {
                println!("{} {index}", output.index_kind);
            }
        }
    }
    Ok(())
}
