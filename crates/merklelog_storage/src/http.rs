//! Read-only blob store over HTTP.

use crate::error::{StorageError, StorageResult};
use crate::store::{validate_path, BlobStore, ListPage};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A minimal HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

/// Blocking HTTP GET transport used by [`HttpStore`].
///
/// Kept as a trait so the storage crate does not choose an HTTP stack; the
/// CLI supplies one and tests supply a canned client.
pub trait HttpClient: Send + Sync {
    /// Performs a GET request.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transport`] if no response was received.
    fn get(&self, url: &str) -> StorageResult<HttpResponse>;
}

/// A read-only blob store backed by an HTTP endpoint.
///
/// Blobs are fetched from `<base_url>/<path>`. Listings are requested as
/// `<base_url>/?prefix=<prefix>&marker=<marker>&limit=<n>` and must answer
/// with a JSON [`ListPage`].
#[derive(Clone)]
pub struct HttpStore {
    base_url: String,
    client: Arc<dyn HttpClient>,
}

impl fmt::Debug for HttpStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpStore {
    /// Creates a store for `base_url` using `client`.
    pub fn new(base_url: impl Into<String>, client: Arc<dyn HttpClient>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn blob_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Percent-encodes a query parameter value.
fn encode_query(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(char::from(b));
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

impl BlobStore for HttpStore {
    fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        validate_path(path)?;
        let url = self.blob_url(path);
        debug!(url = %url, "fetching blob");
        let response = self.client.get(&url)?;
        match response.status {
            200 => Ok(response.body),
            404 => Err(StorageError::not_found(path)),
            status => Err(StorageError::Http { status, url }),
        }
    }

    fn put(&self, path: &str, _data: &[u8]) -> StorageResult<()> {
        Err(StorageError::ReadOnly {
            path: path.to_string(),
        })
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        match self.get(path) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn list(&self, prefix: &str, marker: Option<&str>, limit: usize) -> StorageResult<ListPage> {
        let mut url = format!(
            "{}/?prefix={}&limit={}",
            self.base_url,
            encode_query(prefix),
            limit.max(1)
        );
        if let Some(marker) = marker {
            url.push_str("&marker=");
            url.push_str(&encode_query(marker));
        }
        let response = self.client.get(&url)?;
        if response.status != 200 {
            return Err(StorageError::Http {
                status: response.status,
                url,
            });
        }
        serde_json::from_slice(&response.body)
            .map_err(|e| StorageError::MalformedListing(e.to_string()))
    }

    fn ensure_prefix(&self, prefix: &str) -> StorageResult<()> {
        Err(StorageError::ReadOnly {
            path: prefix.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct CannedClient {
        responses: HashMap<String, HttpResponse>,
        requested: Mutex<Vec<String>>,
    }

    impl HttpClient for CannedClient {
        fn get(&self, url: &str) -> StorageResult<HttpResponse> {
            self.requested.lock().push(url.to_string());
            Ok(self.responses.get(url).cloned().unwrap_or(HttpResponse {
                status: 404,
                body: Vec::new(),
            }))
        }
    }

    fn store_with(responses: Vec<(&str, u16, &[u8])>) -> (HttpStore, Arc<CannedClient>) {
        let client = Arc::new(CannedClient {
            responses: responses
                .into_iter()
                .map(|(url, status, body)| {
                    (
                        url.to_string(),
                        HttpResponse {
                            status,
                            body: body.to_vec(),
                        },
                    )
                })
                .collect(),
            requested: Mutex::new(Vec::new()),
        });
        (HttpStore::new("https://logs.example/", client.clone()), client)
    }

    #[test]
    fn http_get_maps_statuses() {
        let (store, _) = store_with(vec![
            ("https://logs.example/a/b", 200, b"data"),
            ("https://logs.example/a/c", 500, b""),
        ]);
        assert_eq!(store.get("a/b").unwrap(), b"data");
        assert!(store.get("a/missing").unwrap_err().is_not_found());
        assert!(matches!(
            store.get("a/c"),
            Err(StorageError::Http { status: 500, .. })
        ));
        assert!(store.exists("a/b").unwrap());
        assert!(!store.exists("a/missing").unwrap());
    }

    #[test]
    fn http_is_read_only() {
        let (store, _) = store_with(vec![]);
        assert!(matches!(store.put("a", b""), Err(StorageError::ReadOnly { .. })));
    }

    #[test]
    fn http_list_parses_json_page() {
        let body = br#"{"entries":[{"path":"v1/x","last_modified":7}],"next_marker":"v1/x"}"#;
        let (store, client) = store_with(vec![(
            "https://logs.example/?prefix=v1/&limit=5&marker=v1/a%20b",
            200,
            body,
        )]);
        let page = store.list("v1/", Some("v1/a b"), 5).unwrap();
        assert_eq!(page.entries[0].last_modified, 7);
        assert_eq!(page.next_marker.as_deref(), Some("v1/x"));
        assert_eq!(client.requested.lock().len(), 1);
    }

    #[test]
    fn query_values_keep_path_characters() {
        assert_eq!(encode_query("v1/mmrs/tenant-1_a.b~c"), "v1/mmrs/tenant-1_a.b~c");
        assert_eq!(encode_query("a b&c=d?e#f%"), "a%20b%26c%3Dd%3Fe%23f%25");
        assert_eq!(encode_query("+"), "%2B");
        assert_eq!(encode_query("é"), "%C3%A9");
        assert_eq!(encode_query(""), "");
    }

    #[test]
    fn http_list_rejects_garbage() {
        let (store, _) = store_with(vec![("https://logs.example/?prefix=&limit=1", 200, b"nope")]);
        assert!(matches!(
            store.list("", None, 1),
            Err(StorageError::MalformedListing(_))
        ));
    }
}
