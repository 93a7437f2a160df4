use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    /// Sequence number of the navigation that issued this request
    pub generation: u64,
    /// Zero-based row index
    pub index: usize,
    /// Ask for the header set alongside the row
    pub fetch_headers: bool,
}

#[derive(Debug)]
pub struct FetchResponse {
    pub generation: u64,
    pub index: usize,
    /// `None` when headers were not requested
    pub headers: Option<Result<Vec<String>, FetchError>>,
    pub row: Result<Vec<Value>, FetchError>,
}

/// Read-only access to the header set and individual rows.
pub trait RowSource: Send + Sync {
    fn fetch_headers(&self) -> Result<Vec<String>, FetchError>;
    fn fetch_row(&self, index: usize) -> Result<Vec<Value>, FetchError>;
}

/// `RowSource` backed by the `/api/headers` and `/api/data/{index}` endpoints.
pub struct HttpRowSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpRowSource {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    fn with_client(base_url: &str, client: reqwest::blocking::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn headers_url(&self) -> String {
        format!("{}/api/headers", self.base_url)
    }

    fn row_url(&self, index: usize) -> String {
        format!("{}/api/data/{}", self.base_url, index)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, FetchError> {
        let response = match self.client.get(&url).send() {
            Ok(r) => r,
            Err(source) => return Err(FetchError::Transport { url, source }),
        };
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }
        response
            .json::<T>()
            .map_err(|source| FetchError::Decode { url, source })
    }
}

impl RowSource for HttpRowSource {
    fn fetch_headers(&self) -> Result<Vec<String>, FetchError> {
        self.get_json(self.headers_url())
    }

    fn fetch_row(&self, index: usize) -> Result<Vec<Value>, FetchError> {
        self.get_json(self.row_url(index))
    }
}

/// Serves fetch requests until the request channel closes or the UI stops
/// listening. Headers and row are fetched concurrently for each request.
pub fn start_fetch_worker<S: RowSource>(
    source: S,
    req_rx: Receiver<FetchRequest>,
    resp_tx: Sender<FetchResponse>,
) {
    while let Ok(req) = req_rx.recv() {
        debug!(
            generation = req.generation,
            index = req.index,
            fetch_headers = req.fetch_headers,
            "fetching row"
        );
        let resp = fetch_one(&source, req);
        if let Err(e) = &resp.row {
            warn!(index = req.index, error = %e, "row fetch failed");
        }
        if let Some(Err(e)) = &resp.headers {
            warn!(error = %e, "header fetch failed");
        }
        if resp_tx.send(resp).is_err() {
            break;
        }
    }
    debug!("fetch worker stopped");
}

fn fetch_one<S: RowSource>(source: &S, req: FetchRequest) -> FetchResponse {
    let (headers, row) = thread::scope(|s| {
        let headers_task = req
            .fetch_headers
            .then(|| s.spawn(|| source.fetch_headers()));
        let row = source.fetch_row(req.index);
        let headers = headers_task.map(|task| task.join().unwrap_or(Err(FetchError::Interrupted)));
        (headers, row)
    });
    FetchResponse {
        generation: req.generation,
        index: req.index,
        headers,
        row,
    }
}
