use thiserror::Error;

/// Why a header or row fetch did not produce data.
///
/// The navigator treats every row failure as end-of-data; the variants exist
/// so the cause can still be logged.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned an unexpected body: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetch task was interrupted")]
    Interrupted,
}
