use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::TaxLookupError;
use crate::fs_util::write_atomic_from;

pub const DEFAULT_TAXDUMP_URL: &str = "https://ftp.ncbi.nlm.nih.gov/pub/taxonomy/taxdump.tar.gz";

pub trait TaxdumpClient: Send + Sync {
    /// Downloads `url` to `destination` and returns the number of bytes written.
    fn download_taxdump(&self, url: &str, destination: &Path) -> Result<u64, TaxLookupError>;
}

#[derive(Clone)]
pub struct TaxdumpHttpClient {
    client: Client,
}

impl TaxdumpHttpClient {
    pub fn new() -> Result<Self, TaxLookupError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-tax/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| TaxLookupError::TaxdumpHttp(err.to_string()))?,
        );

        // The full dump is tens of megabytes, so only the connect phase is short.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(900))
            .build()
            .map_err(|err| TaxLookupError::TaxdumpHttp(err.to_string()))?;

        Ok(Self { client })
    }

    fn send_with_retries(&self, url: &Url) -> Result<reqwest::blocking::Response, TaxLookupError> {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 500;
        let mut attempt = 0usize;
        loop {
            match self.client.get(url.clone()).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        debug!("taxdump request returned {status}, retrying");
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        debug!("taxdump request failed ({err}), retrying");
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(TaxLookupError::TaxdumpHttp(err.to_string()));
                }
            }
        }
    }
}

impl TaxdumpClient for TaxdumpHttpClient {
    fn download_taxdump(&self, url: &str, destination: &Path) -> Result<u64, TaxLookupError> {
        let requested =
            Url::parse(url).map_err(|err| TaxLookupError::TaxdumpHttp(format!("{url}: {err}")))?;
        let mut response = self.send_with_retries(&requested)?;
        check_resolved_url(&requested, response.url())?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "taxonomy request failed".to_string());
            return Err(TaxLookupError::TaxdumpStatus { status, message });
        }
        write_atomic_from(&mut response, destination)
    }
}

/// A redirect to another location is treated as an unavailable archive, not
/// followed silently.
pub fn check_resolved_url(requested: &Url, resolved: &Url) -> Result<(), TaxLookupError> {
    if requested != resolved {
        return Err(TaxLookupError::UrlMismatch {
            requested: requested.to_string(),
            resolved: resolved.to_string(),
        });
    }
    Ok(())
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
