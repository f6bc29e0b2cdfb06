//! HTTP client for the Tally XML server.

use super::{
    TallyGateway, TallyStatus, envelope,
    response::{self, ImportResult, TallyCompany},
};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout for the running-status check.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for collection exports such as the company list.
pub const EXPORT_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout for voucher imports.
pub const IMPORT_TIMEOUT: Duration = Duration::from_secs(15);

/// Tally client bound to one server URL.
#[derive(Debug, Clone)]
pub struct TallyClient {
    client: Client,
    base_url: String,
}

fn map_send_error(err: reqwest::Error) -> Error {
    if err.is_timeout() || err.is_connect() {
        Error::TallyUnavailable {
            message: err.to_string(),
        }
    } else {
        Error::Http(err)
    }
}

impl TallyClient {
    /// Create a client for the Tally server at `base_url` (e.g. `http://localhost:9000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Server URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POSTs an XML envelope and returns the response body.
    ///
    /// # Errors
    /// `TallyUnavailable` on connect failures and timeouts, `Tally` on non-success
    /// status codes, `Http` for anything else the client reports.
    pub async fn post_xml(&self, body: String, timeout: Duration) -> Result<String> {
        debug!(url = %self.base_url, bytes = body.len(), "Sending request to Tally");
        let response = self
            .client
            .post(&self.base_url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .timeout(timeout)
            .body(body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Tally {
                message: format!("Tally answered with HTTP {status}"),
            });
        }
        response.text().await.map_err(map_send_error)
    }
}

#[async_trait]
impl TallyGateway for TallyClient {
    async fn status(&self) -> TallyStatus {
        let result = self
            .client
            .get(&self.base_url)
            .timeout(STATUS_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => match response.text().await {
                Ok(body) if response::is_running_banner(&body) => TallyStatus {
                    running: true,
                    detail: body.trim().to_string(),
                },
                Ok(body) => TallyStatus {
                    running: false,
                    detail: format!("Unexpected response: {}", body.trim()),
                },
                Err(e) => TallyStatus {
                    running: false,
                    detail: e.to_string(),
                },
            },
            Err(e) => {
                warn!("Tally status check failed: {}", e);
                TallyStatus {
                    running: false,
                    detail: e.to_string(),
                }
            }
        }
    }

    async fn companies(&self) -> Result<Vec<TallyCompany>> {
        let body = self
            .post_xml(envelope::company_list_request(), EXPORT_TIMEOUT)
            .await?;
        response::parse_company_list(&body)
    }

    async fn import_vouchers(&self, request_xml: String) -> Result<ImportResult> {
        let body = self.post_xml(request_xml, IMPORT_TIMEOUT).await?;
        let result = response::parse_import_result(&body)?;
        if result.has_errors() {
            let detail = if result.line_errors.is_empty() {
                format!("{} errors, {} exceptions", result.errors, result.exceptions)
            } else {
                result.line_errors.join("; ")
            };
            return Err(Error::Tally {
                message: format!("Voucher import rejected: {detail}"),
            });
        }
        Ok(result)
    }
}
