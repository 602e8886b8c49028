//! Live HTTP adapter for a filing authority.
//!
//! Implements [`AuthorityClient`] over `reqwest::blocking`. The wire mapping
//! keeps authority decisions apart from transport failures:
//!
//! - 2xx with a `{"receiptId"}` body      -> [`AuthorityResponse::Accepted`]
//! - 4xx with a `{"code","message"}` body -> [`AuthorityResponse::Rejected`]
//! - timeout, connect failure, 5xx        -> [`AuthorityError::Transient`]
//! - any answer this client cannot read   -> [`AuthorityError::Protocol`]
//!
//! A rejection is an answer, never an error. A transient error leaves the
//! outcome unknown; the caller may retry under the same filing reference
//! because the authority deduplicates on it.
//!
//! The API key is read by the caller and passed in. It travels as `X-Api-Key`
//! and is never logged and never echoed into error text.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tfd_filing::{AuthorityClient, AuthorityError, AuthorityResponse, FilingSubmission};
use thiserror::Error;
use tracing::{info, warn};

/// Most bytes of an authority body quoted into an error detail. Details are
/// persisted per attempt, so bodies are quoted bounded.
const BODY_SNIPPET_MAX: usize = 200;

/// Transport-level failure from [`HttpAuthority::submit_document`].
///
/// Mapped into [`AuthorityError`] at the [`AuthorityClient`] boundary; kept
/// public so callers that want the raw status and body can take this route.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authority returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("response body did not parse: {0}")]
    Json(#[from] serde_json::Error),
}

/// Blocking HTTP client for a live filing authority.
pub struct HttpAuthority {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    filing_reference: &'a str,
    transaction_id: String,
    attempt_no: u32,
    document: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptBody {
    receipt_id: String,
}

#[derive(Deserialize)]
struct RejectionBody {
    code: String,
    message: String,
}

impl HttpAuthority {
    /// `base_url` is the authority root, e.g. `https://filings.example.gov`
    /// (a trailing slash is tolerated). `submit_timeout_ms` bounds the whole
    /// request. The API key is read by the caller from the environment and
    /// passed in; do not log it.
    pub fn new(base_url: &str, submit_timeout_ms: u64, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_millis(submit_timeout_ms),
        }
    }

    fn filings_url(&self) -> String {
        format!("{}/filings", self.base_url)
    }

    /// POST one document and read the authority's answer.
    ///
    /// Both `Accepted` and `Rejected` come back as `Ok`: in either case the
    /// authority answered and the attempt has a final outcome.
    pub fn submit_document(
        &self,
        submission: &FilingSubmission,
    ) -> Result<AuthorityResponse, SubmitError> {
        let url = self.filings_url();
        info!(
            url = %url,
            filing_reference = %submission.filing_reference,
            attempt_no = submission.attempt_no,
            document_bytes = submission.xml.len(),
            "submitting filing document"
        );

        let body = SubmitBody {
            filing_reference: &submission.filing_reference,
            transaction_id: submission.transaction_id.to_string(),
            attempt_no: submission.attempt_no,
            document: &submission.xml,
        };

        let mut req = self.http.post(&url).timeout(self.timeout).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("X-Api-Key", key);
        }

        let resp = req.send()?;
        let status = resp.status();
        let text = resp.text()?;

        if status.is_success() {
            let receipt: ReceiptBody = serde_json::from_str(&text)?;
            info!(
                filing_reference = %submission.filing_reference,
                receipt_id = %receipt.receipt_id,
                "authority accepted filing"
            );
            return Ok(AuthorityResponse::Accepted {
                receipt_id: receipt.receipt_id,
            });
        }

        if status.is_client_error() {
            if let Ok(rejection) = serde_json::from_str::<RejectionBody>(&text) {
                info!(
                    filing_reference = %submission.filing_reference,
                    code = %rejection.code,
                    "authority rejected filing"
                );
                return Ok(AuthorityResponse::Rejected {
                    code: rejection.code,
                    message: rejection.message,
                });
            }
        }

        Err(SubmitError::Server {
            status: status.as_u16(),
            body: text,
        })
    }

    fn classify(&self, err: SubmitError) -> AuthorityError {
        match err {
            SubmitError::Http(e) if e.is_timeout() => AuthorityError::Transient {
                detail: format!("request timed out after {}ms", self.timeout.as_millis()),
            },
            SubmitError::Http(e) if e.is_connect() => AuthorityError::Transient {
                detail: format!("connect failed: {e}"),
            },
            SubmitError::Http(e) => AuthorityError::Transient {
                detail: format!("transport failed: {e}"),
            },
            SubmitError::Server { status, body } if status >= 500 => AuthorityError::Transient {
                detail: format!("authority returned {status}: {}", snippet(&body)),
            },
            SubmitError::Server { status, body } => AuthorityError::Protocol {
                detail: format!(
                    "authority returned {status} with an unrecognized body: {}",
                    snippet(&body)
                ),
            },
            SubmitError::Json(e) => AuthorityError::Protocol {
                detail: format!("accept body did not parse: {e}"),
            },
        }
    }
}

impl AuthorityClient for HttpAuthority {
    fn submit(&self, submission: &FilingSubmission) -> Result<AuthorityResponse, AuthorityError> {
        match self.submit_document(submission) {
            Ok(answer) => Ok(answer),
            Err(err) => {
                let mapped = self.classify(err);
                warn!(
                    filing_reference = %submission.filing_reference,
                    attempt_no = submission.attempt_no,
                    error = %mapped,
                    "filing submission ended without a decision"
                );
                Err(mapped)
            }
        }
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= BODY_SNIPPET_MAX {
        return trimmed.to_string();
    }
    let mut end = BODY_SNIPPET_MAX;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}
