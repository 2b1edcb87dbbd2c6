//! HTTP client for the campus-card transaction report.
//!
//! A single blocking POST per date range; the hallticket travels as a
//! session cookie and the query as a form body.

use reqwest::header::COOKIE;
use secrecy::{ExposeSecret as _, SecretString};
use serde::Serialize;
use serde_json::Value;

use crate::error::{CardError, Result};
use crate::models::{DateRange, RawRecord};

/// Default transaction-report endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://card.pku.edu.cn/Report/GetPersonTrjn";

/// Path of the transaction-report endpoint on the card server.
pub const REPORT_PATH: &str = "/Report/GetPersonTrjn";

/// Rows requested per page. Large enough that one page holds a year.
pub const PAGE_ROWS: u32 = 9000;

/// Marker of the login page the server returns for a stale hallticket.
const EXPIRED_MARKER: &str = "<title></title>";

/// Response field holding the transaction list.
const ROWS_FIELD: &str = "rows";

/// Form body of a transaction-report request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportQuery {
    /// Start date, `YYYY-MM-DD`.
    sdate: String,
    /// End date, `YYYY-MM-DD`.
    edate: String,
    /// Card account identifier.
    account: String,
    /// Page number, always the first.
    page: u32,
    /// Rows per page.
    rows: u32,
}

impl ReportQuery {
    /// Builds the single-page query for `range` on `account`.
    #[inline]
    #[must_use]
    pub fn new(range: &DateRange, account: &str) -> Self {
        Self {
            sdate: range.start().to_string(),
            edate: range.end().to_string(),
            account: account.to_owned(),
            page: 1,
            rows: PAGE_ROWS,
        }
    }
}

/// Builder for constructing a [`CardClient`].
#[derive(Debug, Default)]
pub struct CardClientBuilder {
    /// Session credential.
    hallticket: Option<SecretString>,
    /// Endpoint override (for testing or another campus).
    endpoint: Option<String>,
}

impl CardClientBuilder {
    /// Sets the hallticket sent as the session cookie.
    #[inline]
    #[must_use]
    pub fn hallticket<T: Into<String>>(mut self, hallticket: T) -> Self {
        self.hallticket = Some(SecretString::from(hallticket.into()));
        self
    }

    /// Overrides the report endpoint URL.
    #[inline]
    #[must_use]
    pub fn endpoint<T: Into<String>>(mut self, url: T) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::MissingCredential`] if no hallticket was
    /// provided, or [`CardError::Http`] if the HTTP client fails to build.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub fn build(self) -> Result<CardClient> {
        let hallticket = self.hallticket.ok_or(CardError::MissingCredential)?;
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned());
        tracing::debug!(endpoint = %endpoint, "building client");
        let http = reqwest::blocking::Client::builder().build()?;
        Ok(CardClient {
            http,
            hallticket,
            endpoint,
        })
    }
}

/// Blocking client for the transaction-report endpoint.
///
/// Use [`CardClient::builder()`] to construct an instance.
#[derive(Debug)]
pub struct CardClient {
    /// Underlying HTTP client.
    http: reqwest::blocking::Client,
    /// Session credential.
    hallticket: SecretString,
    /// Report endpoint URL.
    endpoint: String,
}

impl CardClient {
    /// Creates a new builder for configuring the client.
    #[inline]
    #[must_use]
    pub fn builder() -> CardClientBuilder {
        CardClientBuilder::default()
    }

    /// Report endpoint this client posts to.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Requests one page of transactions and returns its `rows`.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::Http`] on transport failure,
    /// [`CardError::Api`] on a non-success status,
    /// [`CardError::CredentialRejected`] when the server answers with its
    /// login page, and [`CardError::MalformedResponse`] when the body is
    /// not a JSON object with a `rows` array.
    #[inline]
    #[tracing::instrument(skip_all, fields(sdate = %query.sdate, edate = %query.edate))]
    pub fn fetch_rows(&self, query: &ReportQuery) -> Result<Vec<RawRecord>> {
        tracing::trace!(endpoint = %self.endpoint, "sending POST request");
        let response = self
            .http
            .post(&self.endpoint)
            .header(
                COOKIE,
                format!("hallticket={}", self.hallticket.expose_secret()),
            )
            .form(query)
            .send()?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");
        if status.is_success() {
            let body = response.text()?;
            tracing::trace!(body_len = body.len(), "parsing response body");
            parse_report_body(body)
        } else {
            let message = response
                .text()
                .unwrap_or_else(|_| "unknown error".to_owned());
            tracing::debug!(status = status.as_u16(), message = %message, "API error");
            Err(CardError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Extracts the transaction rows from a successful response body.
///
/// # Errors
///
/// Returns [`CardError::CredentialRejected`] if the body is the login page
/// and [`CardError::MalformedResponse`] if it is not a JSON object with a
/// `rows` array.
#[inline]
pub fn parse_report_body(body: String) -> Result<Vec<RawRecord>> {
    if body.contains(EXPIRED_MARKER) {
        return Err(CardError::CredentialRejected);
    }
    let mut parsed: Value = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(err) => {
            return Err(CardError::MalformedResponse {
                reason: err.to_string(),
                body,
            });
        }
    };
    match parsed.get_mut(ROWS_FIELD).map(Value::take) {
        Some(Value::Array(rows)) => Ok(rows),
        Some(_) => Err(CardError::MalformedResponse {
            reason: "`rows` is not an array".to_owned(),
            body,
        }),
        None => Err(CardError::MalformedResponse {
            reason: "missing `rows` field".to_owned(),
            body,
        }),
    }
}
