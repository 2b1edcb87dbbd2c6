//! Caching transaction fetcher.
//!
//! Combines the [`CardClient`] with a [`CacheStore`] backend. A cached
//! entry short-circuits the request; a fresh response is written back to
//! the cache. Every failure degrades to an empty list so one bad year does
//! not abort the report.

use crate::cache::{CacheKey, CacheStore};
use crate::client::{CardClient, ReportQuery};
use crate::config::{Session, Settings};
use crate::error::{CardError, Result};
use crate::models::{DateRange, RawRecord};

use secrecy::ExposeSecret as _;

/// Anything that can produce the raw records of a date range.
pub trait RecordSource {
    /// Returns the records for `range`, or an empty list if they could not
    /// be obtained. `use_cache = false` forces a fresh request.
    fn records(&self, range: &DateRange, use_cache: bool) -> Vec<RawRecord>;
}

/// Builder for constructing a [`Fetcher`].
#[derive(Debug)]
pub struct FetcherBuilder<C: CacheStore> {
    /// Card account identifier.
    account: Option<String>,
    /// Session credential.
    hallticket: Option<String>,
    /// Endpoint override.
    endpoint: Option<String>,
    /// Cache backend.
    cache: Option<C>,
}

impl<C: CacheStore> FetcherBuilder<C> {
    /// Takes account and hallticket from a [`Session`].
    #[inline]
    #[must_use]
    pub fn session(mut self, session: &Session) -> Self {
        self.account = Some(session.account().to_owned());
        self.hallticket = Some(session.hallticket().expose_secret().to_owned());
        self
    }

    /// Sets the account queried.
    #[inline]
    #[must_use]
    pub fn account<T: Into<String>>(mut self, account: T) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Sets the hallticket.
    #[inline]
    #[must_use]
    pub fn hallticket<T: Into<String>>(mut self, hallticket: T) -> Self {
        self.hallticket = Some(hallticket.into());
        self
    }

    /// Overrides the report endpoint URL.
    #[inline]
    #[must_use]
    pub fn endpoint<T: Into<String>>(mut self, url: T) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Sets the cache backend.
    #[inline]
    #[must_use]
    pub fn cache(mut self, cache: C) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builds the fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::Config`] if the account or cache is missing,
    /// [`CardError::MissingCredential`] if the hallticket is missing, or
    /// [`CardError::Http`] if the HTTP client fails to build.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub fn build(self) -> Result<Fetcher<C>> {
        let account = self
            .account
            .ok_or_else(|| CardError::Config("account is required".to_owned()))?;
        let cache = self
            .cache
            .ok_or_else(|| CardError::Config("cache backend is required".to_owned()))?;
        let hallticket = self.hallticket.ok_or(CardError::MissingCredential)?;

        let mut client = CardClient::builder().hallticket(hallticket);
        if let Some(url) = self.endpoint {
            client = client.endpoint(url);
        }
        Ok(Fetcher {
            client: client.build()?,
            cache,
            account,
        })
    }
}

/// Fetches transaction lists for one account, through a cache.
///
/// Use [`Fetcher::builder()`] to construct an instance.
#[derive(Debug)]
pub struct Fetcher<C: CacheStore> {
    /// HTTP client bound to the session credential.
    client: CardClient,
    /// Cache backend.
    cache: C,
    /// Card account identifier.
    account: String,
}

impl<C: CacheStore> Fetcher<C> {
    /// Creates a new builder for configuring the fetcher.
    #[inline]
    #[must_use]
    pub const fn builder() -> FetcherBuilder<C> {
        FetcherBuilder {
            account: None,
            hallticket: None,
            endpoint: None,
            cache: None,
        }
    }

    /// Builds a fetcher for `session` using the endpoint from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::Http`] if the HTTP client fails to build.
    #[inline]
    pub fn from_settings(session: &Session, settings: &Settings, cache: C) -> Result<Self> {
        Self::builder()
            .session(session)
            .endpoint(settings.endpoint.clone())
            .cache(cache)
            .build()
    }

    /// The cache backend.
    #[inline]
    #[must_use]
    pub const fn cache(&self) -> &C {
        &self.cache
    }

    /// Returns the records for `range`, surfacing failures.
    ///
    /// A cached entry is returned without a request when `use_cache` is
    /// set. An unreadable entry counts as a miss. A fresh response is
    /// cached before it is returned; a failed cache write is logged and
    /// does not discard the data.
    ///
    /// # Errors
    ///
    /// Returns the [`CardClient::fetch_rows`] error when the request fails.
    #[inline]
    #[tracing::instrument(skip_all, fields(range = %range))]
    pub fn try_fetch(&self, range: &DateRange, use_cache: bool) -> Result<Vec<RawRecord>> {
        let key = CacheKey::new(range, &self.account);
        if use_cache {
            match self.cache.read(&key) {
                Ok(Some(records)) => {
                    tracing::info!(key = %key, rows = records.len(), "loaded from cache");
                    return Ok(records);
                }
                Ok(None) => tracing::debug!(key = %key, "cache miss"),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "unreadable cache entry, refetching");
                }
            }
        }

        let records = self
            .client
            .fetch_rows(&ReportQuery::new(range, &self.account))?;
        match self.cache.write(&key, &records) {
            Ok(()) => tracing::info!(key = %key, rows = records.len(), "response cached"),
            Err(err) => tracing::warn!(key = %key, error = %err, "failed to cache response"),
        }
        Ok(records)
    }

    /// Returns the records for `range`, or an empty list on any failure.
    #[inline]
    #[must_use]
    pub fn fetch(&self, range: &DateRange, use_cache: bool) -> Vec<RawRecord> {
        self.try_fetch(range, use_cache).unwrap_or_else(|err| {
            log_fetch_failure(*range, err);
            Vec::new()
        })
    }
}

impl<C: CacheStore> RecordSource for Fetcher<C> {
    #[inline]
    fn records(&self, range: &DateRange, use_cache: bool) -> Vec<RawRecord> {
        self.fetch(range, use_cache)
    }
}

/// Logs a failed fetch with a message matching the failure kind.
fn log_fetch_failure(range: DateRange, err: CardError) {
    match err {
        CardError::CredentialRejected => tracing::warn!(
            range = %range,
            "hallticket may have expired, update the account information and retry"
        ),
        CardError::MalformedResponse { reason, body } => tracing::warn!(
            range = %range,
            reason = %reason,
            body = %body,
            "failed to parse report response"
        ),
        CardError::Http(_) | CardError::Api { .. } => {
            tracing::warn!(range = %range, error = %err, "report request failed");
        }
        CardError::MissingCredential
        | CardError::Serialization(_)
        | CardError::Cache(_)
        | CardError::Config(_)
        | CardError::InvalidDate { .. }
        | CardError::InvalidRange { .. }
        | CardError::NoData
        | CardError::Chart(_) => tracing::warn!(range = %range, error = %err, "fetch failed"),
    }
}
