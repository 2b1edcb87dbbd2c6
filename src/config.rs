//! Session credentials and run settings.
//!
//! The credential file holds the card account and the hallticket; the
//! optional settings file overrides endpoint, cache location, academic-year
//! boundaries, and chart output paths.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_DIR;
use crate::client::DEFAULT_ENDPOINT;
use crate::error::{CardError, Result};
use crate::models::{AcademicCalendar, DateRange, default_span};

/// Default credential file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Default settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Environment variable overriding the account.
pub const ACCOUNT_ENV: &str = "CARDSPEND_ACCOUNT";

/// Environment variable overriding the hallticket.
pub const HALLTICKET_ENV: &str = "CARDSPEND_HALLTICKET";

/// Default merchant chart file name.
pub const DEFAULT_MERCHANT_CHART: &str = "result.png";

/// Default trend chart file name.
pub const DEFAULT_TREND_CHART: &str = "trend.png";

/// Default chart font family, chosen per platform for CJK coverage since
/// merchant names are mostly Chinese. Missing fonts fall back to the
/// system sans-serif face.
pub const DEFAULT_FONT_FAMILY: &str = if cfg!(target_os = "macos") {
    "Arial Unicode MS"
} else if cfg!(target_os = "linux") {
    "Droid Sans Fallback"
} else {
    "SimHei"
};

/// The account being reported on and the credential that unlocks it.
#[derive(Debug)]
pub struct Session {
    /// Card account identifier.
    account: String,
    /// Session token for the report service.
    hallticket: SecretString,
}

/// On-disk shape of the credential file.
#[derive(Deserialize)]
struct CredentialFile {
    /// Card account identifier.
    account: AccountField,
    /// Session token.
    hallticket: String,
}

/// The account as written by hand: quoted or a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum AccountField {
    /// `"account": "2100012345"`.
    Text(String),
    /// `"account": 2100012345`.
    Number(serde_json::Number),
}

impl AccountField {
    /// The account as a string; numbers keep their written digits.
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Borrowed shape used when writing the credential file.
#[derive(Serialize)]
struct CredentialFileRef<'src> {
    /// Card account identifier.
    account: &'src str,
    /// Session token.
    hallticket: &'src str,
}

impl Session {
    /// Creates a session.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::Config`] if either value is blank.
    #[inline]
    pub fn new<A: Into<String>, H: Into<String>>(account: A, hallticket: H) -> Result<Self> {
        let account_id = account.into().trim().to_owned();
        let ticket = hallticket.into().trim().to_owned();
        if account_id.is_empty() {
            return Err(CardError::Config("account is empty".to_owned()));
        }
        if ticket.is_empty() {
            return Err(CardError::Config("hallticket is empty".to_owned()));
        }
        Ok(Self {
            account: account_id,
            hallticket: SecretString::from(ticket),
        })
    }

    /// Card account identifier.
    #[inline]
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Session token.
    #[inline]
    #[must_use]
    pub const fn hallticket(&self) -> &SecretString {
        &self.hallticket
    }

    /// Reads the credential file.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::Config`] if the file is missing, unreadable, not
    /// a JSON object with `account` and `hallticket`, or has blank values.
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|err| CardError::Config(format!("{}: {err}", path.display())))?;
        let file: CredentialFile = serde_json::from_str(&contents)
            .map_err(|err| CardError::Config(format!("{}: {err}", path.display())))?;
        Self::new(file.account.into_string(), file.hallticket)
    }

    /// Writes the credential file, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::Config`] if the file cannot be written.
    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&CredentialFileRef {
            account: &self.account,
            hallticket: self.hallticket.expose_secret(),
        })?;
        fs::write(path, format!("{json}\n"))
            .map_err(|err| CardError::Config(format!("{}: {err}", path.display())))?;
        tracing::debug!(path = %path.display(), "credential file written");
        Ok(())
    }

    /// Reads [`ACCOUNT_ENV`] and [`HALLTICKET_ENV`]; `None` unless both are
    /// set and non-blank.
    #[inline]
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a session from a variable lookup.
    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Option<Self> {
        let account = lookup(ACCOUNT_ENV)?;
        let hallticket = lookup(HALLTICKET_ENV)?;
        Self::new(account, hallticket).ok()
    }
}

/// Run settings. Every field has a default, so the file may list only the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Transaction-report endpoint URL.
    pub endpoint: String,
    /// Directory for cached responses.
    pub cache_dir: PathBuf,
    /// Overall span covered by the report.
    pub span: DateRange,
    /// Date range of each academic year.
    pub years: AcademicCalendar,
    /// Output file of the merchant chart.
    pub merchant_chart: PathBuf,
    /// Output file of the trend chart.
    pub trend_chart: PathBuf,
    /// Font family used for chart text.
    pub font_family: String,
}

impl Default for Settings {
    #[inline]
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            span: default_span(),
            years: AcademicCalendar::default(),
            merchant_chart: PathBuf::from(DEFAULT_MERCHANT_CHART),
            trend_chart: PathBuf::from(DEFAULT_TREND_CHART),
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
        }
    }
}

impl Settings {
    /// Reads the settings file; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::Config`] if the file exists but cannot be read
    /// or contains invalid settings (unknown keys, bad dates, inverted
    /// ranges, missing years).
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|err| CardError::Config(format!("{}: {err}", path.display()))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(CardError::Config(format!("{}: {err}", path.display()))),
        }
    }

    /// Places both chart outputs under `dir`.
    #[inline]
    #[must_use]
    pub fn with_output_dir(mut self, dir: &Path) -> Self {
        self.merchant_chart = dir.join(&self.merchant_chart);
        self.trend_chart = dir.join(&self.trend_chart);
        self
    }
}
