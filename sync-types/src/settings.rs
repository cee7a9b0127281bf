//! Sync configuration record, as persisted by the host's settings store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{DeviceId, SyncError, Userkey};

/// Default equality threshold between two completion fractions.
pub const DEFAULT_PERCENTAGE_TOLERANCE: f64 = 1e-4;

/// Default precision exponent (`tolerance = 10^-precision`).
pub const DEFAULT_TOLERANCE_PRECISION: u32 = 4;

/// Product name used in the default device name.
pub const DEFAULT_DEVICE_PRODUCT: &str = "KOSync Client";

/// Policy for reconciling local and remote progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
    /// Ask the user when positions differ
    Prompt,
    /// Take the remote position when it is newer, otherwise keep local
    Silent,
    /// Only push, never fetch
    Send,
    /// Only fetch and apply, never push
    Receive,
    /// Sync off
    #[default]
    Disabled,
}

impl SyncStrategy {
    /// Whether local progress may be pushed under this strategy.
    pub fn allows_push(&self) -> bool {
        !matches!(self, SyncStrategy::Receive | SyncStrategy::Disabled)
    }

    /// Lowercase wire/config name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStrategy::Prompt => "prompt",
            SyncStrategy::Silent => "silent",
            SyncStrategy::Send => "send",
            SyncStrategy::Receive => "receive",
            SyncStrategy::Disabled => "disabled",
        }
    }
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStrategy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prompt" => Ok(SyncStrategy::Prompt),
            "silent" => Ok(SyncStrategy::Silent),
            "send" => Ok(SyncStrategy::Send),
            "receive" => Ok(SyncStrategy::Receive),
            "disabled" | "disable" => Ok(SyncStrategy::Disabled),
            other => Err(SyncError::InvalidData(format!("unknown strategy: {other}"))),
        }
    }
}

/// How the document digest is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumMethod {
    /// Partial MD5 of the file content (stable, preferred)
    #[default]
    Binary,
    /// MD5 of the normalized base filename (fallback, less reliable)
    Filename,
}

impl ChecksumMethod {
    /// Lowercase wire/config name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumMethod::Binary => "binary",
            ChecksumMethod::Filename => "filename",
        }
    }
}

impl fmt::Display for ChecksumMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumMethod {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(ChecksumMethod::Binary),
            "filename" => Ok(ChecksumMethod::Filename),
            other => Err(SyncError::InvalidData(format!(
                "unknown checksum method: {other}"
            ))),
        }
    }
}

/// The persisted sync configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Base URL of the KOSync server
    pub server_url: String,
    /// Account name
    pub username: String,
    /// Credential digest; `None` when logged out
    pub userkey: Option<Userkey>,
    /// Install-wide device id, created on first login
    pub device_id: Option<DeviceId>,
    /// User-chosen device name; `None` means the platform default
    pub device_name: Option<String>,
    /// Digest derivation
    pub checksum_method: ChecksumMethod,
    /// Reconciliation policy
    pub strategy: SyncStrategy,
    /// Equality threshold between completion fractions
    pub percentage_tolerance: f64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            username: String::new(),
            userkey: None,
            device_id: None,
            device_name: None,
            checksum_method: ChecksumMethod::default(),
            strategy: SyncStrategy::default(),
            percentage_tolerance: DEFAULT_PERCENTAGE_TOLERANCE,
        }
    }
}

impl SyncSettings {
    /// Username and a non-empty userkey are both present.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && self.userkey.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// The device name sent with pushes.
    pub fn effective_device_name(&self) -> String {
        match self.device_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => default_device_name(),
        }
    }

    /// Store the result of a successful login.
    ///
    /// A disabled strategy is switched to `prompt`; other strategies are kept.
    pub fn apply_login(
        &mut self,
        server_url: &str,
        username: &str,
        userkey: Userkey,
        device_id: DeviceId,
        device_name: Option<String>,
    ) {
        self.server_url = server_url.to_string();
        self.username = username.to_string();
        self.userkey = Some(userkey);
        self.device_id = Some(device_id);
        if device_name.is_some() {
            self.device_name = device_name;
        }
        if self.strategy == SyncStrategy::Disabled {
            self.strategy = SyncStrategy::Prompt;
        }
    }

    /// Forget the credential and turn sync off.
    pub fn apply_logout(&mut self) {
        self.strategy = SyncStrategy::Disabled;
        self.userkey = None;
    }

    /// The device id, generating one if this install has none yet.
    pub fn device_id_or_generate(&mut self) -> DeviceId {
        self.device_id.get_or_insert_with(DeviceId::random).clone()
    }

    /// Current tolerance as an integer precision (`10^-n`).
    pub fn tolerance_precision(&self) -> u32 {
        precision_from_tolerance(self.percentage_tolerance)
    }

    /// Set the tolerance from an integer precision.
    pub fn set_tolerance_precision(&mut self, precision: u32) {
        self.percentage_tolerance = tolerance_from_precision(precision);
    }
}

/// `10^-precision`.
pub fn tolerance_from_precision(precision: u32) -> f64 {
    10f64.powi(-(precision as i32))
}

/// `round(-log10(tolerance))`, falling back to the default for non-positive input.
pub fn precision_from_tolerance(tolerance: f64) -> u32 {
    if tolerance > 0.0 && tolerance.is_finite() {
        (-tolerance.log10()).round().max(0.0) as u32
    } else {
        DEFAULT_TOLERANCE_PRECISION
    }
}

/// `"KOSync Client (<Os>)"` for the current platform.
pub fn default_device_name() -> String {
    device_name_for_os(std::env::consts::OS)
}

/// Device name for a given platform name, first letter uppercased.
pub fn device_name_for_os(os: &str) -> String {
    let mut chars = os.chars();
    match chars.next() {
        Some(first) => format!(
            "{} ({}{})",
            DEFAULT_DEVICE_PRODUCT,
            first.to_uppercase(),
            chars.as_str()
        ),
        None => DEFAULT_DEVICE_PRODUCT.to_string(),
    }
}
