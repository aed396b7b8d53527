#![forbid(unsafe_code)]

//! Store configuration.
//!
//! [`StoreConfig`] selects the policies for the two refresh edge cases the
//! protocol leaves open, and whether free-text edits reach observers.
//!
//! Values resolve in three layers: defaults, then `FORMSTORE_*` environment
//! variables via [`StoreConfig::from_env`], then explicit `with_*` calls.

use std::env;
use std::str::FromStr;

/// Default error text written by [`crate::FieldStore::validate_required`].
pub const DEFAULT_REQUIRED_MESSAGE: &str = "This field is required";

/// What a refresh does when the triggering selection carried no id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum EmptyPayloadPolicy {
    /// Clear the selection, keep the old options, and re-enable the field.
    #[default]
    ReEnable,
    /// Clear the selection and leave the field disabled until a later
    /// refresh with a real payload completes.
    ///
    /// Opt-in exception to the rule that every refresh exit path re-enables
    /// the field: the empty-payload exit deliberately does not.
    KeepDisabled,
}

impl FromStr for EmptyPayloadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reenable" | "re-enable" => Ok(Self::ReEnable),
            "keep-disabled" | "keepdisabled" => Ok(Self::KeepDisabled),
            other => Err(format!("unknown empty-payload policy: {other}")),
        }
    }
}

/// What `refresh_field` does on a field without a refresh function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum MissingRefreshPolicy {
    /// Fail immediately with a configuration error.
    #[default]
    Fail,
    /// Resolve to [`crate::RefreshOutcome::NotConfigured`] without touching
    /// the field.
    Ignore,
}

impl FromStr for MissingRefreshPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "ignore" => Ok(Self::Ignore),
            other => Err(format!("unknown missing-refresh policy: {other}")),
        }
    }
}

/// Configuration for a [`crate::FieldStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StoreConfig {
    /// Empty-payload refresh policy. Default: [`EmptyPayloadPolicy::ReEnable`].
    pub empty_payload: EmptyPayloadPolicy,

    /// Missing refresh function policy. Default: [`MissingRefreshPolicy::Fail`].
    pub missing_refresh: MissingRefreshPolicy,

    /// Emit [`crate::StoreEvent::FreeTextChanged`] for free-text edits.
    /// Default: false.
    pub notify_free_text: bool,

    /// Error text set on required fields that have no value.
    pub required_message: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            empty_payload: EmptyPayloadPolicy::default(),
            missing_refresh: MissingRefreshPolicy::default(),
            notify_free_text: false,
            required_message: DEFAULT_REQUIRED_MESSAGE.to_string(),
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by `FORMSTORE_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().apply_vars(|key| env::var(key).ok())
    }

    fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("FORMSTORE_EMPTY_PAYLOAD") {
            match val.parse() {
                Ok(policy) => self.empty_payload = policy,
                Err(reason) => tracing::warn!(message = "config.ignored", %reason),
            }
        }
        if let Some(val) = lookup("FORMSTORE_MISSING_REFRESH") {
            match val.parse() {
                Ok(policy) => self.missing_refresh = policy,
                Err(reason) => tracing::warn!(message = "config.ignored", %reason),
            }
        }
        if let Some(val) = lookup("FORMSTORE_NOTIFY_FREE_TEXT") {
            self.notify_free_text = val == "1" || val.eq_ignore_ascii_case("true");
        }
        self
    }

    #[must_use]
    pub fn with_empty_payload(mut self, policy: EmptyPayloadPolicy) -> Self {
        self.empty_payload = policy;
        self
    }

    #[must_use]
    pub fn with_missing_refresh(mut self, policy: MissingRefreshPolicy) -> Self {
        self.missing_refresh = policy;
        self
    }

    #[must_use]
    pub fn with_free_text_notifications(mut self, enabled: bool) -> Self {
        self.notify_free_text = enabled;
        self
    }

    #[must_use]
    pub fn with_required_message(mut self, message: impl Into<String>) -> Self {
        self.required_message = message.into();
        self
    }
}
