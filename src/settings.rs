//! Loading and validation of settings.
//!
//! Values defined in the configuration file can be overridden by environment variables with the
//! `SECAGG_` prefix, where nested keys are separated by `__`. An example of a configuration file
//! can be found in the `configs/` directory located in the repository root.

use std::{fmt, path::Path};

use config::{Config, ConfigError, Environment};
use serde::{
    de::{self, Deserializer, Visitor},
    Deserialize,
};
use thiserror::Error;
use tracing_subscriber::filter::EnvFilter;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    common::{
        SessionConfig,
        DEFAULT_CLIPPING_RANGE,
        DEFAULT_MOD_RANGE,
        DEFAULT_TARGET_RANGE,
        MAX_MOD_RANGE,
    },
    ParticipantIndex,
};

#[derive(Error, Debug)]
/// An error related to loading and validation of settings.
pub enum SettingsError {
    #[error("configuration loading failed: {0}")]
    Loading(#[from] ConfigError),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

#[derive(Debug, Validate, Deserialize)]
/// The combined settings.
///
/// Each section in the configuration file corresponds to the identically named settings field.
pub struct Settings {
    #[validate]
    pub session: SessionSettings,
    #[serde(default)]
    #[validate]
    pub mask: MaskSettings,
    #[serde(default)]
    pub log: LoggingSettings,
}

impl Settings {
    /// Loads and validates the settings via a configuration file.
    ///
    /// # Errors
    /// Fails when the loading of the configuration file or its validation failed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let settings: Settings = Self::load(path)?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Config::new();
        config.merge(config::File::from(path.as_ref()))?;
        config.merge(Environment::with_prefix("secagg").separator("__"))?;
        config.try_into()
    }

    /// Gets the parameters of the round of the configured client.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            session_id: self.session.id.clone(),
            round_id: self.session.round,
            threshold: self.session.threshold,
            total_clients: self.session.total_clients,
            client_index: self.session.client_index,
            clipping_range: self.mask.clipping_range,
            target_range: self.mask.target_range,
            mod_range: self.mask.mod_range,
        }
    }
}

#[derive(Debug, Validate, Deserialize, Clone)]
#[validate(schema(function = "validate_session"))]
/// The session settings.
pub struct SessionSettings {
    /// The identifier of the session. It binds the pairwise masks to the session.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [session]
    /// id = "local"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SECAGG_SESSION__ID=local
    /// ```
    pub id: String,

    /// The identifier of the round within the session.
    #[serde(default)]
    pub round: u64,

    /// The minimal number of shares required to recover the seed of a dropped participant.
    ///
    /// The value must be within `[1, total_clients]`.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [session]
    /// threshold = 3
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SECAGG_SESSION__THRESHOLD=3
    /// ```
    #[validate(range(min = 1))]
    pub threshold: u32,

    /// The number of participants of the round.
    #[validate(range(min = 1))]
    pub total_clients: u32,

    /// The 1-based index of the client. The value must be within `[1, total_clients]`.
    pub client_index: ParticipantIndex,
}

impl SessionSettings {
    /// Checks the consistency of the participant counts and the client index.
    fn validate_session(&self) -> Result<(), ValidationError> {
        if self.threshold <= self.total_clients
            && 1 <= self.client_index
            && self.client_index <= self.total_clients
        {
            Ok(())
        } else {
            Err(ValidationError::new("invalid participant counts"))
        }
    }
}

// the validate attribute only accepts free functions
fn validate_session(s: &SessionSettings) -> Result<(), ValidationError> {
    s.validate_session()
}

#[derive(Debug, Validate, Deserialize, Clone, Copy, PartialEq)]
#[validate(schema(function = "validate_mask"))]
/// The masking settings.
pub struct MaskSettings {
    /// Float updates are clipped to `[-clipping_range, clipping_range]` before quantization.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [mask]
    /// clipping_range = 3.0
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SECAGG_MASK__CLIPPING_RANGE=3.0
    /// ```
    #[serde(default = "default_clipping_range")]
    pub clipping_range: f64,

    /// Float updates are quantized to integers in `[0, target_range]`.
    #[serde(default = "default_target_range")]
    pub target_range: u32,

    /// The order of the group in which updates are masked. The value must be within
    /// `[1, 2^32]`.
    #[serde(default = "default_mod_range")]
    pub mod_range: u64,
}

impl Default for MaskSettings {
    fn default() -> Self {
        Self {
            clipping_range: DEFAULT_CLIPPING_RANGE,
            target_range: DEFAULT_TARGET_RANGE,
            mod_range: DEFAULT_MOD_RANGE,
        }
    }
}

impl MaskSettings {
    /// Checks the validity of the ranges.
    fn validate_mask(&self) -> Result<(), ValidationError> {
        if self.clipping_range.is_finite()
            && 0. <= self.clipping_range
            && 0 < self.mod_range
            && self.mod_range <= MAX_MOD_RANGE
        {
            Ok(())
        } else {
            Err(ValidationError::new("invalid mask range(s)"))
        }
    }
}

fn validate_mask(s: &MaskSettings) -> Result<(), ValidationError> {
    s.validate_mask()
}

fn default_clipping_range() -> f64 {
    DEFAULT_CLIPPING_RANGE
}

fn default_target_range() -> u32 {
    DEFAULT_TARGET_RANGE
}

fn default_mod_range() -> u64 {
    DEFAULT_MOD_RANGE
}

#[derive(Debug, Deserialize)]
/// Logging settings.
pub struct LoggingSettings {
    /// A comma-separated list of logging directives. More information about logging directives
    /// can be found [here].
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [log]
    /// filter = "info"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// SECAGG_LOG__FILTER=info
    /// ```
    ///
    /// [here]: https://docs.rs/tracing-subscriber/0.2.15/tracing_subscriber/filter/struct.EnvFilter.html#directives
    #[serde(deserialize_with = "deserialize_env_filter")]
    pub filter: EnvFilter,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: EnvFilter::new("info"),
        }
    }
}

fn deserialize_env_filter<'de, D>(deserializer: D) -> Result<EnvFilter, D::Error>
where
    D: Deserializer<'de>,
{
    struct EnvFilterVisitor;

    impl<'de> Visitor<'de> for EnvFilterVisitor {
        type Value = EnvFilter;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a valid tracing filter directive: https://docs.rs/tracing-subscriber/0.2.15/tracing_subscriber/filter/struct.EnvFilter.html#directives")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            EnvFilter::try_new(value)
                .map_err(|_| de::Error::invalid_value(serde::de::Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_str(EnvFilterVisitor)
}
