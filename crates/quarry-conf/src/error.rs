//! Settings errors

use thiserror::Error;

/// Errors raised while loading or validating [`SqlSettings`](crate::SqlSettings).
#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("Failed to read settings file: {0}")]
	Io(#[from] std::io::Error),

	#[error("Failed to parse settings: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("Invalid settings: {0}")]
	Invalid(String),

	/// An environment override could not be applied
	#[error("Invalid value for {key}: {reason}")]
	Env { key: String, reason: String },
}

pub type SettingsResult<T> = Result<T, SettingsError>;
