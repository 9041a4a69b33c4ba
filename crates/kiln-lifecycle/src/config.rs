// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Lifecycle configuration.
//!
//! Layers merge with precedence defaults < TOML file < environment. Each
//! field resolves independently, so a file can set the namespace while the
//! environment only overrides a timeout.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::ConfigError;

pub const DEFAULT_NAMESPACE: &str = "kiln";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_POD_GRACE_PERIOD_SECS: u32 = 0;

/// Lifecycle configuration layer (for merging).
///
/// All fields are optional to support layered configuration from
/// multiple sources (defaults, files, environment).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfigLayer {
	pub namespace: Option<String>,
	pub poll_interval_ms: Option<u64>,
	pub ready_timeout_secs: Option<u64>,
	pub completion_timeout_secs: Option<u64>,
	pub pod_grace_period_secs: Option<u32>,
}

impl LifecycleConfigLayer {
	/// Merges another layer on top of this one.
	/// Values from `other` take precedence when present.
	pub fn merge(&mut self, other: LifecycleConfigLayer) {
		if other.namespace.is_some() {
			self.namespace = other.namespace;
		}
		if other.poll_interval_ms.is_some() {
			self.poll_interval_ms = other.poll_interval_ms;
		}
		if other.ready_timeout_secs.is_some() {
			self.ready_timeout_secs = other.ready_timeout_secs;
		}
		if other.completion_timeout_secs.is_some() {
			self.completion_timeout_secs = other.completion_timeout_secs;
		}
		if other.pod_grace_period_secs.is_some() {
			self.pod_grace_period_secs = other.pod_grace_period_secs;
		}
	}

	/// Resolves this layer into a runtime configuration.
	pub fn resolve(self) -> Result<LifecycleConfig, ConfigError> {
		let config = LifecycleConfig {
			namespace: self
				.namespace
				.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
			poll_interval_ms: self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
			ready_timeout_secs: self
				.ready_timeout_secs
				.unwrap_or(DEFAULT_READY_TIMEOUT_SECS),
			completion_timeout_secs: self
				.completion_timeout_secs
				.unwrap_or(DEFAULT_COMPLETION_TIMEOUT_SECS),
			pod_grace_period_secs: self
				.pod_grace_period_secs
				.unwrap_or(DEFAULT_POD_GRACE_PERIOD_SECS),
		};
		config.validate()?;
		Ok(config)
	}

	/// Reads `KILN_LIFECYCLE_*` values through `lookup`.
	///
	/// Empty values are treated as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| lookup(name).filter(|s| !s.is_empty());
		Ok(Self {
			namespace: var("KILN_LIFECYCLE_NAMESPACE"),
			poll_interval_ms: parse_var(&var, "KILN_LIFECYCLE_POLL_INTERVAL_MS")?,
			ready_timeout_secs: parse_var(&var, "KILN_LIFECYCLE_READY_TIMEOUT_SECS")?,
			completion_timeout_secs: parse_var(&var, "KILN_LIFECYCLE_COMPLETION_TIMEOUT_SECS")?,
			pod_grace_period_secs: parse_var(&var, "KILN_LIFECYCLE_POD_GRACE_PERIOD_SECS")?,
		})
	}

	pub fn from_env() -> Result<Self, ConfigError> {
		debug!("loading environment variables");
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads a layer from a TOML file. A missing file yields an empty layer.
	pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
		if !path.exists() {
			debug!(path = %path.display(), "config file not found, skipping");
			return Ok(Self::default());
		}

		debug!(path = %path.display(), "loading config file");
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
			path: path.to_path_buf(),
			source: e,
		})?;

		let layer: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: path.to_path_buf(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

fn parse_var<T, F>(var: &F, name: &str) -> Result<Option<T>, ConfigError>
where
	T: std::str::FromStr,
	F: Fn(&str) -> Option<String>,
{
	match var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid unsigned integer '{v}'"),
		}),
		None => Ok(None),
	}
}

/// Lifecycle configuration (runtime, resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
	pub namespace: String,
	pub poll_interval_ms: u64,
	pub ready_timeout_secs: u64,
	pub completion_timeout_secs: u64,
	pub pod_grace_period_secs: u32,
}

impl Default for LifecycleConfig {
	fn default() -> Self {
		Self {
			namespace: DEFAULT_NAMESPACE.to_string(),
			poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
			ready_timeout_secs: DEFAULT_READY_TIMEOUT_SECS,
			completion_timeout_secs: DEFAULT_COMPLETION_TIMEOUT_SECS,
			pod_grace_period_secs: DEFAULT_POD_GRACE_PERIOD_SECS,
		}
	}
}

impl LifecycleConfig {
	/// Load defaults, then the TOML file at `path` if given, then the
	/// environment.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		let mut layer = LifecycleConfigLayer::default();
		if let Some(path) = path {
			layer.merge(LifecycleConfigLayer::from_toml_file(path)?);
		}
		layer.merge(LifecycleConfigLayer::from_env()?);
		layer.resolve()
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.namespace.trim().is_empty() {
			return Err(ConfigError::Validation(
				"namespace must not be empty".to_string(),
			));
		}
		if !(1..1000).contains(&self.poll_interval_ms) {
			return Err(ConfigError::Validation(format!(
				"poll_interval_ms must be between 1 and 999, got {}",
				self.poll_interval_ms
			)));
		}
		if self.ready_timeout_secs == 0 {
			return Err(ConfigError::Validation(
				"ready_timeout_secs must be greater than zero".to_string(),
			));
		}
		if self.completion_timeout_secs == 0 {
			return Err(ConfigError::Validation(
				"completion_timeout_secs must be greater than zero".to_string(),
			));
		}
		Ok(())
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn ready_timeout(&self) -> Duration {
		Duration::from_secs(self.ready_timeout_secs)
	}

	pub fn completion_timeout(&self) -> Duration {
		Duration::from_secs(self.completion_timeout_secs)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |name| vars.get(name).cloned()
	}

	mod lifecycle_config_layer {
		use super::*;

		#[test]
		fn merge_preserves_base_when_overlay_is_none() {
			let mut base = LifecycleConfigLayer {
				namespace: Some("builds".to_string()),
				ready_timeout_secs: Some(30),
				..Default::default()
			};
			base.merge(LifecycleConfigLayer::default());
			assert_eq!(base.namespace, Some("builds".to_string()));
			assert_eq!(base.ready_timeout_secs, Some(30));
		}

		#[test]
		fn merge_individual_fields() {
			let mut base = LifecycleConfigLayer {
				namespace: Some("base-ns".to_string()),
				poll_interval_ms: Some(250),
				..Default::default()
			};
			let overlay = LifecycleConfigLayer {
				namespace: Some("overlay-ns".to_string()),
				completion_timeout_secs: Some(60),
				..Default::default()
			};

			base.merge(overlay);
			assert_eq!(base.namespace, Some("overlay-ns".to_string()));
			assert_eq!(base.poll_interval_ms, Some(250));
			assert_eq!(base.completion_timeout_secs, Some(60));
		}
	}

	mod resolve {
		use super::*;

		#[test]
		fn resolve_uses_defaults() {
			let config = LifecycleConfigLayer::default().resolve().unwrap();
			assert_eq!(config, LifecycleConfig::default());
			assert_eq!(config.namespace, "kiln");
			assert_eq!(config.poll_interval(), Duration::from_millis(100));
			assert_eq!(config.ready_timeout(), Duration::from_secs(120));
			assert_eq!(config.completion_timeout(), Duration::from_secs(600));
			assert_eq!(config.pod_grace_period_secs, 0);
		}

		#[test]
		fn resolve_rejects_empty_namespace() {
			let layer = LifecycleConfigLayer {
				namespace: Some("  ".to_string()),
				..Default::default()
			};
			assert!(matches!(layer.resolve(), Err(ConfigError::Validation(_))));
		}

		#[test]
		fn resolve_requires_sub_second_interval() {
			for ms in [0, 1000, 5000] {
				let layer = LifecycleConfigLayer {
					poll_interval_ms: Some(ms),
					..Default::default()
				};
				assert!(layer.resolve().is_err(), "{ms} ms should be rejected");
			}
			let layer = LifecycleConfigLayer {
				poll_interval_ms: Some(999),
				..Default::default()
			};
			assert_eq!(layer.resolve().unwrap().poll_interval_ms, 999);
		}

		#[test]
		fn resolve_rejects_zero_timeouts() {
			let layer = LifecycleConfigLayer {
				ready_timeout_secs: Some(0),
				..Default::default()
			};
			assert!(layer.resolve().is_err());
			let layer = LifecycleConfigLayer {
				completion_timeout_secs: Some(0),
				..Default::default()
			};
			assert!(layer.resolve().is_err());
		}
	}

	mod sources {
		use super::*;

		#[test]
		fn env_values_are_parsed() {
			let layer = LifecycleConfigLayer::from_lookup(lookup(&[
				("KILN_LIFECYCLE_NAMESPACE", "builds"),
				("KILN_LIFECYCLE_POLL_INTERVAL_MS", "250"),
				("KILN_LIFECYCLE_POD_GRACE_PERIOD_SECS", "5"),
				("KILN_LIFECYCLE_READY_TIMEOUT_SECS", ""),
			]))
			.unwrap();
			assert_eq!(layer.namespace.as_deref(), Some("builds"));
			assert_eq!(layer.poll_interval_ms, Some(250));
			assert_eq!(layer.pod_grace_period_secs, Some(5));
			assert_eq!(layer.ready_timeout_secs, None);
		}

		#[test]
		fn env_rejects_non_numeric_values() {
			let err = LifecycleConfigLayer::from_lookup(lookup(&[(
				"KILN_LIFECYCLE_COMPLETION_TIMEOUT_SECS",
				"ten",
			)]))
			.unwrap_err();
			match err {
				ConfigError::InvalidValue { key, .. } => {
					assert_eq!(key, "KILN_LIFECYCLE_COMPLETION_TIMEOUT_SECS")
				}
				other => panic!("expected InvalidValue, got {other:?}"),
			}
		}

		#[test]
		fn missing_toml_file_is_skipped() {
			let dir = tempfile::tempdir().unwrap();
			let layer =
				LifecycleConfigLayer::from_toml_file(&dir.path().join("lifecycle.toml")).unwrap();
			assert_eq!(layer, LifecycleConfigLayer::default());
		}

		#[test]
		fn toml_file_is_loaded() {
			let mut file = tempfile::NamedTempFile::new().unwrap();
			writeln!(file, "namespace = \"builds\"\nready_timeout_secs = 30").unwrap();

			let layer = LifecycleConfigLayer::from_toml_file(file.path()).unwrap();
			assert_eq!(layer.namespace.as_deref(), Some("builds"));
			assert_eq!(layer.ready_timeout_secs, Some(30));
			assert_eq!(layer.poll_interval_ms, None);
		}

		#[test]
		fn malformed_toml_is_a_parse_error() {
			let mut file = tempfile::NamedTempFile::new().unwrap();
			writeln!(file, "namespace = ").unwrap();

			let err = LifecycleConfigLayer::from_toml_file(file.path()).unwrap_err();
			assert!(matches!(err, ConfigError::TomlParse { .. }));
		}

		#[test]
		fn environment_overrides_file() {
			let mut file = tempfile::NamedTempFile::new().unwrap();
			writeln!(file, "namespace = \"from-file\"\npoll_interval_ms = 200").unwrap();

			let mut layer = LifecycleConfigLayer::from_toml_file(file.path()).unwrap();
			layer.merge(
				LifecycleConfigLayer::from_lookup(lookup(&[(
					"KILN_LIFECYCLE_NAMESPACE",
					"from-env",
				)]))
				.unwrap(),
			);
			let config = layer.resolve().unwrap();
			assert_eq!(config.namespace, "from-env");
			assert_eq!(config.poll_interval_ms, 200);
		}
	}
}
