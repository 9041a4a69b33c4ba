// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Lifecycle and configuration error types.

use std::path::PathBuf;
use std::time::Duration;

use kiln_k8s::{K8sError, ResourceKind};

/// Errors returned by waits and cleanups.
///
/// Nothing is logged and dropped: every failure the cluster reports reaches
/// the caller through one of these variants.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
	/// The deadline passed before the condition was observed.
	#[error("timeout after {elapsed:?}")]
	Timeout { elapsed: Duration },

	/// The job controller gave up on the job.
	#[error("Job failed: {name} - {reason}")]
	JobFailed { name: String, reason: String },

	/// A delete in a cleanup cascade failed; later steps were not attempted.
	#[error("Cleanup aborted deleting {kind} {name:?}: {source}")]
	CascadeAborted {
		kind: ResourceKind,
		name: String,
		#[source]
		source: K8sError,
	},

	/// Listing the children of a cleanup cascade failed; nothing matching
	/// the selector was deleted.
	#[error("Cleanup aborted listing {kind} matching {selector:?}: {source}")]
	ListAborted {
		kind: ResourceKind,
		selector: String,
		#[source]
		source: K8sError,
	},

	/// A cleanup was asked to run with a selector that matches everything.
	#[error("Refusing to clean up {kind} with an empty label selector")]
	UnscopedCleanup { kind: ResourceKind },

	/// The workload handed in cannot be submitted as-is.
	#[error("Invalid workload: {0}")]
	InvalidWorkload(String),

	/// Namespace not found
	#[error("Namespace not found: {name}")]
	NamespaceNotFound { name: String },

	/// A run failed and the teardown that followed failed too.
	#[error("{primary}; cleanup also failed: {cleanup}")]
	CleanupAfterFailure {
		primary: Box<LifecycleError>,
		cleanup: Box<LifecycleError>,
	},

	/// Kubernetes error
	#[error(transparent)]
	K8s(#[from] K8sError),
}

impl LifecycleError {
	/// Whether the operation gave up waiting, as opposed to observing a failure.
	pub fn is_timeout(&self) -> bool {
		match self {
			LifecycleError::Timeout { .. } => true,
			LifecycleError::CleanupAfterFailure { primary, .. } => primary.is_timeout(),
			_ => false,
		}
	}

	/// Whether the cluster reported the addressed object as missing.
	pub fn is_not_found(&self) -> bool {
		match self {
			LifecycleError::K8s(e) => e.is_not_found(),
			LifecycleError::NamespaceNotFound { .. } => true,
			LifecycleError::CleanupAfterFailure { primary, .. } => primary.is_not_found(),
			_ => false,
		}
	}
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },

	#[error("Failed to parse TOML config at {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Validation error: {0}")]
	Validation(String),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn timeout_message_carries_elapsed() {
		let err = LifecycleError::Timeout {
			elapsed: Duration::from_millis(250),
		};
		assert!(err.to_string().starts_with("timeout after "));
		assert!(err.is_timeout());
		assert!(!err.is_not_found());
	}

	#[test]
	fn k8s_not_found_is_passed_through_verbatim() {
		let err: LifecycleError = K8sError::not_found(ResourceKind::Job, "job1").into();
		assert_eq!(err.to_string(), r#"Job.batch "job1" not found"#);
		assert!(err.is_not_found());
	}

	#[test]
	fn cascade_abort_names_what_was_left_behind() {
		let err = LifecycleError::CascadeAborted {
			kind: ResourceKind::ReplicaSet,
			name: "myapp-p1-xxx".to_string(),
			source: K8sError::ApiError {
				message: "etcd unavailable".to_string(),
			},
		};
		let msg = err.to_string();
		assert!(msg.contains("ReplicaSet.apps"));
		assert!(msg.contains("myapp-p1-xxx"));
		assert!(msg.contains("etcd unavailable"));
	}

	#[test]
	fn list_abort_names_the_selector() {
		let err = LifecycleError::ListAborted {
			kind: ResourceKind::Pod,
			selector: "job-name=job1".to_string(),
			source: K8sError::ApiError {
				message: "forbidden".to_string(),
			},
		};
		assert_eq!(
			err.to_string(),
			r#"Cleanup aborted listing Pod matching "job-name=job1": K8s API error: forbidden"#
		);
		assert!(std::error::Error::source(&err).is_some());
	}

	#[test]
	fn cleanup_after_failure_keeps_primary_classification() {
		let err = LifecycleError::CleanupAfterFailure {
			primary: Box::new(LifecycleError::Timeout {
				elapsed: Duration::from_secs(1),
			}),
			cleanup: Box::new(LifecycleError::UnscopedCleanup {
				kind: ResourceKind::Pod,
			}),
		};
		assert!(err.is_timeout());
		assert!(err.to_string().contains("cleanup also failed"));
	}
}
