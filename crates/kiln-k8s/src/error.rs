// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

use crate::types::ResourceKind;

/// Result type alias for K8s operations.
pub type K8sResult<T> = Result<T, K8sError>;

/// Errors that can occur during K8s operations.
#[derive(Error, Debug)]
pub enum K8sError {
	#[error("K8s API error: {message}")]
	ApiError { message: String },

	/// The control plane answered 404 for a namespaced object.
	///
	/// Rendered the way the API server reports it, e.g. `Job.batch "job1" not found`.
	#[error("{kind} \"{name}\" not found")]
	NotFound { kind: ResourceKind, name: String },

	/// The control plane answered 409 to a create: the name is taken.
	#[error("{kind} \"{name}\" already exists")]
	AlreadyExists { kind: ResourceKind, name: String },

	#[error("Namespace not found: {name}")]
	NamespaceNotFound { name: String },

	#[error("Invalid label selector {selector:?}: {message}")]
	InvalidSelector { selector: String, message: String },
}

impl K8sError {
	pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
		K8sError::NotFound {
			kind,
			name: name.into(),
		}
	}

	pub fn already_exists(kind: ResourceKind, name: impl Into<String>) -> Self {
		K8sError::AlreadyExists {
			kind,
			name: name.into(),
		}
	}

	pub fn is_already_exists(&self) -> bool {
		matches!(self, K8sError::AlreadyExists { .. })
	}

	/// True for any "object does not exist" answer, namespaces included.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			K8sError::NotFound { .. } | K8sError::NamespaceNotFound { .. }
		)
	}
}

impl From<kube::Error> for K8sError {
	fn from(err: kube::Error) -> Self {
		K8sError::ApiError {
			message: err.to_string(),
		}
	}
}
