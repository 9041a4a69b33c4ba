// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workload identity types.

use std::fmt;

/// Identifies a job-like resource: its name and the namespace it runs in.
///
/// The namespace is always supplied by configuration; see
/// [`crate::Lifecycle::workload`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkloadRef {
	pub namespace: String,
	pub name: String,
}

impl WorkloadRef {
	pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			namespace: namespace.into(),
			name: name.into(),
		}
	}
}

impl fmt::Display for WorkloadRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.namespace, self.name)
	}
}
