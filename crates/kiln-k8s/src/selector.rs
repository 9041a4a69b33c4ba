// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Equality-based label selectors.
//!
//! Ownership between deployments, replica sets and pods is expressed only
//! through shared labels, so every cascade step re-derives a selector from
//! the parent's identity instead of following references.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::K8sError;
use crate::types::JOB_NAME_LABEL;

/// A conjunction of `key=value` constraints.
///
/// Renders in the wire form accepted by `ListParams::labels`, keys sorted.
/// The empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelSelector {
	terms: BTreeMap<String, String>,
}

impl LabelSelector {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add (or replace) a `key=value` constraint.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.terms.insert(key.into(), value.into());
		self
	}

	/// Selects the pods a job controller created for `job_name`.
	pub fn for_job(job_name: &str) -> Self {
		Self::new().with(JOB_NAME_LABEL, job_name)
	}

	pub fn is_empty(&self) -> bool {
		self.terms.is_empty()
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.terms.get(key).map(String::as_str)
	}

	/// Whether an object carrying `labels` satisfies every constraint.
	pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
		self.terms.iter().all(|(key, value)| {
			labels
				.and_then(|l| l.get(key))
				.is_some_and(|actual| actual == value)
		})
	}
}

impl fmt::Display for LabelSelector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, (key, value)) in self.terms.iter().enumerate() {
			if i > 0 {
				f.write_str(",")?;
			}
			write!(f, "{key}={value}")?;
		}
		Ok(())
	}
}

impl FromStr for LabelSelector {
	type Err = K8sError;

	/// Parses `a=x,b=y` (and the `a==x` spelling). Set-based expressions are rejected.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut selector = LabelSelector::new();
		for term in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
			let (key, value) = term
				.split_once("==")
				.or_else(|| term.split_once('='))
				.ok_or_else(|| K8sError::InvalidSelector {
					selector: s.to_string(),
					message: format!("term {term:?} is not key=value"),
				})?;
			let key = key.trim();
			if key.is_empty() || key.ends_with('!') {
				return Err(K8sError::InvalidSelector {
					selector: s.to_string(),
					message: format!("term {term:?} is not an equality constraint"),
				});
			}
			selector = selector.with(key, value.trim());
		}
		Ok(selector)
	}
}

impl<K, V> FromIterator<(K, V)> for LabelSelector
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		iter
			.into_iter()
			.fold(LabelSelector::new(), |sel, (k, v)| sel.with(k, v))
	}
}
