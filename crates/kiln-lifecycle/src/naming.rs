// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource names and labels for app workloads.

use std::collections::BTreeMap;

use kiln_k8s::LabelSelector;

pub const APP_NAME_LABEL: &str = "kiln.app.name";
pub const APP_PROCESS_LABEL: &str = "kiln.app.process";

/// Name of the deployment running `process` for `app`.
pub fn deployment_name(app: &str, process: &str) -> String {
	format!("{app}-{process}")
}

/// Name of the job that builds and deploys `app`.
pub fn deploy_job_name(app: &str) -> String {
	format!("{app}-deploy")
}

/// Labels shared by a process's deployment, replica sets and pods.
pub fn process_labels(app: &str, process: &str) -> BTreeMap<String, String> {
	BTreeMap::from([
		(APP_NAME_LABEL.to_string(), app.to_string()),
		(APP_PROCESS_LABEL.to_string(), process.to_string()),
	])
}

/// Selector for everything that belongs to `app`'s `process`.
pub fn process_selector(app: &str, process: &str) -> LabelSelector {
	process_labels(app, process).into_iter().collect()
}


#[cfg(test)]
mod proptests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn process_selector_matches_process_labels(
			app in "[a-z][a-z0-9-]{0,20}",
			process in "[a-z][a-z0-9-]{0,10}"
		) {
			let labels = process_labels(&app, &process);
			prop_assert!(process_selector(&app, &process).matches(Some(&labels)));
		}

		#[test]
		fn process_selector_excludes_other_processes(
			app in "[a-z][a-z0-9-]{0,20}",
			process in "[a-z][a-z0-9-]{0,10}",
			other in "[a-z][a-z0-9-]{0,10}"
		) {
			prop_assume!(process != other);
			let labels = process_labels(&app, &other);
			prop_assert!(!process_selector(&app, &process).matches(Some(&labels)));
		}

		#[test]
		fn deployment_name_is_prefixed_by_app(
			app in "[a-z][a-z0-9-]{0,20}",
			process in "[a-z][a-z0-9-]{0,10}"
		) {
			let name = deployment_name(&app, &process);
			let prefix = format!("{app}-");
			prop_assert!(name.starts_with(&prefix));
			prop_assert!(name.ends_with(&process));
		}
	}
}
