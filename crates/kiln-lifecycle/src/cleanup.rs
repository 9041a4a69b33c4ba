// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cascading removal of workloads and everything they own.
//!
//! Owners go before children: deployment, then replica sets, then pods.
//! Deleting children first would let a live controller recreate them. Each
//! delete is awaited before the next one starts, and objects that are
//! already gone count as removed.

use std::sync::Arc;

use kiln_k8s::{K8sClient, K8sError, LabelSelector, ResourceKind};
use tracing::{debug, info, instrument, trace};

use crate::error::LifecycleError;
use crate::naming::{deployment_name, process_selector};

pub struct Cleaner {
	client: Arc<dyn K8sClient>,
	namespace: String,
	pod_grace_period_secs: u32,
}

impl Cleaner {
	pub fn new(client: Arc<dyn K8sClient>, namespace: impl Into<String>) -> Self {
		Self {
			client,
			namespace: namespace.into(),
			pod_grace_period_secs: 0,
		}
	}

	/// Grace period handed to every pod delete.
	pub fn with_pod_grace_period(mut self, secs: u32) -> Self {
		self.pod_grace_period_secs = secs;
		self
	}

	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	/// Delete every pod matching `selector`. Matching nothing is success.
	#[instrument(skip(self), fields(namespace = %self.namespace, selector = %selector))]
	pub async fn cleanup_pods(&self, selector: &LabelSelector) -> Result<(), LifecycleError> {
		if selector.is_empty() {
			return Err(LifecycleError::UnscopedCleanup {
				kind: ResourceKind::Pod,
			});
		}

		let selector = selector.to_string();
		let pods = self
			.client
			.list_pods(&self.namespace, &selector)
			.await
			.map_err(|source| LifecycleError::ListAborted {
				kind: ResourceKind::Pod,
				selector: selector.clone(),
				source,
			})?;

		for name in pods.into_iter().filter_map(|p| p.metadata.name) {
			debug!(pod = %name, "Deleting pod");
			let result = self
				.client
				.delete_pod(&name, &self.namespace, self.pod_grace_period_secs)
				.await;
			absorb_not_found(ResourceKind::Pod, &name, result)?;
		}
		Ok(())
	}

	/// Delete the job, then the pods it created.
	#[instrument(skip(self), fields(namespace = %self.namespace))]
	pub async fn cleanup_job(&self, name: &str) -> Result<(), LifecycleError> {
		info!(job = name, "Cleaning up job");

		debug!(job = name, "Deleting job");
		let result = self.client.delete_job(name, &self.namespace).await;
		absorb_not_found(ResourceKind::Job, name, result)?;

		self.cleanup_pods(&LabelSelector::for_job(name)).await?;

		info!(job = name, "Job cleaned up");
		Ok(())
	}

	/// Delete every replica set matching `selector`, then the matching pods.
	#[instrument(skip(self), fields(namespace = %self.namespace, selector = %selector))]
	pub async fn cleanup_replicas(&self, selector: &LabelSelector) -> Result<(), LifecycleError> {
		if selector.is_empty() {
			return Err(LifecycleError::UnscopedCleanup {
				kind: ResourceKind::ReplicaSet,
			});
		}

		let replica_sets = self
			.client
			.list_replica_sets(&self.namespace, &selector.to_string())
			.await
			.map_err(|source| LifecycleError::ListAborted {
				kind: ResourceKind::ReplicaSet,
				selector: selector.to_string(),
				source,
			})?;

		for name in replica_sets.into_iter().filter_map(|rs| rs.metadata.name) {
			debug!(replica_set = %name, "Deleting replica set");
			let result = self.client.delete_replica_set(&name, &self.namespace).await;
			absorb_not_found(ResourceKind::ReplicaSet, &name, result)?;
		}

		self.cleanup_pods(selector).await
	}

	/// Delete the deployment for `app`'s `process`, then its replica sets and
	/// pods.
	#[instrument(skip(self), fields(namespace = %self.namespace))]
	pub async fn cleanup_deployment(&self, app: &str, process: &str) -> Result<(), LifecycleError> {
		let name = deployment_name(app, process);
		info!(deployment = %name, "Cleaning up deployment");

		debug!(deployment = %name, "Deleting deployment");
		let result = self.client.delete_deployment(&name, &self.namespace).await;
		absorb_not_found(ResourceKind::Deployment, &name, result)?;

		self.cleanup_replicas(&process_selector(app, process)).await?;

		info!(deployment = %name, "Deployment cleaned up");
		Ok(())
	}
}

/// Treat an already-deleted object as deleted; anything else stops the
/// cascade and names the object that could not be removed.
fn absorb_not_found(
	kind: ResourceKind,
	name: &str,
	result: Result<(), K8sError>,
) -> Result<(), LifecycleError> {
	match result {
		Ok(()) => Ok(()),
		Err(e) if e.is_not_found() => {
			trace!(%kind, name, "Already gone");
			Ok(())
		}
		Err(source) => Err(LifecycleError::CascadeAborted {
			kind,
			name: name.to_string(),
			source,
		}),
	}
}
