// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::K8sError;
use crate::types::{Deployment, Job, Namespace, Pod, ReplicaSet};

/// Trait for K8s client operations.
///
/// This abstraction allows for easy mocking in tests while providing
/// a clean interface for the K8s operations needed to run and tear down
/// transient build and deploy workloads.
///
/// Label selectors are passed through verbatim (`key=value,key=value`).
/// An empty selector lists everything in the namespace. Every `get_*` and
/// `delete_*` call reports a missing object as [`K8sError::NotFound`], and
/// every `create_*` call reports a taken name as [`K8sError::AlreadyExists`].
#[async_trait]
pub trait K8sClient: Send + Sync {
	/// Get a namespace by name.
	async fn get_namespace(&self, name: &str) -> Result<Namespace, K8sError>;

	/// Create a new pod in the specified namespace.
	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError>;

	/// List pods in a namespace matching the given label selector.
	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError>;

	/// Delete a pod by name from the specified namespace.
	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: u32,
	) -> Result<(), K8sError>;

	/// Submit a run-to-completion job.
	async fn create_job(&self, namespace: &str, job: Job) -> Result<Job, K8sError>;

	/// Get a job by name, including its status counters.
	async fn get_job(&self, name: &str, namespace: &str) -> Result<Job, K8sError>;

	/// List jobs in a namespace matching the given label selector.
	async fn list_jobs(&self, namespace: &str, label_selector: &str) -> Result<Vec<Job>, K8sError>;

	/// Delete a job. Dependents are left to the caller; see the lifecycle cleaner.
	async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), K8sError>;

	/// Create a deployment.
	async fn create_deployment(
		&self,
		namespace: &str,
		deployment: Deployment,
	) -> Result<Deployment, K8sError>;

	/// List deployments in a namespace matching the given label selector.
	async fn list_deployments(
		&self,
		namespace: &str,
		label_selector: &str,
	) -> Result<Vec<Deployment>, K8sError>;

	/// Delete a deployment by name.
	async fn delete_deployment(&self, name: &str, namespace: &str) -> Result<(), K8sError>;

	/// Create a replica set.
	async fn create_replica_set(
		&self,
		namespace: &str,
		replica_set: ReplicaSet,
	) -> Result<ReplicaSet, K8sError>;

	/// List replica sets in a namespace matching the given label selector.
	async fn list_replica_sets(
		&self,
		namespace: &str,
		label_selector: &str,
	) -> Result<Vec<ReplicaSet>, K8sError>;

	/// Delete a replica set by name.
	async fn delete_replica_set(&self, name: &str, namespace: &str) -> Result<(), K8sError>;
}
