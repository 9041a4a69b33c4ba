// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::{
	api::{Api, DeleteParams, ListParams, PostParams},
	Client, Resource,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument};

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::types::{Deployment, Job, Namespace, Pod, ReplicaSet, ResourceKind};

/// Production K8s client implementation using the kube crate.
pub struct KubeClient {
	client: Client,
}

impl KubeClient {
	/// Create a new KubeClient that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. In-cluster service account (when running in K8s)
	/// 2. KUBECONFIG environment variable
	/// 3. ~/.kube/config
	pub async fn new() -> Result<Self, K8sError> {
		let client = Client::try_default().await?;
		debug!("K8s client initialized");
		Ok(Self { client })
	}

	fn api<K>(&self, namespace: &str) -> Api<K>
	where
		K: Resource<Scope = NamespaceResourceScope>,
		<K as Resource>::DynamicType: Default,
	{
		Api::namespaced(self.client.clone(), namespace)
	}
}

/// Maps a 404 to [`K8sError::NotFound`] for the object being addressed.
fn not_found_or(err: kube::Error, kind: ResourceKind, name: &str) -> K8sError {
	match err {
		kube::Error::Api(ref resp) if resp.code == 404 => K8sError::not_found(kind, name),
		e => e.into(),
	}
}

/// Maps a 409 on create to [`K8sError::AlreadyExists`].
fn already_exists_or(err: kube::Error, kind: ResourceKind, name: &str) -> K8sError {
	match err {
		kube::Error::Api(ref resp) if resp.code == 409 => K8sError::already_exists(kind, name),
		e => e.into(),
	}
}

async fn create_in<K>(api: Api<K>, kind: ResourceKind, obj: &K) -> Result<K, K8sError>
where
	K: Resource + Clone + DeserializeOwned + Serialize + Debug,
{
	let name = obj.meta().name.clone().unwrap_or_default();
	api
		.create(&PostParams::default(), obj)
		.await
		.map_err(|e| already_exists_or(e, kind, &name))
}

async fn get_in<K>(api: Api<K>, kind: ResourceKind, name: &str) -> Result<K, K8sError>
where
	K: Clone + DeserializeOwned + Debug,
{
	api.get(name).await.map_err(|e| not_found_or(e, kind, name))
}

async fn list_in<K>(api: Api<K>, label_selector: &str) -> Result<Vec<K>, K8sError>
where
	K: Clone + DeserializeOwned + Debug,
{
	let lp = ListParams::default().labels(label_selector);
	Ok(api.list(&lp).await?.items)
}

async fn delete_in<K>(
	api: Api<K>,
	kind: ResourceKind,
	name: &str,
	dp: &DeleteParams,
) -> Result<(), K8sError>
where
	K: Clone + DeserializeOwned + Debug,
{
	match api.delete(name, dp).await {
		Ok(_) => Ok(()),
		Err(e) => Err(not_found_or(e, kind, name)),
	}
}

#[async_trait]
impl K8sClient for KubeClient {
	async fn get_namespace(&self, name: &str) -> Result<Namespace, K8sError> {
		let namespaces: Api<Namespace> = Api::all(self.client.clone());
		match namespaces.get(name).await {
			Ok(ns) => Ok(ns),
			Err(kube::Error::Api(err)) if err.code == 404 => {
				Err(K8sError::NamespaceNotFound { name: name.into() })
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError> {
		create_in(self.api(namespace), ResourceKind::Pod, &pod).await
	}

	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError> {
		list_in(self.api(namespace), label_selector).await
	}

	#[instrument(skip(self))]
	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: u32,
	) -> Result<(), K8sError> {
		let dp = DeleteParams {
			grace_period_seconds: Some(grace_period_seconds),
			..Default::default()
		};
		delete_in(self.api::<Pod>(namespace), ResourceKind::Pod, name, &dp).await
	}

	async fn create_job(&self, namespace: &str, job: Job) -> Result<Job, K8sError> {
		create_in(self.api(namespace), ResourceKind::Job, &job).await
	}

	async fn get_job(&self, name: &str, namespace: &str) -> Result<Job, K8sError> {
		get_in(self.api(namespace), ResourceKind::Job, name).await
	}

	async fn list_jobs(&self, namespace: &str, label_selector: &str) -> Result<Vec<Job>, K8sError> {
		list_in(self.api(namespace), label_selector).await
	}

	#[instrument(skip(self))]
	async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		delete_in(
			self.api::<Job>(namespace),
			ResourceKind::Job,
			name,
			&DeleteParams::background(),
		)
		.await
	}

	async fn create_deployment(
		&self,
		namespace: &str,
		deployment: Deployment,
	) -> Result<Deployment, K8sError> {
		create_in(self.api(namespace), ResourceKind::Deployment, &deployment).await
	}

	async fn list_deployments(
		&self,
		namespace: &str,
		label_selector: &str,
	) -> Result<Vec<Deployment>, K8sError> {
		list_in(self.api(namespace), label_selector).await
	}

	#[instrument(skip(self))]
	async fn delete_deployment(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		delete_in(
			self.api::<Deployment>(namespace),
			ResourceKind::Deployment,
			name,
			&DeleteParams::background(),
		)
		.await
	}

	async fn create_replica_set(
		&self,
		namespace: &str,
		replica_set: ReplicaSet,
	) -> Result<ReplicaSet, K8sError> {
		create_in(self.api(namespace), ResourceKind::ReplicaSet, &replica_set).await
	}

	async fn list_replica_sets(
		&self,
		namespace: &str,
		label_selector: &str,
	) -> Result<Vec<ReplicaSet>, K8sError> {
		list_in(self.api(namespace), label_selector).await
	}

	#[instrument(skip(self))]
	async fn delete_replica_set(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		delete_in(
			self.api::<ReplicaSet>(namespace),
			ResourceKind::ReplicaSet,
			name,
			&DeleteParams::background(),
		)
		.await
	}
}
