// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! In-memory cluster for tests.
//!
//! Objects are stored per kind in creation order, so list calls return them
//! the way an API server would for a fresh namespace. Label selectors are
//! evaluated with [`LabelSelector`]. Optionally a tiny job controller turns
//! every created job into a running `<job>-pod` and marks the job succeeded.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use kube::Resource;

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::selector::LabelSelector;
use crate::types::{
	ContainerState, ContainerStateRunning, ContainerStatus, Deployment, Job, JobStatus, Namespace,
	ObjectMeta, OwnerReference, Pod, PodStatus, ReplicaSet, ResourceKind, Time, JOB_NAME_LABEL,
};

#[derive(Default)]
struct State {
	namespaces: HashSet<String>,
	pods: Vec<Pod>,
	jobs: Vec<Job>,
	deployments: Vec<Deployment>,
	replica_sets: Vec<ReplicaSet>,
	delete_failures: HashMap<(ResourceKind, String), String>,
	list_failures: HashMap<ResourceKind, String>,
	get_failures: HashMap<ResourceKind, String>,
	calls: HashMap<&'static str, usize>,
	deleted: Vec<(ResourceKind, String)>,
}

impl State {
	fn record(&mut self, op: &'static str) {
		*self.calls.entry(op).or_default() += 1;
	}
}

/// A fake K8s client backed by in-memory object stores.
///
/// Cheap to clone; clones share the same cluster state, which lets a test
/// hand one clone to the code under test and keep another to inspect or
/// mutate the cluster concurrently.
#[derive(Clone, Default)]
pub struct FakeK8sClient {
	state: Arc<Mutex<State>>,
	job_controller: bool,
}

impl FakeK8sClient {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a namespace so `get_namespace` finds it.
	pub fn with_namespace(self, name: &str) -> Self {
		self.state.lock().unwrap().namespaces.insert(name.to_string());
		self
	}

	/// Simulate the job controller: each created job immediately gets a pod
	/// named `<job>-pod` whose template containers are all running, and the
	/// job reports one success.
	pub fn with_job_controller(mut self) -> Self {
		self.job_controller = true;
		self
	}

	/// Make deleting `kind`/`name` fail with an API error.
	pub fn fail_delete(&self, kind: ResourceKind, name: &str, message: &str) {
		self
			.state
			.lock()
			.unwrap()
			.delete_failures
			.insert((kind, name.to_string()), message.to_string());
	}

	/// Make every list of `kind` fail with an API error.
	pub fn fail_list(&self, kind: ResourceKind, message: &str) {
		self
			.state
			.lock()
			.unwrap()
			.list_failures
			.insert(kind, message.to_string());
	}

	/// Make every get of `kind` fail with an API error.
	///
	/// Only jobs are read by name, so only `get_job` consults this.
	pub fn fail_get(&self, kind: ResourceKind, message: &str) {
		self
			.state
			.lock()
			.unwrap()
			.get_failures
			.insert(kind, message.to_string());
	}

	/// Number of times the named trait method was called, e.g. `"get_job"`.
	pub fn calls(&self, op: &str) -> usize {
		self.state.lock().unwrap().calls.get(op).copied().unwrap_or(0)
	}

	/// Objects successfully deleted so far, in order.
	pub fn deleted(&self) -> Vec<(ResourceKind, String)> {
		self.state.lock().unwrap().deleted.clone()
	}

	/// Overwrite the status of an existing pod.
	pub fn set_pod_status(&self, namespace: &str, name: &str, status: PodStatus) -> bool {
		let mut state = self.state.lock().unwrap();
		match find_mut(&mut state.pods, namespace, name) {
			Some(pod) => {
				pod.status = Some(status);
				true
			}
			None => false,
		}
	}

	/// Overwrite the status of an existing job.
	pub fn set_job_status(&self, namespace: &str, name: &str, status: JobStatus) -> bool {
		let mut state = self.state.lock().unwrap();
		match find_mut(&mut state.jobs, namespace, name) {
			Some(job) => {
				job.status = Some(status);
				true
			}
			None => false,
		}
	}

	fn check_list(&self, state: &State, kind: ResourceKind) -> Result<(), K8sError> {
		match state.list_failures.get(&kind) {
			Some(message) => Err(K8sError::ApiError {
				message: message.clone(),
			}),
			None => Ok(()),
		}
	}

	fn check_get(&self, state: &State, kind: ResourceKind) -> Result<(), K8sError> {
		match state.get_failures.get(&kind) {
			Some(message) => Err(K8sError::ApiError {
				message: message.clone(),
			}),
			None => Ok(()),
		}
	}

	fn delete_from<K: Resource>(
		state: &mut State,
		kind: ResourceKind,
		namespace: &str,
		name: &str,
		store: fn(&mut State) -> &mut Vec<K>,
	) -> Result<(), K8sError> {
		if let Some(message) = state.delete_failures.get(&(kind, name.to_string())) {
			return Err(K8sError::ApiError {
				message: message.clone(),
			});
		}
		let objects = store(state);
		let before = objects.len();
		objects.retain(|o| !is_named(o, namespace, name));
		if objects.len() == before {
			return Err(K8sError::not_found(kind, name));
		}
		state.deleted.push((kind, name.to_string()));
		Ok(())
	}
}

fn is_named<K: Resource>(obj: &K, namespace: &str, name: &str) -> bool {
	let meta = obj.meta();
	meta.namespace.as_deref() == Some(namespace) && meta.name.as_deref() == Some(name)
}

fn find_mut<'a, K: Resource>(objects: &'a mut [K], namespace: &str, name: &str) -> Option<&'a mut K> {
	objects.iter_mut().find(|o| is_named(&**o, namespace, name))
}

fn insert<K: Resource + Clone>(
	objects: &mut Vec<K>,
	kind: ResourceKind,
	namespace: &str,
	mut obj: K,
) -> Result<K, K8sError> {
	let meta = obj.meta_mut();
	let name = meta.name.clone().ok_or_else(|| K8sError::ApiError {
		message: "metadata.name is required".to_string(),
	})?;
	meta.namespace = Some(namespace.to_string());
	if meta.creation_timestamp.is_none() {
		meta.creation_timestamp = Some(Time(Utc::now()));
	}
	if meta.uid.is_none() {
		meta.uid = Some(format!("uid-{namespace}-{name}"));
	}
	if objects.iter().any(|o| is_named(o, namespace, &name)) {
		return Err(K8sError::already_exists(kind, name));
	}
	objects.push(obj.clone());
	Ok(obj)
}

fn get<K: Resource + Clone>(
	objects: &[K],
	kind: ResourceKind,
	namespace: &str,
	name: &str,
) -> Result<K, K8sError> {
	objects
		.iter()
		.find(|o| is_named(*o, namespace, name))
		.cloned()
		.ok_or_else(|| K8sError::not_found(kind, name))
}

fn list<K: Resource + Clone>(
	objects: &[K],
	namespace: &str,
	label_selector: &str,
) -> Result<Vec<K>, K8sError> {
	let selector: LabelSelector = label_selector.parse()?;
	Ok(
		objects
			.iter()
			.filter(|o| o.meta().namespace.as_deref() == Some(namespace))
			.filter(|o| selector.matches(o.meta().labels.as_ref()))
			.cloned()
			.collect(),
	)
}

/// The pod the job controller would create for `job`.
fn pod_for_job(job: &Job, namespace: &str) -> Pod {
	let job_name = job.metadata.name.clone().unwrap_or_default();
	let template = job.spec.as_ref().map(|s| s.template.clone()).unwrap_or_default();

	let mut labels: BTreeMap<String, String> = template
		.metadata
		.as_ref()
		.and_then(|m| m.labels.clone())
		.unwrap_or_default();
	labels.insert(JOB_NAME_LABEL.to_string(), job_name.clone());

	let container_statuses = template
		.spec
		.as_ref()
		.map(|spec| {
			spec
				.containers
				.iter()
				.map(|c| ContainerStatus {
					name: c.name.clone(),
					ready: true,
					state: Some(ContainerState {
						running: Some(ContainerStateRunning {
							started_at: Some(Time(Utc::now())),
						}),
						..Default::default()
					}),
					..Default::default()
				})
				.collect::<Vec<_>>()
		})
		.unwrap_or_default();

	Pod {
		metadata: ObjectMeta {
			name: Some(format!("{job_name}-pod")),
			namespace: Some(namespace.to_string()),
			labels: Some(labels),
			owner_references: Some(vec![OwnerReference {
				api_version: "batch/v1".to_string(),
				kind: ResourceKind::Job.kind().to_string(),
				name: job_name,
				uid: job.metadata.uid.clone().unwrap_or_default(),
				controller: Some(true),
				block_owner_deletion: Some(true),
			}]),
			..Default::default()
		},
		spec: template.spec,
		status: Some(PodStatus {
			phase: Some("Running".to_string()),
			container_statuses: Some(container_statuses),
			..Default::default()
		}),
	}
}

#[async_trait]
impl K8sClient for FakeK8sClient {
	async fn get_namespace(&self, name: &str) -> Result<Namespace, K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("get_namespace");
		if !state.namespaces.contains(name) {
			return Err(K8sError::NamespaceNotFound { name: name.into() });
		}
		Ok(Namespace {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				..Default::default()
			},
			..Default::default()
		})
	}

	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("create_pod");
		insert(&mut state.pods, ResourceKind::Pod, namespace, pod)
	}

	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("list_pods");
		self.check_list(&state, ResourceKind::Pod)?;
		list(&state.pods, namespace, label_selector)
	}

	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		_grace_period_seconds: u32,
	) -> Result<(), K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("delete_pod");
		Self::delete_from(&mut state, ResourceKind::Pod, namespace, name, |s| {
			&mut s.pods
		})
	}

	async fn create_job(&self, namespace: &str, job: Job) -> Result<Job, K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("create_job");
		let mut job = insert(&mut state.jobs, ResourceKind::Job, namespace, job)?;
		if self.job_controller {
			let pod = pod_for_job(&job, namespace);
			insert(&mut state.pods, ResourceKind::Pod, namespace, pod)?;
			let status = JobStatus {
				succeeded: Some(1),
				..Default::default()
			};
			let name = job.metadata.name.clone().unwrap_or_default();
			if let Some(stored) = find_mut(&mut state.jobs, namespace, &name) {
				stored.status = Some(status.clone());
			}
			job.status = Some(status);
		}
		Ok(job)
	}

	async fn get_job(&self, name: &str, namespace: &str) -> Result<Job, K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("get_job");
		self.check_get(&state, ResourceKind::Job)?;
		get(&state.jobs, ResourceKind::Job, namespace, name)
	}

	async fn list_jobs(&self, namespace: &str, label_selector: &str) -> Result<Vec<Job>, K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("list_jobs");
		self.check_list(&state, ResourceKind::Job)?;
		list(&state.jobs, namespace, label_selector)
	}

	async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("delete_job");
		Self::delete_from(&mut state, ResourceKind::Job, namespace, name, |s| {
			&mut s.jobs
		})
	}

	async fn create_deployment(
		&self,
		namespace: &str,
		deployment: Deployment,
	) -> Result<Deployment, K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("create_deployment");
		insert(&mut state.deployments, ResourceKind::Deployment, namespace, deployment)
	}

	async fn list_deployments(
		&self,
		namespace: &str,
		label_selector: &str,
	) -> Result<Vec<Deployment>, K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("list_deployments");
		self.check_list(&state, ResourceKind::Deployment)?;
		list(&state.deployments, namespace, label_selector)
	}

	async fn delete_deployment(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("delete_deployment");
		Self::delete_from(&mut state, ResourceKind::Deployment, namespace, name, |s| {
			&mut s.deployments
		})
	}

	async fn create_replica_set(
		&self,
		namespace: &str,
		replica_set: ReplicaSet,
	) -> Result<ReplicaSet, K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("create_replica_set");
		insert(&mut state.replica_sets, ResourceKind::ReplicaSet, namespace, replica_set)
	}

	async fn list_replica_sets(
		&self,
		namespace: &str,
		label_selector: &str,
	) -> Result<Vec<ReplicaSet>, K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("list_replica_sets");
		self.check_list(&state, ResourceKind::ReplicaSet)?;
		list(&state.replica_sets, namespace, label_selector)
	}

	async fn delete_replica_set(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		let mut state = self.state.lock().unwrap();
		state.record("delete_replica_set");
		Self::delete_from(&mut state, ResourceKind::ReplicaSet, namespace, name, |s| {
			&mut s.replica_sets
		})
	}
}
