// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Waiting for a job's container to start running.

use std::sync::Arc;
use std::time::Duration;

use kiln_k8s::{K8sClient, LabelSelector, Pod, ResourceKind, JOB_NAME_LABEL};
use tracing::instrument;

use crate::error::LifecycleError;
use crate::poll::{Observation, Poller};
use crate::types::WorkloadRef;

/// Locates the pod a job created and waits for one of its containers to run.
///
/// The pod name is discovered, never derived from the job name: the job
/// controller picks it once it materializes the template.
pub struct ReadinessObserver {
	client: Arc<dyn K8sClient>,
	poller: Poller,
}

impl ReadinessObserver {
	pub fn new(client: Arc<dyn K8sClient>, poller: Poller) -> Self {
		Self { client, poller }
	}

	/// Block until `container` in the job's pod reports a running state and
	/// return that pod's name.
	///
	/// A timeout means readiness was not observed in time, not that the job
	/// was never created. Read-only.
	#[instrument(skip(self, workload), fields(workload = %workload))]
	pub async fn await_container_running(
		&self,
		workload: &WorkloadRef,
		container: &str,
		timeout: Duration,
	) -> Result<String, LifecycleError> {
		let client = &self.client;
		let namespace = workload.namespace.as_str();
		let job = workload.name.as_str();
		let selector = LabelSelector::for_job(job).to_string();
		let selector = selector.as_str();

		let pod_name = self
			.poller
			.wait_for(timeout, move || async move {
				let pods = client.list_pods(namespace, selector).await?;
				let observation = match newest_job_pod(&pods, job) {
					Some(pod) if container_running(pod, container) => {
						Observation::Satisfied(pod.metadata.name.clone().unwrap_or_default())
					}
					_ => Observation::Waiting,
				};
				Ok::<_, LifecycleError>(observation)
			})
			.await?;

		tracing::info!(pod = %pod_name, container, "Container running");
		Ok(pod_name)
	}
}

/// Whether `pod` was created for the job named `job`.
///
/// A Job owner reference decides when present, so a pod that carries the
/// `job-name` label but is controlled by another job is rejected. Pods
/// without one fall back to the label.
pub fn owned_by_job(pod: &Pod, job: &str) -> bool {
	let job_owner = pod
		.metadata
		.owner_references
		.as_deref()
		.unwrap_or_default()
		.iter()
		.find(|r| r.kind == ResourceKind::Job.kind());
	match job_owner {
		Some(owner) => owner.name == job,
		None => pod
			.metadata
			.labels
			.as_ref()
			.and_then(|l| l.get(JOB_NAME_LABEL))
			.is_some_and(|name| name == job),
	}
}

/// The most recently created pod belonging to `job`.
///
/// Retried jobs can leave several pods behind. Ties on creation time, and
/// pods without one, resolve to the earliest in listing order.
pub fn newest_job_pod<'a>(pods: &'a [Pod], job: &str) -> Option<&'a Pod> {
	pods
		.iter()
		.filter(|pod| owned_by_job(pod, job))
		.fold(None, |best: Option<&Pod>, pod| match best {
			Some(current)
				if pod.metadata.creation_timestamp <= current.metadata.creation_timestamp =>
			{
				Some(current)
			}
			_ => Some(pod),
		})
}

/// Whether the status of `container` in `pod` is running.
pub fn container_running(pod: &Pod, container: &str) -> bool {
	pod
		.status
		.as_ref()
		.and_then(|s| s.container_statuses.as_ref())
		.and_then(|statuses| statuses.iter().find(|cs| cs.name == container))
		.and_then(|cs| cs.state.as_ref())
		.is_some_and(|state| state.running.is_some())
}
