// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Waiting for a job to reach a terminal state.

use std::sync::Arc;
use std::time::Duration;

use kiln_k8s::{Job, K8sClient};
use tracing::instrument;

use crate::error::LifecycleError;
use crate::poll::{Observation, Poller};
use crate::types::WorkloadRef;

const FAILED_CONDITION: &str = "Failed";

pub struct CompletionObserver {
	client: Arc<dyn K8sClient>,
	poller: Poller,
}

impl CompletionObserver {
	pub fn new(client: Arc<dyn K8sClient>, poller: Poller) -> Self {
		Self { client, poller }
	}

	/// Block until the job reports at least one success.
	///
	/// A missing job is an immediate error rather than something to wait
	/// out. So is a job the controller has marked `Failed`.
	#[instrument(skip(self, workload), fields(workload = %workload))]
	pub async fn await_job_completion(
		&self,
		workload: &WorkloadRef,
		timeout: Duration,
	) -> Result<(), LifecycleError> {
		let client = &self.client;
		let namespace = workload.namespace.as_str();
		let name = workload.name.as_str();

		self
			.poller
			.wait_for(timeout, move || async move {
				let job = client.get_job(name, namespace).await?;
				job_observation(&job)
			})
			.await?;

		tracing::info!(job = name, "Job completed");
		Ok(())
	}
}

/// Classify one read of a job.
///
/// Success wins over any failed attempts. Failed attempts alone keep the
/// wait going until the controller sets the `Failed` condition.
pub fn job_observation(job: &Job) -> Result<Observation<()>, LifecycleError> {
	let Some(status) = job.status.as_ref() else {
		return Ok(Observation::Waiting);
	};

	if status.succeeded.unwrap_or(0) >= 1 {
		return Ok(Observation::Satisfied(()));
	}

	let failed = status
		.conditions
		.as_deref()
		.unwrap_or_default()
		.iter()
		.find(|c| c.type_ == FAILED_CONDITION && c.status == "True");

	match failed {
		Some(condition) => Err(LifecycleError::JobFailed {
			name: job.metadata.name.clone().unwrap_or_default(),
			reason: condition
				.message
				.clone()
				.or_else(|| condition.reason.clone())
				.unwrap_or_else(|| "unknown".to_string()),
		}),
		None => Ok(Observation::Waiting),
	}
}
