// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One entry point wiring waits and cleanups to a single configuration.

use std::sync::Arc;

use kiln_k8s::{Job, K8sClient, K8sError};
use tracing::{info, instrument, warn};

use crate::cleanup::Cleaner;
use crate::completion::CompletionObserver;
use crate::config::LifecycleConfig;
use crate::error::LifecycleError;
use crate::poll::Poller;
use crate::readiness::ReadinessObserver;
use crate::types::WorkloadRef;

/// Runs transient workloads in the configured namespace and tears them down.
pub struct Lifecycle {
	client: Arc<dyn K8sClient>,
	config: LifecycleConfig,
	readiness: ReadinessObserver,
	completion: CompletionObserver,
	cleaner: Cleaner,
}

impl Lifecycle {
	pub fn new(client: Arc<dyn K8sClient>, config: LifecycleConfig) -> Self {
		let poller = Poller::new(config.poll_interval());
		Self {
			readiness: ReadinessObserver::new(Arc::clone(&client), poller),
			completion: CompletionObserver::new(Arc::clone(&client), poller),
			cleaner: Cleaner::new(Arc::clone(&client), config.namespace.clone())
				.with_pod_grace_period(config.pod_grace_period_secs),
			client,
			config,
		}
	}

	pub fn config(&self) -> &LifecycleConfig {
		&self.config
	}

	pub fn namespace(&self) -> &str {
		&self.config.namespace
	}

	/// A reference to `name` in the configured namespace.
	pub fn workload(&self, name: impl Into<String>) -> WorkloadRef {
		WorkloadRef::new(self.config.namespace.clone(), name)
	}

	pub fn readiness(&self) -> &ReadinessObserver {
		&self.readiness
	}

	pub fn completion(&self) -> &CompletionObserver {
		&self.completion
	}

	pub fn cleaner(&self) -> &Cleaner {
		&self.cleaner
	}

	/// Fail fast when the configured namespace does not exist.
	#[instrument(skip(self), fields(namespace = %self.config.namespace))]
	pub async fn validate_namespace(&self) -> Result<(), LifecycleError> {
		match self.client.get_namespace(&self.config.namespace).await {
			Ok(_) => {
				info!("Namespace validated");
				Ok(())
			}
			Err(K8sError::NamespaceNotFound { name }) => {
				Err(LifecycleError::NamespaceNotFound { name })
			}
			Err(e) => Err(e.into()),
		}
	}

	/// Wait up to the configured ready timeout for `container` of job `job`
	/// to run.
	pub async fn await_container_running(
		&self,
		job: &str,
		container: &str,
	) -> Result<String, LifecycleError> {
		self
			.readiness
			.await_container_running(&self.workload(job), container, self.config.ready_timeout())
			.await
	}

	/// Wait up to the configured completion timeout for job `job` to succeed.
	pub async fn await_job_completion(&self, job: &str) -> Result<(), LifecycleError> {
		self
			.completion
			.await_job_completion(&self.workload(job), self.config.completion_timeout())
			.await
	}

	/// Submit `job`, wait for `container` to run and for the job to finish,
	/// then delete the job and its pods whatever happened.
	///
	/// Returns the name of the pod the container ran in. If the run fails the
	/// run's error is returned, wrapped in
	/// [`LifecycleError::CleanupAfterFailure`] when teardown failed as well.
	///
	/// A job whose name is already taken was never submitted by this call, so
	/// nothing is torn down and the conflict is returned as is.
	#[instrument(skip(self, job), fields(namespace = %self.config.namespace, job_name = tracing::field::Empty))]
	pub async fn run_job(&self, job: Job, container: &str) -> Result<String, LifecycleError> {
		let name = job
			.metadata
			.name
			.clone()
			.filter(|n| !n.is_empty())
			.ok_or_else(|| LifecycleError::InvalidWorkload("job has no name".to_string()))?;
		tracing::Span::current().record("job_name", name.as_str());

		let outcome = match self.client.create_job(&self.config.namespace, job).await {
			Ok(_) => {
				info!(job = %name, "Job submitted");
				self.wait_for_run(&name, container).await
			}
			Err(e) if e.is_already_exists() => {
				warn!(error = %e, "Job name taken, leaving existing job alone");
				return Err(e.into());
			}
			Err(e) => Err(e.into()),
		};
		let teardown = self.cleaner.cleanup_job(&name).await;

		match (outcome, teardown) {
			(Ok(pod), Ok(())) => Ok(pod),
			(Ok(_), Err(cleanup)) => Err(cleanup),
			(Err(primary), Ok(())) => Err(primary),
			(Err(primary), Err(cleanup)) => {
				warn!(error = %cleanup, "Teardown after failed run also failed");
				Err(LifecycleError::CleanupAfterFailure {
					primary: Box::new(primary),
					cleanup: Box::new(cleanup),
				})
			}
		}
	}

	async fn wait_for_run(&self, name: &str, container: &str) -> Result<String, LifecycleError> {
		let pod = self.await_container_running(name, container).await?;
		self.await_job_completion(name).await?;
		Ok(pod)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kiln_k8s::{FakeK8sClient, ObjectMeta};

	fn lifecycle(fake: &FakeK8sClient) -> Lifecycle {
		Lifecycle::new(Arc::new(fake.clone()), LifecycleConfig::default())
	}

	#[test]
	fn workload_uses_configured_namespace() {
		let config = LifecycleConfig {
			namespace: "builds".to_string(),
			..Default::default()
		};
		let lifecycle = Lifecycle::new(Arc::new(FakeK8sClient::new()), config);
		assert_eq!(lifecycle.workload("job1"), WorkloadRef::new("builds", "job1"));
		assert_eq!(lifecycle.cleaner().namespace(), "builds");
	}

	#[tokio::test]
	async fn validate_namespace_ok_when_present() {
		let fake = FakeK8sClient::new().with_namespace("kiln");
		tokio_test::assert_ok!(lifecycle(&fake).validate_namespace().await);
	}

	#[tokio::test]
	async fn validate_namespace_reports_missing_namespace() {
		let fake = FakeK8sClient::new();
		let err = lifecycle(&fake).validate_namespace().await.unwrap_err();
		assert!(matches!(err, LifecycleError::NamespaceNotFound { ref name } if name == "kiln"));
		assert!(err.is_not_found());
	}

	#[tokio::test]
	async fn run_job_rejects_unnamed_job() {
		let fake = FakeK8sClient::new();
		let job = Job {
			metadata: ObjectMeta::default(),
			..Default::default()
		};
		let err = lifecycle(&fake).run_job(job, "cont1").await.unwrap_err();
		assert!(matches!(err, LifecycleError::InvalidWorkload(_)));
		assert_eq!(fake.calls("create_job"), 0);
	}
}
