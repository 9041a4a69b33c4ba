// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt;

pub use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, ReplicaSet, ReplicaSetSpec};
pub use k8s_openapi::api::batch::v1::{Job, JobCondition, JobSpec, JobStatus};
pub use k8s_openapi::api::core::v1::{
	Container, ContainerState, ContainerStateRunning, ContainerStateTerminated,
	ContainerStateWaiting, ContainerStatus, Namespace, Pod, PodSpec, PodStatus, PodTemplateSpec,
};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};

/// Label the job controller stamps on every pod it creates.
pub const JOB_NAME_LABEL: &str = "job-name";

/// The resource kinds the lifecycle layer reads and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
	Pod,
	Job,
	Deployment,
	ReplicaSet,
}

impl ResourceKind {
	/// The `kind` field as it appears in manifests and owner references.
	pub fn kind(&self) -> &'static str {
		match self {
			ResourceKind::Pod => "Pod",
			ResourceKind::Job => "Job",
			ResourceKind::Deployment => "Deployment",
			ResourceKind::ReplicaSet => "ReplicaSet",
		}
	}

	/// API group, empty for the core group.
	pub fn group(&self) -> &'static str {
		match self {
			ResourceKind::Pod => "",
			ResourceKind::Job => "batch",
			ResourceKind::Deployment | ResourceKind::ReplicaSet => "apps",
		}
	}
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.group() {
			"" => f.write_str(self.kind()),
			group => write!(f, "{}.{}", self.kind(), group),
		}
	}
}
