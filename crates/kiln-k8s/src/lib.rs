// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! K8s client abstraction for Kiln workload lifecycle management.
//!
//! This crate provides:
//! - A trait-based K8s client abstraction for testability
//! - Production implementation using the kube crate
//! - Equality-based label selectors shared by list and cleanup calls
//! - An in-memory fake cluster (feature `fake`)

mod client;
mod error;
#[cfg(any(test, feature = "fake"))]
mod fake;
mod kube_client;
mod selector;
mod types;

pub use client::K8sClient;
pub use error::{K8sError, K8sResult};
#[cfg(any(test, feature = "fake"))]
pub use fake::FakeK8sClient;
pub use kube_client::KubeClient;
pub use selector::LabelSelector;
pub use types::{
	Container, ContainerState, ContainerStateRunning, ContainerStateTerminated,
	ContainerStateWaiting, ContainerStatus, Deployment, DeploymentSpec, Job, JobCondition, JobSpec,
	JobStatus, Namespace, ObjectMeta, OwnerReference, Pod, PodSpec, PodStatus, PodTemplateSpec,
	ReplicaSet, ReplicaSetSpec, ResourceKind, Time, JOB_NAME_LABEL,
};
