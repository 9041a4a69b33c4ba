// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workload lifecycle synchronization for Kiln.
//!
//! Build and deploy steps run as short-lived Kubernetes jobs. The control
//! plane answers every request asynchronously, so this crate turns "the job
//! exists" into bounded, blocking answers to the questions a provisioner
//! actually asks, and removes everything a workload created when it is done.
//!
//! # Architecture
//!
//! - [`Poller`] re-reads cluster state on a fixed interval until a probe is
//!   satisfied, fails, or a deadline passes.
//! - [`ReadinessObserver`] and [`CompletionObserver`] are the probes for
//!   "container running" and "job finished".
//! - [`Cleaner`] deletes owners before children (deployment, replica sets,
//!   pods) using label selectors.
//! - [`Lifecycle`] wires them to one [`LifecycleConfig`] and adds
//!   [`Lifecycle::run_job`], which always tears down what it started.

pub mod cleanup;
pub mod completion;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod naming;
pub mod poll;
pub mod readiness;
pub mod types;

pub use cleanup::Cleaner;
pub use completion::CompletionObserver;
pub use config::{LifecycleConfig, LifecycleConfigLayer};
pub use error::{ConfigError, LifecycleError};
pub use kiln_k8s::LabelSelector;
pub use lifecycle::Lifecycle;
pub use naming::{deploy_job_name, deployment_name, process_labels, process_selector};
pub use poll::{Observation, Poller, DEFAULT_POLL_INTERVAL};
pub use readiness::ReadinessObserver;
pub use types::WorkloadRef;
