// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded condition polling.
//!
//! Every wait in this crate goes through [`Poller::wait_for`]. A probe is one
//! fresh read of cluster state and lands in one of three states: still
//! [`Observation::Waiting`], [`Observation::Satisfied`], or failed (`Err`).
//! A single read is never taken as final truth; only a satisfied probe or an
//! error ends the wait before the deadline does.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::LifecycleError;

/// Default interval between probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of a probe that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation<T> {
	/// Not there yet; poll again.
	Waiting,
	/// The condition holds; the wait returns this value.
	Satisfied(T),
}

impl Observation<()> {
	pub fn satisfied_if(done: bool) -> Self {
		if done {
			Observation::Satisfied(())
		} else {
			Observation::Waiting
		}
	}
}

/// Repeatedly evaluates a probe on a fixed interval until it is satisfied,
/// fails, or the deadline passes.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
	interval: Duration,
}

impl Default for Poller {
	fn default() -> Self {
		Self::new(DEFAULT_POLL_INTERVAL)
	}
}

impl Poller {
	pub fn new(interval: Duration) -> Self {
		Self { interval }
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}

	/// Wait for `probe` to report [`Observation::Satisfied`].
	///
	/// The deadline is fixed once, at entry. The probe runs immediately and
	/// then once per interval; the last sleep is clamped to the deadline, so
	/// the call returns within `timeout` plus one interval (plus however long
	/// the final probe's own cluster call takes, which is never cancelled).
	///
	/// - `Ok(Satisfied(v))` returns `Ok(v)` and the probe is not called again.
	/// - `Err(e)` returns `Err(e)` at once, without retrying.
	/// - Deadline reached returns [`LifecycleError::Timeout`] with the elapsed time.
	///
	/// A `timeout` too large to land on the clock leaves the wait unbounded.
	pub async fn wait_for<T, F, Fut>(&self, timeout: Duration, mut probe: F) -> Result<T, LifecycleError>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<Observation<T>, LifecycleError>>,
	{
		let start = Instant::now();
		let deadline = start.checked_add(timeout);
		let mut ticks: u32 = 0;

		loop {
			ticks += 1;
			if let Observation::Satisfied(value) = probe().await? {
				debug!(ticks, elapsed = ?start.elapsed(), "Condition satisfied");
				return Ok(value);
			}

			let now = Instant::now();
			let pause = match deadline {
				Some(deadline) if now >= deadline => {
					let elapsed = now - start;
					debug!(ticks, ?elapsed, ?timeout, "Gave up waiting for condition");
					return Err(LifecycleError::Timeout { elapsed });
				}
				Some(deadline) => self.interval.min(deadline - now),
				None => self.interval,
			};

			trace!(ticks, "Condition not yet satisfied");
			tokio::time::sleep(pause).await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kiln_k8s::K8sError;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	fn counting() -> (Arc<AtomicU32>, Arc<AtomicU32>) {
		let count = Arc::new(AtomicU32::new(0));
		(count.clone(), count)
	}

	#[tokio::test]
	async fn returns_when_condition_is_satisfied() {
		let poller = Poller::default();
		let result = poller
			.wait_for(Duration::from_millis(100), || async {
				Ok(Observation::satisfied_if(true))
			})
			.await;
		tokio_test::assert_ok!(result);
	}

	#[tokio::test]
	async fn times_out_when_never_satisfied() {
		let poller = Poller::default();
		let err = poller
			.wait_for(Duration::from_millis(100), || async {
				Ok(Observation::<()>::Waiting)
			})
			.await
			.unwrap_err();
		assert!(err.is_timeout());
		assert!(err.to_string().starts_with("timeout after "));
	}

	#[tokio::test]
	async fn condition_error_wins() {
		let poller = Poller::default();
		let err = poller
			.wait_for(Duration::from_millis(100), || async {
				Err::<Observation<()>, _>(LifecycleError::InvalidWorkload("myerr".to_string()))
			})
			.await
			.unwrap_err();
		assert_eq!(err.to_string(), "Invalid workload: myerr");
	}

	#[tokio::test(start_paused = true)]
	async fn stops_probing_after_satisfaction() {
		let (count, c) = counting();
		let poller = Poller::new(Duration::from_millis(100));

		let value = poller
			.wait_for(Duration::from_secs(10), move || {
				let c = c.clone();
				async move {
					let n = c.fetch_add(1, Ordering::SeqCst) + 1;
					Ok(if n == 3 {
						Observation::Satisfied(n)
					} else {
						Observation::Waiting
					})
				}
			})
			.await
			.unwrap();

		assert_eq!(value, 3);
		assert_eq!(count.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn condition_error_stops_polling_immediately() {
		let (count, c) = counting();
		let poller = Poller::new(Duration::from_millis(100));

		let err = poller
			.wait_for(Duration::from_secs(10), move || {
				let c = c.clone();
				async move {
					if c.fetch_add(1, Ordering::SeqCst) == 1 {
						Err(LifecycleError::from(K8sError::ApiError {
							message: "connection refused".to_string(),
						}))
					} else {
						Ok(Observation::<()>::Waiting)
					}
				}
			})
			.await
			.unwrap_err();

		assert!(matches!(err, LifecycleError::K8s(K8sError::ApiError { .. })));
		assert_eq!(count.load(Ordering::SeqCst), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn never_blocks_past_deadline_plus_one_tick() {
		let poller = Poller::new(Duration::from_millis(300));
		let timeout = Duration::from_millis(1000);
		let start = Instant::now();

		let err = poller
			.wait_for(timeout, || async { Ok(Observation::<()>::Waiting) })
			.await
			.unwrap_err();

		let waited = start.elapsed();
		match err {
			LifecycleError::Timeout { elapsed } => {
				assert!(elapsed >= timeout);
				assert!(elapsed <= timeout + poller.interval());
			}
			other => panic!("expected timeout, got {other:?}"),
		}
		assert!(waited >= timeout);
		assert!(waited <= timeout + poller.interval());
	}

	#[tokio::test(start_paused = true)]
	async fn zero_timeout_checks_exactly_once() {
		let (count, c) = counting();
		let err = Poller::default()
			.wait_for(Duration::ZERO, move || {
				let c = c.clone();
				async move {
					c.fetch_add(1, Ordering::SeqCst);
					Ok(Observation::<()>::Waiting)
				}
			})
			.await
			.unwrap_err();
		assert!(err.is_timeout());
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn maximal_timeout_returns_once_satisfied() {
		let value = Poller::default()
			.wait_for(Duration::MAX, || async { Ok(Observation::Satisfied(7)) })
			.await
			.unwrap();
		assert_eq!(value, 7);
	}

	#[tokio::test(start_paused = true)]
	async fn maximal_timeout_keeps_polling_on_the_interval() {
		let (count, c) = counting();
		let poller = Poller::new(Duration::from_millis(100));
		let start = Instant::now();

		poller
			.wait_for(Duration::MAX, move || {
				let c = c.clone();
				async move {
					let n = c.fetch_add(1, Ordering::SeqCst) + 1;
					Ok(Observation::satisfied_if(n == 4))
				}
			})
			.await
			.unwrap();

		assert_eq!(count.load(Ordering::SeqCst), 4);
		assert_eq!(start.elapsed(), Duration::from_millis(300));
	}

	#[tokio::test(start_paused = true)]
	async fn concurrent_waits_poll_independently() {
		let poller = Poller::new(Duration::from_millis(50));
		let (a_count, a) = counting();
		let (b_count, b) = counting();

		let first = poller.wait_for(Duration::from_secs(1), move || {
			let a = a.clone();
			async move {
				let n = a.fetch_add(1, Ordering::SeqCst) + 1;
				Ok(Observation::satisfied_if(n == 2))
			}
		});
		let second = poller.wait_for(Duration::from_secs(1), move || {
			let b = b.clone();
			async move {
				let n = b.fetch_add(1, Ordering::SeqCst) + 1;
				Ok(Observation::satisfied_if(n == 5))
			}
		});

		let (first, second) = tokio::join!(first, second);
		tokio_test::assert_ok!(first);
		tokio_test::assert_ok!(second);
		assert_eq!(a_count.load(Ordering::SeqCst), 2);
		assert_eq!(b_count.load(Ordering::SeqCst), 5);
	}
}
