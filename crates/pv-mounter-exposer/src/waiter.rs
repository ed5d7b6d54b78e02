// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Polling waiters for exposer readiness.

use std::time::Duration;

use pv_mounter_common::shutdown;
use pv_mounter_k8s::{ContainerState, K8sClient, Pod};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::error::ExposerError;

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const POD_READY_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const EPHEMERAL_READY_TIMEOUT: Duration = Duration::from_secs(60);
// sshd/Ganesha keep initialising briefly after the container reports
// Running; connecting earlier produces spurious resets.
const EPHEMERAL_SETTLE: Duration = Duration::from_secs(3);

/// Wait until the pod reports a `Ready=True` condition.
pub async fn wait_for_pod_ready(
	client: &dyn K8sClient,
	namespace: &str,
	pod_name: &str,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), ExposerError> {
	tokio::select! {
		_ = shutdown::cancelled(shutdown_rx) => Err(ExposerError::Cancelled),
		res = poll_pod_ready(client, namespace, pod_name) => res,
	}
}

async fn poll_pod_ready(
	client: &dyn K8sClient,
	namespace: &str,
	pod_name: &str,
) -> Result<(), ExposerError> {
	let deadline = Instant::now() + POD_READY_TIMEOUT;
	loop {
		let pod = client.get_pod(namespace, pod_name).await?;
		if pod_is_ready(&pod) {
			debug!(pod = %pod_name, "pod is ready");
			return Ok(());
		}
		if Instant::now() >= deadline {
			return Err(ExposerError::PodReadyTimeout {
				pod: pod_name.to_string(),
			});
		}
		tokio::time::sleep(POLL_INTERVAL).await;
	}
}

fn pod_is_ready(pod: &Pod) -> bool {
	pod.status
		.as_ref()
		.and_then(|status| status.conditions.as_ref())
		.map(|conditions| {
			conditions
				.iter()
				.any(|cond| cond.type_ == "Ready" && cond.status == "True")
		})
		.unwrap_or(false)
}

/// Wait until the named ephemeral container is Running, then give the
/// server inside it a moment to finish initialising.
pub async fn wait_for_ephemeral_running(
	client: &dyn K8sClient,
	namespace: &str,
	pod_name: &str,
	container_name: &str,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), ExposerError> {
	tokio::select! {
		_ = shutdown::cancelled(shutdown_rx) => Err(ExposerError::Cancelled),
		res = poll_ephemeral_running(client, namespace, pod_name, container_name) => res,
	}
}

async fn poll_ephemeral_running(
	client: &dyn K8sClient,
	namespace: &str,
	pod_name: &str,
	container_name: &str,
) -> Result<(), ExposerError> {
	let deadline = Instant::now() + EPHEMERAL_READY_TIMEOUT;
	loop {
		let pod = client.get_pod(namespace, pod_name).await?;

		match ephemeral_state(&pod, container_name) {
			Some(state) if state.running.is_some() => {
				debug!(container = %container_name, "ephemeral container is running");
				tokio::time::sleep(EPHEMERAL_SETTLE).await;
				return Ok(());
			}
			Some(state) => {
				if let Some(terminated) = &state.terminated {
					return Err(ExposerError::EphemeralTerminated {
						container: container_name.to_string(),
						reason: terminated
							.reason
							.clone()
							.unwrap_or_else(|| "unknown".to_string()),
					});
				}
				if let Some(waiting) = &state.waiting {
					debug!(
						container = %container_name,
						reason = waiting.reason.as_deref().unwrap_or("unknown"),
						"ephemeral container is waiting"
					);
				}
			}
			None => {
				debug!(container = %container_name, "ephemeral container status not reported yet");
			}
		}

		if Instant::now() >= deadline {
			return Err(ExposerError::EphemeralReadyTimeout {
				container: container_name.to_string(),
			});
		}
		tokio::time::sleep(POLL_INTERVAL).await;
	}
}

fn ephemeral_state<'a>(pod: &'a Pod, container_name: &str) -> Option<&'a ContainerState> {
	pod.status
		.as_ref()
		.and_then(|status| status.ephemeral_container_statuses.as_ref())
		.and_then(|statuses| {
			statuses
				.iter()
				.find(|status| status.name == container_name)
		})
		.and_then(|status| status.state.as_ref())
}
