// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use pv_mounter_k8s::K8sError;
use thiserror::Error;

/// Errors from probing, provisioning, or waiting on exposer workloads.
#[derive(Error, Debug)]
pub enum ExposerError {
	#[error("{0}")]
	Api(#[from] K8sError),

	#[error("PVC {name} is not bound")]
	PvcNotBound { name: String },

	#[error("PVC {name} has no bound volume")]
	NoBoundVolume { name: String },

	#[error("no PVC-backed volume found in pod {pod}")]
	NoPvcVolume { pod: String },

	#[error("failed to create pod {pod}: {source}")]
	CreatePod { pod: String, source: K8sError },

	#[error("failed to add ephemeral container to pod {pod}: {source}")]
	PatchEphemeral { pod: String, source: K8sError },

	#[error("timed out waiting for pod {pod} to become Ready")]
	PodReadyTimeout { pod: String },

	#[error("timed out waiting for ephemeral container {container} to start")]
	EphemeralReadyTimeout { container: String },

	#[error("ephemeral container {container} terminated: {reason}")]
	EphemeralTerminated { container: String, reason: String },

	#[error("cancelled")]
	Cancelled,
}
