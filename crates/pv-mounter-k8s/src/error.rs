// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias for Kubernetes operations.
pub type K8sResult<T> = Result<T, K8sError>;

/// Errors that can occur during Kubernetes operations.
#[derive(Error, Debug)]
pub enum K8sError {
	#[error("Kubernetes API error: {message}")]
	Api { message: String },

	#[error("PVC not found: {name}")]
	PvcNotFound { name: String },

	#[error("PV not found: {name}")]
	PvNotFound { name: String },

	#[error("pod not found: {name}")]
	PodNotFound { name: String },

	#[error("failed to build Kubernetes client: {message}")]
	ClientSetup { message: String },
}

impl From<kube::Error> for K8sError {
	fn from(err: kube::Error) -> Self {
		K8sError::Api {
			message: err.to_string(),
		}
	}
}
