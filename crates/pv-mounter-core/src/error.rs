// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use pv_mounter_common::ValidationError;
use pv_mounter_exposer::ExposerError;
use pv_mounter_k8s::K8sError;
use pv_mounter_mount::MountCmdError;
use pv_mounter_tunnel::TunnelError;
use thiserror::Error;

/// Errors surfaced to the CLI, prefixed with their kind.
#[derive(Error, Debug)]
pub enum Error {
	#[error("validation: {0}")]
	Validation(String),

	#[error("api-fetch: {0}")]
	ApiFetch(#[source] K8sError),

	#[error("precondition: {0}")]
	Precondition(String),

	#[error("provision: {0}")]
	Provision(#[source] ExposerError),

	#[error("timeout: {0}")]
	Timeout(#[source] ExposerError),

	#[error("tunnel: {0}")]
	Tunnel(#[from] TunnelError),

	#[error("mount: {0}")]
	Mount(#[source] MountCmdError),

	#[error("cleanup: {0}")]
	Cleanup(String),

	#[error("terminated: {0}")]
	Terminated(String),

	#[error("internal: {0}")]
	Internal(String),
}

impl From<ValidationError> for Error {
	fn from(err: ValidationError) -> Self {
		Error::Validation(err.to_string())
	}
}

impl From<K8sError> for Error {
	fn from(err: K8sError) -> Self {
		Error::ApiFetch(err)
	}
}

impl From<ExposerError> for Error {
	fn from(err: ExposerError) -> Self {
		match err {
			ExposerError::Api(source) => Error::ApiFetch(source),
			precondition @ (ExposerError::PvcNotBound { .. }
			| ExposerError::NoBoundVolume { .. }
			| ExposerError::NoPvcVolume { .. }) => Error::Precondition(precondition.to_string()),
			provision @ (ExposerError::CreatePod { .. }
			| ExposerError::PatchEphemeral { .. }) => Error::Provision(provision),
			timeout @ (ExposerError::PodReadyTimeout { .. }
			| ExposerError::EphemeralReadyTimeout { .. }) => Error::Timeout(timeout),
			terminated @ ExposerError::EphemeralTerminated { .. } => {
				Error::Terminated(terminated.to_string())
			}
			ExposerError::Cancelled => Error::Internal("cancelled".to_string()),
		}
	}
}

impl From<MountCmdError> for Error {
	fn from(err: MountCmdError) -> Self {
		match err {
			missing @ MountCmdError::MissingClient { .. } => Error::Validation(missing.to_string()),
			unmount @ MountCmdError::UnmountFailed { .. } => Error::Cleanup(unmount.to_string()),
			MountCmdError::Cancelled => Error::Internal("cancelled".to_string()),
			other => Error::Mount(other),
		}
	}
}
