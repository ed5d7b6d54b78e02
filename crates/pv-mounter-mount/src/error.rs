// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Errors from the workstation-side mount and unmount commands.
#[derive(Error, Debug)]
pub enum MountCmdError {
	#[error("{tool} is not available on PATH. {hint}")]
	MissingClient { tool: &'static str, hint: &'static str },

	#[error("failed to create temporary key file: {0}")]
	KeyFile(#[source] std::io::Error),

	#[error("failed to run {tool}: {source}")]
	Spawn {
		tool: &'static str,
		source: std::io::Error,
	},

	#[error("sshfs exited with {status}")]
	SshfsFailed { status: std::process::ExitStatus },

	#[error("NFS mount failed after {attempts} attempts: {last}")]
	NfsFailed { attempts: u32, last: String },

	#[error("failed to unmount {mount_point}: {reason}")]
	UnmountFailed { mount_point: String, reason: String },

	#[error("cancelled")]
	Cancelled,
}
