// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Checks for the local mount clients, run before any cluster work so
//! a missing binary fails in milliseconds rather than after a pod has
//! been provisioned.

use std::path::Path;

use pv_mounter_common::Backend;

use crate::error::MountCmdError;

const SSHFS_HINT_MACOS: &str = "For macOS, install sshfs from https://osxfuse.github.io/";
const SSHFS_HINT_LINUX: &str = "For Linux, install sshfs from https://github.com/libfuse/sshfs";
const NFS_HINT_LINUX: &str =
	"For Linux, install nfs-common (e.g. sudo apt-get install nfs-common)";
const MOUNT_HINT_MACOS: &str = "For macOS, mount should be available by default";

/// Verify the client binary for the chosen backend is on PATH.
pub fn check_local_client(backend: Backend) -> Result<(), MountCmdError> {
	match backend {
		Backend::Ssh => {
			let hint = if cfg!(target_os = "macos") {
				SSHFS_HINT_MACOS
			} else {
				SSHFS_HINT_LINUX
			};
			require_tool("sshfs", hint)
		}
		Backend::Nfs => {
			if cfg!(target_os = "macos") {
				require_tool("mount", MOUNT_HINT_MACOS)
			} else {
				require_tool("mount.nfs4", NFS_HINT_LINUX)
			}
		}
	}
}

fn require_tool(tool: &'static str, hint: &'static str) -> Result<(), MountCmdError> {
	if tool_on_path(tool) {
		Ok(())
	} else {
		Err(MountCmdError::MissingClient { tool, hint })
	}
}

fn tool_on_path(tool: &str) -> bool {
	// mount helpers live in /sbin, which not every login PATH carries
	let extra = [Path::new("/sbin"), Path::new("/usr/sbin")];
	let path_var = std::env::var_os("PATH").unwrap_or_default();
	std::env::split_paths(&path_var)
		.chain(extra.iter().map(|p| p.to_path_buf()))
		.any(|dir| dir.join(tool).is_file())
}
