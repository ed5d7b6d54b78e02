// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use pv_mounter_common::Backend;
use tokio::process::Command;
use tracing::info;

use crate::error::MountCmdError;

/// Unmount the local directory.
///
/// FUSE mounts on Linux go through `fusermount -u`; macOS and all NFS
/// mounts use plain `umount`.
pub async fn unmount_local(mount_point: &str, backend: Backend) -> Result<(), MountCmdError> {
	let (tool, mut cmd) = if backend == Backend::Ssh && cfg!(target_os = "linux") {
		let mut cmd = Command::new("fusermount");
		cmd.args(["-u", mount_point]);
		("fusermount", cmd)
	} else {
		let mut cmd = Command::new("umount");
		cmd.arg(mount_point);
		("umount", cmd)
	};

	let status = cmd.status().await.map_err(|source| MountCmdError::Spawn {
		tool,
		source,
	})?;

	if !status.success() {
		return Err(MountCmdError::UnmountFailed {
			mount_point: mount_point.to_string(),
			reason: status.to_string(),
		});
	}

	info!(mount_point, "unmounted");
	Ok(())
}
