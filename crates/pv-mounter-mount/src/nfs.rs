// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use pv_mounter_common::shutdown;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::MountCmdError;

const MOUNT_ATTEMPTS: u32 = 5;
// Ganesha can accept TCP before it can serve NFS; retries absorb that window.
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Mount `127.0.0.1:/volume` through the tunnel with the kernel NFS
/// client, retrying while Ganesha finishes initialising.
pub async fn mount_over_nfs(
	local_port: u16,
	mount_point: &str,
	pvc_name: &str,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), MountCmdError> {
	let mut last_error = String::new();

	for attempt in 0..MOUNT_ATTEMPTS {
		if attempt > 0 {
			tokio::select! {
				_ = shutdown::cancelled(shutdown_rx) => return Err(MountCmdError::Cancelled),
				_ = tokio::time::sleep(RETRY_DELAY) => {}
			}
		}

		let mut cmd = nfs_mount_command(local_port, mount_point);
		match cmd.status().await {
			Ok(status) if status.success() => {
				info!(pvc = %pvc_name, mount_point, "PVC mounted over NFS");
				return Ok(());
			}
			Ok(status) => {
				warn!(attempt = attempt + 1, %status, "NFS mount attempt failed");
				last_error = status.to_string();
			}
			Err(e) => {
				warn!(attempt = attempt + 1, error = %e, "failed to run mount");
				last_error = e.to_string();
			}
		}
	}

	Err(MountCmdError::NfsFailed {
		attempts: MOUNT_ATTEMPTS,
		last: last_error,
	})
}

fn nfs_mount_command(local_port: u16, mount_point: &str) -> Command {
	let mut cmd = Command::new("mount");
	if cfg!(target_os = "macos") {
		cmd.args(["-t", "nfs"])
			.arg("-o")
			.arg(format!("nfsvers=4,port={local_port},tcp"));
	} else {
		cmd.args(["-t", "nfs4"])
			.arg("-o")
			.arg(format!(
				"port={local_port},vers=4.2,soft,timeo=50,retrans=2,retry=0"
			));
	}
	cmd.arg("127.0.0.1:/volume").arg(mount_point);
	cmd
}
