// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tokio::process::Command;
use tracing::info;

use crate::error::MountCmdError;
use crate::keyfile::write_temp_key_file;
use crate::registry::TempKeyRegistry;

const NON_ROOT_USER: &str = "ve";
const ROOT_USER: &str = "root";

/// Mount `/volume` from the exposer onto the local directory via sshfs.
///
/// Blocks until sshfs returns (it daemonises after a successful mount).
/// The key file is removed whatever the outcome.
pub async fn mount_over_sshfs(
	local_port: u16,
	mount_point: &str,
	pvc_name: &str,
	private_key_pem: &str,
	needs_root: bool,
	registry: &TempKeyRegistry,
) -> Result<(), MountCmdError> {
	let key_file = write_temp_key_file(private_key_pem, registry)?;
	let user = if needs_root { ROOT_USER } else { NON_ROOT_USER };

	let mut cmd = Command::new("sshfs");
	cmd.arg("-o")
		.arg(format!("IdentityFile={}", key_file.path().display()))
		.args(["-o", "StrictHostKeyChecking=no"])
		.args(["-o", "UserKnownHostsFile=/dev/null"])
		.args(["-o", "nomap=ignore"])
		.arg(format!("{user}@localhost:/volume"))
		.arg(mount_point)
		.args(["-p", &local_port.to_string()]);

	// stdio stays inherited so sshfs failures reach the operator directly
	let status = cmd.status().await.map_err(|source| MountCmdError::Spawn {
		tool: "sshfs",
		source,
	})?;

	key_file.remove();

	if !status.success() {
		return Err(MountCmdError::SshfsFailed { status });
	}

	info!(pvc = %pvc_name, mount_point, "PVC mounted over sshfs");
	Ok(())
}
