// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::error::TunnelError;

/// Handle to a running `kubectl port-forward` child process.
///
/// The subprocess is used instead of an in-process SPDY dial on
/// purpose: it inherits the operator's kubeconfig context and RBAC
/// verbatim, and `clean` can later find the forward by its command
/// line.
pub struct PortForward {
	child: Option<Child>,
	pod_name: String,
}

impl PortForward {
	/// Spawn `kubectl port-forward pod/<pod> <local>:<remote> -n <ns>`.
	///
	/// With `debug` the child's output goes to the operator's terminal;
	/// otherwise it is suppressed.
	pub fn start(
		namespace: &str,
		pod_name: &str,
		local_port: u16,
		remote_port: u16,
		debug: bool,
	) -> Result<Self, TunnelError> {
		let mut cmd = Command::new("kubectl");
		cmd.arg("port-forward")
			.arg(format!("pod/{pod_name}"))
			.arg(format!("{local_port}:{remote_port}"))
			.arg("-n")
			.arg(namespace);

		if debug {
			cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
		} else {
			cmd.stdout(Stdio::null()).stderr(Stdio::null());
		}

		let child = cmd.spawn().map_err(TunnelError::Spawn)?;
		info!(
			pod = %pod_name,
			local_port,
			remote_port,
			"started kubectl port-forward"
		);

		Ok(Self {
			child: Some(child),
			pod_name: pod_name.to_string(),
		})
	}

	/// Kill the child. At-most-once: the handle gives up its child on
	/// the first call, so a second kill (or a kill after the child
	/// already exited) is a no-op.
	pub async fn kill(&mut self) {
		if let Some(mut child) = self.child.take() {
			match child.kill().await {
				Ok(()) => debug!(pod = %self.pod_name, "killed port-forward"),
				Err(e) => debug!(pod = %self.pod_name, error = %e, "port-forward already gone"),
			}
		}
	}

	/// Leave the child running beyond this process's lifetime.
	///
	/// The mounted filesystem needs the tunnel after the CLI exits;
	/// `clean` removes the orphan later via pkill.
	pub fn detach(mut self) {
		if let Some(child) = self.child.take() {
			drop(child);
			debug!(pod = %self.pod_name, "detached port-forward");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	// `true` exits immediately, standing in for a dead forward.
	fn spawn_noop() -> PortForward {
		let child = Command::new("true")
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.spawn()
			.expect("spawn true");
		PortForward {
			child: Some(child),
			pod_name: "volume-exposer-abc12".to_string(),
		}
	}

	#[tokio::test]
	async fn test_kill_is_at_most_once() {
		let mut pf = spawn_noop();
		pf.kill().await;
		assert!(pf.child.is_none());
		// second kill must be a no-op, not a panic or an error
		pf.kill().await;
	}

	#[tokio::test]
	async fn test_kill_after_exit_is_noop() {
		let mut pf = spawn_noop();
		// give the child time to exit on its own
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
		pf.kill().await;
		assert!(pf.child.is_none());
	}

	#[tokio::test]
	async fn test_detach_releases_the_child() {
		let pf = spawn_noop();
		pf.detach();
	}
}
