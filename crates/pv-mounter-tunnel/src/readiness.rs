// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end readiness probes for the tunnel.

use std::time::Duration;

use pv_mounter_common::shutdown;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};
use tracing::debug;

use crate::error::TunnelError;

/// How long a freshly started forward gets to become usable.
pub const TUNNEL_READY_TIMEOUT: Duration = Duration::from_secs(30);

const PROBE_INTERVAL: Duration = Duration::from_millis(500);
const SSH_READ_DEADLINE: Duration = Duration::from_secs(2);
const NFS_READ_DEADLINE: Duration = Duration::from_millis(500);

/// Wait until an SSH banner is served through the tunnel.
pub async fn wait_for_ssh_ready(
	port: u16,
	deadline: Duration,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), TunnelError> {
	tokio::select! {
		_ = shutdown::cancelled(shutdown_rx) => Err(TunnelError::Cancelled),
		res = poll_ssh_ready(port, deadline) => res,
	}
}

async fn poll_ssh_ready(port: u16, deadline: Duration) -> Result<(), TunnelError> {
	let give_up = Instant::now() + deadline;
	loop {
		if ssh_banner_present(port).await {
			debug!(port, "SSH server is ready");
			return Ok(());
		}
		if Instant::now() >= give_up {
			return Err(TunnelError::ReadyTimeout {
				service: "SSH",
				port,
			});
		}
		tokio::time::sleep(PROBE_INTERVAL).await;
	}
}

/// Connect and require the first bytes to be the `SSH` banner prefix.
async fn ssh_banner_present(port: u16) -> bool {
	let Ok(mut stream) = TcpStream::connect(("127.0.0.1", port)).await else {
		return false;
	};
	let mut buf = [0u8; 4];
	match timeout(SSH_READ_DEADLINE, stream.read(&mut buf)).await {
		Ok(Ok(n)) if n >= 3 => &buf[..3] == b"SSH",
		_ => false,
	}
}

/// Wait until Ganesha is reachable through the tunnel.
pub async fn wait_for_nfs_ready(
	port: u16,
	deadline: Duration,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), TunnelError> {
	tokio::select! {
		_ = shutdown::cancelled(shutdown_rx) => Err(TunnelError::Cancelled),
		res = poll_nfs_ready(port, deadline) => res,
	}
}

async fn poll_nfs_ready(port: u16, deadline: Duration) -> Result<(), TunnelError> {
	let give_up = Instant::now() + deadline;
	loop {
		if nfs_server_waiting(port).await {
			debug!(port, "NFS server is ready");
			return Ok(());
		}
		if Instant::now() >= give_up {
			return Err(TunnelError::ReadyTimeout {
				service: "NFS",
				port,
			});
		}
		tokio::time::sleep(PROBE_INTERVAL).await;
	}
}

/// Connect and attempt a one-byte read with a short deadline.
///
/// NFS servers speak only when spoken to, so a read that times out
/// means the tunnel is wired and Ganesha is waiting for a client. An
/// immediate EOF means the forward accepted the local connection but
/// the remote side is not wired yet.
async fn nfs_server_waiting(port: u16) -> bool {
	let Ok(mut stream) = TcpStream::connect(("127.0.0.1", port)).await else {
		return false;
	};
	let mut buf = [0u8; 1];
	match timeout(NFS_READ_DEADLINE, stream.read(&mut buf)).await {
		Err(_) => true,
		Ok(Ok(0)) => false,
		Ok(Ok(_)) => true,
		Ok(Err(_)) => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::io::AsyncWriteExt;
	use tokio::net::TcpListener;

	fn shutdown_pair() -> (watch::Sender<bool>, watch::Receiver<bool>) {
		watch::channel(false)
	}

	async fn listener() -> (TcpListener, u16) {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		(listener, port)
	}

	#[tokio::test]
	async fn test_ssh_ready_on_banner() {
		let (listener, port) = listener().await;
		tokio::spawn(async move {
			loop {
				let Ok((mut socket, _)) = listener.accept().await else {
					return;
				};
				let _ = socket.write_all(b"SSH-2.0-OpenSSH_9.7\r\n").await;
			}
		});

		let (_tx, mut rx) = shutdown_pair();
		wait_for_ssh_ready(port, Duration::from_secs(5), &mut rx)
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn test_ssh_rejects_non_ssh_banner() {
		let (listener, port) = listener().await;
		tokio::spawn(async move {
			loop {
				let Ok((mut socket, _)) = listener.accept().await else {
					return;
				};
				let _ = socket.write_all(b"HTTP/1.1 200 OK\r\n").await;
			}
		});

		let (_tx, mut rx) = shutdown_pair();
		let err = wait_for_ssh_ready(port, Duration::from_millis(900), &mut rx)
			.await
			.unwrap_err();
		assert!(matches!(err, TunnelError::ReadyTimeout { service: "SSH", .. }));
	}

	#[tokio::test]
	async fn test_nfs_ready_when_server_stays_silent() {
		let (listener, port) = listener().await;
		tokio::spawn(async move {
			let mut held = Vec::new();
			loop {
				let Ok((socket, _)) = listener.accept().await else {
					return;
				};
				// hold the connection open without writing, like Ganesha
				held.push(socket);
			}
		});

		let (_tx, mut rx) = shutdown_pair();
		wait_for_nfs_ready(port, Duration::from_secs(5), &mut rx)
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn test_nfs_not_ready_on_immediate_close() {
		let (listener, port) = listener().await;
		tokio::spawn(async move {
			loop {
				let Ok((socket, _)) = listener.accept().await else {
					return;
				};
				// close straight away, like a forward whose remote end is missing
				drop(socket);
			}
		});

		let (_tx, mut rx) = shutdown_pair();
		let err = wait_for_nfs_ready(port, Duration::from_millis(900), &mut rx)
			.await
			.unwrap_err();
		assert!(matches!(err, TunnelError::ReadyTimeout { service: "NFS", .. }));
	}

	#[tokio::test]
	async fn test_probe_cancellation() {
		let (tx, mut rx) = shutdown_pair();
		tx.send(true).unwrap();
		// port 1 is never listening; cancellation must win regardless
		let err = wait_for_ssh_ready(1, Duration::from_secs(30), &mut rx)
			.await
			.unwrap_err();
		assert!(matches!(err, TunnelError::Cancelled));
	}
}
