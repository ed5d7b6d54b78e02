// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The mount orchestrator.
//!
//! One invocation walks `Validated → Probed → Provisioned → Ready →
//! Tunnelled → Mounted`. A failure after the tunnel is up kills the
//! port-forward; a failure after the key file exists unlinks it (the
//! mount driver owns that); nothing deletes a provisioned pod on
//! error, `clean` is the recovery path.

use std::path::Path;

use console::style;
use pv_mounter_common::{
	exposer_pod_name, generate_keypair, random_local_port, validate_kubernetes_name, Backend,
	SshKeyPair,
};
use pv_mounter_exposer::{
	build_nfs_pod_spec, build_ssh_pod_spec, check_pv_access_mode, check_pvc_usage,
	create_exposer_pod, find_running_nfs_ephemeral, inject_nfs_ephemeral, inject_ssh_ephemeral,
	wait_for_ephemeral_running, wait_for_pod_ready, ExposerOptions, PvcVerdict,
	DEFAULT_NFS_PORT, DEFAULT_SSH_PORT,
};
use pv_mounter_k8s::K8sClient;
use pv_mounter_mount::{
	check_local_client, mount_over_nfs, mount_over_sshfs, TempKeyRegistry,
};
use pv_mounter_tunnel::{
	wait_for_nfs_ready, wait_for_ssh_ready, PortForward, TUNNEL_READY_TIMEOUT,
};
use tokio::sync::watch;
use tracing::info;

use crate::error::Error;

/// Everything `mount` needs, parsed by the CLI.
#[derive(Debug, Clone)]
pub struct MountRequest {
	pub namespace: String,
	pub pvc_name: String,
	pub local_mount_point: String,
	pub backend: Backend,
	pub needs_root: bool,
	pub debug: bool,
	pub image: Option<String>,
	pub image_secret: Option<String>,
	pub cpu_limit: Option<String>,
}

impl MountRequest {
	fn exposer_options(&self) -> ExposerOptions {
		ExposerOptions {
			needs_root: self.needs_root,
			image: self.image.clone(),
			image_secret: self.image_secret.clone(),
			cpu_limit: self.cpu_limit.clone(),
		}
	}
}

/// One of the four ways to expose a PVC, chosen from the probe verdict
/// and the backend flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
	/// RWX or unmounted RWO: dedicated sshd pod with the PVC attached.
	StandaloneSsh,
	/// Mounted RWO: sshd ephemeral container inside the workload pod.
	EphemeralSsh { workload_pod: String },
	/// RWX or unmounted RWO: dedicated Ganesha pod with the PVC attached.
	StandaloneNfs,
	/// Mounted RWO: Ganesha ephemeral container inside the workload pod.
	EphemeralNfs { workload_pod: String },
}

impl Strategy {
	/// Map (verdict × backend) onto a strategy.
	pub fn select(verdict: &PvcVerdict, backend: Backend) -> Result<Self, Error> {
		if verdict.mountable_directly {
			return Ok(match backend {
				Backend::Ssh => Strategy::StandaloneSsh,
				Backend::Nfs => Strategy::StandaloneNfs,
			});
		}
		let workload_pod = verdict.pod_using_pvc.clone().ok_or_else(|| {
			Error::Internal("probe verdict names no pod for an in-use PVC".to_string())
		})?;
		Ok(match backend {
			Backend::Ssh => Strategy::EphemeralSsh { workload_pod },
			Backend::Nfs => Strategy::EphemeralNfs { workload_pod },
		})
	}
}

/// Mount a PVC onto a local directory.
pub async fn mount(
	client: &dyn K8sClient,
	req: &MountRequest,
	registry: &TempKeyRegistry,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), Error> {
	validate_kubernetes_name(&req.namespace, "namespace")?;
	validate_kubernetes_name(&req.pvc_name, "pvc-name")?;
	if !Path::new(&req.local_mount_point).exists() {
		return Err(Error::Validation(format!(
			"local mount point {} does not exist",
			req.local_mount_point
		)));
	}
	check_local_client(req.backend)?;

	let pvc = check_pvc_usage(client, &req.namespace, &req.pvc_name).await?;
	let verdict = check_pv_access_mode(client, &pvc, &req.namespace).await?;
	let strategy = Strategy::select(&verdict, req.backend)?;
	info!(pvc = %req.pvc_name, ?strategy, "selected mount strategy");

	match strategy {
		Strategy::StandaloneSsh => mount_standalone_ssh(client, req, registry, shutdown_rx).await,
		Strategy::EphemeralSsh { workload_pod } => {
			mount_ephemeral_ssh(client, req, &workload_pod, registry, shutdown_rx).await
		}
		Strategy::StandaloneNfs => mount_standalone_nfs(client, req, shutdown_rx).await,
		Strategy::EphemeralNfs { workload_pod } => {
			mount_ephemeral_nfs(client, req, &workload_pod, shutdown_rx).await
		}
	}
}

fn generate_keys(req: &MountRequest) -> Result<SshKeyPair, Error> {
	let keys = generate_keypair().map_err(|e| Error::Internal(e.to_string()))?;
	if req.debug {
		println!("Generated SSH private key:\n{}", keys.private_key_pem);
	}
	Ok(keys)
}

async fn mount_standalone_ssh(
	client: &dyn K8sClient,
	req: &MountRequest,
	registry: &TempKeyRegistry,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), Error> {
	let keys = generate_keys(req)?;
	let pod_name = exposer_pod_name();
	let local_port = random_local_port();

	let pod = build_ssh_pod_spec(
		&pod_name,
		local_port,
		&req.pvc_name,
		&keys.public_key_pem,
		&req.exposer_options(),
	);
	create_exposer_pod(client, &req.namespace, pod).await?;
	println!(
		"{} created exposer pod {}",
		style("✓").green().bold(),
		style(&pod_name).cyan()
	);

	wait_for_pod_ready(client, &req.namespace, &pod_name, shutdown_rx).await?;

	tunnel_and_mount_ssh(req, &pod_name, local_port, &keys, registry, shutdown_rx).await
}

async fn mount_ephemeral_ssh(
	client: &dyn K8sClient,
	req: &MountRequest,
	workload_pod: &str,
	registry: &TempKeyRegistry,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), Error> {
	let keys = generate_keys(req)?;

	let container_name = inject_ssh_ephemeral(
		client,
		&req.namespace,
		workload_pod,
		&keys.public_key_pem,
		&req.exposer_options(),
	)
	.await?;
	println!(
		"{} added ephemeral container {} to pod {}",
		style("✓").green().bold(),
		style(&container_name).cyan(),
		style(workload_pod).cyan()
	);

	wait_for_ephemeral_running(
		client,
		&req.namespace,
		workload_pod,
		&container_name,
		shutdown_rx,
	)
	.await?;

	let local_port = random_local_port();
	tunnel_and_mount_ssh(req, workload_pod, local_port, &keys, registry, shutdown_rx).await
}

async fn mount_standalone_nfs(
	client: &dyn K8sClient,
	req: &MountRequest,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), Error> {
	let pod_name = exposer_pod_name();
	let local_port = random_local_port();

	let pod = build_nfs_pod_spec(&pod_name, local_port, &req.pvc_name, &req.exposer_options());
	create_exposer_pod(client, &req.namespace, pod).await?;
	println!(
		"{} created exposer pod {}",
		style("✓").green().bold(),
		style(&pod_name).cyan()
	);

	wait_for_pod_ready(client, &req.namespace, &pod_name, shutdown_rx).await?;

	tunnel_and_mount_nfs(req, &pod_name, local_port, shutdown_rx).await
}

async fn mount_ephemeral_nfs(
	client: &dyn K8sClient,
	req: &MountRequest,
	workload_pod: &str,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), Error> {
	match find_running_nfs_ephemeral(client, &req.namespace, workload_pod).await? {
		Some(existing) => {
			println!(
				"{} reusing NFS ephemeral container {} in pod {}",
				style("✓").green().bold(),
				style(&existing).cyan(),
				style(workload_pod).cyan()
			);
		}
		None => {
			let container_name = inject_nfs_ephemeral(
				client,
				&req.namespace,
				workload_pod,
				&req.exposer_options(),
			)
			.await?;
			println!(
				"{} added ephemeral container {} to pod {}",
				style("✓").green().bold(),
				style(&container_name).cyan(),
				style(workload_pod).cyan()
			);
			wait_for_ephemeral_running(
				client,
				&req.namespace,
				workload_pod,
				&container_name,
				shutdown_rx,
			)
			.await?;
		}
	}

	let local_port = random_local_port();
	tunnel_and_mount_nfs(req, workload_pod, local_port, shutdown_rx).await
}

async fn tunnel_and_mount_ssh(
	req: &MountRequest,
	target_pod: &str,
	local_port: u16,
	keys: &SshKeyPair,
	registry: &TempKeyRegistry,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), Error> {
	let mut forward = PortForward::start(
		&req.namespace,
		target_pod,
		local_port,
		DEFAULT_SSH_PORT as u16,
		req.debug,
	)?;

	if let Err(e) = wait_for_ssh_ready(local_port, TUNNEL_READY_TIMEOUT, shutdown_rx).await {
		forward.kill().await;
		return Err(e.into());
	}
	if !req.debug {
		println!("Forwarding from 127.0.0.1:{local_port} -> {DEFAULT_SSH_PORT}");
	}

	match mount_over_sshfs(
		local_port,
		&req.local_mount_point,
		&req.pvc_name,
		&keys.private_key_pem,
		req.needs_root,
		registry,
	)
	.await
	{
		Ok(()) => {
			// the mounted filesystem needs the tunnel after we exit
			forward.detach();
			println!(
				"{} PVC {} mounted at {}",
				style("✓").green().bold(),
				style(&req.pvc_name).cyan(),
				style(&req.local_mount_point).cyan()
			);
			Ok(())
		}
		Err(e) => {
			forward.kill().await;
			Err(e.into())
		}
	}
}

async fn tunnel_and_mount_nfs(
	req: &MountRequest,
	target_pod: &str,
	local_port: u16,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), Error> {
	let mut forward = PortForward::start(
		&req.namespace,
		target_pod,
		local_port,
		DEFAULT_NFS_PORT as u16,
		req.debug,
	)?;

	if let Err(e) = wait_for_nfs_ready(local_port, TUNNEL_READY_TIMEOUT, shutdown_rx).await {
		forward.kill().await;
		return Err(e.into());
	}
	if !req.debug {
		println!("Forwarding from 127.0.0.1:{local_port} -> {DEFAULT_NFS_PORT}");
	}

	match mount_over_nfs(
		local_port,
		&req.local_mount_point,
		&req.pvc_name,
		shutdown_rx,
	)
	.await
	{
		Ok(()) => {
			forward.detach();
			println!(
				"{} PVC {} mounted at {}",
				style("✓").green().bold(),
				style(&req.pvc_name).cyan(),
				style(&req.local_mount_point).cyan()
			);
			Ok(())
		}
		Err(e) => {
			forward.kill().await;
			Err(e.into())
		}
	}
}
