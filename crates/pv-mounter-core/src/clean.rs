// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The clean orchestrator: the mount path in reverse.
//!
//! Standalone exposers are discovered by the labels the mount path
//! stamped on them and deleted outright. Ephemeral exposers cannot be
//! removed (a Kubernetes limitation), so their server process is
//! killed via `kubectl exec` instead; the API has no process-kill
//! call. Every step tolerates resources that are already gone, so a
//! second `clean` only fails with the specific "no pod found" error.

use console::style;
use pv_mounter_common::{validate_kubernetes_name, Backend, NFS_EPHEMERAL_PREFIX};
use pv_mounter_exposer::{
	find_pod_using_pvc, APP_LABEL_VALUE, BACKEND_LABEL_NFS, LABEL_APP, LABEL_BACKEND,
	LABEL_PVC_NAME,
};
use pv_mounter_k8s::{K8sClient, K8sError, Pod};
use pv_mounter_mount::unmount_local;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::Error;

const SSH_SERVER_PROCESS: &str = "sshd";
const NFS_SERVER_PROCESS: &str = "ganesha.nfsd";

/// Everything `clean` needs, parsed by the CLI.
#[derive(Debug, Clone)]
pub struct CleanRequest {
	pub namespace: String,
	pub pvc_name: String,
	pub local_mount_point: String,
	pub backend: Backend,
}

/// Unmount the local directory and release the in-cluster resources a
/// previous mount created.
pub async fn clean(client: &dyn K8sClient, req: &CleanRequest) -> Result<(), Error> {
	validate_kubernetes_name(&req.namespace, "namespace")?;
	validate_kubernetes_name(&req.pvc_name, "pvc-name")?;

	unmount_local(&req.local_mount_point, req.backend)
		.await
		.map_err(|e| Error::Cleanup(e.to_string()))?;
	println!(
		"{} unmounted {}",
		style("✓").green().bold(),
		style(&req.local_mount_point).cyan()
	);

	clean_cluster_resources(client, req).await
}

/// The in-cluster half of `clean`, separated so it can run against a
/// mock without a mounted filesystem.
pub async fn clean_cluster_resources(
	client: &dyn K8sClient,
	req: &CleanRequest,
) -> Result<(), Error> {
	// standalone exposers carry the labels the mount path stamped on them
	let selector = standalone_selector(req.backend, &req.pvc_name);
	let pods = client
		.list_pods(&req.namespace, Some(&selector))
		.await
		.map_err(Error::ApiFetch)?;

	if let Some(pod_name) = pods.first().and_then(|pod| pod.metadata.name.clone()) {
		kill_port_forward(&pod_name).await?;

		match client.delete_pod(&req.namespace, &pod_name).await {
			Ok(()) => info!(pod = %pod_name, "deleted exposer pod"),
			Err(K8sError::PodNotFound { .. }) => {
				debug!(pod = %pod_name, "exposer pod already gone")
			}
			Err(e) => {
				return Err(Error::Cleanup(format!(
					"failed to delete pod {pod_name}: {e}"
				)))
			}
		}
		println!(
			"{} deleted exposer pod {}",
			style("✓").green().bold(),
			style(&pod_name).cyan()
		);
		return Ok(());
	}

	// no standalone pod: the RWO ephemeral case against the workload pod
	let pods = client
		.list_pods(&req.namespace, None)
		.await
		.map_err(Error::ApiFetch)?;
	let Some(pod_name) = find_pod_using_pvc(&pods, &req.pvc_name) else {
		return Err(Error::Precondition(format!(
			"no pod found using PVC {}",
			req.pvc_name
		)));
	};

	kill_port_forward(&pod_name).await?;

	let pod = client
		.get_pod(&req.namespace, &pod_name)
		.await
		.map_err(Error::ApiFetch)?;
	let container = ephemeral_container_for_backend(&pod, req.backend).ok_or_else(|| {
		Error::Cleanup(format!(
			"no {} ephemeral container found in pod {pod_name}",
			req.backend
		))
	})?;

	let process = match req.backend {
		Backend::Ssh => SSH_SERVER_PROCESS,
		Backend::Nfs => NFS_SERVER_PROCESS,
	};
	kill_server_process(&req.namespace, &pod_name, &container, process).await?;
	println!(
		"{} killed {} in ephemeral container {} of pod {}",
		style("✓").green().bold(),
		process,
		style(&container).cyan(),
		style(&pod_name).cyan()
	);

	Ok(())
}

pub(crate) fn standalone_selector(backend: Backend, pvc_name: &str) -> String {
	match backend {
		Backend::Ssh => format!("{LABEL_PVC_NAME}={pvc_name},{LABEL_APP}={APP_LABEL_VALUE}"),
		Backend::Nfs => format!(
			"{LABEL_PVC_NAME}={pvc_name},{LABEL_APP}={APP_LABEL_VALUE},{LABEL_BACKEND}={BACKEND_LABEL_NFS}"
		),
	}
}

/// The ephemeral container whose server must be killed: the first one
/// for SSH, the first Ganesha-named one for NFS.
pub(crate) fn ephemeral_container_for_backend(pod: &Pod, backend: Backend) -> Option<String> {
	let ephemerals = pod.spec.as_ref()?.ephemeral_containers.as_ref()?;
	match backend {
		Backend::Ssh => ephemerals.first().map(|c| c.name.clone()),
		Backend::Nfs => ephemerals
			.iter()
			.find(|c| c.name.starts_with(NFS_EPHEMERAL_PREFIX))
			.map(|c| c.name.clone()),
	}
}

/// Kill any port-forward targeting the pod by its command line.
///
/// This also takes down forwards the operator started by hand against
/// the same pod; a known limitation of command-line discovery.
async fn kill_port_forward(pod_name: &str) -> Result<(), Error> {
	let pattern = format!("kubectl port-forward pod/{pod_name}");
	let status = Command::new("pkill")
		.args(["-f", &pattern])
		.status()
		.await
		.map_err(|e| Error::Cleanup(format!("failed to run pkill: {e}")))?;

	// pkill exits 1 when nothing matched; both outcomes leave no forward behind
	match status.code() {
		Some(0) => {
			info!(pod = %pod_name, "killed port-forward");
			Ok(())
		}
		Some(1) => {
			debug!(pod = %pod_name, "no port-forward to kill");
			Ok(())
		}
		_ => Err(Error::Cleanup(format!(
			"pkill failed for port-forward of pod {pod_name}: {status}"
		))),
	}
}

/// Kill the server process inside the ephemeral container.
async fn kill_server_process(
	namespace: &str,
	pod_name: &str,
	container: &str,
	process: &str,
) -> Result<(), Error> {
	let status = Command::new("kubectl")
		.args([
			"exec", pod_name, "-n", namespace, "-c", container, "--", "pkill", process,
		])
		.status()
		.await
		.map_err(|e| Error::Cleanup(format!("failed to run kubectl exec: {e}")))?;

	match status.code() {
		Some(0) => {
			info!(pod = %pod_name, container, process, "killed server process");
			Ok(())
		}
		// the in-container pkill found nothing: a previous clean got there first
		Some(1) => {
			debug!(pod = %pod_name, container, process, "server process already gone");
			Ok(())
		}
		_ => Err(Error::Cleanup(format!(
			"failed to kill {process} in container {container} of pod {pod_name}: {status}"
		))),
	}
}
