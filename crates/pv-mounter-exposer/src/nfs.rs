// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! NFS-Ganesha exposer workloads.
//!
//! Ganesha needs broad file-access capabilities whichever way it runs;
//! the standalone pod additionally gets a root pod context, while the
//! ephemeral variant inherits the workload pod's UID and switches the
//! server to its VFS passthrough layer (`FORCE_VFS`), because an
//! ephemeral container cannot acquire privileged ports.

use pv_mounter_common::{nfs_ephemeral_name, NFS_EPHEMERAL_PREFIX};
use pv_mounter_k8s::{
	Capabilities, Container, ContainerPort, EnvVar, EphemeralContainer, K8sClient, ObjectMeta,
	Pod, PodSpec, SeccompProfile, SecurityContext,
};
use tracing::info;

use crate::config::{ExposerOptions, DEFAULT_NFS_PORT, NFS_IMAGE};
use crate::ephemeral::{find_running_ephemeral, pvc_volume_name, workload_pod_uid};
use crate::error::ExposerError;
use crate::pod::{
	attach_pvc, env_var, exposer_labels, image_pull_secrets, pod_security_context,
	resource_requirements, volume_mount,
};

/// Build the pod spec for a standalone NFS-Ganesha exposer.
pub fn build_nfs_pod_spec(
	pod_name: &str,
	local_port: u16,
	pvc_name: &str,
	opts: &ExposerOptions,
) -> Pod {
	let container = Container {
		name: "nfs-ganesha".to_string(),
		image: Some(select_nfs_image(opts)),
		image_pull_policy: Some("Always".to_string()),
		ports: Some(vec![ContainerPort {
			container_port: DEFAULT_NFS_PORT,
			..Default::default()
		}]),
		env: Some(nfs_env_vars(false)),
		security_context: Some(nfs_security_context()),
		resources: Some(resource_requirements(opts.cpu_limit.as_deref())),
		..Default::default()
	};

	let mut pod = Pod {
		metadata: ObjectMeta {
			name: Some(pod_name.to_string()),
			labels: Some(exposer_labels(pvc_name, local_port, true)),
			..Default::default()
		},
		spec: Some(PodSpec {
			containers: vec![container],
			// Ganesha always needs root in the standalone case
			security_context: Some(pod_security_context(true)),
			image_pull_secrets: image_pull_secrets(opts),
			..Default::default()
		}),
		status: None,
	};

	attach_pvc(&mut pod, pvc_name);
	pod
}

/// Build the spec for an NFS ephemeral container running as the
/// workload pod's UID.
pub fn build_nfs_ephemeral_spec(
	name: &str,
	volume_name: &str,
	run_as_user: i64,
	opts: &ExposerOptions,
) -> EphemeralContainer {
	let mut security_context = nfs_security_context();
	security_context.run_as_user = Some(run_as_user);

	EphemeralContainer {
		name: name.to_string(),
		image: Some(select_nfs_image(opts)),
		image_pull_policy: Some("Always".to_string()),
		env: Some(nfs_env_vars(true)),
		security_context: Some(security_context),
		volume_mounts: Some(vec![volume_mount(volume_name)]),
		..Default::default()
	}
}

fn select_nfs_image(opts: &ExposerOptions) -> String {
	opts.image.clone().unwrap_or_else(|| NFS_IMAGE.to_string())
}

fn nfs_env_vars(force_vfs: bool) -> Vec<EnvVar> {
	let mut env = vec![env_var("NEEDS_ROOT", "true"), env_var("LOG_LEVEL", "WARN")];
	if force_vfs {
		env.push(env_var("FORCE_VFS", "true"));
	}
	env
}

/// Container security context shared by both Ganesha shapes.
///
/// No `runAsUser` here: the standalone pod gets uid 0 from its pod
/// context, and the ephemeral variant sets the workload UID itself.
fn nfs_security_context() -> SecurityContext {
	SecurityContext {
		allow_privilege_escalation: Some(true),
		read_only_root_filesystem: Some(false),
		capabilities: Some(Capabilities {
			drop: Some(vec!["ALL".to_string()]),
			add: Some(
				[
					"SYS_ADMIN",
					"DAC_READ_SEARCH",
					"DAC_OVERRIDE",
					"SYS_RESOURCE",
					"CHOWN",
					"FOWNER",
					"SETUID",
					"SETGID",
				]
				.iter()
				.map(|c| c.to_string())
				.collect(),
			),
		}),
		seccomp_profile: Some(SeccompProfile {
			type_: "Unconfined".to_string(),
			..Default::default()
		}),
		..Default::default()
	}
}

/// Name of an already-Running NFS ephemeral container in the workload
/// pod, if one exists; a previous mount may have left a usable server.
pub async fn find_running_nfs_ephemeral(
	client: &dyn K8sClient,
	namespace: &str,
	pod_name: &str,
) -> Result<Option<String>, ExposerError> {
	let pod = client.get_pod(namespace, pod_name).await?;
	Ok(find_running_ephemeral(&pod, NFS_EPHEMERAL_PREFIX))
}

/// Inject an NFS ephemeral container into the workload pod and return
/// its generated name.
pub async fn inject_nfs_ephemeral(
	client: &dyn K8sClient,
	namespace: &str,
	pod_name: &str,
	opts: &ExposerOptions,
) -> Result<String, ExposerError> {
	let pod = client.get_pod(namespace, pod_name).await?;
	let volume_name = pvc_volume_name(&pod)?;
	let run_as_user = workload_pod_uid(&pod);

	let container_name = nfs_ephemeral_name();
	info!(
		container = %container_name,
		pod = %pod_name,
		volume = %volume_name,
		uid = run_as_user,
		"adding NFS ephemeral container"
	);

	let container = build_nfs_ephemeral_spec(&container_name, &volume_name, run_as_user, opts);
	client
		.patch_ephemeral_containers(namespace, pod_name, container)
		.await
		.map_err(|source| ExposerError::PatchEphemeral {
			pod: pod_name.to_string(),
			source,
		})?;

	Ok(container_name)
}
