// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SSH ephemeral containers injected into a workload pod that already
//! holds the PVC (the mounted-RWO case).

use pv_mounter_common::ssh_ephemeral_name;
use pv_mounter_k8s::{EphemeralContainer, K8sClient, Pod};
use tracing::info;

use crate::config::{ExposerOptions, DEFAULT_SSH_PORT, SSH_IMAGE, SSH_PRIVILEGED_IMAGE};
use crate::error::ExposerError;
use crate::pod::{ssh_env_vars, ssh_security_context, volume_mount};

/// Build the spec for an SSH ephemeral container sharing the workload
/// pod's PVC volume.
pub fn build_ssh_ephemeral_spec(
	name: &str,
	volume_name: &str,
	public_key: &str,
	opts: &ExposerOptions,
) -> EphemeralContainer {
	let image = opts.image.clone().unwrap_or_else(|| {
		if opts.needs_root {
			SSH_PRIVILEGED_IMAGE.to_string()
		} else {
			SSH_IMAGE.to_string()
		}
	});

	EphemeralContainer {
		name: name.to_string(),
		image: Some(image),
		image_pull_policy: Some("Always".to_string()),
		env: Some(ssh_env_vars(public_key, DEFAULT_SSH_PORT, opts.needs_root)),
		security_context: Some(ssh_security_context(opts.needs_root)),
		volume_mounts: Some(vec![volume_mount(volume_name)]),
		..Default::default()
	}
}

/// Find the name of the volume backing the pod's PVC mount.
pub fn pvc_volume_name(pod: &Pod) -> Result<String, ExposerError> {
	let pod_name = pod.metadata.name.clone().unwrap_or_default();
	pod.spec
		.as_ref()
		.and_then(|spec| spec.volumes.as_ref())
		.and_then(|volumes| {
			volumes.iter().find(|volume| {
				volume
					.persistent_volume_claim
					.as_ref()
					.map(|claim| !claim.claim_name.is_empty())
					.unwrap_or(false)
			})
		})
		.map(|volume| volume.name.clone())
		.ok_or(ExposerError::NoPvcVolume { pod: pod_name })
}

/// Effective UID the workload pod runs as.
///
/// Checked in the order Kubernetes applies them: the first container's
/// security context, then the pod-level one, then root.
pub fn workload_pod_uid(pod: &Pod) -> i64 {
	let spec = match pod.spec.as_ref() {
		Some(spec) => spec,
		None => return 0,
	};

	if let Some(uid) = spec
		.containers
		.first()
		.and_then(|c| c.security_context.as_ref())
		.and_then(|sc| sc.run_as_user)
	{
		return uid;
	}

	spec.security_context
		.as_ref()
		.and_then(|sc| sc.run_as_user)
		.unwrap_or(0)
}

/// Name of a Running ephemeral container whose name starts with `prefix`.
pub fn find_running_ephemeral(pod: &Pod, prefix: &str) -> Option<String> {
	pod.status
		.as_ref()
		.and_then(|status| status.ephemeral_container_statuses.as_ref())
		.and_then(|statuses| {
			statuses.iter().find(|status| {
				status.name.starts_with(prefix)
					&& status
						.state
						.as_ref()
						.map(|state| state.running.is_some())
						.unwrap_or(false)
			})
		})
		.map(|status| status.name.clone())
}

/// Inject an SSH ephemeral container into the workload pod and return
/// its generated name.
pub async fn inject_ssh_ephemeral(
	client: &dyn K8sClient,
	namespace: &str,
	pod_name: &str,
	public_key: &str,
	opts: &ExposerOptions,
) -> Result<String, ExposerError> {
	let pod = client.get_pod(namespace, pod_name).await?;
	let volume_name = pvc_volume_name(&pod)?;

	let container_name = ssh_ephemeral_name();
	info!(
		container = %container_name,
		pod = %pod_name,
		volume = %volume_name,
		"adding SSH ephemeral container"
	);

	let container = build_ssh_ephemeral_spec(&container_name, &volume_name, public_key, opts);
	client
		.patch_ephemeral_containers(namespace, pod_name, container)
		.await
		.map_err(|source| ExposerError::PatchEphemeral {
			pod: pod_name.to_string(),
			source,
		})?;

	Ok(container_name)
}

#[cfg(test)]
mod tests {
	use super::*;
	use pv_mounter_k8s::{
		Container, ContainerState, ContainerStateRunning, ContainerStatus, ObjectMeta,
		PersistentVolumeClaimVolumeSource, PodSecurityContext, PodSpec, PodStatus,
		SecurityContext, Volume,
	};

	fn workload_pod(volumes: Vec<Volume>) -> Pod {
		Pod {
			metadata: ObjectMeta {
				name: Some("worker-7".to_string()),
				..Default::default()
			},
			spec: Some(PodSpec {
				containers: vec![Container {
					name: "app".to_string(),
					..Default::default()
				}],
				volumes: Some(volumes),
				..Default::default()
			}),
			..Default::default()
		}
	}

	fn pvc_volume(name: &str, claim: &str) -> Volume {
		Volume {
			name: name.to_string(),
			persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
				claim_name: claim.to_string(),
				read_only: None,
			}),
			..Default::default()
		}
	}

	#[test]
	fn test_build_ssh_ephemeral_spec() {
		let opts = ExposerOptions::default();
		let container = build_ssh_ephemeral_spec("volume-exposer-ephemeral-abc12", "data", "PUBKEY", &opts);

		assert_eq!(container.name, "volume-exposer-ephemeral-abc12");
		assert_eq!(container.image.as_deref(), Some(SSH_IMAGE));
		assert_eq!(container.image_pull_policy.as_deref(), Some("Always"));

		let mounts = container.volume_mounts.unwrap();
		assert_eq!(mounts[0].name, "data");
		assert_eq!(mounts[0].mount_path, "/volume");

		let env = container.env.unwrap();
		assert!(env.iter().any(|e| e.name == "SSH_PUBLIC_KEY"));

		let sc = container.security_context.unwrap();
		assert_eq!(sc.run_as_non_root, Some(true));
	}

	#[test]
	fn test_pvc_volume_name_picks_first_claim() {
		let pod = workload_pod(vec![
			Volume {
				name: "scratch".to_string(),
				..Default::default()
			},
			pvc_volume("data", "pvc-3"),
			pvc_volume("other", "pvc-9"),
		]);
		assert_eq!(pvc_volume_name(&pod).unwrap(), "data");
	}

	#[test]
	fn test_pvc_volume_name_missing() {
		let pod = workload_pod(vec![Volume {
			name: "scratch".to_string(),
			..Default::default()
		}]);
		let err = pvc_volume_name(&pod).unwrap_err();
		assert!(matches!(err, ExposerError::NoPvcVolume { .. }));
	}

	#[test]
	fn test_workload_pod_uid_from_container() {
		let mut pod = workload_pod(vec![]);
		pod.spec.as_mut().unwrap().containers[0].security_context = Some(SecurityContext {
			run_as_user: Some(1000),
			..Default::default()
		});
		pod.spec.as_mut().unwrap().security_context = Some(PodSecurityContext {
			run_as_user: Some(2000),
			..Default::default()
		});
		assert_eq!(workload_pod_uid(&pod), 1000);
	}

	#[test]
	fn test_workload_pod_uid_from_pod_context() {
		let mut pod = workload_pod(vec![]);
		pod.spec.as_mut().unwrap().security_context = Some(PodSecurityContext {
			run_as_user: Some(2000),
			..Default::default()
		});
		assert_eq!(workload_pod_uid(&pod), 2000);
	}

	#[test]
	fn test_workload_pod_uid_defaults_to_root() {
		let pod = workload_pod(vec![]);
		assert_eq!(workload_pod_uid(&pod), 0);
	}

	#[test]
	fn test_find_running_ephemeral_matches_prefix_and_state() {
		let mut pod = workload_pod(vec![]);
		pod.status = Some(PodStatus {
			ephemeral_container_statuses: Some(vec![
				ContainerStatus {
					name: "nfs-ganesha-ephemeral-dead0".to_string(),
					state: Some(ContainerState::default()),
					..Default::default()
				},
				ContainerStatus {
					name: "nfs-ganesha-ephemeral-live0".to_string(),
					state: Some(ContainerState {
						running: Some(ContainerStateRunning::default()),
						..Default::default()
					}),
					..Default::default()
				},
			]),
			..Default::default()
		});

		assert_eq!(
			find_running_ephemeral(&pod, "nfs-ganesha-ephemeral-"),
			Some("nfs-ganesha-ephemeral-live0".to_string())
		);
		assert_eq!(find_running_ephemeral(&pod, "volume-exposer-"), None);
	}
}
