// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Standalone SSH exposer pod spec and the builders shared with the
//! NFS variants.

use std::collections::BTreeMap;

use pv_mounter_k8s::{
	Capabilities, Container, ContainerPort, EnvVar, K8sClient, LocalObjectReference, ObjectMeta,
	PersistentVolumeClaimVolumeSource, Pod, PodSecurityContext, PodSpec, Quantity,
	ResourceRequirements, SeccompProfile, SecurityContext, Volume, VolumeMount,
};
use tracing::info;

use crate::config::{
	ExposerOptions, APP_LABEL_VALUE, BACKEND_LABEL_NFS, CPU_REQUEST, DEFAULT_SSH_PORT,
	DEFAULT_USER_GROUP, EPHEMERAL_STORAGE_LIMIT, EPHEMERAL_STORAGE_REQUEST, LABEL_APP,
	LABEL_BACKEND, LABEL_PORT_NUMBER, LABEL_PVC_NAME, MEMORY_LIMIT, MEMORY_REQUEST, SSH_IMAGE,
	SSH_PRIVILEGED_IMAGE,
};
use crate::error::ExposerError;

const PVC_VOLUME: &str = "my-pvc";
const VOLUME_MOUNT_PATH: &str = "/volume";

/// Build the pod spec for a standalone SSH exposer with the PVC attached.
pub fn build_ssh_pod_spec(
	pod_name: &str,
	local_port: u16,
	pvc_name: &str,
	public_key: &str,
	opts: &ExposerOptions,
) -> Pod {
	let container = Container {
		name: "volume-exposer".to_string(),
		image: Some(select_ssh_image(opts)),
		image_pull_policy: Some("Always".to_string()),
		ports: Some(vec![ContainerPort {
			container_port: DEFAULT_SSH_PORT,
			..Default::default()
		}]),
		env: Some(ssh_env_vars(public_key, DEFAULT_SSH_PORT, opts.needs_root)),
		security_context: Some(ssh_security_context(opts.needs_root)),
		resources: Some(resource_requirements(opts.cpu_limit.as_deref())),
		..Default::default()
	};

	let mut pod = Pod {
		metadata: ObjectMeta {
			name: Some(pod_name.to_string()),
			labels: Some(exposer_labels(pvc_name, local_port, false)),
			..Default::default()
		},
		spec: Some(PodSpec {
			containers: vec![container],
			security_context: Some(pod_security_context(opts.needs_root)),
			image_pull_secrets: image_pull_secrets(opts),
			..Default::default()
		}),
		status: None,
	};

	attach_pvc(&mut pod, pvc_name);
	pod
}

/// Create an exposer pod and report provisioning failures as such.
pub async fn create_exposer_pod(
	client: &dyn K8sClient,
	namespace: &str,
	pod: Pod,
) -> Result<(), ExposerError> {
	let pod_name = pod.metadata.name.clone().unwrap_or_default();
	client
		.create_pod(namespace, pod)
		.await
		.map_err(|source| ExposerError::CreatePod {
			pod: pod_name.clone(),
			source,
		})?;
	info!(pod = %pod_name, namespace, "exposer pod created");
	Ok(())
}

/// Env vars consumed by the sshd entrypoint.
pub(crate) fn ssh_env_vars(public_key: &str, ssh_port: i32, needs_root: bool) -> Vec<EnvVar> {
	vec![
		env_var("SSH_PUBLIC_KEY", public_key),
		env_var("SSH_PORT", &normalized_ssh_port(ssh_port).to_string()),
		env_var("NEEDS_ROOT", &needs_root.to_string()),
	]
}

pub(crate) fn env_var(name: &str, value: &str) -> EnvVar {
	EnvVar {
		name: name.to_string(),
		value: Some(value.to_string()),
		value_from: None,
	}
}

/// Ports outside the TCP range collapse to the image default.
pub(crate) fn normalized_ssh_port(port: i32) -> i32 {
	if (0..=65535).contains(&port) {
		port
	} else {
		DEFAULT_SSH_PORT
	}
}

fn select_ssh_image(opts: &ExposerOptions) -> String {
	if let Some(image) = &opts.image {
		return image.clone();
	}
	if opts.needs_root {
		SSH_PRIVILEGED_IMAGE.to_string()
	} else {
		SSH_IMAGE.to_string()
	}
}

/// Container security context for the SSH exposer.
pub(crate) fn ssh_security_context(needs_root: bool) -> SecurityContext {
	let seccomp = SeccompProfile {
		type_: "RuntimeDefault".to_string(),
		..Default::default()
	};
	if needs_root {
		SecurityContext {
			allow_privilege_escalation: Some(true),
			read_only_root_filesystem: Some(true),
			capabilities: Some(Capabilities {
				add: Some(vec!["SYS_ADMIN".to_string(), "SYS_CHROOT".to_string()]),
				drop: None,
			}),
			seccomp_profile: Some(seccomp),
			..Default::default()
		}
	} else {
		SecurityContext {
			allow_privilege_escalation: Some(false),
			read_only_root_filesystem: Some(true),
			capabilities: Some(Capabilities {
				drop: Some(vec!["ALL".to_string()]),
				add: None,
			}),
			seccomp_profile: Some(seccomp),
			run_as_user: Some(DEFAULT_USER_GROUP),
			run_as_group: Some(DEFAULT_USER_GROUP),
			run_as_non_root: Some(true),
			..Default::default()
		}
	}
}

pub(crate) fn pod_security_context(needs_root: bool) -> PodSecurityContext {
	let (run_as_user, run_as_group, run_as_non_root) = if needs_root {
		(0, 0, false)
	} else {
		(DEFAULT_USER_GROUP, DEFAULT_USER_GROUP, true)
	};
	PodSecurityContext {
		run_as_non_root: Some(run_as_non_root),
		run_as_user: Some(run_as_user),
		run_as_group: Some(run_as_group),
		..Default::default()
	}
}

pub(crate) fn resource_requirements(cpu_limit: Option<&str>) -> ResourceRequirements {
	let mut requests = BTreeMap::new();
	requests.insert("cpu".to_string(), Quantity(CPU_REQUEST.to_string()));
	requests.insert("memory".to_string(), Quantity(MEMORY_REQUEST.to_string()));
	requests.insert(
		"ephemeral-storage".to_string(),
		Quantity(EPHEMERAL_STORAGE_REQUEST.to_string()),
	);

	let mut limits = BTreeMap::new();
	limits.insert("memory".to_string(), Quantity(MEMORY_LIMIT.to_string()));
	limits.insert(
		"ephemeral-storage".to_string(),
		Quantity(EPHEMERAL_STORAGE_LIMIT.to_string()),
	);
	if let Some(cpu) = cpu_limit {
		limits.insert("cpu".to_string(), Quantity(cpu.to_string()));
	}

	ResourceRequirements {
		requests: Some(requests),
		limits: Some(limits),
		..Default::default()
	}
}

pub(crate) fn exposer_labels(
	pvc_name: &str,
	local_port: u16,
	nfs: bool,
) -> BTreeMap<String, String> {
	let mut labels = BTreeMap::new();
	labels.insert(LABEL_APP.to_string(), APP_LABEL_VALUE.to_string());
	labels.insert(LABEL_PVC_NAME.to_string(), pvc_name.to_string());
	labels.insert(LABEL_PORT_NUMBER.to_string(), local_port.to_string());
	if nfs {
		labels.insert(LABEL_BACKEND.to_string(), BACKEND_LABEL_NFS.to_string());
	}
	labels
}

pub(crate) fn image_pull_secrets(opts: &ExposerOptions) -> Option<Vec<LocalObjectReference>> {
	opts.image_secret.as_ref().map(|name| {
		vec![LocalObjectReference {
			name: name.clone(),
		}]
	})
}

/// Attach the PVC to the pod's first container at `/volume`.
pub(crate) fn attach_pvc(pod: &mut Pod, pvc_name: &str) {
	let Some(spec) = pod.spec.as_mut() else {
		return;
	};
	if let Some(container) = spec.containers.first_mut() {
		container.volume_mounts = Some(vec![VolumeMount {
			name: PVC_VOLUME.to_string(),
			mount_path: VOLUME_MOUNT_PATH.to_string(),
			..Default::default()
		}]);
	}
	spec.volumes = Some(vec![Volume {
		name: PVC_VOLUME.to_string(),
		persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
			claim_name: pvc_name.to_string(),
			read_only: None,
		}),
		..Default::default()
	}]);
}

/// Mount of an existing pod volume at the path the server exports.
pub(crate) fn volume_mount(volume_name: &str) -> VolumeMount {
	VolumeMount {
		name: volume_name.to_string(),
		mount_path: VOLUME_MOUNT_PATH.to_string(),
		..Default::default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn default_opts() -> ExposerOptions {
		ExposerOptions::default()
	}

	#[test]
	fn test_build_ssh_pod_spec_basic() {
		let pod = build_ssh_pod_spec("volume-exposer-abc12", 4242, "pvc-1", "PUBKEY", &default_opts());

		assert_eq!(pod.metadata.name.as_deref(), Some("volume-exposer-abc12"));

		let labels = pod.metadata.labels.unwrap();
		assert_eq!(labels.get(LABEL_APP), Some(&APP_LABEL_VALUE.to_string()));
		assert_eq!(labels.get(LABEL_PVC_NAME), Some(&"pvc-1".to_string()));
		assert_eq!(labels.get(LABEL_PORT_NUMBER), Some(&"4242".to_string()));
		assert!(!labels.contains_key(LABEL_BACKEND));

		let spec = pod.spec.unwrap();
		assert_eq!(spec.containers.len(), 1);

		let container = &spec.containers[0];
		assert_eq!(container.name, "volume-exposer");
		assert_eq!(container.image.as_deref(), Some(SSH_IMAGE));
		assert_eq!(container.image_pull_policy.as_deref(), Some("Always"));

		let ports = container.ports.as_ref().unwrap();
		assert_eq!(ports[0].container_port, DEFAULT_SSH_PORT);

		let env = container.env.as_ref().unwrap();
		let names: Vec<_> = env.iter().map(|e| e.name.as_str()).collect();
		assert_eq!(names, vec!["SSH_PUBLIC_KEY", "SSH_PORT", "NEEDS_ROOT"]);
		assert_eq!(env[1].value.as_deref(), Some("2137"));
		assert_eq!(env[2].value.as_deref(), Some("false"));
	}

	#[test]
	fn test_build_ssh_pod_spec_non_root_security() {
		let pod = build_ssh_pod_spec("volume-exposer-abc12", 4242, "pvc-1", "PUBKEY", &default_opts());
		let spec = pod.spec.unwrap();

		let pod_sc = spec.security_context.unwrap();
		assert_eq!(pod_sc.run_as_non_root, Some(true));
		assert_eq!(pod_sc.run_as_user, Some(DEFAULT_USER_GROUP));
		assert_eq!(pod_sc.run_as_group, Some(DEFAULT_USER_GROUP));

		let sc = spec.containers[0].security_context.as_ref().unwrap();
		assert_eq!(sc.allow_privilege_escalation, Some(false));
		assert_eq!(sc.read_only_root_filesystem, Some(true));
		assert_eq!(sc.run_as_non_root, Some(true));
		assert_eq!(
			sc.capabilities.as_ref().unwrap().drop,
			Some(vec!["ALL".to_string()])
		);
		assert_eq!(
			sc.seccomp_profile.as_ref().unwrap().type_,
			"RuntimeDefault"
		);
	}

	#[test]
	fn test_build_ssh_pod_spec_root_security() {
		let opts = ExposerOptions {
			needs_root: true,
			..Default::default()
		};
		let pod = build_ssh_pod_spec("volume-exposer-abc12", 4242, "pvc-1", "PUBKEY", &opts);
		let spec = pod.spec.unwrap();

		let pod_sc = spec.security_context.unwrap();
		assert_eq!(pod_sc.run_as_non_root, Some(false));
		assert_eq!(pod_sc.run_as_user, Some(0));

		let container = &spec.containers[0];
		assert_eq!(container.image.as_deref(), Some(SSH_PRIVILEGED_IMAGE));

		let sc = container.security_context.as_ref().unwrap();
		assert_eq!(sc.allow_privilege_escalation, Some(true));
		assert_eq!(
			sc.capabilities.as_ref().unwrap().add,
			Some(vec!["SYS_ADMIN".to_string(), "SYS_CHROOT".to_string()])
		);

		let env = container.env.as_ref().unwrap();
		assert_eq!(env[2].value.as_deref(), Some("true"));
	}

	#[test]
	fn test_build_ssh_pod_spec_attaches_pvc() {
		let pod = build_ssh_pod_spec("volume-exposer-abc12", 4242, "pvc-1", "PUBKEY", &default_opts());
		let spec = pod.spec.unwrap();

		let volumes = spec.volumes.unwrap();
		assert_eq!(volumes.len(), 1);
		assert_eq!(
			volumes[0]
				.persistent_volume_claim
				.as_ref()
				.unwrap()
				.claim_name,
			"pvc-1"
		);

		let mounts = spec.containers[0].volume_mounts.as_ref().unwrap();
		assert_eq!(mounts[0].mount_path, "/volume");
		assert_eq!(mounts[0].name, volumes[0].name);
	}

	#[test]
	fn test_image_override_wins_over_root_selection() {
		let opts = ExposerOptions {
			needs_root: true,
			image: Some("example.com/custom:tag".to_string()),
			..Default::default()
		};
		let pod = build_ssh_pod_spec("volume-exposer-abc12", 4242, "pvc-1", "PUBKEY", &opts);
		let container = &pod.spec.unwrap().containers[0];
		assert_eq!(container.image.as_deref(), Some("example.com/custom:tag"));
	}

	#[test]
	fn test_resources_with_and_without_cpu_limit() {
		let resources = resource_requirements(None);
		let requests = resources.requests.unwrap();
		assert_eq!(requests.get("cpu"), Some(&Quantity("10m".to_string())));
		assert_eq!(requests.get("memory"), Some(&Quantity("50Mi".to_string())));
		assert_eq!(
			requests.get("ephemeral-storage"),
			Some(&Quantity("1Mi".to_string()))
		);
		let limits = resources.limits.unwrap();
		assert_eq!(limits.get("memory"), Some(&Quantity("100Mi".to_string())));
		assert!(!limits.contains_key("cpu"));

		let with_cpu = resource_requirements(Some("200m"));
		let limits = with_cpu.limits.unwrap();
		assert_eq!(limits.get("cpu"), Some(&Quantity("200m".to_string())));
	}

	#[test]
	fn test_image_pull_secrets() {
		assert!(image_pull_secrets(&default_opts()).is_none());

		let opts = ExposerOptions {
			image_secret: Some("registry-creds".to_string()),
			..Default::default()
		};
		let secrets = image_pull_secrets(&opts).unwrap();
		assert_eq!(secrets.len(), 1);
		assert_eq!(secrets[0].name, "registry-creds");
	}

	#[test]
	fn test_normalized_ssh_port() {
		assert_eq!(normalized_ssh_port(2137), 2137);
		assert_eq!(normalized_ssh_port(0), 0);
		assert_eq!(normalized_ssh_port(65535), 65535);
		assert_eq!(normalized_ssh_port(-1), DEFAULT_SSH_PORT);
		assert_eq!(normalized_ssh_port(65536), DEFAULT_SSH_PORT);
	}
}
