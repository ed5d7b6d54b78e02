// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One-shot cluster probe: is this PVC safely mountable by a fresh pod,
//! or is a workload already holding it?

use pv_mounter_k8s::{K8sClient, PersistentVolumeClaim, Pod};
use tracing::debug;

use crate::error::ExposerError;

const ACCESS_MODE_RWO: &str = "ReadWriteOnce";
const PHASE_BOUND: &str = "Bound";

/// Outcome of probing a PVC for direct mountability.
///
/// When `mountable_directly` is false, `pod_using_pvc` names the first
/// pod (in list order) whose spec references the claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvcVerdict {
	pub mountable_directly: bool,
	pub pod_using_pvc: Option<String>,
}

/// Fetch the PVC and require it to be bound.
pub async fn check_pvc_usage(
	client: &dyn K8sClient,
	namespace: &str,
	pvc_name: &str,
) -> Result<PersistentVolumeClaim, ExposerError> {
	let pvc = client.get_pvc(namespace, pvc_name).await?;
	let phase = pvc
		.status
		.as_ref()
		.and_then(|status| status.phase.as_deref());
	if phase != Some(PHASE_BOUND) {
		return Err(ExposerError::PvcNotBound {
			name: pvc_name.to_string(),
		});
	}
	Ok(pvc)
}

/// Decide whether the PVC can be attached to a fresh exposer pod.
///
/// A volume without ReadWriteOnce in its access modes can always take
/// another consumer. For RWO volumes, any pod already mounting the
/// claim forces the ephemeral strategy against that pod.
pub async fn check_pv_access_mode(
	client: &dyn K8sClient,
	pvc: &PersistentVolumeClaim,
	namespace: &str,
) -> Result<PvcVerdict, ExposerError> {
	let pvc_name = pvc.metadata.name.clone().unwrap_or_default();
	let pv_name = pvc
		.spec
		.as_ref()
		.and_then(|spec| spec.volume_name.clone())
		.ok_or_else(|| ExposerError::NoBoundVolume {
			name: pvc_name.clone(),
		})?;

	let pv = client.get_pv(&pv_name).await?;
	let access_modes = pv
		.spec
		.as_ref()
		.and_then(|spec| spec.access_modes.clone())
		.unwrap_or_default();

	if access_modes.iter().any(|mode| mode == ACCESS_MODE_RWO) {
		let pods = client.list_pods(namespace, None).await?;
		if let Some(pod_name) = find_pod_using_pvc(&pods, &pvc_name) {
			debug!(pvc = %pvc_name, pod = %pod_name, "PVC is held by a running pod");
			return Ok(PvcVerdict {
				mountable_directly: false,
				pod_using_pvc: Some(pod_name),
			});
		}
	}

	Ok(PvcVerdict {
		mountable_directly: true,
		pod_using_pvc: None,
	})
}

/// First pod (in list order) whose volumes reference the claim.
pub fn find_pod_using_pvc(pods: &[Pod], pvc_name: &str) -> Option<String> {
	pods.iter()
		.find(|pod| {
			pod.spec
				.as_ref()
				.and_then(|spec| spec.volumes.as_ref())
				.map(|volumes| {
					volumes.iter().any(|volume| {
						volume
							.persistent_volume_claim
							.as_ref()
							.map(|claim| claim.claim_name == pvc_name)
							.unwrap_or(false)
					})
				})
				.unwrap_or(false)
		})
		.and_then(|pod| pod.metadata.name.clone())
}

#[cfg(test)]
mod tests {
	use super::*;
	use pv_mounter_k8s::{MockK8sClient, ObjectMeta, PersistentVolume, Volume};
	use pv_mounter_k8s::{PersistentVolumeClaimVolumeSource, PodSpec};
	use k8s_openapi::api::core::v1::{
		PersistentVolumeClaimSpec, PersistentVolumeClaimStatus, PersistentVolumeSpec,
	};

	fn bound_pvc(name: &str, volume_name: &str) -> PersistentVolumeClaim {
		PersistentVolumeClaim {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				..Default::default()
			},
			spec: Some(PersistentVolumeClaimSpec {
				volume_name: Some(volume_name.to_string()),
				..Default::default()
			}),
			status: Some(PersistentVolumeClaimStatus {
				phase: Some("Bound".to_string()),
				..Default::default()
			}),
		}
	}

	fn pv_with_modes(name: &str, modes: &[&str]) -> PersistentVolume {
		PersistentVolume {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				..Default::default()
			},
			spec: Some(PersistentVolumeSpec {
				access_modes: Some(modes.iter().map(|m| m.to_string()).collect()),
				..Default::default()
			}),
			..Default::default()
		}
	}

	fn pod_mounting(name: &str, claim: &str) -> Pod {
		Pod {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				..Default::default()
			},
			spec: Some(PodSpec {
				containers: vec![],
				volumes: Some(vec![Volume {
					name: "data".to_string(),
					persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
						claim_name: claim.to_string(),
						read_only: None,
					}),
					..Default::default()
				}]),
				..Default::default()
			}),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn test_check_pvc_usage_requires_bound() {
		let client = MockK8sClient::new();
		let mut pvc = bound_pvc("pvc-1", "pv-1");
		pvc.status.as_mut().unwrap().phase = Some("Pending".to_string());
		client.insert_pvc("default", pvc);

		let err = check_pvc_usage(&client, "default", "pvc-1")
			.await
			.unwrap_err();
		assert!(matches!(err, ExposerError::PvcNotBound { .. }));
	}

	#[tokio::test]
	async fn test_check_pvc_usage_missing_pvc() {
		let client = MockK8sClient::new();
		let err = check_pvc_usage(&client, "default", "ghost")
			.await
			.unwrap_err();
		assert!(matches!(err, ExposerError::Api(_)));
	}

	#[tokio::test]
	async fn test_rwx_volume_is_directly_mountable() {
		let client = MockK8sClient::new();
		client.insert_pvc("default", bound_pvc("pvc-1", "pv-1"));
		client.insert_pv(pv_with_modes("pv-1", &["ReadWriteMany"]));
		// A pod mounts it, but RWX volumes take additional consumers
		client.insert_pod("default", pod_mounting("worker-7", "pvc-1"));

		let pvc = check_pvc_usage(&client, "default", "pvc-1").await.unwrap();
		let verdict = check_pv_access_mode(&client, &pvc, "default")
			.await
			.unwrap();
		assert!(verdict.mountable_directly);
		assert_eq!(verdict.pod_using_pvc, None);
	}

	#[tokio::test]
	async fn test_unmounted_rwo_volume_is_directly_mountable() {
		let client = MockK8sClient::new();
		client.insert_pvc("default", bound_pvc("pvc-2", "pv-2"));
		client.insert_pv(pv_with_modes("pv-2", &["ReadWriteOnce"]));

		let pvc = check_pvc_usage(&client, "default", "pvc-2").await.unwrap();
		let verdict = check_pv_access_mode(&client, &pvc, "default")
			.await
			.unwrap();
		assert!(verdict.mountable_directly);
	}

	#[tokio::test]
	async fn test_mounted_rwo_volume_names_the_holder() {
		let client = MockK8sClient::new();
		client.insert_pvc("default", bound_pvc("pvc-3", "pv-3"));
		client.insert_pv(pv_with_modes("pv-3", &["ReadWriteOnce"]));
		client.insert_pod("default", pod_mounting("other", "unrelated-pvc"));
		client.insert_pod("default", pod_mounting("worker-7", "pvc-3"));
		client.insert_pod("default", pod_mounting("worker-8", "pvc-3"));

		let pvc = check_pvc_usage(&client, "default", "pvc-3").await.unwrap();
		let verdict = check_pv_access_mode(&client, &pvc, "default")
			.await
			.unwrap();
		assert!(!verdict.mountable_directly);
		// first pod in list order wins the tie-break
		assert_eq!(verdict.pod_using_pvc.as_deref(), Some("worker-7"));
	}

	#[tokio::test]
	async fn test_unbound_volume_name_is_a_precondition_failure() {
		let client = MockK8sClient::new();
		let mut pvc = bound_pvc("pvc-4", "pv-4");
		pvc.spec.as_mut().unwrap().volume_name = None;
		client.insert_pvc("default", pvc.clone());

		let err = check_pv_access_mode(&client, &pvc, "default")
			.await
			.unwrap_err();
		assert!(matches!(err, ExposerError::NoBoundVolume { .. }));
	}
}
