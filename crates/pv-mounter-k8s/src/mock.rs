// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory [`K8sClient`] used by orchestrator and probe tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::types::{EphemeralContainer, PersistentVolume, PersistentVolumeClaim, Pod};

#[derive(Default)]
struct MockState {
	pvcs: HashMap<(String, String), PersistentVolumeClaim>,
	pvs: HashMap<String, PersistentVolume>,
	pods: HashMap<(String, String), Pod>,
	pod_order: Vec<(String, String)>,
	created_pods: Vec<(String, String)>,
	deleted_pods: Vec<(String, String)>,
	ephemeral_patches: Vec<(String, String, EphemeralContainer)>,
}

/// Mock client backed by in-memory maps.
///
/// Pods are listed in insertion order so tests can rely on the
/// first-match tie-breaks the orchestrators use.
#[derive(Default)]
pub struct MockK8sClient {
	state: Mutex<MockState>,
}

impl MockK8sClient {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}

	pub fn insert_pvc(&self, namespace: &str, pvc: PersistentVolumeClaim) {
		let name = pvc.metadata.name.clone().unwrap_or_default();
		self.lock()
			.pvcs
			.insert((namespace.to_string(), name), pvc);
	}

	pub fn insert_pv(&self, pv: PersistentVolume) {
		let name = pv.metadata.name.clone().unwrap_or_default();
		self.lock().pvs.insert(name, pv);
	}

	pub fn insert_pod(&self, namespace: &str, pod: Pod) {
		let name = pod.metadata.name.clone().unwrap_or_default();
		let key = (namespace.to_string(), name);
		let mut state = self.lock();
		if !state.pods.contains_key(&key) {
			state.pod_order.push(key.clone());
		}
		state.pods.insert(key, pod);
	}

	/// Names of pods created through the client, in call order.
	pub fn created_pods(&self) -> Vec<(String, String)> {
		self.lock().created_pods.clone()
	}

	/// Names of pods deleted through the client, in call order.
	pub fn deleted_pods(&self) -> Vec<(String, String)> {
		self.lock().deleted_pods.clone()
	}

	/// Ephemeral-container patches applied through the client.
	pub fn ephemeral_patches(&self) -> Vec<(String, String, EphemeralContainer)> {
		self.lock().ephemeral_patches.clone()
	}
}

fn matches_selector(pod: &Pod, selector: &str) -> bool {
	let labels = pod.metadata.labels.clone().unwrap_or_default();
	selector.split(',').all(|requirement| {
		match requirement.split_once('=') {
			Some((key, value)) => labels.get(key.trim()).map(String::as_str) == Some(value.trim()),
			None => false,
		}
	})
}

#[async_trait]
impl K8sClient for MockK8sClient {
	async fn get_pvc(
		&self,
		namespace: &str,
		name: &str,
	) -> Result<PersistentVolumeClaim, K8sError> {
		self.lock()
			.pvcs
			.get(&(namespace.to_string(), name.to_string()))
			.cloned()
			.ok_or_else(|| K8sError::PvcNotFound { name: name.into() })
	}

	async fn get_pv(&self, name: &str) -> Result<PersistentVolume, K8sError> {
		self.lock()
			.pvs
			.get(name)
			.cloned()
			.ok_or_else(|| K8sError::PvNotFound { name: name.into() })
	}

	async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, K8sError> {
		self.lock()
			.pods
			.get(&(namespace.to_string(), name.to_string()))
			.cloned()
			.ok_or_else(|| K8sError::PodNotFound { name: name.into() })
	}

	async fn list_pods(
		&self,
		namespace: &str,
		label_selector: Option<&str>,
	) -> Result<Vec<Pod>, K8sError> {
		let state = self.lock();
		let pods = state
			.pod_order
			.iter()
			.filter(|(ns, _)| ns == namespace)
			.filter_map(|key| state.pods.get(key))
			.filter(|pod| label_selector.map_or(true, |s| matches_selector(pod, s)))
			.cloned()
			.collect();
		Ok(pods)
	}

	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError> {
		let name = pod.metadata.name.clone().unwrap_or_default();
		let key = (namespace.to_string(), name.clone());
		let mut state = self.lock();
		state.created_pods.push(key.clone());
		if !state.pods.contains_key(&key) {
			state.pod_order.push(key.clone());
		}
		state.pods.insert(key, pod.clone());
		Ok(pod)
	}

	async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), K8sError> {
		let key = (namespace.to_string(), name.to_string());
		let mut state = self.lock();
		if state.pods.remove(&key).is_none() {
			return Err(K8sError::PodNotFound { name: name.into() });
		}
		state.pod_order.retain(|k| k != &key);
		state.deleted_pods.push(key);
		Ok(())
	}

	async fn patch_ephemeral_containers(
		&self,
		namespace: &str,
		pod_name: &str,
		container: EphemeralContainer,
	) -> Result<(), K8sError> {
		let key = (namespace.to_string(), pod_name.to_string());
		let mut state = self.lock();
		let Some(pod) = state.pods.get_mut(&key) else {
			return Err(K8sError::PodNotFound {
				name: pod_name.into(),
			});
		};
		pod.spec
			.get_or_insert_with(Default::default)
			.ephemeral_containers
			.get_or_insert_with(Vec::new)
			.push(container.clone());
		state
			.ephemeral_patches
			.push((namespace.to_string(), pod_name.to_string(), container));
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::ObjectMeta;

	fn pod_named(name: &str, labels: &[(&str, &str)]) -> Pod {
		Pod {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				labels: Some(
					labels
						.iter()
						.map(|(k, v)| (k.to_string(), v.to_string()))
						.collect(),
				),
				..Default::default()
			},
			..Default::default()
		}
	}

	#[tokio::test]
	async fn test_list_pods_respects_selector() {
		let client = MockK8sClient::new();
		client.insert_pod("default", pod_named("a", &[("app", "volume-exposer")]));
		client.insert_pod("default", pod_named("b", &[("app", "other")]));

		let pods = client
			.list_pods("default", Some("app=volume-exposer"))
			.await
			.unwrap();
		assert_eq!(pods.len(), 1);
		assert_eq!(pods[0].metadata.name.as_deref(), Some("a"));
	}

	#[tokio::test]
	async fn test_list_pods_preserves_insertion_order() {
		let client = MockK8sClient::new();
		client.insert_pod("default", pod_named("first", &[]));
		client.insert_pod("default", pod_named("second", &[]));

		let pods = client.list_pods("default", None).await.unwrap();
		let names: Vec<_> = pods
			.iter()
			.map(|p| p.metadata.name.clone().unwrap())
			.collect();
		assert_eq!(names, vec!["first", "second"]);
	}

	#[tokio::test]
	async fn test_delete_missing_pod_is_not_found() {
		let client = MockK8sClient::new();
		let err = client.delete_pod("default", "ghost").await.unwrap_err();
		assert!(matches!(err, K8sError::PodNotFound { .. }));
	}

	#[tokio::test]
	async fn test_ephemeral_patch_lands_in_pod_spec() {
		let client = MockK8sClient::new();
		client.insert_pod("default", pod_named("worker", &[]));

		let container = EphemeralContainer {
			name: "debug-abcde".to_string(),
			..Default::default()
		};
		client
			.patch_ephemeral_containers("default", "worker", container)
			.await
			.unwrap();

		let pod = client.get_pod("default", "worker").await.unwrap();
		let ephemerals = pod.spec.unwrap().ephemeral_containers.unwrap();
		assert_eq!(ephemerals.len(), 1);
		assert_eq!(ephemerals[0].name, "debug-abcde");
	}
}
