// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::Client;
use tracing::debug;

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::types::{EphemeralContainer, PersistentVolume, PersistentVolumeClaim, Pod};

/// Production client implementation using the kube crate.
pub struct KubeClient {
	client: Client,
}

impl KubeClient {
	/// Create a new KubeClient that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. In-cluster service account (when running in K8s)
	/// 2. KUBECONFIG environment variable
	/// 3. ~/.kube/config
	pub async fn new() -> Result<Self, K8sError> {
		let client = Client::try_default()
			.await
			.map_err(|e| K8sError::ClientSetup {
				message: e.to_string(),
			})?;
		debug!("Kubernetes client initialized");
		Ok(Self { client })
	}

	fn pods(&self, namespace: &str) -> Api<Pod> {
		Api::namespaced(self.client.clone(), namespace)
	}
}

#[async_trait]
impl K8sClient for KubeClient {
	async fn get_pvc(
		&self,
		namespace: &str,
		name: &str,
	) -> Result<PersistentVolumeClaim, K8sError> {
		let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
		match pvcs.get(name).await {
			Ok(pvc) => Ok(pvc),
			Err(kube::Error::Api(err)) if err.code == 404 => {
				Err(K8sError::PvcNotFound { name: name.into() })
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn get_pv(&self, name: &str) -> Result<PersistentVolume, K8sError> {
		let pvs: Api<PersistentVolume> = Api::all(self.client.clone());
		match pvs.get(name).await {
			Ok(pv) => Ok(pv),
			Err(kube::Error::Api(err)) if err.code == 404 => {
				Err(K8sError::PvNotFound { name: name.into() })
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, K8sError> {
		match self.pods(namespace).get(name).await {
			Ok(pod) => Ok(pod),
			Err(kube::Error::Api(err)) if err.code == 404 => {
				Err(K8sError::PodNotFound { name: name.into() })
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn list_pods(
		&self,
		namespace: &str,
		label_selector: Option<&str>,
	) -> Result<Vec<Pod>, K8sError> {
		let lp = match label_selector {
			Some(selector) => ListParams::default().labels(selector),
			None => ListParams::default(),
		};
		let pod_list = self.pods(namespace).list(&lp).await?;
		Ok(pod_list.items)
	}

	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError> {
		let pod = self
			.pods(namespace)
			.create(&PostParams::default(), &pod)
			.await?;
		Ok(pod)
	}

	async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), K8sError> {
		match self
			.pods(namespace)
			.delete(name, &DeleteParams::default())
			.await
		{
			Ok(_) => Ok(()),
			Err(kube::Error::Api(err)) if err.code == 404 => {
				Err(K8sError::PodNotFound { name: name.into() })
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn patch_ephemeral_containers(
		&self,
		namespace: &str,
		pod_name: &str,
		container: EphemeralContainer,
	) -> Result<(), K8sError> {
		let patch = serde_json::json!({
			"spec": {
				"ephemeralContainers": [container]
			}
		});
		debug!(pod = %pod_name, "patching ephemeralcontainers subresource");
		match self
			.pods(namespace)
			.patch_subresource(
				"ephemeralcontainers",
				pod_name,
				&PatchParams::default(),
				&Patch::Strategic(patch),
			)
			.await
		{
			Ok(_) => Ok(()),
			Err(kube::Error::Api(err)) if err.code == 404 => Err(K8sError::PodNotFound {
				name: pod_name.into(),
			}),
			Err(e) => Err(e.into()),
		}
	}
}
