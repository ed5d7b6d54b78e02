// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::K8sError;
use crate::types::{EphemeralContainer, PersistentVolume, PersistentVolumeClaim, Pod};

/// Trait over the Kubernetes operations the mounter needs.
///
/// This abstraction keeps the orchestrators testable against an
/// in-memory mock while the production path goes through the kube
/// client with the operator's own kubeconfig.
#[async_trait]
pub trait K8sClient: Send + Sync {
	/// Get a PersistentVolumeClaim by name from the specified namespace.
	async fn get_pvc(&self, namespace: &str, name: &str)
		-> Result<PersistentVolumeClaim, K8sError>;

	/// Get a cluster-scoped PersistentVolume by name.
	async fn get_pv(&self, name: &str) -> Result<PersistentVolume, K8sError>;

	/// Get a specific pod by name from the specified namespace.
	async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, K8sError>;

	/// List pods in a namespace, optionally filtered by label selector.
	async fn list_pods(
		&self,
		namespace: &str,
		label_selector: Option<&str>,
	) -> Result<Vec<Pod>, K8sError>;

	/// Create a new pod in the specified namespace.
	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError>;

	/// Delete a pod by name from the specified namespace.
	async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), K8sError>;

	/// Add an ephemeral container to a running pod.
	///
	/// Implementations MUST use a strategic-merge patch against the
	/// `ephemeralcontainers` subresource; the pod spec itself is
	/// immutable and cannot be replaced wholesale.
	async fn patch_ephemeral_containers(
		&self,
		namespace: &str,
		pod_name: &str,
		container: EphemeralContainer,
	) -> Result<(), K8sError>;
}
