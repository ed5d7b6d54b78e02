// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Kubernetes client abstraction for pv-mounter.
//!
//! This crate provides:
//! - A trait-based client abstraction for testability
//! - Production implementation using the kube crate
//! - An in-memory mock used by the orchestrator tests
//! - Re-exported k8s-openapi types shared across the workspace

mod client;
mod error;
mod kube_client;
mod mock;
mod types;

pub use client::K8sClient;
pub use error::{K8sError, K8sResult};
pub use kube_client::KubeClient;
pub use mock::MockK8sClient;
pub use types::{
	Capabilities, Container, ContainerPort, ContainerState, ContainerStateRunning,
	ContainerStateTerminated, ContainerStateWaiting, ContainerStatus, EnvVar, EphemeralContainer,
	LocalObjectReference, ObjectMeta, PersistentVolume, PersistentVolumeClaim,
	PersistentVolumeClaimVolumeSource, Pod, PodCondition, PodSecurityContext, PodSpec, PodStatus,
	Quantity, ResourceRequirements, SeccompProfile, SecurityContext, Volume, VolumeMount,
};
