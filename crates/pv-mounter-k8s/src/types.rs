// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub use k8s_openapi::api::core::v1::{
	Capabilities, Container, ContainerPort, ContainerState, ContainerStateRunning,
	ContainerStateTerminated, ContainerStateWaiting, ContainerStatus, EnvVar, EphemeralContainer,
	LocalObjectReference, PersistentVolume, PersistentVolumeClaim,
	PersistentVolumeClaimVolumeSource, Pod, PodCondition, PodSecurityContext, PodSpec, PodStatus,
	ResourceRequirements, SeccompProfile, SecurityContext, Volume, VolumeMount,
};
pub use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
