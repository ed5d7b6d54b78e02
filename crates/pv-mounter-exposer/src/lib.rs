// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exposer workload provisioning for pv-mounter.
//!
//! This crate owns the in-cluster half of a mount:
//! - Probing a PVC for direct mountability (access mode + current users)
//! - Building exposer pod specs and ephemeral-container specs for the
//!   SSH and NFS backends
//! - Creating/patching those workloads and waiting for them to come up

mod config;
mod ephemeral;
mod error;
mod nfs;
mod pod;
mod probe;
mod waiter;

pub use config::{
	ExposerOptions, APP_LABEL_VALUE, BACKEND_LABEL_NFS, DEFAULT_NFS_PORT, DEFAULT_SSH_PORT,
	DEFAULT_USER_GROUP, LABEL_APP, LABEL_BACKEND, LABEL_PORT_NUMBER, LABEL_PVC_NAME, NFS_IMAGE,
	SSH_IMAGE, SSH_PRIVILEGED_IMAGE,
};
pub use ephemeral::{
	build_ssh_ephemeral_spec, find_running_ephemeral, inject_ssh_ephemeral, pvc_volume_name,
	workload_pod_uid,
};
pub use error::ExposerError;
pub use nfs::{
	build_nfs_ephemeral_spec, build_nfs_pod_spec, find_running_nfs_ephemeral,
	inject_nfs_ephemeral,
};
pub use pod::{build_ssh_pod_spec, create_exposer_pod};
pub use probe::{check_pv_access_mode, check_pvc_usage, find_pod_using_pvc, PvcVerdict};
pub use waiter::{wait_for_ephemeral_running, wait_for_pod_ready};
