// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Image, port, and label constants for exposer workloads.

// single source for the SSH exposer image tag
macro_rules! image_version {
	() => {
		"v0.2.1"
	};
}

/// Default SSH exposer image (non-root sshd).
pub const SSH_IMAGE: &str = concat!("bfenski/volume-exposer:", image_version!());
/// SSH exposer image used when root access is requested.
pub const SSH_PRIVILEGED_IMAGE: &str =
	concat!("bfenski/volume-exposer-privileged:", image_version!());
/// NFS-Ganesha exposer image.
pub const NFS_IMAGE: &str = "bfenski/nfs-ganesha:latest";

/// Port sshd listens on inside the exposer.
pub const DEFAULT_SSH_PORT: i32 = 2137;
/// Port Ganesha listens on inside the exposer.
pub const DEFAULT_NFS_PORT: i32 = 2049;
/// Non-root uid/gid baked into the SSH exposer image.
pub const DEFAULT_USER_GROUP: i64 = 2137;

pub const LABEL_APP: &str = "app";
pub const APP_LABEL_VALUE: &str = "volume-exposer";
pub const LABEL_PVC_NAME: &str = "pvcName";
pub const LABEL_PORT_NUMBER: &str = "portNumber";
pub const LABEL_BACKEND: &str = "backend";
pub const BACKEND_LABEL_NFS: &str = "nfs";

pub(crate) const CPU_REQUEST: &str = "10m";
pub(crate) const MEMORY_REQUEST: &str = "50Mi";
pub(crate) const MEMORY_LIMIT: &str = "100Mi";
pub(crate) const EPHEMERAL_STORAGE_REQUEST: &str = "1Mi";
pub(crate) const EPHEMERAL_STORAGE_LIMIT: &str = "2Mi";

/// Caller-tunable knobs for exposer workloads, straight from the CLI.
#[derive(Debug, Clone, Default)]
pub struct ExposerOptions {
	/// Use the privileged image and run as uid 0.
	pub needs_root: bool,
	/// Override the server image for the chosen backend.
	pub image: Option<String>,
	/// Image pull secret name for private registries.
	pub image_secret: Option<String>,
	/// CPU limit for the exposer container (e.g. "200m").
	pub cpu_limit: Option<String>,
}
