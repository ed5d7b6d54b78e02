// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared primitives for pv-mounter.
//!
//! This crate provides:
//! - Per-invocation ECDSA P-256 keypair generation for the SSH backend
//! - Random exposer names and local ports
//! - DNS-1123 validation for operator-supplied resource names
//! - The backend selector shared by the CLI and the orchestrators

mod backend;
mod keys;
mod names;
pub mod shutdown;
mod validate;

pub use backend::Backend;
pub use keys::{generate_keypair, KeyError, SshKeyPair};
pub use names::{
	exposer_pod_name, nfs_ephemeral_name, random_local_port, random_suffix, ssh_ephemeral_name,
	NFS_EPHEMERAL_PREFIX, SSH_EPHEMERAL_PREFIX,
};
pub use validate::{validate_kubernetes_name, ValidationError};
