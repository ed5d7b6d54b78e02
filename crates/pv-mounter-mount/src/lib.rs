// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workstation-side mounting for pv-mounter.
//!
//! This crate provides:
//! - The temp key-file registry drained by the signal handler
//! - 0600 key-file creation for sshfs
//! - The sshfs and NFS mount drivers and the matching unmount
//! - Preflight checks for the local client binaries

mod error;
mod keyfile;
mod nfs;
mod preflight;
mod registry;
mod sshfs;
mod unmount;

pub use error::MountCmdError;
pub use keyfile::{write_temp_key_file, TempKeyFile};
pub use nfs::mount_over_nfs;
pub use preflight::check_local_client;
pub use registry::{install_cleanup_handler, TempKeyRegistry};
pub use sshfs::mount_over_sshfs;
pub use unmount::unmount_local;
