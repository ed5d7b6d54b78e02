// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mount and clean orchestration for pv-mounter.
//!
//! `mount` probes the PVC, picks one of four strategies (standalone or
//! ephemeral exposer, SSH or NFS), provisions it, tunnels to it, and
//! runs the local mount command. `clean` walks the same resources in
//! reverse and is safe to re-run.

mod clean;
mod error;
mod mount;

pub use clean::{clean, clean_cluster_resources, CleanRequest};
pub use error::Error;
pub use mount::{mount, MountRequest, Strategy};
