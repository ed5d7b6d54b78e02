// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The local end of the tunnel: a `kubectl port-forward` child process
//! and the backend-specific probes that decide when the tunnel is
//! actually usable.
//!
//! `kubectl port-forward` accepts local connections before the remote
//! side of the tunnel is wired, so plain TCP connect success means
//! nothing. Each backend gets a probe that checks for its server's
//! actual behaviour instead.

mod error;
mod portforward;
mod readiness;

pub use error::TunnelError;
pub use portforward::PortForward;
pub use readiness::{wait_for_nfs_ready, wait_for_ssh_ready, TUNNEL_READY_TIMEOUT};
