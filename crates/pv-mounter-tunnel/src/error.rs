// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Errors from establishing or probing the port-forward tunnel.
#[derive(Error, Debug)]
pub enum TunnelError {
	#[error("failed to start kubectl port-forward: {0}")]
	Spawn(#[source] std::io::Error),

	#[error("timed out waiting for the {service} server on port {port}")]
	ReadyTimeout { service: &'static str, port: u16 },

	#[error("cancelled")]
	Cancelled,
}
