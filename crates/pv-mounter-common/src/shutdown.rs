// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cancellation plumbing shared by every polling loop.
//!
//! A single `watch::channel(false)` is created at startup; the signal
//! handler flips it to `true`. Long-running loops `select!` on
//! [`cancelled`] so an interrupt unwinds through the normal error path
//! and triggers the same rollback as any other failure.

use tokio::sync::watch;

/// Resolves once the shutdown flag is set. Never resolves if the sender
/// is dropped without signalling, so callers do not busy-loop on a
/// closed channel.
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
	loop {
		if *rx.borrow() {
			return;
		}
		if rx.changed().await.is_err() {
			std::future::pending::<()>().await;
		}
	}
}
