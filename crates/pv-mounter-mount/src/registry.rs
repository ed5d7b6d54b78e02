// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Registry of temp key files, drained on SIGINT/SIGTERM.
//!
//! The registry object is created once at program start and passed
//! explicitly to whoever writes key material to disk; the signal
//! handler holds its own clone. Both cleanup paths (scoped removal
//! after the mount command returns, and the handler) may race, so
//! every operation tolerates already-removed files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Once};

use tokio::sync::watch;
use tracing::{info, warn};

static HANDLER_INSTALLED: Once = Once::new();

/// Process-scoped set of key-file paths awaiting cleanup.
#[derive(Clone, Default)]
pub struct TempKeyRegistry {
	paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl TempKeyRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
		self.paths.lock().unwrap_or_else(|e| e.into_inner())
	}

	pub fn register(&self, path: &Path) {
		self.lock().insert(path.to_path_buf());
	}

	pub fn unregister(&self, path: &Path) {
		self.lock().remove(path);
	}

	pub fn contains(&self, path: &Path) -> bool {
		self.lock().contains(path)
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	/// Unlink every registered file and drain the set. Idempotent;
	/// missing files are fine.
	pub fn cleanup_all(&self) {
		let drained: Vec<PathBuf> = self.lock().drain().collect();
		for path in drained {
			let _ = std::fs::remove_file(&path);
		}
	}
}

/// Install the SIGINT/SIGTERM hook that unlinks registered key files
/// and flips the shutdown channel. Installed at most once per process;
/// later calls are no-ops.
///
/// The handler never touches in-cluster resources: a signalled exit
/// leaves those to a subsequent `clean`.
pub fn install_cleanup_handler(registry: TempKeyRegistry, shutdown_tx: watch::Sender<bool>) {
	HANDLER_INSTALLED.call_once(|| {
		let result = ctrlc::set_handler(move || {
			info!("received termination signal, removing temp key files");
			registry.cleanup_all();
			let _ = shutdown_tx.send(true);
		});
		if let Err(e) = result {
			warn!(error = %e, "failed to install signal handler");
		}
	});
}
