// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! pv-mounter: mount Kubernetes PVCs onto local directories.
//!
//! The binary is a thin shell: parse arguments (with environment
//! fallbacks), initialise tracing, install the temp-key signal hook,
//! and hand off to the orchestrators in pv-mounter-core.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pv_mounter_common::Backend;
use pv_mounter_core::{CleanRequest, MountRequest};
use pv_mounter_k8s::KubeClient;
use pv_mounter_mount::{install_cleanup_handler, TempKeyRegistry};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Mount Kubernetes PVCs locally over SSHFS or NFS
#[derive(Parser, Debug)]
#[command(name = "pv-mounter", version, about)]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Mount a PVC onto a local directory
	Mount(MountArgs),
	/// Tear down everything a previous mount created
	Clean(CleanArgs),
}

#[derive(Args, Debug, Clone)]
struct MountArgs {
	/// Kubernetes namespace containing the PVC
	namespace: String,
	/// Name of the PersistentVolumeClaim to mount
	pvc_name: String,
	/// Local directory to mount onto (must exist)
	local_mount_point: String,

	/// Run the exposer as root and mount as the root user (SSH backend)
	#[arg(long, env = "NEEDS_ROOT")]
	needs_root: bool,
	/// Print the generated private key and live subprocess output
	#[arg(long, env = "DEBUG")]
	debug: bool,
	/// Override the exposer image for the chosen backend
	#[arg(long, env = "IMAGE")]
	image: Option<String>,
	/// Image pull secret name for private registries
	#[arg(long, env = "IMAGE_SECRET")]
	image_secret: Option<String>,
	/// CPU limit for the exposer container (e.g. 200m)
	#[arg(long, env = "CPU_LIMIT")]
	cpu_limit: Option<String>,
	/// Mount protocol
	#[arg(long, env = "BACKEND", value_enum, default_value_t = Backend::Ssh)]
	backend: Backend,
}

#[derive(Args, Debug, Clone)]
struct CleanArgs {
	/// Kubernetes namespace containing the PVC
	namespace: String,
	/// Name of the PersistentVolumeClaim to clean up
	pvc_name: String,
	/// Local directory the PVC was mounted onto
	local_mount_point: String,

	/// Mount protocol the PVC was mounted with
	#[arg(long, env = "BACKEND", value_enum, default_value_t = Backend::Ssh)]
	backend: Backend,
}

fn init_tracing(debug: bool) {
	let default_level = if debug { "debug" } else { "info" };
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.init();
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();

	let debug = match &cli.command {
		Command::Mount(args) => args.debug,
		Command::Clean(_) => false,
	};
	init_tracing(debug);

	let registry = TempKeyRegistry::new();
	let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
	install_cleanup_handler(registry.clone(), shutdown_tx);

	let result = match cli.command {
		Command::Mount(args) => run_mount(args, &registry, &mut shutdown_rx).await,
		Command::Clean(args) => run_clean(args).await,
	};

	if let Err(e) = result {
		eprintln!("Error: {e:#}");
		std::process::exit(1);
	}
}

async fn run_mount(
	args: MountArgs,
	registry: &TempKeyRegistry,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> anyhow::Result<()> {
	let client = KubeClient::new()
		.await
		.context("failed to connect to the cluster")?;

	let request = MountRequest {
		namespace: args.namespace,
		pvc_name: args.pvc_name,
		local_mount_point: args.local_mount_point,
		backend: args.backend,
		needs_root: args.needs_root,
		debug: args.debug,
		image: args.image,
		image_secret: args.image_secret,
		cpu_limit: args.cpu_limit,
	};

	pv_mounter_core::mount(&client, &request, registry, shutdown_rx).await?;
	Ok(())
}

async fn run_clean(args: CleanArgs) -> anyhow::Result<()> {
	let client = KubeClient::new()
		.await
		.context("failed to connect to the cluster")?;

	let request = CleanRequest {
		namespace: args.namespace,
		pvc_name: args.pvc_name,
		local_mount_point: args.local_mount_point,
		backend: args.backend,
	};

	pv_mounter_core::clean(&client, &request).await?;
	Ok(())
}
