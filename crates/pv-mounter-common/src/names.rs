// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use rand::Rng;

/// Name prefix shared by SSH exposer pods and ephemeral containers.
pub const SSH_EPHEMERAL_PREFIX: &str = "volume-exposer-ephemeral-";
/// Name prefix of NFS ephemeral containers.
pub const NFS_EPHEMERAL_PREFIX: &str = "nfs-ganesha-ephemeral-";

const SUFFIX_LEN: usize = 5;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Five lowercase-alphanumeric characters, unique enough per invocation.
pub fn random_suffix() -> String {
	let mut rng = rand::thread_rng();
	(0..SUFFIX_LEN)
		.map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
		.collect()
}

/// Name for a standalone exposer pod.
pub fn exposer_pod_name() -> String {
	format!("volume-exposer-{}", random_suffix())
}

/// Name for an SSH ephemeral container.
pub fn ssh_ephemeral_name() -> String {
	format!("{}{}", SSH_EPHEMERAL_PREFIX, random_suffix())
}

/// Name for an NFS ephemeral container.
pub fn nfs_ephemeral_name() -> String {
	format!("{}{}", NFS_EPHEMERAL_PREFIX, random_suffix())
}

/// Random local end for the port-forward, clear of the privileged range.
pub fn random_local_port() -> u16 {
	rand::thread_rng().gen_range(1024..=65535)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn is_suffix(s: &str) -> bool {
		s.len() == SUFFIX_LEN
			&& s.bytes()
				.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
	}

	#[test]
	fn test_pod_name_shape() {
		let name = exposer_pod_name();
		let suffix = name.strip_prefix("volume-exposer-").unwrap();
		assert!(is_suffix(suffix), "bad suffix in {name}");
	}

	#[test]
	fn test_ephemeral_name_shapes() {
		let ssh = ssh_ephemeral_name();
		assert!(is_suffix(ssh.strip_prefix(SSH_EPHEMERAL_PREFIX).unwrap()));

		let nfs = nfs_ephemeral_name();
		assert!(is_suffix(nfs.strip_prefix(NFS_EPHEMERAL_PREFIX).unwrap()));
	}
}

#[cfg(test)]
mod proptests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
			#[test]
			fn random_suffix_always_lowercase_alphanumeric(_unused in 0..100u32) {
					let suffix = random_suffix();
					prop_assert_eq!(suffix.len(), SUFFIX_LEN);
					prop_assert!(
							suffix.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()),
							"invalid suffix: {:?}",
							suffix
					);
			}

			#[test]
			fn random_local_port_in_range(_unused in 0..100u32) {
					let port = random_local_port();
					prop_assert!(port >= 1024, "port below range: {}", port);
			}

			#[test]
			fn pod_names_are_valid_k8s_names(_unused in 0..100u32) {
					let name = exposer_pod_name();
					prop_assert!(name.len() <= 253);
					prop_assert!(crate::validate_kubernetes_name(&name, "pod").is_ok());
			}
	}
}
