// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

const MAX_NAME_LEN: usize = 253;

/// An operator-supplied name that is not a valid DNS-1123 subdomain.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("{what} {name:?} is not a valid DNS-1123 subdomain")]
pub struct ValidationError {
	what: &'static str,
	name: String,
}

/// Validate a namespace or resource name against DNS-1123 subdomain rules.
///
/// Operator input is rejected rather than rewritten: a mistyped PVC name
/// must fail loudly, not silently target a sanitised sibling.
pub fn validate_kubernetes_name(name: &str, what: &'static str) -> Result<(), ValidationError> {
	if is_dns1123_subdomain(name) {
		Ok(())
	} else {
		Err(ValidationError {
			what,
			name: name.to_string(),
		})
	}
}

fn is_dns1123_subdomain(name: &str) -> bool {
	if name.is_empty() || name.len() > MAX_NAME_LEN {
		return false;
	}
	name.split('.').all(is_dns1123_label)
}

fn is_dns1123_label(label: &str) -> bool {
	let bytes = label.as_bytes();
	let (Some(&first), Some(&last)) = (bytes.first(), bytes.last()) else {
		return false;
	};
	is_alnum(first) && is_alnum(last) && bytes.iter().all(|&b| is_alnum(b) || b == b'-')
}

fn is_alnum(b: u8) -> bool {
	b.is_ascii_lowercase() || b.is_ascii_digit()
}


#[cfg(test)]
mod proptests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
			#[test]
			fn accepts_generated_subdomains(
					name in "[a-z0-9]([a-z0-9-]{0,10}[a-z0-9])?(\\.[a-z0-9]([a-z0-9-]{0,10}[a-z0-9])?){0,3}"
			) {
					prop_assert!(validate_kubernetes_name(&name, "pvc-name").is_ok());
			}

			#[test]
			fn rejects_uppercase(name in "[A-Z][a-zA-Z0-9-]{0,20}") {
					prop_assert!(validate_kubernetes_name(&name, "pvc-name").is_err());
			}
	}
}
