//! Role name → ARN resolution.

use std::collections::BTreeMap;

/// Resolves a role as a client or a directory group wrote it into a full
/// IAM role ARN.
///
/// The checks run in this order, first match wins:
///
/// 1. `alias/role` where `alias` is a key of `aliases`:
///    `<aliases[alias]>:role/<role>`.
/// 2. Already an ARN (`arn:` prefix): unchanged.
/// 3. Contains `:role/` (e.g. `123456789012:role/x`): prefixed with
///    `arn:aws:iam::`.
/// 4. Anything else is a bare role name in the default account:
///    `arn:aws:iam::<default_account>:role/<role>`.
///
/// Aliases come first: a bare role name that happens to start with an
/// alias must not be read as a role in the default account.
pub fn build_arn(role: &str, default_account: &str, aliases: &BTreeMap<String, String>) -> String {
    let mut parts = role.split('/');
    if let (Some(alias), Some(name), None) = (parts.next(), parts.next(), parts.next()) {
        if let Some(account) = aliases.get(alias).filter(|a| !a.is_empty()) {
            return format!("{account}:role/{name}");
        }
    }

    if role.starts_with("arn:") {
        role.to_string()
    } else if role.contains(":role/") {
        format!("arn:aws:iam::{role}")
    } else {
        format!("arn:aws:iam::{default_account}:role/{role}")
    }
}
