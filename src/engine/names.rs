//! Backend and unit naming derivation.
//!
//! # Design Decisions
//! - Derivation is pure and repeatable: the same inputs must produce the
//!   same names, because registration and teardown both derive them
//! - The legacy translation (pre-indexed `<app>-<id>` names) is an
//!   isolated function invoked only at the start of registration and
//!   removal, never generalized further

use std::sync::OnceLock;

use regex::Regex;

/// Derived identifiers for one relation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigNames {
    /// Per-unit identity: sanitized remote unit plus batch index. Names
    /// ACLs, use_backend conditions and server entries.
    pub unit: String,
    /// Backend section name: the group id when given, else the unit id.
    pub backend: String,
}

/// Juju unit names embed a `/` (`app/0`) which cannot appear in
/// generated section names.
pub fn sanitize_unit(remote_unit: &str) -> String {
    remote_unit.replace('/', "-")
}

/// Derive the `(unit, backend)` pair for the config at `index` within a
/// batch from `remote_unit`.
pub fn derive_names(remote_unit: &str, index: usize, group_id: Option<&str>) -> ConfigNames {
    let unit = format!("{}-{}", sanitize_unit(remote_unit), index);
    let backend = match group_id {
        Some(group) if !group.is_empty() => group.to_string(),
        _ => unit.clone(),
    };
    ConfigNames { unit, backend }
}

/// Derive names for every config in a batch, in order.
pub fn batch_names(remote_unit: &str, group_ids: &[Option<&str>]) -> Vec<ConfigNames> {
    group_ids
        .iter()
        .enumerate()
        .map(|(index, group)| derive_names(remote_unit, index, *group))
        .collect()
}

fn indexed_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^.*?(\d+)-(\d+)$").expect("static regex"))
}

/// Translate a new-style indexed name (`<app>-<id>-<index>`) back to its
/// pre-multi-relation form (`<app>-<id>`), so upgrades can clean state
/// written under the old scheme. Non-indexed names pass through.
pub fn legacy_name(name: &str) -> String {
    match indexed_name_regex().captures(name) {
        Some(captures) => {
            let suffix_len = captures[2].len() + 1;
            name[..name.len() - suffix_len].to_string()
        }
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_names_sanitizes_and_indexes() {
        let names = derive_names("unit-mock/0", 0, None);
        assert_eq!(names.unit, "unit-mock-0-0");
        assert_eq!(names.backend, "unit-mock-0-0");

        let names = derive_names("unit-mock/0", 1, Some("test-group"));
        assert_eq!(names.unit, "unit-mock-0-1");
        assert_eq!(names.backend, "test-group");
    }

    #[test]
    fn test_derivation_is_repeatable() {
        assert_eq!(
            derive_names("app/3", 2, Some("g")),
            derive_names("app/3", 2, Some("g"))
        );
    }

    #[test]
    fn test_legacy_name_strips_index_suffix() {
        assert_eq!(legacy_name("unit-mock-0-0"), "unit-mock-0");
        assert_eq!(legacy_name("app-12-3"), "app-12");
        // Names without an indexed suffix pass through.
        assert_eq!(legacy_name("test-group"), "test-group");
        assert_eq!(legacy_name("redirect"), "redirect");
    }

    #[test]
    fn test_legacy_name_keeps_matching_digits() {
        // Suffix truncation must not eat into an id ending with the same
        // digits as the index.
        assert_eq!(legacy_name("app-10-0"), "app-10");
        assert_eq!(legacy_name("app-1-1"), "app-1");
    }

    #[test]
    fn test_batch_names_orders_by_index() {
        let names = batch_names("app/0", &[None, Some("g"), None]);
        assert_eq!(names[0].unit, "app-0-0");
        assert_eq!(names[1].backend, "g");
        assert_eq!(names[2].unit, "app-0-2");
    }
}
