//! Final installed names.
//!
//! Items install under their short name unless another module already holds
//! that short name in the same (assistant, scope, project) slot, in which
//! case the `{module}-{item}` form is used. If that is held too, a numeric
//! suffix is appended until the name is free. The check runs against
//! registry records, never the filesystem, so whoever claimed a name first
//! keeps it for as long as it stays installed.

use crate::registry::{Installation, InstallationRegistry, ItemKind};

/// The module other than `slot`'s that lists `name` in the same slot.
pub fn holder<'a>(
    registry: &'a InstallationRegistry,
    slot: &Installation,
    kind: ItemKind,
    name: &str,
) -> Option<&'a str> {
    registry
        .all()
        .iter()
        .find(|other| {
            other.module != slot.module
                && other.same_slot(slot)
                && other.names(kind).iter().any(|n| n == name)
        })
        .map(|other| other.module.as_str())
}

fn claimed(
    registry: &InstallationRegistry,
    slot: &Installation,
    kind: ItemKind,
    name: &str,
) -> bool {
    holder(registry, slot, kind, name).is_some()
}

/// `(item, final name)` for every item of one kind in `slot`'s module.
///
/// Short names are handed out first so a module item whose short name is
/// free never loses it to a sibling's fallback. The result never repeats a
/// name and never repeats a name another module holds in the slot.
pub fn plan_names(
    registry: &InstallationRegistry,
    slot: &Installation,
    kind: ItemKind,
    items: &[String],
) -> Vec<(String, String)> {
    let mut names: Vec<Option<String>> = items
        .iter()
        .map(|item| (!claimed(registry, slot, kind, item)).then(|| item.clone()))
        .collect();

    for (index, item) in items.iter().enumerate() {
        if names[index].is_some() {
            continue;
        }
        let base = prefixed(&slot.module, item);
        let mut candidate = base.clone();
        let mut n = 2;
        while claimed(registry, slot, kind, &candidate)
            || names.iter().flatten().any(|taken| *taken == candidate)
        {
            candidate = format!("{base}-{n}");
            n += 1;
        }
        names[index] = Some(candidate);
    }

    items.iter().cloned().zip(names.into_iter().flatten()).collect()
}

pub fn prefixed(module: &str, item: &str) -> String {
    format!("{module}-{item}")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        lola_targets::{Assistant, Root},
        std::path::PathBuf,
    };

    fn slot(module: &str, assistant: Assistant, project: &str) -> Installation {
        Installation::new(module, assistant, &Root::Project(PathBuf::from(project)))
    }

    fn final_name(
        reg: &InstallationRegistry,
        slot: &Installation,
        kind: ItemKind,
        item: &str,
    ) -> String {
        plan_names(reg, slot, kind, &[item.to_string()]).remove(0).1
    }

    fn registry(tmp: &tempfile::TempDir, owners: &[(&str, &[&str])]) -> InstallationRegistry {
        let mut reg = InstallationRegistry::load(tmp.path().join("installed.yml")).unwrap();
        for (module, skills) in owners {
            let mut owner = slot(module, Assistant::ClaudeCode, "/p");
            owner.skills = skills.iter().map(|s| s.to_string()).collect();
            reg.add(owner).unwrap();
        }
        reg
    }

    #[test]
    fn short_name_taken_only_within_same_slot_and_kind() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = registry(&tmp, &[("m1", &["shared"])]);

        let m2 = slot("m2", Assistant::ClaudeCode, "/p");
        assert_eq!(final_name(&reg, &m2, ItemKind::Skill, "shared"), "m2-shared");
        assert_eq!(final_name(&reg, &m2, ItemKind::Command, "shared"), "shared");

        let other_project = slot("m2", Assistant::ClaudeCode, "/q");
        assert_eq!(final_name(&reg, &other_project, ItemKind::Skill, "shared"), "shared");
        let other_assistant = slot("m2", Assistant::Cursor, "/p");
        assert_eq!(final_name(&reg, &other_assistant, ItemKind::Skill, "shared"), "shared");
    }

    #[test]
    fn own_record_never_blocks_short_name() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = registry(&tmp, &[("m1", &["shared"]), ("m2", &["m2-shared"])]);

        let m1 = slot("m1", Assistant::ClaudeCode, "/p");
        let m2 = slot("m2", Assistant::ClaudeCode, "/p");
        assert_eq!(final_name(&reg, &m1, ItemKind::Skill, "shared"), "shared");
        assert_eq!(final_name(&reg, &m2, ItemKind::Skill, "shared"), "m2-shared");
    }

    #[test]
    fn prefixed_name_held_by_another_module_gets_a_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = registry(&tmp, &[("m3", &["m2-shared", "m2-shared-2"]), ("m1", &["shared"])]);

        let m2 = slot("m2", Assistant::ClaudeCode, "/p");
        assert_eq!(final_name(&reg, &m2, ItemKind::Skill, "shared"), "m2-shared-3");
    }

    #[test]
    fn fallback_never_reuses_a_sibling_short_name() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = registry(&tmp, &[("m1", &["shared"])]);

        let m2 = slot("m2", Assistant::ClaudeCode, "/p");
        let items = vec!["shared".to_string(), "m2-shared".to_string()];
        assert_eq!(
            plan_names(&reg, &m2, ItemKind::Skill, &items),
            vec![
                ("shared".to_string(), "m2-shared-2".to_string()),
                ("m2-shared".to_string(), "m2-shared".to_string()),
            ]
        );
    }
}
