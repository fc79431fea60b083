//! Conventional-commit title classification for pull request labels

use regex::Regex;
use std::sync::LazyLock;

/// Added next to strict labels until someone marks the PR as tested.
pub const NOT_YET_TESTED: &str = "not-yet-tested";

/// Label that signals a PR has been verified by QA.
pub const TESTED: &str = "tested";

/// Recognised title types, in priority order. The last four are not strict.
pub const TITLE_KINDS: [&str; 12] = [
    "fix", "feat", "feature", "patch", "ci", "optimize", "chore", "refactor", "style", "doc",
    "docs", "fixture",
];

const NON_STRICT_COUNT: usize = 4;

/// Title kinds that make a PR eligible for an approval once it is `tested`.
pub const TESTABLE_KINDS: [&str; 9] = [
    "fix", "hotfix", "feat", "feature", "patch", "ci", "optimize", "chore", "refactor",
];

static TITLE_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?<type>\w+)(\((?<scope>.+)\))?:").expect("title pattern"));

/// The `type` token of a conventional-commit title (`fix` in `fix(core): x`).
pub fn title_type(title: &str) -> Option<&str> {
    TITLE_TYPE
        .captures(title)
        .and_then(|caps| caps.name("type"))
        .map(|m| m.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleClassification {
    pub label: &'static str,
    /// Strict kinds also get [`NOT_YET_TESTED`] and a QA review request.
    pub strict: bool,
}

impl TitleClassification {
    /// Labels to apply to a PR that currently has none.
    pub fn labels(&self) -> Vec<String> {
        let mut labels = vec![self.label.to_string()];
        if self.strict {
            labels.push(NOT_YET_TESTED.to_string());
        }
        labels
    }
}

fn label_for_kind(kind: &'static str) -> &'static str {
    match kind {
        "feat" => "feature",
        "doc" | "docs" => "documentation",
        other => other,
    }
}

pub fn classify_title(title: &str) -> Option<TitleClassification> {
    let kind = title_type(title)?;
    let index = TITLE_KINDS.iter().position(|k| *k == kind)?;
    let kind = TITLE_KINDS[index];

    Some(TitleClassification {
        label: label_for_kind(kind),
        strict: index < TITLE_KINDS.len() - NON_STRICT_COUNT,
    })
}

/// Whether a title describes a change that can be approved once tested.
/// This is a plain prefix check, so no conventional-commit colon is needed.
pub fn is_testable_title(title: &str) -> bool {
    TESTABLE_KINDS.iter().any(|kind| title.starts_with(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_with_scope() {
        let c = classify_title("fix(core): memory leak").unwrap();
        assert_eq!(title_type("fix(core): memory leak"), Some("fix"));
        assert_eq!(c.label, "fix");
        assert!(c.strict);
        assert_eq!(c.labels(), vec!["fix", NOT_YET_TESTED]);
    }

    #[test]
    fn docs_map_to_documentation() {
        let c = classify_title("docs: update README").unwrap();
        assert_eq!(c.label, "documentation");
        assert!(!c.strict);
        assert_eq!(c.labels(), vec!["documentation"]);
        assert_eq!(classify_title("doc(api): typo").unwrap().label, "documentation");
    }

    #[test]
    fn feat_maps_to_feature() {
        let c = classify_title("feat: display daed version in header").unwrap();
        assert_eq!(c.label, "feature");
        assert!(c.strict);
    }

    #[test]
    fn non_strict_kinds() {
        for title in ["style: fmt", "fixture(context): some title"] {
            assert!(!classify_title(title).unwrap().strict, "{title}");
        }
        assert!(classify_title("refactor: split module").unwrap().strict);
    }

    #[test]
    fn unknown_or_unformatted_titles() {
        assert_eq!(classify_title("docu(context): some title"), None);
        assert_eq!(classify_title("Update README"), None);
        assert_eq!(classify_title("fix memory leak"), None);
    }

    #[test]
    fn classification_is_idempotent() {
        let title = "ci(release): bump action";
        assert_eq!(classify_title(title), classify_title(title));
        assert_eq!(classify_title(title).unwrap().labels().len(), 2);
    }

    #[test]
    fn testable_titles() {
        assert!(is_testable_title("hotfix: crash on start"));
        assert!(is_testable_title("feat(ui): dark mode"));
        assert!(!is_testable_title("docs: typo"));
        assert!(!is_testable_title("style: fmt"));
    }

    #[test]
    fn testable_titles_only_need_the_prefix() {
        assert!(is_testable_title("fix memory leak"));
        assert!(is_testable_title("hotfix(x) crash"));
        assert!(is_testable_title("fixture: x"));
        assert!(!is_testable_title("Fix memory leak"));
        assert!(!is_testable_title("update: bump fix"));
    }
}
