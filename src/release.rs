//! Release tag extraction and CHANGELOGS.md splicing

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::error::{BotError, Result};

/// Line after which new table-of-contents entries are inserted.
pub const TOC_SENTINEL: &str = "<!-- BEGIN NEW TOC ENTRY -->";
/// Line after which new release sections are inserted.
pub const CONTENT_SENTINEL: &str = "<!-- BEGIN NEW CHANGELOGS -->";
/// Marker in the release issue body; release notes follow it.
pub const ISSUE_BODY_SENTINEL: &str = "<!-- BEGIN CHANGELOGS -->";

static RC_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v[0-9]+\.[0-9]+\.[0-9]+rc[0-9]+").expect("rc tag pattern"));
static PATCH_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v[0-9]+\.[0-9]+\.[0-9]+p[0-9]+").expect("patch tag pattern"));
static BARE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v[0-9]+\.[0-9]+\.[0-9]+").expect("bare tag pattern"));

/// Extracts a version tag from free-form text.
///
/// Patterns are tried in order (release candidate, patch, bare) and the
/// first pattern with a match wins, even when a later one would match too.
pub fn extract_release_tag(input: &str) -> Option<&str> {
    [&*RC_TAG, &*PATCH_TAG, &*BARE_TAG]
        .into_iter()
        .find_map(|re| re.find(input))
        .map(|m| m.as_str())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseMetadata {
    pub tag: String,
    pub prerelease: bool,
    pub md_ref_link: String,
    pub branch: String,
    /// `YYYY/MM/DD`
    pub date: String,
}

impl ReleaseMetadata {
    pub fn new(tag: &str, requested_at: DateTime<Utc>) -> Self {
        Self {
            tag: tag.to_string(),
            prerelease: tag.contains("rc"),
            md_ref_link: tag.replace('.', ""),
            branch: format!("release-{}", tag),
            date: requested_at.format("%Y/%m/%d").to_string(),
        }
    }

    fn channel_label(&self) -> &'static str {
        if self.prerelease {
            "(Pre-release)"
        } else {
            "(Latest)"
        }
    }

    fn anchor_suffix(&self) -> &'static str {
        if self.prerelease {
            "-pre-release"
        } else {
            "-latest"
        }
    }
}

/// Release notes written after [`ISSUE_BODY_SENTINEL`] in an issue body, up
/// to a second sentinel if there is one.
pub fn release_notes_from_issue(body: &str) -> &str {
    body.split(ISSUE_BODY_SENTINEL).nth(1).unwrap_or("")
}

/// Inserts a TOC entry and a release section into changelog markdown.
///
/// Only the first occurrence of each sentinel is used. A document missing
/// either sentinel is rejected rather than silently left unchanged.
pub fn splice_changelog(content: &str, release: &ReleaseMetadata, notes: &str) -> Result<String> {
    for sentinel in [TOC_SENTINEL, CONTENT_SENTINEL] {
        if !content.contains(sentinel) {
            return Err(BotError::Changelog(format!(
                "sentinel {} not found in changelog",
                sentinel
            )));
        }
    }

    let toc_entry = format!(
        "{}\n- [{} {}](#{}{})",
        TOC_SENTINEL,
        release.tag,
        release.channel_label(),
        release.md_ref_link,
        release.anchor_suffix()
    );
    let section = format!(
        "{}\n\n### {} {}\n\n> Release date: {}\n\n{}",
        CONTENT_SENTINEL,
        release.tag,
        release.channel_label(),
        release.date,
        notes
    );

    Ok(content
        .replacen(TOC_SENTINEL, &toc_entry, 1)
        .replacen(CONTENT_SENTINEL, section.trim(), 1))
}
