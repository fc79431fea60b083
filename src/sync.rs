//! Decides whether a pull request branch should be brought up to date with
//! its base branch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::duration::IsoDuration;
use crate::error::{BotError, Result};

/// Committer name GitHub uses for commits it creates itself (web merges,
/// "Update branch" button, ...).
pub const GITHUB_COMMITTER: &str = "GitHub";

/// `status` field of the compare-commits API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareStatus {
    Ahead,
    Behind,
    Diverged,
    Identical,
}

impl fmt::Display for CompareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareStatus::Ahead => "ahead",
            CompareStatus::Behind => "behind",
            CompareStatus::Diverged => "diverged",
            CompareStatus::Identical => "identical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct SyncInputs<'a> {
    pub status: CompareStatus,
    pub merge_base_date: DateTime<Utc>,
    pub pr_head_date: DateTime<Utc>,
    pub last_committer: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncDecision {
    pub status: CompareStatus,
    pub age_deadline: DateTime<Utc>,
    pub exceeds_age_timeout: bool,
    pub should_sync: bool,
}

/// Evaluates the auto-sync rule against an already computed deadline
/// (`merge_base_date + max_age`).
///
/// The age check only applies to `ahead` branches, the trigger itself
/// requires `diverged`.
pub fn decide_with_deadline(
    status: CompareStatus,
    age_deadline: DateTime<Utc>,
    pr_head_date: DateTime<Utc>,
    last_committer: &str,
) -> SyncDecision {
    let exceeds_age_timeout = age_deadline > pr_head_date && status == CompareStatus::Ahead;
    let should_sync = !exceeds_age_timeout
        && last_committer != GITHUB_COMMITTER
        && status == CompareStatus::Diverged;

    SyncDecision {
        status,
        age_deadline,
        exceeds_age_timeout,
        should_sync,
    }
}

pub fn decide(inputs: &SyncInputs<'_>, max_age: &IsoDuration) -> Result<SyncDecision> {
    let age_deadline = max_age.end(inputs.merge_base_date).ok_or_else(|| {
        BotError::InvalidDuration(format!(
            "{} overflows when added to {}",
            max_age, inputs.merge_base_date
        ))
    })?;

    Ok(decide_with_deadline(
        inputs.status,
        age_deadline,
        inputs.pr_head_date,
        inputs.last_committer,
    ))
}
