use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::AskDbError;

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum GuardrailStatus {
    #[default]
    #[serde(rename = "Did not run")]
    NotRun,
    #[serde(rename = "Passed")]
    Passed,
    #[serde(rename = "Query Irrelevant")]
    Irrelevant,
    #[serde(rename = "Query unsafe")]
    Unsafe,
    #[serde(rename = "Query contains code")]
    ContainsCode,
    #[serde(rename = "Query inconsistent")]
    Inconsistent,
}

impl GuardrailStatus {
    pub fn label(&self) -> &'static str {
        match self {
            GuardrailStatus::NotRun => "Did not run",
            GuardrailStatus::Passed => "Passed",
            GuardrailStatus::Irrelevant => "Query Irrelevant",
            GuardrailStatus::Unsafe => "Query unsafe",
            GuardrailStatus::ContainsCode => "Query contains code",
            GuardrailStatus::Inconsistent => "Query inconsistent",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [
            GuardrailStatus::NotRun,
            GuardrailStatus::Passed,
            GuardrailStatus::Irrelevant,
            GuardrailStatus::Unsafe,
            GuardrailStatus::ContainsCode,
            GuardrailStatus::Inconsistent,
        ]
        .into_iter()
        .find(|status| status.label() == label)
    }

    pub fn is_rejection(&self) -> bool {
        !matches!(self, GuardrailStatus::NotRun | GuardrailStatus::Passed)
    }
}

impl fmt::Display for GuardrailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailCheck {
    ContainsCode,
    Safety,
    Consistency,
    Relevance,
}

impl GuardrailCheck {
    pub const SINGLE_TURN: [GuardrailCheck; 3] = [
        GuardrailCheck::ContainsCode,
        GuardrailCheck::Safety,
        GuardrailCheck::Relevance,
    ];

    pub const MULTI_TURN: [GuardrailCheck; 4] = [
        GuardrailCheck::ContainsCode,
        GuardrailCheck::Safety,
        GuardrailCheck::Consistency,
        GuardrailCheck::Relevance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GuardrailCheck::ContainsCode => "contains_code",
            GuardrailCheck::Safety => "safety",
            GuardrailCheck::Consistency => "consistency",
            GuardrailCheck::Relevance => "relevance",
        }
    }

    /// Status recorded when this check rejects the query.
    pub fn rejection_status(&self) -> GuardrailStatus {
        match self {
            GuardrailCheck::ContainsCode => GuardrailStatus::ContainsCode,
            GuardrailCheck::Safety => GuardrailStatus::Unsafe,
            GuardrailCheck::Consistency => GuardrailStatus::Inconsistent,
            GuardrailCheck::Relevance => GuardrailStatus::Irrelevant,
        }
    }
}

impl fmt::Display for GuardrailCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-turn status of every configured check.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct GuardrailStatusMap(BTreeMap<GuardrailCheck, GuardrailStatus>);

impl GuardrailStatusMap {
    pub fn new(checks: &[GuardrailCheck]) -> Self {
        Self(
            checks
                .iter()
                .map(|check| (*check, GuardrailStatus::NotRun))
                .collect(),
        )
    }

    pub fn get(&self, check: GuardrailCheck) -> Option<GuardrailStatus> {
        self.0.get(&check).copied()
    }

    pub fn is_configured(&self, check: GuardrailCheck) -> bool {
        self.0.contains_key(&check)
    }

    /// Resolves `check` for this turn. A check resolves exactly once.
    pub fn record(
        &mut self,
        check: GuardrailCheck,
        passed: bool,
    ) -> Result<GuardrailStatus, AskDbError> {
        let slot = self
            .0
            .get_mut(&check)
            .ok_or(AskDbError::GuardrailNotConfigured { check })?;
        if *slot != GuardrailStatus::NotRun {
            return Err(AskDbError::GuardrailAlreadyResolved { check });
        }
        *slot = if passed {
            GuardrailStatus::Passed
        } else {
            check.rejection_status()
        };
        Ok(*slot)
    }

    pub fn all_passed(&self) -> bool {
        self.0
            .values()
            .all(|status| *status == GuardrailStatus::Passed)
    }

    pub fn rejections(&self) -> Vec<(GuardrailCheck, GuardrailStatus)> {
        self.iter().filter(|(_, status)| status.is_rejection()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GuardrailCheck, GuardrailStatus)> + '_ {
        self.0.iter().map(|(check, status)| (*check, *status))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
