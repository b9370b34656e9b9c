use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of evaluations a ground-truth case can request.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EvalTest {
    /// Does the answer address the question?
    Relevancy,
    /// Does the answer agree with the correct one, in the right language,
    /// from the right tables and columns?
    Accuracy,
    /// Does the answer follow case-specific instructions?
    Instructions,
    /// Did at least one guardrail stop a question that should be stopped?
    Guardrails,
}

impl EvalTest {
    pub const ALL: [EvalTest; 4] = [
        EvalTest::Relevancy,
        EvalTest::Accuracy,
        EvalTest::Instructions,
        EvalTest::Guardrails,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvalTest::Relevancy => "Relevancy",
            EvalTest::Accuracy => "Accuracy",
            EvalTest::Instructions => "Instructions",
            EvalTest::Guardrails => "Guardrails",
        }
    }

    /// Case-insensitive; `None` for names outside the closed set.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|test| test.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for EvalTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::EvalTest;

    #[test]
    fn parses_known_names_in_any_case() {
        assert_eq!(EvalTest::parse("Accuracy"), Some(EvalTest::Accuracy));
        assert_eq!(EvalTest::parse(" guardrails "), Some(EvalTest::Guardrails));
        assert_eq!(EvalTest::parse("Fluency"), None);
    }
}
