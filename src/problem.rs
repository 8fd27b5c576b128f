//! # Problems and Failed Operations
//!
//! Expected failures inside the engine are values, not panics. Every fallible
//! engine operation returns [`OpResult`], whose error side is a
//! [`FailedOperation`]: an ordered, non-empty list of [`Problem`]s.
//!
//! Sequential steps chain with `?`, which short-circuits on the first failure
//! and propagates it unchanged. Cleanup loops that must attempt every item
//! collect their individual results and merge them with [`accumulate`].

use std::fmt;
use std::sync::Arc;

/// Result of any fallible engine operation.
pub type OpResult<T> = std::result::Result<T, FailedOperation>;

/// A single human-readable problem with an optional underlying cause.
#[derive(Clone)]
pub struct Problem {
    description: String,
    cause: Option<Arc<anyhow::Error>>,
}

impl Problem {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            cause: None,
        }
    }

    /// Wrap an underlying error. The cause message is appended to the
    /// description so the problem stays actionable without logs.
    pub fn with_cause(description: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        let cause = cause.into();
        Self {
            description: format!("{}. Details: {}", description.into(), cause),
            cause: Some(Arc::new(cause)),
        }
    }

    /// Problem describing an error by its own message, kept as the cause
    pub fn from_error(error: impl Into<anyhow::Error>) -> Self {
        let error = error.into();
        Self {
            description: error.to_string(),
            cause: Some(Arc::new(error)),
        }
    }

    /// Prefix the description with `context`, keeping the same cause
    pub fn with_context(&self, context: &str) -> Self {
        Self {
            description: format!("{context}: {}", self.description),
            cause: self.cause.clone(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_deref()
    }
}

impl fmt::Debug for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Problem")
            .field("description", &self.description)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl PartialEq for Problem {
    fn eq(&self, other: &Self) -> bool {
        self.description == other.description
    }
}

/// Ordered, non-empty collection of problems.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedOperation {
    problems: Vec<Problem>,
}

impl FailedOperation {
    pub fn new(problem: Problem) -> Self {
        Self {
            problems: vec![problem],
        }
    }

    /// Returns `None` for an empty list; a failed operation always carries
    /// at least one problem.
    pub fn from_problems(problems: Vec<Problem>) -> Option<Self> {
        if problems.is_empty() {
            None
        } else {
            Some(Self { problems })
        }
    }

    /// Shorthand for a single-problem failure.
    pub fn single(description: impl Into<String>) -> Self {
        Self::new(Problem::new(description))
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn into_problems(self) -> Vec<Problem> {
        self.problems
    }

    /// Append every problem of `other`, keeping order.
    pub fn merge(mut self, other: FailedOperation) -> Self {
        self.problems.extend(other.problems);
        self
    }

    /// Prefix every problem with `context`; causes are preserved.
    pub fn with_context(self, context: &str) -> Self {
        Self {
            problems: self
                .problems
                .iter()
                .map(|problem| problem.with_context(context))
                .collect(),
        }
    }

    /// Problem descriptions joined for display to the caller.
    pub fn render(&self) -> String {
        self.problems
            .iter()
            .map(Problem::description)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for FailedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl std::error::Error for FailedOperation {}

impl From<Problem> for FailedOperation {
    fn from(problem: Problem) -> Self {
        Self::new(problem)
    }
}

/// Merge already-evaluated results. Every failure is kept; successes are
/// returned in order only when nothing failed.
pub fn accumulate<T>(results: impl IntoIterator<Item = OpResult<T>>) -> OpResult<Vec<T>> {
    let mut values = Vec::new();
    let mut problems = Vec::new();

    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(failure) => problems.extend(failure.into_problems()),
        }
    }

    match FailedOperation::from_problems(problems) {
        Some(failure) => Err(failure),
        None => Ok(values),
    }
}

/// Attach a description to an arbitrary error at a gateway boundary.
pub trait ProblemContext<T> {
    fn problem(self, description: impl FnOnce() -> String) -> OpResult<T>;
}

impl<T, E> ProblemContext<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn problem(self, description: impl FnOnce() -> String) -> OpResult<T> {
        self.map_err(|e| FailedOperation::new(Problem::with_cause(description(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_operation_is_never_empty() {
        assert!(FailedOperation::from_problems(Vec::new()).is_none());
        let failure = FailedOperation::from_problems(vec![Problem::new("boom")]).unwrap();
        assert_eq!(failure.problems().len(), 1);
    }

    #[test]
    fn test_problem_with_cause_keeps_underlying_message() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let problem = Problem::with_cause("Failed to list jobs named 'etl' in workspace 'ws'", err);

        assert!(problem.description().contains("etl"));
        assert!(problem.description().contains("connection reset"));
        assert!(problem.cause().is_some());
    }

    #[test]
    fn test_context_keeps_cause_of_every_problem() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "timeout");
        let failure = FailedOperation::new(Problem::with_cause("Remote call 'job.delete:2' failed", err))
            .merge(FailedOperation::single("second"))
            .with_context("Failed to delete job 'etl' (2)");

        let problems = failure.problems();
        assert_eq!(problems.len(), 2);
        assert!(problems[0]
            .description()
            .starts_with("Failed to delete job 'etl' (2): Remote call 'job.delete:2' failed"));
        assert_eq!(problems[0].cause().unwrap().to_string(), "timeout");
        assert_eq!(problems[1].description(), "Failed to delete job 'etl' (2): second");
        assert!(problems[1].cause().is_none());
    }

    #[test]
    fn test_accumulate_collects_every_failure_in_order() {
        let results: Vec<OpResult<u32>> = vec![
            Ok(1),
            Err(FailedOperation::single("first")),
            Ok(3),
            Err(FailedOperation::single("second")),
        ];

        let failure = accumulate(results).unwrap_err();
        let descriptions: Vec<_> = failure.problems().iter().map(Problem::description).collect();
        assert_eq!(descriptions, vec!["first", "second"]);
    }

    #[test]
    fn test_accumulate_returns_values_when_all_succeed() {
        let results: Vec<OpResult<u32>> = vec![Ok(1), Ok(2)];
        assert_eq!(accumulate(results).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_question_mark_short_circuits() {
        let mut calls = Vec::new();

        let mut chain = || -> OpResult<()> {
            calls.push("a");
            Ok::<_, FailedOperation>(())?;
            calls.push("b");
            Err::<(), _>(FailedOperation::single("b failed"))?;
            calls.push("c");
            Ok(())
        };

        let failure = chain().unwrap_err();
        assert_eq!(failure.render(), "b failed");
        assert_eq!(calls, vec!["a", "b"]);
    }

    #[test]
    fn test_render_joins_descriptions() {
        let failure = FailedOperation::single("one").merge(FailedOperation::single("two"));
        assert_eq!(failure.to_string(), "one\ntwo");
    }
}
