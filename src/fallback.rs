//! Ordered "first success wins" chains over upstream providers.
//!
//! Candidates are tried strictly one after another. A candidate wins only when it
//! returns a non-empty list; errors and empty answers both move on to the next one.
//! Every attempt leaves an [`AttemptReport`] behind so callers can see exactly which
//! stage produced the final answer.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::FetchError;

/// Anything that can take part in a fallback chain
pub trait Candidate {
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AttemptOutcome {
    /// The provider answered with this many usable entries
    Tokens { count: usize },
    /// The provider answered but nothing in the answer was usable
    Empty,
    Failed { error: String },
    Cancelled,
}

/// Outcome of one attempt against one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptReport {
    pub provider: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

impl AttemptReport {
    pub fn tokens(provider: &str, count: usize) -> Self {
        let outcome = if count == 0 {
            AttemptOutcome::Empty
        } else {
            AttemptOutcome::Tokens { count }
        };
        Self {
            provider: provider.to_string(),
            outcome,
        }
    }

    pub fn failed(provider: &str, err: &FetchError) -> Self {
        let outcome = if err.is_cancelled() {
            AttemptOutcome::Cancelled
        } else {
            AttemptOutcome::Failed {
                error: err.to_string(),
            }
        };
        Self {
            provider: provider.to_string(),
            outcome,
        }
    }
}

/// Where a fallback chain ended up
#[derive(Debug)]
pub enum Resolution<T> {
    Found { provider: String, items: Vec<T> },
    Exhausted,
    Cancelled,
}

#[derive(Debug)]
pub struct Fallback<T> {
    pub resolution: Resolution<T>,
    pub attempts: Vec<AttemptReport>,
}

/// Run `attempt` over `candidates` in order and stop at the first non-empty answer.
///
/// Each candidate is attempted at most once. Cancellation is checked before every
/// attempt; an attempt that itself reports [`FetchError::Cancelled`] also ends the chain.
pub async fn first_success<'a, C, T, F, Fut>(
    candidates: &'a [C],
    cancel: &CancellationToken,
    mut attempt: F,
) -> Fallback<T>
where
    C: Candidate,
    F: FnMut(&'a C) -> Fut,
    Fut: Future<Output = Result<Vec<T>, FetchError>>,
{
    let mut attempts = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let name = candidate.name();
        if cancel.is_cancelled() {
            return Fallback {
                resolution: Resolution::Cancelled,
                attempts,
            };
        }

        info!("Trying {}...", name);
        match attempt(candidate).await {
            Ok(items) if !items.is_empty() => {
                info!("Fetched {} entries using {}", items.len(), name);
                attempts.push(AttemptReport::tokens(name, items.len()));
                return Fallback {
                    resolution: Resolution::Found {
                        provider: name.to_string(),
                        items,
                    },
                    attempts,
                };
            }
            Ok(_) => {
                info!("{} returned no usable entries", name);
                attempts.push(AttemptReport::tokens(name, 0));
            }
            Err(err) if err.is_cancelled() => {
                attempts.push(AttemptReport::failed(name, &err));
                return Fallback {
                    resolution: Resolution::Cancelled,
                    attempts,
                };
            }
            Err(err) => {
                warn!("{} failed: {}", name, err);
                attempts.push(AttemptReport::failed(name, &err));
            }
        }
    }

    Fallback {
        resolution: Resolution::Exhausted,
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Step {
        name: &'static str,
        answer: fn() -> Result<Vec<u32>, FetchError>,
    }

    impl Candidate for Step {
        fn name(&self) -> &str {
            self.name
        }
    }

    fn steps() -> Vec<Step> {
        vec![
            Step {
                name: "first",
                answer: || Err(FetchError::Status(500)),
            },
            Step {
                name: "second",
                answer: || Ok(Vec::new()),
            },
            Step {
                name: "third",
                answer: || Ok(vec![42]),
            },
            Step {
                name: "fourth",
                answer: || Ok(vec![7]),
            },
        ]
    }

    #[tokio::test]
    async fn test_first_non_empty_answer_wins() {
        let steps = steps();
        let seen = Mutex::new(Vec::new());

        let outcome = first_success(&steps, &CancellationToken::new(), |step| {
            seen.lock().unwrap().push(step.name);
            let answer = (step.answer)();
            async move { answer }
        })
        .await;

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
        match outcome.resolution {
            Resolution::Found { provider, items } => {
                assert_eq!(provider, "third");
                assert_eq!(items, vec![42]);
            }
            other => panic!("unexpected resolution {other:?}"),
        }
        assert_eq!(
            outcome.attempts,
            vec![
                AttemptReport {
                    provider: "first".to_string(),
                    outcome: AttemptOutcome::Failed {
                        error: "unexpected HTTP status 500".to_string()
                    },
                },
                AttemptReport {
                    provider: "second".to_string(),
                    outcome: AttemptOutcome::Empty,
                },
                AttemptReport {
                    provider: "third".to_string(),
                    outcome: AttemptOutcome::Tokens { count: 1 },
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_exhausted_chain() {
        let steps = steps();
        let outcome = first_success(&steps[..2], &CancellationToken::new(), |step| {
            let answer = (step.answer)();
            async move { answer }
        })
        .await;

        assert!(matches!(outcome.resolution, Resolution::Exhausted));
        assert_eq!(outcome.attempts.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = first_success(&steps(), &cancel, |_step| async {
            Ok::<_, FetchError>(vec![1])
        })
        .await;

        assert!(matches!(outcome.resolution, Resolution::Cancelled));
        assert!(outcome.attempts.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_attempt_stops_chain() {
        let steps = steps();
        let calls = Mutex::new(0);

        let outcome = first_success(&steps, &CancellationToken::new(), |_step| {
            *calls.lock().unwrap() += 1;
            async { Err::<Vec<u32>, _>(FetchError::Cancelled) }
        })
        .await;

        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(matches!(outcome.resolution, Resolution::Cancelled));
        assert_eq!(outcome.attempts[0].outcome, AttemptOutcome::Cancelled);
    }

    #[test]
    fn test_report_serialization() {
        let report = AttemptReport::tokens("QuickNode API", 3);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["provider"], "QuickNode API");
        assert_eq!(json["status"], "tokens");
        assert_eq!(json["count"], 3);
    }
}
