//! First-success probing over an ordered candidate list
//!
//! Candidates are tried strictly in order; the first one whose probe yields
//! usable data wins and the rest are never touched. Every probe made is
//! recorded as an [`Attempt`].

use std::fmt;
use std::future::Future;

use crate::api::ProbeOutcome;
use crate::models::Attempt;

/// Result of a probe run
#[derive(Debug)]
pub struct Probed<C, T> {
    pub winner: Option<(C, T)>,
    pub attempts: Vec<Attempt>,
}

impl<C, T> Probed<C, T> {
    pub fn found(&self) -> bool {
        self.winner.is_some()
    }
}

/// Probe `candidates` in order until one produces data
pub async fn first_success<C, T, I, F, Fut>(candidates: I, mut probe: F) -> Probed<C, T>
where
    C: fmt::Display,
    I: IntoIterator<Item = C>,
    F: FnMut(&C) -> Fut,
    Fut: Future<Output = ProbeOutcome<T>>,
{
    let mut attempts = Vec::new();

    for candidate in candidates {
        let outcome = probe(&candidate).await;
        attempts.push(attempt_for(&candidate, &outcome));

        if let ProbeOutcome::Found { data, .. } = outcome {
            return Probed {
                winner: Some((candidate, data)),
                attempts,
            };
        }
    }

    Probed {
        winner: None,
        attempts,
    }
}

fn attempt_for<C: fmt::Display, T>(candidate: &C, outcome: &ProbeOutcome<T>) -> Attempt {
    let error = match outcome {
        ProbeOutcome::Found { .. } => None,
        ProbeOutcome::Empty { .. } => Some("no usable sources".to_string()),
        ProbeOutcome::Rejected { status } => Some(format!("rejected with HTTP {}", status)),
        ProbeOutcome::Failed(err) => Some(err.to_string()),
    };

    Attempt {
        endpoint: candidate.to_string(),
        status: outcome.status(),
        error,
        success: outcome.is_found(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UpstreamError;
    use std::cell::Cell;

    fn outcome_for(name: &str) -> ProbeOutcome<String> {
        match name {
            "down" => ProbeOutcome::Failed(UpstreamError::Timeout),
            "forbidden" => ProbeOutcome::Rejected { status: 403 },
            "empty" => ProbeOutcome::Empty { status: 200 },
            other => ProbeOutcome::Found {
                status: 200,
                data: format!("data from {}", other),
            },
        }
    }

    #[tokio::test]
    async fn test_first_success_stops_at_first_found() {
        let calls = Cell::new(0);
        let probed = first_success(["down", "forbidden", "empty", "good", "never"], |name| {
            calls.set(calls.get() + 1);
            let outcome = outcome_for(name);
            async move { outcome }
        })
        .await;

        assert_eq!(calls.get(), 4);
        let (winner, data) = probed.winner.unwrap();
        assert_eq!(winner, "good");
        assert_eq!(data, "data from good");

        assert_eq!(probed.attempts.len(), 4);
        assert_eq!(probed.attempts[0].error.as_deref(), Some("Request timed out"));
        assert_eq!(probed.attempts[1].status, Some(403));
        assert!(!probed.attempts[2].success);
        assert!(probed.attempts[3].success);
        assert_eq!(probed.attempts[3].endpoint, "good");
    }

    #[tokio::test]
    async fn test_first_success_exhausts_without_winner() {
        let probed = first_success(vec!["down", "empty"], |name| {
            let outcome = outcome_for(name);
            async move { outcome }
        })
        .await;

        assert!(!probed.found());
        assert_eq!(probed.attempts.len(), 2);
    }

    #[tokio::test]
    async fn test_first_success_with_no_candidates() {
        let probed = first_success(Vec::<String>::new(), |_| async {
            ProbeOutcome::<()>::Empty { status: 200 }
        })
        .await;

        assert!(probed.winner.is_none());
        assert!(probed.attempts.is_empty());
    }
}
