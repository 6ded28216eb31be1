//! Race-to-first-success dispatch.
//!
//! All entries are spawned at once; the first completion that passes the
//! acceptance check wins and the rest are never observed. There is no
//! priority bias between racers — the winner is purely whichever valid
//! result lands first.

use std::str::FromStr;

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::{ProviderId, SourceError, ValidationError};

/// What happens to losing branches once a winner is selected.
///
/// `LetFinish` abandons them: the tasks run to completion in the background
/// and their results are dropped on a closed channel, never read. This
/// trades wasted upstream work for zero cancellation machinery and is safe
/// because losing branches write no shared state. `CancelOnWin` aborts the
/// remaining tasks at the scheduler level instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RacePolicy {
    #[default]
    LetFinish,
    CancelOnWin,
}

impl FromStr for RacePolicy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "let_finish" | "letfinish" => Ok(Self::LetFinish),
            "cancel_on_win" | "cancel" => Ok(Self::CancelOnWin),
            other => Err(ValidationError::InvalidRacePolicy {
                value: other.to_owned(),
            }),
        }
    }
}

pub(crate) type RaceEntry<T> = (ProviderId, BoxFuture<'static, Result<T, SourceError>>);

/// Run every entry concurrently and return the first result accepted by
/// `accept`, or `None` when all entries fail or produce rejected values.
pub(crate) async fn first_acceptable<T, F>(
    entries: Vec<RaceEntry<T>>,
    accept: F,
    policy: RacePolicy,
) -> Option<(ProviderId, T)>
where
    T: Send + 'static,
    F: Fn(&T) -> bool,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut handles = Vec::with_capacity(entries.len());

    for (provider, future) in entries {
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            let outcome = future.await;
            // A closed receiver just means the race is over; losers discard.
            let _ = tx.send((provider, outcome));
        }));
    }
    drop(tx);

    let mut winner = None;
    while let Some((provider, outcome)) = rx.recv().await {
        match outcome {
            Ok(value) if accept(&value) => {
                winner = Some((provider, value));
                break;
            }
            Ok(_) => {
                log::debug!("'{provider}' produced a structurally invalid result; ignoring");
            }
            Err(error) => {
                log::debug!("'{provider}' lost the race: {error}");
            }
        }
    }

    if winner.is_some() && policy == RacePolicy::CancelOnWin {
        for handle in &handles {
            handle.abort();
        }
    }

    winner
}
