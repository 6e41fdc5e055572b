//! Bounded retry over derived candidate names.
//!
//! The helper does not classify faults: the caller says which ones mean
//! "name taken, try the next candidate" and everything else stops at once.

use std::future::Future;

/// Why [`with_candidates`] gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every candidate was rejected; `last` is the final rejection.
    Exhausted { attempts: u32, last: E },
    /// A non-retriable fault stopped the sequence.
    Fatal(E),
}

/// Run `op` on `original`, then on `derive(original, n)` for n = 1.. while
/// `retriable` holds for its error, at most `attempts` times in total.
///
/// Candidates are always derived from `original`, never from the previous
/// candidate. An `attempts` of zero still makes one attempt.
///
/// # Errors
///
/// [`RetryError::Fatal`] for the first non-retriable error,
/// [`RetryError::Exhausted`] once all attempts were rejected.
pub async fn with_candidates<C, T, E, D, F, Fut, R>(
    attempts: u32,
    original: &C,
    derive: D,
    mut op: F,
    retriable: R,
) -> Result<T, RetryError<E>>
where
    C: Clone,
    D: Fn(&C, u32) -> C,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        let candidate = if attempt == 0 {
            original.clone()
        } else {
            derive(original, attempt)
        };
        match op(candidate).await {
            Ok(value) => return Ok(value),
            Err(err) if !retriable(&err) => return Err(RetryError::Fatal(err)),
            Err(err) => {
                attempt += 1;
                if attempt >= attempts {
                    return Err(RetryError::Exhausted {
                        attempts,
                        last: err,
                    });
                }
                tracing::debug!(attempt, "candidate rejected, deriving another");
            }
        }
    }
}
