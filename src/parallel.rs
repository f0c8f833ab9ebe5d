//! Shard-parallel collection with a bounded worker pool.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use alloc::vec::Vec;

use crossbeam_channel::RecvTimeoutError;

use crate::errors::{Result, RudepError};

/// Runs `f` on every shard with at most `n_threads` named workers and returns
/// the results in shard order.
///
/// Each worker pulls shards from a shared queue and owns whatever `f` builds
/// for a shard until it is sent back. If `timeout` elapses before every shard
/// is done, the shards still queued are cancelled; shards already running are
/// allowed to finish before this function returns.
///
/// # Errors
///
/// A shard error, a worker panic or a timeout is reported as
/// [`RudepError::Worker`]. `n_threads` must be at least 1.
pub fn collect_shards<S, T, F>(
    shards: Vec<S>,
    n_threads: usize,
    timeout: Option<Duration>,
    f: F,
) -> Result<Vec<T>>
where
    S: Send,
    T: Send,
    F: Fn(S) -> Result<T> + Sync,
{
    if n_threads == 0 {
        return Err(RudepError::invalid_argument("n_threads must not be 0"));
    }
    let n_shards = shards.len();
    if n_shards == 0 {
        return Ok(vec![]);
    }
    let deadline = timeout.map(|t| Instant::now() + t);

    let (job_s, job_r) = crossbeam_channel::unbounded();
    for job in shards.into_iter().enumerate() {
        job_s
            .send(job)
            .map_err(|_| RudepError::worker("job queue closed"))?;
    }
    drop(job_s);
    let (res_s, res_r) = crossbeam_channel::unbounded();
    let cancelled = AtomicBool::new(false);

    thread::scope(|scope| {
        for i in 0..n_threads.min(n_shards) {
            let job_r = job_r.clone();
            let res_s = res_s.clone();
            let f = &f;
            let cancelled = &cancelled;
            thread::Builder::new()
                .name(format!("rudep-worker-{i}"))
                .spawn_scoped(scope, move || {
                    while !cancelled.load(Ordering::Relaxed) {
                        let Ok((id, shard)) = job_r.try_recv() else {
                            break;
                        };
                        let res = panic::catch_unwind(AssertUnwindSafe(|| f(shard)))
                            .unwrap_or_else(|_| {
                                Err(RudepError::worker(format!("panicked on shard {id}")))
                            });
                        if res_s.send((id, res)).is_err() {
                            break;
                        }
                    }
                })?;
        }
        drop(res_s);

        let mut slots: Vec<Option<T>> = (0..n_shards).map(|_| None).collect();
        let mut n_received = 0;
        let outcome = loop {
            if n_received == n_shards {
                break Ok(());
            }
            let msg = match deadline {
                Some(deadline) => res_r.recv_deadline(deadline).map_err(|e| match e {
                    RecvTimeoutError::Timeout => RudepError::worker("timed out"),
                    RecvTimeoutError::Disconnected => RudepError::worker("workers exited early"),
                }),
                None => res_r
                    .recv()
                    .map_err(|_| RudepError::worker("workers exited early")),
            };
            match msg {
                Ok((id, Ok(result))) => {
                    slots[id] = Some(result);
                    n_received += 1;
                }
                Ok((id, Err(e))) => {
                    break Err(match e {
                        RudepError::Worker(_) => e,
                        e => RudepError::worker(format!("shard {id}: {e}")),
                    });
                }
                Err(e) => break Err(e),
            }
        };
        if let Err(e) = outcome {
            log::warn!("cancelling queued shards: {e}");
            cancelled.store(true, Ordering::Relaxed);
            return Err(e);
        }

        slots
            .into_iter()
            .map(|slot| slot.ok_or_else(|| RudepError::worker("missing shard result")))
            .collect()
    })
}
