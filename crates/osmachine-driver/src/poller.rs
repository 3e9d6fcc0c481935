//! Bounded status polling
//!
//! [`decide`] is the pure per-poll decision; [`Poller::wait`] drives it with
//! a fixed interval, a deadline and an external cancellation token.

use crate::error::{DriverError, Result};
use osmachine_cloud::{ServerStatus, VolumeStatus};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A status that can be waited on
pub trait PollStatus: Clone + PartialEq + fmt::Display {
    /// Status standing for "the resource no longer exists"
    fn absent() -> Self;

    /// Whether the platform reports a generic error state
    fn is_error(&self) -> bool;
}

impl PollStatus for ServerStatus {
    fn absent() -> Self {
        ServerStatus::Deleted
    }

    fn is_error(&self) -> bool {
        *self == ServerStatus::Error
    }
}

impl PollStatus for VolumeStatus {
    fn absent() -> Self {
        VolumeStatus::Deleting
    }

    fn is_error(&self) -> bool {
        *self == VolumeStatus::Error
    }
}

/// One observation of a resource that still exists
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<S> {
    pub status: S,
    pub fault: Option<String>,
}

impl<S> Observation<S> {
    pub fn new(status: S) -> Self {
        Self {
            status,
            fault: None,
        }
    }

    pub fn with_fault(mut self, fault: impl Into<String>) -> Self {
        self.fault = Some(fault.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Continue,
    Succeed,
    Fail(FailReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailReason {
    /// The resource disappeared although absence is not a target
    Vanished,
    /// The resource reached a status that is neither pending nor target
    Unexpected {
        status: String,
        fault: Option<String>,
    },
}

/// Decide what a single observation means; `None` means the resource is gone
pub fn decide<S: PollStatus>(
    observed: Option<&Observation<S>>,
    pending: &[S],
    target: &[S],
) -> Decision {
    let Some(observation) = observed else {
        return if target.contains(&S::absent()) {
            Decision::Succeed
        } else {
            Decision::Fail(FailReason::Vanished)
        };
    };

    if target.contains(&observation.status) {
        Decision::Succeed
    } else if pending.is_empty() || pending.contains(&observation.status) {
        Decision::Continue
    } else {
        Decision::Fail(FailReason::Unexpected {
            status: observation.status.to_string(),
            fault: observation
                .fault
                .clone()
                .filter(|_| observation.status.is_error()),
        })
    }
}

/// Interval/deadline loop around [`decide`]
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(interval: Duration, cancel: CancellationToken) -> Self {
        Self { interval, cancel }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll `observe` until it reports a target status
    ///
    /// No poll is issued at or after the deadline, nor after cancellation;
    /// both end the wait with [`DriverError::Timeout`].
    pub async fn wait<S, F, Fut>(
        &self,
        resource: &'static str,
        id: &str,
        pending: &[S],
        target: &[S],
        timeout: Duration,
        mut observe: F,
    ) -> Result<()>
    where
        S: PollStatus,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<Observation<S>>>>,
    {
        let deadline = Instant::now() + timeout;

        loop {
            if self.cancel.is_cancelled() {
                return Err(DriverError::Timeout(format!(
                    "waiting for {} [ID={}] was cancelled",
                    resource, id
                )));
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout(format!(
                    "{} [ID={}] did not reach target status within {:?}",
                    resource, id, timeout
                )));
            }

            let observed = observe().await?;
            match &observed {
                Some(o) => debug!("{} [ID={}] status: {}", resource, id, o.status),
                None => debug!("{} [ID={}] is gone", resource, id),
            }

            match decide(observed.as_ref(), pending, target) {
                Decision::Succeed => return Ok(()),
                Decision::Continue => {}
                Decision::Fail(FailReason::Vanished) => {
                    return Err(DriverError::NotFound(format!(
                        "{} [ID={}] disappeared while waiting",
                        resource, id
                    )));
                }
                Decision::Fail(FailReason::Unexpected { status, fault }) => {
                    return Err(DriverError::UnexpectedStatus {
                        resource,
                        id: id.to_string(),
                        status,
                        fault,
                    });
                }
            }

            let wake = deadline.min(Instant::now() + self.interval);
            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INTERVAL: Duration = Duration::from_secs(5);

    /// Replays `statuses`, repeating the last one, and counts polls
    fn scripted(
        statuses: Vec<Option<Observation<ServerStatus>>>,
        polls: Arc<AtomicUsize>,
    ) -> impl FnMut() -> std::future::Ready<Result<Option<Observation<ServerStatus>>>> {
        move || {
            let n = polls.fetch_add(1, Ordering::SeqCst);
            let i = n.min(statuses.len() - 1);
            std::future::ready(Ok(statuses[i].clone()))
        }
    }

    fn seen(status: ServerStatus) -> Option<Observation<ServerStatus>> {
        Some(Observation::new(status))
    }

    #[test]
    fn test_decide() {
        let pending = [ServerStatus::Build];
        let target = [ServerStatus::Active];

        let build = Observation::new(ServerStatus::Build);
        let active = Observation::new(ServerStatus::Active);
        assert_eq!(decide(Some(&build), &pending, &target), Decision::Continue);
        assert_eq!(decide(Some(&active), &pending, &target), Decision::Succeed);
        assert_eq!(
            decide(None, &pending, &target),
            Decision::Fail(FailReason::Vanished)
        );

        // absence satisfies a deletion target; anything else keeps polling
        let deleted = [ServerStatus::Deleted];
        assert_eq!(decide(None, &[], &deleted), Decision::Succeed);
        assert_eq!(decide(Some(&active), &[], &deleted), Decision::Continue);
    }

    #[test]
    fn test_decide_attaches_fault_only_on_error() {
        let pending = [ServerStatus::Build];
        let target = [ServerStatus::Active];

        let error = Observation::new(ServerStatus::Error).with_fault("No valid host was found");
        assert_eq!(
            decide(Some(&error), &pending, &target),
            Decision::Fail(FailReason::Unexpected {
                status: "ERROR".to_string(),
                fault: Some("No valid host was found".to_string()),
            })
        );

        let shutoff = Observation::new(ServerStatus::ShutOff).with_fault("stale");
        assert_eq!(
            decide(Some(&shutoff), &pending, &target),
            Decision::Fail(FailReason::Unexpected {
                status: "SHUTOFF".to_string(),
                fault: None,
            })
        );
    }

    #[test]
    fn test_decide_volume_statuses() {
        let pending = [VolumeStatus::Downloading, VolumeStatus::Creating];
        let target = [VolumeStatus::Available];

        let downloading = Observation::new(VolumeStatus::Downloading);
        assert_eq!(decide(Some(&downloading), &pending, &target), Decision::Continue);
        assert_eq!(
            decide(None, &[], &[VolumeStatus::Deleting]),
            Decision::Succeed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_succeeds_after_three_polls() {
        let polls = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new(INTERVAL, CancellationToken::new());
        let start = Instant::now();

        poller
            .wait(
                "server",
                "s-1",
                &[ServerStatus::Build],
                &[ServerStatus::Active],
                Duration::from_secs(600),
                scripted(
                    vec![
                        seen(ServerStatus::Build),
                        seen(ServerStatus::Build),
                        seen(ServerStatus::Active),
                    ],
                    polls.clone(),
                ),
            )
            .await
            .unwrap();

        assert_eq!(polls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_fails_fast_on_error_with_fault() {
        let polls = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new(INTERVAL, CancellationToken::new());

        let err = poller
            .wait(
                "server",
                "s-1",
                &[ServerStatus::Build],
                &[ServerStatus::Active],
                Duration::from_secs(600),
                scripted(
                    vec![
                        seen(ServerStatus::Build),
                        Some(
                            Observation::new(ServerStatus::Error)
                                .with_fault("No valid host was found"),
                        ),
                    ],
                    polls.clone(),
                ),
            )
            .await
            .unwrap_err();

        assert_eq!(polls.load(Ordering::SeqCst), 2);
        assert!(err.to_string().contains("No valid host was found"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_without_polling_past_deadline() {
        let polls = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new(INTERVAL, CancellationToken::new());
        let start = Instant::now();

        let err = poller
            .wait(
                "server",
                "s-1",
                &[ServerStatus::Build],
                &[ServerStatus::Active],
                Duration::from_secs(12),
                scripted(vec![seen(ServerStatus::Build)], polls.clone()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DriverError::Timeout(_)));
        // polls at 0s, 5s and 10s; the wait ends at the 12s deadline
        assert_eq!(polls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_deletion_succeeds_when_resource_disappears() {
        let polls = Arc::new(AtomicUsize::new(0));
        let poller = Poller::new(INTERVAL, CancellationToken::new());

        poller
            .wait(
                "server",
                "s-1",
                &[],
                &[ServerStatus::Deleted],
                Duration::from_secs(300),
                scripted(vec![seen(ServerStatus::Active), None], polls.clone()),
            )
            .await
            .unwrap();

        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_stops_on_cancellation() {
        let polls = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        let poller = Poller::new(INTERVAL, cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = poller
            .wait(
                "server",
                "s-1",
                &[ServerStatus::Build],
                &[ServerStatus::Active],
                Duration::from_secs(600),
                scripted(vec![seen(ServerStatus::Build)], polls.clone()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DriverError::Timeout(_)));
        assert_eq!(polls.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }
}
