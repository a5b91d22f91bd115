//! Build polling
//!
//! Jenkins triggers are fire-and-forget: a trigger only queues a build.
//! [`PollingExecutor`] turns that into a blocking wait by checking the build
//! status on a fixed interval until it reaches a terminal state, optionally
//! streaming the console output as it grows.
//!
//! The wait can be cancelled (Ctrl-C) through a [`CancellationToken`]. A
//! cancelled wait only stops watching; the remote build keeps running.

use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::job::{BuildReference, JobStatus};
use crate::error::{Error, Result};
use crate::remote::RemoteCi;

/// Default time between status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Extra delay added per consecutive failed status check
pub const DEFAULT_UNKNOWN_STEP: Duration = Duration::from_secs(2);

/// Upper bound for the widened interval
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(30);

/// Consecutive failed status checks tolerated before giving up
pub const DEFAULT_MAX_UNKNOWN: u32 = 5;

/// Upper bound on console requests when draining a finished build
const MAX_DRAIN_REQUESTS: usize = 1000;

/// Polling configuration
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub unknown_step: Duration,
    pub max_interval: Duration,
    pub max_unknown: u32,
    /// Fetch and emit new console output on every tick
    pub stream_console: bool,
    /// Console offset to stream from; output before it is not emitted
    pub console_offset: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            unknown_step: DEFAULT_UNKNOWN_STEP,
            max_interval: DEFAULT_MAX_INTERVAL,
            max_unknown: DEFAULT_MAX_UNKNOWN,
            stream_console: false,
            console_offset: 0,
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_unknown(mut self, max_unknown: u32) -> Self {
        self.max_unknown = max_unknown;
        self
    }

    pub fn with_console(mut self, stream_console: bool) -> Self {
        self.stream_console = stream_console;
        self
    }

    /// Stream console output starting at `offset`
    pub fn with_console_from(mut self, offset: u64) -> Self {
        self.stream_console = true;
        self.console_offset = offset;
        self
    }

    /// Delay before the next tick after `unknown` consecutive failures
    pub fn delay(&self, unknown: u32) -> Duration {
        if unknown == 0 {
            return self.interval;
        }
        let widened = self.interval + self.unknown_step.saturating_mul(unknown);
        widened.min(self.max_interval.max(self.interval))
    }
}

/// Progress reported while waiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent<'a> {
    /// The queued build was assigned a number
    BuildNumber(u64),
    /// The observed status changed
    Status(JobStatus),
    /// New console output
    Console(&'a str),
    /// A non-terminal tick finished; the next one follows after `next_in`
    Waiting {
        status: JobStatus,
        elapsed: Duration,
        next_in: Duration,
    },
}

/// What was observed during a wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// Final status, or the last status known before cancellation
    pub status: JobStatus,
    pub build_number: Option<u64>,
    pub elapsed: Duration,
    /// Every distinct status observed, in order, starting with `Queued`
    pub history: Vec<JobStatus>,
    pub ticks: u32,
}

/// How a wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The build reached a terminal status
    Finished(PollReport),
    /// The wait was cancelled locally; the build may still be running remotely
    Cancelled(PollReport),
}

impl PollOutcome {
    pub fn report(&self) -> &PollReport {
        match self {
            PollOutcome::Finished(report) | PollOutcome::Cancelled(report) => report,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PollOutcome::Cancelled(_))
    }
}

struct WaitState {
    started: Instant,
    status: JobStatus,
    last_known: JobStatus,
    build_number: Option<u64>,
    console_offset: u64,
    unknown: u32,
    history: Vec<JobStatus>,
    ticks: u32,
}

impl WaitState {
    fn new(build: &BuildReference, console_offset: u64) -> Self {
        Self {
            started: Instant::now(),
            status: JobStatus::Queued,
            last_known: JobStatus::Queued,
            build_number: build.build_number,
            console_offset,
            unknown: 0,
            history: vec![JobStatus::Queued],
            ticks: 0,
        }
    }

    fn report(&self) -> PollReport {
        PollReport {
            status: self.last_known,
            build_number: self.build_number,
            elapsed: self.started.elapsed(),
            history: self.history.clone(),
            ticks: self.ticks,
        }
    }
}

/// Waits for a remote build to finish
pub struct PollingExecutor<'a, R: ?Sized> {
    remote: &'a R,
    config: PollConfig,
}

impl<'a, R: RemoteCi + ?Sized> PollingExecutor<'a, R> {
    pub fn new(remote: &'a R, config: PollConfig) -> Self {
        Self { remote, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Polls `build` until it finishes or `cancel` fires
    ///
    /// A build without a number is first resolved through the remote and
    /// counts as `Queued` until a number is assigned.
    ///
    /// # Arguments
    /// * `build` - The build to watch
    /// * `cancel` - Stops the wait when cancelled
    /// * `on_event` - Receives progress and console output
    ///
    /// # Errors
    /// Returns [`Error::PollingTimeout`] once more than `max_unknown`
    /// consecutive status checks have failed
    pub async fn wait<F>(
        &self,
        build: &BuildReference,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> Result<PollOutcome>
    where
        F: FnMut(PollEvent<'_>),
    {
        let mut state = WaitState::new(build, self.config.console_offset);
        info!("Waiting for {}", build);

        loop {
            if cancel.is_cancelled() {
                info!("Stopped waiting for {} (cancelled)", build);
                return Ok(PollOutcome::Cancelled(state.report()));
            }

            state.ticks += 1;
            match self.tick(build, &mut state, cancel, &mut on_event).await {
                Ok(Some(status)) => {
                    state.unknown = 0;
                    self.observe(&mut state, status, &mut on_event);
                }
                Ok(None) => {}
                Err(e) => {
                    state.unknown += 1;
                    warn!(
                        "Status check {} for {} failed ({}/{}): {:#}",
                        state.ticks, build.job_name, state.unknown, self.config.max_unknown, e
                    );
                    self.observe(&mut state, JobStatus::Unknown, &mut on_event);
                    if state.unknown > self.config.max_unknown {
                        return Err(Error::PollingTimeout {
                            build: describe(build, state.build_number),
                            attempts: state.unknown,
                            last_status: state.last_known,
                        });
                    }
                }
            }

            if state.status.is_terminal() {
                let report = state.report();
                info!(
                    "{} finished with {} after {:?}",
                    describe(build, state.build_number),
                    report.status,
                    report.elapsed
                );
                return Ok(PollOutcome::Finished(report));
            }

            if cancel.is_cancelled() {
                info!("Stopped waiting for {} (cancelled)", build);
                return Ok(PollOutcome::Cancelled(state.report()));
            }

            let next_in = self.config.delay(state.unknown);
            on_event(PollEvent::Waiting {
                status: state.status,
                elapsed: state.started.elapsed(),
                next_in,
            });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Stopped waiting for {} (cancelled)", build);
                    return Ok(PollOutcome::Cancelled(state.report()));
                }
                _ = time::sleep(next_in) => {}
            }
        }
    }

    /// One status check, resolving the build number first if needed
    ///
    /// Every remote call is raced against `cancel`. Returns `None` when the
    /// wait was cancelled before a status was read.
    async fn tick<F>(
        &self,
        build: &BuildReference,
        state: &mut WaitState,
        cancel: &CancellationToken,
        on_event: &mut F,
    ) -> anyhow::Result<Option<JobStatus>>
    where
        F: FnMut(PollEvent<'_>),
    {
        let number = match state.build_number {
            Some(number) => number,
            None => {
                let resolved = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(None),
                    resolved = self.remote.resolve_build_number(build) => resolved?,
                };
                match resolved {
                    Some(number) => {
                        debug!("{} resolved to build #{}", build.job_name, number);
                        state.build_number = Some(number);
                        on_event(PollEvent::BuildNumber(number));
                        number
                    }
                    None => {
                        debug!("{} is still queued", build.job_name);
                        return Ok(Some(JobStatus::Queued));
                    }
                }
            }
        };

        if cancel.is_cancelled() {
            return Ok(None);
        }
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            status = self.remote.get_status(&build.job_name, number) => status?,
        };
        debug!("{} #{} is {}", build.job_name, number, status);

        if self.config.stream_console && !cancel.is_cancelled() {
            self.stream_console(build, number, state, status.is_terminal(), cancel, on_event)
                .await;
        }

        Ok(Some(status))
    }

    /// Emits console output past the last seen offset
    ///
    /// Console failures are logged and skipped; they never fail the wait.
    async fn stream_console<F>(
        &self,
        build: &BuildReference,
        number: u64,
        state: &mut WaitState,
        drain: bool,
        cancel: &CancellationToken,
        on_event: &mut F,
    ) where
        F: FnMut(PollEvent<'_>),
    {
        for _ in 0..MAX_DRAIN_REQUESTS {
            if cancel.is_cancelled() {
                return;
            }
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                fetched = self
                    .remote
                    .get_console_output(&build.job_name, number, state.console_offset) => fetched,
            };
            let chunk = match fetched {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("Failed to fetch console output: {:#}", e);
                    return;
                }
            };

            if !chunk.text.is_empty() {
                on_event(PollEvent::Console(&chunk.text));
            }
            let advanced = chunk.next_offset > state.console_offset;
            state.console_offset = state.console_offset.max(chunk.next_offset);

            if !drain || !chunk.more || !advanced {
                return;
            }
        }
    }

    fn observe<F>(&self, state: &mut WaitState, status: JobStatus, on_event: &mut F)
    where
        F: FnMut(PollEvent<'_>),
    {
        if status != JobStatus::Unknown {
            state.last_known = status;
        }
        if status != state.status {
            debug!("Status {} -> {}", state.status, status);
            state.status = status;
            state.history.push(status);
            on_event(PollEvent::Status(status));
        }
    }
}

fn describe(build: &BuildReference, number: Option<u64>) -> String {
    match number {
        Some(n) => format!("{} #{}", build.job_name, n),
        None => build.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRemote;

    fn fast() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(1),
            unknown_step: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            max_unknown: 2,
            stream_console: false,
            console_offset: 0,
        }
    }

    #[tokio::test]
    async fn test_waits_until_success() {
        let remote = FakeRemote::default()
            .with_statuses(vec![Some(JobStatus::Running), Some(JobStatus::Succeeded)]);
        let executor = PollingExecutor::new(&remote, fast());
        let build = BuildReference::numbered("svc-build", 7);

        let outcome = executor
            .wait(&build, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        let PollOutcome::Finished(report) = outcome else {
            panic!("expected finished outcome");
        };
        assert_eq!(report.status, JobStatus::Succeeded);
        assert_eq!(
            report.history,
            vec![JobStatus::Queued, JobStatus::Running, JobStatus::Succeeded]
        );
        assert_eq!(report.build_number, Some(7));
        assert_eq!(remote.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_no_ticks_after_terminal_status() {
        let remote = FakeRemote::default().with_statuses(vec![
            Some(JobStatus::Running),
            Some(JobStatus::Failed),
            Some(JobStatus::Running),
        ]);
        let executor = PollingExecutor::new(&remote, fast());

        let outcome = executor
            .wait(&BuildReference::numbered("svc-build", 1), &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(outcome.report().status, JobStatus::Failed);
        assert_eq!(remote.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_queued_build_number_is_resolved_first() {
        let remote = FakeRemote::default()
            .with_build_numbers(vec![None, Some(42)])
            .with_statuses(vec![Some(JobStatus::Succeeded)]);
        let executor = PollingExecutor::new(&remote, fast());
        let mut numbers = Vec::new();

        let outcome = executor
            .wait(
                &BuildReference::queued("svc-build", Some(9)),
                &CancellationToken::new(),
                |event| {
                    if let PollEvent::BuildNumber(n) = event {
                        numbers.push(n);
                    }
                },
            )
            .await
            .unwrap();

        assert_eq!(numbers, vec![42]);
        assert_eq!(outcome.report().build_number, Some(42));
        assert_eq!(remote.resolve_calls(), 2);
        assert_eq!(remote.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_returns_last_status_without_more_calls() {
        let cancel = CancellationToken::new();
        let remote = FakeRemote::default()
            .with_statuses(vec![Some(JobStatus::Running), Some(JobStatus::Running)])
            .cancel_on_status_call(2, cancel.clone());
        let executor = PollingExecutor::new(&remote, fast());

        let outcome = executor
            .wait(&BuildReference::numbered("svc-build", 3), &cancel, |_| {})
            .await
            .unwrap();

        let PollOutcome::Cancelled(report) = outcome else {
            panic!("expected cancelled outcome");
        };
        assert_eq!(report.status, JobStatus::Running);
        assert_eq!(remote.poll_calls(), 2);
    }

    #[tokio::test]
    async fn test_cancel_during_status_check_skips_console() {
        let cancel = CancellationToken::new();
        let remote = FakeRemote::default()
            .with_statuses(vec![Some(JobStatus::Running); 3])
            .with_console(&["one\n", "two\n", "three\n"])
            .cancel_on_status_call(2, cancel.clone());
        let executor = PollingExecutor::new(&remote, fast().with_console(true));

        let outcome = executor
            .wait(&BuildReference::numbered("svc-build", 3), &cancel, |_| {})
            .await
            .unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(outcome.report().status, JobStatus::Running);
        assert_eq!(remote.status_calls(), 2);
        assert_eq!(remote.console_calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_number_lookup_stops_the_tick() {
        let cancel = CancellationToken::new();
        let remote = FakeRemote::default()
            .with_build_numbers(vec![Some(12)])
            .cancel_on_resolve(cancel.clone());
        let executor = PollingExecutor::new(&remote, fast().with_console(true));

        let outcome = executor
            .wait(&BuildReference::queued("svc-build", Some(4)), &cancel, |_| {})
            .await
            .unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(outcome.report().build_number, Some(12));
        assert_eq!(remote.resolve_calls(), 1);
        assert_eq!(remote.status_calls(), 0);
        assert_eq!(remote.console_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_makes_no_calls() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let remote = FakeRemote::default();
        let executor = PollingExecutor::new(&remote, fast());

        let outcome = executor
            .wait(&BuildReference::latest("svc-build"), &cancel, |_| {})
            .await
            .unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(outcome.report().status, JobStatus::Queued);
        assert_eq!(remote.poll_calls(), 0);
    }

    #[tokio::test]
    async fn test_transient_failures_are_tolerated() {
        let remote = FakeRemote::default().with_statuses(vec![
            Some(JobStatus::Running),
            None,
            None,
            Some(JobStatus::Succeeded),
        ]);
        let executor = PollingExecutor::new(&remote, fast());

        let outcome = executor
            .wait(&BuildReference::numbered("svc-build", 1), &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        let report = outcome.report();
        assert_eq!(report.status, JobStatus::Succeeded);
        assert_eq!(
            report.history,
            vec![
                JobStatus::Queued,
                JobStatus::Running,
                JobStatus::Unknown,
                JobStatus::Succeeded
            ]
        );
    }

    #[tokio::test]
    async fn test_too_many_failures_time_out() {
        let remote = FakeRemote::default()
            .with_statuses(vec![Some(JobStatus::Running), None, None, None, None]);
        let executor = PollingExecutor::new(&remote, fast());

        let result = executor
            .wait(&BuildReference::numbered("svc-build", 1), &CancellationToken::new(), |_| {})
            .await;

        match result {
            Err(Error::PollingTimeout {
                attempts,
                last_status,
                ..
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last_status, JobStatus::Running);
            }
            other => panic!("expected polling timeout, got {:?}", other),
        }
        assert_eq!(remote.status_calls(), 4);
    }

    #[tokio::test]
    async fn test_streams_only_new_console_output() {
        let remote = FakeRemote::default()
            .with_statuses(vec![
                Some(JobStatus::Running),
                Some(JobStatus::Running),
                Some(JobStatus::Succeeded),
            ])
            .with_console(&["Started\n", "Compiling\n", "Done\n", "Finished: SUCCESS\n"]);
        let executor = PollingExecutor::new(&remote, fast().with_console(true));
        let mut output = String::new();

        executor
            .wait(&BuildReference::numbered("svc-build", 1), &CancellationToken::new(), |event| {
                if let PollEvent::Console(text) = event {
                    output.push_str(text);
                }
            })
            .await
            .unwrap();

        assert_eq!(output, "Started\nCompiling\nDone\nFinished: SUCCESS\n");
        assert_eq!(remote.console_calls(), 4);
    }

    #[tokio::test]
    async fn test_streaming_skips_output_before_offset() {
        let remote = FakeRemote::default()
            .with_statuses(vec![Some(JobStatus::Running), Some(JobStatus::Succeeded)])
            .with_console(&["Started\n", "Done\n"]);
        let executor = PollingExecutor::new(&remote, fast().with_console_from(8));
        let mut output = String::new();

        executor
            .wait(&BuildReference::numbered("svc-build", 1), &CancellationToken::new(), |event| {
                if let PollEvent::Console(text) = event {
                    output.push_str(text);
                }
            })
            .await
            .unwrap();

        assert_eq!(output, "Done\n");
    }

    #[test]
    fn test_unknown_widens_interval_with_cap() {
        let config = PollConfig::default();
        assert_eq!(config.delay(0), Duration::from_secs(5));
        assert_eq!(config.delay(1), Duration::from_secs(7));
        assert_eq!(config.delay(3), Duration::from_secs(11));
        assert_eq!(config.delay(100), Duration::from_secs(30));
    }
}
