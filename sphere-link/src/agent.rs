//! The agent event loop. It runs on one thread: every timer callback runs to
//! completion against the [`Session`] before the next one is looked at, so
//! nothing here needs a lock

use std::future::{pending, Future};
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};

use crate::{ExitCode, Session};

fn timer(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => pending().await,
    }
}

/// Drive `session` until `shutdown` resolves or a fatal error is recorded.
/// The poll timer is re-armed whenever the session's poll period changes,
/// the next tick coming one full new period later
pub async fn run<F: Future>(session: &mut Session, shutdown: F) -> ExitCode {
    tokio::pin!(shutdown);

    let mut armed = session.poll_period();
    let mut poll = timer(armed);
    let mut button = session.button_period().map(timer);

    log::info!("Agent loop started, polling every {armed:?}");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Shutdown requested");
                return ExitCode::Success;
            }
            _ = poll.tick() => {
                session.on_tick();

                let period = session.poll_period();
                if period != armed {
                    log::debug!("Poll period changed from {armed:?} to {period:?}");
                    armed = period;
                    poll = timer(armed);
                }
            }
            _ = next_tick(&mut button) => {
                session.poll_button();
            }
        }

        if let Some(code) = session.exit_code() {
            return code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ConnectionManager, Journal, LoopbackConnector, NetworkError, Provisioning, Reachability,
        ReconnectPolicy, TwinSynchronizer,
    };
    use spherep_device::{Button, DeviceError, SimulatedClimate};

    struct AlwaysUp;

    impl Reachability for AlwaysUp {
        fn is_connected_to_internet(&self) -> Result<bool, NetworkError> {
            Ok(true)
        }
    }

    struct BrokenButton;

    impl Button for BrokenButton {
        fn is_pressed(&mut self) -> Result<bool, DeviceError> {
            Err(DeviceError::GpioRead("button".to_string()))
        }
    }

    fn session(journal: &Journal, failures: u32) -> Session {
        let connection = ConnectionManager::new(
            Box::new(LoopbackConnector::new(journal.clone()).failing_first(failures)),
            Provisioning::Direct {
                hostname: "hub.example.net".to_string(),
                device_id: "sphere-01".to_string(),
            },
            ReconnectPolicy::default(),
        );
        Session::new(
            connection,
            TwinSynchronizer::new(),
            Box::new(AlwaysUp),
            Box::new(SimulatedClimate::default()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn failing_setups_follow_the_backoff() {
        let journal = Journal::default();
        let mut session = session(&journal, u32::MAX);

        // attempts at 2s, 62s and 182s; the next would be at 422s
        let code = run(
            &mut session,
            tokio::time::sleep(Duration::from_secs(200)),
        )
        .await;

        assert_eq!(code, ExitCode::Success);
        assert_eq!(journal.connects(), 3);
        assert_eq!(session.poll_period(), Duration::from_secs(240));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_to_default_period() {
        let journal = Journal::default();
        let mut session = session(&journal, 2);

        // fails at 2s and 62s, succeeds at 182s, then polls every 2s
        let code = run(
            &mut session,
            tokio::time::sleep(Duration::from_secs(191)),
        )
        .await;

        assert_eq!(code, ExitCode::Success);
        assert_eq!(journal.connects(), 3);
        assert_eq!(session.poll_period(), Duration::from_secs(2));
        assert!(session.connection().is_authenticated());
        assert_eq!(journal.reported_states().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_button_error_ends_the_loop() {
        let journal = Journal::default();
        let mut session =
            session(&journal, 0).with_button(Box::new(BrokenButton), Duration::from_millis(1));

        let code = run(&mut session, pending::<()>()).await;
        assert_eq!(code, ExitCode::IsButtonPressedGetValue);
        assert_eq!(journal.connects(), 0);
    }
}
