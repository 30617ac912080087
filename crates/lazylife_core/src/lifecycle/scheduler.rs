//! Self-resetting local-midnight timer.
//!
//! # Invariants
//! - At most one timer thread is outstanding per scheduler.
//! - `schedule` replaces any previous timer; `cancel` and drop stop it and
//!   wait for the thread to exit.

use crate::clock::{ms_until_next_local_midnight, Clock};
use chrono_tz::Tz;
use log::{debug, info};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct Timer {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Runs a job at every local midnight of one time zone.
pub struct MidnightScheduler {
    timezone: Tz,
    timer: Option<Timer>,
}

impl MidnightScheduler {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            timer: None,
        }
    }

    /// Arms the timer. `job` runs at the next local midnight as seen by
    /// `clock`, then the timer re-arms for the following one.
    pub fn schedule<C, F>(&mut self, clock: C, mut job: F)
    where
        C: Clock + Send + 'static,
        F: FnMut() + Send + 'static,
    {
        self.cancel();

        let (stop, stop_rx) = mpsc::channel::<()>();
        let timezone = self.timezone;
        let handle = thread::spawn(move || loop {
            let wait_ms = ms_until_next_local_midnight(timezone, clock.now_ms());
            debug!("event=midnight_timer module=lifecycle status=armed wait_ms={wait_ms}");
            match stop_rx.recv_timeout(Duration::from_millis(wait_ms.unsigned_abs())) {
                Err(RecvTimeoutError::Timeout) => {
                    info!("event=midnight_timer module=lifecycle status=fired");
                    job();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        self.timer = Some(Timer { stop, handle });
    }

    /// Stops the outstanding timer, if any.
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            let _ = timer.stop.send(());
            let _ = timer.handle.join();
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.timer.is_some()
    }
}

impl Drop for MidnightScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
