// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The tick thread: one `mio::Poll` loop per [`Context`](crate::context::Context)
//! driving every socket and timer in the process (spec.md §5, "Single
//! tick thread per `Context`").
//!
//! Mirrors the teacher's TCP I/O thread (command channel in, event
//! channel out, a `Waker` token so commands take effect without waiting
//! out a poll timeout) but generalized: callers register any
//! `mio::event::Source` under a caller-chosen [`Token`], and may also
//! arm one-shot or repeating timers against a `Token` so timer fires and
//! socket readiness share one dispatch path.

use crate::core::rt::timer::{TimerId, TimerWheel};
use mio::{Events, Interest, Poll, Token, Waker};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const WAKER_TOKEN: Token = Token(usize::MAX);
const MAX_EVENTS: usize = 256;
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(250);

/// A readiness or timer notification delivered to the owning
/// [`Context`](crate::context::Context).
#[derive(Debug, Clone, Copy)]
pub enum SchedulerEvent {
    Readable(Token),
    Writable(Token),
    /// A timer armed against `Token` elapsed.
    TimerFired(Token),
}

enum SchedulerCommand {
    Register { token: Token, source: Box<dyn mio::event::Source + Send>, interest: Interest },
    Deregister { token: Token },
    ScheduleOnce { token: Token, delay: Duration },
    ScheduleRepeating { token: Token, period: Duration },
    CancelTimer { id: TimerId },
    Shutdown,
}

/// Handle to a running tick thread. Dropping it stops the thread.
pub struct Scheduler {
    commands: Sender<SchedulerCommand>,
    events: Receiver<SchedulerEvent>,
    waker: Arc<Waker>,
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the tick thread.
    ///
    /// # Errors
    /// Returns [`crate::Error`] if the underlying `mio::Poll` or `Waker`
    /// cannot be created.
    pub fn spawn() -> crate::Result<Self> {
        let poll = Poll::new().map_err(crate::Error::ConnectionFailed)?;
        let waker = Arc::new(
            Waker::new(poll.registry(), WAKER_TOKEN).map_err(crate::Error::ConnectionFailed)?,
        );
        let (cmd_tx, cmd_rx) = channel();
        let (evt_tx, evt_rx) = channel();
        let running = Arc::new(AtomicBool::new(true));

        let worker_running = running.clone();
        let join = thread::Builder::new()
            .name("rdmnet-tick".into())
            .spawn(move || run_loop(poll, cmd_rx, evt_tx, worker_running))
            .map_err(|e| crate::Error::ConnectionFailed(std::io::Error::other(e)))?;

        Ok(Self { commands: cmd_tx, events: evt_rx, waker, running, join: Some(join) })
    }

    /// Register a pollable source under `token`. Deliveries arrive as
    /// [`SchedulerEvent::Readable`]/[`SchedulerEvent::Writable`] from
    /// [`Scheduler::try_recv`].
    pub fn register(
        &self,
        token: Token,
        source: impl mio::event::Source + Send + 'static,
        interest: Interest,
    ) {
        let _ = self.commands.send(SchedulerCommand::Register {
            token,
            source: Box::new(source),
            interest,
        });
        self.waker.wake().ok();
    }

    pub fn deregister(&self, token: Token) {
        let _ = self.commands.send(SchedulerCommand::Deregister { token });
        self.waker.wake().ok();
    }

    /// Arm a one-shot timer; fires as [`SchedulerEvent::TimerFired`]`(token)`.
    pub fn schedule_once(&self, token: Token, delay: Duration) {
        let _ = self.commands.send(SchedulerCommand::ScheduleOnce { token, delay });
        self.waker.wake().ok();
    }

    /// Arm a repeating timer; re-arms itself after every fire.
    pub fn schedule_repeating(&self, token: Token, period: Duration) {
        let _ = self.commands.send(SchedulerCommand::ScheduleRepeating { token, period });
        self.waker.wake().ok();
    }

    pub fn cancel_timer(&self, id: TimerId) {
        let _ = self.commands.send(SchedulerCommand::CancelTimer { id });
        self.waker.wake().ok();
    }

    /// Drain one pending event without blocking. Callers typically poll
    /// this from their own dispatch loop.
    #[must_use]
    pub fn try_recv(&self) -> Option<SchedulerEvent> {
        self.events.try_recv().ok()
    }

    /// Block until an event arrives or `timeout` elapses.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SchedulerEvent> {
        self.events.recv_timeout(timeout).ok()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.commands.send(SchedulerCommand::Shutdown);
        self.waker.wake().ok();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn run_loop(
    mut poll: Poll,
    commands: Receiver<SchedulerCommand>,
    events_tx: Sender<SchedulerEvent>,
    running: Arc<AtomicBool>,
) {
    let mut sources: HashMap<Token, Box<dyn mio::event::Source + Send>> = HashMap::new();
    let mut timers = TimerWheel::new();
    let mut timer_tokens: HashMap<TimerId, Token> = HashMap::new();
    let mut mio_events = Events::with_capacity(MAX_EVENTS);

    while running.load(Ordering::SeqCst) {
        while let Ok(cmd) = commands.try_recv() {
            match cmd {
                SchedulerCommand::Register { token, mut source, interest } => {
                    if poll.registry().register(&mut *source, token, interest).is_ok() {
                        sources.insert(token, source);
                    }
                }
                SchedulerCommand::Deregister { token } => {
                    if let Some(mut source) = sources.remove(&token) {
                        let _ = poll.registry().deregister(&mut *source);
                    }
                }
                SchedulerCommand::ScheduleOnce { token, delay } => {
                    let id = timers.schedule_once(Instant::now(), delay);
                    timer_tokens.insert(id, token);
                }
                SchedulerCommand::ScheduleRepeating { token, period } => {
                    let id = timers.schedule_repeating(Instant::now(), period);
                    timer_tokens.insert(id, token);
                }
                SchedulerCommand::CancelTimer { id } => {
                    timers.cancel(id);
                    timer_tokens.remove(&id);
                }
                SchedulerCommand::Shutdown => return,
            }
        }

        let now = Instant::now();
        let timer_timeout = timers.next_timeout(now).unwrap_or(DEFAULT_POLL_TIMEOUT);
        let poll_timeout = timer_timeout.min(DEFAULT_POLL_TIMEOUT);

        if let Err(e) = poll.poll(&mut mio_events, Some(poll_timeout)) {
            if e.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            log::warn!("rdmnet scheduler poll error: {e}");
            continue;
        }

        for event in mio_events.iter() {
            let token = event.token();
            if token == WAKER_TOKEN {
                continue;
            }
            if event.is_readable() {
                let _ = events_tx.send(SchedulerEvent::Readable(token));
            }
            if event.is_writable() {
                let _ = events_tx.send(SchedulerEvent::Writable(token));
            }
        }

        for id in timers.pop_due(Instant::now()) {
            if let Some(token) = timer_tokens.get(&id) {
                let _ = events_tx.send(SchedulerEvent::TimerFired(*token));
            }
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn one_shot_timer_fires_once() {
        let scheduler = Scheduler::spawn().expect("spawn scheduler");
        let token = Token(7);
        scheduler.schedule_once(token, Duration::from_millis(20));

        let fired = scheduler.recv_timeout(Duration::from_secs(1));
        assert!(matches!(fired, Some(SchedulerEvent::TimerFired(t)) if t == token));

        // No second fire within a reasonable window.
        assert!(scheduler.recv_timeout(Duration::from_millis(100)).is_none());
    }

    #[test]
    fn repeating_timer_fires_more_than_once() {
        let scheduler = Scheduler::spawn().expect("spawn scheduler");
        let token = Token(9);
        scheduler.schedule_repeating(token, Duration::from_millis(15));

        let first = scheduler.recv_timeout(Duration::from_secs(1));
        let second = scheduler.recv_timeout(Duration::from_secs(1));
        assert!(matches!(first, Some(SchedulerEvent::TimerFired(t)) if t == token));
        assert!(matches!(second, Some(SchedulerEvent::TimerFired(t)) if t == token));
    }
}
