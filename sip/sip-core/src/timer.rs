//! One-shot timers delivering their expiry into the event loop
//!
//! Every timer carries a generation number. Owners keep the [`Timer`] they
//! started and compare generations on expiry, so an expiry that raced with
//! a stop or restart is recognized as stale and ignored.

use crate::session::SessionId;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Who started a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerOwner {
    Session(SessionId),
    Registration(u32),
}

impl TimerOwner {
    pub(crate) fn target(self, slot: TimerSlot) -> TimerTarget {
        TimerTarget { owner: self, slot }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimerTarget {
    pub(crate) owner: TimerOwner,
    pub(crate) slot: TimerSlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerSlot {
    /// Client request timeout (Timer B/F)
    ClientTimeout,
    /// Client request retransmission (Timer A/E)
    ClientRetransmit,
    /// 2xx retransmission while waiting for the ACK
    ServerRetransmit,
    /// No ACK received for our 2xx
    ServerTimeout,
    /// Refresh a registration binding
    Refresh,
}

/// Expiry of a timer, passed back into [`Transactions::on_timer`](crate::Transactions::on_timer)
#[derive(Debug, Clone, Copy)]
pub struct TimerExpired {
    pub(crate) target: TimerTarget,
    pub(crate) generation: u64,
}

/// Running timer, dropping it cancels it
#[derive(Debug)]
pub(crate) struct Timer {
    generation: u64,
    task: JoinHandle<()>,
}

impl Timer {
    pub(crate) fn is(&self, expired: &TimerExpired) -> bool {
        self.generation == expired.generation
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug)]
pub(crate) struct Timers {
    sender: mpsc::UnboundedSender<TimerExpired>,
    generation: u64,
}

impl Timers {
    pub(crate) fn new(sender: mpsc::UnboundedSender<TimerExpired>) -> Self {
        Self {
            sender,
            generation: 0,
        }
    }

    pub(crate) fn start(&mut self, target: TimerTarget, after: Duration) -> Timer {
        self.generation += 1;

        let expired = TimerExpired {
            target,
            generation: self.generation,
        };

        let sender = self.sender.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;

            // receiver gone means the event loop is shutting down
            let _ = sender.send(expired);
        });

        Timer {
            generation: self.generation,
            task,
        }
    }
}

/// Returns true if `timer` is set and `expired` belongs to it
pub(crate) fn is_current(timer: &Option<Timer>, expired: &TimerExpired) -> bool {
    timer.as_ref().is_some_and(|timer| timer.is(expired))
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expiry_and_stale_detection() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);

        let target = TimerOwner::Session(SessionId::new(1)).target(TimerSlot::ClientTimeout);

        let first = timers.start(target, Duration::from_secs(1));
        let second = timers.start(target, Duration::from_secs(2));

        let expired = rx.recv().await.unwrap();
        assert!(first.is(&expired));
        assert!(!second.is(&expired));

        drop(second);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
