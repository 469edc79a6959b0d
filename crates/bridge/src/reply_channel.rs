//! The two reply queues and the active-queue selector.
//!
//! The router pushes every line onto the *active* queue. Normally that is the
//! default queue. A transaction takes the exclusive transaction lock and makes
//! the control queue active through [`ReplyChannel::activate_control`]; the
//! returned [`ControlGuard`] switches back when it is dropped, whether the
//! transaction returned, failed, panicked or was cancelled.
//!
//! ## Invariants
//!
//! - exactly one queue is active at any time
//! - the selector only changes while the transaction lock is held
//! - the control queue is empty whenever the default queue is active: on
//!   release, leftover control lines move to the back of the default queue
//! - a line is delivered to exactly one consumer

use crate::errors::{BridgeError, Result};
use core_types::Line;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueId {
    Default,
    Control,
}

struct Queues {
    default: VecDeque<Line>,
    control: VecDeque<Line>,
    active: QueueId,
    closed: bool,
    close_reason: Option<BridgeError>,
}

impl Queues {
    fn get_mut(&mut self, id: QueueId) -> &mut VecDeque<Line> {
        match id {
            QueueId::Default => &mut self.default,
            QueueId::Control => &mut self.control,
        }
    }
}

pub struct ReplyChannel {
    // Held only for short, non-async critical sections.
    queues: Mutex<Queues>,
    default_ready: Notify,
    control_ready: Notify,
    // Serializes transactions and plain writes. Fair (FIFO) in tokio.
    transaction: tokio::sync::Mutex<()>,
}

impl ReplyChannel {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(Queues {
                default: VecDeque::new(),
                control: VecDeque::new(),
                active: QueueId::Default,
                closed: false,
                close_reason: None,
            }),
            default_ready: Notify::new(),
            control_ready: Notify::new(),
            transaction: tokio::sync::Mutex::new(()),
        }
    }

    fn queues(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notifier(&self, id: QueueId) -> &Notify {
        match id {
            QueueId::Default => &self.default_ready,
            QueueId::Control => &self.control_ready,
        }
    }

    /// Append `line` to the active queue. Never blocks. Ignored once closed.
    pub fn push(&self, line: Line) {
        let target = {
            let mut queues = self.queues();
            if queues.closed {
                return;
            }
            let target = queues.active;
            queues.get_mut(target).push_back(line);
            target
        };
        self.notifier(target).notify_waiters();
    }

    /// Queue the router is currently delivering to.
    pub fn active(&self) -> QueueId {
        self.queues().active
    }

    pub fn default_len(&self) -> usize {
        self.queues().default.len()
    }

    pub fn control_len(&self) -> usize {
        self.queues().control.len()
    }

    /// Next default-queue line, waiting for one if necessary.
    ///
    /// Returns `None` once the channel is closed and the queue is drained.
    pub async fn pop_default(&self) -> Option<Line> {
        self.pop(QueueId::Default).await
    }

    pub fn try_pop_default(&self) -> Option<Line> {
        self.queues().default.pop_front()
    }

    async fn pop(&self, id: QueueId) -> Option<Line> {
        let notify = self.notifier(id);
        loop {
            // Register interest before looking, so a push between the check
            // and the await still wakes us.
            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut queues = self.queues();
                if let Some(line) = queues.get_mut(id).pop_front() {
                    return Some(line);
                }
                if queues.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Take the transaction lock without switching queues.
    ///
    /// Used for writes whose replies belong on the default queue, so they
    /// cannot interleave with a control transaction.
    pub async fn lock_transaction(&self) -> TransactionGuard<'_> {
        TransactionGuard {
            _lock: self.transaction.lock().await,
        }
    }

    /// Take the transaction lock and make the control queue active.
    pub async fn activate_control(&self) -> ControlGuard<'_> {
        let lock = self.transaction.lock().await;
        self.queues().active = QueueId::Control;
        debug!("control queue active");
        ControlGuard {
            channel: self,
            _lock: lock,
        }
    }

    /// Make the default queue active and move residual control lines to the
    /// back of it, preserving their order. Returns how many lines moved.
    ///
    /// Runs automatically when a [`ControlGuard`] drops. Calling it again, or
    /// when the default queue is already active, is harmless.
    pub fn restore_default(&self) -> usize {
        let moved = {
            let mut queues = self.queues();
            queues.active = QueueId::Default;
            let residual = std::mem::take(&mut queues.control);
            let moved = residual.len();
            queues.default.extend(residual);
            moved
        };
        if moved > 0 {
            debug!(moved, "residual control lines moved to default queue");
            self.default_ready.notify_waiters();
        }
        moved
    }

    /// Stop accepting lines and wake every waiter. Queued lines stay poppable.
    pub fn close(&self, reason: Option<BridgeError>) {
        {
            let mut queues = self.queues();
            if queues.closed {
                return;
            }
            queues.closed = true;
            queues.close_reason = reason;
        }
        self.default_ready.notify_waiters();
        self.control_ready.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.queues().closed
    }

    /// Why the channel was closed, if it was closed by a failure.
    pub fn close_reason(&self) -> Option<BridgeError> {
        self.queues().close_reason.clone()
    }
}

impl Default for ReplyChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to the serial write side, default queue stays active.
pub struct TransactionGuard<'a> {
    _lock: tokio::sync::MutexGuard<'a, ()>,
}

/// Scope during which the control queue is active.
///
/// Dropping the guard restores the default queue, drains residual control
/// lines into it and only then releases the transaction lock.
pub struct ControlGuard<'a> {
    channel: &'a ReplyChannel,
    _lock: tokio::sync::MutexGuard<'a, ()>,
}

impl ControlGuard<'_> {
    /// Next control-queue line, waiting for one if necessary.
    pub async fn pop(&mut self) -> Result<Line> {
        self.channel
            .pop(QueueId::Control)
            .await
            .ok_or(BridgeError::ChannelClosed)
    }

    pub fn try_pop(&mut self) -> Option<Line> {
        self.channel.queues().control.pop_front()
    }
}

impl Drop for ControlGuard<'_> {
    fn drop(&mut self) {
        self.channel.restore_default();
        debug!("default queue active");
        // `_lock` is released after this body returns.
    }
}
