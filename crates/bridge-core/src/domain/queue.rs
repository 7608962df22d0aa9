//! Outbound message queue.
//!
//! Messages from the local side that cannot be written to the WebSocket right
//! now (not connected, or the write was refused) wait here.  When the
//! connection comes back the queue is drained front to back, so the remote
//! side sees messages in exactly the order the local client produced them.
//!
//! # Capacity
//!
//! The queue is unbounded.  A bridge that stays disconnected while its local
//! client keeps writing will grow without limit; the controller logs a
//! warning as the backlog grows but never drops messages.

use std::collections::VecDeque;

use tracing::trace;

/// Something that can accept one queued message for delivery.
///
/// Implemented by the live WebSocket link.  On refusal the message is handed
/// back untouched so the queue can put it back at the head.
pub trait DeliverySink<T> {
    /// Attempts delivery of `message`.
    ///
    /// # Errors
    ///
    /// Returns the message back when the sink is no longer writable.
    fn try_send(&mut self, message: T) -> Result<(), T>;
}

/// FIFO buffer of messages awaiting delivery.
///
/// # Examples
///
/// ```rust
/// use bridge_core::{DeliverySink, OutboundQueue};
///
/// struct Collect(Vec<u32>);
/// impl DeliverySink<u32> for Collect {
///     fn try_send(&mut self, m: u32) -> Result<(), u32> {
///         self.0.push(m);
///         Ok(())
///     }
/// }
///
/// let mut queue = OutboundQueue::new();
/// queue.enqueue(1);
/// queue.enqueue(2);
/// let mut sink = Collect(Vec::new());
/// assert_eq!(queue.drain_into(&mut sink), 2);
/// assert_eq!(sink.0, vec![1, 2]);
/// assert!(queue.is_empty());
/// ```
#[derive(Debug)]
pub struct OutboundQueue<T> {
    items: VecDeque<T>,
}

impl<T> OutboundQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Appends `message` to the tail.  Never fails.
    pub fn enqueue(&mut self, message: T) {
        self.items.push_back(message);
    }

    /// Number of messages waiting.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Delivers queued messages to `sink` in FIFO order.
    ///
    /// Pops from the head until the queue is empty or the sink refuses a
    /// message.  A refused message is reinserted at the head, so the next
    /// drain resumes exactly where this one stopped.  Safe to call
    /// redundantly: draining an empty queue is a no-op.
    ///
    /// Returns the number of messages delivered.
    pub fn drain_into<S>(&mut self, sink: &mut S) -> usize
    where
        S: DeliverySink<T> + ?Sized,
    {
        let mut delivered = 0;
        while let Some(message) = self.items.pop_front() {
            match sink.try_send(message) {
                Ok(()) => delivered += 1,
                Err(refused) => {
                    self.items.push_front(refused);
                    trace!(
                        "drain stopped after {delivered} message(s); {} still queued",
                        self.items.len()
                    );
                    break;
                }
            }
        }
        delivered
    }
}

impl<T> Default for OutboundQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
