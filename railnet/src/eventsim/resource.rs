//! Blocking primitives for processes.
//!
//! None of these block by themselves: an operation that cannot complete
//! returns `Err(event)`, and the calling process yields
//! `ProcessState::Wait` on that event. What the event means when it fires
//! depends on the primitive and is documented on each operation.

use super::observable::Observable;
use super::simulation::{EventId, Scheduler};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::fmt::Debug;

/// A pool of `capacity` interchangeable tokens. With capacity 1 this is an
/// exclusive lock.
#[derive(Debug)]
pub struct Pool<H> {
    capacity: usize,
    holders: SmallVec<[H; 2]>,
    waiters: VecDeque<(H, EventId)>,
}

impl<H: Copy + Eq + Debug> Pool<H> {
    pub fn new(capacity: usize) -> Pool<H> {
        Pool {
            capacity: capacity,
            holders: SmallVec::new(),
            waiters: VecDeque::new(),
        }
    }

    pub fn exclusive() -> Pool<H> {
        Pool::new(1)
    }

    /// Take a token for `holder`. On `Err(ev)` the holder has been queued;
    /// when `ev` fires the token has already been handed over.
    pub fn acquire(&mut self, scheduler: &mut Scheduler, holder: H) -> Result<(), EventId> {
        if self.holders.len() < self.capacity && self.waiters.is_empty() {
            self.holders.push(holder);
            return Ok(());
        }
        let ev = scheduler.new_event();
        self.waiters.push_back((holder, ev));
        Err(ev)
    }

    /// Return `holder`'s token. If anyone is queued, the token passes to
    /// the first waiter, which is returned.
    pub fn release(&mut self, scheduler: &mut Scheduler, holder: H) -> Option<H> {
        match self.holders.iter().position(|h| *h == holder) {
            Some(idx) => { self.holders.remove(idx); },
            None => panic!("{:?} released a token it does not hold (holders {:?})",
                           holder, self.holders),
        }
        let (next, ev) = self.waiters.pop_front()?;
        self.holders.push(next);
        scheduler.schedule(ev, 0.0);
        Some(next)
    }

    pub fn is_held_by(&self, holder: H) -> bool {
        self.holders.contains(&holder)
    }

    pub fn holders(&self) -> &[H] {
        &self.holders
    }

    pub fn available(&self) -> usize {
        self.capacity - self.holders.len()
    }

    pub fn queued(&self) -> usize {
        self.waiters.len()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Rotation {
    Idle,
    Requested,
    Rotating,
    Done,
}

/// Request/acknowledge protocol between one requester and one server.
/// Only one request may be outstanding: from `request` until the
/// requester has collected the completion in `await_done`.
#[derive(Debug)]
pub struct Handshake {
    state: Observable<Rotation>,
}

impl Handshake {
    pub fn new(scheduler: &mut Scheduler) -> Handshake {
        Handshake { state: Observable::new(scheduler, Rotation::Idle) }
    }

    pub fn state(&self) -> Rotation {
        *self.state.get()
    }

    pub fn request(&mut self, scheduler: &mut Scheduler) {
        if self.state() != Rotation::Idle {
            panic!("rotation requested while previous request is {:?}", self.state());
        }
        self.state.set(scheduler, Rotation::Requested);
    }

    /// Server side. `Err(ev)`: no request yet, `ev` fires on the next
    /// state change.
    pub fn take_request(&mut self, scheduler: &mut Scheduler) -> Result<(), EventId> {
        if self.state() == Rotation::Requested {
            self.state.set(scheduler, Rotation::Rotating);
            Ok(())
        } else {
            Err(self.state.event())
        }
    }

    pub fn complete(&mut self, scheduler: &mut Scheduler) {
        if self.state() != Rotation::Rotating {
            panic!("rotation completed while {:?}", self.state());
        }
        self.state.set(scheduler, Rotation::Done);
    }

    /// Requester side. `Err(ev)`: still rotating, `ev` fires on the next
    /// state change.
    pub fn await_done(&mut self, scheduler: &mut Scheduler) -> Result<(), EventId> {
        match self.state() {
            Rotation::Done => {
                self.state.set(scheduler, Rotation::Idle);
                Ok(())
            }
            Rotation::Idle => panic!("awaiting a rotation that was never requested"),
            _ => Err(self.state.event()),
        }
    }
}

/// Unbounded FIFO of notifications. Sending never blocks.
#[derive(Debug)]
pub struct Mailbox<T> {
    queue: VecDeque<T>,
    sent: Observable<u64>,
}

impl<T: Debug> Mailbox<T> {
    pub fn new(scheduler: &mut Scheduler) -> Mailbox<T> {
        Mailbox { queue: VecDeque::new(), sent: Observable::new(scheduler, 0) }
    }

    pub fn send(&mut self, scheduler: &mut Scheduler, msg: T) {
        self.queue.push_back(msg);
        self.sent.modify(scheduler, |n| *n += 1);
    }

    /// `Err(ev)`: empty, `ev` fires when the next message is sent.
    pub fn recv(&mut self) -> Result<T, EventId> {
        self.queue.pop_front().ok_or(self.sent.event())
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Wakes whoever is waiting on `event()` at the time of `fire`. Firing with
/// no waiter leaves nothing behind for later waiters.
#[derive(Debug)]
pub struct Signal {
    fired: Observable<u64>,
}

impl Signal {
    pub fn new(scheduler: &mut Scheduler) -> Signal {
        Signal { fired: Observable::new(scheduler, 0) }
    }

    pub fn event(&self) -> EventId {
        self.fired.event()
    }

    pub fn fire(&mut self, scheduler: &mut Scheduler) {
        self.fired.modify(scheduler, |n| *n += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_never_exceeds_capacity() {
        let mut s = Scheduler::new();
        let mut platforms = Pool::new(2);
        assert_eq!(platforms.acquire(&mut s, 'a'), Ok(()));
        assert_eq!(platforms.acquire(&mut s, 'b'), Ok(()));
        let c = platforms.acquire(&mut s, 'c').unwrap_err();
        let d = platforms.acquire(&mut s, 'd').unwrap_err();
        assert_eq!(platforms.available(), 0);
        assert_eq!(platforms.queued(), 2);

        assert_eq!(platforms.release(&mut s, 'b'), Some('c'));
        assert!(platforms.is_held_by('c'));
        assert!(s.is_pending(c));
        assert_eq!(s.next_time(), Some(0.0));
        assert!(s.is_pending(d));
        assert_eq!(platforms.holders().len(), 2);

        assert_eq!(platforms.release(&mut s, 'a'), Some('d'));
        assert_eq!(platforms.release(&mut s, 'c'), None);
        assert_eq!(platforms.available(), 1);
    }

    #[test]
    fn queued_holder_is_not_overtaken() {
        let mut s = Scheduler::new();
        let mut lock = Pool::exclusive();
        lock.acquire(&mut s, 1).unwrap();
        lock.acquire(&mut s, 2).unwrap_err();
        lock.release(&mut s, 1);
        // 2 owns the lock now even before its event has fired.
        assert!(lock.acquire(&mut s, 3).is_err());
        assert_eq!(lock.holders(), &[2]);
    }

    #[test]
    #[should_panic]
    fn release_without_holding_panics() {
        let mut s = Scheduler::new();
        let mut lock: Pool<u8> = Pool::exclusive();
        lock.acquire(&mut s, 1).unwrap();
        lock.release(&mut s, 2);
    }

    #[test]
    fn handshake_cycle() {
        let mut s = Scheduler::new();
        let mut h = Handshake::new(&mut s);
        assert!(h.take_request(&mut s).is_err());
        h.request(&mut s);
        assert!(h.await_done(&mut s).is_err());
        h.take_request(&mut s).unwrap();
        assert_eq!(h.state(), Rotation::Rotating);
        h.complete(&mut s);
        h.await_done(&mut s).unwrap();
        assert_eq!(h.state(), Rotation::Idle);
    }

    #[test]
    #[should_panic]
    fn second_request_is_a_protocol_violation() {
        let mut s = Scheduler::new();
        let mut h = Handshake::new(&mut s);
        h.request(&mut s);
        h.request(&mut s);
    }

    #[test]
    fn mailbox_wakes_on_send() {
        let mut s = Scheduler::new();
        let mut m = Mailbox::new(&mut s);
        let ev = m.recv().unwrap_err();
        m.send(&mut s, (2usize, 5usize));
        assert!(s.is_pending(ev));
        assert_eq!(s.next_time(), Some(0.0));
        assert_eq!(m.recv(), Ok((2, 5)));
        assert!(m.is_empty());
    }
}
