use super::simulation::{Scheduler, EventId};
use std::fmt::Debug;

/// A value whose changes can be waited for. Every modification fires the
/// current change event and replaces it with a fresh one, so a process
/// waiting on `event()` is resumed exactly once per change.
#[derive(Clone, Debug)]
pub struct Observable<T: Debug> {
    event_id: EventId,
    value: T,
}

impl<T: Debug> Observable<T> {
    pub fn new(scheduler: &mut Scheduler, value: T) -> Observable<T> {
        let event_id = scheduler.new_event();
        Observable {
            event_id: event_id,
            value: value,
        }
    }

    pub fn event(&self) -> EventId {
        self.event_id
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, scheduler: &mut Scheduler, x: T) {
        self.value = x;
        self.notify(scheduler);
    }

    pub fn modify<R, F: FnOnce(&mut T) -> R>(&mut self, scheduler: &mut Scheduler, f: F) -> R {
        let r = f(&mut self.value);
        self.notify(scheduler);
        r
    }

    fn notify(&mut self, scheduler: &mut Scheduler) {
        scheduler.schedule(self.event_id, 0.0);
        self.event_id = scheduler.new_event();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_replaces_event() {
        let mut s = Scheduler::new();
        let mut o = Observable::new(&mut s, 1u32);
        let first = o.event();
        o.set(&mut s, 2);
        assert_ne!(first, o.event());
        assert_eq!(*o.get(), 2);
        assert_eq!(s.next_time(), Some(0.0));
        let doubled = o.modify(&mut s, |v| { *v *= 2; *v });
        assert_eq!(doubled, 4);
        assert!(s.is_pending(o.event()));
    }
}
