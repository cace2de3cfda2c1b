use smallvec::SmallVec;
use ordered_float::OrderedFloat;
use std::collections::BinaryHeap;
use std::mem;

pub type EventId = usize;
pub type ProcessId = usize;

pub enum ProcessState {
    Finished,
    Wait(SmallVec<[EventId; 2]>),
}

impl ProcessState {
    pub fn wait_for(ev: EventId) -> ProcessState {
        ProcessState::Wait(SmallVec::from_slice(&[ev]))
    }
}

/// A unit of execution driven by the scheduler. `resume` is called once when
/// the process is started and again every time one of the events it returned
/// in `ProcessState::Wait` fires.
pub trait Process<T> {
    fn resume(&mut self, sim: &mut Simulation<T>) -> ProcessState;
}

pub enum EventState {
    Ready,
    Firing,
    Success,
}

#[derive(Eq, PartialEq, Debug)]
pub struct QueuedEvent {
    pub time: OrderedFloat<f64>,
    pub id: usize,
    pub event: EventId,
}

use std::cmp::Ordering;
impl Ord for QueuedEvent {
    fn cmp(&self, other :&QueuedEvent) -> Ordering {
        // Note that the order is flipped on purpose -- to turn
        // the (maximum) BinaryHeap into a minimum heap.
        other.time.cmp(&self.time).
            then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self,other :&QueuedEvent) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct Event {
    state: EventState,
    listeners: SmallVec<[ProcessId; 1]>,
}

/// Cooperative discrete-event simulation. Time is measured in wall-clock
/// milliseconds since the start of the run.
pub struct Simulation<T> {
    pub world: T,
    procs: Vec<Option<(EventId, Box<dyn Process<T>>)>>,
    pub scheduler: Scheduler,
}

#[derive(Default)]
pub struct Scheduler {
    pub time: OrderedFloat<f64>,
    events: Vec<Event>,
    pub queue: BinaryHeap<QueuedEvent>,
    id_counter: usize,
}

impl Scheduler {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn new_event(&mut self) -> EventId {
        let event_id = self.events.len();
        self.events.push(Event {
            state: EventState::Ready,
            listeners: SmallVec::new(),
        });
        event_id
    }

    pub fn schedule(&mut self, id: EventId, dt: f64) {
        if dt < 0.0 || dt.is_nan() { panic!("invalid delay {}", dt); }
        if dt.is_infinite() { return; } // Will never happen
        let qe = QueuedEvent {
            time: OrderedFloat::from(*self.time + dt),
            id: self.id_counter,
            event: id,
        };
        self.id_counter += 1;
        self.queue.push(qe);
    }

    pub fn is_pending(&self, id: EventId) -> bool {
        if let EventState::Ready = self.events[id].state { true } else { false }
    }

    /// Time of the earliest queued event, if any.
    pub fn next_time(&self) -> Option<f64> {
        self.queue.peek().map(|qe| *qe.time)
    }

    fn fire(&mut self, id: EventId) -> SmallVec<[ProcessId; 1]> {
        self.events[id].state = EventState::Firing;
        mem::replace(&mut self.events[id].listeners, SmallVec::new())
    }

    fn finish(&mut self, id: EventId) {
        self.events[id].state = EventState::Success;
    }
}

impl<T> Simulation<T> {
    pub fn has_fired(&self, event :EventId) -> bool {
        !self.scheduler.is_pending(event)
    }

    pub fn time(&self) -> f64 { *self.scheduler.time }

    pub fn create_timeout(&mut self, dt: f64) -> EventId {
        let id = self.scheduler.new_event();
        self.scheduler.schedule(id, dt);
        id
    }

    pub fn new_with_scheduler(world: T, scheduler: Scheduler) -> Self {
        Simulation {
            procs: Vec::new(),
            scheduler: scheduler,
            world: world,
        }
    }

    pub fn new(world: T) -> Self {
        Simulation::new_with_scheduler(world, Scheduler::new())
    }

    pub fn start_process(&mut self, p: Box<dyn Process<T>>) -> EventId {
        let eventid = self.scheduler.new_event();
        let process_id = self.procs.len();
        self.procs.push(Some((eventid, p)));
        self.resume(process_id);
        eventid
    }

    /// Fire every event queued at or before `target`, then move the clock
    /// to `target`.
    pub fn run_until(&mut self, target: f64) {
        let target = OrderedFloat::from(target);
        while let Some(&QueuedEvent { time, .. }) = self.scheduler.queue.peek() {
            if time > target {
                break;
            }
            self.step();
        }
        if target > self.scheduler.time {
            self.scheduler.time = target;
        }
    }

    pub fn advance_by(&mut self, dt: f64) {
        let target = self.time() + dt;
        self.run_until(target);
    }

    pub fn step(&mut self) -> bool {
        match self.scheduler.queue.pop() {
            Some(ev) => {
                self.scheduler.time = ev.time;
                self.fire(ev.event);
                true
            }
            None => false,
        }
    }

    pub fn run(&mut self) {
        while let true = self.step() {}
    }

    fn fire(&mut self, event_id: EventId) {
        let proc_ids = self.scheduler.fire(event_id);
        for process_id in proc_ids {
            self.resume(process_id);
        }
        self.scheduler.finish(event_id);
    }

    fn resume(&mut self, process_id: ProcessId) {
        if let Some((event_id, mut process)) = {
            let a = &mut self.procs[process_id];
            // We need to take the process out of the simulation
            // This creates safety againts the process
            // firing events that modify the process itself.
            // This should be impossible -- a process must either be
            // running OR waiting for an event, not both.
            a.take()

        } {
            loop {
                match process.resume(self) {
                    ProcessState::Finished => {
                        self.scheduler.schedule(event_id, 0.0);
                        break;
                    }
                    ProcessState::Wait(evs) => {
                        let mut waiting = false;
                        for x in evs {
                            if !self.has_fired(x) {
                                waiting = true;
                                let listeners = &mut self.scheduler.events[x].listeners;
                                if !listeners.contains(&process_id) {
                                    listeners.push(process_id);
                                }
                            }
                        }

                        if waiting {
                            // Put the process back in the array.
                            self.procs[process_id] = Some((event_id, process));
                            break;
                        }

                        // If none of the events are pending, resume the process
                        // immediately.
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let mut p = BinaryHeap::new();
        p.push(QueuedEvent { time: OrderedFloat::from(123.0), id: 0, event: 0 });
        p.push(QueuedEvent { time: OrderedFloat::from(0.0), id: 1, event: 0 });
        p.push(QueuedEvent { time: OrderedFloat::from(122.0), id: 2, event: 0 });
        assert_eq!(*p.pop().unwrap().time, 0.0);
        assert_eq!(*p.pop().unwrap().time, 122.0);
        assert_eq!(*p.pop().unwrap().time, 123.0);
    }

    #[test]
    fn equal_times_fire_in_scheduling_order() {
        let mut p = BinaryHeap::new();
        p.push(QueuedEvent { time: OrderedFloat::from(5.0), id: 7, event: 1 });
        p.push(QueuedEvent { time: OrderedFloat::from(5.0), id: 3, event: 2 });
        assert_eq!(p.pop().unwrap().event, 2);
        assert_eq!(p.pop().unwrap().event, 1);
    }

    struct Ticker { ticks: usize, period: f64 }

    impl Process<Vec<f64>> for Ticker {
        fn resume(&mut self, sim: &mut Simulation<Vec<f64>>) -> ProcessState {
            if self.ticks == 0 { return ProcessState::Finished; }
            self.ticks -= 1;
            let now = sim.time();
            sim.world.push(now);
            ProcessState::wait_for(sim.create_timeout(self.period))
        }
    }

    #[test]
    fn run_until_stops_at_horizon() {
        let mut sim = Simulation::new(Vec::new());
        sim.start_process(Box::new(Ticker { ticks: 10, period: 2.5 }));
        sim.run_until(6.0);
        assert_eq!(sim.world, vec![0.0, 2.5, 5.0]);
        assert_eq!(sim.time(), 6.0);
        sim.run();
        assert_eq!(sim.world.len(), 10);
    }

    #[test]
    fn finished_process_fires_its_event() {
        let mut sim = Simulation::new(Vec::new());
        let done = sim.start_process(Box::new(Ticker { ticks: 1, period: 1.0 }));
        assert!(!sim.has_fired(done));
        sim.run();
        assert!(sim.has_fired(done));
    }
}
