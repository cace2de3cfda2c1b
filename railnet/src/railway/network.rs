use crate::eventsim::{EventId, Scheduler};
use crate::eventsim::resource::{Handshake, Mailbox, Pool, Signal};
use crate::input::tables::*;
use crate::output::history::NetworkLogEvent;
use crate::output::journal::Journal;
use super::clock::SimClock;
use super::topology::{Topology, TopologyError};
use smallvec::SmallVec;

pub type EventLogger = Box<dyn Fn(f64, NetworkLogEvent)>;

/// Who holds a resource token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Holder {
    Train(TrainId),
    /// The failure that put the resource out of service.
    Fault,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Segment(SegmentId),
    Switch(SwitchId),
    Platform(StationId),
    Depot(StationId),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Fault {
    Segment(SegmentId),
    Train(TrainId),
    Switch(SwitchId),
}

/// "A failure is being handled". At most one failure is outstanding.
#[derive(Debug, Default)]
pub struct FailureFlag {
    active: bool,
    raised: u64,
}

impl FailureFlag {
    /// Raise the flag unless it already is. Returns whether it was raised.
    pub fn try_raise(&mut self) -> bool {
        if self.active { return false; }
        self.active = true;
        self.raised += 1;
        true
    }

    pub fn clear(&mut self) {
        if !self.active {
            panic!("failure flag cleared while no failure is active");
        }
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn times_raised(&self) -> u64 {
        self.raised
    }
}

/// A repair job as received by the repair vehicle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RepairOrder {
    Train(TrainId),
    Switch(VertexId),
    Segment(VertexId, VertexId),
}

/// Notification channels from the failure injector to the repair vehicle.
#[derive(Debug)]
pub struct RepairOrders {
    pub trains: Mailbox<TrainId>,
    pub switches: Mailbox<VertexId>,
    pub segments: Mailbox<(VertexId, VertexId)>,
}

impl RepairOrders {
    pub fn new(scheduler: &mut Scheduler) -> RepairOrders {
        RepairOrders {
            trains: Mailbox::new(scheduler),
            switches: Mailbox::new(scheduler),
            segments: Mailbox::new(scheduler),
        }
    }

    /// Take the next order. Train faults go first, then switches, then
    /// segments.
    pub fn next(&mut self) -> Result<RepairOrder, SmallVec<[EventId; 2]>> {
        let mut events = SmallVec::new();
        match self.trains.recv() {
            Ok(t) => return Ok(RepairOrder::Train(t)),
            Err(ev) => events.push(ev),
        }
        match self.switches.recv() {
            Ok(v) => return Ok(RepairOrder::Switch(v)),
            Err(ev) => events.push(ev),
        }
        match self.segments.recv() {
            Ok((a, b)) => return Ok(RepairOrder::Segment(a, b)),
            Err(ev) => events.push(ev),
        }
        Err(events)
    }

    pub fn pending(&self) -> usize {
        self.trains.len() + self.switches.len() + self.segments.len()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrainStatus {
    /// At the start of a hop, about to claim its segment.
    Departing,
    Broken,
    /// Queued for the segment; holds it once resumed.
    EnteringSegment,
    Traveling,
    ArrivingAtSwitch,
    RotatingAtSwitch,
    LeavingSwitch,
    ArrivingAtStation,
    WaitingAtPlatform,
    LeavingStation,
}

#[derive(Debug)]
pub struct TrainState {
    pub name: String,
    pub capacity: usize,
    pub max_speed: f64,
    pub route: Vec<VertexId>,
    pub current_segment: (VertexId, VertexId),
    pub status: TrainStatus,
    pub broken: bool,
    pub repaired: Signal,
    pub hops: u64,
}

#[derive(Debug)]
pub struct SwitchState {
    pub occupancy: Pool<Holder>,
    pub rotation: Handshake,
}

/// Everything the actors share: the static topology and the resources
/// attached to it, the trains' public state, and the failure bookkeeping.
pub struct Network<'a> {
    pub topology: &'a Topology,
    pub clock: SimClock,
    pub segments: Vec<Pool<Holder>>,
    pub switches: Vec<SwitchState>,
    pub platforms: Vec<Pool<Holder>>,
    pub depots: Vec<Pool<Holder>>,
    pub trains: Vec<TrainState>,
    pub failure: FailureFlag,
    pub repair_orders: RepairOrders,
    pub journal: Journal,
    pub logger: EventLogger,
}

use std::fmt;
impl<'a> fmt::Debug for Network<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Network {{ segments: {:?}, switches: {:?}, platforms: {:?}, trains: {:?}, failure: {:?} }}",
               self.segments, self.switches, self.platforms, self.trains, self.failure)
    }
}

pub const SYSTEM_SINK: &str = "system";

impl<'a> Network<'a> {
    pub fn new(scheduler: &mut Scheduler,
               topology: &'a Topology,
               trains: &[TrainRow],
               clock: SimClock,
               journal: Journal,
               logger: EventLogger)
               -> Result<Network<'a>, TopologyError> {
        let mut train_states = Vec::new();
        for row in trains {
            topology.check_train(row)?;
            train_states.push(TrainState {
                name: row.name.clone(),
                capacity: row.capacity,
                max_speed: row.max_speed,
                route: row.route.clone(),
                current_segment: (row.route[0], row.route[1]),
                status: TrainStatus::Departing,
                broken: false,
                repaired: Signal::new(scheduler),
                hops: 0,
            });
        }

        let switches = topology.switches.iter()
            .map(|_| SwitchState { occupancy: Pool::exclusive(), rotation: Handshake::new(scheduler) })
            .collect();

        Ok(Network {
            topology: topology,
            clock: clock,
            segments: topology.segments.iter().map(|_| Pool::exclusive()).collect(),
            switches: switches,
            platforms: topology.stations.iter().map(|s| Pool::new(s.platforms)).collect(),
            depots: topology.stations.iter().map(|s| Pool::new(s.depots)).collect(),
            trains: train_states,
            failure: FailureFlag::default(),
            repair_orders: RepairOrders::new(scheduler),
            journal: journal,
            logger: logger,
        })
    }

    pub fn pool(&self, r: Resource) -> &Pool<Holder> {
        match r {
            Resource::Segment(i) => &self.segments[i],
            Resource::Switch(i) => &self.switches[i].occupancy,
            Resource::Platform(i) => &self.platforms[i],
            Resource::Depot(i) => &self.depots[i],
        }
    }

    fn pool_mut(&mut self, r: Resource) -> &mut Pool<Holder> {
        match r {
            Resource::Segment(i) => &mut self.segments[i],
            Resource::Switch(i) => &mut self.switches[i].occupancy,
            Resource::Platform(i) => &mut self.platforms[i],
            Resource::Depot(i) => &mut self.depots[i],
        }
    }

    /// `Err(ev)`: queued, and holding `r` once `ev` fires.
    pub fn acquire(&mut self, scheduler: &mut Scheduler, r: Resource, holder: Holder) -> Result<(), EventId> {
        let result = self.pool_mut(r).acquire(scheduler, holder);
        if result.is_ok() {
            (self.logger)(*scheduler.time, NetworkLogEvent::Acquired(holder, r));
        }
        result
    }

    pub fn release(&mut self, scheduler: &mut Scheduler, r: Resource, holder: Holder) {
        let next = self.pool_mut(r).release(scheduler, holder);
        (self.logger)(*scheduler.time, NetworkLogEvent::Released(holder, r));
        if let Some(next) = next {
            (self.logger)(*scheduler.time, NetworkLogEvent::Acquired(next, r));
        }
    }

    /// The segment between two consecutive route vertices. Routes are
    /// checked when the network is built, so a miss is a defect.
    pub fn segment(&self, from: VertexId, to: VertexId) -> SegmentId {
        match self.topology.segment_between(from, to) {
            Some(s) => s,
            None => panic!("no segment {} -> {}", from, to),
        }
    }

    pub fn log(&self, time: f64, event: NetworkLogEvent) {
        (self.logger)(time, event);
    }

    /// Journal a line for the named sink, timestamped with simulated time.
    pub fn note(&mut self, time: f64, sink: &str, text: &str) {
        let stamp = self.clock.stamp(time);
        self.journal.record(sink, &stamp, text);
    }

    pub fn note_train(&mut self, time: f64, train: TrainId, text: &str) {
        let stamp = self.clock.stamp(time);
        let line = format!("{} {}", self.trains[train].name, text);
        self.journal.record(&self.trains[train].name, &stamp, &line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_flag_is_compare_and_set() {
        let mut flag = FailureFlag::default();
        assert!(flag.try_raise());
        assert!(!flag.try_raise());
        flag.clear();
        assert!(!flag.is_active());
        assert!(flag.try_raise());
        assert_eq!(flag.times_raised(), 2);
    }

    #[test]
    #[should_panic]
    fn clearing_inactive_flag_panics() {
        FailureFlag::default().clear();
    }

    #[test]
    fn train_orders_are_served_first() {
        let mut s = Scheduler::new();
        let mut orders = RepairOrders::new(&mut s);
        assert_eq!(orders.next().unwrap_err().len(), 3);
        orders.segments.send(&mut s, (2, 5));
        orders.switches.send(&mut s, 4);
        orders.trains.send(&mut s, 1);
        assert_eq!(orders.pending(), 3);
        assert_eq!(orders.next(), Ok(RepairOrder::Train(1)));
        assert_eq!(orders.next(), Ok(RepairOrder::Switch(4)));
        assert_eq!(orders.next(), Ok(RepairOrder::Segment(2, 5)));
        assert!(orders.next().is_err());
    }
}
