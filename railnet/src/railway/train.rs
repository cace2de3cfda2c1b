use crate::eventsim::{Process, ProcessState};
use crate::input::tables::{TrainId, VertexId};
use crate::output::history::NetworkLogEvent;
use super::clock::SimClock;
use super::network::{Holder, Network, Resource, TrainStatus};
use super::topology::Vertex;
use super::Sim;

/// Drives one train around its cyclic route.
///
/// A hop from `start` to `end` is only begun while holding the segment
/// between them, and the train does not let go of the vertex it arrives at
/// (switch or platform) before it holds the segment it leaves on. Between
/// hops the train therefore always holds one or two resources.
pub struct TrainDriver {
    id: TrainId,
    cursor: usize,
    reserved: bool,
}

impl TrainDriver {
    pub fn new(sim: &mut Sim, id: TrainId) -> TrainDriver {
        let now = sim.time();
        sim.world.note_train(now, id, "has started");
        sim.world.trains[id].status = TrainStatus::Departing;
        TrainDriver { id, cursor: 0, reserved: false }
    }

    /// The k-th vertex after the current hop's start, wrapping around.
    fn ahead(&self, world: &Network, k: usize) -> VertexId {
        let route = &world.trains[self.id].route;
        route[(self.cursor + k) % route.len()]
    }

    fn hop(&self, world: &Network) -> (VertexId, VertexId) {
        (self.ahead(world, 0), self.ahead(world, 1))
    }

    fn holder(&self) -> Holder {
        Holder::Train(self.id)
    }

    fn set_status(&self, sim: &mut Sim, status: TrainStatus) {
        sim.world.trains[self.id].status = status;
    }

    /// Move to `then` and claim `r`. `Some(wait)` if the claim was queued;
    /// the train holds `r` when it is next resumed.
    fn acquire_then(&self, sim: &mut Sim, r: Resource, then: TrainStatus) -> Option<ProcessState> {
        self.set_status(sim, then);
        match sim.world.acquire(&mut sim.scheduler, r, self.holder()) {
            Ok(()) => None,
            Err(ev) => Some(ProcessState::wait_for(ev)),
        }
    }

    /// Claim the segment the train leaves its current vertex on.
    fn reserve_next(&self, sim: &mut Sim, then: TrainStatus) -> Option<ProcessState> {
        let (end, next) = (self.ahead(&sim.world, 1), self.ahead(&sim.world, 2));
        let seg = sim.world.segment(end, next);
        self.acquire_then(sim, Resource::Segment(seg), then)
    }

    fn advance(&mut self, sim: &mut Sim) {
        let len = sim.world.trains[self.id].route.len();
        self.cursor = (self.cursor + 1) % len;
        self.reserved = true;
        sim.world.trains[self.id].hops += 1;
        self.set_status(sim, TrainStatus::Departing);
    }
}

impl<'a> Process<Network<'a>> for TrainDriver {
    fn resume(&mut self, sim: &mut Sim<'a>) -> ProcessState {
        let topology = sim.world.topology;
        loop {
            let (start, end) = self.hop(&sim.world);
            let now = sim.time();
            match sim.world.trains[self.id].status {
                TrainStatus::Departing => {
                    if sim.world.trains[self.id].broken {
                        self.set_status(sim, TrainStatus::Broken);
                        sim.world.note_train(now, self.id, &format!("is broken down at vertex {}, waiting for repair", start));
                        return ProcessState::wait_for(sim.world.trains[self.id].repaired.event());
                    }
                    sim.world.trains[self.id].current_segment = (start, end);
                    if self.reserved {
                        self.reserved = false;
                        self.set_status(sim, TrainStatus::EnteringSegment);
                        continue;
                    }
                    let seg = sim.world.segment(start, end);
                    if let Some(wait) = self.acquire_then(sim, Resource::Segment(seg), TrainStatus::EnteringSegment) {
                        return wait;
                    }
                }

                TrainStatus::Broken => {
                    if sim.world.trains[self.id].broken {
                        return ProcessState::wait_for(sim.world.trains[self.id].repaired.event());
                    }
                    sim.world.note_train(now, self.id, "has been repaired and continues");
                    self.set_status(sim, TrainStatus::Departing);
                }

                TrainStatus::EnteringSegment => {
                    let seg = &topology.segments[sim.world.segment(start, end)];
                    sim.world.log(now, NetworkLogEvent::Hop(self.id, start, end));
                    sim.world.note_train(now, self.id, &format!("is now on railway {} -> {}", start, end));
                    let real = SimClock::travel_duration(seg.length, sim.world.trains[self.id].max_speed, seg.speed_limit);
                    let dt = sim.world.clock.scale(real);
                    self.set_status(sim, TrainStatus::Traveling);
                    return ProcessState::wait_for(sim.create_timeout(dt));
                }

                TrainStatus::Traveling => {
                    let (r, then) = match topology.vertices[end] {
                        Vertex::Switch(sw) => (Resource::Switch(sw), TrainStatus::ArrivingAtSwitch),
                        Vertex::Station(st) => (Resource::Platform(st), TrainStatus::ArrivingAtStation),
                    };
                    if let Some(wait) = self.acquire_then(sim, r, then) {
                        return wait;
                    }
                }

                TrainStatus::ArrivingAtSwitch => {
                    let sw = match topology.vertices[end] {
                        Vertex::Switch(sw) => sw,
                        _ => panic!("Not a switch"),
                    };
                    let seg = sim.world.segment(start, end);
                    sim.world.release(&mut sim.scheduler, Resource::Segment(seg), self.holder());
                    sim.world.switches[sw].rotation.request(&mut sim.scheduler);
                    sim.world.note_train(now, self.id, &format!("is on railway switch at vertex {}", end));
                    self.set_status(sim, TrainStatus::RotatingAtSwitch);
                }

                TrainStatus::RotatingAtSwitch => {
                    let sw = match topology.vertices[end] {
                        Vertex::Switch(sw) => sw,
                        _ => panic!("Not a switch"),
                    };
                    if let Err(ev) = sim.world.switches[sw].rotation.await_done(&mut sim.scheduler) {
                        return ProcessState::wait_for(ev);
                    }
                    if let Some(wait) = self.reserve_next(sim, TrainStatus::LeavingSwitch) {
                        return wait;
                    }
                }

                TrainStatus::LeavingSwitch => {
                    let sw = match topology.vertices[end] {
                        Vertex::Switch(sw) => sw,
                        _ => panic!("Not a switch"),
                    };
                    sim.world.release(&mut sim.scheduler, Resource::Switch(sw), self.holder());
                    self.advance(sim);
                }

                TrainStatus::ArrivingAtStation => {
                    let station = match topology.vertices[end] {
                        Vertex::Station(st) => &topology.stations[st],
                        _ => panic!("Not a station"),
                    };
                    let seg = sim.world.segment(start, end);
                    sim.world.release(&mut sim.scheduler, Resource::Segment(seg), self.holder());
                    sim.world.note_train(now, self.id, &format!("has arrived to station {}", station.name));
                    let dt = sim.world.clock.scale(SimClock::minutes(station.wait_minutes));
                    self.set_status(sim, TrainStatus::WaitingAtPlatform);
                    return ProcessState::wait_for(sim.create_timeout(dt));
                }

                TrainStatus::WaitingAtPlatform => {
                    let name = topology.vertex_name(end);
                    sim.world.note_train(now, self.id, &format!("is ready to leave the station {}", name));
                    if let Some(wait) = self.reserve_next(sim, TrainStatus::LeavingStation) {
                        return wait;
                    }
                }

                TrainStatus::LeavingStation => {
                    let st = match topology.vertices[end] {
                        Vertex::Station(st) => st,
                        _ => panic!("Not a station"),
                    };
                    sim.world.release(&mut sim.scheduler, Resource::Platform(st), self.holder());
                    sim.world.note_train(now, self.id, &format!("has left the station {}", topology.stations[st].name));
                    self.advance(sim);
                }
            }
        }
    }
}
