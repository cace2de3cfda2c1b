use crate::config::RepairConfig;
use crate::eventsim::{EventId, Process, ProcessState};
use crate::input::tables::VertexId;
use crate::output::history::NetworkLogEvent;
use super::clock::SimClock;
use super::network::{Holder, Network, RepairOrder, Resource};
use super::router::{self, Path};
use super::topology::Vertex;
use super::Sim;
use std::mem;

enum RepairState {
    Waiting,
    /// `next_leg` indexes the vertex reached when the current leg ends, and
    /// is 0 before the first leg.
    Outbound { order: RepairOrder, route: Path, next_leg: usize },
    Repairing { order: RepairOrder, route: Path },
    Returning { route: Path, next_leg: usize },
}

/// The single repair vehicle. Takes one order at a time, drives to the
/// fault along the shortest path, repairs it, drives back the same way and
/// then clears the failure flag.
pub struct RepairVehicle {
    config: RepairConfig,
    state: RepairState,
    pending: Option<EventId>,
}

impl RepairVehicle {
    pub fn new(config: &RepairConfig) -> RepairVehicle {
        RepairVehicle { config: config.clone(), state: RepairState::Waiting, pending: None }
    }

    fn note(&self, sim: &mut Sim, text: &str) {
        let now = sim.time();
        let line = format!("{} {}", self.config.name, text);
        sim.world.note(now, &self.config.name, &line);
    }

    fn sleep(&mut self, sim: &mut Sim, dt: f64) -> ProcessState {
        let ev = sim.create_timeout(dt);
        self.pending = Some(ev);
        ProcessState::wait_for(ev)
    }

    /// Where the vehicle has to go for `order`.
    fn target(sim: &Sim, order: RepairOrder) -> VertexId {
        match order {
            RepairOrder::Train(t) => sim.world.trains[t].current_segment.1,
            RepairOrder::Switch(v) => v,
            RepairOrder::Segment(from, _) => from,
        }
    }

    fn describe(sim: &Sim, order: RepairOrder) -> String {
        match order {
            RepairOrder::Train(t) => format!("train {}", sim.world.trains[t].name),
            RepairOrder::Switch(v) => format!("rail switch at vertex {}", v),
            RepairOrder::Segment(a, b) => format!("railway {} ==== {}", a, b),
        }
    }

    fn repair_hours(&self, order: RepairOrder) -> f64 {
        match order {
            RepairOrder::Train(_) => self.config.train_repair_hours,
            RepairOrder::Switch(_) => self.config.switch_repair_hours,
            RepairOrder::Segment(_, _) => self.config.segment_repair_hours,
        }
    }

    /// Report arrival at the end of the current leg and start the next one.
    /// `None` once the end of the route is reached.
    fn drive(&mut self, sim: &mut Sim, route: &Path, next_leg: &mut usize) -> Option<ProcessState> {
        let topology = sim.world.topology;
        if *next_leg > 0 {
            let at = route.vertices[*next_leg];
            let text = match topology.vertices[at] {
                Vertex::Switch(_) => format!("is on railway switch at vertex {}", at),
                Vertex::Station(st) => format!("is on station {}", topology.stations[st].name),
            };
            self.note(sim, &text);
        }
        if *next_leg + 1 >= route.vertices.len() {
            return None;
        }

        let (from, to) = (route.vertices[*next_leg], route.vertices[*next_leg + 1]);
        // The way back may use a segment that only exists in the other
        // direction; it is driven with the same length and speed limit.
        let seg = match topology.segment_between(from, to).or_else(|| topology.segment_between(to, from)) {
            Some(s) => &topology.segments[s],
            None => panic!("repair route uses {} -> {}, which is not a segment", from, to),
        };
        self.note(sim, &format!("is now on railway {} -> {}", from, to));
        let real = SimClock::travel_duration(seg.length, self.config.speed, seg.speed_limit);
        let dt = sim.world.clock.scale(real);
        *next_leg += 1;
        Some(self.sleep(sim, dt))
    }

    fn repair(&self, sim: &mut Sim, order: RepairOrder) {
        match order {
            RepairOrder::Train(t) => {
                sim.world.trains[t].broken = false;
                sim.world.trains[t].repaired.fire(&mut sim.scheduler);
            }
            RepairOrder::Switch(v) => {
                let sw = match sim.world.topology.switch_at(v) {
                    Some(sw) => sw,
                    None => panic!("Not a switch"),
                };
                sim.world.release(&mut sim.scheduler, Resource::Switch(sw), Holder::Fault);
            }
            RepairOrder::Segment(a, b) => {
                let seg = sim.world.segment(a, b);
                sim.world.release(&mut sim.scheduler, Resource::Segment(seg), Holder::Fault);
            }
        }
        let now = sim.time();
        sim.world.log(now, NetworkLogEvent::Repaired(order));
        let text = format!("has repaired the {}", RepairVehicle::describe(sim, order));
        self.note(sim, &text);
    }
}

impl<'a> Process<Network<'a>> for RepairVehicle {
    fn resume(&mut self, sim: &mut Sim<'a>) -> ProcessState {
        if let Some(ev) = self.pending {
            if !sim.has_fired(ev) {
                return ProcessState::wait_for(ev);
            }
            self.pending = None;
        }

        loop {
            match mem::replace(&mut self.state, RepairState::Waiting) {
                RepairState::Waiting => {
                    let order = match sim.world.repair_orders.next() {
                        Ok(order) => order,
                        Err(events) => return ProcessState::Wait(events),
                    };
                    let target = RepairVehicle::target(sim, order);
                    let text = format!("has taken an order to repair {} at vertex {}",
                                       RepairVehicle::describe(sim, order), target);
                    self.note(sim, &text);

                    let home = self.config.home_vertex;
                    let route = match router::shortest_path(sim.world.topology, home, target) {
                        Some(route) => route,
                        None => panic!("vertex {} cannot be reached from {}", target, home),
                    };
                    let now = sim.time();
                    sim.world.log(now, NetworkLogEvent::RepairDispatched(order, route.vertices.clone()));
                    self.state = RepairState::Outbound { order, route, next_leg: 0 };
                }

                RepairState::Outbound { order, route, mut next_leg } => {
                    let wait = self.drive(sim, &route, &mut next_leg);
                    match wait {
                        Some(wait) => {
                            self.state = RepairState::Outbound { order, route, next_leg };
                            return wait;
                        }
                        None => {
                            let dt = sim.world.clock.scale(SimClock::hours(self.repair_hours(order)));
                            self.state = RepairState::Repairing { order, route };
                            return self.sleep(sim, dt);
                        }
                    }
                }

                RepairState::Repairing { order, route } => {
                    self.repair(sim, order);
                    self.state = RepairState::Returning { route: route.reversed(), next_leg: 0 };
                }

                RepairState::Returning { route, mut next_leg } => {
                    if let Some(wait) = self.drive(sim, &route, &mut next_leg) {
                        self.state = RepairState::Returning { route, next_leg };
                        return wait;
                    }
                    let text = format!("has ended its job, returned to station at vertex {}", self.config.home_vertex);
                    self.note(sim, &text);
                    sim.world.failure.clear();
                    let now = sim.time();
                    sim.world.log(now, NetworkLogEvent::FailureCleared);
                }
            }
        }
    }
}
