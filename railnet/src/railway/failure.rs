use crate::config::Config;
use crate::eventsim::{EventId, Process, ProcessState};
use crate::output::history::NetworkLogEvent;
use super::clock::SimClock;
use super::network::{Fault, Holder, Network, Resource, SYSTEM_SINK};
use super::Sim;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use std::collections::VecDeque;

enum FaultSource {
    /// Poll every `period` wall-clock ms and fail with probability `rate`.
    Random { rng: StdRng, rate: f64, period: f64 },
    /// Faults at fixed wall-clock times.
    Scripted(VecDeque<(f64, Fault)>),
}

enum InjectorState {
    Starting,
    Polling,
    /// The flag is raised and the fault waits for the resource to be vacated.
    Claiming(Fault),
}

/// Puts equipment out of service. At most one failure is outstanding: a
/// fault is only injected if it can raise the failure flag, and the flag
/// is cleared by the repair vehicle.
pub struct FailureInjector {
    source: FaultSource,
    state: InjectorState,
}

#[derive(Copy, Clone)]
enum Kind {
    Segment,
    Train,
    Switch,
}

impl FailureInjector {
    /// Random failures as configured. The poll interval is converted to
    /// wall-clock time with `clock`.
    pub fn random(config: &Config, clock: &SimClock) -> FailureInjector {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        FailureInjector {
            source: FaultSource::Random {
                rng,
                rate: config.crash_rate,
                period: clock.scale(SimClock::minutes(config.poll_interval_minutes)),
            },
            state: InjectorState::Starting,
        }
    }

    /// Inject the given faults at the given wall-clock times (ms). A fault
    /// that comes due while another is outstanding is dropped.
    pub fn scripted(mut faults: Vec<(f64, Fault)>) -> FailureInjector {
        faults.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        FailureInjector {
            source: FaultSource::Scripted(faults.into_iter().collect()),
            state: InjectorState::Starting,
        }
    }

    /// A fault to inject now, if any.
    fn draw(&mut self, world: &Network, now: f64) -> Option<Fault> {
        match self.source {
            FaultSource::Random { ref mut rng, rate, .. } => {
                if !(rng.gen::<f64>() < rate) || world.failure.is_active() {
                    return None;
                }
                let mut kinds: SmallVec<[Kind; 3]> = SmallVec::new();
                if !world.segments.is_empty() { kinds.push(Kind::Segment); }
                if !world.trains.is_empty() { kinds.push(Kind::Train); }
                if !world.switches.is_empty() { kinds.push(Kind::Switch); }
                if kinds.is_empty() {
                    return None;
                }
                Some(match kinds[rng.gen_range(0, kinds.len())] {
                    Kind::Segment => Fault::Segment(rng.gen_range(0, world.segments.len())),
                    Kind::Train => Fault::Train(rng.gen_range(0, world.trains.len())),
                    Kind::Switch => Fault::Switch(rng.gen_range(0, world.switches.len())),
                })
            }
            FaultSource::Scripted(ref mut faults) => {
                match faults.front() {
                    Some(&(t, _)) if t <= now => faults.pop_front().map(|(_, f)| f),
                    _ => None,
                }
            }
        }
    }

    /// Wall-clock ms until the next poll. `None` when no more faults will come.
    fn delay(&self, now: f64) -> Option<f64> {
        match self.source {
            FaultSource::Random { period, .. } => Some(period),
            FaultSource::Scripted(ref faults) => faults.front().map(|&(t, _)| (t - now).max(0.0)),
        }
    }
}

/// Raise the flag and put `fault` into effect. `Some(ev)` when the faulty
/// resource is occupied; the fault holds it once `ev` fires.
fn inject(sim: &mut Sim, fault: Fault) -> Option<EventId> {
    let now = sim.time();
    let topology = sim.world.topology;
    sim.world.log(now, NetworkLogEvent::FailureRaised(fault));
    match fault {
        Fault::Train(t) => {
            sim.world.trains[t].broken = true;
            let text = format!("Train {} has crashed", sim.world.trains[t].name);
            sim.world.note(now, SYSTEM_SINK, &text);
            None
        }
        Fault::Segment(s) => {
            let seg = &topology.segments[s];
            sim.world.note(now, SYSTEM_SINK, &format!("Railway crashed {} ==== {}", seg.from, seg.to));
            claim(sim, Resource::Segment(s))
        }
        Fault::Switch(sw) => {
            let vertex = topology.switches[sw].vertex;
            sim.world.note(now, SYSTEM_SINK, &format!("Railswitch crashed at vertex {}", vertex));
            claim(sim, Resource::Switch(sw))
        }
    }
}

fn claim(sim: &mut Sim, r: Resource) -> Option<EventId> {
    let wait = sim.world.acquire(&mut sim.scheduler, r, Holder::Fault).err();
    if wait.is_some() {
        debug!("fault on {:?} queued behind {:?}", r, sim.world.pool(r).holders());
    }
    wait
}

/// Tell the repair vehicle about a fault that is in effect.
fn report(sim: &mut Sim, fault: Fault) {
    let topology = sim.world.topology;
    let orders = &mut sim.world.repair_orders;
    match fault {
        Fault::Train(t) => orders.trains.send(&mut sim.scheduler, t),
        Fault::Segment(s) => {
            let seg = &topology.segments[s];
            orders.segments.send(&mut sim.scheduler, (seg.from, seg.to));
        }
        Fault::Switch(sw) => orders.switches.send(&mut sim.scheduler, topology.switches[sw].vertex),
    }
}

impl<'a> Process<Network<'a>> for FailureInjector {
    fn resume(&mut self, sim: &mut Sim<'a>) -> ProcessState {
        let now = sim.time();
        match self.state {
            InjectorState::Starting => {
                self.state = InjectorState::Polling;
            }
            InjectorState::Claiming(fault) => {
                self.state = InjectorState::Polling;
                report(sim, fault);
            }
            InjectorState::Polling => {
                if let Some(fault) = self.draw(&sim.world, now) {
                    if !sim.world.failure.try_raise() {
                        debug!("dropping {:?}, a failure is already being handled", fault);
                    } else if let Some(ev) = inject(sim, fault) {
                        self.state = InjectorState::Claiming(fault);
                        return ProcessState::wait_for(ev);
                    } else {
                        report(sim, fault);
                    }
                }
            }
        }

        match self.delay(now) {
            Some(dt) => ProcessState::wait_for(sim.create_timeout(dt)),
            None => ProcessState::Finished,
        }
    }
}
