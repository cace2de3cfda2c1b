use crate::eventsim::{Process, ProcessState};
use crate::input::tables::SwitchId;
use crate::output::history::NetworkLogEvent;
use super::clock::SimClock;
use super::network::Network;
use super::Sim;

/// Serves rotation requests for one switch, one at a time.
pub struct SwitchOperator {
    id: SwitchId,
    rotating: bool,
}

impl SwitchOperator {
    pub fn new(id: SwitchId) -> SwitchOperator {
        SwitchOperator { id, rotating: false }
    }
}

impl<'a> Process<Network<'a>> for SwitchOperator {
    fn resume(&mut self, sim: &mut Sim<'a>) -> ProcessState {
        if self.rotating {
            self.rotating = false;
            sim.world.switches[self.id].rotation.complete(&mut sim.scheduler);
            let now = sim.time();
            sim.world.log(now, NetworkLogEvent::Rotated(self.id));
        }

        match sim.world.switches[self.id].rotation.take_request(&mut sim.scheduler) {
            Err(ev) => ProcessState::wait_for(ev),
            Ok(()) => {
                self.rotating = true;
                let minutes = sim.world.topology.switches[self.id].rotation_minutes;
                let dt = sim.world.clock.scale(SimClock::minutes(minutes));
                ProcessState::wait_for(sim.create_timeout(dt))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventsim::Simulation;
    use crate::input::tables::Tables;
    use crate::output::journal::Journal;
    use crate::railway::topology::Topology;
    use crate::eventsim::{Scheduler, resource::Rotation};
    use chrono::NaiveDateTime;

    #[test]
    fn rotation_takes_scaled_duration() {
        let mut t = Tables::default();
        let a = t.add_station("A", 1, 0, 1.0);
        let s = t.add_switch(3.0);
        t.add_track(a, s, 1.0, 100.0);
        let topology = Topology::new(&t).unwrap();

        let start = NaiveDateTime::parse_from_str("2017-01-01 12:00", "%Y-%m-%d %H:%M").unwrap();
        let mut scheduler = Scheduler::new();
        let network = Network::new(&mut scheduler, &topology, &[], SimClock::new(start, 60.0),
                                   Journal::in_memory(), Box::new(|_, _| {})).unwrap();
        let mut sim = Simulation::new_with_scheduler(network, scheduler);
        sim.start_process(Box::new(SwitchOperator::new(0)));

        sim.world.switches[0].rotation.request(&mut sim.scheduler);
        sim.run_until(1.0);
        assert_eq!(sim.world.switches[0].rotation.state(), Rotation::Rotating);
        // Three simulated minutes at 60x is three wall-clock seconds.
        sim.run_until(2999.0);
        assert_eq!(sim.world.switches[0].rotation.state(), Rotation::Rotating);
        sim.run_until(3000.0);
        assert_eq!(sim.world.switches[0].rotation.state(), Rotation::Done);
        sim.world.switches[0].rotation.await_done(&mut sim.scheduler).unwrap();
        sim.run();
        assert_eq!(sim.world.switches[0].rotation.state(), Rotation::Idle);
    }
}
