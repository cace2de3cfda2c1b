#[macro_use] extern crate failure_derive;

pub mod config;
pub mod input;
pub mod output;
pub mod eventsim;
pub mod railway;


use crate::config::Config;
use crate::eventsim::{Scheduler, Simulation};
use crate::input::tables::{Tables, TrainRow};
use crate::output::history::{History, NetworkLogEvent};
use crate::output::journal::Journal;
use crate::railway::clock::SimClock;
use crate::railway::failure::FailureInjector;
use crate::railway::network::Network;
use crate::railway::repair::RepairVehicle;
use crate::railway::switch::SwitchOperator;
use crate::railway::topology::{Topology, TopologyError};
use crate::railway::train::TrainDriver;
use crate::railway::Sim;
use log::{debug, info};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

pub type AppResult<T> = Result<T, failure::Error>;

pub fn read_file(f :&Path) -> AppResult<String> {
  use std::fs::File;
  use std::io::prelude::*;
  use std::io::BufReader;

  let file = File::open(f)?;
  let mut file = BufReader::new(&file);
  let mut contents = String::new();
  file.read_to_string(&mut contents)?;
  Ok(contents)
}

/// Build the topology and check that the repair vehicle can reach every
/// vertex from its home.
pub fn build_topology(tables: &Tables, config: &Config) -> Result<Topology, TopologyError> {
    let topology = Topology::new(tables)?;
    for train in &tables.trains {
        topology.check_train(train)?;
    }
    topology.check_reachable_from(config.repair.home_vertex)?;
    Ok(topology)
}

/// A running network: one process per switch and per train, the repair
/// vehicle and the failure injector.
pub struct Simulator<'a> {
    sim: Sim<'a>,
    log: Option<Rc<RefCell<Vec<(f64, NetworkLogEvent)>>>>,
}

impl<'a> Simulator<'a> {
    pub fn new(topology: &'a Topology,
               trains: &[TrainRow],
               config: &Config,
               injector: FailureInjector,
               journal: Journal)
               -> AppResult<Simulator<'a>> {
        let clock = SimClock::from_config(config)?;
        let log: Rc<RefCell<Vec<(f64, NetworkLogEvent)>>> = Rc::new(RefCell::new(Vec::new()));
        let logger = {
            let log = log.clone();
            Box::new(move |t: f64, ev: NetworkLogEvent| log.borrow_mut().push((t, ev)))
        };

        let mut scheduler = Scheduler::new();
        let network = Network::new(&mut scheduler, topology, trains, clock, journal, logger)?;
        let mut sim = Simulation::new_with_scheduler(network, scheduler);

        for sw in 0..topology.switches.len() {
            sim.start_process(Box::new(SwitchOperator::new(sw)));
        }
        for id in 0..trains.len() {
            let driver = TrainDriver::new(&mut sim, id);
            sim.start_process(Box::new(driver));
        }
        sim.start_process(Box::new(RepairVehicle::new(&config.repair)));
        sim.start_process(Box::new(injector));
        debug!("started {} trains and {} switches", trains.len(), topology.switches.len());

        Ok(Simulator { sim, log: Some(log) })
    }

    /// Wall-clock milliseconds since the start of the run.
    pub fn elapsed(&self) -> f64 {
        self.sim.time()
    }

    pub fn run_until(&mut self, elapsed: f64) {
        self.sim.run_until(elapsed);
    }

    /// Advance by a simulated duration.
    pub fn run_for_hours(&mut self, hours: f64) {
        let dt = self.sim.world.clock.scale(SimClock::hours(hours));
        self.sim.advance_by(dt);
    }

    pub fn next_event_time(&self) -> Option<f64> {
        self.sim.scheduler.next_time()
    }

    pub fn network(&self) -> &Network<'a> {
        &self.sim.world
    }

    /// Stop recording events. The history is empty from then on.
    pub fn discard_history(&mut self) {
        self.sim.world.logger = Box::new(|_, _| {});
        self.log = None;
    }

    pub fn history(&self) -> History {
        match self.log {
            Some(ref log) => History { events: log.borrow().clone() },
            None => History { events: Vec::new() },
        }
    }

    pub fn finish(self) -> AppResult<(History, Journal)> {
        let history = self.history();
        let mut journal = self.sim.world.journal;
        journal.flush()?;
        Ok((history, journal))
    }
}

/// Run unpaced until `hours` of simulated time have passed.
pub fn simulate(topology: &Topology,
                trains: &[TrainRow],
                config: &Config,
                injector: FailureInjector,
                journal: Journal,
                hours: f64)
                -> AppResult<(History, Journal)> {
    let mut simulator = Simulator::new(topology, trains, config, injector, journal)?;
    simulator.run_for_hours(hours);
    info!("simulated {} hours", hours);
    simulator.finish()
}

const PACE_MS: f64 = 50.0;

/// Run paced against the wall clock until `stop` receives a message or
/// its sender hangs up.
pub fn run_paced(simulator: &mut Simulator, stop: &mpsc::Receiver<()>) {
    let started = Instant::now();
    loop {
        match stop.try_recv() {
            Err(mpsc::TryRecvError::Empty) => {}
            _ => break,
        }
        let elapsed = started.elapsed().as_secs_f64() * 1000.0;
        simulator.run_until(elapsed);
        let wait = match simulator.next_event_time() {
            Some(t) => (t - elapsed).max(0.0).min(PACE_MS),
            None => PACE_MS,
        };
        std::thread::sleep(Duration::from_micros((wait * 1000.0) as u64));
    }
}
