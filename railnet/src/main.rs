use railnet::*;
use railnet::config::Config;
use railnet::input::loader::load_tables;
use railnet::output::journal::Journal;
use railnet::railway::clock::SimClock;
use railnet::railway::failure::FailureInjector;
use std::path::PathBuf;
use std::sync::mpsc;
use structopt::StructOpt;

/// railnet -- railway network simulation with random failures and repairs
#[derive(StructOpt, Debug)]
#[structopt(name="railnet")]
struct Opt {
    /// Verbose mode (-v, -vv)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: u8,

    /// Only print warnings and errors
    #[structopt(short = "q", long = "quiet")]
    quiet: bool,

    /// Directory with the network description tables
    #[structopt(parse(from_os_str))]
    network: PathBuf,

    /// Configuration file (RON)
    #[structopt(short = "c", long = "config", parse(from_os_str))]
    config: Option<PathBuf>,

    /// Simulated time per wall-clock time
    #[structopt(short = "a", long = "acceleration")]
    acceleration: Option<f64>,

    /// Probability of a failure at each poll
    #[structopt(short = "r", long = "crash-rate")]
    crash_rate: Option<f64>,

    /// Random seed for the failure injector
    #[structopt(short = "s", long = "seed")]
    seed: Option<u64>,

    /// Write one log file per train and for the repair vehicle into this directory
    #[structopt(short = "l", long = "logs", parse(from_os_str))]
    logs: Option<PathBuf>,

    /// Run unpaced for this many simulated hours and print a report
    #[structopt(short = "H", long = "hours")]
    hours: Option<f64>,

    /// Output JSON history file
    #[structopt(short = "j", long = "json", parse(from_os_str))]
    json: Option<PathBuf>,
}

fn init_logger(opt: &Opt) {
    let level = match (opt.quiet, opt.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn config(opt: &Opt) -> AppResult<Config> {
    let mut config = match opt.config {
        Some(ref path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(a) = opt.acceleration { config.acceleration = a; }
    if let Some(r) = opt.crash_rate { config.crash_rate = r; }
    if opt.seed.is_some() { config.seed = opt.seed; }
    config.validate()?;
    Ok(config)
}

fn run(opt: &Opt) -> AppResult<()> {
    let config = config(opt)?;
    let tables = load_tables(&opt.network)?;
    let topology = build_topology(&tables, &config)?;
    log::debug!("{} vertices, {} segments, {} trains",
                topology.num_vertices(), topology.segments.len(), tables.trains.len());

    let clock = SimClock::from_config(&config)?;
    let journal = match opt.logs {
        Some(ref dir) => Journal::to_dir(dir)?,
        None => Journal::console(),
    };
    let injector = FailureInjector::random(&config, &clock);
    let mut simulator = Simulator::new(&topology, &tables.trains, &config, injector, journal)?;
    let keep_history = opt.hours.is_some() || opt.json.is_some();
    if !keep_history {
        simulator.discard_history();
    }

    match opt.hours {
        Some(hours) => simulator.run_for_hours(hours),
        None => {
            println!("Simulation running, press Enter to stop.");
            let (tx, rx) = mpsc::channel();
            std::thread::spawn(move || {
                let mut line = String::new();
                let _ = std::io::stdin().read_line(&mut line);
                let _ = tx.send(());
            });
            run_paced(&mut simulator, &rx);
        }
    }

    println!("Stopped at {}.", clock.stamp(simulator.elapsed()));
    if !keep_history {
        for train in &simulator.network().trains {
            println!("{}: {} hops", train.name, train.hops);
        }
        println!("{} failures raised", simulator.network().failure.times_raised());
    }
    let (history, _journal) = simulator.finish()?;
    let names = tables.trains.iter().map(|t| t.name.clone()).collect::<Vec<_>>();
    if keep_history {
        print!("{}", output::history::report(&topology, &names, &history)?);
    }

    if let Some(ref json) = opt.json {
        use std::fs::File;
        use std::io::BufWriter;
        let file = File::create(json)?;
        let mut writer = BufWriter::new(&file);
        output::json::json_history(&topology, &names, &clock, &history, &mut writer)?;
    }

    Ok(())
}

pub fn main() {
    let opt = Opt::from_args();
    init_logger(&opt);
    match run(&opt) {
        Ok(()) => {},
        Err(e) => {
            println!("Error:\n{}", e.as_fail());
            std::process::exit(1);
        },
    }
}
