use failure::Error;
use super::history::{History, NetworkLogEvent};
use crate::railway::clock::SimClock;
use crate::railway::network::{Fault, Holder, RepairOrder, Resource};
use crate::railway::topology::{Topology, Vertex};

use std::io;

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn resource_name(topology: &Topology, r: Resource) -> String {
    match r {
        Resource::Segment(s) => format!("{}-{}", topology.segments[s].from, topology.segments[s].to),
        Resource::Switch(sw) => format!("switch {}", topology.switches[sw].vertex),
        Resource::Platform(st) => format!("platform {}", topology.stations[st].name),
        Resource::Depot(st) => format!("depot {}", topology.stations[st].name),
    }
}

fn holder_name(trains: &[String], h: Holder) -> &str {
    match h {
        Holder::Train(t) => &trains[t],
        Holder::Fault => "fault",
    }
}

fn fault_name(topology: &Topology, trains: &[String], fault: Fault) -> String {
    match fault {
        Fault::Segment(s) => resource_name(topology, Resource::Segment(s)),
        Fault::Switch(sw) => resource_name(topology, Resource::Switch(sw)),
        Fault::Train(t) => trains[t].clone(),
    }
}

fn order_name(trains: &[String], order: RepairOrder) -> String {
    match order {
        RepairOrder::Train(t) => trains[t].clone(),
        RepairOrder::Switch(v) => format!("switch {}", v),
        RepairOrder::Segment(a, b) => format!("{}-{}", a, b),
    }
}

/// The network layout followed by every event in the history. Event times
/// are given both as wall-clock milliseconds since the start of the run and
/// as simulated date and time.
pub fn json_history<W: io::Write>(topology: &Topology,
                                  trains: &[String],
                                  clock: &SimClock,
                                  history: &History,
                                  f: &mut W)
                                  -> Result<(), Error> {
    let w = |f: &mut W, t: f64, e: &str, r: &str, v: &str| -> io::Result<()> {
        write!(f,
               "{{ \"time\": {}, \"simulated\": \"{}\", \"event\": \"{}\", \"ref\": \"{}\", \"value\": \"{}\" }}",
               t,
               clock.stamp(t),
               e,
               escape(r),
               escape(v))
    };

    write!(f, "{{ \"network\": {{\n")?;

    write!(f, "\"vertices\":{{")?;
    for (idx, vertex) in topology.vertices.iter().enumerate() {
        if idx > 0 { write!(f, ", ")?; }
        match *vertex {
            Vertex::Station(st) => {
                let s = &topology.stations[st];
                write!(f, "\"{}\": {{ \"type\": \"station\", \"name\": \"{}\", \"platforms\": {}, \"depots\": {} }}",
                       idx, escape(&s.name), s.platforms, s.depots)?;
            }
            Vertex::Switch(sw) => {
                write!(f, "\"{}\": {{ \"type\": \"switch\", \"rotation_minutes\": {} }}",
                       idx, topology.switches[sw].rotation_minutes)?;
            }
        }
    }
    write!(f, "}},")?;

    write!(f, "\"segments\":[")?;
    for (idx, seg) in topology.segments.iter().enumerate() {
        if idx > 0 { write!(f, ", ")?; }
        write!(f, "{{ \"from\": {}, \"to\": {}, \"length\": {}, \"speed_limit\": {} }}",
               seg.from, seg.to, seg.length, seg.speed_limit)?;
    }
    write!(f, "]}},")?;

    write!(f, "\"events\":[")?;
    let mut first = true;
    for &(t, ref ev) in &history.events {
        if first { first = false; } else { write!(f, ",\n")?; }
        match *ev {
            NetworkLogEvent::Acquired(h, r) =>
                w(f, t, "acquired", &resource_name(topology, r), holder_name(trains, h))?,
            NetworkLogEvent::Released(h, r) =>
                w(f, t, "released", &resource_name(topology, r), holder_name(trains, h))?,
            NetworkLogEvent::Hop(train, a, b) =>
                w(f, t, "hop", &trains[train], &format!("{}-{}", a, b))?,
            NetworkLogEvent::Rotated(sw) =>
                w(f, t, "rotated", &resource_name(topology, Resource::Switch(sw)), "")?,
            NetworkLogEvent::FailureRaised(fault) =>
                w(f, t, "failure", &fault_name(topology, trains, fault), "raised")?,
            NetworkLogEvent::RepairDispatched(order, ref route) => {
                let route = route.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("-");
                w(f, t, "dispatched", &order_name(trains, order), &route)?
            }
            NetworkLogEvent::Repaired(order) =>
                w(f, t, "repaired", &order_name(trains, order), "")?,
            NetworkLogEvent::FailureCleared =>
                w(f, t, "failure", "", "cleared")?,
        }
    }
    write!(f, " ]}}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::tables::Tables;
    use chrono::NaiveDateTime;

    #[test]
    fn writes_events_with_simulated_time() {
        let mut t = Tables::default();
        let a = t.add_station("A\"1", 1, 0, 1.0);
        let b = t.add_station("B", 1, 0, 1.0);
        t.add_track(a, b, 10.0, 100.0);
        let topology = Topology::new(&t).unwrap();
        let start = NaiveDateTime::parse_from_str("2017-01-01 12:00", "%Y-%m-%d %H:%M").unwrap();
        let clock = SimClock::new(start, 1000.0);
        let history = History { events: vec![
            (0.0, NetworkLogEvent::Acquired(Holder::Train(0), Resource::Segment(0))),
            (3600.0, NetworkLogEvent::Hop(0, 0, 1)),
        ]};

        let mut out = Vec::new();
        json_history(&topology, &["IC1".to_string()], &clock, &history, &mut out).unwrap();
        let s = String::from_utf8(out).unwrap();
        assert!(s.contains("\"name\": \"A\\\"1\""));
        assert!(s.contains("\"event\": \"acquired\", \"ref\": \"0-1\", \"value\": \"IC1\""));
        assert!(s.contains("\"simulated\": \"2017-01-01 13:00\", \"event\": \"hop\""));
        assert!(s.trim_end().ends_with("]}"));
    }
}
