use crate::input::tables::{SwitchId, TrainId, VertexId};
use crate::railway::network::{Fault, Holder, RepairOrder, Resource};
use crate::railway::topology::Topology;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkLogEvent {
    Acquired(Holder, Resource),
    Released(Holder, Resource),
    Hop(TrainId, VertexId, VertexId), // train entered the segment between two vertices
    Rotated(SwitchId),
    FailureRaised(Fault),
    RepairDispatched(RepairOrder, Vec<VertexId>), // forward route from home
    Repaired(RepairOrder),
    FailureCleared,
}

/// Everything that happened during a run, with the scheduler time
/// (wall-clock ms since start) of each event.
#[derive(Debug, Default)]
pub struct History {
    pub events: Vec<(f64, NetworkLogEvent)>,
}

pub fn capacity(topology: &Topology, r: Resource) -> usize {
    match r {
        Resource::Segment(_) | Resource::Switch(_) => 1,
        Resource::Platform(s) => topology.stations[s].platforms,
        Resource::Depot(s) => topology.stations[s].depots,
    }
}

impl History {
    /// Largest number of simultaneous holders seen for each resource.
    pub fn max_holders(&self) -> BTreeMap<Resource, usize> {
        let mut current: BTreeMap<Resource, usize> = BTreeMap::new();
        let mut max: BTreeMap<Resource, usize> = BTreeMap::new();
        for (_, ev) in &self.events {
            match *ev {
                NetworkLogEvent::Acquired(_, r) => {
                    let n = current.entry(r).or_insert(0);
                    *n += 1;
                    let m = max.entry(r).or_insert(0);
                    *m = (*m).max(*n);
                }
                NetworkLogEvent::Released(_, r) => {
                    *current.entry(r).or_insert(0) -= 1;
                }
                _ => {}
            }
        }
        max
    }

    /// Resources that at some point had more holders than capacity.
    pub fn capacity_violations(&self, topology: &Topology) -> Vec<(Resource, usize)> {
        self.max_holders().into_iter()
            .filter(|&(r, n)| n > capacity(topology, r))
            .collect()
    }

    /// Number of resources held by `train` after each of its acquisitions
    /// and releases.
    pub fn hold_trace(&self, train: TrainId) -> Vec<usize> {
        let mut held = 0usize;
        let mut trace = Vec::new();
        for (_, ev) in &self.events {
            match *ev {
                NetworkLogEvent::Acquired(Holder::Train(t), _) if t == train => held += 1,
                NetworkLogEvent::Released(Holder::Train(t), _) if t == train => held -= 1,
                _ => continue,
            }
            trace.push(held);
        }
        trace
    }

    /// Positions in `hold_trace` where a train that had started moving held
    /// no resource at all, or more than two.
    pub fn look_ahead_violations(&self, train: TrainId) -> Vec<usize> {
        self.hold_trace(train).into_iter()
            .enumerate()
            .filter(|&(_, n)| n == 0 || n > 2)
            .map(|(i, _)| i)
            .collect()
    }

    /// State of the failure flag after each raise or clear.
    pub fn failure_transitions(&self) -> Vec<bool> {
        self.events.iter()
            .filter_map(|(_, ev)| match *ev {
                NetworkLogEvent::FailureRaised(_) => Some(true),
                NetworkLogEvent::FailureCleared => Some(false),
                _ => None,
            })
            .collect()
    }

    pub fn hops(&self, train: TrainId) -> usize {
        self.events.iter()
            .filter(|(_, ev)| match *ev {
                NetworkLogEvent::Hop(t, _, _) => t == train,
                _ => false,
            })
            .count()
    }

    pub fn repairs(&self) -> Vec<RepairOrder> {
        self.events.iter()
            .filter_map(|(_, ev)| match *ev {
                NetworkLogEvent::Repaired(order) => Some(order),
                _ => None,
            })
            .collect()
    }

    pub fn dispatched_routes(&self) -> Vec<&[VertexId]> {
        self.events.iter()
            .filter_map(|(_, ev)| match ev {
                NetworkLogEvent::RepairDispatched(_, route) => Some(&route[..]),
                _ => None,
            })
            .collect()
    }
}

/// Summary of a run, one line per train followed by failures and the
/// outcome of the safety checks.
pub fn report(topology: &Topology, train_names: &[String], h: &History) -> Result<String, failure::Error> {
    use std::fmt::Write;
    let mut s = String::new();
    for (id, name) in train_names.iter().enumerate() {
        let violations = h.look_ahead_violations(id);
        write!(s, "{:<16} {:>6} hops", name, h.hops(id))?;
        if !violations.is_empty() {
            write!(s, "  ({} hold-count violations)", violations.len())?;
        }
        writeln!(s)?;
    }
    let raised = h.failure_transitions().iter().filter(|x| **x).count();
    writeln!(s, "failures raised: {}, repaired: {}", raised, h.repairs().len())?;
    let over = h.capacity_violations(topology);
    if over.is_empty() {
        writeln!(s, "no resource exceeded its capacity")?;
    } else {
        for (r, n) in over {
            writeln!(s, "CAPACITY EXCEEDED: {:?} had {} holders", r, n)?;
        }
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::NetworkLogEvent::*;
    use maplit::btreemap;

    #[test]
    fn counts_holders_and_holds() {
        let seg = Resource::Segment(0);
        let plat = Resource::Platform(0);
        let h = History { events: vec![
            (0.0, Acquired(Holder::Train(0), seg)),
            (0.0, Hop(0, 0, 1)),
            (5.0, Acquired(Holder::Train(0), plat)),
            (5.0, Released(Holder::Train(0), seg)),
            (5.0, Acquired(Holder::Train(1), seg)),
            (6.0, Acquired(Holder::Train(1), plat)),
            (6.0, Released(Holder::Train(1), seg)),
        ]};
        assert_eq!(h.max_holders(), btreemap!{ seg => 1, plat => 2 });
        assert_eq!(h.hold_trace(0), vec![1, 2, 1]);
        assert!(h.look_ahead_violations(0).is_empty());
        assert_eq!(h.hops(0), 1);
        assert_eq!(h.hops(1), 0);
    }

    #[test]
    fn dropping_to_zero_is_flagged() {
        let seg = Resource::Segment(3);
        let h = History { events: vec![
            (0.0, Acquired(Holder::Train(2), seg)),
            (1.0, Released(Holder::Train(2), seg)),
            (1.0, Acquired(Holder::Train(2), Resource::Switch(0))),
        ]};
        assert_eq!(h.look_ahead_violations(2), vec![1]);
    }
}
