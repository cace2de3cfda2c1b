//! Shortest paths for the repair vehicle.
//!
//! Edge weights are segment lengths truncated to whole kilometres. Among
//! vertices at equal distance the lowest index is settled first, so the
//! chosen path does not depend on the order segments were defined in.

use super::topology::Topology;
use crate::input::tables::VertexId;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub vertices: Vec<VertexId>,
    pub length: u64,
}

impl Path {
    pub fn reversed(&self) -> Path {
        let mut vertices = self.vertices.clone();
        vertices.reverse();
        Path { vertices, length: self.length }
    }
}

pub fn weight(length_km: f64) -> u64 {
    length_km.trunc() as u64
}

/// Dijkstra from `source`. Returns `None` when `destination` cannot be
/// reached.
pub fn shortest_path(topology: &Topology, source: VertexId, destination: VertexId) -> Option<Path> {
    let n = topology.num_vertices();
    let mut dist: Vec<Option<u64>> = vec![None; n];
    let mut pred: Vec<Option<VertexId>> = vec![None; n];
    let mut settled = vec![false; n];
    let mut queue = BinaryHeap::new();

    dist[source] = Some(0);
    queue.push(Reverse((0u64, source)));

    while let Some(Reverse((d, v))) = queue.pop() {
        if settled[v] { continue; }
        settled[v] = true;
        if v == destination { break; }

        for seg in topology.outgoing(v) {
            let candidate = d + weight(seg.length);
            let better = match dist[seg.to] {
                Some(old) => candidate < old,
                None => true,
            };
            if better && !settled[seg.to] {
                dist[seg.to] = Some(candidate);
                pred[seg.to] = Some(v);
                queue.push(Reverse((candidate, seg.to)));
            }
        }
    }

    let length = dist[destination]?;
    let mut vertices = vec![destination];
    let mut v = destination;
    while v != source {
        v = pred[v]?;
        vertices.push(v);
    }
    vertices.reverse();
    Some(Path { vertices, length })
}

/// Length of a vertex path in router weights. `None` if some hop is not a
/// segment.
pub fn path_length(topology: &Topology, vertices: &[VertexId]) -> Option<u64> {
    vertices.windows(2)
        .map(|w| topology.segment_between(w[0], w[1]).map(|s| weight(topology.segments[s].length)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::tables::Tables;

    //    0 --7-- 1 --10-- 2
    //    |       |       | ^
    //    9       2    1  | | 11
    //    |       |       v |
    //    3 --4-- 4 --------+
    //
    // 2 -> 4 and 4 -> 2 are one-way. Lengths are truncated: 7.9 weighs 7.
    fn tracks() -> Vec<(VertexId, VertexId, f64)> {
        vec![(0, 1, 7.9), (1, 2, 10.2), (0, 3, 9.0), (1, 4, 2.5), (3, 4, 4.0), (4, 2, 11.0), (2, 4, 1.0)]
    }

    fn graph(order: &[(VertexId, VertexId, f64)]) -> Topology {
        let mut t = Tables::default();
        for i in 0..5 {
            t.add_station(&format!("S{}", i), 1, 0, 1.0);
        }
        for &(a, b, km) in order {
            t.add_segment(a, b, km, 100.0);
            if (a, b) != (2, 4) && (a, b) != (4, 2) {
                t.add_segment(b, a, km, 100.0);
            }
        }
        Topology::new(&t).unwrap()
    }

    #[test]
    fn finds_known_shortest_distance() {
        let topo = graph(&tracks());
        let p = shortest_path(&topo, 0, 2).unwrap();
        assert_eq!(p.length, 17);
        assert_eq!(p.vertices, vec![0, 1, 2]);
        assert_eq!(path_length(&topo, &p.vertices), Some(17));

        // 2 -> 4 is a one-way shortcut.
        let p = shortest_path(&topo, 2, 3).unwrap();
        assert_eq!(p.vertices, vec![2, 4, 3]);
        assert_eq!(p.length, 5);
    }

    #[test]
    fn definition_order_does_not_change_distance() {
        let forward = graph(&tracks());
        let mut shuffled = tracks();
        shuffled.reverse();
        shuffled.swap(1, 4);
        let backward = graph(&shuffled);
        for src in 0..5 {
            for dst in 0..5 {
                let a = shortest_path(&forward, src, dst).unwrap();
                let b = shortest_path(&backward, src, dst).unwrap();
                assert_eq!(a.length, b.length, "{} -> {}", src, dst);
                assert_eq!(path_length(&backward, &b.vertices), Some(b.length));
            }
        }
    }

    #[test]
    fn equal_distances_prefer_lower_vertex() {
        // Two routes of length 2 from 0 to 3: via 1 and via 2.
        let mut t = Tables::default();
        for i in 0..4 {
            t.add_station(&format!("S{}", i), 1, 0, 1.0);
        }
        t.add_segment(0, 2, 1.0, 100.0);
        t.add_segment(0, 1, 1.0, 100.0);
        t.add_segment(2, 3, 1.0, 100.0);
        t.add_segment(1, 3, 1.0, 100.0);
        let topo = Topology::new(&t).unwrap();
        assert_eq!(shortest_path(&topo, 0, 3).unwrap().vertices, vec![0, 1, 3]);
    }

    #[test]
    fn source_equals_destination() {
        let topo = graph(&tracks());
        let p = shortest_path(&topo, 3, 3).unwrap();
        assert_eq!(p.vertices, vec![3]);
        assert_eq!(p.length, 0);
        assert_eq!(p.reversed(), p);
    }

    #[test]
    fn unreachable_is_none() {
        let mut t = Tables::default();
        t.add_station("A", 1, 0, 1.0);
        t.add_station("B", 1, 0, 1.0);
        t.add_segment(1, 0, 3.0, 100.0);
        let topo = Topology::new(&t).unwrap();
        assert!(shortest_path(&topo, 0, 1).is_none());
        assert!(shortest_path(&topo, 1, 0).is_some());
    }
}
