use crate::input::tables::*;
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Vertex {
    Switch(SwitchId),
    Station(StationId),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Segment {
    pub from: VertexId,
    pub to: VertexId,
    pub length: f64,
    pub speed_limit: f64,
}

#[derive(Debug, Clone)]
pub struct Station {
    pub name: String,
    pub platforms: usize,
    pub depots: usize,
    pub wait_minutes: f64,
    pub vertex: VertexId,
}

#[derive(Debug, Clone)]
pub struct Switch {
    pub rotation_minutes: f64,
    pub vertex: VertexId,
}

/// The static track layout. Built once from the input tables and never
/// modified; the resources attached to it live in `Network`.
#[derive(Debug)]
pub struct Topology {
    pub vertices: Vec<Vertex>,
    pub segments: Vec<Segment>,
    pub stations: Vec<Station>,
    pub switches: Vec<Switch>,
    between: HashMap<(VertexId, VertexId), SegmentId>,
    outgoing: Vec<SmallVec<[SegmentId; 4]>>,
}

#[derive(Debug, Fail)]
pub enum TopologyError {
    #[fail(display = "{} refers to vertex {}, but there are only {} vertices", what, vertex, count)]
    VertexOutOfRange { what: String, vertex: VertexId, count: usize },
    #[fail(display = "segment {} -> {} is defined twice", _0, _1)]
    DuplicateSegment(VertexId, VertexId),
    #[fail(display = "segment {} -> {} must join two vertices with positive length and speed limit", _0, _1)]
    DegenerateSegment(VertexId, VertexId),
    #[fail(display = "vertex set has {} {}s but {} are defined", kinds, what, rows)]
    CountMismatch { what: &'static str, kinds: usize, rows: usize },
    #[fail(display = "{} is declared at vertex {}, which is not a {}", what, vertex, kind)]
    KindMismatch { what: String, vertex: VertexId, kind: &'static str },
    #[fail(display = "station {} has no platforms", _0)]
    NoPlatforms(String),
    #[fail(display = "train {} must have positive speed", _0)]
    ZeroSpeed(String),
    #[fail(display = "route of train {} needs at least two vertices", _0)]
    ShortRoute(String),
    #[fail(display = "route of train {} uses {} -> {}, which is not a segment", train, from, to)]
    MissingSegment { train: String, from: VertexId, to: VertexId },
    #[fail(display = "vertex {} is unreachable from vertex {}", to, from)]
    Unreachable { from: VertexId, to: VertexId },
}

impl Topology {
    pub fn new(tables: &Tables) -> Result<Topology, TopologyError> {
        let n = tables.vertex_count;
        let check_vertex = |what: String, vertex: VertexId| {
            if vertex < n { Ok(()) } else {
                Err(TopologyError::VertexOutOfRange { what, vertex, count: n })
            }
        };

        if tables.vertex_kinds.len() != n {
            return Err(TopologyError::CountMismatch {
                what: "vertice", kinds: tables.vertex_kinds.len(), rows: n,
            });
        }

        // The k-th switch vertex is described by the k-th switch row,
        // and likewise for stations.
        let mut vertices = Vec::with_capacity(n);
        let (mut n_switches, mut n_stations) = (0, 0);
        for kind in &tables.vertex_kinds {
            match kind {
                VertexKind::Switch => { vertices.push(Vertex::Switch(n_switches)); n_switches += 1; }
                VertexKind::Station => { vertices.push(Vertex::Station(n_stations)); n_stations += 1; }
            }
        }
        if n_switches != tables.switches.len() {
            return Err(TopologyError::CountMismatch {
                what: "switch", kinds: n_switches, rows: tables.switches.len(),
            });
        }
        if n_stations != tables.stations.len() {
            return Err(TopologyError::CountMismatch {
                what: "station", kinds: n_stations, rows: tables.stations.len(),
            });
        }

        let mut switches = Vec::new();
        for (idx, row) in tables.switches.iter().enumerate() {
            let what = format!("switch #{}", idx);
            check_vertex(what.clone(), row.vertex)?;
            if vertices[row.vertex] != Vertex::Switch(idx) {
                return Err(TopologyError::KindMismatch { what, vertex: row.vertex, kind: "switch" });
            }
            switches.push(Switch { rotation_minutes: row.rotation_minutes, vertex: row.vertex });
        }

        let mut stations = Vec::new();
        for (idx, row) in tables.stations.iter().enumerate() {
            let what = format!("station {}", row.name);
            check_vertex(what.clone(), row.vertex)?;
            if vertices[row.vertex] != Vertex::Station(idx) {
                return Err(TopologyError::KindMismatch { what, vertex: row.vertex, kind: "station" });
            }
            if row.platforms == 0 {
                return Err(TopologyError::NoPlatforms(row.name.clone()));
            }
            stations.push(Station {
                name: row.name.clone(),
                platforms: row.platforms,
                depots: row.depots,
                wait_minutes: row.wait_minutes,
                vertex: row.vertex,
            });
        }

        let mut segments = Vec::new();
        let mut between = HashMap::new();
        let mut outgoing = vec![SmallVec::new(); n];
        for (row, &(from, to)) in tables.segments.iter().zip(tables.adjacency.iter()) {
            check_vertex(format!("segment {} -> {}", from, to), from)?;
            check_vertex(format!("segment {} -> {}", from, to), to)?;
            if from == to || !(row.length > 0.0 && row.speed_limit > 0.0) {
                return Err(TopologyError::DegenerateSegment(from, to));
            }
            let id = segments.len();
            if between.insert((from, to), id).is_some() {
                return Err(TopologyError::DuplicateSegment(from, to));
            }
            segments.push(Segment { from, to, length: row.length, speed_limit: row.speed_limit });
            outgoing[from].push(id);
        }

        Ok(Topology { vertices, segments, stations, switches, between, outgoing })
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn segment_between(&self, from: VertexId, to: VertexId) -> Option<SegmentId> {
        self.between.get(&(from, to)).cloned()
    }

    pub fn outgoing(&self, v: VertexId) -> impl Iterator<Item = &Segment> + '_ {
        self.outgoing[v].iter().map(move |s| &self.segments[*s])
    }

    pub fn vertex_name(&self, v: VertexId) -> String {
        match self.vertices[v] {
            Vertex::Station(st) => self.stations[st].name.clone(),
            Vertex::Switch(_) => format!("switch at vertex {}", v),
        }
    }

    pub fn switch_at(&self, v: VertexId) -> Option<SwitchId> {
        match self.vertices.get(v) {
            Some(&Vertex::Switch(sw)) => Some(sw),
            _ => None,
        }
    }

    /// A cyclic route is valid when every hop, including the one from the
    /// last vertex back to the first, is a segment.
    pub fn check_train(&self, train: &TrainRow) -> Result<(), TopologyError> {
        if !(train.max_speed > 0.0) {
            return Err(TopologyError::ZeroSpeed(train.name.clone()));
        }
        if train.route.len() < 2 {
            return Err(TopologyError::ShortRoute(train.name.clone()));
        }
        for &v in &train.route {
            if v >= self.num_vertices() {
                return Err(TopologyError::VertexOutOfRange {
                    what: format!("route of train {}", train.name), vertex: v, count: self.num_vertices(),
                });
            }
        }
        let n = train.route.len();
        for i in 0..n {
            let (from, to) = (train.route[i], train.route[(i + 1) % n]);
            if self.segment_between(from, to).is_none() {
                return Err(TopologyError::MissingSegment { train: train.name.clone(), from, to });
            }
        }
        Ok(())
    }

    /// Every vertex must be reachable from `home`.
    pub fn check_reachable_from(&self, home: VertexId) -> Result<(), TopologyError> {
        if home >= self.num_vertices() {
            return Err(TopologyError::VertexOutOfRange {
                what: "repair vehicle home".to_string(), vertex: home, count: self.num_vertices(),
            });
        }
        let mut seen = vec![false; self.num_vertices()];
        let mut stack = vec![home];
        seen[home] = true;
        while let Some(v) = stack.pop() {
            for seg in self.outgoing(v) {
                if !seen[seg.to] {
                    seen[seg.to] = true;
                    stack.push(seg.to);
                }
            }
        }
        match seen.iter().position(|s| !s) {
            Some(to) => Err(TopologyError::Unreachable { from: home, to }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> Tables {
        let mut t = Tables::default();
        let a = t.add_station("A", 2, 1, 3.0);
        let s = t.add_switch(1.0);
        let b = t.add_station("B", 1, 0, 3.0);
        t.add_track(a, s, 10.0, 100.0);
        t.add_track(s, b, 10.0, 100.0);
        t
    }

    #[test]
    fn builds_vertex_back_references() {
        let topo = Topology::new(&line()).unwrap();
        assert_eq!(topo.vertices, vec![Vertex::Station(0), Vertex::Switch(0), Vertex::Station(1)]);
        assert_eq!(topo.switch_at(1), Some(0));
        assert_eq!(topo.vertex_name(2), "B");
        let s = topo.segment_between(1, 2).unwrap();
        assert_eq!((topo.segments[s].from, topo.segments[s].to), (1, 2));
        assert!(topo.segment_between(0, 2).is_none());
        assert_eq!(topo.outgoing(1).count(), 2);
        topo.check_reachable_from(0).unwrap();
    }

    #[test]
    fn rejects_broken_routes() {
        let mut t = line();
        t.add_train("ok", 100.0, &[0, 1, 2, 1]);
        t.add_train("jump", 100.0, &[0, 2]);
        t.add_train("short", 100.0, &[0]);
        let topo = Topology::new(&t).unwrap();
        topo.check_train(&t.trains[0]).unwrap();
        match topo.check_train(&t.trains[1]) {
            Err(TopologyError::MissingSegment { from, to, .. }) => assert_eq!((from, to), (0, 2)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(topo.check_train(&t.trains[2]).is_err());
    }

    #[test]
    fn rejects_inconsistent_tables() {
        let mut t = line();
        t.stations[0].vertex = 1;
        assert!(Topology::new(&t).is_err());

        let mut t = line();
        t.stations[1].platforms = 0;
        assert!(Topology::new(&t).is_err());

        let mut t = line();
        t.add_segment(0, 1, 5.0, 80.0);
        assert!(Topology::new(&t).is_err());

        let mut t = line();
        t.add_station("C", 1, 0, 1.0);
        let topo = Topology::new(&t).unwrap();
        assert!(topo.check_reachable_from(0).is_err());
    }
}
