pub type VertexId = usize;
pub type SegmentId = usize;
pub type StationId = usize;
pub type SwitchId = usize;
pub type TrainId = usize;

/// Rows of the network description, in file order. Cross references are
/// indices and have not been checked yet.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub vertex_count: usize,
    pub segments: Vec<SegmentRow>,
    /// `adjacency[j]` is the (from, to) pair that `segments[j]` connects.
    pub adjacency: Vec<(VertexId, VertexId)>,
    pub stations: Vec<StationRow>,
    pub trains: Vec<TrainRow>,
    pub switches: Vec<SwitchRow>,
    pub vertex_kinds: Vec<VertexKind>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SegmentRow {
    pub speed_limit: f64, // km/h
    pub length: f64,      // km
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VertexKind {
    Switch,
    Station,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationRow {
    pub name: String,
    pub platforms: usize,
    pub depots: usize,
    pub wait_minutes: f64,
    pub vertex: VertexId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainRow {
    pub name: String,
    pub capacity: usize,
    pub max_speed: f64, // km/h
    /// Cyclic: after the last vertex the train continues to the first.
    pub route: Vec<VertexId>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SwitchRow {
    pub rotation_minutes: f64,
    pub vertex: VertexId,
}

impl Tables {
    /// Add a two-way track as a pair of directed segments.
    pub fn add_track(&mut self, a: VertexId, b: VertexId, length: f64, speed_limit: f64) {
        self.add_segment(a, b, length, speed_limit);
        self.add_segment(b, a, length, speed_limit);
    }

    pub fn add_segment(&mut self, from: VertexId, to: VertexId, length: f64, speed_limit: f64) {
        self.segments.push(SegmentRow { speed_limit, length });
        self.adjacency.push((from, to));
    }

    /// Append a station vertex and return its vertex index.
    pub fn add_station(&mut self, name: &str, platforms: usize, depots: usize,
                       wait_minutes: f64) -> VertexId {
        let vertex = self.push_vertex(VertexKind::Station);
        self.stations.push(StationRow {
            name: name.to_string(), platforms, depots, wait_minutes, vertex,
        });
        vertex
    }

    /// Append a switch vertex and return its vertex index.
    pub fn add_switch(&mut self, rotation_minutes: f64) -> VertexId {
        let vertex = self.push_vertex(VertexKind::Switch);
        self.switches.push(SwitchRow { rotation_minutes, vertex });
        vertex
    }

    pub fn add_train(&mut self, name: &str, max_speed: f64, route: &[VertexId]) -> TrainId {
        self.trains.push(TrainRow {
            name: name.to_string(),
            capacity: 100,
            max_speed,
            route: route.to_vec(),
        });
        self.trains.len() - 1
    }

    fn push_vertex(&mut self, kind: VertexKind) -> VertexId {
        self.vertex_kinds.push(kind);
        self.vertex_count = self.vertex_kinds.len();
        self.vertex_count - 1
    }
}
