use super::tables::*;
use regex::Regex;
use std::path::Path;

pub const RAILWAYS_FILE: &str = "railways.txt";
pub const SYSTEM_FILE: &str = "system.txt";
pub const STATIONS_FILE: &str = "stations.txt";
pub const TRAINS_FILE: &str = "trains.txt";
pub const VERTEX_SET_FILE: &str = "vertex_set.txt";
pub const SWITCHES_FILE: &str = "switches.txt";

#[derive(Debug, Fail)]
pub enum LoadError {
    #[fail(display = "error in regular expression: {}", _0)]
    RegexError(String),
    #[fail(display = "{}: missing count line", _0)]
    MissingCount(String),
    #[fail(display = "{}:{}: unrecognized row {:?}", file, line, row)]
    Unrecognized { file: String, line: usize, row: String },
    #[fail(display = "{}:{}: error converting number {:?}", file, line, value)]
    NumberError { file: String, line: usize, value: String },
    #[fail(display = "{}: declares {} rows but has {}", file, declared, found)]
    RowCount { file: String, declared: usize, found: usize },
    #[fail(display = "{} has {} rows but {} has {}", a, a_rows, b, b_rows)]
    Mismatch { a: String, a_rows: usize, b: String, b_rows: usize },
}

/// The lines of one table file: the declared count and the data rows
/// (1-based line number, text). The line after the count is a header.
struct TableText<'a> {
    file: &'a str,
    count: usize,
    rows: Vec<(usize, &'a str)>,
}

fn regex(pattern: &str) -> Result<Regex, LoadError> {
    Regex::new(pattern).map_err(|e| LoadError::RegexError(format!("{:?}", e)))
}

fn table<'a>(file: &'a str, input: &'a str) -> Result<TableText<'a>, LoadError> {
    let count_re = regex(r"^\s*(\d+)\s*$")?;
    let mut lines = input.lines().enumerate();
    let count = lines.next()
        .and_then(|(_, l)| count_re.captures(l))
        .and_then(|c| c[1].parse::<usize>().ok())
        .ok_or_else(|| LoadError::MissingCount(file.to_string()))?;
    lines.next(); // header
    let rows = lines
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i + 1, l))
        .collect();
    Ok(TableText { file, count, rows })
}

impl<'a> TableText<'a> {
    /// The data rows, which must be exactly as many as declared.
    fn exact_rows(&self) -> Result<&[(usize, &'a str)], LoadError> {
        if self.rows.len() != self.count {
            return Err(LoadError::RowCount {
                file: self.file.to_string(),
                declared: self.count,
                found: self.rows.len(),
            });
        }
        Ok(&self.rows)
    }

    fn unrecognized(&self, line: usize, row: &str) -> LoadError {
        LoadError::Unrecognized { file: self.file.to_string(), line, row: row.to_string() }
    }

    fn number<T: std::str::FromStr>(&self, line: usize, value: &str) -> Result<T, LoadError> {
        value.parse::<T>().map_err(|_e| LoadError::NumberError {
            file: self.file.to_string(), line, value: value.to_string(),
        })
    }
}

/// Parses `railways.txt`: `max_speed length` per row.
pub fn parse_segments(input: &str) -> Result<Vec<SegmentRow>, LoadError> {
    let t = table(RAILWAYS_FILE, input)?;
    let re = regex(r"^\s*([\d\.]+)\s+([\d\.]+)\s*$")?;
    let mut segments = Vec::new();
    for &(line, row) in t.exact_rows()? {
        let c = re.captures(row).ok_or_else(|| t.unrecognized(line, row))?;
        segments.push(SegmentRow {
            speed_limit: t.number(line, &c[1])?,
            length: t.number(line, &c[2])?,
        });
    }
    Ok(segments)
}

/// Parses `system.txt`. The count line is the number of vertices; each row
/// `from to` assigns the next railway to that vertex pair.
pub fn parse_adjacency(input: &str) -> Result<(usize, Vec<(VertexId, VertexId)>), LoadError> {
    let t = table(SYSTEM_FILE, input)?;
    let re = regex(r"^\s*(\d+)\s+(\d+)\s*$")?;
    let mut pairs = Vec::new();
    for &(line, row) in &t.rows {
        let c = re.captures(row).ok_or_else(|| t.unrecognized(line, row))?;
        pairs.push((t.number(line, &c[1])?, t.number(line, &c[2])?));
    }
    Ok((t.count, pairs))
}

/// Parses `stations.txt`: `name platforms depots wait_minutes vertex`.
pub fn parse_stations(input: &str) -> Result<Vec<StationRow>, LoadError> {
    let t = table(STATIONS_FILE, input)?;
    let re = regex(r"^\s*(\S+)\s+(\d+)\s+(\d+)\s+([\d\.]+)\s+(\d+)\s*$")?;
    let mut stations = Vec::new();
    for &(line, row) in t.exact_rows()? {
        let c = re.captures(row).ok_or_else(|| t.unrecognized(line, row))?;
        stations.push(StationRow {
            name: c[1].to_string(),
            platforms: t.number(line, &c[2])?,
            depots: t.number(line, &c[3])?,
            wait_minutes: t.number(line, &c[4])?,
            vertex: t.number(line, &c[5])?,
        });
    }
    Ok(stations)
}

/// Parses `trains.txt`: `name capacity max_speed route`, with the route
/// written as vertex indices joined by dashes, e.g. `0-4-7-4`.
pub fn parse_trains(input: &str) -> Result<Vec<TrainRow>, LoadError> {
    let t = table(TRAINS_FILE, input)?;
    let re = regex(r"^\s*(\S+)\s+(\d+)\s+([\d\.]+)\s+(\d+(?:-\d+)*)\s*$")?;
    let mut trains = Vec::new();
    for &(line, row) in t.exact_rows()? {
        let c = re.captures(row).ok_or_else(|| t.unrecognized(line, row))?;
        let route = c[4].split('-')
            .map(|v| t.number(line, v))
            .collect::<Result<Vec<VertexId>, _>>()?;
        trains.push(TrainRow {
            name: c[1].to_string(),
            capacity: t.number(line, &c[2])?,
            max_speed: t.number(line, &c[3])?,
            route: route,
        });
    }
    Ok(trains)
}

/// Parses `vertex_set.txt`: one row per vertex, `1` for a switch and `2`
/// for a station. Anything after the kind is ignored.
pub fn parse_vertex_kinds(input: &str) -> Result<Vec<VertexKind>, LoadError> {
    let t = table(VERTEX_SET_FILE, input)?;
    let re = regex(r"^\s*([12])(?:\s.*)?$")?;
    let mut kinds = Vec::new();
    for &(line, row) in t.exact_rows()? {
        let c = re.captures(row).ok_or_else(|| t.unrecognized(line, row))?;
        kinds.push(if &c[1] == "1" { VertexKind::Switch } else { VertexKind::Station });
    }
    Ok(kinds)
}

/// Parses `switches.txt`: `rotation_minutes vertex`.
pub fn parse_switches(input: &str) -> Result<Vec<SwitchRow>, LoadError> {
    let t = table(SWITCHES_FILE, input)?;
    let re = regex(r"^\s*([\d\.]+)\s+(\d+)\s*$")?;
    let mut switches = Vec::new();
    for &(line, row) in t.exact_rows()? {
        let c = re.captures(row).ok_or_else(|| t.unrecognized(line, row))?;
        switches.push(SwitchRow {
            rotation_minutes: t.number(line, &c[1])?,
            vertex: t.number(line, &c[2])?,
        });
    }
    Ok(switches)
}

/// Read all six table files from a network directory.
pub fn load_tables(dir: &Path) -> crate::AppResult<Tables> {
    use crate::read_file;
    let segments = parse_segments(&read_file(&dir.join(RAILWAYS_FILE))?)?;
    let (vertex_count, adjacency) = parse_adjacency(&read_file(&dir.join(SYSTEM_FILE))?)?;
    if adjacency.len() != segments.len() {
        return Err(LoadError::Mismatch {
            a: SYSTEM_FILE.to_string(), a_rows: adjacency.len(),
            b: RAILWAYS_FILE.to_string(), b_rows: segments.len(),
        }.into());
    }
    let vertex_kinds = parse_vertex_kinds(&read_file(&dir.join(VERTEX_SET_FILE))?)?;
    if vertex_kinds.len() != vertex_count {
        return Err(LoadError::Mismatch {
            a: VERTEX_SET_FILE.to_string(), a_rows: vertex_kinds.len(),
            b: SYSTEM_FILE.to_string(), b_rows: vertex_count,
        }.into());
    }
    Ok(Tables {
        vertex_count,
        segments,
        adjacency,
        stations: parse_stations(&read_file(&dir.join(STATIONS_FILE))?)?,
        trains: parse_trains(&read_file(&dir.join(TRAINS_FILE))?)?,
        switches: parse_switches(&read_file(&dir.join(SWITCHES_FILE))?)?,
        vertex_kinds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_train_routes() {
        let trains = parse_trains("2\nname capacity speed path\n\
                                   IC1 300 160 0-4-7-4\n\
                                   R2 120 90.5 3-1\n").unwrap();
        assert_eq!(trains.len(), 2);
        assert_eq!(trains[0].route, vec![0, 4, 7, 4]);
        assert_eq!(trains[1].name, "R2");
        assert_eq!(trains[1].max_speed, 90.5);
    }

    #[test]
    fn parses_stations_and_switches() {
        let stations = parse_stations("1\nname platforms depots wait vertex\n\
                                       Krakow 3 2 5 12\n").unwrap();
        assert_eq!(stations[0], StationRow {
            name: "Krakow".to_string(), platforms: 3, depots: 2, wait_minutes: 5.0, vertex: 12,
        });
        let switches = parse_switches("2\nminutes vertex\n2 1\n0.5 3\n").unwrap();
        assert_eq!(switches[1], SwitchRow { rotation_minutes: 0.5, vertex: 3 });
    }

    #[test]
    fn vertex_count_comes_from_system_file() {
        let (n, pairs) = parse_adjacency("6\nfrom to\n0 1\n1 0\n").unwrap();
        assert_eq!(n, 6);
        assert_eq!(pairs, vec![(0, 1), (1, 0)]);
        let kinds = parse_vertex_kinds("3\ntype\n1\n2 station\n2\n").unwrap();
        assert_eq!(kinds, vec![VertexKind::Switch, VertexKind::Station, VertexKind::Station]);
    }

    #[test]
    fn rejects_malformed_rows() {
        match parse_segments("2\nspeed length\n120 4.5\n120 x\n") {
            Err(LoadError::Unrecognized { line, .. }) => assert_eq!(line, 4),
            other => panic!("unexpected {:?}", other),
        }
        match parse_trains("1\nh\nIC 10 100\n") {
            Err(LoadError::Unrecognized { .. }) => {},
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_wrong_row_count() {
        match parse_switches("3\nh\n2 1\n") {
            Err(LoadError::RowCount { declared, found, .. }) => {
                assert_eq!((declared, found), (3, 1));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_switches("").is_err());
    }

    #[test]
    fn loads_sample_network() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/sample");
        let tables = load_tables(&dir).unwrap();
        assert_eq!(tables.vertex_kinds.len(), tables.vertex_count);
        assert_eq!(tables.segments.len(), tables.adjacency.len());
        assert!(!tables.trains.is_empty());
    }
}
