//! Port numbers and port sets.
//!
//! `Port` guarantees a value in 1-65535. `PortSet` is the ordered, duplicate-free
//! collection a scan session probes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A validated TCP port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// Lowest probeable port.
    pub const MIN: u16 = 1;
    /// Highest probeable port.
    pub const MAX: u16 = 65535;

    /// Create a port, returning `None` for 0.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(value as u32))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (1-65535)")]
    OutOfRange(u32),
    #[error("invalid port number: {0}")]
    InvalidFormat(String),
    #[error("invalid port range: start ({0}) > end ({1})")]
    InvalidRange(u16, u16),
    #[error("empty port specification")]
    Empty,
}

/// An inclusive range of ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    pub fn new(start: Port, end: Port) -> Result<Self, PortError> {
        if start > end {
            Err(PortError::InvalidRange(start.0, end.0))
        } else {
            Ok(Self { start, end })
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

/// The ordered, duplicate-free set of ports a session probes.
///
/// Accepts specifications such as `"80"`, `"22,80,443"`, `"1-1024"` or
/// `"22,80,8000-8010"`, plus the keywords `all` and `top100`. Iteration is
/// always ascending; the order in which probes complete is unrelated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortSet {
    ports: BTreeSet<Port>,
}

impl PortSet {
    /// An empty set.
    pub const fn new() -> Self {
        Self {
            ports: BTreeSet::new(),
        }
    }

    /// Build a set from any collection of ports, dropping duplicates.
    pub fn from_ports(ports: impl IntoIterator<Item = Port>) -> Self {
        Self {
            ports: ports.into_iter().collect(),
        }
    }

    /// Build a set from raw numbers, rejecting port 0.
    pub fn try_from_u16s(ports: impl IntoIterator<Item = u16>) -> Result<Self, PortError> {
        ports
            .into_iter()
            .map(Port::try_from)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(|ports| Self { ports })
    }

    /// Insert a port. Returns `false` if it was already present.
    pub fn insert(&mut self, port: Port) -> bool {
        self.ports.insert(port)
    }

    pub fn insert_range(&mut self, range: PortRange) {
        self.ports.extend(range.iter());
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Ports in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Port> + '_ {
        self.ports.iter().copied()
    }

    /// The classic "well-known" range, 1-1024.
    pub fn well_known() -> Self {
        Self::from_ports((1..=1024).map(Port))
    }

    /// Every port, 1-65535.
    pub fn full() -> Self {
        Self::from_ports((Port::MIN..=Port::MAX).map(Port))
    }

    /// The hundred most commonly open TCP ports.
    pub fn top_100() -> Self {
        const TOP: [u16; 100] = [
            7, 9, 13, 21, 22, 23, 25, 26, 37, 53, 79, 80, 81, 88, 106, 110, 111, 113, 119, 135,
            139, 143, 144, 179, 199, 389, 427, 443, 444, 445, 465, 513, 514, 515, 543, 544, 548,
            554, 587, 631, 646, 873, 990, 993, 995, 1025, 1026, 1027, 1028, 1029, 1110, 1433, 1720,
            1723, 1755, 1900, 2000, 2001, 2049, 2121, 2717, 3000, 3128, 3306, 3389, 3986, 4899,
            5000, 5009, 5051, 5060, 5101, 5190, 5357, 5432, 5631, 5666, 5800, 5900, 6000, 6001,
            6646, 7070, 8000, 8008, 8009, 8080, 8081, 8443, 8888, 9100, 9999, 10000, 32768, 49152,
            49153, 49154, 49155, 49156, 49157,
        ];
        Self::from_ports(TOP.iter().copied().filter_map(Port::new))
    }
}

impl IntoIterator for PortSet {
    type Item = Port;
    type IntoIter = std::collections::btree_set::IntoIter<Port>;

    fn into_iter(self) -> Self::IntoIter {
        self.ports.into_iter()
    }
}

impl FromIterator<Port> for PortSet {
    fn from_iter<I: IntoIterator<Item = Port>>(iter: I) -> Self {
        Self::from_ports(iter)
    }
}

fn parse_port(s: &str) -> Result<Port, PortError> {
    let s = s.trim();
    let value: u32 = s
        .parse()
        .map_err(|_| PortError::InvalidFormat(s.to_string()))?;
    u16::try_from(value)
        .ok()
        .and_then(Port::new)
        .ok_or(PortError::OutOfRange(value))
}

impl FromStr for PortSet {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "" => return Err(PortError::Empty),
            "all" => return Ok(Self::full()),
            "top100" => return Ok(Self::top_100()),
            _ => {}
        }

        let mut set = Self::new();
        for part in s.split(',') {
            let part = part.trim();
            match part.split_once('-') {
                Some((start, end)) => {
                    if end.contains('-') {
                        return Err(PortError::InvalidFormat(part.to_string()));
                    }
                    let range = PortRange::new(parse_port(start)?, parse_port(end)?)?;
                    set.insert_range(range);
                }
                None => {
                    set.insert(parse_port(part)?);
                }
            }
        }

        Ok(set)
    }
}

impl fmt::Display for PortSet {
    /// Renders the set compactly, collapsing consecutive runs into ranges.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        let mut iter = self.iter().peekable();
        while let Some(start) = iter.next() {
            let mut end = start;
            while let Some(&next) = iter.peek() {
                if next.0 == end.0 + 1 {
                    end = next;
                    iter.next();
                } else {
                    break;
                }
            }
            if start == end {
                parts.push(start.to_string());
            } else {
                parts.push(format!("{}-{}", start, end));
            }
        }
        write!(f, "{}", parts.join(","))
    }
}
