use serde::{Deserialize, Serialize};
use std::fmt;

/// Reachability of one prefix, and of a routed cell after aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reachability {
    /// Forward route is active and a return route exists
    Active,

    /// Return route exists but the forward route drops traffic, or the route has no target
    Blackhole,

    /// Forward route without a return route
    Oneway,
}

impl Reachability {
    pub fn as_str(self) -> &'static str {
        match self {
            Reachability::Active => "active",
            Reachability::Blackhole => "blackhole",
            Reachability::Oneway => "oneway",
        }
    }
}

/// Prefix that contributed to a cell, with its own verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixVerdict {
    pub prefix: String,
    pub reachability: Reachability,
}

/// One (source, destination) cell of the matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Cell {
    /// Diagonal
    #[serde(rename = "self")]
    SelfRoute,

    /// No forward route from the source to this destination
    Empty,

    Routed {
        reachability: Reachability,
        /// Contributing prefixes in route table order
        prefixes: Vec<PrefixVerdict>,
    },

    /// The return-route check for this cell failed
    Unknown { reason: String },
}

/// Row-level state of a source attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RowState {
    RouteTable { id: String },
    NoRouteTable,

    /// Fetching the source's own route table failed
    Unknown { route_table_id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub attachment_id: String,
    pub state: RowState,

    /// One cell per attachment, in catalog order
    pub cells: Vec<Cell>,

    /// Routes in the source's table without a target, always blackhole
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dangling: Vec<PrefixVerdict>,
}

/// Symbol shown for an ordered pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    #[serde(rename = "self")]
    SelfRoute,
    Active,
    Blackhole,
    Oneway,
    NoRouteTable,
    Unknown,

    /// No forward route; rendered as an empty cell
    NoRoute,
}

impl Classification {
    /// Element id used by the rendered document
    pub fn css_id(self) -> &'static str {
        match self {
            Classification::SelfRoute => "self",
            Classification::Active => "active",
            Classification::Blackhole => "blackhole",
            Classification::Oneway => "oneway",
            Classification::NoRouteTable => "no-route-table",
            Classification::Unknown => "unknown",
            Classification::NoRoute => "no-route",
        }
    }
}

impl From<Reachability> for Classification {
    fn from(value: Reachability) -> Self {
        match value {
            Reachability::Active => Classification::Active,
            Reachability::Blackhole => Classification::Blackhole,
            Reachability::Oneway => Classification::Oneway,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_id())
    }
}

/// Counts over every off-diagonal pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridStats {
    pub active: usize,
    pub blackhole: usize,
    pub oneway: usize,
    pub unknown: usize,
    pub no_route: usize,
    pub rows_without_route_table: usize,
}

/// Classification of every ordered pair, rows and columns in catalog order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachabilityGrid {
    attachment_ids: Vec<String>,
    rows: Vec<Row>,
}

impl ReachabilityGrid {
    pub fn new(attachment_ids: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            attachment_ids,
            rows,
        }
    }

    pub fn attachment_ids(&self) -> &[String] {
        &self.attachment_ids
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn index_of(&self, attachment_id: &str) -> Option<usize> {
        self.attachment_ids.iter().position(|id| id == attachment_id)
    }

    pub fn row(&self, attachment_id: &str) -> Option<&Row> {
        self.index_of(attachment_id).map(|idx| &self.rows[idx])
    }

    pub fn cell(&self, source: &str, destination: &str) -> Option<&Cell> {
        let src = self.index_of(source)?;
        let dst = self.index_of(destination)?;
        self.rows[src].cells.get(dst)
    }

    /// Symbol for the ordered pair, `None` when either id is not in the grid
    pub fn classification(&self, source: &str, destination: &str) -> Option<Classification> {
        let src = self.index_of(source)?;
        let dst = self.index_of(destination)?;
        if src == dst {
            return Some(Classification::SelfRoute);
        }

        let row = &self.rows[src];
        if row.state == RowState::NoRouteTable {
            return Some(Classification::NoRouteTable);
        }

        Some(match row.cells.get(dst)? {
            Cell::SelfRoute => Classification::SelfRoute,
            Cell::Empty => Classification::NoRoute,
            Cell::Routed { reachability, .. } => (*reachability).into(),
            Cell::Unknown { .. } => Classification::Unknown,
        })
    }

    pub fn stats(&self) -> GridStats {
        let mut stats = GridStats::default();
        for (src, row) in self.rows.iter().enumerate() {
            if row.state == RowState::NoRouteTable {
                stats.rows_without_route_table += 1;
                continue;
            }
            for (dst, cell) in row.cells.iter().enumerate() {
                if src == dst {
                    continue;
                }
                match cell {
                    Cell::SelfRoute => {}
                    Cell::Empty => stats.no_route += 1,
                    Cell::Routed { reachability, .. } => match reachability {
                        Reachability::Active => stats.active += 1,
                        Reachability::Blackhole => stats.blackhole += 1,
                        Reachability::Oneway => stats.oneway += 1,
                    },
                    Cell::Unknown { .. } => stats.unknown += 1,
                }
            }
        }
        stats
    }
}
