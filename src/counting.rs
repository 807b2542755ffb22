use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::crossing::Direction;

/// The closed set of reporting categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VehicleClass {
    Car,
    Bike,
    Bus,
    Truck,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 4] = [
        VehicleClass::Car,
        VehicleClass::Bike,
        VehicleClass::Bus,
        VehicleClass::Truck,
    ];

    /// Fixed allow-list over the detector vocabulary. Anything outside it
    /// ("person", "airplane", ...) is tracked and drawn but never counted.
    pub fn from_label(label: &str) -> Option<VehicleClass> {
        match label {
            "car" => Some(VehicleClass::Car),
            "motorcycle" => Some(VehicleClass::Bike),
            "bus" => Some(VehicleClass::Bus),
            "truck" => Some(VehicleClass::Truck),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Car => "Car",
            Self::Bike => "Bike",
            Self::Bus => "Bus",
            Self::Truck => "Truck",
        }
    }
}

impl std::fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directional count table keyed `"{Direction}_{Category}"`.
///
/// All eight keys exist from construction so consumers always see the full,
/// stable key set. Counts only move through [`register`] and only upward
/// within a session.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CountTable {
    counts: BTreeMap<String, u64>,
}

impl CountTable {
    pub fn new() -> Self {
        let mut counts = BTreeMap::new();
        for direction in [Direction::Incoming, Direction::Outgoing] {
            for class in VehicleClass::ALL {
                counts.insert(Self::key(direction, class), 0);
            }
        }
        CountTable { counts }
    }

    pub fn key(direction: Direction, class: VehicleClass) -> String {
        format!("{}_{}", direction.as_str(), class.as_str())
    }

    fn increment(&mut self, direction: Direction, class: VehicleClass) {
        *self.counts.entry(Self::key(direction, class)).or_insert(0) += 1;
    }

    pub fn get(&self, direction: Direction, class: VehicleClass) -> u64 {
        self.counts
            .get(&Self::key(direction, class))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn reset(&mut self) {
        for value in self.counts.values_mut() {
            *value = 0;
        }
    }

    /// Key/value pairs in stable (sorted) key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Default for CountTable {
    fn default() -> Self {
        CountTable::new()
    }
}

/// Apply a crossing at most once per identity. Returns whether a new count
/// was recorded.
///
/// This is the only path by which counts increase; the counted-identity set
/// is the serialization point for the at-most-once guarantee.
pub fn register(
    id: u32,
    class: VehicleClass,
    direction: Direction,
    counted_ids: &mut HashSet<u32>,
    counts: &mut CountTable,
) -> bool {
    if !counted_ids.insert(id) {
        return false;
    }
    counts.increment(direction, class);
    true
}

/// Aggregate state for one processing session, owned by the caller and
/// passed into the frame orchestrator by reference each frame. A new video
/// means a fresh session (or a `reset`).
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub counts: CountTable,
    pub counted_ids: HashSet<u32>,
}

impl SessionState {
    pub fn new() -> Self {
        SessionState::default()
    }

    pub fn reset(&mut self) {
        self.counts.reset();
        self.counted_ids.clear();
    }
}
