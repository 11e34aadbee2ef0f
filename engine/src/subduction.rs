//! Convergent contacts: subduction and continental collision.
//!
//! After plates move, a vertex owned by two or more plates is a contact. Contacts are
//! resolved against a frozen [`Contacts`] snapshot, so every plate's `deform` reads the
//! same pre-deform state and the result does not depend on plate order:
//! - the plate with the lowest effective density at the contact wins (ties go to the
//!   earlier plate in the list) and keeps the vertex;
//! - every other plate loses the vertex;
//! - when both the winner's and a loser's columns are continental the contact is a
//!   collision, and the loser's crust thickness is spread over the winner's cells within
//!   `mountain_width` of the contact (distance measured through the winner plate).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use smallvec::SmallVec;

use crate::geo;
use crate::grid::Grid;
use crate::isostasy;
use crate::plates::{Plate, PlateId};

/// How a losing column leaves the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    /// Dense column sinks under the winner
    Subduction,
    /// Buoyant columns pile up as a mountain belt on the winner
    Collision,
}

/// One losing side of a contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Loser {
    /// Plate losing the vertex
    pub plate: PlateId,
    /// Its crust thickness at the vertex (m)
    pub thickness: f32,
    /// Resolution of the contact for this plate
    pub kind: ContactKind,
}

/// A vertex claimed by several plates.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    /// Grid vertex
    pub cell: usize,
    /// Plate that keeps the vertex
    pub winner: PlateId,
    /// Plates that give it up
    pub losers: SmallVec<[Loser; 2]>,
}

/// Frozen snapshot of all contacts of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Contacts {
    /// Contacts in vertex order
    pub contacts: Vec<Contact>,
    /// Collision spreading radius (central angle, radians)
    pub mountain_width_rad: f64,
}

/// Per-plate result of [`Plate::deform`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeformStats {
    /// Cells this plate lost to subduction
    pub subducted: usize,
    /// Cells this plate lost to collision
    pub collided: usize,
    /// Cells of this plate thickened by collisions
    pub thickened: usize,
}

impl Contacts {
    /// Snapshot every vertex owned by two or more of `plates`.
    pub fn collect(plates: &[Plate], mountain_width_rad: f64) -> Self {
        let mut contacts = Vec::new();
        let Some(first) = plates.first() else {
            return Self { contacts, mountain_width_rad };
        };
        let cells = first.mask.len();
        let mut owners: SmallVec<[usize; 4]> = SmallVec::new();
        for i in 0..cells {
            owners.clear();
            owners.extend(plates.iter().enumerate().filter(|(_, p)| p.owns(i)).map(|(k, _)| k));
            if owners.len() < 2 {
                continue;
            }
            // strict comparison keeps the earliest plate on ties
            let mut w = owners[0];
            for &k in &owners[1..] {
                if plates[k].effective_density(i) < plates[w].effective_density(i) {
                    w = k;
                }
            }
            let winner_continental = isostasy::is_continental_density(plates[w].density[i]);
            let losers = owners
                .iter()
                .filter(|&&k| k != w)
                .map(|&k| {
                    let continental = isostasy::is_continental_density(plates[k].density[i]);
                    Loser {
                        plate: plates[k].id,
                        thickness: plates[k].thickness[i],
                        kind: if winner_continental && continental {
                            ContactKind::Collision
                        } else {
                            ContactKind::Subduction
                        },
                    }
                })
                .collect();
            contacts.push(Contact { cell: i, winner: plates[w].id, losers });
        }
        Self { contacts, mountain_width_rad }
    }

    /// Number of contact vertices.
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// True when no plates overlap.
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

impl Plate {
    /// Apply this plate's side of every contact in `contacts`.
    pub fn deform(&mut self, contacts: &Contacts) -> DeformStats {
        let mut stats = DeformStats::default();
        let grid = std::sync::Arc::clone(self.grid());

        for c in &contacts.contacts {
            if let Some(l) = c.losers.iter().find(|l| l.plate == self.id) {
                self.clear_cell(c.cell);
                match l.kind {
                    ContactKind::Subduction => stats.subducted += 1,
                    ContactKind::Collision => stats.collided += 1,
                }
            }
        }

        let mut touched = vec![false; grid.cells];
        for c in contacts.contacts.iter().filter(|c| c.winner == self.id) {
            let load: f32 = c.losers.iter().filter(|l| l.kind == ContactKind::Collision).map(|l| l.thickness).sum();
            if load <= 0.0 {
                continue;
            }
            let belt = cells_within(&grid, c.cell, contacts.mountain_width_rad, |j| self.owns(j));
            let share = load / belt.len() as f32;
            for &j in &belt {
                self.thickness[j] += share;
                touched[j] = true;
            }
        }
        for (j, t) in touched.into_iter().enumerate() {
            if t {
                self.elevation[j] = isostasy::isostatic_elevation(self.thickness[j], self.density[j]);
                stats.thickened += 1;
            }
        }

        if stats.subducted + stats.collided > 0 {
            self.update_borders();
        }
        if stats != DeformStats::default() {
            log::debug!(
                "[deform] plate={} subducted={} collided={} thickened={}",
                self.id.0,
                stats.subducted,
                stats.collided,
                stats.thickened
            );
        }
        stats
    }
}

#[derive(Copy, Clone, Debug)]
struct QItem {
    dist: f64,
    cell: u32,
}
impl Eq for QItem {}
impl PartialEq for QItem {
    fn eq(&self, other: &Self) -> bool {
        self.dist.eq(&other.dist) && self.cell == other.cell
    }
}
impl PartialOrd for QItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // min-heap by distance
        match self.dist.partial_cmp(&other.dist) {
            Some(Ordering::Less) => Ordering::Greater,
            Some(Ordering::Greater) => Ordering::Less,
            Some(Ordering::Equal) => self.cell.cmp(&other.cell).reverse(),
            None => Ordering::Equal,
        }
    }
}

/// Vertices reachable from `seed` through `inside` vertices within great-circle path
/// length `max_angle`. The seed is always included.
fn cells_within(grid: &Grid, seed: usize, max_angle: f64, inside: impl Fn(usize) -> bool) -> Vec<usize> {
    let mut dist: std::collections::HashMap<usize, f64> = std::collections::HashMap::new();
    let mut heap = BinaryHeap::new();
    dist.insert(seed, 0.0);
    heap.push(QItem { dist: 0.0, cell: seed as u32 });
    let mut out = Vec::new();
    while let Some(QItem { dist: d, cell }) = heap.pop() {
        let u = cell as usize;
        if dist.get(&u).is_some_and(|&best| d > best) {
            continue;
        }
        out.push(u);
        let pu = geo::to_f64(grid.pos_xyz[u]);
        for &vn in &grid.n1[u] {
            let v = vn as usize;
            if !inside(v) {
                continue;
            }
            let nd = d + geo::arc_angle(pu, geo::to_f64(grid.pos_xyz[v]));
            if nd <= max_angle && dist.get(&v).map_or(true, |&best| nd < best) {
                dist.insert(v, nd);
                heap.push(QItem { dist: nd, cell: vn });
            }
        }
    }
    out
}
