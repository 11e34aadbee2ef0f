//! Region segmentation over vector rasters: magic-wand select and plate maps.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::{Uint16Raster, Uint8Raster, VectorRaster};
use crate::geo;

/// Label for cells outside the segmented mask.
pub const NO_LABEL: u16 = u16::MAX;

/// Vectors shorter than this are treated as zero.
const ZERO_EPS: f32 = 1e-12;

/// Similarity rule for region growing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WandParams {
    /// Minimum cosine between a candidate's vector and the seed's vector
    pub min_cosine: f32,
}

impl Default for WandParams {
    fn default() -> Self {
        Self { min_cosine: 0.8 }
    }
}

impl WandParams {
    /// Whether `v` is similar to the reference vector `reference`.
    ///
    /// A zero reference only matches zero vectors.
    pub fn similar(&self, reference: [f32; 3], v: [f32; 3]) -> bool {
        let nr = geo::norm32(reference);
        let nv = geo::norm32(v);
        if nr <= ZERO_EPS {
            return nv <= ZERO_EPS;
        }
        if nv <= ZERO_EPS {
            return false;
        }
        geo::dot32(reference, v) / (nr * nv) >= self.min_cosine
    }
}

/// Grow a region from `seed` over grid adjacency, restricted to `mask`.
///
/// A cell joins when its vector is similar to the seed's vector. The seed vector is the
/// region statistic: unlike a running mean it never drifts as cells join, so the result
/// is the connected component of `seed` among similar cells whatever the visit order.
/// The seed is always included, even when it lies outside `mask`.
pub fn magic_wand_select(field: &VectorRaster, seed: usize, mask: &Uint8Raster, params: &WandParams) -> Uint8Raster {
    field.assert_same_grid(mask);
    let grid = field.grid();
    let reference = field[seed];
    let mut out = Uint8Raster::new(grid, 0);
    out[seed] = 1;
    let mut queue = VecDeque::from([seed]);
    while let Some(u) = queue.pop_front() {
        for &nj in &grid.n1[u] {
            let j = nj as usize;
            if out[j] == 0 && mask[j] != 0 && params.similar(reference, field[j]) {
                out[j] = 1;
                queue.push_back(j);
            }
        }
    }
    out
}

/// Controls for [`plate_map`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateMapParams {
    /// Region growing rule
    pub wand: WandParams,
    /// Stop seeding new regions after this many
    pub max_regions: usize,
    /// Regions smaller than this many cells are merged into a neighbor
    pub min_region_size: usize,
}

impl Default for PlateMapParams {
    fn default() -> Self {
        Self { wand: WandParams::default(), max_regions: 7, min_region_size: 200 }
    }
}

/// Labelled partition of a mask.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateMap {
    /// Region label per cell in `0..count`; [`NO_LABEL`] outside the mask
    pub labels: Uint16Raster,
    /// Number of regions
    pub count: usize,
}

impl PlateMap {
    /// 0/1 mask of region `label`.
    pub fn region(&self, label: u16) -> Uint8Raster {
        self.labels.map(|&l| u8::from(l == label))
    }

    /// Cell count per label.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.count];
        for &l in self.labels.iter() {
            if l != NO_LABEL {
                sizes[l as usize] += 1;
            }
        }
        sizes
    }
}

/// Partition every cell of `mask` into labelled regions of similar vectors.
///
/// Regions are seeded at the longest remaining vector and grown with
/// [`magic_wand_select`] until the mask is covered or `max_regions` is reached. Cells
/// left over are absorbed by the nearest region (multi-source BFS); mask components no
/// region can reach go to the largest region, so there are never more than
/// `max_regions` labels (at least one for a non-empty mask). Regions under
/// `min_region_size` then merge into the neighbor sharing the longest border.
pub fn plate_map(field: &VectorRaster, mask: &Uint8Raster, params: &PlateMapParams) -> PlateMap {
    field.assert_same_grid(mask);
    let grid = field.grid();
    let n = grid.cells;
    let mut labels = Uint16Raster::new(grid, NO_LABEL);
    let mut count = 0usize;
    let mut unassigned = mask.map(|&m| u8::from(m != 0));
    let magnitude: Vec<f32> = field.iter().map(|&v| geo::norm32(v)).collect();

    // seed regions at the strongest remaining vector
    while count < params.max_regions.min(NO_LABEL as usize) {
        let mut seed: Option<usize> = None;
        for i in 0..n {
            if unassigned[i] != 0 && seed.map_or(true, |s| magnitude[i] > magnitude[s]) {
                seed = Some(i);
            }
        }
        let Some(seed) = seed else { break };
        let region = magic_wand_select(field, seed, &unassigned, &params.wand);
        for i in 0..n {
            if region[i] != 0 {
                labels[i] = count as u16;
                unassigned[i] = 0;
            }
        }
        count += 1;
    }

    // leftovers join the nearest region by hops
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| labels[i] != NO_LABEL).collect();
    while let Some(u) = queue.pop_front() {
        for &nj in &grid.n1[u] {
            let j = nj as usize;
            if unassigned[j] != 0 {
                unassigned[j] = 0;
                labels[j] = labels[u];
                queue.push_back(j);
            }
        }
    }

    // mask components no region reached join the largest region, keeping the cap
    if unassigned.iter().any(|&u| u != 0) {
        let mut sizes = vec![0usize; count];
        for &l in labels.iter() {
            if l != NO_LABEL {
                sizes[l as usize] += 1;
            }
        }
        let largest = (0..count).max_by(|&a, &b| sizes[a].cmp(&sizes[b]).then(b.cmp(&a))).unwrap_or(0);
        count = count.max(1);
        for i in 0..n {
            if unassigned[i] != 0 {
                unassigned[i] = 0;
                labels[i] = largest as u16;
            }
        }
    }

    merge_small_regions(&mut labels, count, params.min_region_size);
    let count = compact_labels(&mut labels, count);
    log::debug!("[plate_map] regions={} cells={}", count, labels.iter().filter(|&&l| l != NO_LABEL).count());
    PlateMap { labels, count }
}

fn merge_small_regions(labels: &mut Uint16Raster, count: usize, min_size: usize) {
    let grid = labels.grid().clone();
    let mut sizes = vec![0usize; count];
    for &l in labels.iter() {
        if l != NO_LABEL {
            sizes[l as usize] += 1;
        }
    }
    let mut settled = vec![false; count];
    loop {
        let live = sizes.iter().filter(|&&s| s > 0).count();
        if live <= 1 {
            return;
        }
        let victim = (0..count)
            .filter(|&r| !settled[r] && sizes[r] > 0 && sizes[r] < min_size)
            .min_by_key(|&r| (sizes[r], r));
        let Some(victim) = victim else { return };

        let mut border = vec![0usize; count];
        for i in 0..grid.cells {
            if labels[i] as usize != victim {
                continue;
            }
            for &nj in &grid.n1[i] {
                let l = labels[nj as usize];
                if l != NO_LABEL && l as usize != victim {
                    border[l as usize] += 1;
                }
            }
        }
        let target = (0..count)
            .filter(|&r| border[r] > 0)
            .max_by(|&a, &b| border[a].cmp(&border[b]).then(sizes[a].cmp(&sizes[b])).then(b.cmp(&a)));
        let Some(target) = target else {
            // isolated component, nothing to merge into
            settled[victim] = true;
            continue;
        };
        for l in labels.as_mut_slice() {
            if *l as usize == victim {
                *l = target as u16;
            }
        }
        sizes[target] += sizes[victim];
        sizes[victim] = 0;
    }
}

fn compact_labels(labels: &mut Uint16Raster, count: usize) -> usize {
    let mut remap = vec![NO_LABEL; count];
    let mut next = 0u16;
    for l in labels.as_mut_slice() {
        if *l == NO_LABEL {
            continue;
        }
        let slot = &mut remap[*l as usize];
        if *slot == NO_LABEL {
            *slot = next;
            next += 1;
        }
        *l = *slot;
    }
    next as usize
}
