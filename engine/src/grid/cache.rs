//! Binary cache read/write for `Grid`, plus mesh validation errors.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use smallvec::SmallVec;

use super::Grid;

/// Errors related to grid construction and cache I/O.
#[derive(thiserror::Error, Debug)]
pub enum GridError {
    /// Wrapper for standard I/O errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Cache file has wrong magic or version
    #[error("bad magic or version")]
    BadHeader,
    /// A mesh needs at least one vertex
    #[error("mesh has no vertices")]
    Empty,
    /// Position and adjacency tables disagree in length
    #[error("{positions} positions but {neighbors} neighbor lists")]
    LengthMismatch {
        /// Number of positions supplied
        positions: usize,
        /// Number of neighbor lists supplied
        neighbors: usize,
    },
    /// Neighbor id out of range or pointing at the cell itself
    #[error("cell {cell} has invalid neighbor {neighbor}")]
    BadNeighbor {
        /// Offending cell
        cell: usize,
        /// Offending neighbor id
        neighbor: u32,
    },
    /// Adjacency is not symmetric
    #[error("cell {cell} lists {neighbor} but not the reverse")]
    Asymmetric {
        /// Offending cell
        cell: usize,
        /// Neighbor that does not list the cell back
        neighbor: u32,
    },
}

const MAGIC: &[u8; 10] = b"LITHOGRID\0";
const VERSION: u32 = 1;

impl Grid {
    /// Save grid to a compact little-endian binary cache.
    pub fn save_cache<P: AsRef<Path>>(&self, path: P) -> Result<(), GridError> {
        let mut f = BufWriter::new(File::create(path)?);
        f.write_all(MAGIC)?;
        f.write_all(&VERSION.to_le_bytes())?;
        f.write_all(&self.level.to_le_bytes())?;
        f.write_all(&(self.cells as u32).to_le_bytes())?;

        for p in &self.pos_xyz {
            for v in p {
                f.write_all(&v.to_le_bytes())?;
            }
        }
        for a in &self.area {
            f.write_all(&a.to_le_bytes())?;
        }
        // n1 with u8 length prefix per cell
        for neigh in &self.n1 {
            let len = u8::try_from(neigh.len()).unwrap_or(u8::MAX);
            f.write_all(&[len])?;
            for &idx in neigh.iter().take(len as usize) {
                f.write_all(&idx.to_le_bytes())?;
            }
        }
        f.flush()?;
        Ok(())
    }

    /// Load grid from a binary cache file.
    pub fn load_cache<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        let mut f = BufReader::new(File::open(path)?);
        let mut magic = [0u8; 10];
        f.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(GridError::BadHeader);
        }
        if read_u32(&mut f)? != VERSION {
            return Err(GridError::BadHeader);
        }
        let level = read_u32(&mut f)?;
        let cells = read_u32(&mut f)? as usize;
        if cells == 0 {
            return Err(GridError::Empty);
        }

        let mut pos_xyz = vec![[0f32; 3]; cells];
        for p in &mut pos_xyz {
            for v in p.iter_mut() {
                *v = read_f32(&mut f)?;
            }
        }
        let mut area = vec![0f32; cells];
        for a in &mut area {
            *a = read_f32(&mut f)?;
        }
        let mut n1 = Vec::with_capacity(cells);
        for cell in 0..cells {
            let mut len = [0u8; 1];
            f.read_exact(&mut len)?;
            let mut v: SmallVec<[u32; 6]> = SmallVec::new();
            for _ in 0..len[0] {
                let idx = read_u32(&mut f)?;
                if idx as usize >= cells {
                    return Err(GridError::BadNeighbor { cell, neighbor: idx });
                }
                v.push(idx);
            }
            n1.push(v);
        }
        Ok(Self { cells, pos_xyz, area, n1, level })
    }
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32, GridError> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}
fn read_f32<R: Read>(r: &mut R) -> Result<f32, GridError> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(f32::from_le_bytes(b))
}
