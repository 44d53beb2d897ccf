//! Precomputed low-discrepancy barycentric sample table
//!
//! The table holds points of a 2D Halton sequence restricted to `u + v <= 1`
//! so each entry is directly usable as a pair of barycentric weights. It is
//! generated once offline, stored, and then read by every analysis run
//! through a [`PointSource`] cursor that wraps around the table.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use std::path::Path;

use navlink_common::{Error, Result};

/// Magic number for table files ('NLHT' in little-endian)
pub const HALTON_TABLE_MAGIC: u32 = 0x5448_4C4E;

/// Current table file version
pub const HALTON_TABLE_VERSION: u32 = 1;

/// Table length used when none is specified
pub const DEFAULT_TABLE_LEN: usize = 3000;

/// Prime bases of the two sequence dimensions
const HALTON_BASES: [u32; 2] = [2, 5];

/// Radical inverse of `index` in the given base
fn radical_inverse(mut index: u64, base: u32) -> f32 {
    let base = base as u64;
    let inv_base = 1.0 / base as f64;
    let mut factor = inv_base;
    let mut result = 0.0f64;
    while index > 0 {
        result += factor * (index % base) as f64;
        index /= base;
        factor *= inv_base;
    }
    result as f32
}

/// Incremental 2D Halton sequence generator
#[derive(Debug, Clone, Default)]
pub struct HaltonSequence {
    index: u64,
}

impl HaltonSequence {
    /// Creates a generator positioned at index 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Current point of the sequence
    pub fn current(&self) -> (f32, f32) {
        (
            radical_inverse(self.index, HALTON_BASES[0]),
            radical_inverse(self.index, HALTON_BASES[1]),
        )
    }

    /// Advances to the next point
    pub fn increment(&mut self) {
        self.index += 1;
    }
}

/// Immutable table of barycentric sample pairs
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct HaltonTable {
    points: Vec<[f32; 2]>,
}

impl Default for HaltonTable {
    fn default() -> Self {
        // DEFAULT_TABLE_LEN is non-zero
        Self::generate_unchecked(DEFAULT_TABLE_LEN)
    }
}

impl HaltonTable {
    /// Generates a table of `len` points with `u + v <= 1`
    pub fn generate(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::InvalidTable("table length must be positive".to_string()));
        }
        Ok(Self::generate_unchecked(len))
    }

    fn generate_unchecked(len: usize) -> Self {
        let mut seq = HaltonSequence::new();
        let mut points = Vec::with_capacity(len);

        for _ in 0..len {
            let (mut u, mut v) = seq.current();
            while u + v > 1.0 {
                seq.increment();
                (u, v) = seq.current();
            }
            points.push([u, v]);
            seq.increment();
        }

        Self { points }
    }

    /// Builds a table from existing points, validating each of them
    pub fn from_points(points: Vec<[f32; 2]>) -> Result<Self> {
        let table = Self { points };
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        if self.points.is_empty() {
            return Err(Error::InvalidTable("table is empty".to_string()));
        }
        for (i, [u, v]) in self.points.iter().enumerate() {
            let in_range = (0.0..=1.0).contains(u) && (0.0..=1.0).contains(v);
            if !in_range || u + v > 1.0 {
                return Err(Error::InvalidTable(format!(
                    "entry {} ({}, {}) is not a barycentric pair",
                    i, u, v
                )));
            }
        }
        Ok(())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a validated table
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All entries in order
    pub fn points(&self) -> &[[f32; 2]] {
        &self.points
    }

    /// Creates a cursor starting at the first entry
    pub fn source(&self) -> PointSource<'_> {
        PointSource {
            table: self,
            cursor: 0,
        }
    }

    /// Writes the table in binary form
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let len = u32::try_from(self.points.len())
            .map_err(|_| Error::InvalidTable("table too large".to_string()))?;
        writer.write_u32::<LittleEndian>(HALTON_TABLE_MAGIC)?;
        writer.write_u32::<LittleEndian>(HALTON_TABLE_VERSION)?;
        writer.write_u32::<LittleEndian>(len)?;
        for [u, v] in &self.points {
            writer.write_f32::<LittleEndian>(*u)?;
            writer.write_f32::<LittleEndian>(*v)?;
        }
        Ok(())
    }

    /// Reads a table written by [`HaltonTable::write_to`]
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != HALTON_TABLE_MAGIC {
            return Err(Error::InvalidTable(format!("wrong magic {:#010x}", magic)));
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version != HALTON_TABLE_VERSION {
            return Err(Error::InvalidTable(format!("unsupported version {}", version)));
        }
        let len = reader.read_u32::<LittleEndian>()? as usize;

        let mut points = Vec::with_capacity(len.min(1 << 16));
        for _ in 0..len {
            let u = reader.read_f32::<LittleEndian>()?;
            let v = reader.read_f32::<LittleEndian>()?;
            points.push([u, v]);
        }

        Self::from_points(points)
    }

    /// Saves the table to a binary file
    pub fn save_to_binary<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut data = Vec::with_capacity(12 + self.points.len() * 8);
        self.write_to(&mut data)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Loads a table from a binary file
    pub fn load_from_binary<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::read_from(&mut data.as_slice())
    }

    /// Saves the table to a file in JSON format
    #[cfg(feature = "serialization")]
    pub fn save_to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Loads a table from a JSON file
    #[cfg(feature = "serialization")]
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let table: Self =
            serde_json::from_str(&json).map_err(|e| Error::Serialization(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }
}

/// Cyclic cursor over a [`HaltonTable`]
#[derive(Debug, Clone)]
pub struct PointSource<'a> {
    table: &'a HaltonTable,
    cursor: usize,
}

impl PointSource<'_> {
    /// Returns the next pair, wrapping to the start after the last entry
    pub fn next_pair(&mut self) -> (f32, f32) {
        let [u, v] = self.table.points[self.cursor % self.table.points.len()];
        self.cursor = self.cursor.wrapping_add(1);
        (u, v)
    }

    /// Rewinds to the first entry
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Number of pairs handed out since creation or the last reset
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
