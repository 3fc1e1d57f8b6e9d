//! Sketch snapshots
//!
//! Serializes the full cell table so a domain can be rebuilt after a restart.
//!
//! ## Format
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Header (48 bytes)                        │
//! │  magic "CMLS" | version | encoding | pad │
//! │  width u32 | depth u32                   │
//! │  total_count u64                         │
//! │  epsilon f64 | delta f64                 │
//! │  payload_len u32 | header_checksum u32   │
//! ├──────────────────────────────────────────┤
//! │ Payload: bincode(Vec<u16>)         dense │
//! │       or bincode(Vec<(u32, u16)>) sparse │
//! ├──────────────────────────────────────────┤
//! │ payload_checksum u32                     │
//! └──────────────────────────────────────────┘
//! ```
//!
//! Sparse encoding is picked when fewer than a quarter of the cells are set,
//! which is the common case for a freshly created wide sketch.

use super::{CountMinLogSketch, SnapshotError, CELLS_MAX};
use std::io::{Cursor, Read as IoRead, Write as IoWrite};

const SNAPSHOT_MAGIC: &[u8; 4] = b"CMLS";
const SNAPSHOT_VERSION: u8 = 1;
const SNAPSHOT_HEADER_SIZE: usize = 48;
const SNAPSHOT_FOOTER_SIZE: usize = 4;

/// How the cell table is laid out in the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellEncoding {
    /// Every cell, row-major
    Dense,
    /// Only non-zero cells as (index, value) pairs
    Sparse,
}

impl CellEncoding {
    fn code(self) -> u8 {
        match self {
            CellEncoding::Dense => 0,
            CellEncoding::Sparse => 1,
        }
    }

    fn from_code(code: u8) -> Result<Self, SnapshotError> {
        match code {
            0 => Ok(CellEncoding::Dense),
            1 => Ok(CellEncoding::Sparse),
            other => Err(SnapshotError::Encoding(format!(
                "unknown cell encoding {}",
                other
            ))),
        }
    }

    fn choose(cells: &[u16]) -> Self {
        let occupied = cells.iter().filter(|&&c| c != 0).count();
        if occupied < cells.len() / 4 {
            CellEncoding::Sparse
        } else {
            CellEncoding::Dense
        }
    }
}

#[derive(Debug, Clone)]
struct SnapshotHeader {
    encoding: CellEncoding,
    width: u32,
    depth: u32,
    total_count: u64,
    epsilon: f64,
    delta: f64,
    payload_len: u32,
}

impl SnapshotHeader {
    fn compute_checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(SNAPSHOT_MAGIC);
        hasher.update(&[SNAPSHOT_VERSION, self.encoding.code()]);
        hasher.update(&self.width.to_le_bytes());
        hasher.update(&self.depth.to_le_bytes());
        hasher.update(&self.total_count.to_le_bytes());
        hasher.update(&self.epsilon.to_le_bytes());
        hasher.update(&self.delta.to_le_bytes());
        hasher.update(&self.payload_len.to_le_bytes());
        hasher.finalize()
    }

    fn write_to<W: IoWrite>(&self, writer: &mut W) -> std::io::Result<()> {
        // 4 bytes: magic
        writer.write_all(SNAPSHOT_MAGIC)?;
        // 1 byte: version, 1 byte: encoding, 2 bytes: padding
        writer.write_all(&[SNAPSHOT_VERSION, self.encoding.code(), 0, 0])?;
        // 8 bytes: dimensions
        writer.write_all(&self.width.to_le_bytes())?;
        writer.write_all(&self.depth.to_le_bytes())?;
        // 8 bytes: total_count
        writer.write_all(&self.total_count.to_le_bytes())?;
        // 16 bytes: accuracy targets
        writer.write_all(&self.epsilon.to_le_bytes())?;
        writer.write_all(&self.delta.to_le_bytes())?;
        // 4 bytes: payload_len, 4 bytes: header_checksum
        writer.write_all(&self.payload_len.to_le_bytes())?;
        writer.write_all(&self.compute_checksum().to_le_bytes())?;
        Ok(())
    }

    fn read_from<R: IoRead>(reader: &mut R) -> Result<Self, SnapshotError> {
        let mut buf4 = [0u8; 4];
        let mut buf8 = [0u8; 8];

        reader.read_exact(&mut buf4).map_err(truncated_header)?;
        if &buf4 != SNAPSHOT_MAGIC {
            return Err(SnapshotError::InvalidMagic(buf4));
        }

        reader.read_exact(&mut buf4).map_err(truncated_header)?;
        if buf4[0] != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(buf4[0]));
        }
        let encoding = CellEncoding::from_code(buf4[1])?;

        reader.read_exact(&mut buf4).map_err(truncated_header)?;
        let width = u32::from_le_bytes(buf4);
        reader.read_exact(&mut buf4).map_err(truncated_header)?;
        let depth = u32::from_le_bytes(buf4);
        reader.read_exact(&mut buf8).map_err(truncated_header)?;
        let total_count = u64::from_le_bytes(buf8);
        reader.read_exact(&mut buf8).map_err(truncated_header)?;
        let epsilon = f64::from_le_bytes(buf8);
        reader.read_exact(&mut buf8).map_err(truncated_header)?;
        let delta = f64::from_le_bytes(buf8);
        reader.read_exact(&mut buf4).map_err(truncated_header)?;
        let payload_len = u32::from_le_bytes(buf4);
        reader.read_exact(&mut buf4).map_err(truncated_header)?;
        let header_checksum = u32::from_le_bytes(buf4);

        let header = SnapshotHeader {
            encoding,
            width,
            depth,
            total_count,
            epsilon,
            delta,
            payload_len,
        };
        let expected = header.compute_checksum();
        if header_checksum != expected {
            return Err(SnapshotError::ChecksumMismatch {
                expected,
                actual: header_checksum,
            });
        }
        Ok(header)
    }

    fn cell_count(&self) -> Result<usize, SnapshotError> {
        let (width, depth) = (self.width as usize, self.depth as usize);
        match width.checked_mul(depth) {
            Some(cells) if width > 0 && depth > 0 && cells <= CELLS_MAX => Ok(cells),
            _ => Err(SnapshotError::DimensionMismatch(format!(
                "invalid dimensions {}x{}",
                self.width, self.depth
            ))),
        }
    }
}

fn truncated_header(_: std::io::Error) -> SnapshotError {
    SnapshotError::Truncated {
        needed: SNAPSHOT_HEADER_SIZE,
        available: 0,
    }
}

impl CountMinLogSketch {
    /// Encodes the full sketch state (cells, total count, sizing).
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let cells = self.cells();
        let encoding = CellEncoding::choose(cells);
        let payload = match encoding {
            CellEncoding::Dense => bincode::serialize(cells)?,
            CellEncoding::Sparse => {
                let pairs: Vec<(u32, u16)> = cells
                    .iter()
                    .enumerate()
                    .filter(|(_, &c)| c != 0)
                    .map(|(i, &c)| (i as u32, c))
                    .collect();
                bincode::serialize(&pairs)?
            }
        };
        let payload_len = u32::try_from(payload.len()).map_err(|_| {
            SnapshotError::Encoding(format!("payload of {} bytes too large", payload.len()))
        })?;

        let header = SnapshotHeader {
            encoding,
            width: self.width() as u32,
            depth: self.depth() as u32,
            total_count: self.count(),
            epsilon: self.epsilon(),
            delta: self.delta(),
            payload_len,
        };

        let mut out =
            Vec::with_capacity(SNAPSHOT_HEADER_SIZE + payload.len() + SNAPSHOT_FOOTER_SIZE);
        // Writes into a Vec cannot fail
        header
            .write_to(&mut out)
            .map_err(|e| SnapshotError::Encoding(e.to_string()))?;
        out.extend_from_slice(&payload);
        out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        Ok(out)
    }

    /// Decodes a snapshot produced by [`to_bytes`](Self::to_bytes).
    ///
    /// The RNG is reseeded with `seed`; the probabilistic update stream is not
    /// part of the persisted state.
    pub fn from_bytes(bytes: &[u8], seed: u64) -> Result<Self, SnapshotError> {
        if bytes.len() < SNAPSHOT_HEADER_SIZE + SNAPSHOT_FOOTER_SIZE {
            return Err(SnapshotError::Truncated {
                needed: SNAPSHOT_HEADER_SIZE + SNAPSHOT_FOOTER_SIZE,
                available: bytes.len(),
            });
        }

        let mut cursor = Cursor::new(bytes);
        let header = SnapshotHeader::read_from(&mut cursor)?;
        let cell_count = header.cell_count()?;
        if !(header.epsilon.is_finite() && header.delta.is_finite()) {
            return Err(SnapshotError::DimensionMismatch(format!(
                "non-finite accuracy targets epsilon={} delta={}",
                header.epsilon, header.delta
            )));
        }

        let payload_start = SNAPSHOT_HEADER_SIZE;
        let payload_end = payload_start + header.payload_len as usize;
        let needed = payload_end + SNAPSHOT_FOOTER_SIZE;
        if bytes.len() < needed {
            return Err(SnapshotError::Truncated {
                needed,
                available: bytes.len(),
            });
        }

        let payload = &bytes[payload_start..payload_end];
        let mut checksum = [0u8; 4];
        checksum.copy_from_slice(&bytes[payload_end..needed]);
        let stored = u32::from_le_bytes(checksum);
        let actual = crc32fast::hash(payload);
        if stored != actual {
            return Err(SnapshotError::ChecksumMismatch {
                expected: stored,
                actual,
            });
        }

        let table = match header.encoding {
            CellEncoding::Dense => {
                let table: Vec<u16> = bincode::deserialize(payload)?;
                if table.len() != cell_count {
                    return Err(SnapshotError::DimensionMismatch(format!(
                        "payload has {} cells, header says {}",
                        table.len(),
                        cell_count
                    )));
                }
                table
            }
            CellEncoding::Sparse => {
                let pairs: Vec<(u32, u16)> = bincode::deserialize(payload)?;
                let mut table = vec![0u16; cell_count];
                for (index, value) in pairs {
                    let slot = table.get_mut(index as usize).ok_or_else(|| {
                        SnapshotError::DimensionMismatch(format!(
                            "cell index {} outside {} cells",
                            index, cell_count
                        ))
                    })?;
                    *slot = value;
                }
                table
            }
        };

        Ok(CountMinLogSketch::from_parts(
            header.width as usize,
            header.depth as usize,
            header.epsilon,
            header.delta,
            table,
            header.total_count,
            seed,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated(seed: u64, keys: u32) -> CountMinLogSketch {
        let mut sketch = CountMinLogSketch::with_seed(0.01, 0.1, seed).unwrap();
        for i in 0..keys {
            for _ in 0..=(i % 4) {
                sketch.increase_count(format!("key:{}", i).as_bytes());
            }
        }
        sketch
    }

    #[test]
    fn test_sparse_snapshot_restores_estimates() {
        let sketch = populated(1, 10);
        let bytes = sketch.to_bytes().unwrap();
        assert_eq!(bytes[5], CellEncoding::Sparse.code());

        let restored = CountMinLogSketch::from_bytes(&bytes, 2).unwrap();
        assert_eq!(restored.width(), sketch.width());
        assert_eq!(restored.depth(), sketch.depth());
        assert_eq!(restored.count(), sketch.count());
        assert_eq!(restored.cells(), sketch.cells());
        for i in 0..10 {
            let key = format!("key:{}", i);
            assert_eq!(
                restored.get_count(key.as_bytes()),
                sketch.get_count(key.as_bytes())
            );
        }
    }

    #[test]
    fn test_dense_snapshot_when_table_is_full() {
        let sketch = populated(3, 2_000);
        let bytes = sketch.to_bytes().unwrap();
        assert_eq!(bytes[5], CellEncoding::Dense.code());

        let restored = CountMinLogSketch::from_bytes(&bytes, 4).unwrap();
        assert_eq!(restored.cells(), sketch.cells());
        assert_eq!(restored.count(), 2_000 / 4 * (1 + 2 + 3 + 4));
    }

    #[test]
    fn test_empty_sketch_snapshot() {
        let sketch = CountMinLogSketch::with_seed(0.01, 0.1, 5).unwrap();
        let restored = CountMinLogSketch::from_bytes(&sketch.to_bytes().unwrap(), 5).unwrap();
        assert!(restored.is_empty());
        assert_eq!(restored.get_count(b"anything"), 0);
    }

    #[test]
    fn test_corrupt_payload_detected() {
        let mut bytes = populated(1, 10).to_bytes().unwrap();
        let idx = SNAPSHOT_HEADER_SIZE + 2;
        bytes[idx] ^= 0xFF;
        assert!(matches!(
            CountMinLogSketch::from_bytes(&bytes, 0),
            Err(SnapshotError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_corrupt_header_detected() {
        let mut bytes = populated(1, 10).to_bytes().unwrap();
        // flip a bit in total_count
        bytes[16] ^= 0x01;
        assert!(matches!(
            CountMinLogSketch::from_bytes(&bytes, 0),
            Err(SnapshotError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_magic_and_version() {
        let bytes = populated(1, 3).to_bytes().unwrap();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            CountMinLogSketch::from_bytes(&bad_magic, 0),
            Err(SnapshotError::InvalidMagic(_))
        ));

        let mut bad_version = bytes;
        bad_version[4] = 99;
        assert!(matches!(
            CountMinLogSketch::from_bytes(&bad_version, 0),
            Err(SnapshotError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_truncated_snapshot() {
        let bytes = populated(1, 10).to_bytes().unwrap();
        assert!(matches!(
            CountMinLogSketch::from_bytes(&bytes[..20], 0),
            Err(SnapshotError::Truncated { .. })
        ));
        assert!(matches!(
            CountMinLogSketch::from_bytes(&bytes[..bytes.len() - 1], 0),
            Err(SnapshotError::Truncated { .. })
        ));
    }
}
