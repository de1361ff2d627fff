//! Round-robin archive file decoding (panic-free).
//!
//! Layout handled: rrdtool on-disk format versions 0001-0004 as written on
//! 64-bit little-endian hosts (8-byte `unsigned long`, 8-byte alignment).
//!
//! Parsing rules:
//! - Never index raw buffers; always use `Buf` and `remaining()` checks.
//! - Counts read from the file are bounded by the bytes actually present
//!   before anything is allocated.

use bytes::{Buf, Bytes};

use crate::error::FetchError;
use crate::model::{Sample, Series, TimeRange};

const COOKIE: &[u8; 4] = b"RRD\0";
const FLOAT_COOKIE: f64 = 8.642135e130;

pub(crate) const STAT_HEAD_SIZE: usize = 128;
/// Padding between the 5-byte version and the 8-byte aligned float cookie.
const STAT_HEAD_PAD: usize = 7;
pub(crate) const DS_DEF_SIZE: usize = 120;
pub(crate) const RRA_DEF_SIZE: usize = 120;
pub(crate) const PDP_PREP_SIZE: usize = 112;
pub(crate) const CDP_PREP_SIZE: usize = 80;
pub(crate) const RRA_PTR_SIZE: usize = 8;
const NAME_SIZE: usize = 20;
const PAR_SIZE: usize = 80;

/// One consolidated archive (RRA) inside the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDef {
    /// Consolidation function, e.g. `AVERAGE`.
    pub cf: String,
    pub rows: u64,
    pub pdp_per_row: u64,
    /// Row most recently written.
    pub cur_row: u64,
    data_offset: usize,
}

/// Decoded file: header plus the raw data block.
#[derive(Debug, Clone)]
pub struct RrdFile {
    pub version: u8,
    /// Base step in seconds.
    pub pdp_step: u64,
    /// Last update, epoch seconds.
    pub last_up: i64,
    pub data_sources: Vec<String>,
    pub archives: Vec<ArchiveDef>,
    data: Bytes,
}

fn corrupt(msg: impl Into<String>) -> FetchError {
    FetchError::StoreCorrupt(msg.into())
}

fn need(buf: &Bytes, n: usize, what: &str) -> Result<(), FetchError> {
    if buf.remaining() < n {
        return Err(corrupt(format!("truncated {what}")));
    }
    Ok(())
}

/// Read a fixed-size, NUL-padded name field.
fn take_name(buf: &mut Bytes, size: usize) -> String {
    let raw = buf.copy_to_bytes(size);
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn take_count(buf: &mut Bytes, per_item: usize, file_len: usize, what: &str) -> Result<usize, FetchError> {
    let n = usize::try_from(buf.get_u64_le()).map_err(|_| corrupt(format!("{what} overflow")))?;
    match n.checked_mul(per_item) {
        Some(total) if total <= file_len => Ok(n),
        _ => Err(corrupt(format!("{what} exceeds file size"))),
    }
}

/// Fixed-size head at the start of every file (`stat_head_t`).
///
/// Offsets on 64-bit hosts: cookie 0, version 4, float cookie 16 (the
/// `double` is 8-byte aligned), counts 24/32, pdp step 40, params 48..128.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatHead {
    pub version: u8,
    pub ds_cnt: usize,
    pub rra_cnt: usize,
    /// Base step in seconds.
    pub pdp_step: u64,
}

impl StatHead {
    /// Decode the head from the front of `buf`. Counts are bounded by `file_len`.
    pub fn parse(buf: &mut Bytes, file_len: usize) -> Result<Self, FetchError> {
        need(buf, STAT_HEAD_SIZE, "static header")?;
        let cookie = buf.copy_to_bytes(4);
        if cookie.as_ref() != COOKIE {
            return Err(corrupt("bad file cookie"));
        }
        let version_raw = buf.copy_to_bytes(5);
        let version = match version_raw.as_ref() {
            b"0001\0" => 1,
            b"0002\0" => 2,
            b"0003\0" => 3,
            b"0004\0" => 4,
            _ => return Err(corrupt("unsupported file version")),
        };
        buf.advance(STAT_HEAD_PAD);
        if buf.get_f64_le() != FLOAT_COOKIE {
            return Err(corrupt("float cookie mismatch (foreign architecture?)"));
        }
        let ds_cnt = take_count(buf, DS_DEF_SIZE, file_len, "ds_cnt")?;
        let rra_cnt = take_count(buf, RRA_DEF_SIZE, file_len, "rra_cnt")?;
        let pdp_step = buf.get_u64_le();
        if pdp_step == 0 {
            return Err(corrupt("pdp_step is zero"));
        }
        buf.advance(PAR_SIZE);
        Ok(Self { version, ds_cnt, rra_cnt, pdp_step })
    }

    /// Offset just past the last data source definition.
    pub fn ds_defs_end(&self) -> usize {
        STAT_HEAD_SIZE + self.ds_cnt * DS_DEF_SIZE
    }
}

fn take_ds_defs(buf: &mut Bytes, ds_cnt: usize) -> Result<Vec<String>, FetchError> {
    need(buf, ds_cnt * DS_DEF_SIZE, "data source definitions")?;
    let mut names = Vec::with_capacity(ds_cnt);
    for _ in 0..ds_cnt {
        names.push(take_name(buf, NAME_SIZE));
        buf.advance(NAME_SIZE + PAR_SIZE);
    }
    Ok(names)
}

/// Data source names from the leading bytes of a file.
///
/// `head` must hold at least [`StatHead::ds_defs_end`] bytes; the rest of the
/// file is not needed.
pub fn data_source_names(head: Bytes, file_len: usize) -> Result<Vec<String>, FetchError> {
    let mut buf = head;
    let stat = StatHead::parse(&mut buf, file_len)?;
    take_ds_defs(&mut buf, stat.ds_cnt)
}

impl RrdFile {
    /// Decode header and locate the data block.
    pub fn parse(bytes: Bytes) -> Result<Self, FetchError> {
        let total_len = bytes.len();
        let mut buf = bytes.clone();

        let StatHead { version, ds_cnt, rra_cnt, pdp_step } = StatHead::parse(&mut buf, total_len)?;
        let data_sources = take_ds_defs(&mut buf, ds_cnt)?;

        need(&buf, rra_cnt * RRA_DEF_SIZE, "archive definitions")?;
        let mut defs = Vec::with_capacity(rra_cnt);
        for _ in 0..rra_cnt {
            let cf = take_name(&mut buf, NAME_SIZE);
            buf.advance(4);
            let rows = buf.get_u64_le();
            let pdp_per_row = buf.get_u64_le();
            buf.advance(PAR_SIZE);
            if rows == 0 || pdp_per_row == 0 {
                return Err(corrupt(format!("archive {cf} has zero rows or pdp count")));
            }
            defs.push((cf, rows, pdp_per_row));
        }

        let live_head = if version >= 3 { 16 } else { 8 };
        need(&buf, live_head, "live header")?;
        let last_up = buf.get_i64_le();
        buf.advance(live_head - 8);

        let prep = ds_cnt
            .checked_mul(PDP_PREP_SIZE)
            .and_then(|p| rra_cnt.checked_mul(ds_cnt)?.checked_mul(CDP_PREP_SIZE)?.checked_add(p))
            .ok_or_else(|| corrupt("prep area overflow"))?;
        need(&buf, prep, "prep area")?;
        buf.advance(prep);

        need(&buf, rra_cnt * RRA_PTR_SIZE, "archive pointers")?;
        let mut offset = total_len - buf.remaining() + rra_cnt * RRA_PTR_SIZE;
        let mut archives = Vec::with_capacity(rra_cnt);
        for (cf, rows, pdp_per_row) in defs {
            let cur_row = buf.get_u64_le();
            if cur_row >= rows {
                return Err(corrupt(format!("archive {cf} row pointer out of range")));
            }
            let size = usize::try_from(rows)
                .ok()
                .and_then(|r| r.checked_mul(ds_cnt)?.checked_mul(8))
                .ok_or_else(|| corrupt("archive size overflow"))?;
            archives.push(ArchiveDef { cf, rows, pdp_per_row, cur_row, data_offset: offset });
            offset = offset.checked_add(size).ok_or_else(|| corrupt("archive size overflow"))?;
        }
        if offset > total_len {
            return Err(corrupt("truncated data block"));
        }

        Ok(Self { version, pdp_step, last_up, data_sources, archives, data: bytes })
    }

    pub fn ds_index(&self, name: &str) -> Option<usize> {
        self.data_sources.iter().position(|d| d == name)
    }

    /// Native step of an archive in seconds.
    pub fn archive_step(&self, a: &ArchiveDef) -> u64 {
        a.pdp_per_row.saturating_mul(self.pdp_step)
    }

    fn step_secs(&self, a: &ArchiveDef) -> i64 {
        i64::try_from(self.archive_step(a)).unwrap_or(i64::MAX)
    }

    /// End timestamp (epoch seconds) of the newest row of an archive.
    fn newest_row(&self, a: &ArchiveDef) -> i64 {
        let step = self.step_secs(a);
        self.last_up - self.last_up.rem_euclid(step)
    }

    /// Earliest instant (epoch seconds) an archive still has data for.
    fn oldest_covered(&self, a: &ArchiveDef) -> i64 {
        let step = self.step_secs(a);
        self.newest_row(a).saturating_sub((a.rows as i64).saturating_mul(step))
    }

    /// Pick the archive to read for `range` at `requested_step_ms`.
    ///
    /// Among `AVERAGE` archives covering `range.from`: the coarsest one whose
    /// step is not larger than requested, else the finest. With no archive
    /// covering the start, the one reaching furthest back.
    pub fn select_archive(&self, range: TimeRange, requested_step_ms: i64) -> Option<&ArchiveDef> {
        let from_secs = range.from().div_euclid(1000);
        let avg: Vec<&ArchiveDef> = self.archives.iter().filter(|a| a.cf == "AVERAGE").collect();

        let covering: Vec<&ArchiveDef> = avg
            .iter()
            .copied()
            .filter(|a| self.oldest_covered(a) <= from_secs)
            .collect();

        if covering.is_empty() {
            return avg.into_iter().min_by_key(|a| self.oldest_covered(a));
        }

        let fine_enough = covering
            .iter()
            .copied()
            .filter(|a| self.step_secs(a).saturating_mul(1000) <= requested_step_ms)
            .max_by_key(|a| self.archive_step(a));

        fine_enough.or_else(|| covering.into_iter().min_by_key(|a| self.archive_step(a)))
    }

    /// Rows of one data source in chronological order, clipped to `range`.
    ///
    /// Each row is stamped with the end of its consolidation interval (ms).
    pub fn read_rows(&self, a: &ArchiveDef, ds: usize, range: TimeRange) -> Result<Series, FetchError> {
        let ds_cnt = self.data_sources.len();
        if ds >= ds_cnt {
            return Err(corrupt("data source index out of range"));
        }
        let step = self.step_secs(a);
        let newest = self.newest_row(a);
        let rows = a.rows as i64;

        let mut out = Vec::new();
        for i in 0..rows {
            let ts_ms = newest.saturating_sub((rows - 1 - i).saturating_mul(step)).saturating_mul(1000);
            if !range.contains(ts_ms) {
                continue;
            }
            let phys = (a.cur_row as i64 + 1 + i) % rows;
            let at = a.data_offset + (phys as usize * ds_cnt + ds) * 8;
            let cell: [u8; 8] = self
                .data
                .get(at..at + 8)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| corrupt("data cell outside file"))?;
            out.push(Sample::from_raw(ts_ms, f64::from_le_bytes(cell)));
        }
        Ok(out)
    }
}

/// Test-only builder producing a version 0003 image.
#[cfg(test)]
pub(crate) mod image {
    use bytes::{BufMut, BytesMut};

    pub struct Rra {
        pub cf: &'static str,
        pub pdp_per_row: u64,
        pub cur_row: u64,
        /// `rows[physical_row][ds]`.
        pub rows: Vec<Vec<f64>>,
    }

    fn put_name(b: &mut BytesMut, name: &str, size: usize) {
        let bytes = name.as_bytes();
        b.put_slice(bytes);
        b.put_bytes(0, size - bytes.len());
    }

    pub fn build(pdp_step: u64, last_up: i64, ds: &[&str], rras: &[Rra]) -> Vec<u8> {
        let mut b = BytesMut::new();
        b.put_slice(b"RRD\0");
        b.put_slice(b"0003\0");
        b.put_bytes(0, 7);
        b.put_f64_le(super::FLOAT_COOKIE);
        b.put_u64_le(ds.len() as u64);
        b.put_u64_le(rras.len() as u64);
        b.put_u64_le(pdp_step);
        b.put_bytes(0, 80);
        for name in ds {
            put_name(&mut b, name, 20);
            put_name(&mut b, "GAUGE", 20);
            b.put_bytes(0, 80);
        }
        for r in rras {
            put_name(&mut b, r.cf, 20);
            b.put_bytes(0, 4);
            b.put_u64_le(r.rows.len() as u64);
            b.put_u64_le(r.pdp_per_row);
            b.put_bytes(0, 80);
        }
        b.put_i64_le(last_up);
        b.put_i64_le(0);
        b.put_bytes(0, super::PDP_PREP_SIZE * ds.len());
        b.put_bytes(0, super::CDP_PREP_SIZE * ds.len() * rras.len());
        for r in rras {
            b.put_u64_le(r.cur_row);
        }
        for r in rras {
            for row in &r.rows {
                for v in row {
                    b.put_f64_le(*v);
                }
            }
        }
        b.to_vec()
    }
}
