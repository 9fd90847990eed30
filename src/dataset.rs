/*
 * ghharvest
 *
 * ghharvest is free software; you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation; either version 2 of the License, or
 * (at your option) any later version.
 *
 * ghharvest is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with ghharvest.  If not, see <http://www.gnu.org/licenses/>.
 *
 */

use std::fs;
use std::io::{BufWriter, Write};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use log::debug;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{HarvestError, HarvestResult};
use crate::github::parse_records;
use crate::pages::Record;

/// Dataset files stay readable by other users, like a plain write would leave them.
#[cfg(unix)]
const DATASET_MODE: u32 = 0o644;

/// Writes `records` to `destination` as a JSON array, replacing any previous file.
///
/// The data lands in a temporary file next to `destination` first, so a failed
/// write leaves the old file intact.
pub fn persist(records: &[Record], destination: &Path) -> HarvestResult<()> {
    debug!("Writing {} records to {}", records.len(), destination.display());
    write_atomically(destination, |out| {
        serde_json::to_writer_pretty(&mut *out, records)?;
        out.write_all(b"\n")
    })
}

/// Reads back a file written by `persist`.
pub fn load(path: &Path) -> HarvestResult<Vec<Record>> {
    let text = fs::read_to_string(path)?;
    parse_records(&text)
}

/// Writes one JSON document per line.
pub fn write_jsonl<T: Serialize>(items: &[T], destination: &Path) -> HarvestResult<()> {
    debug!("Writing {} lines to {}", items.len(), destination.display());
    write_atomically(destination, |out| {
        for item in items {
            serde_json::to_writer(&mut *out, item)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    })
}

fn write_atomically<F>(destination: &Path, write: F) -> HarvestResult<()>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> std::io::Result<()>,
{
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(&mut tmp);
        write(&mut out)?;
        out.flush()?;
    }
    #[cfg(unix)]
    tmp.as_file()
        .set_permissions(fs::Permissions::from_mode(DATASET_MODE))?;
    tmp.as_file().sync_all()?;
    tmp.persist(destination)
        .map_err(|e| HarvestError::Io(e.error))?;
    Ok(())
}
