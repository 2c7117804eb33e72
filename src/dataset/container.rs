use crate::collective::{OpCode, RankContext};
use crate::dataset::element::{Element, ElementType};
use crate::errors::{CoordinationError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const CONTAINER_MAGIC: &[u8] = b"SEDCONT\x00\x00";
const CONTAINER_VERSION: [u8; 8] = [1, 0, 0, 0, 0, 0, 0, 0];
const SUPERBLOCK_LEN: u64 = 17;
const PAYLOAD_ALIGN: u64 = 8;

/// One worker's handle onto the group's shared container file.
///
/// Created collectively: rank 0 lays down the superblock, then every rank
/// opens its own descriptor onto the same path. The append position is
/// replicated deterministically on every rank instead of being shared, so
/// the handles agree on the layout without further communication.
pub struct SharedContainer {
    path: PathBuf,
    file: File,
    append_at: u64,
}

/// A named dataset bound inside a shared container.
///
/// The handle is a per-worker value; the dataset itself exists once in the
/// file. Region writes go through [`Dataset::write_region`].
pub struct Dataset {
    name: String,
    element_type: ElementType,
    extent: u64,
    payload_start: u64,
    file: File,
}

impl SharedContainer {
    /// Collectively creates (truncating) the container at `path`.
    ///
    /// Every group member must call this with the same path. A failure on
    /// any rank fails the whole group.
    pub async fn create(ctx: &RankContext, path: impl AsRef<Path>) -> Result<SharedContainer> {
        let path = path.as_ref().to_path_buf();
        let local = if ctx.rank() == 0 {
            write_superblock(&path)
        } else {
            Ok(())
        };
        // The superblock must exist before any rank opens its own handle.
        ctx.confirm(OpCode::ContainerCreate, local).await?;
        let file = ctx.confirm(OpCode::ContainerCreate, open_rw(&path)).await?;
        debug!(rank = ctx.rank(), path = %path.display(), "container ready");
        Ok(SharedContainer {
            path,
            file,
            append_at: SUPERBLOCK_LEN,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Collectively defines a named dataset of `extent` elements.
    ///
    /// Every group member must pass an identical descriptor; divergent
    /// arguments fail all workers with a
    /// [`CoordinationError::SyncViolation`]. Rank 0 appends the record
    /// header and preallocates the payload, and the outcome is agreed
    /// before any handle is returned.
    pub async fn define_dataset(
        &mut self,
        ctx: &RankContext,
        name: &str,
        element_type: ElementType,
        extent: u64,
    ) -> Result<Dataset> {
        let header = encode_record_header(name, element_type, extent)?;
        let rows = ctx.all_gather_bytes(OpCode::DatasetDefine, &header).await?;
        for (rank, row) in rows.iter().enumerate() {
            if row.as_slice() != header.as_slice() {
                return Err(CoordinationError::SyncViolation {
                    operation: OpCode::DatasetDefine.name().to_string(),
                    reason: format!(
                        "rank {} and rank {} passed different dataset descriptors",
                        ctx.rank(),
                        rank
                    ),
                });
            }
        }

        // Descriptors agree from here on, so every rank derives the same
        // record layout and, on overflow, the same error.
        let record_start = self.append_at;
        let header_end = record_start.checked_add(header.len() as u64).ok_or_else(|| {
            CoordinationError::SizeOverflow {
                context: format!("placing the record header for dataset '{}'", name),
            }
        })?;
        let payload_start = align_up(header_end, PAYLOAD_ALIGN).ok_or_else(|| {
            CoordinationError::SizeOverflow {
                context: format!("aligning the payload for dataset '{}'", name),
            }
        })?;
        let payload_len = extent
            .checked_mul(element_type.width() as u64)
            .ok_or_else(|| CoordinationError::SizeOverflow {
                context: format!("scaling {} elements of {:?} to bytes", extent, element_type),
            })?;
        let payload_end = payload_start.checked_add(payload_len).ok_or_else(|| {
            CoordinationError::SizeOverflow {
                context: format!("placing the payload for dataset '{}'", name),
            }
        })?;

        let local = self.define_local(ctx, &header, record_start, payload_end);
        let file = ctx.confirm(OpCode::DatasetDefine, local).await?;
        self.append_at = payload_end;
        debug!(rank = ctx.rank(), name, extent, "dataset defined");
        Ok(Dataset {
            name: name.to_string(),
            element_type,
            extent,
            payload_start,
            file,
        })
    }

    fn define_local(
        &self,
        ctx: &RankContext,
        header: &[u8],
        record_start: u64,
        payload_end: u64,
    ) -> Result<File> {
        if ctx.rank() == 0 {
            write_all_at(&self.file, header, record_start)?;
            // set_len zero-fills the alignment gap and the payload extent.
            self.file.set_len(payload_end)?;
        }
        Ok(self.file.try_clone()?)
    }

    /// Collectively seals the container: all pending writes are synchronized
    /// and rank 0 flushes the file to stable storage.
    pub async fn seal(self, ctx: &RankContext) -> Result<()> {
        ctx.all_gather_bytes(OpCode::ContainerSeal, &[]).await?;
        let local = if ctx.rank() == 0 {
            self.file.sync_all().map_err(CoordinationError::from)
        } else {
            Ok(())
        };
        ctx.confirm(OpCode::ContainerSeal, local).await
    }
}

impl Dataset {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Agreed extent of the dataset in elements.
    pub fn extent(&self) -> u64 {
        self.extent
    }

    /// Collectively writes this worker's buffer into its region.
    ///
    /// Every group member must call this once per round; a worker with a
    /// zero-width region still participates, it just places no bytes. On
    /// success the interval `[offset, offset + len)` holds `data` exactly
    /// and no byte outside it was touched by this worker.
    pub async fn write_region<T: Element>(
        &self,
        ctx: &RankContext,
        region: crate::partition::Region,
        data: &[T],
    ) -> Result<()> {
        ctx.all_gather_bytes(OpCode::RegionWrite, &[]).await?;
        let local = self.write_region_local(region, data);
        ctx.confirm(OpCode::RegionWrite, local).await
    }

    fn write_region_local<T: Element>(
        &self,
        region: crate::partition::Region,
        data: &[T],
    ) -> Result<()> {
        if T::ELEMENT_TYPE != self.element_type {
            return Err(CoordinationError::SyncViolation {
                operation: OpCode::RegionWrite.name().to_string(),
                reason: format!(
                    "buffer holds {:?} elements but dataset '{}' holds {:?}",
                    T::ELEMENT_TYPE,
                    self.name,
                    self.element_type
                ),
            });
        }
        if data.len() as u64 != region.len {
            return Err(CoordinationError::SyncViolation {
                operation: OpCode::RegionWrite.name().to_string(),
                reason: format!(
                    "buffer length {} does not match region length {}",
                    data.len(),
                    region.len
                ),
            });
        }
        let end = region.end().ok_or_else(|| CoordinationError::SizeOverflow {
            context: format!("placing region at offset {}", region.offset),
        })?;
        if end > self.extent {
            return Err(CoordinationError::SyncViolation {
                operation: OpCode::RegionWrite.name().to_string(),
                reason: format!(
                    "region [{}, {}) exceeds dataset extent {}",
                    region.offset, end, self.extent
                ),
            });
        }
        if region.is_empty() {
            return Ok(());
        }
        let byte_offset = region
            .offset
            .checked_mul(self.element_type.width() as u64)
            .and_then(|rel| self.payload_start.checked_add(rel))
            .ok_or_else(|| CoordinationError::SizeOverflow {
                context: format!("scaling region offset {} to bytes", region.offset),
            })?;
        write_all_at(&self.file, bytemuck::cast_slice(data), byte_offset)?;
        Ok(())
    }
}

fn write_superblock(path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(CONTAINER_MAGIC)?;
    writer.write_all(&CONTAINER_VERSION)?;
    writer.flush()?;
    Ok(())
}

fn open_rw(path: &Path) -> Result<File> {
    Ok(File::options().read(true).write(true).open(path)?)
}

fn encode_record_header(name: &str, element_type: ElementType, extent: u64) -> Result<Vec<u8>> {
    let name_bytes = name.as_bytes();
    if name_bytes.len() > u16::MAX as usize {
        return Err(CoordinationError::Config(format!(
            "dataset name of {} bytes exceeds the {} byte limit",
            name_bytes.len(),
            u16::MAX
        )));
    }
    let mut header = Vec::with_capacity(11 + name_bytes.len());
    header.push(element_type.code());
    header.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
    header.extend_from_slice(name_bytes);
    header.extend_from_slice(&extent.to_le_bytes());
    Ok(header)
}

fn align_up(value: u64, align: u64) -> Option<u64> {
    let mask = align - 1;
    value.checked_add(mask).map(|v| v & !mask)
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut buf = buf;
    let mut offset = offset;
    while !buf.is_empty() {
        let written = file.seek_write(buf, offset)?;
        buf = &buf[written..];
        offset += written as u64;
    }
    Ok(())
}
