use crate::dataset::element::{Element, ElementType};
use crate::errors::{CoordinationError, Result};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};

const CONTAINER_MAGIC: &[u8] = b"SEDCONT\x00\x00";
const CONTAINER_VERSION: [u8; 8] = [1, 0, 0, 0, 0, 0, 0, 0];
const SUPERBLOCK_LEN: usize = 17;
const PAYLOAD_ALIGN: usize = 8;

struct DatasetRecord {
    name: String,
    element_type: ElementType,
    extent: u64,
    payload_start: usize,
    payload_len: usize,
}

/// Sequential, single-process view of a sealed container file.
///
/// Maps the file once and walks the dataset records up front; payloads are
/// handed out as typed copies on demand.
pub struct ContainerReader {
    path: PathBuf,
    mmap: Mmap,
    records: Vec<DatasetRecord>,
}

impl ContainerReader {
    pub fn open(path: impl AsRef<Path>) -> Result<ContainerReader> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        if file.metadata()?.len() < SUPERBLOCK_LEN as u64 {
            return Err(invalid(&path, "truncated superblock"));
        }
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        if &mmap[..CONTAINER_MAGIC.len()] != CONTAINER_MAGIC {
            return Err(invalid(&path, "magic header mismatch"));
        }
        if mmap[CONTAINER_MAGIC.len()..SUPERBLOCK_LEN] != CONTAINER_VERSION {
            return Err(invalid(&path, "unsupported container version"));
        }

        let bytes: &[u8] = &mmap;
        let mut records = Vec::new();
        let mut cursor = SUPERBLOCK_LEN;
        while cursor < bytes.len() {
            let code = bytes[cursor];
            let element_type = ElementType::from_code(code)
                .ok_or_else(|| invalid(&path, &format!("unknown element type code {}", code)))?;
            let name_len_bytes = bytes
                .get(cursor + 1..cursor + 3)
                .ok_or_else(|| invalid(&path, "truncated record header"))?;
            let name_len = u16::from_le_bytes([name_len_bytes[0], name_len_bytes[1]]) as usize;
            let name_bytes = bytes
                .get(cursor + 3..cursor + 3 + name_len)
                .ok_or_else(|| invalid(&path, "truncated dataset name"))?;
            let name = std::str::from_utf8(name_bytes)
                .map_err(|_| invalid(&path, "dataset name is not UTF-8"))?
                .to_string();

            let extent_at = cursor + 3 + name_len;
            let extent_bytes = bytes
                .get(extent_at..extent_at + 8)
                .ok_or_else(|| invalid(&path, "truncated record header"))?;
            let mut extent_buf = [0u8; 8];
            extent_buf.copy_from_slice(extent_bytes);
            let extent = u64::from_le_bytes(extent_buf);

            let header_end = extent_at + 8;
            let payload_start = (header_end + PAYLOAD_ALIGN - 1) & !(PAYLOAD_ALIGN - 1);
            let payload_len_u64 = extent
                .checked_mul(element_type.width() as u64)
                .ok_or_else(|| invalid(&path, &format!("payload size overflows for '{}'", name)))?;
            let payload_len = usize::try_from(payload_len_u64).map_err(|_| {
                invalid(
                    &path,
                    &format!("payload of '{}' exceeds addressable memory", name),
                )
            })?;
            let payload_end = payload_start
                .checked_add(payload_len)
                .ok_or_else(|| invalid(&path, &format!("payload size overflows for '{}'", name)))?;
            if payload_end > bytes.len() {
                return Err(invalid(
                    &path,
                    &format!("dataset '{}' payload is truncated", name),
                ));
            }

            records.push(DatasetRecord {
                name,
                element_type,
                extent,
                payload_start,
                payload_len,
            });
            cursor = payload_end;
        }

        Ok(ContainerReader {
            path,
            mmap,
            records,
        })
    }

    /// Name, element type, and extent of every dataset, in file order.
    pub fn datasets(&self) -> impl Iterator<Item = (&str, ElementType, u64)> {
        self.records
            .iter()
            .map(|r| (r.name.as_str(), r.element_type, r.extent))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reads the full payload of the named dataset in storage order.
    pub fn read_dataset<T: Element>(&self, name: &str) -> Result<Vec<T>> {
        let record = self
            .records
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| invalid(&self.path, &format!("no dataset named '{}'", name)))?;
        if record.element_type != T::ELEMENT_TYPE {
            return Err(invalid(
                &self.path,
                &format!(
                    "dataset '{}' holds {:?} elements, not {:?}",
                    name,
                    record.element_type,
                    T::ELEMENT_TYPE
                ),
            ));
        }
        let bytes = &self.mmap[record.payload_start..record.payload_start + record.payload_len];
        let units = bytemuck::try_cast_slice::<u8, T>(bytes).map_err(|e| {
            invalid(
                &self.path,
                &format!("payload cast failed for dataset '{}': {:?}", name, e),
            )
        })?;
        Ok(units.to_vec())
    }
}

fn invalid(path: &Path, reason: &str) -> CoordinationError {
    CoordinationError::InvalidContainer {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
