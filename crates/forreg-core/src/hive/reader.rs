/// Read-only `regf` hive reader over an in-memory copy of the file.
///
/// ```text
/// +0x0000  base block (4096 bytes)
///   +0x00  "regf"
///   +0x24  root cell offset (u32, relative to hive data)
///   +0x28  hive data length (u32)
///   +0x30  embedded file name (UTF-16LE, 64 bytes)
/// +0x1000  hive data: "hbin" blocks holding cells
///   cell = |size: i32 (negative when allocated)|signature: 2 bytes|...
/// ```
///
/// Every read is bounds-checked against the buffer; malformed offsets turn
/// into [`HiveError::Structure`] rather than panics, since hives handed to a
/// forensic tool are routinely damaged.
use super::error::HiveError;
use super::value::{decode_utf16le, RegValue};
use std::fmt;
use std::path::Path;
use tracing::debug;

// ── Layout constants ─────────────────────────────────────────────────

const REGF_SIGNATURE: &[u8; 4] = b"regf";
const HBIN_SIGNATURE: &[u8; 4] = b"hbin";

pub(crate) const BASE_BLOCK_SIZE: usize = 4096;
pub(crate) const ROOT_CELL_OFFSET: usize = 0x24;
pub(crate) const HIVE_LENGTH_OFFSET: usize = 0x28;
pub(crate) const FILE_NAME_OFFSET: usize = 0x30;
pub(crate) const FILE_NAME_LEN: usize = 64;

pub(crate) const NK_SIGNATURE: &[u8; 2] = b"nk";
pub(crate) const VK_SIGNATURE: &[u8; 2] = b"vk";
pub(crate) const LF_SIGNATURE: &[u8; 2] = b"lf";
pub(crate) const LH_SIGNATURE: &[u8; 2] = b"lh";
pub(crate) const LI_SIGNATURE: &[u8; 2] = b"li";
pub(crate) const RI_SIGNATURE: &[u8; 2] = b"ri";

/// Offsets inside an `nk` record, relative to its signature.
pub(crate) mod nk {
    pub const FLAGS: usize = 2;
    pub const SUBKEY_COUNT: usize = 20;
    pub const SUBKEY_LIST: usize = 28;
    pub const VALUE_COUNT: usize = 36;
    pub const VALUE_LIST: usize = 40;
    pub const CLASS_NAME_OFFSET: usize = 48;
    pub const NAME_LENGTH: usize = 72;
    pub const NAME_START: usize = 76;
}

/// Offsets inside a `vk` record, relative to its signature.
pub(crate) mod vk {
    pub const NAME_LENGTH: usize = 2;
    pub const DATA_LENGTH: usize = 4;
    pub const DATA_OFFSET: usize = 8;
    pub const TYPE: usize = 12;
    pub const FLAGS: usize = 16;
    pub const NAME_START: usize = 20;
}

pub(crate) const KEY_HIVE_ENTRY: u16 = 0x0004;
pub(crate) const KEY_COMP_NAME: u16 = 0x0020;
pub(crate) const VALUE_COMP_NAME: u16 = 0x0001;
pub(crate) const DATA_RESIDENT: u32 = 0x8000_0000;
pub(crate) const NO_CELL: u32 = 0xFFFF_FFFF;

// ── Hive ─────────────────────────────────────────────────────────────

/// A parsed registry hive. This is the opaque handle stored in a loaded
/// artifact record and handed to plugins.
pub struct Hive {
    data: Vec<u8>,
    root_cell: u32,
    embedded_name: String,
}

impl fmt::Debug for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hive")
            .field("embedded_name", &self.embedded_name)
            .field("len", &self.data.len())
            .field("root_cell", &format_args!("{:#x}", self.root_cell))
            .finish()
    }
}

impl Hive {
    /// Read and validate the hive file at `path`.
    pub fn open(path: &Path) -> Result<Self, HiveError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Validate an in-memory hive image.
    ///
    /// Anything shorter than the signature is [`HiveError::Truncated`]; any
    /// other layout problem is [`HiveError::Structure`].
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, HiveError> {
        if data.len() < REGF_SIGNATURE.len() {
            return Err(HiveError::Truncated { len: data.len() });
        }
        if &data[..4] != REGF_SIGNATURE {
            return Err(HiveError::structure("missing 'regf' signature"));
        }
        if data.len() < BASE_BLOCK_SIZE + HBIN_SIGNATURE.len() {
            return Err(HiveError::structure(format!(
                "base block truncated ({} bytes)",
                data.len()
            )));
        }
        if &data[BASE_BLOCK_SIZE..BASE_BLOCK_SIZE + 4] != HBIN_SIGNATURE {
            return Err(HiveError::structure("no 'hbin' block after base block"));
        }

        let root_cell = read_u32(&data, ROOT_CELL_OFFSET)?;
        let hive_length = read_u32(&data, HIVE_LENGTH_OFFSET)?;
        if root_cell >= hive_length {
            return Err(HiveError::structure(format!(
                "root cell {root_cell:#x} outside hive data length {hive_length:#x}"
            )));
        }

        let embedded_name = decode_utf16le(
            &data[FILE_NAME_OFFSET..FILE_NAME_OFFSET + FILE_NAME_LEN],
        );

        let hive = Self {
            data,
            root_cell,
            embedded_name,
        };
        // The root must be a key node; otherwise nothing is navigable.
        hive.read_key(root_cell)?;
        Ok(hive)
    }

    /// File name recorded in the base block (often a `\??\C:\...` path).
    pub fn embedded_name(&self) -> &str {
        &self.embedded_name
    }

    /// Size of the hive image in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The hive's root key.
    pub fn root_key(&self) -> Result<Key<'_>, HiveError> {
        self.read_key(self.root_cell)
    }

    /// Navigate from the root along a backslash-separated path such as
    /// `Microsoft\Windows NT\CurrentVersion`. Components match
    /// case-insensitively; empty components are ignored.
    pub fn open_key(&self, path: &str) -> Result<Key<'_>, HiveError> {
        let mut current = self.root_key()?;
        for component in path.split('\\').filter(|c| !c.is_empty()) {
            current = current
                .subkey(component)
                .map_err(|e| match e {
                    HiveError::KeyNotFound(_) => HiveError::KeyNotFound(path.to_string()),
                    other => other,
                })?;
        }
        Ok(current)
    }

    // ── Cell access ──────────────────────────────────────────────────

    /// Borrow `len` bytes starting `at` bytes into the cell at `cell`.
    fn cell_bytes(&self, cell: u32, at: usize, len: usize) -> Result<&[u8], HiveError> {
        let start = BASE_BLOCK_SIZE
            .checked_add(cell as usize)
            .and_then(|s| s.checked_add(at));
        let end = start.and_then(|s| s.checked_add(len));
        match (start, end) {
            (Some(start), Some(end)) if end <= self.data.len() => Ok(&self.data[start..end]),
            _ => Err(HiveError::structure(format!(
                "read of {len} bytes at cell {cell:#x}+{at} runs past end of hive"
            ))),
        }
    }

    fn cell_u16(&self, cell: u32, at: usize) -> Result<u16, HiveError> {
        let b = self.cell_bytes(cell, at, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn cell_u32(&self, cell: u32, at: usize) -> Result<u32, HiveError> {
        let b = self.cell_bytes(cell, at, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Usable payload size of a cell (absolute size minus the size field).
    fn cell_payload_len(&self, cell: u32) -> Result<usize, HiveError> {
        let raw = self.cell_u32(cell, 0)? as i32;
        Ok((raw.unsigned_abs() as usize).saturating_sub(4))
    }

    fn expect_signature(&self, cell: u32, sig: &[u8; 2]) -> Result<(), HiveError> {
        let found = self.cell_bytes(cell, 4, 2)?;
        if found != sig {
            return Err(HiveError::structure(format!(
                "expected '{}' record at {cell:#x}, found {:02x?}",
                String::from_utf8_lossy(sig),
                found
            )));
        }
        Ok(())
    }

    fn read_key(&self, cell: u32) -> Result<Key<'_>, HiveError> {
        self.expect_signature(cell, NK_SIGNATURE)?;
        // nk fields are addressed relative to the signature, 4 bytes into the cell.
        let field = |off: usize| 4 + off;

        let flags = self.cell_u16(cell, field(nk::FLAGS))?;
        let subkey_count = self.cell_u32(cell, field(nk::SUBKEY_COUNT))?;
        let subkey_list = self.cell_u32(cell, field(nk::SUBKEY_LIST))?;
        let value_count = self.cell_u32(cell, field(nk::VALUE_COUNT))?;
        let value_list = self.cell_u32(cell, field(nk::VALUE_LIST))?;
        let name_len = self.cell_u16(cell, field(nk::NAME_LENGTH))? as usize;
        let raw_name = self.cell_bytes(cell, field(nk::NAME_START), name_len)?;
        let name = decode_name(raw_name, flags & KEY_COMP_NAME != 0);

        Ok(Key {
            hive: self,
            cell,
            name,
            flags,
            subkey_count,
            subkey_list,
            value_count,
            value_list,
        })
    }

    /// Resolve a subkey list (`lf`/`lh`/`li`, or an `ri` of those) into
    /// child `nk` cell offsets.
    fn subkey_offsets(&self, list: u32, nested: bool) -> Result<Vec<u32>, HiveError> {
        let sig = self.cell_bytes(list, 4, 2)?;
        let count = self.cell_u16(list, 6)? as usize;
        let entry_size = match sig {
            s if s == LF_SIGNATURE || s == LH_SIGNATURE => 8,
            s if s == LI_SIGNATURE || s == RI_SIGNATURE => 4,
            other => {
                return Err(HiveError::structure(format!(
                    "unknown subkey list signature {other:02x?} at {list:#x}"
                )))
            }
        };
        let is_index_root = sig == RI_SIGNATURE;
        if is_index_root && nested {
            return Err(HiveError::structure(format!(
                "nested index root at {list:#x}"
            )));
        }

        let mut offsets = Vec::with_capacity(count);
        for i in 0..count {
            let entry = self.cell_u32(list, 8 + i * entry_size)?;
            if is_index_root {
                match self.subkey_offsets(entry, true) {
                    Ok(sub) => offsets.extend(sub),
                    Err(e) => debug!("hive: skipping bad ri sub-list at {entry:#x}: {e}"),
                }
            } else {
                offsets.push(entry);
            }
        }
        Ok(offsets)
    }

    fn read_value(&self, cell: u32) -> Result<RegValue, HiveError> {
        self.expect_signature(cell, VK_SIGNATURE)?;
        let field = |off: usize| 4 + off;

        let name_len = self.cell_u16(cell, field(vk::NAME_LENGTH))? as usize;
        let raw_len = self.cell_u32(cell, field(vk::DATA_LENGTH))?;
        let data_offset = self.cell_u32(cell, field(vk::DATA_OFFSET))?;
        let value_type = self.cell_u32(cell, field(vk::TYPE))?;
        let flags = self.cell_u16(cell, field(vk::FLAGS))?;
        let raw_name = self.cell_bytes(cell, field(vk::NAME_START), name_len)?;
        let name = decode_name(raw_name, flags & VALUE_COMP_NAME != 0);

        let data_len = (raw_len & !DATA_RESIDENT) as usize;
        let data = if data_len == 0 {
            Vec::new()
        } else if raw_len & DATA_RESIDENT != 0 {
            // Up to four bytes stored in the offset field itself.
            data_offset.to_le_bytes()[..data_len.min(4)].to_vec()
        } else {
            let available = self.cell_payload_len(data_offset)?;
            let len = data_len.min(available);
            self.cell_bytes(data_offset, 4, len)?.to_vec()
        };

        Ok(RegValue {
            name,
            value_type,
            data,
        })
    }
}

// ── Key ──────────────────────────────────────────────────────────────

/// A key node borrowed from its [`Hive`].
#[derive(Clone)]
pub struct Key<'a> {
    hive: &'a Hive,
    cell: u32,
    name: String,
    flags: u16,
    subkey_count: u32,
    subkey_list: u32,
    value_count: u32,
    value_list: u32,
}

impl fmt::Debug for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("name", &self.name)
            .field("cell", &format_args!("{:#x}", self.cell))
            .field("subkeys", &self.subkey_count)
            .field("values", &self.value_count)
            .finish()
    }
}

impl<'a> Key<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` for the hive's root key.
    pub fn is_root(&self) -> bool {
        self.flags & KEY_HIVE_ENTRY != 0
    }

    pub fn subkey_count(&self) -> u32 {
        self.subkey_count
    }

    pub fn value_count(&self) -> u32 {
        self.value_count
    }

    /// Child keys. Individual unreadable children are skipped.
    pub fn subkeys(&self) -> Result<Vec<Key<'a>>, HiveError> {
        if self.subkey_count == 0 || self.subkey_list == NO_CELL {
            return Ok(Vec::new());
        }
        let offsets = self.hive.subkey_offsets(self.subkey_list, false)?;
        let mut keys = Vec::with_capacity(offsets.len());
        for off in offsets {
            match self.hive.read_key(off) {
                Ok(k) => keys.push(k),
                Err(e) => debug!("hive: skipping bad subkey of '{}' at {off:#x}: {e}", self.name),
            }
        }
        Ok(keys)
    }

    /// Case-insensitive lookup of a direct child.
    pub fn subkey(&self, name: &str) -> Result<Key<'a>, HiveError> {
        self.subkeys()?
            .into_iter()
            .find(|k| k.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| HiveError::KeyNotFound(format!("{}\\{name}", self.name)))
    }

    /// Values of this key. Individual unreadable values are skipped.
    pub fn values(&self) -> Result<Vec<RegValue>, HiveError> {
        if self.value_count == 0 || self.value_list == NO_CELL {
            return Ok(Vec::new());
        }
        let mut values = Vec::with_capacity((self.value_count as usize).min(256));
        for i in 0..self.value_count as usize {
            let vk_cell = self.hive.cell_u32(self.value_list, 4 + i * 4)?;
            match self.hive.read_value(vk_cell) {
                Ok(v) => values.push(v),
                Err(e) => debug!("hive: skipping bad value of '{}' at {vk_cell:#x}: {e}", self.name),
            }
        }
        Ok(values)
    }

    /// Case-insensitive lookup of a named value.
    pub fn value(&self, name: &str) -> Result<RegValue, HiveError> {
        self.values()?
            .into_iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| HiveError::ValueNotFound {
                key: self.name.clone(),
                value: name.to_string(),
            })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn read_u32(data: &[u8], at: usize) -> Result<u32, HiveError> {
    data.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| HiveError::structure(format!("header field at {at:#x} out of range")))
}

/// Compressed names are Latin-1; others are UTF-16LE.
fn decode_name(raw: &[u8], compressed: bool) -> String {
    if compressed {
        raw.iter().map(|&b| b as char).collect()
    } else {
        decode_utf16le(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hive::testing::HiveBuilder;

    fn sample() -> Hive {
        let bytes = HiveBuilder::new("ROOT")
            .string_value("Microsoft\\Windows NT\\CurrentVersion", "ProductName", "Windows 7")
            .dword_value("Select", "Current", 1)
            .key("ControlSet001\\Control")
            .build();
        Hive::from_bytes(bytes).unwrap()
    }

    #[test]
    fn root_key_is_flagged_and_named() {
        let hive = sample();
        let root = hive.root_key().unwrap();
        assert_eq!(root.name(), "ROOT");
        assert!(root.is_root());
        assert_eq!(root.subkey_count(), 3);
    }

    #[test]
    fn open_key_is_case_insensitive() {
        let hive = sample();
        let key = hive.open_key("microsoft\\WINDOWS NT\\currentversion").unwrap();
        assert_eq!(key.name(), "CurrentVersion");
        let v = key.value("productname").unwrap();
        assert_eq!(v.as_string().as_deref(), Some("Windows 7"));
    }

    #[test]
    fn resident_dword_is_decoded() {
        let hive = sample();
        let v = hive.open_key("Select").unwrap().value("Current").unwrap();
        assert_eq!(v.as_u32(), Some(1));
    }

    #[test]
    fn missing_key_reports_full_path() {
        let hive = sample();
        match hive.open_key("Select\\Nope") {
            Err(HiveError::KeyNotFound(p)) => assert_eq!(p, "Select\\Nope"),
            other => panic!("expected KeyNotFound, got {other:?}"),
        }
    }

    #[test]
    fn missing_value_is_reported() {
        let hive = sample();
        let key = hive.open_key("Select").unwrap();
        assert!(matches!(
            key.value("Default"),
            Err(HiveError::ValueNotFound { .. })
        ));
    }

    #[test]
    fn empty_path_opens_root() {
        let hive = sample();
        assert!(hive.open_key("").unwrap().is_root());
    }

    #[test]
    fn tiny_input_is_truncated_not_structural() {
        for len in 0..4 {
            let err = Hive::from_bytes(vec![b'r'; len]).unwrap_err();
            assert!(matches!(err, HiveError::Truncated { .. }), "len {len}: {err:?}");
            assert!(!err.is_structural());
        }
    }

    #[test]
    fn wrong_signature_is_structural() {
        let err = Hive::from_bytes(vec![0u8; 8192]).unwrap_err();
        assert!(err.is_structural(), "{err:?}");
    }

    #[test]
    fn short_base_block_is_structural() {
        let mut data = b"regf".to_vec();
        data.resize(100, 0);
        assert!(Hive::from_bytes(data).unwrap_err().is_structural());
    }

    #[test]
    fn root_offset_past_end_is_structural() {
        let mut bytes = HiveBuilder::new("ROOT").build();
        bytes[ROOT_CELL_OFFSET..ROOT_CELL_OFFSET + 4].copy_from_slice(&0x7fff_0000u32.to_le_bytes());
        assert!(Hive::from_bytes(bytes).unwrap_err().is_structural());
    }

    #[test]
    fn corrupted_root_signature_is_structural() {
        let mut bytes = HiveBuilder::new("ROOT").build();
        let root = u32::from_le_bytes(
            bytes[ROOT_CELL_OFFSET..ROOT_CELL_OFFSET + 4].try_into().unwrap(),
        ) as usize;
        let sig = BASE_BLOCK_SIZE + root + 4;
        bytes[sig..sig + 2].copy_from_slice(b"zz");
        assert!(Hive::from_bytes(bytes).unwrap_err().is_structural());
    }

    #[test]
    fn garbage_after_header_never_panics() {
        let mut bytes = HiveBuilder::new("ROOT").key("A\\B").build();
        // Scribble over the hive data but keep the header and hbin signature.
        for b in bytes.iter_mut().skip(BASE_BLOCK_SIZE + 32) {
            *b = 0xff;
        }
        let _ = Hive::from_bytes(bytes).map(|h| h.open_key("A\\B").map(|k| k.values()));
    }

    #[test]
    fn embedded_name_is_exposed() {
        let bytes = HiveBuilder::new("ROOT").embedded_name("\\??\\C:\\Windows\\SYSTEM").build();
        let hive = Hive::from_bytes(bytes).unwrap();
        assert_eq!(hive.embedded_name(), "\\??\\C:\\Windows\\SYSTEM");
    }
}
