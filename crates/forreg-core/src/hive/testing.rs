/// Synthetic hive builder for tests.
///
/// Produces a minimal but well-formed `regf` image: one base block, one
/// `hbin` region, `nk`/`vk` cells with `lf` subkey lists. Enough for the
/// reader and the built-in plugins, nothing more (no security cells, no
/// big-data values, no checksum).
use super::reader::{
    nk, vk, BASE_BLOCK_SIZE, FILE_NAME_LEN, FILE_NAME_OFFSET, HIVE_LENGTH_OFFSET, KEY_COMP_NAME,
    KEY_HIVE_ENTRY, LF_SIGNATURE, NK_SIGNATURE, NO_CELL, ROOT_CELL_OFFSET, VALUE_COMP_NAME,
    VK_SIGNATURE, DATA_RESIDENT,
};
use super::value::reg_types::{REG_DWORD, REG_SZ};
use std::path::Path;

const HBIN_HEADER_SIZE: usize = 32;
const HBIN_ALIGN: usize = 4096;

#[derive(Debug, Clone, Default)]
struct KeySpec {
    name: String,
    values: Vec<(String, u32, Vec<u8>)>,
    children: Vec<KeySpec>,
}

impl KeySpec {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Walk (creating as needed) to the key at `path`.
    fn descend(&mut self, path: &str) -> &mut KeySpec {
        let mut node = self;
        for component in path.split('\\').filter(|c| !c.is_empty()) {
            let pos = match node
                .children
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(component))
            {
                Some(pos) => pos,
                None => {
                    node.children.push(KeySpec::named(component));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[pos];
        }
        node
    }
}

/// Fluent builder for an in-memory hive image.
#[derive(Debug, Clone)]
pub struct HiveBuilder {
    root: KeySpec,
    embedded_name: String,
}

impl HiveBuilder {
    pub fn new(root_name: &str) -> Self {
        Self {
            root: KeySpec::named(root_name),
            embedded_name: String::new(),
        }
    }

    /// Set the file name recorded in the base block.
    pub fn embedded_name(mut self, name: &str) -> Self {
        self.embedded_name = name.to_string();
        self
    }

    /// Ensure the key at `path` exists.
    pub fn key(mut self, path: &str) -> Self {
        self.root.descend(path);
        self
    }

    /// Add a raw value under `path`.
    pub fn value(mut self, path: &str, name: &str, value_type: u32, data: Vec<u8>) -> Self {
        self.root
            .descend(path)
            .values
            .push((name.to_string(), value_type, data));
        self
    }

    /// Add a NUL-terminated UTF-16LE `REG_SZ` value.
    pub fn string_value(self, path: &str, name: &str, value: &str) -> Self {
        let data = value
            .encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(u16::to_le_bytes)
            .collect();
        self.value(path, name, REG_SZ, data)
    }

    /// Add a little-endian `REG_DWORD` value.
    pub fn dword_value(self, path: &str, name: &str, value: u32) -> Self {
        self.value(path, name, REG_DWORD, value.to_le_bytes().to_vec())
    }

    /// Serialise the hive.
    pub fn build(&self) -> Vec<u8> {
        // Hive data starts with the hbin header; cell offsets are relative
        // to the start of hive data.
        let mut cells = vec![0u8; HBIN_HEADER_SIZE];
        let root_cell = emit_key(&mut cells, &self.root, true);

        let hbin_len = cells.len().div_ceil(HBIN_ALIGN) * HBIN_ALIGN;
        // Trailing free cell so the hbin is fully accounted for.
        let free = hbin_len - cells.len();
        if free >= 4 {
            cells.extend_from_slice(&(free as i32).to_le_bytes());
        }
        cells.resize(hbin_len, 0);
        cells[0..4].copy_from_slice(b"hbin");
        cells[4..8].copy_from_slice(&0u32.to_le_bytes());
        cells[8..12].copy_from_slice(&(hbin_len as u32).to_le_bytes());

        let mut base = vec![0u8; BASE_BLOCK_SIZE];
        base[0..4].copy_from_slice(b"regf");
        base[4..8].copy_from_slice(&1u32.to_le_bytes());
        base[8..12].copy_from_slice(&1u32.to_le_bytes());
        base[0x14..0x18].copy_from_slice(&1u32.to_le_bytes());
        base[0x18..0x1c].copy_from_slice(&5u32.to_le_bytes());
        base[ROOT_CELL_OFFSET..ROOT_CELL_OFFSET + 4].copy_from_slice(&root_cell.to_le_bytes());
        base[HIVE_LENGTH_OFFSET..HIVE_LENGTH_OFFSET + 4]
            .copy_from_slice(&(hbin_len as u32).to_le_bytes());
        let name: Vec<u8> = self
            .embedded_name
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .take(FILE_NAME_LEN - 2)
            .collect();
        base[FILE_NAME_OFFSET..FILE_NAME_OFFSET + name.len()].copy_from_slice(&name);

        base.extend_from_slice(&cells);
        base
    }

    /// Serialise the hive to `path`.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.build())
    }
}

/// Append an allocated cell holding `payload`, returning its offset.
fn alloc_cell(cells: &mut Vec<u8>, payload: &[u8]) -> u32 {
    let offset = cells.len() as u32;
    let size = (4 + payload.len()).div_ceil(8) * 8;
    cells.extend_from_slice(&(-(size as i32)).to_le_bytes());
    cells.extend_from_slice(payload);
    cells.resize(offset as usize + size, 0);
    offset
}

fn put_u16(buf: &mut [u8], at: usize, v: u16) {
    buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

/// Emit a key and everything below it (children first), returning the
/// offset of its `nk` cell.
fn emit_key(cells: &mut Vec<u8>, key: &KeySpec, is_root: bool) -> u32 {
    let child_offsets: Vec<u32> = key
        .children
        .iter()
        .map(|child| emit_key(cells, child, false))
        .collect();

    let value_offsets: Vec<u32> = key
        .values
        .iter()
        .map(|(name, value_type, data)| emit_value(cells, name, *value_type, data))
        .collect();

    let subkey_list = if child_offsets.is_empty() {
        NO_CELL
    } else {
        let mut list = Vec::with_capacity(4 + child_offsets.len() * 8);
        list.extend_from_slice(LF_SIGNATURE);
        list.extend_from_slice(&(child_offsets.len() as u16).to_le_bytes());
        for (off, child) in child_offsets.iter().zip(&key.children) {
            list.extend_from_slice(&off.to_le_bytes());
            let mut hint = [0u8; 4];
            for (h, b) in hint.iter_mut().zip(child.name.bytes()) {
                *h = b;
            }
            list.extend_from_slice(&hint);
        }
        alloc_cell(cells, &list)
    };

    let value_list = if value_offsets.is_empty() {
        NO_CELL
    } else {
        let list: Vec<u8> = value_offsets.iter().flat_map(|o| o.to_le_bytes()).collect();
        alloc_cell(cells, &list)
    };

    let name = key.name.as_bytes();
    let mut nk_rec = vec![0u8; nk::NAME_START + name.len()];
    nk_rec[0..2].copy_from_slice(NK_SIGNATURE);
    let flags = KEY_COMP_NAME | if is_root { KEY_HIVE_ENTRY } else { 0 };
    put_u16(&mut nk_rec, nk::FLAGS, flags);
    put_u32(&mut nk_rec, nk::SUBKEY_COUNT, child_offsets.len() as u32);
    put_u32(&mut nk_rec, nk::SUBKEY_LIST, subkey_list);
    put_u32(&mut nk_rec, nk::VALUE_COUNT, value_offsets.len() as u32);
    put_u32(&mut nk_rec, nk::VALUE_LIST, value_list);
    put_u32(&mut nk_rec, nk::CLASS_NAME_OFFSET, NO_CELL);
    put_u16(&mut nk_rec, nk::NAME_LENGTH, name.len() as u16);
    nk_rec[nk::NAME_START..].copy_from_slice(name);
    alloc_cell(cells, &nk_rec)
}

fn emit_value(cells: &mut Vec<u8>, name: &str, value_type: u32, data: &[u8]) -> u32 {
    let (length_field, offset_field) = if data.len() <= 4 {
        let mut inline = [0u8; 4];
        inline[..data.len()].copy_from_slice(data);
        (data.len() as u32 | DATA_RESIDENT, u32::from_le_bytes(inline))
    } else {
        (data.len() as u32, alloc_cell(cells, data))
    };

    let name = name.as_bytes();
    let mut vk_rec = vec![0u8; vk::NAME_START + name.len()];
    vk_rec[0..2].copy_from_slice(VK_SIGNATURE);
    put_u16(&mut vk_rec, vk::NAME_LENGTH, name.len() as u16);
    put_u32(&mut vk_rec, vk::DATA_LENGTH, length_field);
    put_u32(&mut vk_rec, vk::DATA_OFFSET, offset_field);
    put_u32(&mut vk_rec, vk::TYPE, value_type);
    put_u16(&mut vk_rec, vk::FLAGS, VALUE_COMP_NAME);
    vk_rec[vk::NAME_START..].copy_from_slice(name);
    alloc_cell(cells, &vk_rec)
}
