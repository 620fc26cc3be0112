/// Registry value records and typed decoding of their data.
use std::fmt::Write as _;

/// Registry value types.
pub mod reg_types {
    pub const REG_NONE: u32 = 0;
    pub const REG_SZ: u32 = 1;
    pub const REG_EXPAND_SZ: u32 = 2;
    pub const REG_BINARY: u32 = 3;
    pub const REG_DWORD: u32 = 4;
    pub const REG_DWORD_BIG_ENDIAN: u32 = 5;
    pub const REG_LINK: u32 = 6;
    pub const REG_MULTI_SZ: u32 = 7;
    pub const REG_QWORD: u32 = 11;
}

use reg_types::*;

/// A single value read from a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegValue {
    /// Value name. Empty for the `(Default)` value.
    pub name: String,
    /// Raw `REG_*` type code.
    pub value_type: u32,
    /// Raw data bytes.
    pub data: Vec<u8>,
}

impl RegValue {
    /// Decode a `REG_SZ` / `REG_EXPAND_SZ` value.
    pub fn as_string(&self) -> Option<String> {
        match self.value_type {
            REG_SZ | REG_EXPAND_SZ | REG_LINK => Some(decode_utf16le(&self.data)),
            _ => None,
        }
    }

    /// Decode a `REG_MULTI_SZ` value into its component strings.
    pub fn as_multi_string(&self) -> Option<Vec<String>> {
        if self.value_type != REG_MULTI_SZ {
            return None;
        }
        let units: Vec<u16> = self
            .data
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Some(
            units
                .split(|&u| u == 0)
                .filter(|s| !s.is_empty())
                .map(String::from_utf16_lossy)
                .collect(),
        )
    }

    /// Decode a `REG_DWORD` (either byte order).
    pub fn as_u32(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(..4)?.try_into().ok()?;
        match self.value_type {
            REG_DWORD => Some(u32::from_le_bytes(bytes)),
            REG_DWORD_BIG_ENDIAN => Some(u32::from_be_bytes(bytes)),
            _ => None,
        }
    }

    /// Decode a `REG_QWORD`, widening DWORDs.
    pub fn as_u64(&self) -> Option<u64> {
        if self.value_type == REG_QWORD {
            let bytes: [u8; 8] = self.data.get(..8)?.try_into().ok()?;
            return Some(u64::from_le_bytes(bytes));
        }
        self.as_u32().map(u64::from)
    }

    /// Render the value for a human-readable report, whatever its type.
    pub fn display(&self) -> String {
        match self.value_type {
            REG_SZ | REG_EXPAND_SZ | REG_LINK => self.as_string().unwrap_or_default(),
            REG_MULTI_SZ => self.as_multi_string().unwrap_or_default().join(", "),
            REG_DWORD | REG_DWORD_BIG_ENDIAN | REG_QWORD => self
                .as_u64()
                .map(|v| v.to_string())
                .unwrap_or_else(|| hex(&self.data)),
            _ => hex(&self.data),
        }
    }
}

/// Decode a UTF-16LE string, stopping at the first NUL.
pub(crate) fn decode_utf16le(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

fn hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16(s: &str) -> Vec<u8> {
        s.encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(|u| u.to_le_bytes())
            .collect()
    }

    fn value(value_type: u32, data: Vec<u8>) -> RegValue {
        RegValue {
            name: "v".into(),
            value_type,
            data,
        }
    }

    #[test]
    fn string_value_stops_at_nul() {
        let mut data = utf16("Windows 7 Professional");
        data.extend_from_slice(&[b'x', 0]);
        assert_eq!(
            value(REG_SZ, data).as_string().as_deref(),
            Some("Windows 7 Professional")
        );
    }

    #[test]
    fn string_accessor_rejects_numeric_type() {
        assert_eq!(value(REG_DWORD, vec![1, 0, 0, 0]).as_string(), None);
    }

    #[test]
    fn dword_honours_byte_order() {
        assert_eq!(value(REG_DWORD, vec![1, 0, 0, 0]).as_u32(), Some(1));
        assert_eq!(value(REG_DWORD_BIG_ENDIAN, vec![0, 0, 0, 1]).as_u32(), Some(1));
    }

    #[test]
    fn short_dword_is_none_not_panic() {
        assert_eq!(value(REG_DWORD, vec![1, 0]).as_u32(), None);
    }

    #[test]
    fn multi_string_splits_on_nul() {
        let mut data = utf16("a");
        data.extend(utf16("bc"));
        data.extend_from_slice(&[0, 0]);
        assert_eq!(
            value(REG_MULTI_SZ, data).as_multi_string(),
            Some(vec!["a".to_string(), "bc".to_string()])
        );
    }

    #[test]
    fn display_falls_back_to_hex() {
        assert_eq!(value(REG_BINARY, vec![0xde, 0xad]).display(), "dead");
        assert_eq!(value(REG_QWORD, 7u64.to_le_bytes().to_vec()).display(), "7");
    }
}
