use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// What a recognised signature represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Usage {
    Filesystem,
    Other,
    #[default]
    Unknown,
}

impl Usage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Usage::Filesystem => "filesystem",
            Usage::Other => "other",
            Usage::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded identifying string taken from an on-disk structure.
///
/// On-disk formats do not promise valid text, so the raw bytes are kept and
/// only converted (lossily) for display.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VolumeField(Vec<u8>);

impl VolumeField {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Take a fixed-size on-disk buffer: cut at the first NUL, then drop
    /// trailing space padding.
    pub fn from_padded(raw: &[u8]) -> Self {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let mut bytes = raw[..end].to_vec();
        while matches!(bytes.last(), Some(b' ')) {
            bytes.pop();
        }
        Self(bytes)
    }

    /// Decode a UTF-16LE buffer, stopping at the first NUL code unit.
    pub fn from_utf16le(raw: &[u8]) -> Self {
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&unit| unit != 0)
            .collect();
        let text = String::from_utf16_lossy(&units);
        Self(text.trim_end_matches(' ').as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<&str> for VolumeField {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<String> for VolumeField {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl fmt::Display for VolumeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for VolumeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

/// Identifying metadata extracted by a successful signature probe.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub label: VolumeField,
    pub uuid: VolumeField,
    pub filesystem_type: VolumeField,
    pub type_version: VolumeField,
    pub usage: Usage,
}

impl VolumeInfo {
    pub fn new(filesystem_type: &str, usage: Usage) -> Self {
        Self {
            filesystem_type: VolumeField::from(filesystem_type),
            usage,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: VolumeField) -> Self {
        self.label = label;
        self
    }

    pub fn with_uuid(mut self, uuid: VolumeField) -> Self {
        self.uuid = uuid;
        self
    }

    pub fn with_version(mut self, version: impl Into<VolumeField>) -> Self {
        self.type_version = version.into();
        self
    }

    /// `(key, value)` pairs for every non-empty field, in report order.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let usage = self.usage.to_string();
        [
            ("label", self.label.to_string()),
            ("uuid", self.uuid.to_string()),
            ("usage", usage),
            ("type", self.filesystem_type.to_string()),
            ("type-version", self.type_version.to_string()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }
}
