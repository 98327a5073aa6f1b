//! Minimal reader for the FBX binary container format: node records with
//! typed property lists and nested children. Just enough structure to walk
//! the chunk tree and skip what the caller does not care about; array
//! payloads in particular are never decoded.

use {
    byteorder::{LittleEndian, ReadBytesExt as _},
    std::io::{Read, Seek, SeekFrom},
};

/// First bytes of every binary FBX file. ASCII FBX files start differently
/// and are not handled here.
pub const MAGIC: &[u8] = b"Kaydara FBX Binary";

/// Byte offset of the first node record: 21-byte magic, 2 unknown bytes,
/// u32 version.
pub const FIRST_NODE_OFFSET: u64 = 27;

#[derive(Debug, thiserror::Error)]
pub enum FbxError {
    #[error("{source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("unknown FBX property type {tag:#04x} at offset {offset}")]
    UnknownPropertyType { tag: u8, offset: u64 },

    #[error("unexpected FBX property type at offset {offset}")]
    UnexpectedProperty { offset: u64 },
}

/// One node record, read up to (not including) its property list.
#[derive(Clone, Debug)]
pub struct NodeHeader {
    /// Absolute offset of the first byte after this node's subtree.
    pub end_offset: u64,
    pub num_properties: u64,
    pub property_list_len: u64,
    pub name: String,
}

impl NodeHeader {
    /// A zeroed header terminates a run of sibling nodes.
    pub fn is_null(&self) -> bool {
        self.end_offset == 0
    }
}

#[derive(Clone, Debug)]
pub enum Property {
    I16(i16),
    Bool(bool),
    I32(i32),
    F32(f32),
    F64(f64),
    I64(i64),
    String(String),
    Raw(Vec<u8>),
    /// Typed array payload, skipped without decoding.
    Array,
}

impl Property {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::String(value) => Some(value),
            _ => None,
        }
    }

    /// Numeric widening, covering every scalar tag.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Property::I16(value) => Some(value.into()),
            Property::I32(value) => Some(value.into()),
            Property::I64(value) => Some(value as f64),
            Property::F32(value) => Some(value.into()),
            Property::F64(value) => Some(value),
            _ => None,
        }
    }
}

/// Checks the magic and returns the format version, or `None` if the stream
/// is not binary FBX at all (callers treat that as a no-op, not an error).
///
/// On success the stream is positioned at the first top-level node record.
pub fn read_header<R: Read>(read: &mut R) -> Result<Option<u32>, FbxError> {
    let mut magic = [0u8; 21];
    let mut filled = 0;
    while filled < magic.len() {
        match read.read(&mut magic[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    if filled < magic.len() || !magic.starts_with(MAGIC) {
        return Ok(None);
    }

    let mut unknown = [0u8; 2];
    read.read_exact(&mut unknown)?;
    let version = read.read_u32::<LittleEndian>()?;
    Ok(Some(version))
}

/// Reads a node record header. Versions 7500 and up store the three header
/// fields as u64; older versions as u32. The caller decides once, from the
/// file version, and threads the flag through every read.
pub fn read_node_header<R: Read>(
    read: &mut R,
    wide_offsets: bool,
) -> Result<NodeHeader, FbxError> {
    let (end_offset, num_properties, property_list_len) = if wide_offsets {
        (
            read.read_u64::<LittleEndian>()?,
            read.read_u64::<LittleEndian>()?,
            read.read_u64::<LittleEndian>()?,
        )
    } else {
        (
            read.read_u32::<LittleEndian>()?.into(),
            read.read_u32::<LittleEndian>()?.into(),
            read.read_u32::<LittleEndian>()?.into(),
        )
    };

    let name_len = read.read_u8()?;
    let mut name_bytes = vec![0u8; name_len as usize];
    read.read_exact(&mut name_bytes)?;
    let name = String::from_utf8_lossy(&name_bytes).into_owned();

    Ok(NodeHeader {
        end_offset,
        num_properties,
        property_list_len,
        name,
    })
}

/// Reads one property record: a single-byte type tag and its payload.
/// Array payloads are seeked over. Unknown tags are a hard error, as they
/// leave the stream position meaningless.
pub fn read_property<R: Read + Seek>(
    read: &mut R,
) -> Result<Property, FbxError> {
    let tag = read.read_u8()?;

    match tag {
        b'Y' => Ok(Property::I16(read.read_i16::<LittleEndian>()?)),
        b'C' => Ok(Property::Bool(read.read_u8()? != 0)),
        b'I' => Ok(Property::I32(read.read_i32::<LittleEndian>()?)),
        b'F' => Ok(Property::F32(read.read_f32::<LittleEndian>()?)),
        b'D' => Ok(Property::F64(read.read_f64::<LittleEndian>()?)),
        b'L' => Ok(Property::I64(read.read_i64::<LittleEndian>()?)),

        b'S' | b'R' => {
            let len = read.read_u32::<LittleEndian>()?;
            let mut bytes = vec![0u8; len as usize];
            read.read_exact(&mut bytes)?;
            if tag == b'S' {
                Ok(Property::String(
                    String::from_utf8_lossy(&bytes).into_owned(),
                ))
            } else {
                Ok(Property::Raw(bytes))
            }
        }

        b'f' | b'd' | b'l' | b'i' | b'b' => {
            let _array_len = read.read_u32::<LittleEndian>()?;
            let _encoding = read.read_u32::<LittleEndian>()?;
            let compressed_len = read.read_u32::<LittleEndian>()?;
            read.seek(SeekFrom::Current(compressed_len.into()))?;
            Ok(Property::Array)
        }

        tag => {
            let offset = read.seek(SeekFrom::Current(0))?.saturating_sub(1);
            Err(FbxError::UnknownPropertyType { tag, offset })
        }
    }
}
