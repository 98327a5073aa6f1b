//! Order-exact binary format for `SkinningData`, written at asset-build time
//! and read back at load time. Writer and reader are byte-for-byte inverses;
//! any change to one side must be mirrored in the other.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! i32     bone_count
//! Matrix  bind_pose[bone_count]
//! Matrix  inverse_bind_pose[bone_count]
//! i32     parent[bone_count]              -1 marks a root bone
//! i32     clip_count
//! repeat clip_count times (clips ordered by name):
//!     string  clip_name                   7-bit varint byte length, UTF-8
//!     i64     duration_nanos
//!     i32     keyframe_count
//!     repeat keyframe_count times:
//!         i32     bone
//!         i64     time_nanos
//!         Matrix  transform
//! ```
//!
//! A `Matrix` is 16 f32 values in row-major order (M11..M44), independent of
//! the in-memory column-major storage.

use {
    crate::data::{AnimationClip, Keyframe, SkinningData, SkinningDataError},
    byteorder::{LittleEndian, ReadBytesExt as _, WriteBytesExt as _},
    nalgebra as na,
    std::{
        collections::HashMap,
        convert::TryFrom as _,
        io::{Read, Write},
        time::Duration,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("{source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("count {count} does not fit the wire format")]
    CountOverflow { count: usize },

    #[error("negative count {count} in stream")]
    NegativeCount { count: i32 },

    #[error("duration {duration:?} does not fit an i64 nanosecond field")]
    TimeOverflow { duration: Duration },

    #[error("negative time {nanos}ns in stream")]
    NegativeTime { nanos: i64 },

    #[error("negative bone index {bone} in stream")]
    NegativeBone { bone: i32 },

    #[error("invalid parent index {parent} in stream")]
    InvalidParent { parent: i32 },

    #[error("malformed string length prefix")]
    MalformedStringLength,

    #[error("clip name is not valid utf-8: {source}")]
    InvalidClipName {
        #[from]
        source: std::string::FromUtf8Error,
    },

    #[error("{source}")]
    Construct {
        #[from]
        source: SkinningDataError,
    },
}

pub fn write_skinning_data<W>(
    data: &SkinningData,
    write: &mut W,
) -> Result<(), CodecError>
where
    W: Write,
{
    // All three per-bone arrays share this count; the reader reuses it.
    write.write_i32::<LittleEndian>(count_i32(data.bone_count())?)?;

    for matrix in data.bind_pose() {
        write_matrix(write, matrix)?;
    }
    for matrix in data.inverse_bind_pose() {
        write_matrix(write, matrix)?;
    }
    for parent in data.parents() {
        let parent = match *parent {
            Some(parent) => count_i32(parent)?,
            None => -1,
        };
        write.write_i32::<LittleEndian>(parent)?;
    }

    let clips = data.animation_clips();
    write.write_i32::<LittleEndian>(count_i32(clips.len())?)?;

    // Sorted so the artifact is deterministic regardless of map order.
    let mut names: Vec<&str> = clips.keys().map(|name| name.as_str()).collect();
    names.sort_unstable();

    for name in names {
        let clip = &clips[name];
        write_string(write, name)?;
        write.write_i64::<LittleEndian>(duration_nanos(clip.duration)?)?;
        write.write_i32::<LittleEndian>(count_i32(clip.keyframes.len())?)?;

        for keyframe in &clip.keyframes {
            write.write_i32::<LittleEndian>(count_i32(keyframe.bone)?)?;
            write.write_i64::<LittleEndian>(duration_nanos(keyframe.time)?)?;
            write_matrix(write, &keyframe.transform)?;
        }
    }

    Ok(())
}

pub fn read_skinning_data<R>(read: &mut R) -> Result<SkinningData, CodecError>
where
    R: Read,
{
    let bone_count = read_count(read)?;

    let mut bind_pose = Vec::with_capacity(bone_count);
    for _ in 0..bone_count {
        bind_pose.push(read_matrix(read)?);
    }

    let mut inverse_bind_pose = Vec::with_capacity(bone_count);
    for _ in 0..bone_count {
        inverse_bind_pose.push(read_matrix(read)?);
    }

    let mut parents = Vec::with_capacity(bone_count);
    for _ in 0..bone_count {
        let parent = read.read_i32::<LittleEndian>()?;
        parents.push(match parent {
            -1 => None,
            parent if parent >= 0 => Some(parent as usize),
            parent => return Err(CodecError::InvalidParent { parent }),
        });
    }

    let clip_count = read_count(read)?;
    let mut animation_clips = HashMap::with_capacity(clip_count);

    for _ in 0..clip_count {
        let name = read_string(read)?;
        let duration = read_duration(read)?;
        let keyframe_count = read_count(read)?;

        let mut keyframes = Vec::with_capacity(keyframe_count);
        for _ in 0..keyframe_count {
            let bone = read.read_i32::<LittleEndian>()?;
            if bone < 0 {
                return Err(CodecError::NegativeBone { bone });
            }
            let time = read_duration(read)?;
            let transform = read_matrix(read)?;
            keyframes.push(Keyframe {
                bone: bone as usize,
                time,
                transform,
            });
        }

        animation_clips.insert(
            name,
            AnimationClip {
                duration,
                keyframes,
            },
        );
    }

    Ok(SkinningData::new(
        animation_clips,
        bind_pose,
        inverse_bind_pose,
        parents,
    )?)
}

fn count_i32(count: usize) -> Result<i32, CodecError> {
    i32::try_from(count).map_err(|_| CodecError::CountOverflow { count })
}

fn read_count<R: Read>(read: &mut R) -> Result<usize, CodecError> {
    let count = read.read_i32::<LittleEndian>()?;
    if count < 0 {
        return Err(CodecError::NegativeCount { count });
    }
    Ok(count as usize)
}

fn duration_nanos(duration: Duration) -> Result<i64, CodecError> {
    i64::try_from(duration.as_nanos())
        .map_err(|_| CodecError::TimeOverflow { duration })
}

fn read_duration<R: Read>(read: &mut R) -> Result<Duration, CodecError> {
    let nanos = read.read_i64::<LittleEndian>()?;
    if nanos < 0 {
        return Err(CodecError::NegativeTime { nanos });
    }
    Ok(Duration::from_nanos(nanos as u64))
}

fn write_matrix<W: Write>(
    write: &mut W,
    matrix: &na::Matrix4<f32>,
) -> Result<(), CodecError> {
    for row in 0..4 {
        for column in 0..4 {
            write.write_f32::<LittleEndian>(matrix[(row, column)])?;
        }
    }
    Ok(())
}

fn read_matrix<R: Read>(read: &mut R) -> Result<na::Matrix4<f32>, CodecError> {
    let mut values = [0.0f32; 16];
    for value in values.iter_mut() {
        *value = read.read_f32::<LittleEndian>()?;
    }
    Ok(na::Matrix4::from_row_slice(&values))
}

/// String framing: byte length as a 7-bit continuation varint, then that
/// many UTF-8 bytes.
fn write_string<W: Write>(write: &mut W, value: &str) -> Result<(), CodecError> {
    let mut remaining = u32::try_from(value.len())
        .map_err(|_| CodecError::CountOverflow { count: value.len() })?;

    loop {
        let byte = (remaining & 0x7f) as u8;
        remaining >>= 7;
        if remaining == 0 {
            write.write_u8(byte)?;
            break;
        }
        write.write_u8(byte | 0x80)?;
    }

    write.write_all(value.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(read: &mut R) -> Result<String, CodecError> {
    let mut length: u64 = 0;
    let mut shift = 0u32;

    loop {
        let byte = read.read_u8()?;
        // 5 varint bytes cover the full u32 range.
        if shift >= 35 {
            return Err(CodecError::MalformedStringLength);
        }
        length |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    let length = usize::try_from(length)
        .map_err(|_| CodecError::MalformedStringLength)?;
    if length > u32::MAX as usize {
        return Err(CodecError::MalformedStringLength);
    }

    let mut bytes = vec![0u8; length];
    read.read_exact(&mut bytes)?;
    Ok(String::from_utf8(bytes)?)
}
