//! Extraction of per-bone `PreRotation` Euler angles from a binary FBX
//! file, by walking `Objects` → `Model` → `Properties70` → `P` records and
//! skipping everything else. Best-effort by design: a file that is not
//! binary FBX yields an empty map, and the processor treats any parse error
//! as "no pre-rotation data available".

use {
    crate::fbx::{self, FbxError},
    nalgebra as na,
    std::{
        collections::HashMap,
        fs::File,
        io::{BufReader, Read, Seek, SeekFrom},
        path::Path,
    },
};

/// Pre-rotations with every axis at or below this magnitude (degrees) are
/// importer noise, not a correction signal.
const NOISE_FLOOR_DEG: f32 = 0.001;

/// Reads the `PreRotation` angles (degrees, XYZ order) per bone from a
/// binary FBX file. Only bones with a non-trivial pre-rotation appear in
/// the result; a non-FBX-binary file yields an empty map.
pub fn read_prerotations(
    path: &Path,
) -> Result<HashMap<String, na::Vector3<f32>>, FbxError> {
    let file = File::open(path)?;
    let mut read = BufReader::new(file);
    read_prerotations_from(&mut read)
}

pub fn read_prerotations_from<R: Read + Seek>(
    read: &mut R,
) -> Result<HashMap<String, na::Vector3<f32>>, FbxError> {
    let mut result = HashMap::new();

    let version = match fbx::read_header(read)? {
        Some(version) => version,
        None => return Ok(result),
    };
    let wide_offsets = version >= 7500;

    let position = read.seek(SeekFrom::Current(0))?;
    let stream_len = read.seek(SeekFrom::End(0))?;
    read.seek(SeekFrom::Start(position))?;

    // Top level: find the single "Objects" node, skip every other subtree.
    while read.seek(SeekFrom::Current(0))? < stream_len {
        let node = fbx::read_node_header(read, wide_offsets)?;
        if node.is_null() {
            break;
        }

        if node.name == "Objects" {
            parse_objects(read, node.end_offset, wide_offsets, &mut result)?;
            break;
        }

        read.seek(SeekFrom::Start(node.end_offset))?;
    }

    Ok(result)
}

fn parse_objects<R: Read + Seek>(
    read: &mut R,
    objects_end: u64,
    wide_offsets: bool,
    result: &mut HashMap<String, na::Vector3<f32>>,
) -> Result<(), FbxError> {
    while read.seek(SeekFrom::Current(0))? < objects_end {
        let node = fbx::read_node_header(read, wide_offsets)?;
        if node.is_null() {
            break;
        }

        if node.name == "Model" {
            parse_model(read, &node, wide_offsets, result)?;
        }

        read.seek(SeekFrom::Start(node.end_offset))?;
    }

    Ok(())
}

fn parse_model<R: Read + Seek>(
    read: &mut R,
    model: &fbx::NodeHeader,
    wide_offsets: bool,
    result: &mut HashMap<String, na::Vector3<f32>>,
) -> Result<(), FbxError> {
    // Property 0 is the object id, property 1 the name string, formatted
    // "Model::<name>" in ASCII exports or "<name>\0\x01Model" in binary.
    let props_end =
        read.seek(SeekFrom::Current(0))? + model.property_list_len;

    let mut bone_name = None;
    for index in 0..model.num_properties.min(3) {
        if read.seek(SeekFrom::Current(0))? >= props_end {
            break;
        }
        let property = fbx::read_property(read)?;
        if index == 1 {
            if let Some(raw) = property.as_str() {
                bone_name = Some(clean_bone_name(raw));
            }
        }
    }

    let bone_name = match bone_name {
        Some(name) => name,
        None => return Ok(()),
    };

    read.seek(SeekFrom::Start(props_end))?;

    while read.seek(SeekFrom::Current(0))? < model.end_offset {
        let child = fbx::read_node_header(read, wide_offsets)?;
        if child.is_null() {
            break;
        }

        if child.name == "Properties70" {
            if let Some(euler) =
                parse_properties70(read, child.end_offset, wide_offsets)?
            {
                if euler.x.abs() > NOISE_FLOOR_DEG
                    || euler.y.abs() > NOISE_FLOOR_DEG
                    || euler.z.abs() > NOISE_FLOOR_DEG
                {
                    result.insert(bone_name, euler);
                }
            }
            break;
        }

        read.seek(SeekFrom::Start(child.end_offset))?;
    }

    Ok(())
}

fn parse_properties70<R: Read + Seek>(
    read: &mut R,
    properties_end: u64,
    wide_offsets: bool,
) -> Result<Option<na::Vector3<f32>>, FbxError> {
    while read.seek(SeekFrom::Current(0))? < properties_end {
        let node = fbx::read_node_header(read, wide_offsets)?;
        if node.is_null() {
            break;
        }

        // A "P" record is: name, type, subtype, flags, then the values.
        if node.name == "P" && node.num_properties >= 7 {
            let first = fbx::read_property(read)?;
            if first.as_str() == Some("PreRotation") {
                for _ in 0..3 {
                    fbx::read_property(read)?;
                }

                let x = read_angle(read)?;
                let y = read_angle(read)?;
                let z = read_angle(read)?;
                return Ok(Some(na::Vector3::new(x, y, z)));
            }
        }

        read.seek(SeekFrom::Start(node.end_offset))?;
    }

    Ok(None)
}

fn read_angle<R: Read + Seek>(read: &mut R) -> Result<f32, FbxError> {
    let property = fbx::read_property(read)?;
    match property.as_f64() {
        Some(value) => Ok(value as f32),
        None => {
            let offset = read.seek(SeekFrom::Current(0))?;
            Err(FbxError::UnexpectedProperty { offset })
        }
    }
}

/// Strips the object-type decoration from an FBX model name.
fn clean_bone_name(raw: &str) -> String {
    // Binary variant: "<name>\0\x01Model" with the type after the NUL.
    if let Some(index) = raw.find('\0') {
        if index > 0 {
            return raw[..index].to_owned();
        }
    }

    // ASCII variant: "Model::<name>".
    if let Some(stripped) = raw.strip_prefix("Model::") {
        return stripped.to_owned();
    }

    raw.to_owned()
}

/// Euler XYZ in degrees to a rotation, X applied first, then Y, then Z —
/// the FBX convention. `from_euler_angles` composes roll(X) first, which
/// is exactly that order.
pub fn euler_deg_to_rotation(deg: na::Vector3<f32>) -> na::Rotation3<f32> {
    na::Rotation3::from_euler_angles(
        deg.x.to_radians(),
        deg.y.to_radians(),
        deg.z.to_radians(),
    )
}

pub fn euler_deg_to_quaternion(
    deg: na::Vector3<f32>,
) -> na::UnitQuaternion<f32> {
    na::UnitQuaternion::from_euler_angles(
        deg.x.to_radians(),
        deg.y.to_radians(),
        deg.z.to_radians(),
    )
}

pub fn euler_deg_to_matrix(deg: na::Vector3<f32>) -> na::Matrix4<f32> {
    euler_deg_to_rotation(deg).to_homogeneous()
}
