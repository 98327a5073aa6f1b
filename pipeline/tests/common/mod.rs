//! Builder for synthetic binary FBX streams: nested node records with
//! computed absolute end offsets, in both the 32-bit (< 7500) and 64-bit
//! (>= 7500) header layouts.

#![allow(dead_code)]

pub enum Prop {
    I64(i64),
    F64(f64),
    Str(&'static str),
    /// An f64 array record with this many payload bytes of junk.
    Array(u32),
}

pub struct Node {
    pub name: &'static str,
    pub props: Vec<Prop>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: &'static str) -> Self {
        Node {
            name,
            props: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(mut self, prop: Prop) -> Self {
        self.props.push(prop);
        self
    }

    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }
}

/// A "Model" object node: id, decorated name, class.
pub fn model(id: i64, name: &'static str, class: &'static str) -> Node {
    Node::new("Model")
        .prop(Prop::I64(id))
        .prop(Prop::Str(name))
        .prop(Prop::Str(class))
}

/// A Properties70 "P" record carrying a PreRotation vector (degrees).
pub fn prerotation_p(x: f64, y: f64, z: f64) -> Node {
    Node::new("P")
        .prop(Prop::Str("PreRotation"))
        .prop(Prop::Str("Vector3D"))
        .prop(Prop::Str("Vector"))
        .prop(Prop::Str("A"))
        .prop(Prop::F64(x))
        .prop(Prop::F64(y))
        .prop(Prop::F64(z))
}

/// Serializes a whole file: 27-byte header, the top-level nodes, and the
/// terminating null record.
pub fn encode_fbx(version: u32, nodes: &[Node]) -> Vec<u8> {
    let wide = version >= 7500;

    let mut out = Vec::new();
    out.extend_from_slice(b"Kaydara FBX Binary  \0");
    out.extend_from_slice(&[0x1a, 0x00]);
    out.extend_from_slice(&version.to_le_bytes());

    for node in nodes {
        write_node(&mut out, node, wide);
    }
    out.extend(std::iter::repeat(0).take(null_record_len(wide)));

    out
}

fn null_record_len(wide: bool) -> usize {
    if wide {
        25
    } else {
        13
    }
}

fn prop_bytes(prop: &Prop) -> Vec<u8> {
    let mut out = Vec::new();
    match *prop {
        Prop::I64(value) => {
            out.push(b'L');
            out.extend_from_slice(&value.to_le_bytes());
        }
        Prop::F64(value) => {
            out.push(b'D');
            out.extend_from_slice(&value.to_le_bytes());
        }
        Prop::Str(value) => {
            out.push(b'S');
            out.extend_from_slice(&(value.len() as u32).to_le_bytes());
            out.extend_from_slice(value.as_bytes());
        }
        Prop::Array(payload_len) => {
            out.push(b'd');
            out.extend_from_slice(&3u32.to_le_bytes());
            out.extend_from_slice(&1u32.to_le_bytes());
            out.extend_from_slice(&payload_len.to_le_bytes());
            out.extend(std::iter::repeat(0xab).take(payload_len as usize));
        }
    }
    out
}

fn node_size(node: &Node, wide: bool) -> u64 {
    let header = null_record_len(wide) as u64 + node.name.len() as u64;
    let props: u64 = node
        .props
        .iter()
        .map(|prop| prop_bytes(prop).len() as u64)
        .sum();
    let children: u64 = node
        .children
        .iter()
        .map(|child| node_size(child, wide))
        .sum();
    let sentinel = if node.children.is_empty() {
        0
    } else {
        null_record_len(wide) as u64
    };

    header + props + children + sentinel
}

fn write_node(out: &mut Vec<u8>, node: &Node, wide: bool) {
    let end_offset = out.len() as u64 + node_size(node, wide);
    let props: Vec<Vec<u8>> = node.props.iter().map(prop_bytes).collect();
    let property_list_len: u64 =
        props.iter().map(|bytes| bytes.len() as u64).sum();

    write_header_field(out, end_offset, wide);
    write_header_field(out, node.props.len() as u64, wide);
    write_header_field(out, property_list_len, wide);
    out.push(node.name.len() as u8);
    out.extend_from_slice(node.name.as_bytes());

    for bytes in &props {
        out.extend_from_slice(bytes);
    }
    for child in &node.children {
        write_node(out, child, wide);
    }
    if !node.children.is_empty() {
        out.extend(std::iter::repeat(0).take(null_record_len(wide)));
    }
}

fn write_header_field(out: &mut Vec<u8>, value: u64, wide: bool) {
    if wide {
        out.extend_from_slice(&value.to_le_bytes());
    } else {
        out.extend_from_slice(&(value as u32).to_le_bytes());
    }
}
