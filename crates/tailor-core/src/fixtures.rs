//! In-memory GLB files for tests

use serde_json::{json, Value};

use crate::import::{parse_glb, ImportedScene};

const GLB_MAGIC: u32 = 0x4654_6C67;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

pub(crate) struct FixtureNode {
    pub name: &'static str,
    pub translation: [f32; 3],
    pub scale: [f32; 3],
    pub primitives: usize,
}

impl FixtureNode {
    /// A unit cube placed and stretched by the node transform
    pub fn zone(name: &'static str, translation: [f32; 3], scale: [f32; 3]) -> Self {
        Self {
            name,
            translation,
            scale,
            primitives: 1,
        }
    }

    pub fn with_primitives(mut self, primitives: usize) -> Self {
        self.primitives = primitives;
        self
    }
}

/// Sleeves to the left, front and back torso panels stacked along Z.
/// Overall bounds are x -4..1.5, y -3..3, z -1..1.
pub(crate) fn shirt_nodes() -> Vec<FixtureNode> {
    vec![
        FixtureNode::zone("sleeves", [-3.0, 0.0, 0.0], [2.0, 1.0, 1.0]),
        FixtureNode::zone("front_torso", [0.0, 0.0, 0.5], [3.0, 6.0, 1.0]),
        FixtureNode::zone("back_torso", [0.0, 0.0, -0.5], [3.0, 6.0, 1.0]),
    ]
}

pub(crate) fn shirt_glb() -> Vec<u8> {
    build_glb(&shirt_nodes())
}

pub(crate) fn shirt_scene() -> ImportedScene {
    parse_glb(&shirt_glb()).unwrap()
}

/// Same layout with names that match no zone
pub(crate) fn unnamed_scene() -> ImportedScene {
    parse_glb(&build_glb(&[
        FixtureNode::zone("Cube", [-3.0, 0.0, 0.0], [2.0, 1.0, 1.0]),
        FixtureNode::zone("Cube.001", [0.0, 0.0, 0.5], [3.0, 6.0, 1.0]),
    ]))
    .unwrap()
}

pub(crate) fn empty_glb() -> Vec<u8> {
    let document = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [] }],
    });
    encode_glb(&document, &[])
}

/// Children of a single root node named "Shirt"
pub(crate) fn build_glb(nodes: &[FixtureNode]) -> Vec<u8> {
    let mut bin = Vec::new();
    for x in [-0.5f32, 0.5] {
        for y in [-0.5f32, 0.5] {
            for z in [-0.5f32, 0.5] {
                for v in [x, y, z] {
                    bin.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
    }
    // Vertex index = x * 4 + y * 2 + z
    let quads: [[u16; 4]; 6] = [
        [4, 6, 7, 5],
        [0, 1, 3, 2],
        [2, 3, 7, 6],
        [0, 4, 5, 1],
        [1, 5, 7, 3],
        [0, 2, 6, 4],
    ];
    for [a, b, c, d] in quads {
        for i in [a, b, c, a, c, d] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
    }

    let primitive = |material: usize| {
        json!({ "attributes": { "POSITION": 0 }, "indices": 1, "material": material })
    };

    let mut json_nodes = vec![json!({
        "name": "Shirt",
        "children": (1..=nodes.len()).collect::<Vec<_>>(),
    })];
    for node in nodes {
        json_nodes.push(json!({
            "name": node.name,
            "mesh": node.primitives.clamp(1, 2) - 1,
            "translation": node.translation,
            "scale": node.scale,
        }));
    }

    let document = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": json_nodes,
        "meshes": [
            { "primitives": [primitive(0)] },
            { "primitives": [primitive(0), primitive(1)] },
        ],
        "materials": [
            {
                "name": "fabric",
                "pbrMetallicRoughness": {
                    "baseColorFactor": [0.8, 0.8, 0.8, 1.0],
                    "metallicFactor": 0.0,
                    "roughnessFactor": 0.9,
                },
            },
            {
                "name": "trim",
                "pbrMetallicRoughness": { "baseColorFactor": [0.1, 0.1, 0.1, 1.0] },
            },
        ],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 8,
                "type": "VEC3",
                "min": [-0.5, -0.5, -0.5],
                "max": [0.5, 0.5, 0.5],
            },
            {
                "bufferView": 1,
                "componentType": 5123,
                "count": 36,
                "type": "SCALAR",
            },
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 96, "target": 34962 },
            { "buffer": 0, "byteOffset": 96, "byteLength": 72, "target": 34963 },
        ],
        "buffers": [{ "byteLength": bin.len() }],
    });

    encode_glb(&document, &bin)
}

fn encode_glb(document: &Value, bin: &[u8]) -> Vec<u8> {
    let mut json_chunk = serde_json::to_vec(document).unwrap();
    while json_chunk.len() % 4 != 0 {
        json_chunk.push(b' ');
    }
    let mut bin_chunk = bin.to_vec();
    while bin_chunk.len() % 4 != 0 {
        bin_chunk.push(0);
    }

    let mut total = 12 + 8 + json_chunk.len();
    if !bin_chunk.is_empty() {
        total += 8 + bin_chunk.len();
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());

    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_chunk);

    if !bin_chunk.is_empty() {
        out.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&bin_chunk);
    }
    out
}
