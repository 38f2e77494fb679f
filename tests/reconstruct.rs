//! End to end: a synthetic map image through the container, the table view
//! and the brush reconstructor.

mod common;

use binrw::Endian;
use common::BspBuilder;
use unbsp::{
    AppId, BrushPolicy, BrushRange, BrushReconstructor, BspData, BspFile, ByteWriter, Solid,
    WorldAlignedTextures,
};

fn plane_lump() -> Vec<u8> {
    let mut writer = ByteWriter::new(Endian::Little);
    let planes: [([f32; 3], f32); 6] = [
        ([1.0, 0.0, 0.0], 64.0),
        ([-1.0, 0.0, 0.0], 0.0),
        ([0.0, 1.0, 0.0], 64.0),
        ([0.0, -1.0, 0.0], 0.0),
        ([0.0, 0.0, 1.0], 64.0),
        ([0.0, 0.0, -1.0], 0.0),
    ];
    for (normal, dist) in planes {
        writer.write(&normal).unwrap();
        writer.write(&dist).unwrap();
        writer.write(&0i32).unwrap();
    }
    writer.into_inner()
}

fn brush_lump() -> Vec<u8> {
    let mut writer = ByteWriter::new(Endian::Little);
    // a 64 unit cube and a degenerate two sided brush
    for (first_side, num_sides) in [(0i32, 6i32), (6, 2)] {
        writer.write(&first_side).unwrap();
        writer.write(&num_sides).unwrap();
        writer.write(&1i32).unwrap(); // CONTENTS_SOLID
    }
    writer.into_inner()
}

fn brush_side_lump() -> Vec<u8> {
    let mut writer = ByteWriter::new(Endian::Little);
    for plane in [0u16, 1, 2, 3, 4, 5, 0, 1] {
        writer.write(&plane).unwrap();
        writer.write(&0i16).unwrap(); // texinfo
        writer.write(&-1i16).unwrap(); // dispinfo
        writer.write(&0i16).unwrap(); // bevel
    }
    writer.into_inner()
}

fn model_lump() -> Vec<u8> {
    let mut writer = ByteWriter::new(Endian::Little);
    for _ in 0..9 {
        writer.write(&0f32).unwrap(); // mins, maxs, origin
    }
    writer.write(&-1i32).unwrap(); // head node: straight into leaf 0
    writer.write(&0i32).unwrap();
    writer.write(&0i32).unwrap();
    writer.into_inner()
}

fn leaf_lump() -> Vec<u8> {
    let mut writer = ByteWriter::new(Endian::Little);
    writer.write(&0i32).unwrap(); // contents
    writer.write(&0i16).unwrap(); // cluster
    writer.write(&0i16).unwrap(); // area and flags
    for _ in 0..6 {
        writer.write(&0i16).unwrap(); // mins, maxs
    }
    writer.write(&0u16).unwrap(); // first leaf face
    writer.write(&0u16).unwrap();
    writer.write(&0u16).unwrap(); // first leaf brush
    writer.write(&2u16).unwrap();
    writer.write(&-1i16).unwrap(); // leaf water data
    writer.write(&0i16).unwrap(); // padding
    writer.into_inner()
}

fn leaf_brush_lump() -> Vec<u8> {
    let mut writer = ByteWriter::new(Endian::Little);
    writer.write(&0u16).unwrap();
    writer.write(&1u16).unwrap();
    writer.into_inner()
}

#[test]
fn cube_map_decompiles_to_one_solid() {
    let image = BspBuilder::new(Endian::Little, 20)
        .lump(1, plane_lump())
        .lump(5, Vec::new())
        .lump_versioned(10, 1, leaf_lump())
        .lump(14, model_lump())
        .lump(17, leaf_brush_lump())
        .lump(18, brush_lump())
        .lump(19, brush_side_lump())
        .build();

    let bsp = BspFile::parse("cube", image).unwrap();
    let data = BspData::parse(&bsp).unwrap();
    assert_eq!(data.planes.len(), 6);
    assert_eq!(data.brushes.len(), 2);
    assert_eq!(data.brush_sides.len(), 8);
    assert_eq!(data.models.len(), 1);
    assert_eq!(data.leaves.len(), 1);
    assert_eq!(data.leaf_brushes.len(), 2);

    let textures = WorldAlignedTextures;
    let mut writer =
        BrushReconstructor::new(&data, &textures, BrushPolicy::default(), bsp.app());
    assert_eq!(
        writer.ranges(),
        &[Some(BrushRange { first: 0, count: 2 })]
    );

    let mut solids: Vec<Solid> = Vec::new();
    let written = writer.write_brushes(&mut solids).unwrap();

    // the cube emits with all six faces, the degenerate brush is dropped
    assert_eq!(written, 1);
    assert_eq!(solids[0].sides.len(), 6);
    for side in &solids[0].sides {
        assert!((side.normal.length() - 1.0).abs() < 1e-4);
        for point in side.plane_points {
            for component in [point.x, point.y, point.z] {
                assert!((0.0..=64.0).contains(&component));
            }
        }
    }
    assert_eq!(writer.brush_id_for_index(0), Some(solids[0].id));
    assert_eq!(writer.brush_id_for_index(1), None);

    assert_eq!(bsp.app(), AppId::UNKNOWN);
}
