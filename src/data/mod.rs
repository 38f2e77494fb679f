//! Raw lump records and the [`BspData`] table view the reconstructor walks.
//!
//! Faces, edges and vertices form a shared graph, so the tables address each
//! other by integer index instead of holding references.

pub mod game;

use crate::bspfile::{AppId, BspFile, LumpType};
use crate::buffer::ByteReader;
use crate::error::{BspError, BspResult};
use crate::geom::{Plane, Vector, Vector4};
use ahash::AHashMap;
use binrw::{BinRead, BinResult, Endian};
use bitflags::bitflags;
use std::io::{Read, Seek};

/// Plane as stored in the plane lump.
#[derive(Debug, Clone, Copy, BinRead)]
pub struct DPlane {
    pub normal: Vector,
    pub dist: f32,
    pub axis_type: i32,
}

impl DPlane {
    pub const DISK_SIZE: usize = 20;

    pub fn plane(&self) -> Plane {
        Plane::new(self.normal, self.dist)
    }
}

#[derive(Debug, Clone, Copy, BinRead)]
pub struct DEdge {
    pub vertices: [u16; 2],
}

impl DEdge {
    pub const DISK_SIZE: usize = 4;
}

#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrushContents(pub u32);

bitflags! {
    impl BrushContents: u32 {
        const SOLID = 0x1;
        const WINDOW = 0x2;
        const AUX = 0x4;
        const GRATE = 0x8;
        const SLIME = 0x10;
        const WATER = 0x20;
        const BLOCK_LOS = 0x40;
        const OPAQUE = 0x80;
        const TEST_FOG_VOLUME = 0x100;
        const MOVEABLE = 0x4000;
        const AREAPORTAL = 0x8000;
        const PLAYER_CLIP = 0x10000;
        const MONSTER_CLIP = 0x20000;
        const ORIGIN = 0x100_0000;
        const MONSTER = 0x200_0000;
        const DEBRIS = 0x400_0000;
        const DETAIL = 0x800_0000;
        const TRANSLUCENT = 0x1000_0000;
        const LADDER = 0x2000_0000;
        const HITBOX = 0x4000_0000;
    }
}

/// A convex solid: the intersection of the half spaces of its sides.
#[derive(Debug, Clone, Copy, BinRead)]
pub struct DBrush {
    pub first_side: i32,
    pub num_sides: i32,
    pub contents: BrushContents,
}

impl DBrush {
    pub const DISK_SIZE: usize = 12;
}

/// One face of a brush, dialect independent.
#[derive(Debug, Clone, Copy)]
pub struct BrushSide {
    pub plane_num: u32,
    pub tex_info: i32,
    pub disp_info: i32,
    pub bevel: bool,
}

#[derive(Debug, Clone, Copy, BinRead)]
struct DBrushSide {
    plane_num: u16,
    tex_info: i16,
    disp_info: i16,
    bevel: i16,
}

impl DBrushSide {
    const DISK_SIZE: usize = 8;
}

// Vindictus widened every field
#[derive(Debug, Clone, Copy, BinRead)]
struct DBrushSideVindictus {
    plane_num: i32,
    tex_info: i32,
    disp_info: i32,
    bevel: i32,
}

impl DBrushSideVindictus {
    const DISK_SIZE: usize = 16;
}

impl From<DBrushSide> for BrushSide {
    fn from(side: DBrushSide) -> Self {
        BrushSide {
            plane_num: side.plane_num.into(),
            tex_info: side.tex_info.into(),
            disp_info: side.disp_info.into(),
            bevel: side.bevel != 0,
        }
    }
}

impl From<DBrushSideVindictus> for BrushSide {
    fn from(side: DBrushSideVindictus) -> Self {
        BrushSide {
            plane_num: side.plane_num as u32,
            tex_info: side.tex_info,
            disp_info: side.disp_info,
            bevel: side.bevel != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, BinRead)]
pub struct DModel {
    pub mins: Vector,
    pub maxs: Vector,
    pub origin: Vector,
    pub head_node: i32,
    pub first_face: i32,
    pub num_faces: i32,
}

impl DModel {
    pub const DISK_SIZE: usize = 48;
}

#[derive(Debug, Clone, Copy, BinRead)]
pub struct DNode {
    pub plane_num: i32,
    pub children: [i32; 2],
    pub mins: [i16; 3],
    pub maxs: [i16; 3],
    pub first_face: u16,
    pub num_faces: u16,
    pub area: i16,
    pub padding: i16,
}

impl DNode {
    pub const DISK_SIZE: usize = 32;
}

/// Leaf of the bsp tree. Version 0 of the leaf lump embeds ambient light
/// samples, version 1 dropped them.
#[derive(Debug, Clone, Copy)]
pub struct Leaf {
    pub contents: i32,
    pub cluster: i16,
    pub first_leaf_face: u16,
    pub num_leaf_faces: u16,
    pub first_leaf_brush: u16,
    pub num_leaf_brushes: u16,
}

impl Leaf {
    pub const DISK_SIZE_V0: usize = 56;
    pub const DISK_SIZE_V1: usize = 32;
}

#[allow(dead_code)]
#[derive(BinRead)]
struct DLeafV0 {
    contents: i32,
    cluster: i16,
    area_flags: i16,
    mins: [i16; 3],
    maxs: [i16; 3],
    first_leaf_face: u16,
    num_leaf_faces: u16,
    first_leaf_brush: u16,
    num_leaf_brushes: u16,
    leaf_water_data_id: i16,
    // compressed ambient light cube, six rgb exponent samples
    ambient_lighting: [u8; 24],
    padding: i16,
}

#[allow(dead_code)]
#[derive(BinRead)]
struct DLeafV1 {
    contents: i32,
    cluster: i16,
    area_flags: i16,
    mins: [i16; 3],
    maxs: [i16; 3],
    first_leaf_face: u16,
    num_leaf_faces: u16,
    first_leaf_brush: u16,
    num_leaf_brushes: u16,
    leaf_water_data_id: i16,
    padding: i16,
}

impl From<DLeafV0> for Leaf {
    fn from(leaf: DLeafV0) -> Self {
        Leaf {
            contents: leaf.contents,
            cluster: leaf.cluster,
            first_leaf_face: leaf.first_leaf_face,
            num_leaf_faces: leaf.num_leaf_faces,
            first_leaf_brush: leaf.first_leaf_brush,
            num_leaf_brushes: leaf.num_leaf_brushes,
        }
    }
}

impl From<DLeafV1> for Leaf {
    fn from(leaf: DLeafV1) -> Self {
        Leaf {
            contents: leaf.contents,
            cluster: leaf.cluster,
            first_leaf_face: leaf.first_leaf_face,
            num_leaf_faces: leaf.num_leaf_faces,
            first_leaf_brush: leaf.first_leaf_brush,
            num_leaf_brushes: leaf.num_leaf_brushes,
        }
    }
}

impl BinRead for Leaf {
    type Args<'a> = (i32,);

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        args: Self::Args<'_>,
    ) -> BinResult<Self> {
        match args.0 {
            0 => DLeafV0::read_options(reader, endian, ()).map(Leaf::from),
            _ => DLeafV1::read_options(reader, endian, ()).map(Leaf::from),
        }
    }
}

#[derive(Debug, Clone, Copy, BinRead)]
pub struct DFace {
    pub plane_num: u16,
    pub side: u8,
    pub on_node: u8,
    pub first_edge: i32,
    pub num_edges: i16,
    pub tex_info: i16,
    pub disp_info: i16,
    pub surface_fog_volume_id: i16,
    pub styles: [u8; 4],
    pub light_ofs: i32,
    pub area: f32,
    pub lightmap_mins: [i32; 2],
    pub lightmap_size: [i32; 2],
    pub orig_face: i32,
    pub num_prims: u16,
    pub first_prim_id: u16,
    pub smoothing_groups: u32,
}

impl DFace {
    pub const DISK_SIZE: usize = 56;
}

#[derive(BinRead, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFlags(pub u32);

bitflags! {
    impl SurfaceFlags: u32 {
        const LIGHT = 0x1;
        const SKY_2D = 0x2;
        const SKY = 0x4;
        const WARP = 0x8;
        const TRANS = 0x10;
        const NO_PORTAL = 0x20;
        const TRIGGER = 0x40;
        const NO_DRAW = 0x80;
        const HINT = 0x100;
        const SKIP = 0x200;
        const NO_LIGHT = 0x400;
        const BUMP_LIGHT = 0x800;
        const NO_SHADOWS = 0x1000;
        const NO_DECALS = 0x2000;
        const NO_CHOP = 0x4000;
        const HITBOX = 0x8000;
    }
}

#[derive(Debug, Clone, Copy, BinRead)]
pub struct TexInfo {
    pub texture: [Vector4; 2],
    pub lightmap: [Vector4; 2],
    pub flags: SurfaceFlags,
    pub tex_data: i32,
}

impl TexInfo {
    pub const DISK_SIZE: usize = 72;
}

#[derive(Debug, Clone, Copy, BinRead)]
pub struct DAreaportal {
    pub portal_key: u16,
    pub other_area: u16,
    pub first_clip_portal_vert: u16,
    pub clip_portal_verts: u16,
    pub plane_num: i32,
}

impl DAreaportal {
    pub const DISK_SIZE: usize = 12;
}

/// Occluder record. Version 1 added the area field.
#[derive(Debug, Clone, Copy)]
pub struct OccluderData {
    pub flags: i32,
    pub first_poly: i32,
    pub poly_count: i32,
    pub mins: Vector,
    pub maxs: Vector,
    pub area: i32,
}

#[derive(BinRead)]
struct DOccluderDataV0 {
    flags: i32,
    first_poly: i32,
    poly_count: i32,
    mins: Vector,
    maxs: Vector,
}

#[derive(BinRead)]
struct DOccluderDataV1 {
    flags: i32,
    first_poly: i32,
    poly_count: i32,
    mins: Vector,
    maxs: Vector,
    area: i32,
}

impl From<DOccluderDataV0> for OccluderData {
    fn from(data: DOccluderDataV0) -> Self {
        OccluderData {
            flags: data.flags,
            first_poly: data.first_poly,
            poly_count: data.poly_count,
            mins: data.mins,
            maxs: data.maxs,
            area: 0,
        }
    }
}

impl From<DOccluderDataV1> for OccluderData {
    fn from(data: DOccluderDataV1) -> Self {
        OccluderData {
            flags: data.flags,
            first_poly: data.first_poly,
            poly_count: data.poly_count,
            mins: data.mins,
            maxs: data.maxs,
            area: data.area,
        }
    }
}

#[derive(Debug, Clone, Copy, BinRead)]
pub struct DOccluderPolyData {
    pub first_vertex_index: i32,
    pub vertex_count: i32,
    pub plane_num: i32,
}

/// Read only view over the geometry tables of a parsed map.
#[derive(Debug, Default)]
pub struct BspData {
    pub vertices: Vec<Vector>,
    pub edges: Vec<DEdge>,
    pub surf_edges: Vec<i32>,
    pub planes: Vec<DPlane>,
    pub brushes: Vec<DBrush>,
    pub brush_sides: Vec<BrushSide>,
    pub models: Vec<DModel>,
    pub nodes: Vec<DNode>,
    pub leaves: Vec<Leaf>,
    pub leaf_brushes: Vec<u16>,
    pub faces: Vec<DFace>,
    pub orig_faces: Vec<DFace>,
    pub tex_infos: Vec<TexInfo>,
    pub areaportals: Vec<DAreaportal>,
    pub clip_portal_vertices: Vec<Vector>,
    pub occluders: Vec<OccluderData>,
    pub occluder_polys: Vec<DOccluderPolyData>,
    pub occluder_vertex_indices: Vec<i32>,
}

impl BspData {
    pub fn parse(bsp: &BspFile) -> BspResult<BspData> {
        let brush_sides = if bsp.app() == AppId::VINDICTUS {
            read_lump_vec::<DBrushSideVindictus>(
                bsp,
                LumpType::BrushSides,
                DBrushSideVindictus::DISK_SIZE,
            )?
            .into_iter()
            .map(BrushSide::from)
            .collect()
        } else {
            read_lump_vec::<DBrushSide>(bsp, LumpType::BrushSides, DBrushSide::DISK_SIZE)?
                .into_iter()
                .map(BrushSide::from)
                .collect()
        };

        let leaf_version = bsp.lump(LumpType::Leaves).version();
        let leaf_size = if leaf_version == 0 {
            Leaf::DISK_SIZE_V0
        } else {
            Leaf::DISK_SIZE_V1
        };

        let mut data = BspData {
            vertices: read_lump_vec(bsp, LumpType::Vertices, 12)?,
            edges: read_lump_vec(bsp, LumpType::Edges, DEdge::DISK_SIZE)?,
            surf_edges: read_lump_vec(bsp, LumpType::SurfaceEdges, 4)?,
            planes: read_lump_vec(bsp, LumpType::Planes, DPlane::DISK_SIZE)?,
            brushes: read_lump_vec(bsp, LumpType::Brushes, DBrush::DISK_SIZE)?,
            brush_sides,
            models: read_lump_vec(bsp, LumpType::Models, DModel::DISK_SIZE)?,
            nodes: read_lump_vec(bsp, LumpType::Nodes, DNode::DISK_SIZE)?,
            leaves: read_lump_vec_args(bsp, LumpType::Leaves, leaf_size, (leaf_version,))?,
            leaf_brushes: read_lump_vec(bsp, LumpType::LeafBrushes, 2)?,
            faces: read_lump_vec(bsp, LumpType::Faces, DFace::DISK_SIZE)?,
            orig_faces: read_lump_vec(bsp, LumpType::OriginalFaces, DFace::DISK_SIZE)?,
            tex_infos: read_lump_vec(bsp, LumpType::TextureInfo, TexInfo::DISK_SIZE)?,
            areaportals: read_lump_vec(bsp, LumpType::AreaPortals, DAreaportal::DISK_SIZE)?,
            clip_portal_vertices: read_lump_vec(bsp, LumpType::ClipPortalVertices, 12)?,
            occluders: Vec::new(),
            occluder_polys: Vec::new(),
            occluder_vertex_indices: Vec::new(),
        };
        parse_occlusion(bsp, &mut data)?;
        Ok(data)
    }

    pub fn plane(&self, index: u32) -> Option<Plane> {
        self.planes.get(index as usize).map(DPlane::plane)
    }

    /// Smoothing groups keyed by plane number, taken from the first
    /// original face on each plane. Brush sides pick theirs up by plane.
    pub fn smoothing_by_plane(&self) -> AHashMap<u32, u32> {
        let mut by_plane = AHashMap::with_capacity(self.orig_faces.len());
        for face in &self.orig_faces {
            by_plane
                .entry(face.plane_num.into())
                .or_insert(face.smoothing_groups);
        }
        by_plane
    }
}

fn check_size(lump: LumpType, lump_size: usize, element_size: usize) -> BspResult<usize> {
    if lump_size % element_size != 0 {
        return Err(BspError::InvalidLumpSize {
            lump,
            element_size,
            lump_size,
        });
    }
    Ok(lump_size / element_size)
}

fn read_lump_vec<T>(bsp: &BspFile, lump_type: LumpType, element_size: usize) -> BspResult<Vec<T>>
where
    T: for<'b> BinRead<Args<'b> = ()>,
{
    if !bsp.can_read_lump(lump_type) {
        return Ok(Vec::new());
    }
    let data = bsp.lump(lump_type).read_data()?;
    let count = check_size(lump_type, data.len(), element_size)?;
    ByteReader::new(&data, bsp.endian()).read_vec(count)
}

fn read_lump_vec_args<T, A>(
    bsp: &BspFile,
    lump_type: LumpType,
    element_size: usize,
    args: A,
) -> BspResult<Vec<T>>
where
    T: for<'b> BinRead<Args<'b> = A>,
    A: Clone,
{
    if !bsp.can_read_lump(lump_type) {
        return Ok(Vec::new());
    }
    let data = bsp.lump(lump_type).read_data()?;
    let count = check_size(lump_type, data.len(), element_size)?;
    let mut reader = ByteReader::new(&data, bsp.endian());
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(reader.read_args(args.clone())?);
    }
    Ok(items)
}

// the occlusion lump nests three tables behind their own counts
fn parse_occlusion(bsp: &BspFile, data: &mut BspData) -> BspResult<()> {
    let lump = bsp.lump(LumpType::Occlusion);
    let payload = lump.read_data()?;
    if payload.is_empty() {
        return Ok(());
    }
    let mut reader = ByteReader::new(&payload, bsp.endian());

    let count: i32 = reader.read()?;
    for _ in 0..count.max(0) {
        let occluder: OccluderData = if lump.version() == 0 {
            reader.read::<DOccluderDataV0>()?.into()
        } else {
            reader.read::<DOccluderDataV1>()?.into()
        };
        data.occluders.push(occluder);
    }

    let poly_count: i32 = reader.read()?;
    for _ in 0..poly_count.max(0) {
        data.occluder_polys.push(reader.read()?);
    }

    let vertex_count: i32 = reader.read()?;
    for _ in 0..vertex_count.max(0) {
        data.occluder_vertex_indices.push(reader.read()?);
    }
    Ok(())
}
