//! Rebuilding editable solids from compiled brushes.
//!
//! A compiled brush only stores the planes of its sides. Each face is
//! recovered by clipping a world sized polygon on its own plane against the
//! flipped planes of every other side, then validated and handed to the
//! editor text emitter through [`SolidSink`].

use crate::bspfile::AppId;
use crate::data::{BrushContents, BspData};
use crate::error::{BspError, BspResult};
use crate::geom::Vector;
use crate::winding::Winding;
use ahash::AHashMap;
use tracing::{debug, warn};

/// Texture axis in editor form `[x y z shift] scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureAxis {
    pub axis: Vector,
    pub shift: f32,
    pub scale: f32,
}

impl TextureAxis {
    pub const fn new(axis: Vector, shift: f32, scale: f32) -> Self {
        TextureAxis { axis, shift, scale }
    }
}

/// Computes texture alignment and material names for emitted sides. The
/// texture subsystem implements this, the reconstructor only forwards it.
pub trait TextureBuilder {
    fn axes(&self, data: &BspData, side_index: usize) -> (TextureAxis, TextureAxis);

    fn material(&self, data: &BspData, side_index: usize) -> String {
        let _ = (data, side_index);
        "TOOLS/TOOLSNODRAW".to_string()
    }
}

/// World aligned fallback axes, used when no texture subsystem is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorldAlignedTextures;

impl TextureBuilder for WorldAlignedTextures {
    fn axes(&self, data: &BspData, side_index: usize) -> (TextureAxis, TextureAxis) {
        let normal = data
            .brush_sides
            .get(side_index)
            .and_then(|side| data.plane(side.plane_num))
            .map(|plane| plane.normal)
            .unwrap_or(Vector::Z);

        let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
        let (u, v) = if az >= ax && az >= ay {
            (Vector::X, -Vector::Y)
        } else if ax >= ay {
            (Vector::Y, -Vector::Z)
        } else {
            (Vector::X, -Vector::Z)
        };
        (TextureAxis::new(u, 0.0, 0.25), TextureAxis::new(v, 0.0, 0.25))
    }
}

/// One reconstructed side of a solid.
#[derive(Debug, Clone)]
pub struct Side {
    pub id: i32,
    pub side_index: usize,
    /// Three non collinear vertices pinning down the face plane.
    pub plane_points: [Vector; 3],
    pub normal: Vector,
    pub material: String,
    pub u_axis: TextureAxis,
    pub v_axis: TextureAxis,
    pub smoothing_groups: u32,
}

/// A reconstructed convex solid.
#[derive(Debug, Clone)]
pub struct Solid {
    pub id: i32,
    pub brush_index: usize,
    pub sides: Vec<Side>,
}

/// Receives reconstructed solids, implemented by the editor text emitter.
pub trait SolidSink {
    fn write_solid(&mut self, solid: &Solid) -> BspResult<()>;
}

impl SolidSink for Vec<Solid> {
    fn write_solid(&mut self, solid: &Solid) -> BspResult<()> {
        self.push(solid.clone());
        Ok(())
    }
}

/// Which compiled brushes become editor solids.
#[derive(Debug, Clone, Copy)]
pub struct BrushPolicy {
    pub include_detail: bool,
    pub include_areaportals: bool,
    pub include_ladders: bool,
}

impl Default for BrushPolicy {
    fn default() -> Self {
        BrushPolicy {
            include_detail: true,
            // areaportal and ladder brushes are re-emitted as their own
            // entities by the caller
            include_areaportals: false,
            include_ladders: true,
        }
    }
}

impl BrushPolicy {
    fn accepts(&self, contents: BrushContents) -> bool {
        if !self.include_detail && contents.contains(BrushContents::DETAIL) {
            return false;
        }
        if !self.include_areaportals && contents.contains(BrushContents::AREAPORTAL) {
            return false;
        }
        if !self.include_ladders && contents.contains(BrushContents::LADDER) {
            return false;
        }
        true
    }
}

/// Winding builders memoized per structural index. The caches never evict,
/// a map is decompiled in one pass.
pub struct WindingFactory {
    max_coord: f32,
    face: AHashMap<usize, Winding>,
    brush_side: AHashMap<(usize, usize), Winding>,
    areaportal: AHashMap<usize, Winding>,
    plane: AHashMap<usize, Winding>,
}

impl WindingFactory {
    pub fn new(max_coord: f32) -> Self {
        WindingFactory {
            max_coord,
            face: AHashMap::new(),
            brush_side: AHashMap::new(),
            areaportal: AHashMap::new(),
            plane: AHashMap::new(),
        }
    }

    pub fn max_coord(&self) -> f32 {
        self.max_coord
    }

    /// The uncut base polygon of a plane.
    pub fn from_plane(&mut self, data: &BspData, plane_index: usize) -> Option<Winding> {
        if let Some(winding) = self.plane.get(&plane_index) {
            return Some(winding.clone());
        }
        let plane = data.plane(plane_index as u32)?;
        let winding = Winding::base_for_plane(&plane, self.max_coord);
        self.plane.insert(plane_index, winding.clone());
        Some(winding)
    }

    /// Rebuild a face polygon by following the surfedge indirection.
    pub fn from_face(&mut self, data: &BspData, face_index: usize) -> Option<Winding> {
        if let Some(winding) = self.face.get(&face_index) {
            return Some(winding.clone());
        }
        let face = data.faces.get(face_index)?;
        let mut points = Vec::with_capacity(face.num_edges.max(0) as usize);
        for i in 0..face.num_edges.max(0) as usize {
            let surf_edge = *data.surf_edges.get(face.first_edge as usize + i)?;
            let edge = data.edges.get(surf_edge.unsigned_abs() as usize)?;
            // negative surfedges traverse the edge backwards
            let vertex = if surf_edge >= 0 {
                edge.vertices[0]
            } else {
                edge.vertices[1]
            };
            points.push(*data.vertices.get(vertex as usize)?);
        }
        let winding = Winding::from_points(points);
        self.face.insert(face_index, winding.clone());
        Some(winding)
    }

    /// The polygon of an areaportal, straight from the clip portal vertices.
    pub fn from_areaportal(&mut self, data: &BspData, portal_index: usize) -> Option<Winding> {
        if let Some(winding) = self.areaportal.get(&portal_index) {
            return Some(winding.clone());
        }
        let portal = data.areaportals.get(portal_index)?;
        let first = portal.first_clip_portal_vert as usize;
        let count = portal.clip_portal_verts as usize;
        let points = data.clip_portal_vertices.get(first..first + count)?.to_vec();
        let winding = Winding::from_points(points);
        self.areaportal.insert(portal_index, winding.clone());
        Some(winding)
    }

    /// The face polygon of one brush side: the base polygon of its plane cut
    /// down by the flipped planes of every other side of the brush.
    pub fn from_brush_side(
        &mut self,
        data: &BspData,
        brush_index: usize,
        side_index: usize,
    ) -> BspResult<Winding> {
        if let Some(winding) = self.brush_side.get(&(brush_index, side_index)) {
            return Ok(winding.clone());
        }

        let brush = data
            .brushes
            .get(brush_index)
            .ok_or(BspError::MalformedBrush {
                brush: brush_index,
                side: side_index,
            })?;
        let first = brush.first_side.max(0) as usize;
        let side_range = first..first + brush.num_sides.max(0) as usize;
        if !side_range.contains(&side_index) {
            return Err(BspError::MalformedBrush {
                brush: brush_index,
                side: side_index,
            });
        }

        let side = &data.brush_sides[side_index];
        let plane = data
            .plane(side.plane_num)
            .ok_or(BspError::MalformedBrush {
                brush: brush_index,
                side: side_index,
            })?;

        let mut winding = Winding::base_for_plane(&plane, self.max_coord);
        for other_index in side_range {
            if other_index == side_index {
                continue;
            }
            let Some(other) = data.brush_sides.get(other_index) else {
                return Err(BspError::MalformedBrush {
                    brush: brush_index,
                    side: other_index,
                });
            };
            if other.bevel {
                continue;
            }
            let Some(other_plane) = data.plane(other.plane_num) else {
                warn!(
                    brush = brush_index,
                    side = other_index,
                    plane = other.plane_num,
                    "brush side references missing plane"
                );
                continue;
            };
            winding = winding.clip(&other_plane.flipped(), false);
            if winding.is_empty() {
                break;
            }
        }

        self.brush_side
            .insert((brush_index, side_index), winding.clone());
        Ok(winding)
    }
}

/// Contiguous run of brushes owned by one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrushRange {
    pub first: usize,
    pub count: usize,
}

impl BrushRange {
    pub fn indices(self) -> std::ops::Range<usize> {
        self.first..self.first + self.count
    }
}

#[derive(Default)]
struct RangeAcc {
    bounds: Option<(usize, usize)>,
}

impl RangeAcc {
    fn add(&mut self, index: usize) {
        self.bounds = Some(match self.bounds {
            Some((min, max)) => (min.min(index), max.max(index)),
            None => (index, index),
        });
    }
}

/// Walk each model's bsp tree and derive the brush range it owns. The world
/// model claims every brush up to its highest leaf brush.
pub fn model_brush_ranges(data: &BspData) -> Vec<Option<BrushRange>> {
    data.models
        .iter()
        .enumerate()
        .map(|(index, model)| {
            let mut acc = RangeAcc::default();
            walk_node(data, model.head_node, &mut acc);
            acc.bounds.map(|(min, max)| {
                if index == 0 {
                    // world brush count is the last world leaf brush plus one
                    BrushRange {
                        first: 0,
                        count: max + 1,
                    }
                } else {
                    BrushRange {
                        first: min,
                        count: max - min + 1,
                    }
                }
            })
        })
        .collect()
}

fn walk_node(data: &BspData, node: i32, acc: &mut RangeAcc) {
    if node >= 0 {
        let Some(node) = data.nodes.get(node as usize) else {
            warn!(node, "node index out of bounds");
            return;
        };
        walk_node(data, node.children[0], acc);
        walk_node(data, node.children[1], acc);
        return;
    }

    let leaf_index = (-node - 1) as usize;
    let Some(leaf) = data.leaves.get(leaf_index) else {
        warn!(leaf = leaf_index, "leaf index out of bounds");
        return;
    };
    for i in 0..leaf.num_leaf_brushes as usize {
        let index = leaf.first_leaf_brush as usize + i;
        match data.leaf_brushes.get(index) {
            Some(&brush) => acc.add(brush as usize),
            None => warn!(leaf = leaf_index, index, "leaf brush index out of bounds"),
        }
    }
}

/// Turns compiled brushes back into editor solids.
pub struct BrushReconstructor<'a, T: TextureBuilder> {
    data: &'a BspData,
    textures: &'a T,
    policy: BrushPolicy,
    windings: WindingFactory,
    ranges: Vec<Option<BrushRange>>,
    smoothing_by_plane: AHashMap<u32, u32>,
    next_solid_id: i32,
    next_side_id: i32,
    brush_to_id: AHashMap<usize, i32>,
    side_to_id: AHashMap<usize, i32>,
}

impl<'a, T: TextureBuilder> BrushReconstructor<'a, T> {
    pub fn new(data: &'a BspData, textures: &'a T, policy: BrushPolicy, app: AppId) -> Self {
        BrushReconstructor {
            data,
            textures,
            policy,
            windings: WindingFactory::new(app.max_coord()),
            ranges: model_brush_ranges(data),
            smoothing_by_plane: data.smoothing_by_plane(),
            next_solid_id: 1,
            next_side_id: 1,
            brush_to_id: AHashMap::new(),
            side_to_id: AHashMap::new(),
        }
    }

    pub fn windings(&mut self) -> &mut WindingFactory {
        &mut self.windings
    }

    /// Brush ranges per model, from the tree walk.
    pub fn ranges(&self) -> &[Option<BrushRange>] {
        &self.ranges
    }

    /// Emit every world brush (model 0). Returns the number of solids
    /// written.
    pub fn write_brushes(&mut self, sink: &mut dyn SolidSink) -> BspResult<usize> {
        let Some(world) = self.ranges.first().copied().flatten() else {
            debug!("map has no world model brushes");
            return Ok(0);
        };
        let mut written = 0;
        for brush_index in world.indices() {
            if self.write_brush(brush_index, None, sink)? {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Emit the brushes of one sub model, applying the instance transform
    /// to every winding.
    pub fn write_model(
        &mut self,
        model_index: usize,
        origin: Vector,
        angles: Vector,
        sink: &mut dyn SolidSink,
    ) -> BspResult<usize> {
        let Some(range) = self.ranges.get(model_index).copied().flatten() else {
            warn!(model = model_index, "invalid model index");
            return Ok(0);
        };
        let transform = Some((origin, angles));
        let mut written = 0;
        for brush_index in range.indices() {
            if self.write_brush(brush_index, transform, sink)? {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Emit a single brush. Returns false when the brush was rejected.
    pub fn write_brush(
        &mut self,
        brush_index: usize,
        transform: Option<(Vector, Vector)>,
        sink: &mut dyn SolidSink,
    ) -> BspResult<bool> {
        let Some(brush) = self.data.brushes.get(brush_index) else {
            warn!(brush = brush_index, "brush index out of bounds");
            return Ok(false);
        };
        if !self.policy.accepts(brush.contents) {
            debug!(brush = brush_index, contents = ?brush.contents, "brush excluded by policy");
            return Ok(false);
        }
        if brush.first_side < 0 || brush.num_sides < 0 {
            warn!(brush = brush_index, "brush with negative side range");
            return Ok(false);
        }

        let first = brush.first_side as usize;
        let mut kept = Vec::with_capacity(brush.num_sides as usize);
        for side_index in first..first + brush.num_sides as usize {
            let Some(side) = self.data.brush_sides.get(side_index) else {
                warn!(brush = brush_index, side = side_index, "brush side out of bounds");
                break;
            };
            if side.bevel {
                continue;
            }

            let winding = self
                .windings
                .from_brush_side(self.data, brush_index, side_index)?
                .remove_degenerate();
            if let Some(reason) = reject_reason(&winding, self.windings.max_coord) {
                warn!(brush = brush_index, side = side_index, reason, "skipping brush side");
                continue;
            }

            let winding = match transform {
                Some((origin, angles)) => winding.rotated(angles).translated(origin),
                None => winding,
            };
            kept.push((side_index, winding));
        }

        if kept.len() < 3 {
            warn!(
                brush = brush_index,
                sides = kept.len(),
                "skipping brush with fewer than 3 valid sides"
            );
            return Ok(false);
        }

        let solid_id = self.next_solid_id();
        self.brush_to_id.insert(brush_index, solid_id);

        let mut sides = Vec::with_capacity(kept.len());
        for (side_index, winding) in kept {
            let Some(plane_points) = winding.build_plane() else {
                // already validated, a transform cannot merge points
                warn!(brush = brush_index, side = side_index, "degenerate side after transform");
                continue;
            };
            let id = self.next_side_id();
            self.side_to_id.insert(side_index, id);

            let [e1, e2, e3] = plane_points;
            let normal = (e2 - e1).cross(e3 - e1).normalized();
            let (u_axis, v_axis) = self.textures.axes(self.data, side_index);
            sides.push(Side {
                id,
                side_index,
                plane_points,
                normal,
                material: self.textures.material(self.data, side_index),
                u_axis,
                v_axis,
                smoothing_groups: self
                    .smoothing_by_plane
                    .get(&self.data.brush_sides[side_index].plane_num)
                    .copied()
                    .unwrap_or(0),
            });
        }

        sink.write_solid(&Solid {
            id: solid_id,
            brush_index,
            sides,
        })?;
        Ok(true)
    }

    /// The solid id a brush was emitted as, if it was accepted.
    pub fn brush_id_for_index(&self, brush_index: usize) -> Option<i32> {
        self.brush_to_id.get(&brush_index).copied()
    }

    pub fn side_id_for_index(&self, side_index: usize) -> Option<i32> {
        self.side_to_id.get(&side_index).copied()
    }

    fn next_solid_id(&mut self) -> i32 {
        let id = self.next_solid_id;
        self.next_solid_id += 1;
        id
    }

    fn next_side_id(&mut self) -> i32 {
        let id = self.next_side_id;
        self.next_side_id += 1;
        id
    }
}

fn reject_reason(winding: &Winding, max_coord: f32) -> Option<&'static str> {
    if winding.is_empty() {
        return Some("no vertices");
    }
    if winding.len() < 3 {
        return Some("fewer than 3 vertices");
    }
    if winding.is_huge(max_coord) {
        return Some("too big");
    }
    match winding.build_plane() {
        None => Some("duplicate plane points"),
        Some(points) if points.iter().any(|p| !p.is_valid()) => Some("invalid plane"),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BrushSide, DBrush, DModel, DPlane, Leaf};
    use crate::geom::Vector;

    fn dplane(x: f32, y: f32, z: f32, dist: f32) -> DPlane {
        DPlane {
            normal: Vector::new(x, y, z),
            dist,
            axis_type: 0,
        }
    }

    fn side(plane_num: u32) -> BrushSide {
        BrushSide {
            plane_num,
            tex_info: 0,
            disp_info: -1,
            bevel: false,
        }
    }

    fn model(head_node: i32) -> DModel {
        DModel {
            mins: Vector::ZERO,
            maxs: Vector::ZERO,
            origin: Vector::ZERO,
            head_node,
            first_face: 0,
            num_faces: 0,
        }
    }

    fn leaf(first_leaf_brush: u16, num_leaf_brushes: u16) -> Leaf {
        Leaf {
            contents: 0,
            cluster: 0,
            first_leaf_face: 0,
            num_leaf_faces: 0,
            first_leaf_brush,
            num_leaf_brushes,
        }
    }

    /// A unit cube brush at the origin and a degenerate two sided brush.
    fn cube_and_degenerate() -> BspData {
        BspData {
            planes: vec![
                dplane(1.0, 0.0, 0.0, 1.0),
                dplane(-1.0, 0.0, 0.0, 0.0),
                dplane(0.0, 1.0, 0.0, 1.0),
                dplane(0.0, -1.0, 0.0, 0.0),
                dplane(0.0, 0.0, 1.0, 1.0),
                dplane(0.0, 0.0, -1.0, 0.0),
            ],
            brushes: vec![
                DBrush {
                    first_side: 0,
                    num_sides: 6,
                    contents: BrushContents::SOLID,
                },
                DBrush {
                    first_side: 6,
                    num_sides: 2,
                    contents: BrushContents::SOLID,
                },
            ],
            brush_sides: vec![
                side(0),
                side(1),
                side(2),
                side(3),
                side(4),
                side(5),
                // degenerate brush reuses two cube planes
                side(0),
                side(1),
            ],
            models: vec![model(-1)],
            leaves: vec![leaf(0, 2)],
            leaf_brushes: vec![0, 1],
            ..BspData::default()
        }
    }

    #[test]
    fn cube_reconstructs_with_six_quad_sides() {
        let data = cube_and_degenerate();
        let textures = WorldAlignedTextures;
        let mut writer =
            BrushReconstructor::new(&data, &textures, BrushPolicy::default(), AppId::UNKNOWN);

        let mut winding_sizes = Vec::new();
        for side_index in 0..6 {
            let winding = writer
                .windings()
                .from_brush_side(&data, 0, side_index)
                .unwrap()
                .remove_degenerate();
            assert!(!winding.is_huge(AppId::UNKNOWN.max_coord()));
            winding_sizes.push(winding.len());
        }
        assert_eq!(winding_sizes, vec![4; 6]);
    }

    #[test]
    fn world_emission_accepts_cube_and_rejects_degenerate() {
        let data = cube_and_degenerate();
        let textures = WorldAlignedTextures;
        let mut writer =
            BrushReconstructor::new(&data, &textures, BrushPolicy::default(), AppId::UNKNOWN);

        let mut solids: Vec<Solid> = Vec::new();
        let written = writer.write_brushes(&mut solids).unwrap();

        assert_eq!(written, 1);
        assert_eq!(solids.len(), 1);
        assert_eq!(solids[0].sides.len(), 6);
        for side in &solids[0].sides {
            assert!((side.normal.length() - 1.0).abs() < 1e-4);
        }

        // index to id mapping covers exactly the accepted brushes
        assert_eq!(writer.brush_id_for_index(0), Some(solids[0].id));
        assert_eq!(writer.brush_id_for_index(1), None);
        let side_ids: Vec<_> = solids[0]
            .sides
            .iter()
            .map(|side| writer.side_id_for_index(side.side_index).unwrap())
            .collect();
        assert_eq!(side_ids.len(), 6);
    }

    #[test]
    fn foreign_side_is_malformed() {
        let data = cube_and_degenerate();
        let mut windings = WindingFactory::new(AppId::UNKNOWN.max_coord());
        // side 6 belongs to the second brush
        assert!(matches!(
            windings.from_brush_side(&data, 0, 6),
            Err(BspError::MalformedBrush { brush: 0, side: 6 })
        ));
    }

    #[test]
    fn bevel_sides_are_skipped() {
        // a unit cube with one extra bevel side appended
        let mut data = cube_and_degenerate();
        data.brush_sides = vec![
            side(0),
            side(1),
            side(2),
            side(3),
            side(4),
            side(5),
            BrushSide {
                bevel: true,
                ..side(0)
            },
        ];
        data.brushes = vec![DBrush {
            first_side: 0,
            num_sides: 7,
            contents: BrushContents::SOLID,
        }];
        data.leaves = vec![leaf(0, 1)];
        data.leaf_brushes = vec![0];

        let textures = WorldAlignedTextures;
        let mut writer =
            BrushReconstructor::new(&data, &textures, BrushPolicy::default(), AppId::UNKNOWN);
        let mut solids: Vec<Solid> = Vec::new();
        writer.write_brush(0, None, &mut solids).unwrap();
        assert_eq!(solids[0].sides.len(), 6);
    }

    #[test]
    fn policy_excludes_areaportal_brushes() {
        let mut data = cube_and_degenerate();
        data.brushes[0].contents = BrushContents::AREAPORTAL;

        let textures = WorldAlignedTextures;
        let mut writer =
            BrushReconstructor::new(&data, &textures, BrushPolicy::default(), AppId::UNKNOWN);
        let mut solids: Vec<Solid> = Vec::new();
        assert!(!writer.write_brush(0, None, &mut solids).unwrap());
        assert!(solids.is_empty());
    }

    #[test]
    fn model_transform_moves_the_solid() {
        let data = cube_and_degenerate();
        let textures = WorldAlignedTextures;
        let mut writer =
            BrushReconstructor::new(&data, &textures, BrushPolicy::default(), AppId::UNKNOWN);

        let mut solids: Vec<Solid> = Vec::new();
        let origin = Vector::new(128.0, 0.0, 64.0);
        writer
            .write_brush(0, Some((origin, Vector::ZERO)), &mut solids)
            .unwrap();
        for side in &solids[0].sides {
            for point in side.plane_points {
                assert!(point.x >= 127.9 && point.x <= 129.1);
                assert!(point.z >= 63.9 && point.z <= 65.1);
            }
        }

        // a model index past the table is a warning, not an error
        let written = writer
            .write_model(5, Vector::ZERO, Vector::ZERO, &mut solids)
            .unwrap();
        assert_eq!(written, 0);
    }

    #[test]
    fn tree_walk_assigns_world_range() {
        let data = cube_and_degenerate();
        let ranges = model_brush_ranges(&data);
        assert_eq!(
            ranges,
            vec![Some(BrushRange { first: 0, count: 2 })]
        );
    }

    #[test]
    fn tree_walk_descends_inner_nodes() {
        use crate::data::DNode;

        let mut data = cube_and_degenerate();
        data.nodes = vec![DNode {
            plane_num: 0,
            children: [-1, -2],
            mins: [0; 3],
            maxs: [0; 3],
            first_face: 0,
            num_faces: 0,
            area: 0,
            padding: 0,
        }];
        data.leaves = vec![leaf(0, 1), leaf(1, 1)];
        data.models = vec![model(0), model(-2)];

        let ranges = model_brush_ranges(&data);
        assert_eq!(ranges[0], Some(BrushRange { first: 0, count: 2 }));
        // sub model ranges keep their own lower bound
        assert_eq!(ranges[1], Some(BrushRange { first: 1, count: 1 }));
    }

    #[test]
    fn face_windings_follow_the_surfedge_indirection() {
        use crate::data::{DEdge, DFace};

        fn face(first_edge: i32, num_edges: i16) -> DFace {
            DFace {
                plane_num: 0,
                side: 0,
                on_node: 0,
                first_edge,
                num_edges,
                tex_info: 0,
                disp_info: -1,
                surface_fog_volume_id: -1,
                styles: [0; 4],
                light_ofs: -1,
                area: 0.0,
                lightmap_mins: [0; 2],
                lightmap_size: [0; 2],
                orig_face: -1,
                num_prims: 0,
                first_prim_id: 0,
                smoothing_groups: 0,
            }
        }

        let mut data = cube_and_degenerate();
        data.vertices = vec![
            Vector::new(0.0, 0.0, 0.0),
            Vector::new(64.0, 0.0, 0.0),
            Vector::new(64.0, 64.0, 0.0),
            Vector::new(0.0, 64.0, 0.0),
        ];
        data.edges = vec![
            DEdge { vertices: [0, 1] },
            DEdge { vertices: [1, 2] },
            DEdge { vertices: [3, 2] },
            DEdge { vertices: [3, 0] },
        ];
        // the third edge is traversed backwards
        data.surf_edges = vec![0, 1, -2, 3];
        data.faces = vec![face(0, 4)];

        let mut windings = WindingFactory::new(AppId::UNKNOWN.max_coord());
        let winding = windings.from_face(&data, 0).unwrap();
        assert_eq!(
            winding.points(),
            &[
                Vector::new(0.0, 0.0, 0.0),
                Vector::new(64.0, 0.0, 0.0),
                Vector::new(64.0, 64.0, 0.0),
                Vector::new(0.0, 64.0, 0.0),
            ]
        );
        // repeated lookups come from the cache
        assert_eq!(windings.from_face(&data, 0).unwrap().len(), 4);
    }

    #[test]
    fn areaportal_windings_come_from_clip_portal_vertices() {
        use crate::data::DAreaportal;

        let mut data = cube_and_degenerate();
        data.clip_portal_vertices = vec![
            Vector::new(0.0, 0.0, 0.0),
            Vector::new(0.0, 64.0, 0.0),
            Vector::new(0.0, 64.0, 64.0),
            Vector::new(0.0, 0.0, 64.0),
        ];
        data.areaportals = vec![DAreaportal {
            portal_key: 1,
            other_area: 1,
            first_clip_portal_vert: 0,
            clip_portal_verts: 4,
            plane_num: 0,
        }];

        let mut windings = WindingFactory::new(AppId::UNKNOWN.max_coord());
        let winding = windings.from_areaportal(&data, 0).unwrap();
        assert_eq!(winding.len(), 4);
        assert!(windings.from_areaportal(&data, 1).is_none());
    }
}
