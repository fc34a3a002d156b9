// aaspoly.rs — face and edge topology queries over a loaded AAS file
//
// Faces and edges are referenced through signed indexes. The sign is a
// direction flag: a negative face index means the referencing area sits
// behind the face, a negative edge index means the edge runs v2 -> v1.

use std::collections::HashMap;

use log::warn;

use crate::aas_shared::{vector_height, Vec3};
use crate::aasfiles::{AasFace, FaceFlags, LumpType};
use crate::aasload::AasFile;
use crate::error::{AasError, AasResult, LoopFault};

// ============================================================
// Signed references
// ============================================================

/// A signed face or edge number split into storage index and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignedRef {
    pub index: usize,
    pub flipped: bool,
}

impl SignedRef {
    pub fn from_raw(id: i32) -> Self {
        Self {
            index: id.unsigned_abs() as usize,
            flipped: id < 0,
        }
    }

    /// Index 0 of every indexed lump is a placeholder.
    pub fn is_dummy(self) -> bool {
        self.index == 0
    }
}

/// One entry of an area's boundary: the signed number it was referenced by,
/// and the stored face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaFace<'a> {
    pub id: i32,
    pub face: &'a AasFace,
}

impl AreaFace<'_> {
    pub fn index(&self) -> usize {
        SignedRef::from_raw(self.id).index
    }
}

// ============================================================
// Lump slices
// ============================================================

/// Boundary faces of an area, in face index order. References that point
/// outside the face lump are dropped with a warning.
pub fn area_faces(file: &AasFile, areanum: usize) -> Vec<AreaFace<'_>> {
    let Some(area) = file.areas.get(areanum) else {
        return Vec::new();
    };
    index_range(&file.face_indexes, LumpType::FaceIndex, area.firstface, area.numfaces)
        .iter()
        .filter_map(|&id| match file.faces.get(SignedRef::from_raw(id).index) {
            Some(face) => Some(AreaFace { id, face }),
            None => {
                warn!(
                    "area {} references face {} but only {} faces exist",
                    areanum,
                    id,
                    file.faces.len()
                );
                None
            }
        })
        .collect()
}

/// Signed edge numbers bounding a face.
pub fn face_edge_ids<'a>(file: &'a AasFile, face: &AasFace) -> &'a [i32] {
    index_range(&file.edge_indexes, LumpType::EdgeIndex, face.firstedge, face.numedges)
}

/// `indexes[first..first + count]`, cut short at the end of the lump.
fn index_range(indexes: &[i32], lump: LumpType, first: i32, count: i32) -> &[i32] {
    if first < 0 || count <= 0 {
        return &[];
    }
    let first = first as usize;
    let end = first.saturating_add(count as usize);
    if end > indexes.len() {
        warn!(
            "{} range {}..{} runs past {} entries",
            lump,
            first,
            end,
            indexes.len()
        );
    }
    indexes.get(first..end.min(indexes.len())).unwrap_or(&[])
}

/// A copy of `face` whose front area is the area that referenced it as `id`.
pub fn flip_if_needed(id: i32, face: &AasFace) -> AasFace {
    let mut result = *face;
    if SignedRef::from_raw(id).flipped {
        std::mem::swap(&mut result.frontarea, &mut result.backarea);
    }
    result
}

fn face_by_id(file: &AasFile, face_id: i32) -> AasResult<&AasFace> {
    file.faces
        .get(SignedRef::from_raw(face_id).index)
        .ok_or(AasError::FaceOutOfRange {
            face: face_id,
            count: file.faces.len(),
        })
}

fn vertex(file: &AasFile, v: i32) -> AasResult<Vec3> {
    usize::try_from(v)
        .ok()
        .and_then(|i| file.vertexes.get(i))
        .copied()
        .ok_or(AasError::VertexOutOfRange {
            vertex: v,
            count: file.vertexes.len(),
        })
}

/// Vertex numbers of a signed edge, in travel order.
pub fn edge_vertex_nums(file: &AasFile, edge_id: i32) -> AasResult<(i32, i32)> {
    let r = SignedRef::from_raw(edge_id);
    let edge = file.edges.get(r.index).ok_or(AasError::EdgeOutOfRange {
        edge: edge_id,
        count: file.edges.len(),
    })?;
    Ok(if r.flipped {
        (edge.v2, edge.v1)
    } else {
        (edge.v1, edge.v2)
    })
}

/// Endpoints of a signed edge; swapped when the edge number is negative.
pub fn edge_vertices(file: &AasFile, edge_id: i32) -> AasResult<[Vec3; 2]> {
    let (v1, v2) = edge_vertex_nums(file, edge_id)?;
    Ok([vertex(file, v1)?, vertex(file, v2)?])
}

// ============================================================
// Polygon reconstruction
// ============================================================

/// Chain a face's unordered edges into a closed loop of vertex numbers.
///
/// The walk starts at the first edge's leading vertex. A negative face
/// number reverses the loop. Face 0 yields an empty loop.
pub fn face_vertex_loop(file: &AasFile, face_id: i32) -> AasResult<Vec<i32>> {
    if SignedRef::from_raw(face_id).is_dummy() {
        return Ok(Vec::new());
    }
    let face = face_by_id(file, face_id)?;
    let edge_ids = face_edge_ids(file, face);
    let bad_loop = |fault| AasError::BadFaceLoop {
        face: face_id,
        fault,
    };

    let mut next: HashMap<i32, i32> = HashMap::with_capacity(edge_ids.len());
    let mut start = None;
    for &edge_id in edge_ids {
        let (from, to) = edge_vertex_nums(file, edge_id)?;
        if next.insert(from, to).is_some() {
            return Err(bad_loop(LoopFault::DuplicateVertex(from)));
        }
        start.get_or_insert(from);
    }
    let Some(start) = start else {
        return Ok(Vec::new());
    };

    let mut vertex_nums = Vec::with_capacity(next.len());
    let mut current = start;
    vertex_nums.push(current);
    while vertex_nums.len() < next.len() {
        current = *next
            .get(&current)
            .ok_or_else(|| bad_loop(LoopFault::BrokenChain(current)))?;
        if current == start {
            return Err(bad_loop(LoopFault::ClosedEarly));
        }
        vertex_nums.push(current);
    }
    if next.get(&current) != Some(&start) {
        return Err(bad_loop(LoopFault::NotClosed));
    }

    if SignedRef::from_raw(face_id).flipped {
        vertex_nums.reverse();
    }
    Ok(vertex_nums)
}

/// Ordered polygon of a face, as positions.
pub fn face_vertices(file: &AasFile, face_id: i32) -> AasResult<Vec<Vec3>> {
    face_vertex_loop(file, face_id)?
        .into_iter()
        .map(|v| vertex(file, v))
        .collect()
}

/// Endpoint pairs of every edge of a face, for wireframe drawing.
pub fn face_line_segments(file: &AasFile, face_id: i32) -> AasResult<Vec<[Vec3; 2]>> {
    if SignedRef::from_raw(face_id).is_dummy() {
        return Ok(Vec::new());
    }
    let face = face_by_id(file, face_id)?;
    face_edge_ids(file, face)
        .iter()
        .map(|&edge_id| edge_vertices(file, edge_id))
        .collect()
}

// ============================================================
// Adjacency
// ============================================================

pub fn shares_edge(file: &AasFile, face: &AasFace, edgenum: usize) -> bool {
    face_edge_ids(file, face)
        .iter()
        .any(|&e| SignedRef::from_raw(e).index == edgenum)
}

/// Faces of `areanum` that share at least one edge with the face `face_id`,
/// excluding that face itself. Edges are compared regardless of direction.
pub fn touching_faces<'a>(file: &'a AasFile, face_id: i32, areanum: usize) -> Vec<AreaFace<'a>> {
    let portal_index = SignedRef::from_raw(face_id).index;
    let Some(portal) = file.faces.get(portal_index) else {
        return Vec::new();
    };
    let mut portal_edges: Vec<usize> = face_edge_ids(file, portal)
        .iter()
        .map(|&e| SignedRef::from_raw(e).index)
        .collect();
    portal_edges.sort_unstable();

    area_faces(file, areanum)
        .into_iter()
        .filter(|af| af.index() != portal_index)
        .filter(|af| {
            face_edge_ids(file, af.face)
                .iter()
                .any(|&e| portal_edges.binary_search(&SignedRef::from_raw(e).index).is_ok())
        })
        .collect()
}

// ============================================================
// Crease / fold
// ============================================================

/// The edge of a face whose upper endpoint is lowest, and that height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowEdge {
    pub edgenum: usize,
    pub height: f32,
}

/// Lowest edge of a face, measured by each edge's higher endpoint. Ties keep
/// the first edge in edge index order. Edges with unknown vertexes are
/// skipped.
pub fn lowest_edge(file: &AasFile, face: &AasFace) -> Option<LowEdge> {
    let mut best: Option<LowEdge> = None;
    for &edge_id in face_edge_ids(file, face) {
        let Ok([a, b]) = edge_vertices(file, edge_id) else {
            continue;
        };
        let height = vector_height(&a).max(vector_height(&b));
        if best.is_none_or(|low| height < low.height) {
            best = Some(LowEdge {
                edgenum: SignedRef::from_raw(edge_id).index,
                height,
            });
        }
    }
    best
}

#[inline]
pub fn is_ground(face: &AasFace) -> bool {
    face.faceflags.contains(FaceFlags::GROUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aasfiles::{AreaContents, AreaFlags};
    use crate::testutil::AasBuilder;

    /// Unit square on the floor plus a wall rising from its x = 1 side.
    fn floor_and_wall() -> (AasBuilder, i32, i32, i32) {
        let mut b = AasBuilder::new();
        let area = b.add_area(AreaFlags::GROUNDED, AreaContents::empty());
        let floor = b.add_polygon(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
            FaceFlags::GROUND,
            area,
            0,
        );
        let wall = b.add_polygon(
            &[[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 2.0, 0.0], [1.0, 2.0, 1.0]],
            FaceFlags::SOLID,
            area,
            0,
        );
        (b, area, floor, wall)
    }

    #[test]
    fn test_signed_ref() {
        let r = SignedRef::from_raw(-7);
        assert_eq!(r, SignedRef { index: 7, flipped: true });
        assert_eq!(SignedRef::from_raw(3), SignedRef { index: 3, flipped: false });
        assert!(SignedRef::from_raw(0).is_dummy());
        assert!(!r.is_dummy());
    }

    #[test]
    fn test_area_faces_keep_index_order() {
        let (b, area, floor, wall) = floor_and_wall();
        let file = b.file();
        let faces = area_faces(&file, area as usize);
        let ids: Vec<i32> = faces.iter().map(|af| af.id).collect();
        assert_eq!(ids, vec![floor, wall]);
        assert_eq!(faces.len(), file.areas[area as usize].numfaces as usize);
        assert!(area_faces(&file, 99).is_empty());
    }

    #[test]
    fn test_out_of_range_face_references_are_dropped() {
        let (b, area, floor, wall) = floor_and_wall();
        let mut file = b.file();
        // one bad face number, and a count running past the face index lump
        let first = file.areas[area as usize].firstface as usize;
        file.face_indexes[first + 1] = 77;
        file.areas[area as usize].numfaces += 5;
        let ids: Vec<i32> = area_faces(&file, area as usize).iter().map(|af| af.id).collect();
        assert_eq!(ids, vec![floor]);
        assert!(!ids.contains(&wall));
    }

    #[test]
    fn test_edge_range_is_cut_at_lump_end() {
        let (b, _, _, wall) = floor_and_wall();
        let mut file = b.file();
        file.faces[wall as usize].numedges += 3;
        let face = file.faces[wall as usize];
        assert_eq!(face_edge_ids(&file, &face).len(), 4);
    }

    #[test]
    fn test_face_vertex_loop_follows_edges() {
        let (b, _, floor, _) = floor_and_wall();
        let file = b.file();
        let verts = face_vertices(&file, floor).unwrap();
        assert_eq!(
            verts,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]]
        );
    }

    #[test]
    fn test_negated_face_reverses_loop() {
        let (b, _, floor, wall) = floor_and_wall();
        let file = b.file();
        for face in [floor, wall] {
            let forward = face_vertex_loop(&file, face).unwrap();
            let mut backward = face_vertex_loop(&file, -face).unwrap();
            assert_eq!(forward.len(), file.faces[face as usize].numedges as usize);
            backward.reverse();
            assert_eq!(forward, backward);
        }
    }

    #[test]
    fn test_dummy_face_is_empty() {
        let (b, ..) = floor_and_wall();
        let file = b.file();
        assert!(face_vertices(&file, 0).unwrap().is_empty());
        assert!(face_line_segments(&file, 0).unwrap().is_empty());
    }

    #[test]
    fn test_face_out_of_range() {
        let (b, ..) = floor_and_wall();
        let file = b.file();
        let err = face_vertices(&file, 42).unwrap_err();
        assert!(matches!(err, AasError::FaceOutOfRange { face: 42, .. }));
    }

    #[test]
    fn test_open_edge_chain_is_topology_error() {
        let (b, _, floor, _) = floor_and_wall();
        let mut file = b.file();
        // Drop the last edge of the floor: the chain no longer closes.
        file.faces[floor as usize].numedges -= 1;
        let err = face_vertex_loop(&file, floor).unwrap_err();
        assert!(err.is_topology_error());
    }

    #[test]
    fn test_duplicate_edge_is_topology_error() {
        let (b, _, floor, _) = floor_and_wall();
        let mut file = b.file();
        let first = file.faces[floor as usize].firstedge as usize;
        file.edge_indexes[first + 1] = file.edge_indexes[first];
        let err = face_vertex_loop(&file, floor).unwrap_err();
        assert!(matches!(
            err,
            AasError::BadFaceLoop { fault: LoopFault::DuplicateVertex(_), .. }
        ));
    }

    #[test]
    fn test_edge_vertices_honor_sign() {
        let (b, ..) = floor_and_wall();
        let file = b.file();
        let [a, c] = edge_vertices(&file, 1).unwrap();
        let [c2, a2] = edge_vertices(&file, -1).unwrap();
        assert_eq!((a, c), (a2, c2));
        assert!(edge_vertices(&file, 1000).is_err());
    }

    #[test]
    fn test_line_segments_cover_every_edge() {
        let (b, _, _, wall) = floor_and_wall();
        let file = b.file();
        let segs = face_line_segments(&file, wall).unwrap();
        assert_eq!(segs.len(), 4);
        assert!(segs.contains(&[[1.0, 2.0, 0.0], [1.0, 2.0, 1.0]]));
    }

    #[test]
    fn test_flip_if_needed() {
        let face = AasFace {
            frontarea: 1,
            backarea: 2,
            ..Default::default()
        };
        assert_eq!(flip_if_needed(5, &face), face);
        let flipped = flip_if_needed(-5, &face);
        assert_eq!((flipped.frontarea, flipped.backarea), (2, 1));
    }

    #[test]
    fn test_touching_faces_share_an_edge() {
        let (b, area, floor, wall) = floor_and_wall();
        let file = b.file();
        let touching: Vec<i32> = touching_faces(&file, wall, area as usize)
            .iter()
            .map(|af| af.id)
            .collect();
        assert_eq!(touching, vec![floor]);
        let touching: Vec<i32> = touching_faces(&file, -floor, area as usize)
            .iter()
            .map(|af| af.id)
            .collect();
        assert_eq!(touching, vec![wall]);
    }

    #[test]
    fn test_lowest_edge() {
        let (b, _, floor, wall) = floor_and_wall();
        let file = b.file();
        let crease = lowest_edge(&file, &file.faces[wall as usize]).unwrap();
        assert_eq!(crease.height, 0.0);
        assert!(shares_edge(&file, &file.faces[floor as usize], crease.edgenum));
        let fold = lowest_edge(&file, &file.faces[floor as usize]).unwrap();
        assert_eq!(fold.height, 0.0);
    }
}
