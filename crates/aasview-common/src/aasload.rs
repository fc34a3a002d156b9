// aasload.rs — AAS file loading

use std::time::Instant;

use log::{debug, warn};
use rayon::prelude::*;

use crate::aas_shared::{remap_axes, Vec3};
use crate::aasfiles::{
    AasArea, AasAreaSettings, AasBBox, AasCluster, AasEdge, AasFace, AasHeader, AasNode,
    AasPlane, AasPortal, AasReachability, AreaContents, AreaFlags, FaceFlags, Lump, LumpType,
    TravelFlags, TravelType, AASID, AASVERSION, HEADER_CRYPT_OFFSET, HEADER_CRYPT_SIZE,
    HEADER_LUMPS, HEADER_SIZE, TRAVELTYPE_MASK,
};
use crate::error::{AasError, AasResult};

/// Lumps with at least this many records are parsed on the rayon pool.
pub const PARALLEL_LUMP_THRESHOLD: usize = 64;

// ============================================================
// Loaded file
// ============================================================

/// Every lump of one AAS file. Built once by [`AasFile::parse`] and
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct AasFile {
    pub header: AasHeader,
    pub bboxes: Vec<AasBBox>,
    pub vertexes: Vec<Vec3>,
    pub planes: Vec<AasPlane>,
    pub edges: Vec<AasEdge>,
    /// Signed edge numbers; negative means the edge runs v2 -> v1.
    pub edge_indexes: Vec<i32>,
    pub faces: Vec<AasFace>,
    /// Signed face numbers; negative means the area sits behind the face.
    pub face_indexes: Vec<i32>,
    pub areas: Vec<AasArea>,
    pub area_settings: Vec<AasAreaSettings>,
    pub reachabilities: Vec<AasReachability>,
    pub nodes: Vec<AasNode>,
    pub portals: Vec<AasPortal>,
    pub portal_indexes: Vec<i32>,
    pub clusters: Vec<AasCluster>,
}

impl AasFile {
    /// Decode a complete file.
    pub fn parse(data: &[u8]) -> AasResult<Self> {
        Self::parse_with(data, PARALLEL_LUMP_THRESHOLD)
    }

    /// Decode a complete file, parsing lumps of at least `parallel_threshold`
    /// records in parallel.
    pub fn parse_with(data: &[u8], parallel_threshold: usize) -> AasResult<Self> {
        let start = Instant::now();
        let header = read_header(data)?;

        let loader = LumpLoader {
            data,
            header: &header,
            parallel_threshold,
        };
        let file = AasFile {
            bboxes: loader.load(LumpType::Boxes, read_bbox)?,
            vertexes: loader.load(LumpType::Vertexes, |r| read_vec3(r, 0))?,
            planes: loader.load(LumpType::Planes, read_plane)?,
            edges: loader.load(LumpType::Edges, read_edge)?,
            edge_indexes: loader.load(LumpType::EdgeIndex, |r| read_i32_le(r, 0))?,
            faces: loader.load(LumpType::Faces, read_face)?,
            face_indexes: loader.load(LumpType::FaceIndex, |r| read_i32_le(r, 0))?,
            areas: loader.load(LumpType::Areas, read_area)?,
            area_settings: loader.load(LumpType::AreaSettings, read_area_settings)?,
            reachabilities: loader.load(LumpType::Reachability, read_reachability)?,
            nodes: loader.load(LumpType::Nodes, read_node)?,
            portals: loader.load(LumpType::Portals, read_portal)?,
            portal_indexes: loader.load(LumpType::PortalIndex, |r| read_i32_le(r, 0))?,
            clusters: loader.load(LumpType::Clusters, read_cluster)?,
            header,
        };

        debug!(
            "AAS file loaded in {:.2} ms: {} areas, {} faces, {} edges, {} vertexes, {} reachabilities",
            start.elapsed().as_secs_f64() * 1000.0,
            file.areas.len(),
            file.faces.len(),
            file.edges.len(),
            file.vertexes.len(),
            file.reachabilities.len()
        );
        Ok(file)
    }
}

/// Free-function form of [`AasFile::parse`].
pub fn parse(data: &[u8]) -> AasResult<AasFile> {
    AasFile::parse(data)
}

// ============================================================
// Header
// ============================================================

/// Keystream for the header block: `key[i] = i * 119 mod 256`.
pub fn header_key(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(119) & 0xFF) as u8).collect()
}

/// XOR `data` with `key` in place. Applying it twice restores the input.
pub fn xor_crypt(data: &mut [u8], key: &[u8]) {
    for (b, k) in data.iter_mut().zip(key) {
        *b ^= k;
    }
}

/// Validate ident and version, then decrypt the lump directory.
pub fn read_header(data: &[u8]) -> AasResult<AasHeader> {
    if data.len() < 4 {
        return Err(AasError::Truncated { needed: 4, len: data.len() });
    }
    let found = [data[0], data[1], data[2], data[3]];
    if found != AASID {
        return Err(AasError::BadMagic { found });
    }
    if data.len() < 8 {
        return Err(AasError::Truncated { needed: 8, len: data.len() });
    }
    let version = read_u32_le(data, 4);
    if version != AASVERSION {
        return Err(AasError::UnsupportedVersion {
            found: version,
            expected: AASVERSION,
        });
    }
    if data.len() < HEADER_SIZE {
        return Err(AasError::Truncated {
            needed: HEADER_SIZE,
            len: data.len(),
        });
    }

    let mut block = [0u8; HEADER_CRYPT_SIZE];
    block.copy_from_slice(&data[HEADER_CRYPT_OFFSET..HEADER_SIZE]);
    xor_crypt(&mut block, &header_key(HEADER_CRYPT_SIZE));

    let bspchecksum = read_u32_le(&block, 0);
    let mut lumps = [Lump::default(); HEADER_LUMPS];
    for (i, lump) in lumps.iter_mut().enumerate() {
        let base = 4 + i * 8;
        lump.fileofs = read_u32_le(&block, base);
        lump.filelen = read_u32_le(&block, base + 4);
    }

    Ok(AasHeader {
        version,
        bspchecksum,
        lumps,
    })
}

// ============================================================
// Byte helpers
// ============================================================

pub(crate) fn read_i32_le(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

pub(crate) fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

pub(crate) fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

pub(crate) fn read_f32_le(data: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

/// Three stored floats, converted to the y-up frame.
pub(crate) fn read_vec3(data: &[u8], offset: usize) -> Vec3 {
    remap_axes(
        read_f32_le(data, offset),
        read_f32_le(data, offset + 4),
        read_f32_le(data, offset + 8),
    )
}

// ============================================================
// Lump loaders
// ============================================================

struct LumpLoader<'a> {
    data: &'a [u8],
    header: &'a AasHeader,
    parallel_threshold: usize,
}

impl LumpLoader<'_> {
    /// Slice out one lump and decode it as packed records.
    fn load<T, F>(&self, ty: LumpType, reader: F) -> AasResult<Vec<T>>
    where
        T: Send,
        F: Fn(&[u8]) -> T + Sync + Send,
    {
        let lump = self.header.lump(ty);
        let out_of_bounds = || AasError::LumpOutOfBounds {
            lump: ty,
            offset: lump.fileofs,
            size: lump.filelen,
            len: self.data.len(),
        };
        let start = lump.fileofs as usize;
        let end = start
            .checked_add(lump.filelen as usize)
            .ok_or_else(out_of_bounds)?;
        let bytes = self.data.get(start..end).ok_or_else(out_of_bounds)?;

        let stride = ty.record_size();
        let count = bytes.len() / stride;
        if bytes.len() % stride != 0 {
            warn!(
                "{} lump: funny lump size {} (record size {}), ignoring {} trailing bytes",
                ty,
                bytes.len(),
                stride,
                bytes.len() % stride
            );
        }

        let records: Vec<T> = if count >= self.parallel_threshold {
            bytes.par_chunks_exact(stride).map(&reader).collect()
        } else {
            bytes.chunks_exact(stride).map(&reader).collect()
        };
        debug!("{} lump: {} records", ty, count);
        Ok(records)
    }
}

fn read_bbox(r: &[u8]) -> AasBBox {
    AasBBox {
        presencetype: read_i32_le(r, 0),
        flags: read_i32_le(r, 4),
        mins: read_vec3(r, 8),
        maxs: read_vec3(r, 20),
    }
}

fn read_plane(r: &[u8]) -> AasPlane {
    AasPlane {
        normal: read_vec3(r, 0),
        dist: read_f32_le(r, 12),
        plane_type: read_i32_le(r, 16),
    }
}

fn read_edge(r: &[u8]) -> AasEdge {
    AasEdge {
        v1: read_i32_le(r, 0),
        v2: read_i32_le(r, 4),
    }
}

fn read_face(r: &[u8]) -> AasFace {
    AasFace {
        planenum: read_i32_le(r, 0),
        faceflags: FaceFlags::from_bits_retain(read_u32_le(r, 4)),
        numedges: read_i32_le(r, 8),
        firstedge: read_i32_le(r, 12),
        frontarea: read_i32_le(r, 16),
        backarea: read_i32_le(r, 20),
    }
}

fn read_area(r: &[u8]) -> AasArea {
    AasArea {
        areanum: read_i32_le(r, 0),
        numfaces: read_i32_le(r, 4),
        firstface: read_i32_le(r, 8),
        mins: read_vec3(r, 12),
        maxs: read_vec3(r, 24),
        center: read_vec3(r, 36),
    }
}

fn read_area_settings(r: &[u8]) -> AasAreaSettings {
    AasAreaSettings {
        contents: AreaContents::from_bits_retain(read_u32_le(r, 0)),
        areaflags: AreaFlags::from_bits_retain(read_u32_le(r, 4)),
        presencetype: read_i32_le(r, 8),
        cluster: read_i32_le(r, 12),
        clusterareanum: read_i32_le(r, 16),
        numreachableareas: read_i32_le(r, 20),
        firstreachablearea: read_i32_le(r, 24),
    }
}

fn read_reachability(r: &[u8]) -> AasReachability {
    let raw_type = read_u32_le(r, 36);
    AasReachability {
        areanum: read_i32_le(r, 0),
        facenum: read_i32_le(r, 4),
        edgenum: read_i32_le(r, 8),
        start: read_vec3(r, 12),
        end: read_vec3(r, 24),
        traveltype: TravelType::from_raw(raw_type),
        travelflags: TravelFlags::from_bits_retain(raw_type & !TRAVELTYPE_MASK),
        traveltime: read_u16_le(r, 40),
    }
}

fn read_node(r: &[u8]) -> AasNode {
    AasNode {
        planenum: read_i32_le(r, 0),
        children: [read_i32_le(r, 4), read_i32_le(r, 8)],
    }
}

fn read_portal(r: &[u8]) -> AasPortal {
    AasPortal {
        areanum: read_i32_le(r, 0),
        frontcluster: read_i32_le(r, 4),
        backcluster: read_i32_le(r, 8),
        clusterareanum: [read_i32_le(r, 12), read_i32_le(r, 16)],
    }
}

fn read_cluster(r: &[u8]) -> AasCluster {
    AasCluster {
        numareas: read_i32_le(r, 0),
        numreachabilityareas: read_i32_le(r, 4),
        numportals: read_i32_le(r, 8),
        firstportal: read_i32_le(r, 12),
    }
}

// ============================================================
// Tests
// ============================================================
