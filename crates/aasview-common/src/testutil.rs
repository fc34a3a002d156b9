// testutil.rs — in-memory AAS fixtures for tests
//
// AasBuilder assembles the lumps of a small file from polygons, sharing
// vertexes and edges between faces the way the area compiler does.
// RawLumps lays the lumps out as bytes behind an encrypted header.

use std::collections::HashMap;

use crate::aas_shared::{bounds_of, unmap_axes, Vec3, VEC3_ORIGIN};
use crate::aasfiles::{
    AasArea, AasAreaSettings, AasBBox, AasCluster, AasEdge, AasFace, AasHeader, AasNode,
    AasPlane, AasPortal, AasReachability, AreaContents, AreaFlags, FaceFlags, Lump, LumpType,
    AASID, AASVERSION, HEADER_CRYPT_OFFSET, HEADER_CRYPT_SIZE, HEADER_LUMPS, HEADER_SIZE,
};
use crate::aasload::{header_key, xor_crypt, AasFile};

pub struct AasBuilder {
    pub bspchecksum: u32,
    pub bboxes: Vec<AasBBox>,
    pub vertexes: Vec<Vec3>,
    pub planes: Vec<AasPlane>,
    pub edges: Vec<AasEdge>,
    pub edge_indexes: Vec<i32>,
    pub faces: Vec<AasFace>,
    pub area_settings: Vec<AasAreaSettings>,
    pub reachabilities: Vec<AasReachability>,
    pub nodes: Vec<AasNode>,
    pub portals: Vec<AasPortal>,
    pub portal_indexes: Vec<i32>,
    pub clusters: Vec<AasCluster>,
    /// Signed face numbers per area, in the order they were added.
    area_face_ids: Vec<Vec<i32>>,
    vertex_lookup: HashMap<[u32; 3], i32>,
    edge_lookup: HashMap<(i32, i32), i32>,
}

impl Default for AasBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AasBuilder {
    /// An empty file holding only the dummy record 0 of each indexed lump.
    pub fn new() -> Self {
        Self {
            bspchecksum: 0x1234_5678,
            bboxes: Vec::new(),
            vertexes: vec![VEC3_ORIGIN],
            planes: Vec::new(),
            edges: vec![AasEdge::default()],
            edge_indexes: vec![0],
            faces: vec![AasFace::default()],
            area_settings: vec![AasAreaSettings::default()],
            reachabilities: Vec::new(),
            nodes: vec![AasNode::default()],
            portals: vec![AasPortal::default()],
            portal_indexes: Vec::new(),
            clusters: vec![AasCluster::default()],
            area_face_ids: vec![Vec::new()],
            vertex_lookup: HashMap::new(),
            edge_lookup: HashMap::new(),
        }
    }

    pub fn add_area(&mut self, areaflags: AreaFlags, contents: AreaContents) -> i32 {
        self.area_settings.push(AasAreaSettings {
            contents,
            areaflags,
            cluster: 1,
            ..Default::default()
        });
        self.area_face_ids.push(Vec::new());
        (self.area_settings.len() - 1) as i32
    }

    pub fn add_vertex(&mut self, v: Vec3) -> i32 {
        let key = v.map(f32::to_bits);
        if let Some(&n) = self.vertex_lookup.get(&key) {
            return n;
        }
        self.vertexes.push(v);
        let n = (self.vertexes.len() - 1) as i32;
        self.vertex_lookup.insert(key, n);
        n
    }

    /// Signed number of the edge running `v1 -> v2`, creating it if needed.
    pub fn add_edge(&mut self, v1: i32, v2: i32) -> i32 {
        if let Some(&n) = self.edge_lookup.get(&(v1, v2)) {
            return n;
        }
        if let Some(&n) = self.edge_lookup.get(&(v2, v1)) {
            return -n;
        }
        self.edges.push(AasEdge { v1, v2 });
        let n = (self.edges.len() - 1) as i32;
        self.edge_lookup.insert((v1, v2), n);
        n
    }

    /// Add a face from its ordered corners. The face is listed in the front
    /// area with a positive number and in the back area with a negative one.
    pub fn add_polygon(&mut self, points: &[Vec3], faceflags: FaceFlags, front: i32, back: i32) -> i32 {
        let verts: Vec<i32> = points.iter().map(|p| self.add_vertex(*p)).collect();
        let firstedge = self.edge_indexes.len() as i32;
        for i in 0..verts.len() {
            let e = self.add_edge(verts[i], verts[(i + 1) % verts.len()]);
            self.edge_indexes.push(e);
        }
        self.faces.push(AasFace {
            planenum: 0,
            faceflags,
            numedges: verts.len() as i32,
            firstedge,
            frontarea: front,
            backarea: back,
        });
        let facenum = (self.faces.len() - 1) as i32;
        if front > 0 {
            self.area_face_ids[front as usize].push(facenum);
        }
        if back > 0 {
            self.area_face_ids[back as usize].push(-facenum);
        }
        facenum
    }

    /// Assemble the lumps, deriving the face index and area lumps.
    pub fn file(&self) -> AasFile {
        let mut face_indexes = vec![0];
        let mut areas = vec![AasArea::default()];
        for (areanum, ids) in self.area_face_ids.iter().enumerate().skip(1) {
            let firstface = face_indexes.len() as i32;
            face_indexes.extend_from_slice(ids);

            let mut points: Vec<Vec3> = Vec::new();
            for id in ids {
                let face = &self.faces[id.unsigned_abs() as usize];
                let first = face.firstedge as usize;
                for e in &self.edge_indexes[first..first + face.numedges as usize] {
                    let edge = &self.edges[e.unsigned_abs() as usize];
                    points.push(self.vertexes[edge.v1 as usize]);
                }
            }
            let (mins, maxs) = bounds_of(points.iter()).unwrap_or((VEC3_ORIGIN, VEC3_ORIGIN));
            let center = [
                (mins[0] + maxs[0]) * 0.5,
                (mins[1] + maxs[1]) * 0.5,
                (mins[2] + maxs[2]) * 0.5,
            ];
            areas.push(AasArea {
                areanum: areanum as i32,
                numfaces: ids.len() as i32,
                firstface,
                mins,
                maxs,
                center,
            });
        }

        AasFile {
            header: AasHeader {
                version: AASVERSION,
                bspchecksum: self.bspchecksum,
                lumps: [Lump::default(); HEADER_LUMPS],
            },
            bboxes: self.bboxes.clone(),
            vertexes: self.vertexes.clone(),
            planes: self.planes.clone(),
            edges: self.edges.clone(),
            edge_indexes: self.edge_indexes.clone(),
            faces: self.faces.clone(),
            face_indexes,
            areas,
            area_settings: self.area_settings.clone(),
            reachabilities: self.reachabilities.clone(),
            nodes: self.nodes.clone(),
            portals: self.portals.clone(),
            portal_indexes: self.portal_indexes.clone(),
            clusters: self.clusters.clone(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        RawLumps::from_file(&self.file()).to_bytes()
    }
}

// ============================================================
// Byte layout
// ============================================================

/// Encoded lump payloads plus an optional directory override per lump.
pub struct RawLumps {
    pub bspchecksum: u32,
    pub payloads: Vec<Vec<u8>>,
    overrides: HashMap<LumpType, Lump>,
}

impl RawLumps {
    pub fn from_file(file: &AasFile) -> Self {
        let mut payloads = vec![Vec::new(); HEADER_LUMPS];
        for b in &file.bboxes {
            let p = &mut payloads[LumpType::Boxes as usize];
            put_i32(p, b.presencetype);
            put_i32(p, b.flags);
            put_vec3(p, &b.mins);
            put_vec3(p, &b.maxs);
        }
        for v in &file.vertexes {
            put_vec3(&mut payloads[LumpType::Vertexes as usize], v);
        }
        for pl in &file.planes {
            let p = &mut payloads[LumpType::Planes as usize];
            put_vec3(p, &pl.normal);
            put_f32(p, pl.dist);
            put_i32(p, pl.plane_type);
        }
        for e in &file.edges {
            let p = &mut payloads[LumpType::Edges as usize];
            put_i32(p, e.v1);
            put_i32(p, e.v2);
        }
        for &i in &file.edge_indexes {
            put_i32(&mut payloads[LumpType::EdgeIndex as usize], i);
        }
        for f in &file.faces {
            let p = &mut payloads[LumpType::Faces as usize];
            put_i32(p, f.planenum);
            put_u32(p, f.faceflags.bits());
            put_i32(p, f.numedges);
            put_i32(p, f.firstedge);
            put_i32(p, f.frontarea);
            put_i32(p, f.backarea);
        }
        for &i in &file.face_indexes {
            put_i32(&mut payloads[LumpType::FaceIndex as usize], i);
        }
        for a in &file.areas {
            let p = &mut payloads[LumpType::Areas as usize];
            put_i32(p, a.areanum);
            put_i32(p, a.numfaces);
            put_i32(p, a.firstface);
            put_vec3(p, &a.mins);
            put_vec3(p, &a.maxs);
            put_vec3(p, &a.center);
        }
        for s in &file.area_settings {
            let p = &mut payloads[LumpType::AreaSettings as usize];
            put_u32(p, s.contents.bits());
            put_u32(p, s.areaflags.bits());
            put_i32(p, s.presencetype);
            put_i32(p, s.cluster);
            put_i32(p, s.clusterareanum);
            put_i32(p, s.numreachableareas);
            put_i32(p, s.firstreachablearea);
        }
        for r in &file.reachabilities {
            let p = &mut payloads[LumpType::Reachability as usize];
            put_i32(p, r.areanum);
            put_i32(p, r.facenum);
            put_i32(p, r.edgenum);
            put_vec3(p, &r.start);
            put_vec3(p, &r.end);
            put_u32(p, r.traveltype.to_raw() | r.travelflags.bits());
            p.extend_from_slice(&r.traveltime.to_le_bytes());
            p.extend_from_slice(&[0, 0]);
        }
        for n in &file.nodes {
            let p = &mut payloads[LumpType::Nodes as usize];
            put_i32(p, n.planenum);
            put_i32(p, n.children[0]);
            put_i32(p, n.children[1]);
        }
        for po in &file.portals {
            let p = &mut payloads[LumpType::Portals as usize];
            put_i32(p, po.areanum);
            put_i32(p, po.frontcluster);
            put_i32(p, po.backcluster);
            put_i32(p, po.clusterareanum[0]);
            put_i32(p, po.clusterareanum[1]);
        }
        for &i in &file.portal_indexes {
            put_i32(&mut payloads[LumpType::PortalIndex as usize], i);
        }
        for c in &file.clusters {
            let p = &mut payloads[LumpType::Clusters as usize];
            put_i32(p, c.numareas);
            put_i32(p, c.numreachabilityareas);
            put_i32(p, c.numportals);
            put_i32(p, c.firstportal);
        }

        Self {
            bspchecksum: file.header.bspchecksum,
            payloads,
            overrides: HashMap::new(),
        }
    }

    /// Write `lump` into the directory instead of the real location.
    pub fn override_lump(&mut self, ty: LumpType, lump: Lump) {
        self.overrides.insert(ty, lump);
    }

    /// Append raw bytes to a lump payload.
    pub fn extend_lump(&mut self, ty: LumpType, bytes: &[u8]) {
        self.payloads[ty as usize].extend_from_slice(bytes);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.extend_from_slice(&AASID);
        put_u32(&mut out, AASVERSION);
        out.resize(HEADER_SIZE, 0);

        let mut directory = Vec::with_capacity(HEADER_CRYPT_SIZE);
        put_u32(&mut directory, self.bspchecksum);
        for ty in LumpType::ALL {
            let payload = &self.payloads[ty as usize];
            let lump = Lump {
                fileofs: out.len() as u32,
                filelen: payload.len() as u32,
            };
            out.extend_from_slice(payload);
            let lump = self.overrides.get(&ty).copied().unwrap_or(lump);
            put_u32(&mut directory, lump.fileofs);
            put_u32(&mut directory, lump.filelen);
        }
        xor_crypt(&mut directory, &header_key(HEADER_CRYPT_SIZE));
        out[HEADER_CRYPT_OFFSET..HEADER_SIZE].copy_from_slice(&directory);
        out
    }
}

fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_vec3(out: &mut Vec<u8>, v: &Vec3) {
    for f in unmap_axes(v) {
        put_f32(out, f);
    }
}
