// aasfiles.rs — AAS file format structures
//
// Notes on the data, as the bot library writes it:
// - index 0 of the vertex, edge, face, area and node lumps is a dummy
// - a node child of zero is a solid leaf
// - two adjacent convex areas share exactly one face, the portal between them
// - an area referencing a face with a positive index owns the front side;
//   the face plane normal points into it
// - face edges are stored unordered; the sign of an edge index gives its
//   direction within the face
// - an area never mixes ground and gap faces
// - cluster portal areas store the negated portal number as their cluster

use std::fmt;

use crate::aas_shared::Vec3;

// ============================================================
// Header
// ============================================================

/// File magic: "EAAS"
pub const AASID: [u8; 4] = *b"EAAS";
pub const AASVERSION: u32 = 5;

pub const HEADER_LUMPS: usize = 14;

/// The XOR-obfuscated block starts right after ident + version.
pub const HEADER_CRYPT_OFFSET: usize = 8;
/// bspchecksum (4) + HEADER_LUMPS * (offset, size)
pub const HEADER_CRYPT_SIZE: usize = 4 + HEADER_LUMPS * 8;
pub const HEADER_SIZE: usize = HEADER_CRYPT_OFFSET + HEADER_CRYPT_SIZE;

/// Maximum height difference a bot steps up without jumping.
pub const MAX_STEP_HEIGHT: f32 = 18.0;

/// Lump identifiers, in directory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LumpType {
    Boxes = 0,
    Vertexes = 1,
    Planes = 2,
    Edges = 3,
    EdgeIndex = 4,
    Faces = 5,
    FaceIndex = 6,
    Areas = 7,
    AreaSettings = 8,
    Reachability = 9,
    Nodes = 10,
    Portals = 11,
    PortalIndex = 12,
    Clusters = 13,
}

impl LumpType {
    pub const ALL: [LumpType; HEADER_LUMPS] = [
        LumpType::Boxes,
        LumpType::Vertexes,
        LumpType::Planes,
        LumpType::Edges,
        LumpType::EdgeIndex,
        LumpType::Faces,
        LumpType::FaceIndex,
        LumpType::Areas,
        LumpType::AreaSettings,
        LumpType::Reachability,
        LumpType::Nodes,
        LumpType::Portals,
        LumpType::PortalIndex,
        LumpType::Clusters,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LumpType::Boxes => "boxes",
            LumpType::Vertexes => "vertexes",
            LumpType::Planes => "planes",
            LumpType::Edges => "edges",
            LumpType::EdgeIndex => "edgeindex",
            LumpType::Faces => "faces",
            LumpType::FaceIndex => "faceindex",
            LumpType::Areas => "areas",
            LumpType::AreaSettings => "areasettings",
            LumpType::Reachability => "reachability",
            LumpType::Nodes => "nodes",
            LumpType::Portals => "portals",
            LumpType::PortalIndex => "portalindex",
            LumpType::Clusters => "clusters",
        }
    }

    /// On-disk size of one record in this lump.
    pub fn record_size(self) -> usize {
        match self {
            LumpType::Boxes => 32,
            LumpType::Vertexes => 12,
            LumpType::Planes => 20,
            LumpType::Edges => 8,
            LumpType::EdgeIndex | LumpType::FaceIndex | LumpType::PortalIndex => 4,
            LumpType::Faces => 24,
            LumpType::Areas => 48,
            LumpType::AreaSettings => 28,
            // 3 ints, 2 vectors, int traveltype, u16 traveltime, 2 bytes padding
            LumpType::Reachability => 44,
            LumpType::Nodes => 12,
            LumpType::Portals => 20,
            LumpType::Clusters => 16,
        }
    }
}

impl fmt::Display for LumpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded lump directory entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lump {
    pub fileofs: u32,
    pub filelen: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AasHeader {
    pub version: u32,
    /// Checksum of the BSP the file was compiled from. Not validated.
    pub bspchecksum: u32,
    pub lumps: [Lump; HEADER_LUMPS],
}

impl AasHeader {
    pub fn lump(&self, ty: LumpType) -> &Lump {
        &self.lumps[ty as usize]
    }
}

// ============================================================
// Flag sets
// ============================================================

bitflags::bitflags! {
    /// Face flags (FACE_*)
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FaceFlags: u32 {
        const SOLID         = 0x0001;
        const LADDER        = 0x0002;
        const GROUND        = 0x0004;
        const GAP           = 0x0008;
        const LIQUID        = 0x0010;
        const LIQUIDSURFACE = 0x0020;
        const BRIDGE        = 0x0040;
    }
}

bitflags::bitflags! {
    /// Area flags (AREA_*)
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AreaFlags: u32 {
        const GROUNDED = 0x0001;
        const LADDER   = 0x0002;
        const LIQUID   = 0x0004;
        const DISABLED = 0x0008;
        const BRIDGE   = 0x0010;
    }
}

bitflags::bitflags! {
    /// Area contents (AREACONTENTS_*). Bits 24..32 hold the brush model number.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AreaContents: u32 {
        const WATER         = 0x0001;
        const LAVA          = 0x0002;
        const SLIME         = 0x0004;
        const CLUSTERPORTAL = 0x0008;
        const TELEPORTAL    = 0x0010;
        const ROUTEPORTAL   = 0x0020;
        const TELEPORTER    = 0x0040;
        const JUMPPAD       = 0x0080;
        const DONOTENTER    = 0x0100;
        const VIEWPORTAL    = 0x0200;
        const MOVER         = 0x0400;
        const NOTTEAM1      = 0x0800;
        const NOTTEAM2      = 0x1000;
    }
}

pub const AREACONTENTS_MODELNUMSHIFT: u32 = 24;
pub const AREACONTENTS_MAXMODELNUM: u32 = 0xFF;

bitflags::bitflags! {
    /// High bits of a reachability's travel type.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TravelFlags: u32 {
        const NOTTEAM1 = 0x0100_0000;
        const NOTTEAM2 = 0x0200_0000;
    }
}

pub const TRAVELTYPE_MASK: u32 = 0x00FF_FFFF;

/// Movement kind of a stored reachability (TRAVEL_*)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TravelType {
    Invalid,
    Walk,
    Crouch,
    BarrierJump,
    Jump,
    Ladder,
    WalkOffLedge,
    Swim,
    WaterJump,
    Teleport,
    Elevator,
    RocketJump,
    BfgJump,
    GrappleHook,
    DoubleJump,
    RampJump,
    StrafeJump,
    JumpPad,
    FuncBob,
    Unknown(u32),
}

impl TravelType {
    /// Decode the low 24 bits of a raw travel type.
    pub fn from_raw(raw: u32) -> Self {
        match raw & TRAVELTYPE_MASK {
            1 => TravelType::Invalid,
            2 => TravelType::Walk,
            3 => TravelType::Crouch,
            4 => TravelType::BarrierJump,
            5 => TravelType::Jump,
            6 => TravelType::Ladder,
            7 => TravelType::WalkOffLedge,
            8 => TravelType::Swim,
            9 => TravelType::WaterJump,
            10 => TravelType::Teleport,
            11 => TravelType::Elevator,
            12 => TravelType::RocketJump,
            13 => TravelType::BfgJump,
            14 => TravelType::GrappleHook,
            15 => TravelType::DoubleJump,
            16 => TravelType::RampJump,
            17 => TravelType::StrafeJump,
            18 => TravelType::JumpPad,
            19 => TravelType::FuncBob,
            other => TravelType::Unknown(other),
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            TravelType::Invalid => 1,
            TravelType::Walk => 2,
            TravelType::Crouch => 3,
            TravelType::BarrierJump => 4,
            TravelType::Jump => 5,
            TravelType::Ladder => 6,
            TravelType::WalkOffLedge => 7,
            TravelType::Swim => 8,
            TravelType::WaterJump => 9,
            TravelType::Teleport => 10,
            TravelType::Elevator => 11,
            TravelType::RocketJump => 12,
            TravelType::BfgJump => 13,
            TravelType::GrappleHook => 14,
            TravelType::DoubleJump => 15,
            TravelType::RampJump => 16,
            TravelType::StrafeJump => 17,
            TravelType::JumpPad => 18,
            TravelType::FuncBob => 19,
            TravelType::Unknown(raw) => raw,
        }
    }
}

// ============================================================
// Lump records
// ============================================================

/// aas_bbox_t — presence type bounding box
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AasBBox {
    pub presencetype: i32,
    pub flags: i32,
    pub mins: Vec3,
    pub maxs: Vec3,
}

/// aas_plane_t — normal · p = dist
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AasPlane {
    pub normal: Vec3,
    pub dist: f32,
    pub plane_type: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AasEdge {
    pub v1: i32,
    pub v2: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AasFace {
    pub planenum: i32,
    pub faceflags: FaceFlags,
    pub numedges: i32,
    pub firstedge: i32,
    /// Area on the side the plane normal points to.
    pub frontarea: i32,
    pub backarea: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AasArea {
    pub areanum: i32,
    pub numfaces: i32,
    pub firstface: i32,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub center: Vec3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AasAreaSettings {
    pub contents: AreaContents,
    pub areaflags: AreaFlags,
    pub presencetype: i32,
    /// Negative for cluster portal areas: -portalnum.
    pub cluster: i32,
    pub clusterareanum: i32,
    pub numreachableareas: i32,
    pub firstreachablearea: i32,
}

impl AasAreaSettings {
    /// Brush model the area belongs to (0 = worldspawn).
    pub fn model_num(&self) -> u32 {
        (self.contents.bits() >> AREACONTENTS_MODELNUMSHIFT) & AREACONTENTS_MAXMODELNUM
    }
}

/// aas_reachability_t — one directed area-to-area transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AasReachability {
    pub areanum: i32,
    pub facenum: i32,
    pub edgenum: i32,
    pub start: Vec3,
    pub end: Vec3,
    pub traveltype: TravelType,
    pub travelflags: TravelFlags,
    pub traveltime: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AasNode {
    pub planenum: i32,
    /// Positive: child node, negative: -areanum, zero: solid leaf.
    pub children: [i32; 2],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AasPortal {
    pub areanum: i32,
    pub frontcluster: i32,
    pub backcluster: i32,
    pub clusterareanum: [i32; 2],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AasCluster {
    pub numareas: i32,
    pub numreachabilityareas: i32,
    pub numportals: i32,
    pub firstportal: i32,
}
