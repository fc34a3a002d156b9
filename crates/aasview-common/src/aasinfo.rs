// aasinfo.rs — navigability classification of a loaded AAS file
//
// Areas are scanned in ascending order from 1, faces in the order the area's
// face index slice lists them. Every output list keeps that order.

use std::collections::HashSet;
use std::time::Instant;

use log::debug;

use crate::aasfiles::{
    AasAreaSettings, AasFace, AasReachability, AreaContents, AreaFlags, TravelType,
    MAX_STEP_HEIGHT,
};
use crate::aasload::AasFile;
use crate::aaspoly::{
    area_faces, flip_if_needed, is_ground, lowest_edge, shares_edge, touching_faces, SignedRef,
};

// ============================================================
// Configuration
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Largest crease-to-fold drop still classified as a step.
    pub step_height: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            step_height: MAX_STEP_HEIGHT,
        }
    }
}

// ============================================================
// Output
// ============================================================

/// Directed connection from one area into another through a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaLink {
    pub front_area: i32,
    pub back_area: i32,
    /// Always positive.
    pub face_num: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReachKind {
    Walk,
    Fall,
    Step,
}

impl ReachKind {
    pub const ALL: [ReachKind; 3] = [ReachKind::Walk, ReachKind::Fall, ReachKind::Step];

    pub fn name(self) -> &'static str {
        match self {
            ReachKind::Walk => "walk",
            ReachKind::Fall => "fall",
            ReachKind::Step => "step",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReachabilityInfo {
    /// Signed face numbers, as referenced by the owning area.
    pub ground_face_ids: Vec<i32>,
    pub portal_face_ids: Vec<i32>,
    pub liquid_areas: Vec<i32>,
    pub reach_walk: Vec<AreaLink>,
    pub reach_fall: Vec<AreaLink>,
    pub reach_step: Vec<AreaLink>,

    pub water_face_ids: Vec<i32>,
    pub slime_face_ids: Vec<i32>,
    pub lava_face_ids: Vec<i32>,
    /// Ground faces of areas marked do-not-enter. Never in `ground_face_ids`.
    pub do_not_enter_face_ids: Vec<i32>,
    pub cluster_portal_face_ids: Vec<i32>,
    pub walkable_cluster_portal_face_ids: Vec<i32>,
    pub cluster_count: usize,
}

impl ReachabilityInfo {
    pub fn links(&self, kind: ReachKind) -> &[AreaLink] {
        match kind {
            ReachKind::Walk => &self.reach_walk,
            ReachKind::Fall => &self.reach_fall,
            ReachKind::Step => &self.reach_step,
        }
    }

    fn links_mut(&mut self, kind: ReachKind) -> &mut Vec<AreaLink> {
        match kind {
            ReachKind::Walk => &mut self.reach_walk,
            ReachKind::Fall => &mut self.reach_fall,
            ReachKind::Step => &mut self.reach_step,
        }
    }
}

// ============================================================
// Predicates
// ============================================================

fn settings(file: &AasFile, areanum: i32) -> Option<&AasAreaSettings> {
    usize::try_from(areanum)
        .ok()
        .and_then(|i| file.area_settings.get(i))
}

fn area_flags(file: &AasFile, areanum: i32) -> AreaFlags {
    settings(file, areanum).map_or(AreaFlags::empty(), |s| s.areaflags)
}

fn area_contents(file: &AasFile, areanum: i32) -> AreaContents {
    settings(file, areanum).map_or(AreaContents::empty(), |s| s.contents)
}

/// True when `areanum` names a real area rather than the dummy or solid.
fn valid_area(file: &AasFile, areanum: i32) -> bool {
    areanum > 0 && (areanum as usize) < file.areas.len()
}

/// Both sides are real areas, and together they are grounded and dry.
pub fn is_portal(file: &AasFile, face: &AasFace) -> bool {
    if !valid_area(file, face.frontarea) || !valid_area(file, face.backarea) {
        return false;
    }
    let flags = area_flags(file, face.frontarea) | area_flags(file, face.backarea);
    flags.contains(AreaFlags::GROUNDED) && !flags.contains(AreaFlags::LIQUID)
}

pub fn has_liquid_on_any_side(file: &AasFile, face: &AasFace) -> bool {
    (area_flags(file, face.frontarea) | area_flags(file, face.backarea)).contains(AreaFlags::LIQUID)
}

pub fn has_liquid_on_one_side(file: &AasFile, face: &AasFace) -> bool {
    let front = area_flags(file, face.frontarea).contains(AreaFlags::LIQUID);
    let back = area_flags(file, face.backarea).contains(AreaFlags::LIQUID);
    front != back
}

/// Stored reachabilities of one travel type.
pub fn reachabilities_of_type(file: &AasFile, travel_type: TravelType) -> Vec<&AasReachability> {
    file.reachabilities
        .iter()
        .filter(|r| r.traveltype == travel_type)
        .collect()
}

// ============================================================
// Analysis
// ============================================================

pub fn analyze(file: &AasFile) -> ReachabilityInfo {
    analyze_with(file, &AnalysisConfig::default())
}

pub fn analyze_with(file: &AasFile, config: &AnalysisConfig) -> ReachabilityInfo {
    let start = Instant::now();
    let mut info = ReachabilityInfo {
        cluster_count: file
            .area_settings
            .iter()
            .map(|s| s.cluster)
            .collect::<HashSet<_>>()
            .len(),
        ..Default::default()
    };

    for portalnum in 1..file.portals.len() {
        add_cluster_portal(file, file.portals[portalnum].areanum, &mut info);
    }

    // area 0 is a dummy
    for areanum in 1..file.areas.len() {
        let area_settings = file.area_settings.get(areanum).copied().unwrap_or_default();
        let liquid_area = area_settings.areaflags.contains(AreaFlags::LIQUID);
        if liquid_area {
            info.liquid_areas.push(areanum as i32);
        }
        for af in area_faces(file, areanum) {
            let face = flip_if_needed(af.id, af.face);
            // Liquid areas and faces touching liquid only feed the liquid lists.
            if liquid_area || has_liquid_on_any_side(file, &face) {
                classify_liquid_face(file, af.id, &face, &mut info);
                continue;
            }
            classify_face(file, config, &area_settings, af.id, &face, &mut info);
        }
    }

    debug!(
        "AAS analysis took {:.2} ms: {} ground, {} portal, {} walk, {} fall, {} step, {} liquid areas",
        start.elapsed().as_secs_f64() * 1000.0,
        info.ground_face_ids.len(),
        info.portal_face_ids.len(),
        info.reach_walk.len(),
        info.reach_fall.len(),
        info.reach_step.len(),
        info.liquid_areas.len()
    );
    info
}

fn add_cluster_portal(file: &AasFile, areanum: i32, info: &mut ReachabilityInfo) {
    let Ok(areanum) = usize::try_from(areanum) else {
        return;
    };
    let faces = area_faces(file, areanum);
    info.cluster_portal_face_ids.extend(faces.iter().map(|af| af.id));
    if faces.iter().any(|af| is_ground(af.face)) {
        info.walkable_cluster_portal_face_ids
            .extend(faces.iter().map(|af| af.id));
    }
}

/// Liquid surfaces: liquid on exactly one side, both sides real areas.
/// Bucketed by the combined contents, lava first.
fn classify_liquid_face(file: &AasFile, face_id: i32, face: &AasFace, info: &mut ReachabilityInfo) {
    if !has_liquid_on_one_side(file, face)
        || !valid_area(file, face.frontarea)
        || !valid_area(file, face.backarea)
    {
        return;
    }
    let contents = area_contents(file, face.frontarea) | area_contents(file, face.backarea);
    if contents.contains(AreaContents::LAVA) {
        info.lava_face_ids.push(face_id);
    } else if contents.contains(AreaContents::SLIME) {
        info.slime_face_ids.push(face_id);
    } else if contents.contains(AreaContents::WATER) {
        info.water_face_ids.push(face_id);
    }
}

/// `face` is already flipped to the scanning area's point of view.
fn classify_face(
    file: &AasFile,
    config: &AnalysisConfig,
    area_settings: &AasAreaSettings,
    face_id: i32,
    face: &AasFace,
    info: &mut ReachabilityInfo,
) {
    if is_ground(face) {
        if area_settings.contents.contains(AreaContents::DONOTENTER) {
            info.do_not_enter_face_ids.push(face_id);
        } else {
            info.ground_face_ids.push(face_id);
        }
    }
    let portal = is_portal(file, face);
    if portal {
        info.portal_face_ids.push(face_id);
    }

    if let Some(kind) = reach_kind(file, config, face_id, face, portal) {
        info.links_mut(kind).push(AreaLink {
            front_area: face.frontarea,
            back_area: face.backarea,
            face_num: SignedRef::from_raw(face_id).index as i32,
        });
    }
}

fn side_has_ground(file: &AasFile, face_id: i32, areanum: i32) -> bool {
    usize::try_from(areanum).is_ok_and(|areanum| {
        touching_faces(file, face_id, areanum)
            .iter()
            .any(|t| is_ground(t.face))
    })
}

/// Walk beats fall beats step. `face` is already flipped to the scanning
/// area's point of view.
fn reach_kind(
    file: &AasFile,
    config: &AnalysisConfig,
    face_id: i32,
    face: &AasFace,
    portal: bool,
) -> Option<ReachKind> {
    if portal {
        let front_ground = side_has_ground(file, face_id, face.frontarea);
        let back_ground = side_has_ground(file, face_id, face.backarea);
        if front_ground && back_ground {
            // symmetric, so only counted from the owning side
            return (!SignedRef::from_raw(face_id).flipped).then_some(ReachKind::Walk);
        }
        if front_ground {
            return Some(ReachKind::Fall);
        }
        return None;
    }

    if !face.faceflags.is_empty()
        || !valid_area(file, face.frontarea)
        || !valid_area(file, face.backarea)
    {
        return None;
    }
    let front_ground = side_has_ground(file, face_id, face.frontarea);
    let back_ground = side_has_ground(file, face_id, face.backarea);
    if front_ground || !back_ground {
        return None;
    }
    is_step(file, config, face).then_some(ReachKind::Step)
}

/// A fold within step height of the gap's crease, with ground on it.
fn is_step(file: &AasFile, config: &AnalysisConfig, face: &AasFace) -> bool {
    let Some(crease) = lowest_edge(file, face) else {
        return false;
    };
    let front_faces = area_faces(file, face.frontarea as usize);
    front_faces.iter().any(|candidate| {
        let Some(fold) = lowest_edge(file, candidate.face) else {
            return false;
        };
        if crease.height - fold.height > config.step_height {
            return false;
        }
        front_faces
            .iter()
            .any(|g| is_ground(g.face) && shares_edge(file, g.face, fold.edgenum))
    })
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aasfiles::{AasPortal, FaceFlags};
    use crate::testutil::AasBuilder;

    /// Two rooms meeting at the plane x = 0: area `a` for x < 0, `b` for
    /// x > 0, with a vertical face `portal` between them.
    struct TwoRooms {
        b: AasBuilder,
        a: i32,
        bb: i32,
        portal: i32,
    }

    fn two_rooms(a_flags: AreaFlags, b_flags: AreaFlags, floor_b: FaceFlags) -> TwoRooms {
        let mut b = AasBuilder::new();
        let a = b.add_area(a_flags, AreaContents::empty());
        let bb = b.add_area(b_flags, AreaContents::empty());
        b.add_polygon(
            &[[-10.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 10.0], [-10.0, 0.0, 10.0]],
            FaceFlags::GROUND,
            a,
            0,
        );
        let portal = b.add_polygon(
            &[[0.0, 0.0, 10.0], [0.0, 0.0, 0.0], [0.0, 40.0, 0.0], [0.0, 40.0, 10.0]],
            FaceFlags::empty(),
            a,
            bb,
        );
        b.add_polygon(
            &[[0.0, 0.0, 10.0], [0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 0.0, 10.0]],
            floor_b,
            bb,
            0,
        );
        TwoRooms { b, a, bb, portal }
    }

    /// Gap face between a lower front area and a back area whose floor meets
    /// the gap's bottom edge; the front floor sits `drop` units lower.
    fn step_rooms(drop: f32) -> (AasFile, i32, i32, i32) {
        let mut b = AasBuilder::new();
        let front = b.add_area(AreaFlags::empty(), AreaContents::empty());
        let back = b.add_area(AreaFlags::empty(), AreaContents::empty());
        let gap = b.add_polygon(
            &[[0.0, 0.0, 10.0], [0.0, 0.0, 0.0], [0.0, 40.0, 0.0], [0.0, 40.0, 10.0]],
            FaceFlags::empty(),
            front,
            back,
        );
        b.add_polygon(
            &[[0.0, 0.0, 10.0], [0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 0.0, 10.0]],
            FaceFlags::GROUND,
            back,
            0,
        );
        b.add_polygon(
            &[[-20.0, -drop, 0.0], [-10.0, -drop, 0.0], [-10.0, -drop, 10.0], [-20.0, -drop, 10.0]],
            FaceFlags::GROUND,
            front,
            0,
        );
        (b.file(), front, back, gap)
    }

    fn all_links(info: &ReachabilityInfo) -> Vec<(ReachKind, AreaLink)> {
        ReachKind::ALL
            .iter()
            .flat_map(|&k| info.links(k).iter().map(move |l| (k, *l)))
            .collect()
    }

    #[test]
    fn test_walk_between_grounded_rooms() {
        let rooms = two_rooms(AreaFlags::GROUNDED, AreaFlags::GROUNDED, FaceFlags::GROUND);
        let info = analyze(&rooms.b.file());
        assert_eq!(
            info.reach_walk,
            vec![AreaLink { front_area: rooms.a, back_area: rooms.bb, face_num: rooms.portal }]
        );
        assert!(info.reach_fall.is_empty());
        assert!(info.reach_step.is_empty());
        // referenced from both rooms
        assert_eq!(info.portal_face_ids, vec![rooms.portal, -rooms.portal]);
        assert_eq!(info.ground_face_ids.len(), 2);
    }

    #[test]
    fn test_fall_when_back_has_no_ground() {
        let rooms = two_rooms(AreaFlags::GROUNDED, AreaFlags::GROUNDED, FaceFlags::SOLID);
        let info = analyze(&rooms.b.file());
        assert!(info.reach_walk.is_empty());
        assert_eq!(
            info.reach_fall,
            vec![AreaLink { front_area: rooms.a, back_area: rooms.bb, face_num: rooms.portal }]
        );
    }

    #[test]
    fn test_fall_from_back_side_is_flipped() {
        // Only b has a ground floor: the drop runs b -> a.
        let mut rooms = two_rooms(AreaFlags::GROUNDED, AreaFlags::GROUNDED, FaceFlags::GROUND);
        rooms.b.faces[1].faceflags = FaceFlags::SOLID;
        let info = analyze(&rooms.b.file());
        assert_eq!(
            info.reach_fall,
            vec![AreaLink { front_area: rooms.bb, back_area: rooms.a, face_num: rooms.portal }]
        );
    }

    #[test]
    fn test_ungrounded_areas_are_not_portals() {
        let rooms = two_rooms(AreaFlags::empty(), AreaFlags::empty(), FaceFlags::GROUND);
        let file = rooms.b.file();
        assert!(!is_portal(&file, &file.faces[rooms.portal as usize]));
        let info = analyze(&file);
        assert!(info.portal_face_ids.is_empty());
        assert!(info.reach_walk.is_empty());
    }

    #[test]
    fn test_portal_areas_are_in_range() {
        let rooms = two_rooms(AreaFlags::GROUNDED, AreaFlags::GROUNDED, FaceFlags::GROUND);
        let mut file = rooms.b.file();
        let face = file.faces[rooms.portal as usize];
        assert!(is_portal(&file, &face));
        file.faces[rooms.portal as usize].backarea = 99;
        assert!(!is_portal(&file, &file.faces[rooms.portal as usize]));
    }

    #[test]
    fn test_step_within_step_height() {
        let (file, front, back, gap) = step_rooms(10.0);
        let info = analyze(&file);
        assert_eq!(
            info.reach_step,
            vec![AreaLink { front_area: front, back_area: back, face_num: gap }]
        );
        assert!(info.reach_walk.is_empty());
        assert!(info.reach_fall.is_empty());
    }

    #[test]
    fn test_step_too_high() {
        let (file, ..) = step_rooms(30.0);
        let info = analyze(&file);
        assert!(all_links(&info).is_empty());
    }

    #[test]
    fn test_step_height_is_configurable() {
        let (file, ..) = step_rooms(30.0);
        let config = AnalysisConfig { step_height: 32.0 };
        assert_eq!(analyze_with(&file, &config).reach_step.len(), 1);
    }

    #[test]
    fn test_flagged_gap_is_not_a_step() {
        let (mut file, _, _, gap) = step_rooms(10.0);
        file.faces[gap as usize].faceflags = FaceFlags::GAP;
        assert!(analyze(&file).reach_step.is_empty());
    }

    #[test]
    fn test_liquid_areas_are_skipped() {
        let mut b = AasBuilder::new();
        let dry = b.add_area(AreaFlags::GROUNDED, AreaContents::empty());
        let pool = b.add_area(AreaFlags::LIQUID, AreaContents::WATER);
        let bottom = b.add_polygon(
            &[[0.0, -40.0, 0.0], [10.0, -40.0, 0.0], [10.0, -40.0, 10.0], [0.0, -40.0, 10.0]],
            FaceFlags::GROUND,
            pool,
            0,
        );
        let surface = b.add_polygon(
            &[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 0.0, 10.0], [0.0, 0.0, 10.0]],
            FaceFlags::LIQUIDSURFACE,
            dry,
            pool,
        );
        let file = b.file();
        let info = analyze(&file);

        assert_eq!(info.liquid_areas, vec![pool]);
        // listed from the dry side and again from inside the pool
        assert_eq!(info.water_face_ids, vec![surface, -surface]);
        for id in [bottom, surface, -surface] {
            assert!(!info.ground_face_ids.contains(&id));
            assert!(!info.portal_face_ids.contains(&id));
        }
        assert!(all_links(&info).iter().all(|(_, l)| l.face_num != surface));
    }

    #[test]
    fn test_liquid_area_does_not_stop_scan() {
        let mut b = AasBuilder::new();
        let pool = b.add_area(AreaFlags::LIQUID, AreaContents::LAVA);
        let dry = b.add_area(AreaFlags::GROUNDED, AreaContents::empty());
        let surface = b.add_polygon(
            &[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 0.0, 10.0], [0.0, 0.0, 10.0]],
            FaceFlags::LIQUIDSURFACE,
            dry,
            pool,
        );
        let floor = b.add_polygon(
            &[[20.0, 0.0, 0.0], [30.0, 0.0, 0.0], [30.0, 0.0, 10.0], [20.0, 0.0, 10.0]],
            FaceFlags::GROUND,
            dry,
            0,
        );
        let info = analyze(&b.file());
        assert_eq!(info.lava_face_ids, vec![-surface, surface]);
        assert_eq!(info.ground_face_ids, vec![floor]);
    }

    #[test]
    fn test_do_not_enter_ground() {
        let mut b = AasBuilder::new();
        let area = b.add_area(AreaFlags::GROUNDED, AreaContents::DONOTENTER);
        let open = b.add_area(AreaFlags::GROUNDED, AreaContents::empty());
        let blocked = b.add_polygon(
            &[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 0.0, 10.0], [0.0, 0.0, 10.0]],
            FaceFlags::GROUND,
            area,
            0,
        );
        let floor = b.add_polygon(
            &[[20.0, 0.0, 0.0], [30.0, 0.0, 0.0], [30.0, 0.0, 10.0], [20.0, 0.0, 10.0]],
            FaceFlags::GROUND,
            open,
            0,
        );
        let info = analyze(&b.file());
        assert_eq!(info.ground_face_ids, vec![floor]);
        assert_eq!(info.do_not_enter_face_ids, vec![blocked]);
    }

    #[test]
    fn test_cluster_portals() {
        let mut rooms = two_rooms(AreaFlags::GROUNDED, AreaFlags::GROUNDED, FaceFlags::GROUND);
        rooms.b.area_settings[rooms.bb as usize].cluster = -1;
        rooms.b.portals.push(AasPortal {
            areanum: rooms.bb,
            frontcluster: 1,
            backcluster: 2,
            clusterareanum: [2, 1],
        });
        let info = analyze(&rooms.b.file());
        assert_eq!(info.cluster_portal_face_ids, vec![-rooms.portal, 3]);
        assert_eq!(info.walkable_cluster_portal_face_ids, vec![-rooms.portal, 3]);
        // dummy area (0), cluster 1, portal -1
        assert_eq!(info.cluster_count, 3);
    }

    #[test]
    fn test_reach_lists_are_exclusive() {
        let rooms = two_rooms(AreaFlags::GROUNDED, AreaFlags::GROUNDED, FaceFlags::GROUND);
        let (step_file, ..) = step_rooms(10.0);
        for file in [rooms.b.file(), step_file] {
            let info = analyze(&file);
            let mut seen = HashSet::new();
            for (_, link) in all_links(&info) {
                assert!(link.face_num > 0);
                assert!(seen.insert(link.face_num), "face {} listed twice", link.face_num);
            }
        }
    }

    #[test]
    fn test_reachabilities_of_type() {
        let mut rooms = two_rooms(AreaFlags::GROUNDED, AreaFlags::GROUNDED, FaceFlags::GROUND);
        for (areanum, traveltype) in [(1, TravelType::Walk), (2, TravelType::Jump), (2, TravelType::Walk)] {
            rooms.b.reachabilities.push(AasReachability {
                areanum,
                facenum: rooms.portal,
                edgenum: 0,
                start: [0.0; 3],
                end: [0.0; 3],
                traveltype,
                travelflags: Default::default(),
                traveltime: 100,
            });
        }
        let file = rooms.b.file();
        let walks = reachabilities_of_type(&file, TravelType::Walk);
        assert_eq!(walks.len(), 2);
        assert!(walks.iter().all(|r| r.traveltype == TravelType::Walk));
        assert_eq!(reachabilities_of_type(&file, TravelType::Jump)[0].areanum, 2);
    }
}
