// aas_shared.rs — vector type and small helpers shared by the loader and analyzer

// ============================================================
// Basic types
// ============================================================

pub type Vec3 = [f32; 3];

pub const VEC3_ORIGIN: Vec3 = [0.0, 0.0, 0.0];

/// Vertical axis of a vector produced by [`remap_axes`].
pub const UP_AXIS: usize = 1;

/// Convert a vector stored in the file's left-handed frame `(a, b, c)` into
/// the y-up frame used everywhere else: `(a, c, -b)`.
#[inline]
pub fn remap_axes(a: f32, b: f32, c: f32) -> Vec3 {
    [a, c, -b]
}

/// Inverse of [`remap_axes`]: the three floats as they are stored on disk.
#[inline]
pub fn unmap_axes(v: &Vec3) -> [f32; 3] {
    [v[0], -v[2], v[1]]
}

#[inline]
pub fn vector_height(v: &Vec3) -> f32 {
    v[UP_AXIS]
}

/// Componentwise bounds of a point set; `None` when the set is empty.
pub fn bounds_of<'a, I>(points: I) -> Option<(Vec3, Vec3)>
where
    I: IntoIterator<Item = &'a Vec3>,
{
    let mut iter = points.into_iter();
    let first = *iter.next()?;
    let mut mins = first;
    let mut maxs = first;
    for p in iter {
        for i in 0..3 {
            mins[i] = mins[i].min(p[i]);
            maxs[i] = maxs[i].max(p[i]);
        }
    }
    Some((mins, maxs))
}
