//! Projection of 3D stage geometry onto the page, plus ray picking.
//!
//! Overlay rectangles are rebuilt every frame from the object's cached
//! local bounds, its world transform and the camera. Anything that cannot
//! be placed reliably (corner behind the camera, zero-sized page, NaN)
//! yields `None` so the caller hides the overlay instead of misplacing it.

use glam::{Mat4, Vec2, Vec3};

/// Clip-space `w` at or below this is treated as behind the camera.
const MIN_CLIP_W: f32 = 1e-6;

/// Object-space axis-aligned bounding box, computed once from geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl LocalBounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Box of `size` centred on the origin. A zero depth gives a flat panel.
    pub fn from_size(size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self::new(-half, half)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// The four corners on the `min.z` face.
    pub fn front_corners(&self) -> [Vec3; 4] {
        let (min, max) = (self.min, self.max);
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
        ]
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let [a, b, c, d] = self.front_corners();
        let depth = Vec3::new(0.0, 0.0, self.max.z - self.min.z);
        [a, b, c, d, a + depth, b + depth, c + depth, d + depth]
    }
}

/// Which corners of the bounds feed the projected rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CornerSet {
    /// The `min.z` face only. Exact for flat panels facing the camera.
    #[default]
    FrontFace,
    /// All eight corners; exact silhouette extents for any box.
    All,
}

/// The renderer's displayed rectangle in page pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl PageRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Rect anchored at the page origin, as for a full-window canvas.
    pub fn sized(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Normalized device coordinates to page pixels (y grows downwards).
    pub fn to_page(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.width + self.left,
            (-ndc.y + 1.0) * 0.5 * self.height + self.top,
        )
    }

    /// Page pixels to normalized device coordinates.
    pub fn to_ndc(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            (point.x - self.left) / self.width * 2.0 - 1.0,
            -(point.y - self.top) / self.height * 2.0 + 1.0,
        )
    }
}

/// Projected page-space extents of one object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl ScreenBounds {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Inclusive point test in page pixels.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.y >= self.min_y && point.y <= self.max_y
    }

    fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut bounds = Self {
            min_x: f32::INFINITY,
            min_y: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            max_y: f32::NEG_INFINITY,
        };
        for point in points {
            bounds.min_x = bounds.min_x.min(point.x);
            bounds.min_y = bounds.min_y.min(point.y);
            bounds.max_x = bounds.max_x.max(point.x);
            bounds.max_y = bounds.max_y.max(point.y);
        }
        let finite = [bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y]
            .iter()
            .all(|value| value.is_finite());
        finite.then_some(bounds)
    }
}

/// World-space point to NDC, or `None` when it sits behind the camera.
pub fn project_point(point: Vec3, view_proj: &Mat4) -> Option<Vec3> {
    let clip = *view_proj * point.extend(1.0);
    if !(clip.w > MIN_CLIP_W) {
        return None;
    }
    Some(clip.truncate() / clip.w)
}

/// Page rectangle covering `bounds` under the `world` transform.
pub fn project_bounds(
    bounds: &LocalBounds,
    world: &Mat4,
    view_proj: &Mat4,
    page: &PageRect,
    corners: CornerSet,
) -> Option<ScreenBounds> {
    if page.is_degenerate() {
        return None;
    }
    let all = bounds.corners();
    let selected = match corners {
        CornerSet::FrontFace => &all[..4],
        CornerSet::All => &all[..],
    };
    let mut projected = Vec::with_capacity(selected.len());
    for corner in selected {
        let ndc = project_point(world.transform_point3(*corner), view_proj)?;
        projected.push(page.to_page(ndc.truncate()));
    }
    ScreenBounds::from_points(projected)
}

/// Half-line used for pointer picking. `direction` is unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Ray through `ndc` from the near plane towards the far plane.
    pub fn from_ndc(ndc: Vec2, view_proj: &Mat4) -> Option<Self> {
        if view_proj.determinant().abs() <= f32::EPSILON {
            return None;
        }
        let inverse = view_proj.inverse();
        let near = inverse.project_point3(ndc.extend(-1.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        let direction = (far - near).try_normalize()?;
        near.is_finite().then_some(Self {
            origin: near,
            direction,
        })
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Distance along the ray to where it enters `bounds` placed by
    /// `world`. A ray starting inside reports the exit distance.
    pub fn intersect_bounds(&self, bounds: &LocalBounds, world: &Mat4) -> Option<f32> {
        if world.determinant().abs() <= f32::EPSILON {
            return None;
        }
        let inverse = world.inverse();
        // affine maps keep the ray parameter, so local `t` is a world distance
        let origin = inverse.transform_point3(self.origin);
        let direction = inverse.transform_vector3(self.direction);

        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let start = origin[axis];
            let dir = direction[axis];
            if dir.abs() < 1e-8 {
                if start < bounds.min[axis] || start > bounds.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t0 = (bounds.min[axis] - start) * inv;
            let mut t1 = (bounds.max[axis] - start) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        if t_max < 0.0 {
            return None;
        }
        Some(if t_min >= 0.0 { t_min } else { t_max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Mat4 {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh_gl(90f32.to_radians(), 1.0, 0.1, 100.0);
        projection * view
    }

    fn page() -> PageRect {
        PageRect::new(10.0, 20.0, 100.0, 100.0)
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn flat_panel_projects_to_centred_rect() {
        let panel = LocalBounds::from_size(Vec3::new(2.0, 2.0, 0.0));
        let bounds =
            project_bounds(&panel, &Mat4::IDENTITY, &camera(), &page(), CornerSet::FrontFace)
                .unwrap();
        // half-extent 1 at distance 5 with a 90 degree fov is 0.2 NDC
        assert!(close(bounds.min_x, 10.0 + 40.0), "{bounds:?}");
        assert!(close(bounds.max_x, 10.0 + 60.0), "{bounds:?}");
        assert!(close(bounds.min_y, 20.0 + 40.0), "{bounds:?}");
        assert!(close(bounds.max_y, 20.0 + 60.0), "{bounds:?}");
        assert!(bounds.contains(Vec2::new(60.0, 70.0)));
        assert!(!bounds.contains(Vec2::new(5.0, 70.0)));
    }

    #[test]
    fn translation_moves_rect_on_page() {
        let panel = LocalBounds::from_size(Vec3::new(2.0, 2.0, 0.0));
        let page = PageRect::sized(100.0, 100.0);
        let centred =
            project_bounds(&panel, &Mat4::IDENTITY, &camera(), &page, CornerSet::FrontFace)
                .unwrap();
        let raised = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let moved = project_bounds(&panel, &raised, &camera(), &page, CornerSet::FrontFace).unwrap();
        assert!(moved.min_y < centred.min_y, "up in world is up on the page");
        assert!(close(moved.width(), centred.width()));
    }

    #[test]
    fn all_corners_cover_front_face() {
        let cube = LocalBounds::from_size(Vec3::splat(2.0));
        let front =
            project_bounds(&cube, &Mat4::IDENTITY, &camera(), &page(), CornerSet::FrontFace)
                .unwrap();
        let all = project_bounds(&cube, &Mat4::IDENTITY, &camera(), &page(), CornerSet::All).unwrap();
        assert!(all.min_x <= front.min_x && all.max_x >= front.max_x);
        assert!(all.width() > front.width());
    }

    #[test]
    fn object_behind_camera_is_hidden() {
        let panel = LocalBounds::from_size(Vec3::new(1.0, 1.0, 0.0));
        let behind = Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(
            project_bounds(&panel, &behind, &camera(), &page(), CornerSet::FrontFace),
            None
        );
    }

    #[test]
    fn degenerate_inputs_are_hidden() {
        let panel = LocalBounds::from_size(Vec3::new(1.0, 1.0, 0.0));
        let empty_page = PageRect::sized(0.0, 300.0);
        assert_eq!(
            project_bounds(&panel, &Mat4::IDENTITY, &camera(), &empty_page, CornerSet::FrontFace),
            None
        );
        let broken = Mat4::from_translation(Vec3::new(f32::NAN, 0.0, 0.0));
        assert_eq!(
            project_bounds(&panel, &broken, &camera(), &page(), CornerSet::FrontFace),
            None
        );
    }

    #[test]
    fn page_and_ndc_are_inverse() {
        let page = page();
        let point = Vec2::new(35.0, 95.0);
        let back = page.to_page(page.to_ndc(point));
        assert!(close(back.x, point.x) && close(back.y, point.y));
        assert_eq!(page.to_ndc(Vec2::new(10.0, 20.0)), Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn centre_ray_hits_panel_at_its_distance() {
        let ray = Ray::from_ndc(Vec2::ZERO, &camera()).unwrap();
        assert!(close(ray.direction.z, -1.0));
        let panel = LocalBounds::from_size(Vec3::new(2.0, 2.0, 0.0));
        let distance = ray.intersect_bounds(&panel, &Mat4::IDENTITY).unwrap();
        assert!(close(ray.at(distance).z, 0.0), "{distance}");
    }

    #[test]
    fn ray_misses_outside_panel() {
        let ray = Ray::from_ndc(Vec2::new(0.9, 0.9), &camera()).unwrap();
        let panel = LocalBounds::from_size(Vec3::new(2.0, 2.0, 0.0));
        assert_eq!(ray.intersect_bounds(&panel, &Mat4::IDENTITY), None);
    }

    #[test]
    fn nearer_box_reports_smaller_distance() {
        let ray = Ray::from_ndc(Vec2::ZERO, &camera()).unwrap();
        let cube = LocalBounds::from_size(Vec3::ONE);
        let near = ray
            .intersect_bounds(&cube, &Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0)))
            .unwrap();
        let far = ray
            .intersect_bounds(&cube, &Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0)))
            .unwrap();
        assert!(near < far);
        let scaled = Mat4::from_scale(Vec3::splat(0.0));
        assert_eq!(ray.intersect_bounds(&cube, &scaled), None);
    }
}
