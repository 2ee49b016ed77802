//! Look-at camera with auto-framing
//!
//! The default view looks at the scene from the (+x, +y, -z) octant towards
//! its center with +Z up, far enough to see the whole bounding sphere.

use csgview_core::{mat4, BoundingBox, CameraTemplate, Mat4, Vec3};

/// Direction from the scene center towards the eye, scaled by the radius
const FRAMING_DIRECTION: Vec3 = Vec3::new(1.0, 1.0, -0.5);

/// Perspective look-at camera
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(-10.0, -10.0, 5.0),
            center: Vec3::ZERO,
            up: Vec3::Z,
            fov_y: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Camera placed by a scene file
    pub fn from_template(template: &CameraTemplate) -> Self {
        Self {
            eye: Vec3::from_array(template.eye),
            center: Vec3::from_array(template.center),
            up: Vec3::from_array(template.up),
            ..Self::default()
        }
    }

    /// Frame a bounding box
    ///
    /// `distance_factor` scales the radius to get the eye distance along the
    /// framing direction. The far plane grows to keep the far side visible.
    pub fn frame(&mut self, bounds: &BoundingBox, distance_factor: f32) {
        let center = bounds.center();
        let radius = bounds.radius().max(f32::EPSILON);
        self.center = center;
        self.eye = center - FRAMING_DIRECTION * (radius * distance_factor);
        self.up = Vec3::Z;

        let distance = self.eye.distance(center);
        self.far = self.far.max(2.0 * distance + 2.0 * radius);
        log::debug!(
            "Framed center ({:.2}, {:.2}, {:.2}) radius {:.2}",
            center.x,
            center.y,
            center.z,
            radius
        );
    }

    pub fn view_matrix(&self) -> Mat4 {
        mat4::look_at(self.eye, self.center, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        mat4::perspective(self.fov_y.to_radians(), aspect, self.near, self.far)
    }

    /// Unit direction from the eye to the center
    pub fn forward(&self) -> Vec3 {
        (self.center - self.eye).normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn unit_box() -> BoundingBox {
        let mut b = BoundingBox::from_point(Vec3::new(-1.0, -1.0, -1.0));
        b.include(Vec3::new(1.0, 1.0, 1.0));
        b
    }

    #[test]
    fn test_frame_places_eye_along_direction() {
        let mut camera = Camera::default();
        camera.frame(&unit_box(), 1.8);
        let r = 3.0_f32.sqrt();
        let expected = Vec3::new(-1.0, -1.0, 0.5) * (r * 1.8);
        assert!(camera.eye.distance(expected) < EPSILON);
        assert_eq!(camera.center, Vec3::ZERO);
        assert_eq!(camera.up, Vec3::Z);
    }

    #[test]
    fn test_frame_extends_far_plane() {
        let mut camera = Camera { far: 1.0, ..Camera::default() };
        camera.frame(&unit_box(), 1.8);
        assert!(camera.far > camera.eye.distance(camera.center) + 3.0_f32.sqrt());
    }

    #[test]
    fn test_center_projects_to_middle() {
        let mut camera = Camera::default();
        camera.frame(&unit_box(), 1.8);
        let vp = mat4::mul(camera.projection_matrix(1.0), camera.view_matrix());
        let clip = mat4::transform(vp, [0.0, 0.0, 0.0, 1.0]);
        assert!((clip[0] / clip[3]).abs() < EPSILON);
        assert!((clip[1] / clip[3]).abs() < EPSILON);
        let depth = clip[2] / clip[3];
        assert!(depth > 0.0 && depth < 1.0);
    }

    #[test]
    fn test_from_template() {
        let template = CameraTemplate { eye: [0.0, -5.0, 0.0], center: [0.0; 3], up: [0.0, 0.0, 1.0] };
        let camera = Camera::from_template(&template);
        assert!((camera.forward().y - 1.0).abs() < EPSILON);
    }
}
