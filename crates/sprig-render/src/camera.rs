//! Orthographic sprite camera and its uniform payload.

use glam::{Mat4, Vec2, Vec3};

/// Half-extent of the orthographic view volume in world units.
const ORTHO_HALF_EXTENT: f32 = 0.5;

/// Camera for sprite rendering.
///
/// Looks from `cam` toward `look` with +Y up. The two user slots are passed
/// through to the shaders untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteCamera {
    pub cam: Vec3,
    pub look: Vec3,
    pub user1: Vec2,
    pub user2: Vec2,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for SpriteCamera {
    fn default() -> Self {
        Self {
            cam: Vec3::new(0.0, 0.0, 1.0),
            look: Vec3::ZERO,
            user1: Vec2::ZERO,
            user2: Vec2::ZERO,
            aspect: 1.0,
            near: 0.1,
            far: 10.0,
        }
    }
}

impl SpriteCamera {
    /// Create a camera at `cam` looking at `look`.
    pub fn new(cam: Vec3, look: Vec3) -> Self {
        Self {
            cam,
            look,
            ..Self::default()
        }
    }

    /// Set the camera position.
    pub fn set_position(&mut self, cam: Vec3) {
        self.cam = cam;
    }

    /// Look at a target position.
    pub fn look_at(&mut self, target: Vec3) {
        self.look = target;
    }

    /// Set the aspect ratio (width / height) of the presented viewport.
    /// Non-positive or non-finite ratios are ignored.
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.cam, self.look, Vec3::Y)
    }

    /// Orthographic projection one unit tall, widened by the aspect ratio so
    /// sprites keep their proportions.
    pub fn projection_matrix(&self) -> Mat4 {
        let half_width = ORTHO_HALF_EXTENT * self.aspect;
        Mat4::orthographic_rh(
            -half_width,
            half_width,
            -ORTHO_HALF_EXTENT,
            ORTHO_HALF_EXTENT,
            self.near,
            self.far,
        )
    }

    /// Get the uniform payload for the GPU.
    pub fn proj_view(&self) -> ProjView {
        ProjView::from(self)
    }
}

/// Projection and view matrices plus two free `vec2` slots.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ProjView {
    pub proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub user1: [f32; 2],
    pub user2: [f32; 2],
}

impl Default for ProjView {
    fn default() -> Self {
        SpriteCamera::default().proj_view()
    }
}

impl From<&SpriteCamera> for ProjView {
    fn from(camera: &SpriteCamera) -> Self {
        Self {
            proj: camera.projection_matrix().to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            user1: camera.user1.to_array(),
            user2: camera.user2.to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec4;

    #[test]
    fn uniform_layout_matches_shader_block() {
        assert_eq!(std::mem::size_of::<ProjView>(), 144);
        assert_eq!(std::mem::offset_of!(ProjView, view), 64);
        assert_eq!(std::mem::offset_of!(ProjView, user1), 128);
        assert_eq!(std::mem::offset_of!(ProjView, user2), 136);
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = SpriteCamera::default();
        let eye_space = camera.view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(eye_space.z, -1.0);
        assert_relative_eq!(eye_space.x, 0.0);
        assert_relative_eq!(eye_space.y, 0.0);
    }

    #[test]
    fn unit_quad_edge_maps_to_clip_edge() {
        let camera = SpriteCamera::default();
        let clip = camera.projection_matrix() * camera.view_matrix() * Vec4::new(0.5, 0.5, 0.0, 1.0);
        assert_relative_eq!(clip.x / clip.w, 1.0, epsilon = 1e-6);
        assert_relative_eq!(clip.y / clip.w, 1.0, epsilon = 1e-6);
        assert!((0.0..=1.0).contains(&(clip.z / clip.w)));
    }

    #[test]
    fn wide_aspect_widens_the_view() {
        let mut camera = SpriteCamera::default();
        camera.set_aspect(2.0);
        let to_clip = camera.projection_matrix() * camera.view_matrix();
        let right = to_clip * Vec4::new(1.0, 0.5, 0.0, 1.0);
        assert_relative_eq!(right.x / right.w, 1.0, epsilon = 1e-6);
        assert_relative_eq!(right.y / right.w, 1.0, epsilon = 1e-6);

        camera.set_aspect(0.0);
        camera.set_aspect(f32::NAN);
        assert_relative_eq!(camera.aspect, 2.0);
    }

    #[test]
    fn user_slots_pass_through() {
        let mut camera = SpriteCamera::new(Vec3::new(0.2, 0.0, 1.0), Vec3::new(0.2, 0.0, 0.0));
        camera.user1 = Vec2::new(1.5, -2.0);
        camera.user2 = Vec2::new(0.25, 8.0);
        let uniforms = camera.proj_view();
        assert_eq!(uniforms.user1, [1.5, -2.0]);
        assert_eq!(uniforms.user2, [0.25, 8.0]);
    }

    #[test]
    fn panning_moves_the_view_not_the_projection() {
        let mut camera = SpriteCamera::default();
        let before = camera.proj_view();
        camera.set_position(Vec3::new(0.3, 0.0, 1.0));
        camera.look_at(Vec3::new(0.3, 0.0, 0.0));
        let after = camera.proj_view();
        assert_eq!(before.proj, after.proj);
        assert_relative_eq!(after.view[3][0], -0.3, epsilon = 1e-6);
    }
}
