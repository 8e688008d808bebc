//! # Orbit Camera
//!
//! A camera is a node payload. Its eye orbits at `radius` around the origin,
//! rotated by `angle` plus the node's own Euler rotation, and always looks at
//! the node's world position with +Y up.
//!
//! Camera operations that touch the node's TRS are methods on
//! [`Scene`](crate::gfx::scene::Scene) so world matrices stay consistent.

use cgmath::{InnerSpace, Matrix3, Matrix4, Point3, SquareMatrix, Vector3};
use serde::{Deserialize, Serialize};

use crate::gfx::math::matrix::{
    look_at, normal_matrix, oblique, orthographic, perspective, rotate_x, rotate_y,
    translation_of,
};
use crate::gfx::scene::{NodeId, Scene, SceneError};

/// Near/far planes of the orthographic and oblique projections.
pub const PARALLEL_NEAR: f32 = -100.0;
pub const PARALLEL_FAR: f32 = 100.0;
/// `radius` divisors giving the parallel projections' half-width and half-height.
pub const WIDTH_DIVISOR: f32 = 2.0;
pub const HEIGHT_DIVISOR: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraType {
    Perspective,
    Orthographic,
    Oblique,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub radius: f32,
    /// Orbit angle about Y, radians.
    pub angle: f32,
    pub center: Point3<f32>,
    camera_type: CameraType,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    canvas_width: f32,
    canvas_height: f32,
}

impl Camera {
    /// Creates a camera with both matrices computed for an identity node.
    pub fn new(camera_type: CameraType, radius: f32, angle: f32) -> Self {
        let mut camera = Self {
            radius,
            angle,
            center: Point3::new(0.0, 0.0, 0.0),
            camera_type,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            canvas_width: 2.0,
            canvas_height: 1.0,
        };
        camera.update_view(&Matrix4::identity(), Vector3::new(0.0, 0.0, 0.0));
        camera.update_projection(Vector3::new(0.0, 0.0, 0.0));
        camera
    }

    pub fn with_center(mut self, center: Point3<f32>) -> Self {
        self.center = center;
        self
    }

    pub fn with_canvas(mut self, width: f32, height: f32) -> Self {
        self.canvas_width = width;
        self.canvas_height = height;
        self.update_projection(Vector3::new(0.0, 0.0, 0.0));
        self
    }

    pub fn camera_type(&self) -> CameraType {
        self.camera_type
    }

    pub fn canvas(&self) -> (f32, f32) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn view_matrix(&self) -> &Matrix4<f32> {
        &self.view
    }

    pub fn projection_matrix(&self) -> &Matrix4<f32> {
        &self.projection
    }

    /// `projection * view`
    pub fn view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection * self.view
    }

    /// `view * world`
    pub fn model_view_matrix(&self, world: &Matrix4<f32>) -> Matrix4<f32> {
        self.view * world
    }

    pub fn normal_matrix(&self, model_view: &Matrix4<f32>) -> Matrix3<f32> {
        normal_matrix(model_view)
    }

    /// Recomputes the view from the owning node's world matrix and Euler
    /// rotation (degrees).
    ///
    /// A degenerate eye (on the target, or straight above or below it) keeps
    /// the previous view.
    pub fn update_view(&mut self, world: &Matrix4<f32>, rotation: Vector3<f32>) {
        let target = translation_of(world);
        let eye = Vector3::new(0.0, 0.0, self.radius);
        let eye = rotate_y(eye, self.angle + rotation.y.to_radians());
        let eye = rotate_x(eye, rotation.x.to_radians());

        let forward = eye - target;
        if forward.magnitude2() < 1e-12 {
            log::error!("Camera eye coincides with its target, keeping previous view");
            return;
        }
        if forward.normalize().cross(Vector3::unit_y()).magnitude2() < 1e-12 {
            log::error!("Camera looks straight along the up axis, keeping previous view");
            return;
        }
        self.view = look_at(eye, target, Vector3::unit_y());
    }

    /// Recomputes the projection for the current type. The oblique shear uses
    /// the node's Y rotation in degrees.
    pub fn update_projection(&mut self, rotation: Vector3<f32>) {
        let half_width = self.radius / WIDTH_DIVISOR;
        let half_height = self.radius / HEIGHT_DIVISOR;

        self.projection = match self.camera_type {
            CameraType::Perspective => {
                let aspect = if self.canvas_height > 0.0 {
                    self.canvas_width / self.canvas_height
                } else {
                    log::warn!("Canvas height is zero, using aspect 1");
                    1.0
                };
                perspective(aspect)
            }
            CameraType::Orthographic => orthographic(
                -half_width,
                half_width,
                -half_height,
                half_height,
                PARALLEL_NEAR,
                PARALLEL_FAR,
            ),
            CameraType::Oblique => oblique(
                -half_width,
                half_width,
                -half_height,
                half_height,
                PARALLEL_NEAR,
                PARALLEL_FAR,
                rotation.y,
            ),
        };
    }

    pub(crate) fn set_type_raw(&mut self, camera_type: CameraType) {
        self.camera_type = camera_type;
        self.view = Matrix4::identity();
        self.projection = Matrix4::identity();
    }

    pub(crate) fn set_canvas_raw(&mut self, width: f32, height: f32) {
        self.canvas_width = width;
        self.canvas_height = height;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraType::Perspective, 10.0, 0.0)
    }
}

fn camera_parts(scene: &Scene, id: NodeId) -> Result<(Matrix4<f32>, Vector3<f32>), SceneError> {
    let node = scene.node(id).ok_or(SceneError::NodeNotFound(id))?;
    if node.camera().is_none() {
        return Err(SceneError::NotACamera(id));
    }
    Ok((*node.world_matrix(), node.rotation()))
}

impl Scene {
    fn with_camera<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Camera, &Matrix4<f32>, Vector3<f32>) -> R,
    ) -> Result<R, SceneError> {
        let (world, rotation) = camera_parts(self, id)?;
        let camera = self
            .node_mut(id)
            .and_then(|n| n.camera_mut())
            .ok_or(SceneError::NotACamera(id))?;
        Ok(f(camera, &world, rotation))
    }

    /// Switches projection type. TRS resets to identity and both matrices are
    /// rebuilt; radius and angle are kept. Setting the current type is a no-op.
    pub fn set_camera_type(&mut self, id: NodeId, camera_type: CameraType) -> Result<(), SceneError> {
        let current = self.with_camera(id, |c, _, _| c.camera_type())?;
        if current == camera_type {
            return Ok(());
        }
        self.with_camera(id, |c, _, _| c.set_type_raw(camera_type))?;
        self.set_transform(
            id,
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
        )?;
        self.with_camera(id, |c, world, rotation| {
            c.update_view(world, rotation);
            c.update_projection(rotation);
        })
    }

    /// Sets the orbit radius. Perspective cameras dolly (view changes); the
    /// parallel projections resize their frustum instead.
    pub fn zoom_camera(&mut self, id: NodeId, radius: f32) -> Result<(), SceneError> {
        self.with_camera(id, |c, world, rotation| {
            c.radius = radius;
            if c.camera_type() == CameraType::Perspective {
                c.update_view(world, rotation);
            } else {
                c.update_projection(rotation);
            }
        })
    }

    /// Sets the orbit angle in degrees.
    pub fn set_camera_angle(&mut self, id: NodeId, degrees: f32) -> Result<(), SceneError> {
        self.with_camera(id, |c, world, rotation| {
            c.angle = degrees.to_radians();
            c.update_view(world, rotation);
        })
    }

    /// Adds `degrees` to the node's Y rotation. Refreshes view and projection,
    /// since the oblique shear follows this angle.
    pub fn rotate_camera_y(&mut self, id: NodeId, degrees: f32) -> Result<(), SceneError> {
        let (_, rotation) = camera_parts(self, id)?;
        // The rotation setter already refreshes the view through world propagation
        self.set_rotation(id, rotation + Vector3::new(0.0, degrees, 0.0))?;
        self.with_camera(id, |c, _, rotation| c.update_projection(rotation))
    }

    /// Adds `degrees` to the node's X rotation.
    pub fn rotate_camera_x(&mut self, id: NodeId, degrees: f32) -> Result<(), SceneError> {
        let (_, rotation) = camera_parts(self, id)?;
        self.set_rotation(id, rotation + Vector3::new(degrees, 0.0, 0.0))
    }

    pub fn translate_camera_x(&mut self, id: NodeId, x: f32) -> Result<(), SceneError> {
        self.with_camera(id, |c, world, rotation| {
            c.center.x = x;
            c.update_view(world, rotation);
        })
    }

    pub fn translate_camera_y(&mut self, id: NodeId, y: f32) -> Result<(), SceneError> {
        self.with_camera(id, |c, world, rotation| {
            c.center.y = y;
            c.update_view(world, rotation);
        })
    }

    /// Updates the canvas size used for the perspective aspect ratio.
    pub fn set_camera_canvas(&mut self, id: NodeId, width: f32, height: f32) -> Result<(), SceneError> {
        self.with_camera(id, |c, _, rotation| {
            c.set_canvas_raw(width, height);
            c.update_projection(rotation);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::math::matrix::matrices_close;
    use crate::gfx::scene::{Node, NodeKind};

    fn camera_scene(camera: Camera) -> (Scene, NodeId) {
        let mut scene = Scene::new("root");
        let id = scene
            .insert(Node::new("cam", NodeKind::Camera(camera)), Some(scene.root()))
            .unwrap();
        (scene, id)
    }

    fn camera(scene: &Scene, id: NodeId) -> &Camera {
        scene.node(id).unwrap().camera().unwrap()
    }

    #[test]
    fn test_default_view_looks_down_negative_z() {
        let camera = Camera::default();
        // Origin lies 10 units in front of an eye at (0, 0, 10)
        let p = camera.view_matrix() * cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!((p.z + 10.0).abs() < 1e-4);
        assert!(p.x.abs() < 1e-5 && p.y.abs() < 1e-5);
    }

    #[test]
    fn test_zoom_perspective_changes_view_only() {
        let (mut scene, id) = camera_scene(Camera::default());
        let projection = *camera(&scene, id).projection_matrix();
        let view = *camera(&scene, id).view_matrix();

        scene.zoom_camera(id, 20.0).unwrap();
        assert_eq!(camera(&scene, id).radius, 20.0);
        assert!(!matrices_close(camera(&scene, id).view_matrix(), &view, 1e-6));
        assert!(matrices_close(camera(&scene, id).projection_matrix(), &projection, 1e-6));
    }

    #[test]
    fn test_zoom_orthographic_changes_projection_only() {
        let (mut scene, id) = camera_scene(Camera::new(CameraType::Orthographic, 4.0, 0.0));
        let projection = *camera(&scene, id).projection_matrix();
        let view = *camera(&scene, id).view_matrix();

        scene.zoom_camera(id, 8.0).unwrap();
        assert!(matrices_close(camera(&scene, id).view_matrix(), &view, 1e-6));
        assert!(!matrices_close(camera(&scene, id).projection_matrix(), &projection, 1e-6));
    }

    #[test]
    fn test_set_type_resets_transform() {
        let (mut scene, id) = camera_scene(Camera::default());
        scene.set_translation(id, Vector3::new(1.0, 2.0, 3.0)).unwrap();
        scene.set_camera_type(id, CameraType::Oblique).unwrap();

        let node = scene.node(id).unwrap();
        assert_eq!(node.translation(), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(node.camera().unwrap().camera_type(), CameraType::Oblique);
        assert_eq!(node.camera().unwrap().radius, 10.0);
    }

    #[test]
    fn test_rotate_y_accumulates_degrees_and_updates_oblique_shear() {
        let (mut scene, id) = camera_scene(Camera::new(CameraType::Oblique, 4.0, 0.0));
        let projection = *camera(&scene, id).projection_matrix();

        scene.rotate_camera_y(id, 15.0).unwrap();
        scene.rotate_camera_y(id, 15.0).unwrap();
        assert!((scene.node(id).unwrap().rotation().y - 30.0).abs() < 1e-3);
        assert!(!matrices_close(camera(&scene, id).projection_matrix(), &projection, 1e-6));
    }

    #[test]
    fn test_angle_is_set_in_degrees_and_stored_in_radians() {
        let (mut scene, id) = camera_scene(Camera::default());
        scene.set_camera_angle(id, 90.0).unwrap();
        assert!((camera(&scene, id).angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);

        // Eye now sits on +X, so the origin is 10 units ahead
        let p = camera(&scene, id).view_matrix() * cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!((p.z + 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_canvas_drives_perspective_aspect() {
        let (mut scene, id) = camera_scene(Camera::default());
        let before = *camera(&scene, id).projection_matrix();
        scene.set_camera_canvas(id, 800.0, 800.0).unwrap();
        assert_eq!(camera(&scene, id).canvas(), (800.0, 800.0));
        assert!(!matrices_close(camera(&scene, id).projection_matrix(), &before, 1e-6));
    }

    #[test]
    fn test_degenerate_eye_keeps_previous_view() {
        let mut camera = Camera::new(CameraType::Perspective, 0.0, 0.0);
        let view = *camera.view_matrix();
        camera.update_view(&Matrix4::identity(), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(*camera.view_matrix(), view);
        assert!(camera.view_matrix().x.x.is_finite());
    }

    #[test]
    fn test_camera_ops_on_non_camera_fail() {
        let mut scene = Scene::new("root");
        let root = scene.root();
        assert!(matches!(scene.zoom_camera(root, 2.0), Err(SceneError::NotACamera(_))));
        assert!(matches!(
            scene.zoom_camera(NodeId(4_242), 2.0),
            Err(SceneError::NodeNotFound(_))
        ));
    }
}
