use cgmath::{Rotation, SquareMatrix};

use crate::components::{HasTransform, Transform};

pub trait Camera: HasTransform {
    fn name(&self) -> &str;

    fn get_view(&self) -> &cgmath::Matrix4<f32>;
    fn get_projection(&self) -> &cgmath::Matrix4<f32>;
    /// Recomputes view and projection from the transform and lens settings.
    fn update_matrices(&mut self);

    fn get_width(&self) -> u32;
    fn get_height(&self) -> u32;
    fn set_viewport_size(&mut self, width: u32, height: u32);
}

/// View matrix of something looking down its local -z axis with +y up.
fn view_from_transform(transform: &Transform) -> cgmath::Matrix4<f32> {
    let position = cgmath::Point3::new(
        transform.translation.x,
        transform.translation.y,
        transform.translation.z,
    );
    let forward = transform.rotation.rotate_vector(cgmath::vec3(0.0, 0.0, -1.0));
    let up = transform.rotation.rotate_vector(cgmath::vec3(0.0, 1.0, 0.0));
    cgmath::Matrix4::look_to_rh(position, forward, up)
}

fn aspect_of(width: u32, height: u32) -> f32 {
    if width == 0 || height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

#[derive(Debug)]
pub struct PerspectiveCamera {
    pub name: String,

    pub view: cgmath::Matrix4<f32>,
    pub projection: cgmath::Matrix4<f32>,
    pub transform: Transform,

    pub fov: f32, // in deg
    pub aspect_ratio: f32,
    pub width: u32,
    pub height: u32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl PerspectiveCamera {
    pub fn new(
        name: String,
        position: cgmath::Vector3<f32>,
        fov: f32,
        width: u32,
        height: u32,
        near_plane: f32,
        far_plane: f32,
    ) -> Self {
        let mut camera = Self {
            name,

            view: cgmath::Matrix4::identity(),
            projection: cgmath::Matrix4::identity(),
            transform: Transform::from_translation(position),

            fov,
            aspect_ratio: aspect_of(width, height),

            width,
            height,

            near_plane,
            far_plane,
        };
        camera.update_matrices();
        camera
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    pub fn set_near_plane(&mut self, near_plane: f32) {
        self.near_plane = near_plane;
    }

    pub fn set_far_plane(&mut self, far_plane: f32) {
        self.far_plane = far_plane;
    }
}

impl HasTransform for PerspectiveCamera {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

impl Camera for PerspectiveCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_view(&self) -> &cgmath::Matrix4<f32> {
        &self.view
    }

    fn get_projection(&self) -> &cgmath::Matrix4<f32> {
        &self.projection
    }

    fn update_matrices(&mut self) {
        self.view = view_from_transform(&self.transform);
        self.projection = cgmath::perspective(
            cgmath::Deg(self.fov),
            self.aspect_ratio,
            self.near_plane,
            self.far_plane,
        );
    }

    fn get_width(&self) -> u32 {
        self.width
    }

    fn get_height(&self) -> u32 {
        self.height
    }

    fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.aspect_ratio = aspect_of(width, height);
    }
}

#[derive(Debug)]
pub struct OrthographicCamera {
    pub name: String,
    pub view: cgmath::Matrix4<f32>,
    pub projection: cgmath::Matrix4<f32>,
    pub transform: Transform,

    pub width: u32,
    pub height: u32,
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl OrthographicCamera {
    /// A camera seeing `half_height` units above and below its axis; the
    /// horizontal extent follows the viewport's aspect ratio.
    pub fn new(
        name: String,
        position: cgmath::Vector3<f32>,
        width: u32,
        height: u32,
        half_height: f32,
        near_plane: f32,
        far_plane: f32,
    ) -> Self {
        let half_width = half_height * aspect_of(width, height);
        let mut camera = Self {
            name,
            view: cgmath::Matrix4::identity(),
            projection: cgmath::Matrix4::identity(),
            transform: Transform::from_translation(position),
            width,
            height,
            left: -half_width,
            right: half_width,
            bottom: -half_height,
            top: half_height,
            near_plane,
            far_plane,
        };
        camera.update_matrices();
        camera
    }
}

impl HasTransform for OrthographicCamera {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

impl Camera for OrthographicCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_view(&self) -> &cgmath::Matrix4<f32> {
        &self.view
    }

    fn get_projection(&self) -> &cgmath::Matrix4<f32> {
        &self.projection
    }

    fn update_matrices(&mut self) {
        self.view = view_from_transform(&self.transform);
        self.projection = cgmath::ortho(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near_plane,
            self.far_plane,
        );
    }

    fn get_width(&self) -> u32 {
        self.width
    }

    fn get_height(&self) -> u32 {
        self.height
    }

    fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let half_height = (self.top - self.bottom) * 0.5;
        let center = (self.left + self.right) * 0.5;
        let half_width = half_height * aspect_of(width, height);
        self.left = center - half_width;
        self.right = center + half_width;
    }
}
