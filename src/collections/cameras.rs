use log::debug;

use crate::camera::Camera;
use crate::collections::Slots;
use crate::handles::CameraHandle;

/// Every camera in the scene; exactly one of them, if any, is active.
#[derive(Default)]
pub struct CamerasCollection {
    cameras: Slots<CameraHandle, Box<dyn Camera>>,
    active: Option<CameraHandle>,
}

impl CamerasCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a camera. The first camera added becomes the active one.
    pub fn add_camera(&mut self, camera: Box<dyn Camera>) -> CameraHandle {
        debug!("CamerasCollection: adding '{}'", camera.name());
        let handle = self.cameras.insert(camera);
        if self.active.is_none() {
            self.active = Some(handle);
        }
        handle
    }

    pub fn remove_camera(&mut self, handle: CameraHandle) -> Option<Box<dyn Camera>> {
        let camera = self.cameras.remove(handle)?;
        if self.active == Some(handle) {
            self.active = None;
        }
        Some(camera)
    }

    /// Returns false if `handle` names no camera.
    pub fn set_active_camera(&mut self, handle: CameraHandle) -> bool {
        if self.cameras.get(handle).is_none() {
            return false;
        }
        self.active = Some(handle);
        true
    }

    pub fn active_handle(&self) -> Option<CameraHandle> {
        self.active
    }

    pub fn active_camera(&self) -> Option<&dyn Camera> {
        match self.cameras.get(self.active?) {
            Some(camera) => Some(camera.as_ref()),
            None => None,
        }
    }

    pub fn active_camera_mut(&mut self) -> Option<&mut dyn Camera> {
        match self.cameras.get_mut(self.active?) {
            Some(camera) => Some(camera.as_mut()),
            None => None,
        }
    }

    pub fn get(&self, handle: CameraHandle) -> Option<&dyn Camera> {
        match self.cameras.get(handle) {
            Some(camera) => Some(camera.as_ref()),
            None => None,
        }
    }

    pub fn get_mut(&mut self, handle: CameraHandle) -> Option<&mut dyn Camera> {
        match self.cameras.get_mut(handle) {
            Some(camera) => Some(camera.as_mut()),
            None => None,
        }
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    /// Passes a new viewport size on to every camera.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        for (_, camera) in self.cameras.iter_mut() {
            camera.set_viewport_size(width, height);
        }
    }
}
