#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    /// Width over height, or 1 for a degenerate (minimized) viewport.
    pub fn aspect_ratio(&self) -> f32 {
        if self.width <= 0 || self.height <= 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}
