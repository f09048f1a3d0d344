use glam::Vec2;

/// 2D camera that trails the player and maps pointer positions into the
/// world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowCamera {
    pub position: Vec2,
    pub scale: f32,
    viewport: Vec2,
    offset_y: f32,
}

impl FollowCamera {
    pub fn new(width: u32, height: u32, offset_y: f32) -> Self {
        let mut camera = Self {
            position: Vec2::ZERO,
            scale: 1.0,
            viewport: Vec2::ONE,
            offset_y,
        };
        camera.resize(width, height);
        camera
    }

    /// Portrait viewports render at 1x, everything else at 1.5x.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width.max(1) as f32, height.max(1) as f32);
        self.scale = if self.viewport.x / self.viewport.y < 1.0 {
            1.0
        } else {
            1.5
        };
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn follow(&mut self, target: Vec2) {
        self.position = Vec2::new(target.x, target.y - self.offset_y);
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.viewport * 0.5) / self.scale + self.position
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.position) * self.scale + self.viewport * 0.5
    }
}
