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

    /// The whole framebuffer.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    /// Top-right quarter of the framebuffer (OpenGL origin is bottom-left).
    pub fn minimap(width: u32, height: u32) -> Self {
        let (w, h) = (width as i32 / 2, height as i32 / 2);
        Self::new(w, h, w, h)
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// The two viewports drawn each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameViewports {
    pub main: Viewport,
    pub minimap: Viewport,
}

impl FrameViewports {
    pub fn for_size(width: u32, height: u32) -> Self {
        Self {
            main: Viewport::full(width, height),
            minimap: Viewport::minimap(width, height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimap_is_top_right_quarter() {
        let vp = FrameViewports::for_size(800, 600);
        assert_eq!(vp.main, Viewport::new(0, 0, 800, 600));
        assert_eq!(vp.minimap, Viewport::new(400, 300, 400, 300));
    }

    #[test]
    fn zero_height_aspect_does_not_divide_by_zero() {
        assert_eq!(Viewport::new(0, 0, 10, 0).aspect_ratio(), 1.0);
    }
}
