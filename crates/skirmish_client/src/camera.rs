//! 2D view onto the battlefield: pan, zoom and screen/world conversion.
//!
//! The camera is presentation state, so it works in `f64` rather than the
//! simulation's fixed-point.

use skirmish_core::math::Vec2Fixed;

/// Camera tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    /// Pan speed in screen pixels per second at zoom 1.
    pub pan_speed: f64,
    /// Zoom change per wheel notch.
    pub zoom_speed: f64,
    /// Most zoomed out.
    pub min_zoom: f64,
    /// Most zoomed in.
    pub max_zoom: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            pan_speed: 500.0,
            zoom_speed: 0.1,
            min_zoom: 0.5,
            max_zoom: 3.0,
        }
    }
}

/// Position and zoom of the view.
///
/// `(x, y)` is the world point at the top-left corner of the viewport.
/// Panning keeps the view inside the world whenever the world is larger
/// than the view.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    x: f64,
    y: f64,
    zoom: f64,
    viewport: (f64, f64),
    world: (f64, f64),
    settings: CameraSettings,
}

impl Camera {
    /// A camera at the world origin with zoom 1.
    #[must_use]
    pub fn new(viewport: (f64, f64), world_size: Vec2Fixed, settings: CameraSettings) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
            viewport,
            world: world_size.to_f64(),
            settings,
        }
    }

    /// Top-left world point.
    #[must_use]
    pub const fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Current zoom; 2.0 shows everything twice as large.
    #[must_use]
    pub const fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Screen pixels to world units.
    #[must_use]
    pub fn screen_to_world(&self, sx: f64, sy: f64) -> Vec2Fixed {
        Vec2Fixed::from_f64(self.x + sx / self.zoom, self.y + sy / self.zoom)
    }

    /// World units to screen pixels.
    #[must_use]
    pub fn world_to_screen(&self, point: Vec2Fixed) -> (f64, f64) {
        let (wx, wy) = point.to_f64();
        ((wx - self.x) * self.zoom, (wy - self.y) * self.zoom)
    }

    /// Scroll by a direction over `elapsed_ms`. The direction is normalized
    /// so diagonals are not faster.
    pub fn pan(&mut self, dx: f64, dy: f64, elapsed_ms: u64) {
        let length = dx.hypot(dy);
        if length <= f64::EPSILON {
            return;
        }
        #[allow(clippy::cast_precision_loss)]
        let step = self.settings.pan_speed * (elapsed_ms as f64 / 1000.0) / self.zoom;
        self.x += dx / length * step;
        self.y += dy / length * step;
        self.clamp();
    }

    /// Center the view on a world point.
    pub fn center_on(&mut self, point: Vec2Fixed) {
        let (wx, wy) = point.to_f64();
        self.x = wx - self.viewport.0 / self.zoom / 2.0;
        self.y = wy - self.viewport.1 / self.zoom / 2.0;
        self.clamp();
    }

    /// Zoom by `notches` wheel steps, keeping the world point under the
    /// screen anchor fixed.
    pub fn zoom_at(&mut self, notches: f64, anchor: (f64, f64)) {
        let (ax, ay) = self.screen_to_world(anchor.0, anchor.1).to_f64();
        self.zoom = (self.zoom + notches * self.settings.zoom_speed)
            .clamp(self.settings.min_zoom, self.settings.max_zoom);
        self.x = ax - anchor.0 / self.zoom;
        self.y = ay - anchor.1 / self.zoom;
        self.clamp();
    }

    /// Resize the viewport.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
        self.clamp();
    }

    fn clamp(&mut self) {
        let max_x = (self.world.0 - self.viewport.0 / self.zoom).max(0.0);
        let max_y = (self.world.1 - self.viewport.1 / self.zoom).max(0.0);
        self.x = self.x.clamp(0.0, max_x);
        self.y = self.y.clamp(0.0, max_y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new((800.0, 600.0), Vec2Fixed::from_ints(2400, 1600), CameraSettings::default())
    }

    #[test]
    fn test_screen_world_round_trip() {
        let mut camera = camera();
        camera.center_on(Vec2Fixed::from_ints(1200, 800));
        let world = camera.screen_to_world(100.0, 50.0);
        assert_eq!(camera.world_to_screen(world), (100.0, 50.0));
    }

    #[test]
    fn test_pan_is_clamped_to_world() {
        let mut camera = camera();
        camera.pan(-1.0, -1.0, 1_000);
        assert_eq!(camera.position(), (0.0, 0.0));

        camera.pan(1.0, 0.0, 100_000);
        assert_eq!(camera.position(), (1600.0, 0.0));
    }

    #[test]
    fn test_zoom_is_clamped_and_anchored() {
        let mut camera = camera();
        camera.center_on(Vec2Fixed::from_ints(1200, 800));
        let anchor = (400.0, 300.0);
        let before = camera.screen_to_world(anchor.0, anchor.1).to_f64();

        camera.zoom_at(5.0, anchor);
        assert!((camera.zoom() - 1.5).abs() < 1e-9);
        let after = camera.screen_to_world(anchor.0, anchor.1).to_f64();
        assert!((after.0 - before.0).abs() < 1e-6);
        assert!((after.1 - before.1).abs() < 1e-6);

        camera.zoom_at(100.0, anchor);
        assert!((camera.zoom() - 3.0).abs() < 1e-9);
        camera.zoom_at(-100.0, anchor);
        assert!((camera.zoom() - 0.5).abs() < 1e-9);
    }
}
