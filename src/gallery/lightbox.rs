//! Full-screen photo viewer state: current index, zoom/pan/rotate transform
//! and gesture tracking.

/// Smallest zoom factor.
pub const MIN_ZOOM: f64 = 1.0;

/// Largest zoom factor.
pub const MAX_ZOOM: f64 = 4.0;

/// Zoom change per wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 0.2;

/// Zoom applied by double-clicking an unzoomed photo.
pub const DOUBLE_CLICK_ZOOM: f64 = 2.0;

/// Horizontal travel (px) beyond which a one-finger touch counts as a swipe.
pub const SWIPE_THRESHOLD_PX: f64 = 40.0;

/// Screen coordinates of a pointer or touch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Direction of the last navigation, used to pick the slide animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Zoom, pan and rotation applied to the open photo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
    /// Clockwise rotation, always one of 0, 90, 180, 270
    pub rotation_deg: u16,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: MIN_ZOOM,
            translate_x: 0.0,
            translate_y: 0.0,
            rotation_deg: 0,
        }
    }
}

impl Transform {
    pub fn is_zoomed(&self) -> bool {
        self.scale > MIN_ZOOM
    }

    /// CSS transform, e.g. `translate(0px, 0px) scale(1) rotate(90deg)`.
    pub fn css(&self) -> String {
        format!(
            "translate({}px, {}px) scale({}) rotate({}deg)",
            self.translate_x, self.translate_y, self.scale, self.rotation_deg
        )
    }
}

fn clamp_zoom(scale: f64) -> f64 {
    scale.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Lightbox state. Navigation methods take the current photo count so the
/// lightbox never holds on to the photo list itself.
#[derive(Debug, Clone, Default)]
pub struct Lightbox {
    index: Option<usize>,
    direction: Option<Direction>,
    transform: Transform,
    dragging: bool,
    drag_origin: Option<Point>,
    pinch_start: Option<f64>,
    pinch_base_scale: f64,
    swipe_start_x: Option<f64>,
    swipe_end_x: Option<f64>,
}

impl Lightbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the open photo, `None` when closed.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn is_open(&self) -> bool {
        self.index.is_some()
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Open photo `index` of `len`. Out-of-range indices are ignored.
    pub fn open(&mut self, index: usize, len: usize) -> bool {
        if index >= len {
            return false;
        }
        self.index = Some(index);
        self.direction = None;
        self.reset_transform();
        true
    }

    pub fn close(&mut self) {
        self.index = None;
        self.direction = None;
        self.reset_transform();
    }

    /// Advance one photo, wrapping past the last. No-op when closed or empty.
    pub fn next(&mut self, len: usize) -> Option<usize> {
        let current = self.index.filter(|_| len > 0)?;
        self.step(Direction::Next, (current + 1) % len)
    }

    /// Go back one photo, wrapping past the first. No-op when closed or empty.
    pub fn prev(&mut self, len: usize) -> Option<usize> {
        let current = self.index.filter(|_| len > 0)?;
        self.step(Direction::Prev, (current % len + len - 1) % len)
    }

    fn step(&mut self, direction: Direction, index: usize) -> Option<usize> {
        self.direction = Some(direction);
        self.index = Some(index);
        self.reset_transform();
        Some(index)
    }

    /// Photos worth loading ahead: the current one and both neighbours.
    pub fn preload_indices(&self, len: usize) -> Vec<usize> {
        let Some(current) = self.index.filter(|&i| i < len) else {
            return Vec::new();
        };
        // With one or two photos the neighbours coincide
        let mut indices = vec![current, (current + 1) % len, (current + len - 1) % len];
        indices.dedup();
        indices
    }

    /// Keep the open index valid after the photo list shrank to `len`.
    pub fn clamp_to(&mut self, len: usize) {
        if let Some(current) = self.index {
            if len == 0 {
                self.close();
            } else if current >= len {
                self.index = Some(len - 1);
                self.reset_transform();
            }
        }
    }

    /// Rotate a quarter turn clockwise.
    pub fn rotate(&mut self) {
        self.transform.rotation_deg = (self.transform.rotation_deg + 90) % 360;
    }

    /// Zoom by one wheel notch. Scrolling up (`delta_y < 0`) zooms in.
    pub fn wheel(&mut self, delta_y: f64) -> bool {
        if !self.is_open() {
            return false;
        }
        let notch = if delta_y > 0.0 {
            -1.0
        } else if delta_y < 0.0 {
            1.0
        } else {
            0.0
        };
        self.transform.scale = clamp_zoom(self.transform.scale + notch * WHEEL_ZOOM_STEP);
        true
    }

    /// Toggle between unzoomed and [`DOUBLE_CLICK_ZOOM`].
    pub fn double_click(&mut self) {
        if !self.is_open() {
            return;
        }
        if self.transform.scale == MIN_ZOOM {
            self.transform.scale = DOUBLE_CLICK_ZOOM;
        } else {
            self.reset_transform();
        }
    }

    /// Start a mouse drag. Only panning a zoomed photo is possible.
    pub fn mouse_down(&mut self, at: Point) {
        if !self.transform.is_zoomed() {
            return;
        }
        self.dragging = true;
        self.drag_origin = Some(at);
    }

    pub fn mouse_move(&mut self, at: Point) {
        self.pan_to(at);
    }

    pub fn mouse_up(&mut self) {
        self.dragging = false;
        self.drag_origin = None;
    }

    fn pan_to(&mut self, at: Point) {
        if !self.dragging {
            return;
        }
        if let Some(origin) = self.drag_origin {
            self.transform.translate_x += at.x - origin.x;
            self.transform.translate_y += at.y - origin.y;
        }
        self.drag_origin = Some(at);
    }

    /// Touches went down. Two fingers start a pinch; one finger pans a
    /// zoomed photo or starts a swipe.
    pub fn touch_start(&mut self, touches: &[Point]) {
        match touches {
            [a, b] => {
                self.pinch_start = Some(a.distance(*b));
                self.pinch_base_scale = self.transform.scale;
            }
            [t] if self.transform.is_zoomed() => {
                self.dragging = true;
                self.drag_origin = Some(*t);
            }
            [t] => {
                self.swipe_start_x = Some(t.x);
                self.swipe_end_x = None;
            }
            _ => {}
        }
    }

    pub fn touch_move(&mut self, touches: &[Point]) {
        match touches {
            [a, b] => {
                if let Some(start) = self.pinch_start.filter(|d| *d > 0.0) {
                    let ratio = a.distance(*b) / start;
                    self.transform.scale = clamp_zoom(self.pinch_base_scale * ratio);
                }
            }
            [t] if self.dragging => self.pan_to(*t),
            [t] => self.swipe_end_x = Some(t.x),
            _ => {}
        }
    }

    /// Touches lifted. An unzoomed horizontal swipe beyond
    /// [`SWIPE_THRESHOLD_PX`] navigates: leftwards to the next photo,
    /// rightwards to the previous one.
    pub fn touch_end(&mut self, len: usize) -> Option<usize> {
        self.pinch_start = None;
        self.dragging = false;
        self.drag_origin = None;

        if self.transform.is_zoomed() {
            return None;
        }

        let swipe = self.swipe_start_x.zip(self.swipe_end_x);
        self.swipe_start_x = None;
        self.swipe_end_x = None;

        let (start, end) = swipe?;
        let delta = end - start;
        if delta.abs() <= SWIPE_THRESHOLD_PX {
            return None;
        }
        if delta < 0.0 {
            self.next(len)
        } else {
            self.prev(len)
        }
    }

    fn reset_transform(&mut self) {
        self.transform = Transform::default();
        self.dragging = false;
        self.drag_origin = None;
    }
}
