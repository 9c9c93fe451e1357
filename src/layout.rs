//! Logical LED index to framebuffer offset mapping.

/// Dense table of framebuffer offsets, indexed by logical LED index.
///
/// The table grows on demand when a higher index is registered and never
/// shrinks. Slots created implicitly by growth hold offset 0, so an LED that
/// was never registered shows whatever pixel sits at the framebuffer origin.
#[derive(Debug, Clone)]
pub struct Layout {
    width: usize,
    locations: Vec<usize>,
}

impl Layout {
    /// Create an empty layout for a framebuffer `width` pixels wide
    pub fn new(width: usize) -> Self {
        Layout {
            width,
            locations: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of registered LEDs (highest registered index + 1)
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Framebuffer offset for a logical LED index
    pub fn offset(&self, index: usize) -> Option<usize> {
        self.locations.get(index).copied()
    }

    /// All offsets in logical index order
    pub fn offsets(&self) -> &[usize] {
        &self.locations
    }

    /// Map LED `index` to the pixel at `(x, y)`
    pub fn register_led(&mut self, index: usize, x: usize, y: usize) {
        if index >= self.locations.len() {
            let needed = index + 1 - self.locations.len();
            self.locations.reserve_exact(needed);
            self.locations.resize(index + 1, 0);
        }
        self.locations[index] = x + self.width * y;
    }

    /// Register `count` LEDs spaced evenly along a line centered on `(x, y)`.
    ///
    /// The line runs at `angle` radians from the x axis. LED `i` of the strip
    /// gets logical index `start_index + i`, or `start_index + count - 1 - i`
    /// when `reversed`. Positions round half up; anything left of or above
    /// the framebuffer clamps to 0.
    #[allow(clippy::too_many_arguments)]
    pub fn register_strip(
        &mut self,
        start_index: usize,
        count: usize,
        x: f64,
        y: f64,
        spacing: f64,
        angle: f64,
        reversed: bool,
    ) {
        let (s, c) = angle.sin_cos();
        // Integer division: even-length strips sit half a step toward +x.
        let center = (count.saturating_sub(1) / 2) as f64;

        for i in 0..count {
            let index = if reversed {
                start_index + count - 1 - i
            } else {
                start_index + i
            };
            let step = (i as f64 - center) * spacing;
            let px = (x + step * c + 0.5) as usize;
            let py = (y + step * s + 0.5) as usize;
            self.register_led(index, px, py);
        }
    }
}
