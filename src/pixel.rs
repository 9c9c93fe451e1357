/// A single framebuffer pixel, packed as `0xAARRGGBB`.
///
/// Alpha is kept so applications can composite in memory, but only the red,
/// green and blue channels ever go out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

/// A framebuffer of `width * height` pixels, indexed by `x + width * y`.
pub type PixelBuffer = Vec<Color>;

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    /// Build a color from its alpha, red, green and blue components
    pub const fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Color((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// Fully opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::from_argb(0xFF, r, g, b)
    }

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    /// The three bytes transmitted for this pixel, in OPC (RGB) order
    pub const fn to_rgb_bytes(self) -> [u8; 3] {
        [self.red(), self.green(), self.blue()]
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Color::rgb(r, g, b)
    }
}

/// Allocate a framebuffer filled with a single color
pub fn filled_buffer(width: usize, height: usize, color: Color) -> PixelBuffer {
    vec![color; width * height]
}
