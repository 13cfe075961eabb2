use serde::{Deserialize, Serialize};

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Default item colors, cycled by item id. Neighbors are spread apart in hue
/// so consecutive series stay distinguishable.
pub const DEFAULT_PALETTE: [Rgb; 20] = [
    Rgb::new(0xff, 0x00, 0x00),
    Rgb::new(0x19, 0x7f, 0x00),
    Rgb::new(0x00, 0x33, 0xff),
    Rgb::new(0xcc, 0x49, 0x28),
    Rgb::new(0x00, 0x4c, 0x0f),
    Rgb::new(0x28, 0x28, 0xcc),
    Rgb::new(0x7f, 0x33, 0x00),
    Rgb::new(0x28, 0xcc, 0x8a),
    Rgb::new(0x32, 0x00, 0x7f),
    Rgb::new(0xff, 0x99, 0x00),
    Rgb::new(0x00, 0x7f, 0x7f),
    Rgb::new(0xcc, 0x00, 0xff),
    Rgb::new(0xcc, 0xab, 0x28),
    Rgb::new(0x00, 0xcb, 0xff),
    Rgb::new(0xcc, 0x28, 0xab),
    Rgb::new(0x7f, 0x7f, 0x00),
    Rgb::new(0x28, 0x8a, 0xcc),
    Rgb::new(0x7f, 0x00, 0x33),
    Rgb::new(0x8a, 0xcc, 0x28),
    Rgb::new(0x00, 0x33, 0x7f),
];

#[must_use]
pub fn default_color(item_id: usize) -> Rgb {
    DEFAULT_PALETTE[item_id % DEFAULT_PALETTE.len()]
}
