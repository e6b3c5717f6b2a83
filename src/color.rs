use palette::Srgb;

/// Tolerance used when comparing colors on the normalized 0-1 scale.
pub const DEFAULT_TOLERANCE: f64 = 0.3;

/// Saturation floor applied to foreground candidates.
pub const MIN_SATURATION: f64 = 0.15;

const DARK_LUMINANCE: f64 = 127.5;
const WHITE_MIN_CHANNEL: u8 = 232;
const BLACK_MAX_CHANNEL: u8 = 23;
const DISTINCT_CHANNEL_GAP: f64 = 63.75;
const GRAY_CHANNEL_GAP: f64 = 7.65;
const CONTRAST_OFFSET: f64 = 12.75;
const CONTRAST_RATIO: f64 = 1.6;

/// An opaque 8-bit RGB color. Used directly as the key of the frequency table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Rgb8 = Rgb8::new(0, 0, 0);
    pub const WHITE: Rgb8 = Rgb8::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb8 { r, g, b }
    }

    /// Decimal packing `R * 1_000_000 + G * 1_000 + B`.
    pub fn packed(self) -> u32 {
        u32::from(self.r) * 1_000_000 + u32::from(self.g) * 1_000 + u32::from(self.b)
    }

    /// Inverse of [`Rgb8::packed`]. Returns `None` when a digit group exceeds 255.
    pub fn from_packed(value: u32) -> Option<Self> {
        let r = value / 1_000_000;
        let g = value / 1_000 % 1_000;
        let b = value % 1_000;
        Some(Rgb8::new(
            u8::try_from(r).ok()?,
            u8::try_from(g).ok()?,
            u8::try_from(b).ok()?,
        ))
    }

    /// Relative luminance on a 0-255 scale.
    #[inline(always)]
    pub fn luminance(self) -> f64 {
        0.2126 * f64::from(self.r) + 0.7152 * f64::from(self.g) + 0.0722 * f64::from(self.b)
    }

    pub fn is_dark(self) -> bool {
        self.luminance() < DARK_LUMINANCE
    }

    /// Near-white (every channel above 232) or near-black (every channel below 23).
    pub fn is_black_or_white(self) -> bool {
        let Rgb8 { r, g, b } = self;
        (r > WHITE_MIN_CHANNEL && g > WHITE_MIN_CHANNEL && b > WHITE_MIN_CHANNEL)
            || (r < BLACK_MAX_CHANNEL && g < BLACK_MAX_CHANNEL && b < BLACK_MAX_CHANNEL)
    }

    /// Whether the red channel sits within a few steps of both green and blue.
    fn is_near_gray(self) -> bool {
        let (r, g, b) = self.channels();
        (r - g).abs() < GRAY_CHANNEL_GAP && (r - b).abs() < GRAY_CHANNEL_GAP
    }

    /// Two colors are distinct when any channel differs by more than a quarter
    /// of the range. Two near-gray colors are never distinct.
    pub fn is_distinct(self, other: Rgb8) -> bool {
        let (r, g, b) = self.channels();
        let (or, og, ob) = other.channels();

        let far_apart = (r - or).abs() > DISTINCT_CHANNEL_GAP
            || (g - og).abs() > DISTINCT_CHANNEL_GAP
            || (b - ob).abs() > DISTINCT_CHANNEL_GAP;

        far_apart && !(self.is_near_gray() && other.is_near_gray())
    }

    /// Ratio of offset luminances, larger over smaller, must exceed 1.6.
    pub fn is_contrasting(self, other: Rgb8) -> bool {
        let lum = self.luminance() + CONTRAST_OFFSET;
        let other_lum = other.luminance() + CONTRAST_OFFSET;
        lum.max(other_lum) / lum.min(other_lum) > CONTRAST_RATIO
    }

    /// Raise the HSV saturation of this color to at least `min_saturation`,
    /// keeping hue and value. Colors already saturated enough come back as is.
    pub fn with_min_saturation(self, min_saturation: f64) -> Rgb8 {
        let (r, g, b) = self.channels();
        let (r, g, b) = (r / 255.0, g / 255.0, b / 255.0);

        let value = r.max(g).max(b);
        let chroma = value - r.min(g).min(b);
        let saturation = if value == 0.0 { 0.0 } else { chroma / value };

        if min_saturation <= saturation {
            return self;
        }

        let mut hue = if chroma == 0.0 {
            0.0
        } else if r == value {
            ((g - b) / chroma) % 6.0
        } else if g == value {
            2.0 + (b - r) / chroma
        } else {
            4.0 + (r - g) / chroma
        };
        if hue < 0.0 {
            hue += 6.0;
        }

        let chroma = value * min_saturation;
        let x = chroma * (1.0 - ((hue % 2.0) - 1.0).abs());
        let (r, g, b) = hue_sector(hue, chroma, x);
        let m = value - chroma;

        Rgb8::new(floor_channel(r + m), floor_channel(g + m), floor_channel(b + m))
    }

    /// Every channel within `tolerance` of `other` on the 0-1 scale.
    pub fn approx_eq(self, other: Rgb8, tolerance: f64) -> bool {
        let (r, g, b) = self.channels();
        let (or, og, ob) = other.channels();
        (r - or).abs() / 255.0 <= tolerance
            && (g - og).abs() / 255.0 <= tolerance
            && (b - ob).abs() / 255.0 <= tolerance
    }

    /// Uppercase `RRGGBB`, no leading `#`.
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    fn channels(self) -> (f64, f64, f64) {
        (f64::from(self.r), f64::from(self.g), f64::from(self.b))
    }
}

/// RGB chroma assignment for one of the six unit-wide hue sectors.
fn hue_sector(hue: f64, chroma: f64, x: f64) -> (f64, f64, f64) {
    match hue {
        h if h <= 1.0 => (chroma, x, 0.0),
        h if h <= 2.0 => (x, chroma, 0.0),
        h if h <= 3.0 => (0.0, chroma, x),
        h if h <= 4.0 => (0.0, x, chroma),
        h if h <= 5.0 => (x, 0.0, chroma),
        h if h < 6.0 => (chroma, 0.0, x),
        _ => (0.0, 0.0, 0.0),
    }
}

#[inline(always)]
fn floor_channel(unit: f64) -> u8 {
    (unit * 255.0).floor().clamp(0.0, 255.0) as u8
}

impl From<Rgb8> for Srgb<u8> {
    fn from(c: Rgb8) -> Self {
        Srgb::new(c.r, c.g, c.b)
    }
}

impl From<Srgb<u8>> for Rgb8 {
    fn from(c: Srgb<u8>) -> Self {
        Rgb8::new(c.red, c.green, c.blue)
    }
}
