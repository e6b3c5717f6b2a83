use std::cmp::Reverse;
use std::collections::HashMap;

use image::{ImageBuffer, Rgba, RgbaImage};

use crate::color::{DEFAULT_TOLERANCE, MIN_SATURATION, Rgb8};
use crate::error::PaletteError;
use crate::quality::Quality;

/// Pixels below this alpha are not counted.
const MIN_ALPHA: u8 = 127;
/// Fraction of the image height a color must exceed to be a background candidate.
const THRESHOLD_HEIGHT_FRACTION: f64 = 0.01;
/// A black/white background only gives way to a candidate above this share of its count.
const BACKGROUND_SWAP_RATIO: f64 = 0.3;

/// A borrowed, row-major RGBA buffer (4 bytes per pixel).
#[derive(Clone, Copy, Debug)]
pub struct PixelBuffer<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> PixelBuffer<'a> {
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> Result<Self, PaletteError> {
        if width == 0 || height == 0 {
            return Err(PaletteError::invalid(format!(
                "image has zero area ({width}x{height})"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| PaletteError::invalid(format!("{width}x{height} overflows")))?;
        if data.len() != expected {
            return Err(PaletteError::invalid(format!(
                "expected {expected} bytes for {width}x{height} RGBA, got {}",
                data.len()
            )));
        }
        Ok(PixelBuffer { width, height, data })
    }

    pub fn from_image(img: &'a RgbaImage) -> Result<Self, PaletteError> {
        let (w, h) = img.dimensions();
        PixelBuffer::new(w, h, img.as_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn pixels(&self) -> impl Iterator<Item = &'a [u8]> {
        self.data.chunks_exact(4)
    }
}

/// The four theme colors picked from an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Palette {
    pub background: Rgb8,
    pub primary: Rgb8,
    pub secondary: Rgb8,
    pub detail: Rgb8,
}

impl Palette {
    /// The most colorful member: the first of background, detail, primary and
    /// secondary that is not close to white or black. Falls back to the
    /// background when every member is.
    pub fn prominent_color(&self) -> Rgb8 {
        let is_extreme =
            |c: Rgb8| c.approx_eq(Rgb8::WHITE, DEFAULT_TOLERANCE) || c.approx_eq(Rgb8::BLACK, DEFAULT_TOLERANCE);

        [self.background, self.detail, self.primary, self.secondary]
            .into_iter()
            .find(|&c| !is_extreme(c))
            .unwrap_or(self.background)
    }

    /// Hex strings in background, primary, secondary, detail order.
    pub fn to_hex(&self) -> [String; 4] {
        [
            self.background.to_hex(),
            self.primary.to_hex(),
            self.secondary.to_hex(),
            self.detail.to_hex(),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ColorCount {
    color: Rgb8,
    count: u32,
}

/// Stateless palette extractor. Every call builds its own frequency table.
#[derive(Clone, Copy, Debug, Default)]
pub struct PaletteExtractor;

impl PaletteExtractor {
    /// Scale `pixels` for `quality`, then pick the palette.
    pub fn extract(&self, pixels: &PixelBuffer<'_>, quality: Quality) -> Result<Palette, PaletteError> {
        let view = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(pixels.width, pixels.height, pixels.data)
            .ok_or_else(|| PaletteError::invalid("failed to view pixel buffer as an image"))?;

        match quality.resize(&view) {
            Some(scaled) => Ok(self.extract_colors(&PixelBuffer::from_image(&scaled)?)),
            None => Ok(self.extract_colors(pixels)),
        }
    }

    /// Pick the palette from `pixels` as given, without any scaling.
    pub fn extract_colors(&self, pixels: &PixelBuffer<'_>) -> Palette {
        let counts = count_colors(pixels);
        let threshold = (f64::from(pixels.height) * THRESHOLD_HEIGHT_FRACTION).floor() as u32;

        let mut frequent: Vec<ColorCount> = counts
            .iter()
            .filter(|&(_, &count)| count > threshold)
            .map(|(&color, &count)| ColorCount { color, count })
            .collect();
        sort_by_frequency(&mut frequent);

        log::debug!(
            "{} distinct colors, {} above threshold {threshold}",
            counts.len(),
            frequent.len()
        );

        let background = select_background(&frequent);
        let candidates = foreground_candidates(&counts, !background.is_dark());
        let [primary, secondary, detail] = select_foreground(background, &candidates);

        let palette = Palette { background, primary, secondary, detail };
        log::debug!("extracted {palette:?}");
        palette
    }
}

/// Frequency of every RGB color among sufficiently opaque pixels.
fn count_colors(pixels: &PixelBuffer<'_>) -> HashMap<Rgb8, u32> {
    let mut counts = HashMap::new();
    for px in pixels.pixels() {
        if px[3] < MIN_ALPHA {
            continue;
        }
        *counts.entry(Rgb8::new(px[0], px[1], px[2])).or_insert(0) += 1;
    }
    counts
}

/// Descending count; equal counts fall back to the color so output never
/// depends on map iteration order.
fn sort_by_frequency(colors: &mut [ColorCount]) {
    colors.sort_by_key(|c| (Reverse(c.count), c.color));
}

fn select_background(frequent: &[ColorCount]) -> Rgb8 {
    let Some(&proposed) = frequent.first() else {
        log::debug!("no color above threshold, using black background");
        return Rgb8::BLACK;
    };

    if !proposed.color.is_black_or_white() {
        return proposed.color;
    }

    for next in &frequent[1..] {
        if f64::from(next.count) / f64::from(proposed.count) <= BACKGROUND_SWAP_RATIO {
            break;
        }
        if !next.color.is_black_or_white() {
            log::trace!("background {:?} swapped for {:?}", proposed.color, next.color);
            return next.color;
        }
    }
    proposed.color
}

/// Saturation-boosted colors of the requested darkness, most frequent first.
/// Counts belong to the color before boosting.
fn foreground_candidates(counts: &HashMap<Rgb8, u32>, find_dark: bool) -> Vec<ColorCount> {
    let mut candidates: Vec<ColorCount> = counts
        .iter()
        .map(|(&color, &count)| ColorCount {
            color: color.with_min_saturation(MIN_SATURATION),
            count,
        })
        .filter(|c| c.color.is_dark() == find_dark)
        .collect();
    sort_by_frequency(&mut candidates);
    candidates
}

/// Primary, secondary and detail, in that order, with a white or black fill
/// for any slot no candidate qualified for.
fn select_foreground(background: Rgb8, candidates: &[ColorCount]) -> [Rgb8; 3] {
    let mut primary: Option<Rgb8> = None;
    let mut secondary: Option<Rgb8> = None;
    let mut detail: Option<Rgb8> = None;

    for color in candidates.iter().map(|c| c.color) {
        if !color.is_contrasting(background) {
            continue;
        }
        match (primary, secondary) {
            (None, _) => primary = Some(color),
            (Some(p), None) => {
                if p.is_distinct(color) {
                    secondary = Some(color);
                }
            }
            (Some(p), Some(s)) => {
                if p.is_distinct(color) && s.is_distinct(color) {
                    detail = Some(color);
                    break;
                }
            }
        }
    }

    let fill = if background.is_dark() { Rgb8::WHITE } else { Rgb8::BLACK };
    [
        primary.unwrap_or(fill),
        secondary.unwrap_or(fill),
        detail.unwrap_or(fill),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(colors: &[(Rgb8, usize)]) -> Vec<u8> {
        colors
            .iter()
            .flat_map(|&(c, n)| std::iter::repeat_n([c.r, c.g, c.b, 255], n))
            .flatten()
            .collect()
    }

    fn extract(width: u32, height: u32, data: &[u8]) -> Palette {
        let pixels = PixelBuffer::new(width, height, data).unwrap();
        PaletteExtractor.extract(&pixels, Quality::Highest).unwrap()
    }

    const RED: Rgb8 = Rgb8::new(255, 0, 0);
    const BLUE: Rgb8 = Rgb8::new(0, 0, 255);
    const GREEN: Rgb8 = Rgb8::new(0, 255, 0);

    #[test]
    fn rejects_zero_dimensions() {
        assert!(matches!(
            PixelBuffer::new(0, 4, &[]),
            Err(PaletteError::InvalidInput { .. })
        ));
        assert!(matches!(
            PixelBuffer::new(4, 0, &[]),
            Err(PaletteError::InvalidInput { .. })
        ));
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(matches!(
            PixelBuffer::new(2, 2, &[0; 15]),
            Err(PaletteError::InvalidInput { .. })
        ));
        assert!(matches!(
            PixelBuffer::new(2, 2, &[0; 17]),
            Err(PaletteError::InvalidInput { .. })
        ));
        assert!(PixelBuffer::new(2, 2, &[0; 16]).is_ok());
    }

    #[test]
    fn transparent_image_falls_back_to_black_background() {
        let data = vec![0u8; 10 * 10 * 4];
        let palette = extract(10, 10, &data);
        assert_eq!(palette.background, Rgb8::BLACK);
        assert_eq!(palette.background.packed(), 0);
        assert_eq!(palette.primary, Rgb8::WHITE);
        assert_eq!(palette.secondary, Rgb8::WHITE);
        assert_eq!(palette.detail, Rgb8::WHITE);
    }

    #[test]
    fn pixels_below_alpha_threshold_are_ignored() {
        let mut data = rgba(&[(RED, 60), (BLUE, 40)]);
        // make every red pixel almost transparent
        for px in data.chunks_exact_mut(4).take(60) {
            px[3] = 126;
        }
        let palette = extract(10, 10, &data);
        assert_eq!(palette.background, BLUE);
    }

    #[test]
    fn alpha_of_127_still_counts() {
        let mut data = rgba(&[(RED, 60), (BLUE, 40)]);
        for px in data.chunks_exact_mut(4) {
            px[3] = 127;
        }
        assert_eq!(extract(10, 10, &data).background, RED);
    }

    #[test]
    fn white_background_gives_way_to_frequent_color() {
        let data = rgba(&[(Rgb8::WHITE, 70), (RED, 30)]);
        assert_eq!(extract(10, 10, &data).background, RED);
    }

    #[test]
    fn white_background_kept_when_alternative_is_rare() {
        // 20 / 80 = 0.25, not above the swap ratio
        let data = rgba(&[(Rgb8::WHITE, 80), (RED, 20)]);
        assert_eq!(extract(10, 10, &data).background, Rgb8::WHITE);
    }

    #[test]
    fn all_white_image_keeps_white_background() {
        let data = rgba(&[(Rgb8::WHITE, 100)]);
        let palette = extract(10, 10, &data);
        assert_eq!(palette.background, Rgb8::WHITE);
        // light background: unfilled slots are black
        assert_eq!(palette.primary, Rgb8::BLACK);
        assert_eq!(palette.secondary, Rgb8::BLACK);
        assert_eq!(palette.detail, Rgb8::BLACK);
    }

    #[test]
    fn background_scan_skips_other_black_or_white_candidates() {
        let data = rgba(&[(Rgb8::WHITE, 40), (Rgb8::BLACK, 35), (RED, 25)]);
        // 25 / 40 > 0.3 and black is skipped on the way
        assert_eq!(extract(10, 10, &data).background, RED);
    }

    #[test]
    fn background_scan_stops_at_first_rare_candidate() {
        let data = rgba(&[
            (Rgb8::WHITE, 70),
            (Rgb8::BLACK, 22),
            (RED, 8),
        ]);
        assert_eq!(extract(10, 10, &data).background, Rgb8::WHITE);
    }

    #[test]
    fn rare_colors_cannot_become_background() {
        // height 300 gives a threshold of 3; a single pixel of blue is noise
        let mut colors = vec![(Rgb8::WHITE, 299)];
        colors.push((BLUE, 1));
        let data = rgba(&colors);
        assert_eq!(extract(1, 300, &data).background, Rgb8::WHITE);
    }

    #[test]
    fn colors_at_the_threshold_are_discarded() {
        // threshold is floor(300 * 0.01) = 3, counts must be strictly greater
        let data = rgba(&[(RED, 3), (BLUE, 297)]);
        let pixels = PixelBuffer::new(1, 300, &data).unwrap();
        let counts = count_colors(&pixels);
        assert_eq!(counts[&RED], 3);
        assert_eq!(extract(1, 300, &data).background, BLUE);

        // a fully transparent majority leaves only the red at the threshold
        let mut data = rgba(&[(RED, 3), (BLUE, 297)]);
        for px in data.chunks_exact_mut(4).skip(3) {
            px[3] = 0;
        }
        assert_eq!(extract(1, 300, &data).background, Rgb8::BLACK);
    }

    #[test]
    fn half_red_half_blue_finds_no_light_foreground() {
        let data = rgba(&[(RED, 128 * 64), (BLUE, 128 * 64)]);
        let palette = extract(128, 128, &data);
        assert!(palette.background == RED || palette.background == BLUE);
        // both colors are dark, so the light-foreground search comes up empty
        assert_eq!(palette.primary, Rgb8::WHITE);
        assert_eq!(palette.secondary, Rgb8::WHITE);
        assert_eq!(palette.detail, Rgb8::WHITE);
    }

    #[test]
    fn foreground_slots_follow_frequency_and_distinctness() {
        let yellow = Rgb8::new(255, 255, 0);
        let cyan = Rgb8::new(0, 255, 255);
        let pale_yellow = Rgb8::new(250, 250, 40);
        let teal = Rgb8::new(0, 250, 230);
        let data = rgba(&[
            (Rgb8::new(20, 20, 120), 45),
            (yellow, 20),
            (pale_yellow, 15),
            (cyan, 10),
            (teal, 6),
            (GREEN, 4),
        ]);
        let palette = extract(10, 10, &data);
        assert_eq!(palette.background, Rgb8::new(20, 20, 120));
        assert_eq!(palette.primary, yellow);
        // pale yellow is too close to yellow to be secondary
        assert_eq!(palette.secondary, cyan);
        // teal is distinct from yellow but too close to cyan to be detail
        assert_eq!(palette.detail, GREEN);
    }

    #[test]
    fn low_contrast_candidates_are_passed_over() {
        let yellow = Rgb8::new(255, 255, 0);
        let data = rgba(&[
            (Rgb8::new(120, 120, 120), 60),
            (Rgb8::new(150, 150, 150), 25),
            (yellow, 15),
        ]);
        let palette = extract(10, 10, &data);
        assert_eq!(palette.background, Rgb8::new(120, 120, 120));
        // the lighter gray is boosted to a light pink but sits too close in
        // luminance to the background
        assert_eq!(palette.primary, yellow);
        assert_eq!(palette.secondary, Rgb8::WHITE);
        assert_eq!(palette.detail, Rgb8::WHITE);
    }

    #[test]
    fn dark_foreground_sought_on_light_background() {
        let navy = Rgb8::new(0, 0, 128);
        let maroon = Rgb8::new(128, 0, 0);
        let data = rgba(&[(Rgb8::new(240, 230, 140), 60), (navy, 25), (maroon, 15)]);
        let palette = extract(10, 10, &data);
        assert_eq!(palette.background, Rgb8::new(240, 230, 140));
        assert_eq!(palette.primary, navy);
        assert_eq!(palette.secondary, maroon);
        assert_eq!(palette.detail, Rgb8::BLACK);
    }

    #[test]
    fn foreground_candidates_are_saturation_boosted() {
        let data = rgba(&[(Rgb8::new(20, 20, 120), 90), (Rgb8::WHITE, 10)]);
        let palette = extract(10, 10, &data);
        assert_eq!(palette.background, Rgb8::new(20, 20, 120));
        // white is boosted to a light red before it is considered
        assert_eq!(palette.primary.g, 216);
        assert_eq!(palette.primary.b, 216);
        assert_eq!(palette.secondary, Rgb8::WHITE);
    }

    #[test]
    fn extraction_is_deterministic() {
        let data: Vec<u8> = (0..64u32 * 64)
            .flat_map(|i| {
                let v = (i % 7) as u8;
                [v * 36, 255 - v * 30, (i % 3) as u8 * 100, 255]
            })
            .collect();
        let first = extract(64, 64, &data);
        for _ in 0..5 {
            assert_eq!(extract(64, 64, &data), first);
        }
    }

    #[test]
    fn downscaling_quality_still_returns_full_palette() {
        let data = rgba(&[(RED, 300 * 200), (Rgb8::new(255, 255, 0), 300 * 100)]);
        let pixels = PixelBuffer::new(300, 300, &data).unwrap();
        let palette = PaletteExtractor.extract(&pixels, Quality::Lowest).unwrap();
        assert_eq!(palette.background, RED);
        assert_eq!(palette.primary, Rgb8::new(255, 255, 0));
    }

    #[test]
    fn prominent_color_skips_white_and_black() {
        let palette = Palette {
            background: Rgb8::WHITE,
            primary: RED,
            secondary: GREEN,
            detail: Rgb8::BLACK,
        };
        assert_eq!(palette.prominent_color(), RED);
    }

    #[test]
    fn prominent_color_prefers_detail_over_primary() {
        let palette = Palette {
            background: Rgb8::new(10, 10, 10),
            primary: RED,
            secondary: GREEN,
            detail: BLUE,
        };
        assert_eq!(palette.prominent_color(), BLUE);
    }

    #[test]
    fn prominent_color_falls_back_to_background() {
        let palette = Palette {
            background: Rgb8::new(240, 240, 240),
            primary: Rgb8::BLACK,
            secondary: Rgb8::WHITE,
            detail: Rgb8::new(30, 30, 30),
        };
        assert_eq!(palette.prominent_color(), Rgb8::new(240, 240, 240));
    }

    #[test]
    fn palette_hex_order() {
        let palette = Palette {
            background: Rgb8::WHITE,
            primary: RED,
            secondary: GREEN,
            detail: BLUE,
        };
        assert_eq!(palette.to_hex(), ["FFFFFF", "FF0000", "00FF00", "0000FF"]);
    }
}
