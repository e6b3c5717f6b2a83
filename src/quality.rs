use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use image::{GenericImageView, Rgba, RgbaImage};
use image::imageops::{self, FilterType};

use crate::error::PaletteError;

/// How far an image is scaled down before its colors are counted.
///
/// Every tier except [`Quality::Highest`] resizes the image so that its longest
/// side equals the tier size, keeping the aspect ratio.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Quality {
    /// Longest side of 50 pixels.
    Lowest,
    /// Longest side of 100 pixels.
    Low,
    /// Longest side of 250 pixels.
    #[default]
    High,
    /// Original size, no scaling.
    Highest,
}

impl Quality {
    /// Longest side after scaling, `None` when the image is analysed as is.
    pub fn target_size(self) -> Option<u32> {
        match self {
            Quality::Lowest => Some(50),
            Quality::Low => Some(100),
            Quality::High => Some(250),
            Quality::Highest => None,
        }
    }

    /// Output dimensions for an image of `width` x `height`.
    pub fn scaled_dimensions(self, width: u32, height: u32) -> (u32, u32) {
        let Some(scale) = self.target_size() else {
            return (width, height);
        };

        let max_side = width.max(height) as f32;
        if max_side == 0.0 {
            return (width, height);
        }
        let ratio = scale as f32 / max_side;
        let w = ((width as f32) * ratio).round().max(1.0) as u32;
        let h = ((height as f32) * ratio).round().max(1.0) as u32;
        (w, h)
    }

    /// Resize `img` for this tier. Nearest-neighbour sampling keeps the source
    /// colors exact so that they can still be counted.
    pub fn downscale(self, img: &RgbaImage) -> Cow<'_, RgbaImage> {
        match self.resize(img) {
            Some(scaled) => Cow::Owned(scaled),
            None => Cow::Borrowed(img),
        }
    }

    /// Resize any RGBA view for this tier, `None` when the size is unchanged.
    pub fn resize<I>(self, img: &I) -> Option<RgbaImage>
    where
        I: GenericImageView<Pixel = Rgba<u8>>,
    {
        let (in_w, in_h) = img.dimensions();
        let (out_w, out_h) = self.scaled_dimensions(in_w, in_h);

        // Fast path – no scaling required.
        if out_w == in_w && out_h == in_h {
            return None;
        }

        log::debug!("resizing {in_w}x{in_h} to {out_w}x{out_h} for {self} quality");
        Some(imageops::resize(img, out_w, out_h, FilterType::Nearest))
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Quality::Lowest => "lowest",
            Quality::Low => "low",
            Quality::High => "high",
            Quality::Highest => "highest",
        })
    }
}

impl FromStr for Quality {
    type Err = PaletteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lowest" => Ok(Quality::Lowest),
            "low" => Ok(Quality::Low),
            "high" => Ok(Quality::High),
            "highest" => Ok(Quality::Highest),
            _ => Err(PaletteError::UnknownQuality(s.to_string())),
        }
    }
}
