use wasm_bindgen::prelude::*;
use image::DynamicImage;
use js_sys::{Object, Reflect};

mod color;
mod error;
mod extract;
mod quality;

pub use color::{DEFAULT_TOLERANCE, MIN_SATURATION, Rgb8};
pub use error::PaletteError;
pub use extract::{Palette, PaletteExtractor, PixelBuffer};
pub use quality::Quality;

/// Extract the theme palette of an encoded image.
///
/// Steps performed:
/// 1. Decode the bytes (any format the `image` crate understands) to RGBA.
/// 2. Down-scale so that the longest side matches the `quality` tier.
/// 3. Count colors, pick the background, then primary, secondary and detail.
///
/// The returned object carries `background`, `primary`, `secondary`, `detail`
/// and `prominent` as `RRGGBB` hex strings. `quality` defaults to `"high"`.
#[wasm_bindgen]
pub fn extract_palette(input: Vec<u8>, quality: Option<String>) -> Result<Object, JsValue> {
    let quality = match quality {
        Some(q) => q.parse::<Quality>().map_err(|e| JsValue::from_str(&e.to_string()))?,
        None => Quality::default(),
    };

    let palette = extract_palette_bytes(&input, quality).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let result = Object::new();
    let entries = [
        ("background", palette.background),
        ("primary", palette.primary),
        ("secondary", palette.secondary),
        ("detail", palette.detail),
        ("prominent", palette.prominent_color()),
    ];
    for (key, color) in entries {
        Reflect::set(&result, &JsValue::from_str(key), &JsValue::from_str(&color.to_hex()))?;
    }

    Ok(result)
}

/// Decode `input` and extract its palette.
pub fn extract_palette_bytes(input: &[u8], quality: Quality) -> Result<Palette, PaletteError> {
    let img = image::load_from_memory(input)?;
    extract_palette_image(&img, quality)
}

/// Extract the palette of an already decoded image.
pub fn extract_palette_image(img: &DynamicImage, quality: Quality) -> Result<Palette, PaletteError> {
    let rgba8 = img.to_rgba8();
    let scaled = quality.downscale(&rgba8);
    let pixels = PixelBuffer::from_image(&scaled)?;
    Ok(PaletteExtractor.extract_colors(&pixels))
}
