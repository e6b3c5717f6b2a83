use clap::Parser;
use std::fs;
use std::path::PathBuf;
use image_theme_colors_wasm::{Quality, extract_palette_bytes};
use anyhow::Context;
use anyhow::Result;
use serde_json::json;

/// Print the background, primary, secondary and detail colors of images.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Down-scale tier used before counting colors: lowest, low, high or highest
    #[arg(short, long, default_value_t = Quality::High)]
    quality: Quality,

    /// Emit a JSON array instead of one line per image
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut results = Vec::with_capacity(args.inputs.len());

    for input in &args.inputs {
        let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
        let palette = extract_palette_bytes(&bytes, args.quality)
            .with_context(|| format!("palette extraction failed for {}", input.display()))?;
        let [background, primary, secondary, detail] = palette.to_hex();
        let prominent = palette.prominent_color().to_hex();

        if args.json {
            results.push(json!({
                "file": input.display().to_string(),
                "background": background,
                "primary": primary,
                "secondary": secondary,
                "detail": detail,
                "prominent": prominent,
            }));
        } else {
            println!(
                "{}: background #{background} primary #{primary} secondary #{secondary} detail #{detail} prominent #{prominent}",
                input.display()
            );
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    Ok(())
}
