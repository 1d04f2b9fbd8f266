//! Make a 256px cover thumbnail from an image file.
//!
//! Usage: cargo run --example thumbnail -- input.jpg output.png

use rasterpipe::{OutputFormat, Pipeline, Quality, ResizeConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let input = args.next().ok_or("usage: thumbnail <input> <output.png>")?;
    let output = args.next().ok_or("usage: thumbnail <input> <output.png>")?;

    let bytes = std::fs::read(&input)?;
    let mut pipeline = Pipeline::from_bytes(bytes).with_quality(Quality::High);
    pipeline.resize(ResizeConfig::cover(256, 256))?;
    pipeline.sharpen(25.0)?;
    let (png, meta) = pipeline.to_encoded(OutputFormat::Png, None)?;

    std::fs::write(&output, &png)?;
    println!(
        "{input}: {}x{} -> {}x{} ({} bytes, {:.1} ms)",
        meta.original_size.0,
        meta.original_size.1,
        meta.width,
        meta.height,
        png.len(),
        meta.processing_time_ms,
    );
    Ok(())
}
