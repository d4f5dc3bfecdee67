use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageOutputFormat;

/// Normalizes arbitrary image bytes to PNG and returns the Base64 payload.
pub fn encode_png_base64(bytes: &[u8]) -> Result<String, image::ImageError> {
    let image = image::load_from_memory(bytes)?;
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageOutputFormat::Png)?;
    Ok(STANDARD.encode(&buffer))
}

/// Encodes image bytes as a PNG data URI, usable wherever an image part
/// expects a URL.
pub fn png_data_uri(bytes: &[u8]) -> Result<String, image::ImageError> {
    Ok(format!("data:image/png;base64,{}", encode_png_base64(bytes)?))
}
