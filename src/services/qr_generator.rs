use qrcode::render::svg;
use qrcode::QrCode;

#[derive(thiserror::Error, Debug)]
pub enum QrGenerationError {
    #[error("QR code generation failed: {0}")]
    QrCodeError(#[from] qrcode::types::QrError),

    #[error("PNG encoding failed: {0}")]
    PngEncoding(#[from] image::ImageError),
}

/// Renders an encoded token payload as an SVG QR glyph.
pub fn generate_qr_svg(payload: &str) -> Result<String, QrGenerationError> {
    let code = QrCode::new(payload.as_bytes())?;
    let svg = code.render::<svg::Color>().min_dimensions(200, 200).build();
    Ok(svg)
}

/// Renders an encoded token payload as a PNG QR glyph.
pub fn generate_qr_png(payload: &str) -> Result<Vec<u8>, QrGenerationError> {
    use image::{ImageBuffer, Luma};

    let code = QrCode::new(payload.as_bytes())?;

    // Each module is 10x10 pixels
    let module_size = 10u32;
    let width = code.width() as u32;
    let img_size = width * module_size;

    let mut img = ImageBuffer::<Luma<u8>, Vec<u8>>::new(img_size, img_size);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let module_x = x / module_size;
        let module_y = y / module_size;
        let module_color = code[(module_x as usize, module_y as usize)];
        *pixel = match module_color {
            qrcode::types::Color::Dark => Luma([0u8]),
            qrcode::types::Color::Light => Luma([255u8]),
        };
    }

    let mut png_data = Vec::new();
    image::DynamicImage::ImageLuma8(img).write_to(
        &mut std::io::Cursor::new(&mut png_data),
        image::ImageFormat::Png,
    )?;

    Ok(png_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::token;
    use uuid::Uuid;

    fn payload() -> String {
        token::encode(Uuid::new_v4(), token::mint(), b"test-signing-key").unwrap()
    }

    #[test]
    fn test_svg_generation() {
        let svg = generate_qr_svg(&payload()).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("</svg>"));
    }

    #[test]
    fn test_png_generation() {
        let png = generate_qr_png(&payload()).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
