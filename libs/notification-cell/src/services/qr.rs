// libs/notification-cell/src/services/qr.rs
use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;

use crate::error::NotificationError;

/// Turns a text payload into a PNG image.
pub trait ImageEncoder: Send + Sync {
    fn encode_qr(&self, payload: &str, size: u32) -> Result<Vec<u8>, NotificationError>;
}

#[derive(Debug, Default, Clone)]
pub struct QrPngEncoder;

impl ImageEncoder for QrPngEncoder {
    fn encode_qr(&self, payload: &str, size: u32) -> Result<Vec<u8>, NotificationError> {
        let code = QrCode::new(payload.as_bytes())
            .map_err(|e| NotificationError::Payload(format!("QR generation failed: {}", e)))?;

        let rendered = code
            .render::<Luma<u8>>()
            .min_dimensions(size, size)
            .quiet_zone(true)
            .build();

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(rendered)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| NotificationError::Payload(format!("PNG encoding failed: {}", e)))?;

        Ok(png)
    }
}
