use qrcode::{render::svg, QrCode};
use tracing::{debug, warn};

use crate::error::TicketError;

/// Renders arbitrary strings as QR code SVG markup.
#[derive(Debug, Clone, Copy)]
pub struct QrRenderer {
    min_dimension: u32,
}

impl QrRenderer {
    pub fn new(min_dimension: u32) -> Self {
        Self { min_dimension }
    }

    pub fn render(&self, payload: &str) -> Result<String, TicketError> {
        let code = QrCode::new(payload.as_bytes()).map_err(|e| {
            warn!(error = %e, len = payload.len(), "qr encode failed");
            TicketError::PayloadTooLarge
        })?;

        let image = code
            .render()
            .min_dimensions(self.min_dimension, self.min_dimension)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();
        debug!(len = payload.len(), width = code.width(), "qr rendered");
        Ok(image)
    }
}

impl Default for QrRenderer {
    fn default() -> Self {
        Self::new(200)
    }
}
