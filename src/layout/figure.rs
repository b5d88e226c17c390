//! Figure decoding and placement.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::{DrawOp, FlowEngine, Font, TextRole};
use crate::error::{ReportError, Result};
use crate::state::FigureRef;

/// Decoded 8-bit RGB pixels, alpha flattened onto white.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Strip an optional `data:<mime>;base64,` prefix and decode.
fn payload_bytes(payload: &str) -> Result<Vec<u8>> {
    let data = match payload.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => payload,
    };
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(ReportError::Image("empty payload".to_string()));
    }
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ReportError::Image(format!("bad base64: {}", e)))
}

pub fn decode_figure(fig: &FigureRef) -> Result<RasterImage> {
    let bytes = payload_bytes(&fig.base64)?;
    let img = image::load_from_memory(&bytes).map_err(|e| ReportError::Image(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(ReportError::Image("zero-sized image".to_string()));
    }

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for px in rgba.pixels() {
        let [r, g, b, a] = px.0;
        let a = u16::from(a);
        for c in [r, g, b] {
            rgb.push(((u16::from(c) * a + 255 * (255 - a)) / 255) as u8);
        }
    }
    Ok(RasterImage { width, height, rgb })
}

impl FlowEngine {
    /// Place one figure and its caption. Returns `false` if the image could
    /// not be decoded, in which case nothing is drawn.
    pub fn embed_figure(&mut self, fig: &FigureRef, fallback_number: usize) -> bool {
        let image = match decode_figure(fig) {
            Ok(image) => image,
            Err(e) => {
                log::warn!(
                    "skipping figure {} ({}): {}",
                    fig.local_index,
                    fig.file_name,
                    e
                );
                return false;
            }
        };

        let max_w = self.setup.content_width();
        let max_h = self.setup.figure_max_height;
        let (w, h) = (image.width as f32, image.height as f32);
        let scale = (max_w / w).min(max_h / h).min(1.0);
        let (w, h) = (w * scale, h * scale);

        if self.cursor + h + 50.0 > self.setup.bottom_limit() {
            self.new_page();
        }

        self.images.push(image);
        let x = self.setup.margin_left + (max_w - w) / 2.0;
        self.draw(DrawOp::Image {
            image: self.images.len() - 1,
            x,
            y: self.cursor,
            w,
            h,
        });
        self.cursor += h + 10.0;

        let number = if fig.local_index > 0 {
            fig.local_index as usize
        } else {
            fallback_number
        };
        self.write_caption(&format!("Figure {}: {}", number, fig.caption.trim()));
        self.cursor += 10.0;
        true
    }

    /// "Figures – <label>" followed by each figure, one at a time in order.
    pub fn render_section_figures(&mut self, label: &str, figures: &[FigureRef]) {
        if figures.is_empty() {
            return;
        }
        self.break_if_past(self.setup.bottom_limit() - 40.0);
        let size = self.setup.subheading_size;
        self.line(&format!("Figures – {}", label), Font::Bold, size, TextRole::Subheading);
        self.cursor += 20.0;

        for (i, fig) in figures.iter().enumerate() {
            self.embed_figure(fig, i + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_prefix_is_stripped() {
        assert_eq!(payload_bytes("data:image/png;base64,aGk=").unwrap(), b"hi");
        assert_eq!(payload_bytes("aG\nk=").unwrap(), b"hi");
    }

    #[test]
    fn garbage_payload_is_an_image_error() {
        let fig = FigureRef {
            base64: "not an image".into(),
            ..FigureRef::default()
        };
        assert!(matches!(decode_figure(&fig), Err(ReportError::Image(_))));
    }
}
