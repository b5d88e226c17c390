//! Serialize a laid-out document to PDF bytes.
//!
//! Uses the three base-14 Helvetica faces with WinAnsi encoding, so no font
//! program is embedded. Images are stored as Flate-compressed RGB. Output is
//! deterministic: no timestamps or random ids are written.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};
use std::io::Write;

use crate::error::Result;
use crate::layout::{DrawOp, Font, LayoutDocument, Rgb};

const FONTS: [(Font, &[u8], &[u8]); 3] = [
    (Font::Regular, b"F1", b"Helvetica"),
    (Font::Bold, b"F2", b"Helvetica-Bold"),
    (Font::Italic, b"F3", b"Helvetica-Oblique"),
];

fn font_name(font: Font) -> Name<'static> {
    let key = FONTS
        .iter()
        .find(|(f, _, _)| *f == font)
        .map(|(_, key, _)| *key)
        .unwrap_or(b"F1");
    Name(key)
}

fn image_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Map text to WinAnsiEncoding bytes; unmappable characters become `?`.
pub fn to_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            '\t' => b' ',
            c if (c as u32) < 0x80 && !c.is_control() => c as u8,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn rgb(c: Rgb) -> (f32, f32, f32) {
    (
        f32::from(c.0) / 255.0,
        f32::from(c.1) / 255.0,
        f32::from(c.2) / 255.0,
    )
}

/// Content stream for one page. Layout y runs top-down, PDF y bottom-up.
fn page_content(ops: &[DrawOp], height: f32) -> Vec<u8> {
    let mut content = Content::new();
    for op in ops {
        match op {
            DrawOp::Text {
                x,
                y,
                text,
                font,
                size,
                color,
                ..
            } => {
                let (r, g, b) = rgb(*color);
                content.set_fill_rgb(r, g, b);
                content
                    .begin_text()
                    .set_font(font_name(*font), *size)
                    .next_line(*x, height - y)
                    .show(Str(&to_winansi(text)))
                    .end_text();
            }
            DrawOp::Rect {
                x,
                y,
                w,
                h,
                fill,
                stroke,
            } => {
                if let Some(c) = fill {
                    let (r, g, b) = rgb(*c);
                    content.set_fill_rgb(r, g, b);
                }
                if let Some(c) = stroke {
                    let (r, g, b) = rgb(*c);
                    content.set_stroke_rgb(r, g, b);
                    content.set_line_width(0.5);
                }
                content.rect(*x, height - y - h, *w, *h);
                match (fill.is_some(), stroke.is_some()) {
                    (true, true) => content.fill_nonzero_and_stroke(),
                    (true, false) => content.fill_nonzero(),
                    (false, true) => content.stroke(),
                    (false, false) => content.end_path(),
                };
            }
            DrawOp::Image { image, x, y, w, h } => {
                content.save_state();
                content.transform([*w, 0.0, 0.0, *h, *x, height - y - h]);
                content.x_object(Name(image_name(*image).as_bytes()));
                content.restore_state();
            }
        }
    }
    content.finish()
}

/// Render the layout into a complete PDF file.
pub fn render_pdf(layout: &LayoutDocument) -> Result<Vec<u8>> {
    let mut pdf = Pdf::new();
    let mut next_id = 1;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();

    let font_refs: Vec<(Name<'static>, Ref)> = FONTS
        .iter()
        .map(|(_, key, base)| {
            let id = alloc();
            pdf.type1_font(id)
                .base_font(Name(*base))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
            (Name(*key), id)
        })
        .collect();

    let mut image_refs = Vec::with_capacity(layout.images.len());
    for (i, img) in layout.images.iter().enumerate() {
        let id = alloc();
        let data = deflate(&img.rgb)?;
        let mut xobj = pdf.image_xobject(id, &data);
        xobj.filter(Filter::FlateDecode);
        xobj.width(img.width as i32);
        xobj.height(img.height as i32);
        xobj.color_space().device_rgb();
        xobj.bits_per_component(8);
        drop(xobj);
        image_refs.push((image_name(i), id));
    }

    let mut page_ids = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let page_id = alloc();
        let content_id = alloc();
        let stream = deflate(&page_content(&page.ops, layout.height))?;
        pdf.stream(content_id, &stream).filter(Filter::FlateDecode);

        let mut p = pdf.page(page_id);
        p.media_box(Rect::new(0.0, 0.0, layout.width, layout.height))
            .parent(pages_id)
            .contents(content_id);
        {
            let mut resources = p.resources();
            {
                let mut fonts = resources.fonts();
                for (name, id) in &font_refs {
                    fonts.pair(*name, *id);
                }
            }
            if !image_refs.is_empty() {
                let mut xobjects = resources.x_objects();
                for (name, id) in &image_refs {
                    xobjects.pair(Name(name.as_bytes()), *id);
                }
            }
        }
        drop(p);
        page_ids.push(page_id);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    let bytes = pdf.finish();
    log::debug!(
        "wrote pdf: {} pages, {} images, {} bytes",
        page_ids.len(),
        image_refs.len(),
        bytes.len()
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winansi_maps_typographic_punctuation() {
        assert_eq!(to_winansi("a – b"), vec![b'a', b' ', 0x96, b' ', b'b']);
        assert_eq!(to_winansi("é"), vec![0xE9]);
        assert_eq!(to_winansi("日"), vec![b'?']);
    }
}
