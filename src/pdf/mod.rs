//! # PDF Serializer
//!
//! Takes the laid-out pages and writes a PDF 1.7 file. The writer is
//! from scratch: the subset needed here (standard Type1 fonts, image
//! XObjects, one content stream per page) is small enough that owning the
//! bytes is simpler than pulling in a PDF library.
//!
//! Layout coordinates are top-left based and in layout units; PDF space is
//! bottom-left based and in points. Every coordinate is flipped and scaled
//! on the way out.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, images)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```

use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::config::Unit;
use crate::font::{FontContext, FontKey};
use crate::image_loader::{ImagePixelData, JpegColorSpace, LoadedImage};
use crate::layout::{DrawCommand, LayoutElement, LayoutPage};
use crate::model::Metadata;

/// Ascent of the standard fonts as a fraction of the font size.
const ASCENT: f64 = 0.8;

pub struct PdfWriter {
    points_per_unit: f64,
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Font key -> object id; the position in this list is the /F index.
    font_objects: Vec<(FontKey, usize)>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }

    fn push_stream(&mut self, dict_entries: &str, payload: &[u8]) -> usize {
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< {} /Length {} >>\nstream\n",
            dict_entries,
            payload.len()
        );
        data.extend_from_slice(payload);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }
}

impl PdfWriter {
    pub fn new(unit: Unit) -> Self {
        Self {
            points_per_unit: unit.points_per_unit(),
        }
    }

    /// Write laid-out pages to a PDF byte vector.
    pub fn write(
        &self,
        pages: &[LayoutPage],
        metadata: &Metadata,
        font_context: &FontContext,
    ) -> Vec<u8> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
        };

        // Reserve object IDs:
        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        // 3+ = fonts, then per page: images, content stream, page object
        builder.push(Vec::new());
        builder.push(Vec::new());
        builder.push(Vec::new());

        self.register_fonts(&mut builder, pages, font_context);
        let font_resources = Self::build_font_resource_dict(&builder.font_objects);

        let mut page_obj_ids: Vec<usize> = Vec::new();
        for page in pages {
            let image_ids: Vec<usize> = page
                .elements
                .iter()
                .filter_map(|el| match &el.draw {
                    DrawCommand::Image { image_data } => {
                        Some(Self::write_image_xobject(&mut builder, image_data))
                    }
                    DrawCommand::Text { .. } => None,
                })
                .collect();

            let content = self.build_content_stream(page, &builder.font_objects);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);
            let content_obj_id = builder.push_stream("/Filter /FlateDecode", &compressed);

            let xobjects: String = image_ids
                .iter()
                .enumerate()
                .map(|(i, id)| format!("/Im{} {} 0 R", i, id))
                .collect::<Vec<_>>()
                .join(" ");
            let xobject_resources = if xobjects.is_empty() {
                String::new()
            } else {
                format!(" /XObject << {} >>", xobjects)
            };

            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << /Font << {} >>{} >> >>",
                page.width * self.points_per_unit,
                page.height * self.points_per_unit,
                content_obj_id,
                font_resources,
                xobject_resources
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let info_obj_id = builder.push(Self::build_info_dict(metadata).into_bytes());

        self.serialize(&builder, info_obj_id)
    }

    /// Build the PDF content stream for a single page.
    fn build_content_stream(&self, page: &LayoutPage, font_objects: &[(FontKey, usize)]) -> String {
        let mut stream = String::new();
        let mut image_index = 0;

        for element in &page.elements {
            match &element.draw {
                DrawCommand::Image { .. } => {
                    self.write_image(&mut stream, element, page.height, image_index);
                    image_index += 1;
                }
                DrawCommand::Text { content, font } => {
                    let idx = Self::font_index(&font.key(), font_objects);
                    self.write_text(&mut stream, element, page.height, content, idx, font.size);
                }
            }
        }

        stream
    }

    fn write_image(&self, stream: &mut String, element: &LayoutElement, page_height: f64, index: usize) {
        let ppu = self.points_per_unit;
        let x = element.x * ppu;
        let y = (page_height - element.y - element.height) * ppu;
        let _ = write!(
            stream,
            "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
            element.width * ppu,
            element.height * ppu,
            x,
            y,
            index
        );
    }

    /// Text sits on a baseline inside its line box: half the leading above
    /// the glyphs, then the ascent.
    fn write_text(
        &self,
        stream: &mut String,
        element: &LayoutElement,
        page_height: f64,
        content: &str,
        font_index: usize,
        font_size: f64,
    ) {
        if content.is_empty() {
            return;
        }
        let ppu = self.points_per_unit;
        let size_units = font_size / ppu;
        let leading = (element.height - size_units).max(0.0);
        let baseline = element.y + leading / 2.0 + size_units * ASCENT;

        let _ = write!(
            stream,
            "BT\n0 0 0 rg\n/F{} {:.1} Tf\n{:.2} {:.2} Td\n({}) Tj\nET\n",
            font_index,
            font_size,
            element.x * ppu,
            (page_height - baseline) * ppu,
            Self::encode_winansi_literal(content)
        );
    }

    /// Register fonts used across all pages. Each unique (family, weight,
    /// italic) combination gets its own PDF font object.
    fn register_fonts(&self, builder: &mut PdfBuilder, pages: &[LayoutPage], font_context: &FontContext) {
        let mut keys: Vec<FontKey> = pages
            .iter()
            .flat_map(|page| page.elements.iter())
            .filter_map(|el| match &el.draw {
                DrawCommand::Text { font, .. } => Some(font.key()),
                DrawCommand::Image { .. } => None,
            })
            .collect();

        // Sort for deterministic ordering, then dedup
        keys.sort();
        keys.dedup();

        // Always have at least Helvetica
        if keys.is_empty() {
            keys.push(FontKey {
                family: "Helvetica".to_string(),
                weight: 400,
                italic: false,
            });
        }

        for key in keys {
            let std_font = font_context.resolve(&key);
            let font_dict = format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                 /Encoding /WinAnsiEncoding >>",
                std_font.pdf_name()
            );
            let obj_id = builder.push(font_dict.into_bytes());
            builder.font_objects.push((key, obj_id));
        }
    }

    fn build_font_resource_dict(font_objects: &[(FontKey, usize)]) -> String {
        font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Look up the font index (/F0, /F1, etc.) for a font key.
    fn font_index(key: &FontKey, font_objects: &[(FontKey, usize)]) -> usize {
        font_objects
            .iter()
            .position(|(k, _)| k == key)
            .unwrap_or(0)
    }

    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                let color_space_str = match color_space {
                    JpegColorSpace::DeviceRGB => "/DeviceRGB",
                    JpegColorSpace::DeviceGray => "/DeviceGray",
                };
                builder.push_stream(
                    &format!(
                        "/Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace {} /BitsPerComponent 8 /Filter /DCTDecode",
                        image.width_px, image.height_px, color_space_str
                    ),
                    data,
                )
            }

            ImagePixelData::Decoded { rgb, alpha } => {
                // SMask goes first so the image can reference it
                let smask_ref = alpha
                    .as_ref()
                    .map(|alpha_data| {
                        let compressed_alpha = compress_to_vec_zlib(alpha_data, 6);
                        let id = builder.push_stream(
                            &format!(
                                "/Type /XObject /Subtype /Image /Width {} /Height {} \
                                 /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode",
                                image.width_px, image.height_px
                            ),
                            &compressed_alpha,
                        );
                        format!(" /SMask {} 0 R", id)
                    })
                    .unwrap_or_default();

                let compressed_rgb = compress_to_vec_zlib(rgb, 6);
                builder.push_stream(
                    &format!(
                        "/Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode{}",
                        image.width_px, image.height_px, smask_ref
                    ),
                    &compressed_rgb,
                )
            }
        }
    }

    fn build_info_dict(metadata: &Metadata) -> String {
        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title ({}) ", Self::encode_winansi_literal(title));
        }
        if let Some(ref subject) = metadata.subject {
            let _ = write!(info, "/Subject ({}) ", Self::encode_winansi_literal(subject));
        }
        let creator = metadata.creator.as_deref().unwrap_or("examset");
        let _ = write!(
            info,
            "/Creator ({}) /Producer (examset {}) >>",
            Self::encode_winansi_literal(creator),
            env!("CARGO_PKG_VERSION")
        );
        info
    }

    /// Encode text as the body of a PDF literal string in WinAnsiEncoding.
    /// Unmappable characters become `?`.
    fn encode_winansi_literal(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            let b = Self::unicode_to_winansi(ch).unwrap_or(b'?');
            match b {
                b'\\' => out.push_str("\\\\"),
                b'(' => out.push_str("\\("),
                b')' => out.push_str("\\)"),
                0x20..=0x7E => out.push(b as char),
                _ => {
                    let _ = write!(out, "\\{:03o}", b);
                }
            }
        }
        out
    }

    /// Map a Unicode codepoint to a WinAnsiEncoding byte value.
    ///
    /// WinAnsiEncoding is based on Windows-1252. Latin-1 maps directly; the
    /// 0x80-0x9F block holds typographic punctuation.
    fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        match cp {
            0x20AC => Some(0x80), // Euro sign
            0x201A => Some(0x82),
            0x0192 => Some(0x83),
            0x201E => Some(0x84),
            0x2026 => Some(0x85), // Ellipsis
            0x2020 => Some(0x86),
            0x2021 => Some(0x87),
            0x02C6 => Some(0x88),
            0x2030 => Some(0x89),
            0x0160 => Some(0x8A),
            0x2039 => Some(0x8B),
            0x0152 => Some(0x8C),
            0x017D => Some(0x8E),
            0x2018 => Some(0x91), // Curly quotes
            0x2019 => Some(0x92),
            0x201C => Some(0x93),
            0x201D => Some(0x94),
            0x2022 => Some(0x95), // Bullet
            0x2013 => Some(0x96), // En dash
            0x2014 => Some(0x97), // Em dash
            0x02DC => Some(0x98),
            0x2122 => Some(0x99),
            0x0161 => Some(0x9A),
            0x203A => Some(0x9B),
            0x0153 => Some(0x9C),
            0x017E => Some(0x9E),
            0x0178 => Some(0x9F),
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        // Header
        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let header = format!("{} 0 obj\n", i);
            output.extend_from_slice(header.as_bytes());
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FontSpec;

    fn a4() -> LayoutPage {
        LayoutPage {
            width: 210.0,
            height: 297.0,
            elements: vec![],
        }
    }

    fn text_element(content: &str, font: FontSpec, y: f64) -> LayoutElement {
        LayoutElement {
            x: 15.0,
            y,
            width: 50.0,
            height: 5.0,
            draw: DrawCommand::Text {
                content: content.to_string(),
                font,
            },
        }
    }

    fn write(pages: &[LayoutPage], metadata: &Metadata) -> String {
        let bytes = PdfWriter::new(Unit::Mm).write(pages, metadata, &FontContext::new());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn test_encode_winansi_literal() {
        assert_eq!(
            PdfWriter::encode_winansi_literal("Hello (World)"),
            "Hello \\(World\\)"
        );
        assert_eq!(PdfWriter::encode_winansi_literal("back\\slash"), "back\\\\slash");
        assert_eq!(PdfWriter::encode_winansi_literal("f\u{2019}(x)"), "f\\222\\(x\\)");
        assert_eq!(PdfWriter::encode_winansi_literal("\u{222B}"), "?");
    }

    #[test]
    fn test_empty_document_produces_valid_pdf() {
        let text = write(&[a4()], &Metadata::default());
        assert!(text.starts_with("%PDF-1.7"));
        assert!(text.contains("%%EOF"));
        assert!(text.contains("xref"));
        assert!(text.contains("trailer"));
    }

    #[test]
    fn media_box_is_in_points() {
        let text = write(&[a4()], &Metadata::default());
        assert!(text.contains("/MediaBox [0 0 595.28 841.89]"));
    }

    #[test]
    fn test_metadata_in_pdf() {
        let metadata = Metadata {
            title: Some("Practice Set".to_string()),
            subject: Some("Calculus".to_string()),
            creator: None,
        };
        let text = write(&[a4()], &metadata);
        assert!(text.contains("/Title (Practice Set)"));
        assert!(text.contains("/Subject (Calculus)"));
        assert!(text.contains("/Creator (examset)"));
    }

    #[test]
    fn test_bold_font_registered_separately() {
        let mut page = a4();
        page.elements.push(text_element("A", FontSpec::new("Helvetica", 11.0, false), 10.0));
        page.elements.push(text_element("B", FontSpec::new("Helvetica", 11.0, true), 20.0));
        let text = write(&[page], &Metadata::default());
        assert!(text.contains("/BaseFont /Helvetica "));
        assert!(text.contains("/BaseFont /Helvetica-Bold"));
    }

    #[test]
    fn image_becomes_xobject() {
        let mut page = a4();
        page.elements.push(LayoutElement {
            x: 15.0,
            y: 10.0,
            width: 180.0,
            height: 135.0,
            draw: DrawCommand::Image {
                image_data: LoadedImage {
                    pixel_data: ImagePixelData::Decoded {
                        rgb: vec![255, 0, 0],
                        alpha: Some(vec![128]),
                    },
                    width_px: 1,
                    height_px: 1,
                },
            },
        });
        let text = write(&[page], &Metadata::default());
        assert!(text.contains("/Subtype /Image /Width 1 /Height 1"));
        assert!(text.contains("/SMask"));
        assert!(text.contains("/XObject << /Im0"));
    }

    #[test]
    fn one_page_object_per_layout_page() {
        let text = write(&[a4(), a4(), a4()], &Metadata::default());
        assert!(text.contains("/Count 3"));
        assert_eq!(text.matches("/Type /Page ").count(), 3);
    }
}
