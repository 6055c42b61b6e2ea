//! # Image Loading and Scaling
//!
//! Decodes question images and sizes them for the page. JPEG images pass
//! through without re-encoding (PDF supports DCTDecode natively). PNG images
//! are decoded to RGB pixels with a separate alpha channel for SMask
//! transparency.
//!
//! Scaling always preserves the aspect ratio: the image is set to the
//! configured target width and its height follows from the natural
//! `height / width` ratio, with no rounding.

use std::io::Cursor;

use crate::error::DecodeError;

/// A fully decoded/loaded image ready for PDF embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded directly with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded RGB pixels + optional alpha channel.
    Decoded {
        /// width * height * 3 bytes (RGB)
        rgb: Vec<u8>,
        /// width * height bytes (grayscale alpha). None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

/// Display size of an image after aspect-ratio-preserving scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledImage {
    pub width: f64,
    pub height: f64,
}

impl ScaledImage {
    /// Scale natural pixel dimensions to `target_width`.
    ///
    /// Panics if `target_width` is not positive or the natural width is zero;
    /// callers validate both before layout starts.
    pub fn fit_width(natural_width: u32, natural_height: u32, target_width: f64) -> Self {
        assert!(
            target_width.is_finite() && target_width > 0.0,
            "target width must be positive, got {target_width}"
        );
        assert!(natural_width > 0, "image natural width must be non-zero");
        let aspect_ratio = natural_height as f64 / natural_width as f64;
        Self {
            width: target_width,
            height: target_width * aspect_ratio,
        }
    }
}

impl LoadedImage {
    /// Display size of this image at `target_width`.
    pub fn scaled(&self, target_width: f64) -> ScaledImage {
        ScaledImage::fit_width(self.width_px, self.height_px, target_width)
    }
}

/// Compute the display size of encoded image bytes at `target_width`.
///
/// Only the image header is read; the decoder is dropped as soon as the
/// dimensions are known. This is the entry point for callers that need
/// sizes without pixels. Building a document decodes fully with
/// [`load_image`] and sizes through [`LoadedImage::scaled`].
pub fn scale(data: &[u8], target_width: f64) -> Result<ScaledImage, DecodeError> {
    let (width, height) = image_dimensions(data)?;
    Ok(ScaledImage::fit_width(width, height, target_width))
}

/// Read the natural pixel dimensions of encoded image bytes.
pub fn image_dimensions(data: &[u8]) -> Result<(u32, u32), DecodeError> {
    check_format(data)?;
    let (width, height) = {
        let reader = image::io::Reader::new(Cursor::new(data)).with_guessed_format()?;
        reader.into_dimensions()?
    };
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage);
    }
    Ok((width, height))
}

/// Detect image format from magic bytes and decode accordingly.
pub fn load_image(data: &[u8]) -> Result<LoadedImage, DecodeError> {
    let loaded = match check_format(data)? {
        Format::Jpeg => decode_jpeg(data)?,
        Format::Png => decode_png(data)?,
    };
    if loaded.width_px == 0 || loaded.height_px == 0 {
        return Err(DecodeError::EmptyImage);
    }
    Ok(loaded)
}

enum Format {
    Jpeg,
    Png,
}

fn check_format(data: &[u8]) -> Result<Format, DecodeError> {
    if data.len() < 4 {
        return Err(DecodeError::TooShort);
    }
    if is_jpeg(data) {
        Ok(Format::Jpeg)
    } else if is_png(data) {
        Ok(Format::Png)
    } else {
        Err(DecodeError::UnsupportedFormat)
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

/// JPEG: read dimensions and color space without decoding pixels.
/// The raw JPEG bytes are passed through to the PDF (DCTDecode).
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, DecodeError> {
    let (width, height) = image_dimensions(data)?;

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: detect_jpeg_color_space(data),
        },
        width_px: width,
        height_px: height,
    })
}

/// Scan JPEG markers to find the SOF (Start of Frame) segment and read
/// the number of components to determine color space.
fn detect_jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2; // skip SOI marker (FF D8)
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        // SOF markers: C0-C3, C5-C7, C9-CB, CD-CF
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            // length(2) + precision(1) + height(2) + width(2) + num_components(1)
            return if data[i + 9] == 1 {
                JpegColorSpace::DeviceGray
            } else {
                JpegColorSpace::DeviceRGB
            };
        }
        if i + 3 < data.len() {
            let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + seg_len;
        } else {
            break;
        }
    }
    JpegColorSpace::DeviceRGB
}

/// PNG: decode to RGBA, split into RGB + alpha.
fn decode_png(data: &[u8]) -> Result<LoadedImage, DecodeError> {
    let img = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()?;

    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();

    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;

    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        has_transparency |= pixel[3] != 255;
    }

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: has_transparency.then_some(alpha),
        },
        width_px: width,
        height_px: height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), width, height, image::ColorType::Rgba8)
            .unwrap();
        buf
    }

    #[test]
    fn test_is_jpeg() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_jpeg(&[0xFF]));
    }

    #[test]
    fn test_is_png() {
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_png(&[0x89, 0x50]));
    }

    #[test]
    fn test_too_short_data() {
        assert!(matches!(load_image(&[0x00, 0x01]), Err(DecodeError::TooShort)));
    }

    #[test]
    fn test_unsupported_format() {
        assert!(matches!(
            load_image(&[0x00, 0x01, 0x02, 0x03, 0x04]),
            Err(DecodeError::UnsupportedFormat)
        ));
    }

    #[test]
    fn truncated_png_is_a_decode_error() {
        let mut data = png(4, 4, [0, 0, 0, 255]);
        data.truncate(20);
        assert!(load_image(&data).is_err());
        assert!(scale(&data, 180.0).is_err());
    }

    #[test]
    fn test_decode_minimal_png() {
        let loaded = load_image(&png(1, 1, [255, 0, 0, 255])).unwrap();
        assert_eq!(loaded.width_px, 1);
        assert_eq!(loaded.height_px, 1);
        match &loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert!(alpha.is_none(), "Fully opaque should have no alpha");
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_decode_png_with_alpha() {
        let loaded = load_image(&png(1, 1, [255, 0, 0, 128])).unwrap();
        match &loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert_eq!(alpha.as_ref().unwrap(), &[128]);
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_decode_minimal_jpeg() {
        let img = image::RgbImage::from_fn(2, 2, |_, _| image::Rgb([0, 128, 255]));

        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgb8)
            .unwrap();

        let loaded = load_image(&buf).unwrap();
        assert_eq!(loaded.width_px, 2);
        assert_eq!(loaded.height_px, 2);
        match &loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert!(data.starts_with(&[0xFF, 0xD8]));
                assert_eq!(*color_space, JpegColorSpace::DeviceRGB);
            }
            _ => panic!("JPEG should stay as Jpeg variant"),
        }
    }

    #[test]
    fn scale_preserves_aspect_ratio() {
        let scaled = scale(&png(400, 300, [0, 0, 0, 255]), 180.0).unwrap();
        assert_eq!(scaled, ScaledImage { width: 180.0, height: 135.0 });
    }

    #[test]
    fn scale_tall_image() {
        let scaled = ScaledImage::fit_width(100, 700, 180.0);
        assert_eq!(scaled.width, 180.0);
        assert_eq!(scaled.height, 180.0 * 700.0 / 100.0);
    }

    #[test]
    fn loaded_and_header_scaling_agree() {
        let data = png(37, 91, [10, 20, 30, 255]);
        let from_header = scale(&data, 150.0).unwrap();
        let from_pixels = load_image(&data).unwrap().scaled(150.0);
        assert_eq!(from_header, from_pixels);
    }

    #[test]
    #[should_panic(expected = "target width must be positive")]
    fn zero_target_width_panics() {
        ScaledImage::fit_width(10, 10, 0.0);
    }
}
