// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Embedded image extraction — walks a page's content stream, tracks the
// current transformation matrix through q/Q/cm and Form XObjects, and
// reports every image XObject painted together with the area it covers.

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pagegraft_core::error::{PagegraftError, Result};
use pagegraft_core::{ImageRun, Rect};
use tracing::{debug, warn};

use super::objects::{self, Matrix};
use crate::image::codec;

/// Form XObjects nested deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 8;

/// Every image painted on the page, in painting order, with its bounding
/// box in page space (origin top-left).
///
/// Images stored as baseline JPEG are returned as the original JPEG stream.
/// Uncompressed or Flate-compressed 8-bit samples are re-encoded as PNG.
/// Anything else is returned as the raw stream bytes, which the caller will
/// most likely fail to decode and skip.
pub fn page_images(doc: &Document, page_id: ObjectId) -> Result<Vec<ImageRun>> {
    let media_box = objects::media_box(doc, page_id);

    let content = doc.get_page_content(page_id).map_err(|err| {
        PagegraftError::PdfError(format!("cannot read page content: {}", err))
    })?;
    let content = Content::decode(&content).map_err(|err| {
        PagegraftError::PdfError(format!("cannot parse page content: {}", err))
    })?;

    let resources = objects::inherited_attribute(doc, page_id, b"Resources")
        .and_then(|object| objects::resolve_dict(doc, object));

    let mut walker = Walker {
        doc,
        placements: Vec::new(),
    };
    walker.walk(&content.operations, resources, Matrix::IDENTITY, 0);

    let runs: Vec<ImageRun> = walker
        .placements
        .into_iter()
        .map(|(stream, ctm)| {
            let [x0, y0, x1, y1] = ctm.unit_square_bounds();
            let (left, top) = objects::to_page_space(media_box, x0, y1);
            let (right, bottom) = objects::to_page_space(media_box, x1, y0);
            let bbox = Rect::new(left, top, right, bottom);
            ImageRun::new(image_bytes(doc, stream), bbox)
        })
        .collect();

    debug!(?page_id, images = runs.len(), "Images located");
    Ok(runs)
}

struct Walker<'a> {
    doc: &'a Document,
    placements: Vec<(&'a Stream, Matrix)>,
}

impl<'a> Walker<'a> {
    fn walk(
        &mut self,
        operations: &[Operation],
        resources: Option<&'a Dictionary>,
        base: Matrix,
        depth: usize,
    ) {
        let mut ctm = base;
        let mut saved = Vec::new();

        for op in operations {
            match op.operator.as_str() {
                "q" => saved.push(ctm),
                "Q" => {
                    if let Some(previous) = saved.pop() {
                        ctm = previous;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_objects(self.doc, &op.operands) {
                        ctm = m.then(&ctm);
                    }
                }
                "Do" => self.paint(op, resources, ctm, depth),
                _ => {}
            }
        }
    }

    fn paint(&mut self, op: &Operation, resources: Option<&'a Dictionary>, ctm: Matrix, depth: usize) {
        let Some(Object::Name(name)) = op.operands.first() else {
            return;
        };
        let doc = self.doc;
        let Some(stream) = resources
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|xobjects| objects::resolve_dict(doc, xobjects))
            .and_then(|xobjects| xobjects.get(name).ok())
            .and_then(|xobject| objects::resolve_stream(doc, xobject))
        else {
            warn!(name = %String::from_utf8_lossy(name), "XObject not found in resources");
            return;
        };

        match stream.dict.get(b"Subtype") {
            Ok(Object::Name(subtype)) if subtype.as_slice() == b"Image" => {
                self.placements.push((stream, ctm));
            }
            Ok(Object::Name(subtype)) if subtype.as_slice() == b"Form" => {
                if depth >= MAX_FORM_DEPTH {
                    warn!(depth, "Form XObjects nested too deep, not descending");
                    return;
                }
                self.enter_form(stream, resources, ctm, depth);
            }
            _ => {}
        }
    }

    fn enter_form(
        &mut self,
        form: &'a Stream,
        inherited: Option<&'a Dictionary>,
        ctm: Matrix,
        depth: usize,
    ) {
        let doc = self.doc;
        let matrix = match form.dict.get(b"Matrix").map(|m| objects::resolve(doc, m)) {
            Ok(Object::Array(items)) => Matrix::from_objects(doc, items).unwrap_or(Matrix::IDENTITY),
            _ => Matrix::IDENTITY,
        };
        let resources = form
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|res| objects::resolve_dict(doc, res))
            .or(inherited);

        let content = match objects::stream_bytes(form).and_then(|bytes| {
            Content::decode(&bytes)
                .map_err(|err| PagegraftError::PdfError(format!("cannot parse form content: {}", err)))
        }) {
            Ok(content) => content,
            Err(err) => {
                warn!(%err, "Skipping unreadable Form XObject");
                return;
            }
        };

        self.walk(&content.operations, resources, matrix.then(&ctm), depth + 1);
    }
}

// -- Image bytes --------------------------------------------------------------

fn image_bytes(doc: &Document, stream: &Stream) -> Vec<u8> {
    let filters = filter_names(doc, &stream.dict);

    if filters.len() == 1 && filters[0] == b"DCTDecode" {
        return stream.content.clone();
    }

    if filters.iter().all(|filter| filter.as_slice() == b"FlateDecode")
        && let Some(png) = samples_to_png(doc, stream)
    {
        return png;
    }

    stream.content.clone()
}

fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").map(|filter| objects::resolve(doc, filter)) {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match objects::resolve(doc, item) {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn integer(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key)
        .ok()
        .and_then(|value| objects::resolve(doc, value).as_i64().ok())
}

/// Colour model of an image's samples.
#[derive(Debug, Clone, PartialEq)]
enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    Indexed { base: Box<ColorModel>, palette: Vec<u8> },
}

impl ColorModel {
    fn parse(doc: &Document, object: &Object) -> Option<Self> {
        match objects::resolve(doc, object) {
            Object::Name(name) => match name.as_slice() {
                b"DeviceGray" | b"G" | b"CalGray" => Some(Self::Gray),
                b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(Self::Rgb),
                b"DeviceCMYK" | b"CMYK" => Some(Self::Cmyk),
                _ => None,
            },
            Object::Array(items) => {
                let Some(Object::Name(family)) = items.first().map(|f| objects::resolve(doc, f)) else {
                    return None;
                };
                match family.as_slice() {
                    b"CalGray" => Some(Self::Gray),
                    b"CalRGB" => Some(Self::Rgb),
                    b"ICCBased" => {
                        let profile = objects::resolve_stream(doc, items.get(1)?)?;
                        match integer(doc, &profile.dict, b"N")? {
                            1 => Some(Self::Gray),
                            3 => Some(Self::Rgb),
                            4 => Some(Self::Cmyk),
                            _ => None,
                        }
                    }
                    b"Indexed" | b"I" => {
                        let base = Self::parse(doc, items.get(1)?)?;
                        if matches!(base, Self::Indexed { .. }) {
                            return None;
                        }
                        let palette = match objects::resolve(doc, items.get(3)?) {
                            Object::String(bytes, _) => bytes.clone(),
                            Object::Stream(stream) => objects::stream_bytes(stream).ok()?,
                            _ => return None,
                        };
                        Some(Self::Indexed {
                            base: Box::new(base),
                            palette,
                        })
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn components(&self) -> usize {
        match self {
            Self::Gray | Self::Indexed { .. } => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
        }
    }

    fn to_image(&self, width: u32, height: u32, samples: &[u8]) -> Option<DynamicImage> {
        let count = (width as usize).checked_mul(height as usize)?;
        let samples = samples.get(..count.checked_mul(self.components())?)?;

        match self {
            Self::Gray => GrayImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageLuma8),
            Self::Rgb => RgbImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageRgb8),
            Self::Cmyk => {
                let rgb = samples.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
                RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
            }
            Self::Indexed { base, palette } => {
                let stride = base.components();
                let mut expanded = Vec::with_capacity(count * stride);
                for &index in samples {
                    let start = usize::from(index) * stride;
                    expanded.extend_from_slice(palette.get(start..start + stride)?);
                }
                base.to_image(width, height, &expanded)
            }
        }
    }
}

fn cmyk_to_rgb(px: &[u8]) -> [u8; 3] {
    let k = 255 - u16::from(px[3]);
    let channel = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
    [channel(px[0]), channel(px[1]), channel(px[2])]
}

fn samples_to_png(doc: &Document, stream: &Stream) -> Option<Vec<u8>> {
    let dict = &stream.dict;
    if matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
        return None;
    }
    if integer(doc, dict, b"BitsPerComponent").unwrap_or(8) != 8 {
        return None;
    }

    let width = u32::try_from(integer(doc, dict, b"Width")?).ok()?;
    let height = u32::try_from(integer(doc, dict, b"Height")?).ok()?;
    let model = ColorModel::parse(doc, dict.get(b"ColorSpace").ok()?)?;
    let samples = objects::stream_bytes(stream).ok()?;

    let image = model.to_image(width, height, &samples)?;
    codec::encode_png(&image).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use lopdf::dictionary;

    /// A one-page document, 200 x 300 points, with the given resources and
    /// content stream.
    fn single_page(doc: &mut Document, resources: Dictionary, content: &str) -> ObjectId {
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 200.into(), 300.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        page_id
    }

    fn rgb_image_stream(width: i64, height: i64, samples: Vec<u8>) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            samples,
        )
    }

    #[test]
    fn locates_image_placed_by_cm() {
        let mut doc = Document::with_version("1.5");
        let image_id = doc.add_object(rgb_image_stream(2, 1, vec![255, 0, 0, 0, 0, 255]));
        let page_id = single_page(
            &mut doc,
            dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
            "q 100 0 0 50 10 20 cm /Im1 Do Q",
        );

        let runs = page_images(&doc, page_id).unwrap();

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].bbox, Rect::new(10.0, 230.0, 110.0, 280.0));
        assert_eq!(runs[0].source_format, Some(ImageFormat::Png));

        let decoded = codec::decode(&runs[0].raw_bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(1, 0).0, [0, 0, 255]);
    }

    #[test]
    fn jpeg_streams_pass_through_untouched() {
        let jpeg = {
            let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([9, 9, 9])));
            let mut out = std::io::Cursor::new(Vec::new());
            img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
            out.into_inner()
        };
        let mut doc = Document::with_version("1.5");
        let mut stream = rgb_image_stream(4, 4, jpeg.clone());
        stream.dict.set("Filter", "DCTDecode");
        let image_id = doc.add_object(stream);
        let page_id = single_page(
            &mut doc,
            dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
            "q 40 0 0 40 0 0 cm /Im1 Do Q",
        );

        let runs = page_images(&doc, page_id).unwrap();

        assert_eq!(runs[0].raw_bytes, jpeg);
        assert_eq!(runs[0].source_format, Some(ImageFormat::Jpeg));
    }

    #[test]
    fn descends_into_form_xobjects() {
        let mut doc = Document::with_version("1.5");
        let image_id = doc.add_object(rgb_image_stream(1, 1, vec![1, 2, 3]));
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 200.into(), 300.into()],
                "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), 50.into(), 0.into()],
                "Resources" => dictionary! { "XObject" => dictionary! { "Im" => image_id } },
            },
            b"q 20 0 0 20 0 0 cm /Im Do Q".to_vec(),
        ));
        let page_id = single_page(
            &mut doc,
            dictionary! { "XObject" => dictionary! { "Fm1" => form_id } },
            "q 1 0 0 1 0 100 cm /Fm1 Do Q",
        );

        let runs = page_images(&doc, page_id).unwrap();

        assert_eq!(runs.len(), 1);
        // Form matrix (+50, 0) then page cm (0, +100): x 50..70, y 100..120.
        assert_eq!(runs[0].bbox, Rect::new(50.0, 180.0, 70.0, 200.0));
    }

    #[test]
    fn graphics_state_is_restored_after_q() {
        let mut doc = Document::with_version("1.5");
        let image_id = doc.add_object(rgb_image_stream(1, 1, vec![0, 0, 0]));
        let page_id = single_page(
            &mut doc,
            dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
            "q 1 0 0 1 100 100 cm Q q 10 0 0 10 0 0 cm /Im1 Do Q",
        );

        let runs = page_images(&doc, page_id).unwrap();
        assert_eq!(runs[0].bbox, Rect::new(0.0, 290.0, 10.0, 300.0));
    }

    #[test]
    fn unsupported_sample_depth_yields_raw_bytes() {
        let mut doc = Document::with_version("1.5");
        let mut stream = rgb_image_stream(8, 1, vec![0b1010_1010]);
        stream.dict.set("BitsPerComponent", 1);
        stream.dict.set("ColorSpace", "DeviceGray");
        let image_id = doc.add_object(stream);
        let page_id = single_page(
            &mut doc,
            dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
            "/Im1 Do",
        );

        let runs = page_images(&doc, page_id).unwrap();
        assert_eq!(runs[0].raw_bytes, vec![0b1010_1010]);
        assert_eq!(runs[0].source_format, None);
    }

    #[test]
    fn indexed_samples_expand_through_the_palette() {
        let model = ColorModel::Indexed {
            base: Box::new(ColorModel::Rgb),
            palette: vec![0, 0, 0, 255, 128, 0],
        };
        let image = model.to_image(2, 1, &[1, 0]).unwrap().to_rgb8();
        assert_eq!(image.get_pixel(0, 0).0, [255, 128, 0]);
        assert_eq!(image.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn cmyk_conversion() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0]), [255, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), [0, 0, 0]);
        assert_eq!(cmyk_to_rgb(&[255, 0, 0, 0]), [0, 255, 255]);
    }

    #[test]
    fn short_sample_buffers_are_rejected() {
        assert!(ColorModel::Rgb.to_image(2, 2, &[0; 5]).is_none());
    }

    #[test]
    fn huge_dimensions_fall_back_to_raw_bytes() {
        let mut doc = Document::with_version("1.5");
        let max = i64::from(u32::MAX);
        let image_id = doc.add_object(rgb_image_stream(max, max, vec![1, 2, 3]));
        let page_id = single_page(
            &mut doc,
            dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
            "q 10 0 0 10 0 0 cm /Im1 Do Q",
        );

        let runs = page_images(&doc, page_id).unwrap();
        assert_eq!(runs[0].raw_bytes, vec![1, 2, 3]);
        assert!(ColorModel::Cmyk.to_image(u32::MAX, u32::MAX, &[0; 4]).is_none());
    }
}
