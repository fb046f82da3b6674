// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — build the output document page by page using `lopdf`.
//
// Pages are accumulated as lists of content operations plus the resources
// they reference, and only assembled into a page tree when the document is
// saved. Imported pages become Form XObjects, text uses the standard
// Helvetica font, images become Image XObjects.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, DynamicImage, ExtendedColorType, ImageDecoder, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use pagegraft_core::error::{PagegraftError, Result};
use pagegraft_core::{PageSize, Point, Rect, Rgb};
use tracing::{debug, info, instrument};

use super::engine::{OutputDocument, PageHandle, Release};
use super::objects::{self, ObjectCloner};

/// Resource name of the text font on every page that draws text.
const FONT_NAME: &str = "F1";

/// One output page under construction.
struct PageBuilder {
    size: PageSize,
    operations: Vec<Operation>,
    xobjects: Dictionary,
    uses_font: bool,
}

impl PageBuilder {
    fn new(size: PageSize) -> Self {
        Self {
            size,
            operations: Vec::new(),
            xobjects: Dictionary::new(),
            uses_font: false,
        }
    }

    /// Paint XObject `id` under `name` with the given transformation.
    fn paint_xobject(&mut self, name: String, id: ObjectId, matrix: [f32; 6]) {
        self.operations.push(Operation::new("q", vec![]));
        self.operations.push(Operation::new(
            "cm",
            matrix.iter().map(|value| Object::Real(*value)).collect(),
        ));
        self.operations
            .push(Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]));
        self.operations.push(Operation::new("Q", vec![]));
        self.xobjects.set(name, Object::Reference(id));
    }
}

/// Builds a new PDF document in memory and writes it out once.
pub struct PdfWriter {
    document: Document,
    pages: Vec<PageBuilder>,
    /// Helvetica font object, created on first use.
    font_id: Option<ObjectId>,
    /// Counter for XObject resource names.
    next_xobject: usize,
    /// Title metadata embedded in the /Info dictionary.
    title: Option<String>,
    saved: bool,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self {
            document: Document::with_version("1.5"),
            pages: Vec::new(),
            font_id: None,
            next_xobject: 0,
            title: None,
            saved: false,
        }
    }

    fn page_mut(&mut self, page: PageHandle) -> Result<&mut PageBuilder> {
        let count = self.pages.len();
        self.pages.get_mut(page.0).ok_or_else(|| {
            PagegraftError::PdfError(format!(
                "output page {} does not exist (document has {} pages)",
                page.0 + 1,
                count
            ))
        })
    }

    fn xobject_name(&mut self, prefix: &str) -> String {
        self.next_xobject += 1;
        format!("{}{}", prefix, self.next_xobject)
    }

    fn font(&mut self) -> ObjectId {
        if let Some(id) = self.font_id {
            return id;
        }
        let id = self.document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        self.font_id = Some(id);
        id
    }

    /// Assemble the page tree, catalog and info dictionary.
    fn finish(&mut self) -> Result<()> {
        let pages_id = self.document.new_object_id();
        let font_id = self.font_id;
        let mut kids = Vec::with_capacity(self.pages.len());

        for builder in self.pages.drain(..) {
            let content = Content {
                operations: builder.operations,
            };
            let encoded = content.encode().map_err(|err| {
                PagegraftError::PdfError(format!("failed to encode page content: {}", err))
            })?;
            let content_id = self.document.add_object(Stream::new(dictionary! {}, encoded));

            let mut resources = Dictionary::new();
            if builder.uses_font
                && let Some(font_id) = font_id
            {
                resources.set("Font", dictionary! { FONT_NAME => font_id });
            }
            if !builder.xobjects.is_empty() {
                resources.set("XObject", builder.xobjects);
            }

            let page_id = self.document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    0.into(),
                    0.into(),
                    Object::Real(builder.size.width),
                    Object::Real(builder.size.height),
                ],
                "Contents" => content_id,
                "Resources" => resources,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        self.document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        self.document.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Producer" => Object::string_literal("pagegraft"),
        };
        if let Some(title) = &self.title {
            info.set("Title", Object::string_literal(title.as_str()));
        }
        let info_id = self.document.add_object(info);
        self.document.trailer.set("Info", info_id);

        self.document.compress();
        Ok(())
    }
}

impl Release for PdfWriter {
    fn release(self: Box<Self>) -> Result<()> {
        debug!(pages = self.pages.len(), saved = self.saved, "Output document released");
        Ok(())
    }
}

impl OutputDocument for PdfWriter {
    fn new_page(&mut self, size: PageSize) -> Result<PageHandle> {
        if !(size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0) {
            return Err(PagegraftError::PdfError(format!(
                "invalid page size {} x {}",
                size.width, size.height
            )));
        }
        self.pages.push(PageBuilder::new(size));
        Ok(PageHandle(self.pages.len() - 1))
    }

    #[instrument(skip(self, single_page_pdf), fields(page = page.0, bytes_len = single_page_pdf.len()))]
    fn show_page(&mut self, page: PageHandle, single_page_pdf: &[u8]) -> Result<()> {
        self.page_mut(page)?;

        let source = Document::load_mem(single_page_pdf).map_err(|err| {
            PagegraftError::PdfError(format!("failed to load page to show: {}", err))
        })?;
        let source_page = objects::page_id(&source, 0)?;
        let [x0, y0, x1, y1] = objects::media_box(&source, source_page);
        let content = source.get_page_content(source_page).map_err(|err| {
            PagegraftError::PdfError(format!("cannot read page content: {}", err))
        })?;

        let mut cloner = ObjectCloner::new();
        let resources = match objects::inherited_attribute(&source, source_page, b"Resources") {
            Some(resources) => cloner.clone_object(&source, &mut self.document, resources),
            None => Object::Dictionary(Dictionary::new()),
        };

        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "FormType" => 1,
                "BBox" => vec![
                    Object::Real(x0),
                    Object::Real(y0),
                    Object::Real(x1),
                    Object::Real(y1),
                ],
                "Resources" => resources,
            },
            content,
        );
        let form_id = self.document.add_object(form);

        let name = self.xobject_name("Pg");
        self.page_mut(page)?
            .paint_xobject(name, form_id, [1.0, 0.0, 0.0, 1.0, -x0, -y0]);

        debug!(width = x1 - x0, height = y1 - y0, "Page shown as form");
        Ok(())
    }

    fn insert_text(
        &mut self,
        page: PageHandle,
        origin: Point,
        text: &str,
        font_size: f32,
        color: Rgb,
    ) -> Result<()> {
        if !font_size.is_finite() || font_size <= 0.0 {
            return Err(PagegraftError::PdfError(format!(
                "invalid font size {}",
                font_size
            )));
        }
        if !origin.x.is_finite() || !origin.y.is_finite() {
            return Err(PagegraftError::PdfError(format!(
                "invalid text position ({}, {})",
                origin.x, origin.y
            )));
        }

        self.font();
        let builder = self.page_mut(page)?;
        let baseline = builder.size.height - origin.y;
        let channel = |value: f32| Object::Real(value.clamp(0.0, 1.0));

        builder.uses_font = true;
        builder.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(FONT_NAME.as_bytes().to_vec()), Object::Real(font_size)],
            ),
            Operation::new("rg", vec![channel(color.r), channel(color.g), channel(color.b)]),
            Operation::new("Td", vec![Object::Real(origin.x), Object::Real(baseline)]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    #[instrument(skip(self, data), fields(page = page.0, data_len = data.len()))]
    fn insert_image(&mut self, page: PageHandle, rect: Rect, data: &[u8]) -> Result<()> {
        if rect.is_empty() || !(rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite()) {
            return Err(PagegraftError::ImageError(format!(
                "cannot place image in degenerate rectangle {:?}",
                rect
            )));
        }
        self.page_mut(page)?;

        let embedded = embed_image(data)?;
        let (width, height) = (embedded.width, embedded.height);

        let mut image_stream = embedded.image;
        if let Some(mask) = embedded.soft_mask {
            let mask_id = self.document.add_object(mask);
            image_stream.dict.set("SMask", mask_id);
        }
        let image_id = self.document.add_object(image_stream);

        let placed = fit_rect(rect, width as f32, height as f32);
        let name = self.xobject_name("Im");
        let builder = self.page_mut(page)?;
        let bottom = builder.size.height - placed.y1;
        builder.paint_xobject(
            name,
            image_id,
            [placed.width(), 0.0, 0.0, placed.height(), placed.x0, bottom],
        );

        debug!(width, height, ?placed, "Image placed");
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn save(&mut self, path: &Path) -> Result<()> {
        if self.saved {
            return Err(PagegraftError::Persist {
                path: path.to_path_buf(),
                reason: "document has already been saved".into(),
            });
        }
        self.saved = true;

        let pages = self.pages.len();
        self.finish()?;
        self.document.save(path).map_err(|err| PagegraftError::Persist {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        info!(pages, "Wrote PDF to {}", path.display());
        Ok(())
    }
}

// -- Images -------------------------------------------------------------------

/// An image ready to be added as an XObject.
struct EmbeddedImage {
    image: Stream,
    soft_mask: Option<Stream>,
    width: u32,
    height: u32,
}

/// Turn encoded image bytes into XObject streams.
///
/// Accepted as-is: baseline JPEG in grey or RGB (embedded without
/// re-encoding) and 8-bit PNG in grey, grey+alpha, RGB or RGBA. Everything
/// else is rejected with [`PagegraftError::ImageError`].
fn embed_image(data: &[u8]) -> Result<EmbeddedImage> {
    let format = image::guess_format(data)
        .map_err(|_| PagegraftError::ImageError("unrecognised image encoding".into()))?;

    match format {
        ImageFormat::Jpeg => embed_jpeg(data),
        ImageFormat::Png => embed_png(data),
        other => Err(PagegraftError::ImageError(format!(
            "{:?} images cannot be embedded directly",
            other
        ))),
    }
}

fn embed_jpeg(data: &[u8]) -> Result<EmbeddedImage> {
    let decoder = JpegDecoder::new(Cursor::new(data))
        .map_err(|err| PagegraftError::ImageError(format!("unreadable JPEG: {}", err)))?;
    let (width, height) = decoder.dimensions();
    let color_space = match decoder.original_color_type() {
        ExtendedColorType::L8 => "DeviceGray",
        ExtendedColorType::Rgb8 => "DeviceRGB",
        other => {
            return Err(PagegraftError::ImageError(format!(
                "JPEG colour model {:?} not supported",
                other
            )));
        }
    };

    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        data.to_vec(),
    )
    .with_compression(false);

    Ok(EmbeddedImage {
        image: stream,
        soft_mask: None,
        width,
        height,
    })
}

fn embed_png(data: &[u8]) -> Result<EmbeddedImage> {
    let decoded = image::load_from_memory_with_format(data, ImageFormat::Png)
        .map_err(|err| PagegraftError::ImageError(format!("unreadable PNG: {}", err)))?;
    let (width, height) = (decoded.width(), decoded.height());

    let (color_space, samples, alpha) = match decoded.color() {
        ColorType::L8 => ("DeviceGray", decoded.into_bytes(), None),
        ColorType::Rgb8 => ("DeviceRGB", decoded.into_bytes(), None),
        ColorType::La8 => {
            let (grey, alpha) = split_alpha(decoded.into_bytes(), 1);
            ("DeviceGray", grey, Some(alpha))
        }
        ColorType::Rgba8 => {
            let (rgb, alpha) = split_alpha(decoded.into_bytes(), 3);
            ("DeviceRGB", rgb, Some(alpha))
        }
        other => {
            return Err(PagegraftError::ImageError(format!(
                "PNG colour model {:?} not supported",
                other
            )));
        }
    };

    let image_dict = |color_space: &str| {
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
        }
    };

    Ok(EmbeddedImage {
        image: Stream::new(image_dict(color_space), samples),
        soft_mask: alpha.map(|alpha| Stream::new(image_dict("DeviceGray"), alpha)),
        width,
        height,
    })
}

/// Separate interleaved samples into colour channels and an alpha channel.
fn split_alpha(samples: Vec<u8>, colour_channels: usize) -> (Vec<u8>, Vec<u8>) {
    let stride = colour_channels + 1;
    let pixels = samples.len() / stride;
    let mut colour = Vec::with_capacity(pixels * colour_channels);
    let mut alpha = Vec::with_capacity(pixels);
    for px in samples.chunks_exact(stride) {
        colour.extend_from_slice(&px[..colour_channels]);
        alpha.push(px[colour_channels]);
    }
    (colour, alpha)
}

/// Largest rectangle with the image's aspect ratio that fits in `rect`,
/// centred in it.
fn fit_rect(rect: Rect, image_width: f32, image_height: f32) -> Rect {
    if image_width <= 0.0 || image_height <= 0.0 {
        return rect;
    }
    let scale = (rect.width() / image_width).min(rect.height() / image_height);
    let (w, h) = (image_width * scale, image_height * scale);
    let x0 = rect.x0 + (rect.width() - w) / 2.0;
    let y0 = rect.y0 + (rect.height() - h) / 2.0;
    Rect::new(x0, y0, x0 + w, y0 + h)
}

// -- Text encoding ------------------------------------------------------------

/// Encode `text` for a WinAnsiEncoding simple font. Characters outside the
/// encoding become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            ' '..='~' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        })
        .collect()
}
