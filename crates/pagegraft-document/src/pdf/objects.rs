// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Low-level lopdf helpers shared by the reader and the writer: reference
// resolution, inherited page attributes, cross-document object cloning and
// the PDF transformation matrix.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pagegraft_core::error::{PagegraftError, Result};
use tracing::warn;

/// Maximum number of hops followed through /Parent chains or reference
/// chains before giving up.
const MAX_CHAIN: usize = 32;

/// US Letter, used when a page has no usable /MediaBox anywhere in its tree.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page attributes a page may inherit from its ancestors in the page tree.
pub const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Follow references until a direct object is reached.
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    let mut current = object;
    for _ in 0..MAX_CHAIN {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(next) => current = next,
                Err(err) => {
                    warn!(?id, %err, "Dangling reference");
                    return current;
                }
            },
            _ => return current,
        }
    }
    current
}

/// A direct or referenced dictionary.
pub fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object) {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// A direct or referenced stream.
pub fn resolve_stream<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Stream> {
    match resolve(doc, object) {
        Object::Stream(stream) => Some(stream),
        _ => None,
    }
}

/// Numeric value of an integer or real object.
pub fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

/// Look up `key` on the page, then on each ancestor.
pub fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_CHAIN {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// The page's media box as `[llx, lly, urx, ury]` in PDF user space, with the
/// corners normalised so that `llx <= urx` and `lly <= ury`.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let parsed = inherited_attribute(doc, page_id, b"MediaBox").and_then(|object| {
        match resolve(doc, object) {
            Object::Array(items) if items.len() == 4 => {
                let values: Vec<f32> = items
                    .iter()
                    .filter_map(|item| as_number(resolve(doc, item)))
                    .collect();
                (values.len() == 4).then(|| [values[0], values[1], values[2], values[3]])
            }
            _ => None,
        }
    });

    match parsed {
        Some([x0, y0, x1, y1]) => [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)],
        None => {
            warn!(?page_id, "Page has no usable /MediaBox, assuming US Letter");
            DEFAULT_MEDIA_BOX
        }
    }
}

/// Convert a point in PDF user space (origin bottom-left of the media box,
/// y up) to page space (origin top-left, y down).
pub fn to_page_space(media_box: [f32; 4], x: f32, y: f32) -> (f32, f32) {
    let [left, _, _, top] = media_box;
    (x - left, top - y)
}

/// Contents of a stream with its filters undone. Unfiltered streams are
/// returned as-is.
pub fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .map_err(|err| PagegraftError::PdfError(format!("cannot decode stream: {}", err)))
    } else {
        Ok(stream.content.clone())
    }
}

/// The 1-indexed page map of `doc` turned into a 0-indexed lookup.
pub fn page_id(doc: &Document, index: usize) -> Result<ObjectId> {
    let pages = doc.get_pages();
    let page_number = u32::try_from(index + 1)
        .map_err(|_| PagegraftError::PdfError(format!("page index {} too large", index)))?;
    pages.get(&page_number).copied().ok_or_else(|| {
        PagegraftError::PdfError(format!(
            "page {} out of range (document has {} pages)",
            index + 1,
            pages.len()
        ))
    })
}

// -- Cross-document cloning ---------------------------------------------------

/// Copies objects from one document into another, following references.
///
/// Each source object is copied at most once per cloner, so shared resources
/// stay shared and reference cycles terminate. /Parent entries are dropped;
/// the caller re-links whatever it inserts into a page tree.
#[derive(Debug, Default)]
pub struct ObjectCloner {
    copied: HashMap<ObjectId, ObjectId>,
}

impl ObjectCloner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clone_object(&mut self, source: &Document, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.clone_reference(source, target, *id)),
            Object::Dictionary(dict) => Object::Dictionary(self.clone_dictionary(source, target, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.clone_object(source, target, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let dict = self.clone_dictionary(source, target, &stream.dict);
                let mut copy = Stream::new(dict, stream.content.clone());
                copy.allows_compression = stream.allows_compression;
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    pub fn clone_dictionary(
        &mut self,
        source: &Document,
        target: &mut Document,
        dict: &Dictionary,
    ) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            let cloned = self.clone_object(source, target, value);
            copy.set(key.clone(), cloned);
        }
        copy
    }

    fn clone_reference(&mut self, source: &Document, target: &mut Document, id: ObjectId) -> ObjectId {
        if let Some(copied) = self.copied.get(&id) {
            return *copied;
        }

        let new_id = target.new_object_id();
        self.copied.insert(id, new_id);

        let cloned = match source.get_object(id) {
            Ok(object) => self.clone_object(source, target, object),
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                Object::Null
            }
        };
        target.objects.insert(new_id, cloned);
        new_id
    }
}

// -- Transformation matrix ----------------------------------------------------

/// PDF transformation matrix `[a b c d e f]`, mapping `(x, y)` to
/// `(a·x + c·y + e, b·x + d·y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f32; 6]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    /// Parse six numeric operands or array items.
    pub fn from_objects(doc: &Document, objects: &[Object]) -> Option<Self> {
        if objects.len() != 6 {
            return None;
        }
        let mut values = [0.0f32; 6];
        for (slot, object) in values.iter_mut().zip(objects) {
            *slot = as_number(resolve(doc, object))?;
        }
        Some(Self(values))
    }

    /// `self × other`: apply `self` first, then `other`. This is how `cm`
    /// updates the CTM (`CTM' = M × CTM`).
    pub fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [na, nb, nc, nd, ne, nf] = other.0;
        Matrix([
            a * na + b * nc,
            a * nb + b * nd,
            c * na + d * nc,
            c * nb + d * nd,
            e * na + f * nc + ne,
            e * nb + f * nd + nf,
        ])
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// Bounding box `[x0, y0, x1, y1]` of the unit square under this
    /// transform: the area an image XObject covers.
    pub fn unit_square_bounds(&self) -> [f32; 4] {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ];
        corners.iter().fold(
            [f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY],
            |[x0, y0, x1, y1], (x, y)| [x0.min(*x), y0.min(*y), x1.max(*x), y1.max(*y)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn matrix_composition_matches_cm_semantics() {
        // Scale by 100x50, then move to (10, 20).
        let scale = Matrix([100.0, 0.0, 0.0, 50.0, 0.0, 0.0]);
        let translate = Matrix([1.0, 0.0, 0.0, 1.0, 10.0, 20.0]);
        let ctm = scale.then(&translate);
        assert_eq!(ctm.unit_square_bounds(), [10.0, 20.0, 110.0, 70.0]);
    }

    #[test]
    fn identity_is_neutral() {
        let m = Matrix([2.0, 0.5, -1.0, 3.0, 7.0, 9.0]);
        assert_eq!(m.then(&Matrix::IDENTITY), m);
        assert_eq!(Matrix::IDENTITY.then(&m), m);
    }

    #[test]
    fn media_box_is_inherited_from_the_page_tree() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 420.into(), 595.into()],
            }),
        );

        assert_eq!(media_box(&doc, page_id), [0.0, 0.0, 420.0, 595.0]);
    }

    #[test]
    fn page_space_is_relative_to_the_media_box_corner() {
        let media_box = [36.0, 18.0, 648.0, 810.0];
        assert_eq!(to_page_space(media_box, 36.0, 810.0), (0.0, 0.0));
        assert_eq!(to_page_space(media_box, 136.0, 700.0), (100.0, 110.0));
        assert_eq!(to_page_space([0.0, 0.0, 200.0, 300.0], 10.0, 20.0), (10.0, 280.0));
    }

    #[test]
    fn cloner_copies_shared_objects_once() {
        let mut source = Document::with_version("1.5");
        let shared = source.add_object(dictionary! { "Type" => "Font", "BaseFont" => "Helvetica" });
        let holder = dictionary! {
            "A" => shared,
            "B" => shared,
            "Parent" => shared,
        };

        let mut target = Document::with_version("1.5");
        let mut cloner = ObjectCloner::new();
        let copy = cloner.clone_dictionary(&source, &mut target, &holder);

        assert!(!copy.has(b"Parent"));
        let a = copy.get(b"A").unwrap().as_reference().unwrap();
        let b = copy.get(b"B").unwrap().as_reference().unwrap();
        assert_eq!(a, b);
        assert_eq!(target.objects.len(), 1);
    }
}
