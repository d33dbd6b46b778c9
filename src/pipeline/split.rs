//! Page splitting: cut a multi-page PDF into standalone one-page PDFs.
//!
//! Every downstream collaborator (layout analysis, table detection) takes a
//! whole PDF file, so each page is grafted into a fresh document: the page
//! dictionary and every object reachable from it are copied, attributes the
//! page inherits from the page tree are pulled down onto it, and a new
//! one-page tree is built around it. Other pages and page-tree nodes are
//! never followed, so each page costs time in proportion to what it uses.
//!
//! Splitting is CPU-bound, so [`split_document`] runs it on the blocking
//! pool the same way rendering work is kept off the async workers.

use crate::error::TableSearchError;
use crate::model::PageUnit;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Split `document` into one [`PageUnit`] per page, in source order.
///
/// # Errors
/// [`TableSearchError::Decode`] when the payload is not a parseable PDF or
/// a page cannot be re-serialised.
pub async fn split_document(document: Vec<u8>) -> Result<Vec<PageUnit>, TableSearchError> {
    tokio::task::spawn_blocking(move || split_pages(&document))
        .await
        .map_err(|e| TableSearchError::Internal(format!("Split task panicked: {}", e)))?
}

/// Blocking implementation of [`split_document`].
pub fn split_pages(document: &[u8]) -> Result<Vec<PageUnit>, TableSearchError> {
    let source = Document::load_mem(document).map_err(|e| TableSearchError::Decode {
        detail: e.to_string(),
    })?;

    let pages = source.get_pages();
    info!("PDF loaded: {} pages", pages.len());
    let tree = page_tree_nodes(&source, &pages);

    let mut units = Vec::with_capacity(pages.len());
    for (idx, &page_id) in pages.values().enumerate() {
        let page_number = idx + 1;
        let decode_err = |e: lopdf::Error| TableSearchError::Decode {
            detail: format!("page {} could not be re-serialised: {}", page_number, e),
        };

        let mut single = extract_page(&source, page_id, &tree).map_err(decode_err)?;
        single.compress();

        let mut bytes = Vec::new();
        single
            .save_to(&mut bytes)
            .map_err(|e| decode_err(lopdf::Error::IO(e)))?;

        debug!("Split page {} → {} bytes", page_number, bytes.len());
        units.push(PageUnit { page_number, bytes });
    }

    Ok(units)
}

/// Every page and every intermediate `Pages` node of the page tree.
fn page_tree_nodes(source: &Document, pages: &BTreeMap<u32, ObjectId>) -> BTreeSet<ObjectId> {
    let mut nodes: BTreeSet<ObjectId> = pages.values().copied().collect();
    for &page_id in pages.values() {
        let mut parent = parent_of(source, page_id);
        // stop at the first ancestor already seen
        while let Some(id) = parent {
            if !nodes.insert(id) {
                break;
            }
            parent = parent_of(source, id);
        }
    }
    nodes
}

fn parent_of(source: &Document, id: ObjectId) -> Option<ObjectId> {
    source
        .get_dictionary(id)
        .and_then(|dict| dict.get(b"Parent"))
        .and_then(Object::as_reference)
        .ok()
}

/// Build a one-page document holding `page_id` and what it references.
fn extract_page(
    source: &Document,
    page_id: ObjectId,
    tree: &BTreeSet<ObjectId>,
) -> Result<Document, lopdf::Error> {
    let mut page = source.get_dictionary(page_id)?.clone();
    let mut ancestor = parent_of(source, page_id);
    while let Some(id) = ancestor {
        let node = source.get_dictionary(id)?;
        for key in INHERITABLE {
            if !page.has(key.as_bytes()) {
                if let Ok(value) = node.get(key.as_bytes()) {
                    page.set(key, value.clone());
                }
            }
        }
        ancestor = parent_of(source, id);
    }
    page.remove(b"Parent");

    let mut target = Document::with_version(source.version.clone());
    let pages_id = target.new_object_id();
    let new_page_id = target.new_object_id();

    let mut grafter = Grafter {
        source,
        tree,
        target: &mut target,
        mapped: BTreeMap::from([(page_id, new_page_id)]),
    };
    let mut page = grafter.copy_dictionary(&page)?;
    page.set("Parent", pages_id);

    target.objects.insert(new_page_id, Object::Dictionary(page));
    target.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(new_page_id)],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = target.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    target.trailer.set("Root", catalog_id);

    Ok(target)
}

/// Copies objects from `source` into `target`, renumbering references.
///
/// References into the page tree (other pages, `Pages` nodes) become
/// `null`; each source object is copied at most once.
struct Grafter<'a> {
    source: &'a Document,
    tree: &'a BTreeSet<ObjectId>,
    target: &'a mut Document,
    mapped: BTreeMap<ObjectId, ObjectId>,
}

impl Grafter<'_> {
    fn copy(&mut self, object: &Object) -> Result<Object, lopdf::Error> {
        Ok(match object {
            Object::Reference(id) => self.copy_reference(*id)?,
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy(item))
                    .collect::<Result<_, _>>()?,
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict)?),
            Object::Stream(stream) => {
                let mut copied = stream.clone();
                copied.dict = self.copy_dictionary(&stream.dict)?;
                Object::Stream(copied)
            }
            other => other.clone(),
        })
    }

    fn copy_dictionary(&mut self, dict: &Dictionary) -> Result<Dictionary, lopdf::Error> {
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            copied.set(key.clone(), self.copy(value)?);
        }
        Ok(copied)
    }

    fn copy_reference(&mut self, id: ObjectId) -> Result<Object, lopdf::Error> {
        if let Some(&new_id) = self.mapped.get(&id) {
            return Ok(Object::Reference(new_id));
        }
        if self.tree.contains(&id) {
            return Ok(Object::Null);
        }
        let source = self.source;
        let Ok(object) = source.get_object(id) else {
            // dangling references read as null
            return Ok(Object::Null);
        };

        let new_id = self.target.new_object_id();
        self.mapped.insert(id, new_id);
        let copied = self.copy(object)?;
        self.target.objects.insert(new_id, copied);
        Ok(Object::Reference(new_id))
    }
}
