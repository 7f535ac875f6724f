//! Merge several PDFs into one, keeping the caller's input order.

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument};

use askweb_shared::{AskWebError, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 32;

/// Merge `inputs` into a single PDF at `output`.
///
/// Pages appear in input order, then in each input's own page order. Merging
/// zero inputs is a validation error.
#[instrument(skip_all, fields(inputs = inputs.len(), output = %output.display()))]
pub fn merge_pdfs(inputs: &[PathBuf], output: &Path) -> Result<()> {
    if inputs.is_empty() {
        return Err(AskWebError::validation("no PDFs to merge"));
    }

    let mut next_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut catalog: Option<(ObjectId, Dictionary)> = None;
    let mut page_tree: Option<(ObjectId, Dictionary)> = None;
    let mut merged = Document::with_version("1.5");

    for path in inputs {
        let mut doc = Document::load(path)
            .map_err(|e| AskWebError::Document(format!("cannot load {}: {e}", path.display())))?;
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            let page = doc
                .get_dictionary(page_id)
                .map_err(|e| AskWebError::Document(format!("{}: bad page: {e}", path.display())))?;
            pages.push((page_id, with_inherited(&doc, page)));
        }

        for (id, object) in std::mem::take(&mut doc.objects) {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" => {
                    if catalog.is_none() {
                        if let Object::Dictionary(dict) = object {
                            catalog = Some((id, dict));
                        }
                    }
                }
                b"Pages" => {
                    // The first page tree root becomes the merged root; the
                    // rest are dropped since every page is re-parented.
                    if page_tree.is_none() && is_tree_root(&object) {
                        if let Object::Dictionary(dict) = object {
                            page_tree = Some((id, dict));
                        }
                    }
                }
                b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    merged.objects.insert(id, object);
                }
            }
        }
    }

    let (catalog_id, mut catalog) =
        catalog.ok_or_else(|| AskWebError::Document("no catalog in merge inputs".into()))?;
    let (tree_id, mut tree) =
        page_tree.ok_or_else(|| AskWebError::Document("no page tree in merge inputs".into()))?;

    let page_count = pages.len();
    let mut kids = Vec::with_capacity(page_count);
    for (id, mut page) in pages {
        page.set("Parent", Object::Reference(tree_id));
        merged.objects.insert(id, Object::Dictionary(page));
        kids.push(Object::Reference(id));
    }

    tree.set("Kids", Object::Array(kids));
    tree.set("Count", Object::Integer(page_count as i64));
    tree.remove(b"Parent");
    merged.objects.insert(tree_id, Object::Dictionary(tree));

    catalog.set("Pages", Object::Reference(tree_id));
    catalog.remove(b"Outlines");
    merged.objects.insert(catalog_id, Object::Dictionary(catalog));

    merged.trailer.set("Root", Object::Reference(catalog_id));
    merged.max_id = merged.objects.keys().map(|(n, _)| *n).max().unwrap_or(0);
    merged.renumber_objects();
    merged.compress();

    merged
        .save(output)
        .map_err(|e| AskWebError::io(output, e))?;

    debug!(pages = page_count, "merged PDFs");
    Ok(())
}

fn is_tree_root(object: &Object) -> bool {
    object
        .as_dict()
        .map(|d| !d.has(b"Parent"))
        .unwrap_or(false)
}

/// Copy inherited page attributes onto the page itself, so the page keeps
/// them once its original ancestors are gone.
fn with_inherited(doc: &Document, page: &Dictionary) -> Dictionary {
    let mut page = page.clone();

    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut depth = 0;
        while let Some(id) = parent {
            if depth == MAX_TREE_DEPTH {
                break;
            }
            let Ok(node) = doc.get_dictionary(id) else {
                break;
            };
            if let Ok(value) = node.get(key) {
                page.set(key.to_vec(), value.clone());
                break;
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
            depth += 1;
        }
    }

    page
}
