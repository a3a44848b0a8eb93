//! Helpers shared by the unit tests.

use crate::dom::Document;

/// A fresh document whose body holds `html`.
pub fn document_from_body(html: &str) -> Document {
    let mut doc = Document::new();
    let body = doc.body();
    doc.set_inner_html(body, html);
    doc
}

pub fn body_html(doc: &Document) -> String {
    doc.inner_html(doc.body())
}
