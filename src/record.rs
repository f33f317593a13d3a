//! Record - the value exchanged between data sources, the coordinator and callers

use serde::{Deserialize, Serialize};

/// A cached catalogue entry for one barcode.
///
/// Records are built by a data source in answer to a lookup and never
/// change afterwards, so the fields are only reachable through accessors.
/// The serialized form is `{"barcode", "isbn", "author", "title"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    barcode: String,
    isbn: String,
    author: String,
    title: String,
}

impl Record {
    /// Create a record with all four fields. Attributes may be empty.
    ///
    /// An empty barcode is accepted here but the record cannot be cached:
    /// every storage backend rejects it with [`Error::EmptyKey`] and the
    /// coordinator never passes an empty barcode to a source. Check
    /// [`Record::has_key`] before handing a record to storage.
    ///
    /// [`Error::EmptyKey`]: crate::Error::EmptyKey
    pub fn new(
        barcode: impl Into<String>,
        isbn: impl Into<String>,
        author: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            barcode: barcode.into(),
            isbn: isbn.into(),
            author: author.into(),
            title: title.into(),
        }
    }

    /// The lookup key
    pub fn barcode(&self) -> &str {
        &self.barcode
    }

    /// Whether the record has a non-empty barcode and so can be stored
    pub fn has_key(&self) -> bool {
        !self.barcode.is_empty()
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (isbn: {}, author: {}, title: {})",
            self.barcode, self.isbn, self.author, self.title
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let record = Record::new("666", "ISBN1", "Author1", "Title1");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "barcode": "666",
                "isbn": "ISBN1",
                "author": "Author1",
                "title": "Title1",
            })
        );
    }

    #[test]
    fn test_empty_attributes_allowed() {
        let record = Record::new("123", "", "", "");
        assert_eq!(record.barcode(), "123");
        assert!(record.isbn().is_empty());
        assert!(record.title().is_empty());
        assert!(record.has_key());
    }

    #[test]
    fn test_empty_barcode_has_no_key() {
        assert!(!Record::new("", "ISBN1", "Author1", "Title1").has_key());

        // Deserialized records bypass `new` but get the same check
        let record: Record =
            serde_json::from_str(r#"{"barcode": "", "isbn": "", "author": "", "title": ""}"#).unwrap();
        assert!(!record.has_key());
    }
}
