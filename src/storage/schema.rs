//! Canonical SQL templates shared by every dialect
//!
//! Templates use `?` as the generic positional placeholder and `{id_type}`
//! for the primary-key declaration. `dialect::compile` resolves both.

/// Marker in `CREATE_TABLE` replaced by the dialect's primary-key type
pub const ID_TYPE_MARKER: &str = "{id_type}";

/// Generic positional placeholder
pub const PLACEHOLDER: char = '?';

/// SQL to create the barcodes table.
///
/// MySQL cannot put a UNIQUE index on an unbounded `text` column, so the
/// barcode is a `varchar`.
pub const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS barcodes (
    id      {id_type}   PRIMARY KEY,
    barcode varchar(50) NOT NULL UNIQUE,
    isbn    text        NOT NULL,
    author  text        NOT NULL,
    title   text        NOT NULL
)
"#;

/// SQL to fetch the attributes for one barcode
pub const LOOKUP: &str = "SELECT isbn, author, title FROM barcodes WHERE barcode = ?";

/// SQL to insert a row unless the barcode is already present.
///
/// Binds: barcode, isbn, author, title, then barcode again for the
/// existence check.
pub const INSERT_IF_ABSENT: &str = r#"
INSERT INTO barcodes (barcode, isbn, author, title)
SELECT ?, ?, ?, ?
WHERE NOT EXISTS (SELECT 1 FROM barcodes WHERE barcode = ?)
"#;
