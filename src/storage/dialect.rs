//! Dialect shim - compiles the canonical templates for one database engine
//!
//! Engines disagree on two things we care about:
//! - Primary key: MySQL `int AUTO_INCREMENT`, PostgreSQL
//!   `int GENERATED BY DEFAULT AS IDENTITY`, SQLite plain `integer`
//! - Placeholders: MySQL and SQLite take `?`, PostgreSQL wants `$1, $2, ...`
//!
//! Supporting another engine means adding a `Dialect` variant with its
//! two rules; the templates in `schema` never change.

use std::str::FromStr;

use crate::{Error, Result};
use super::schema;

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

/// How a dialect spells positional placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Keep the generic `?`
    Generic,
    /// Replace each `?` with `prefix` followed by a 1-based position
    Numbered { prefix: &'static str },
}

impl Dialect {
    /// Get the string representation of the dialect
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Get all dialects
    pub fn all() -> &'static [Dialect] {
        &[Dialect::MySql, Dialect::Postgres, Dialect::Sqlite]
    }

    /// Primary-key column type
    pub fn id_type(&self) -> &'static str {
        match self {
            Dialect::MySql => "int AUTO_INCREMENT",
            Dialect::Postgres => "int GENERATED BY DEFAULT AS IDENTITY",
            Dialect::Sqlite => "integer",
        }
    }

    pub fn placeholder_style(&self) -> PlaceholderStyle {
        match self {
            Dialect::MySql | Dialect::Sqlite => PlaceholderStyle::Generic,
            Dialect::Postgres => PlaceholderStyle::Numbered { prefix: "$" },
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(Dialect::MySql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(Error::UnsupportedDialect(s.to_string())),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three statements a storage backend runs, resolved for one dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectProfile {
    dialect: Dialect,
    create_table: String,
    lookup: String,
    insert: String,
}

impl DialectProfile {
    /// Resolve the canonical templates for `dialect`. Pure and deterministic.
    pub fn for_dialect(dialect: Dialect) -> Self {
        let style = dialect.placeholder_style();
        Self {
            dialect,
            create_table: schema::CREATE_TABLE.replace(schema::ID_TYPE_MARKER, dialect.id_type()),
            lookup: rewrite_placeholders(schema::LOOKUP, style),
            insert: rewrite_placeholders(schema::INSERT_IF_ABSENT, style),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn create_table(&self) -> &str {
        &self.create_table
    }

    pub fn lookup(&self) -> &str {
        &self.lookup
    }

    pub fn insert(&self) -> &str {
        &self.insert
    }
}

/// Compile a profile from a backend identifier such as `"postgres"`.
///
/// Fails with `Error::UnsupportedDialect` for anything outside `Dialect::all()`.
pub fn compile(backend_id: &str) -> Result<DialectProfile> {
    let dialect: Dialect = backend_id.parse()?;
    Ok(DialectProfile::for_dialect(dialect))
}

/// Rewrite every generic placeholder, numbering left to right from 1.
pub fn rewrite_placeholders(sql: &str, style: PlaceholderStyle) -> String {
    let PlaceholderStyle::Numbered { prefix } = style else {
        return sql.to_string();
    };

    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 1;
    for c in sql.chars() {
        if c == schema::PLACEHOLDER {
            out.push_str(prefix);
            out.push_str(&index.to_string());
            index += 1;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Positions of `$n` markers in order of appearance
    fn numbered_markers(sql: &str) -> Vec<usize> {
        sql.split('$')
            .skip(1)
            .map(|rest| {
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().unwrap()
            })
            .collect()
    }

    #[test]
    fn test_dialect_roundtrip() {
        for dialect in Dialect::all() {
            let parsed: Dialect = dialect.as_str().parse().unwrap();
            assert_eq!(*dialect, parsed);
        }
        assert_eq!(Dialect::from_str("SQLite").unwrap(), Dialect::Sqlite);
        assert_eq!(Dialect::from_str("PostgreSQL").unwrap(), Dialect::Postgres);
    }

    #[test]
    fn test_unsupported_dialect() {
        for id in ["oracle", "", "sqlite3"] {
            match compile(id) {
                Err(Error::UnsupportedDialect(name)) => assert_eq!(name, id),
                other => panic!("expected UnsupportedDialect for {:?}, got {:?}", id, other),
            }
        }
    }

    #[test]
    fn test_no_markers_left_unresolved() {
        for dialect in Dialect::all() {
            let profile = DialectProfile::for_dialect(*dialect);
            assert!(!profile.create_table().contains(schema::ID_TYPE_MARKER));
            assert!(profile.create_table().contains(dialect.id_type()));

            if dialect.placeholder_style() != PlaceholderStyle::Generic {
                assert!(!profile.lookup().contains('?'));
                assert!(!profile.insert().contains('?'));
            }
        }
    }

    #[test]
    fn test_generic_dialects_keep_templates() {
        for dialect in [Dialect::MySql, Dialect::Sqlite] {
            let profile = DialectProfile::for_dialect(dialect);
            assert_eq!(profile.lookup(), schema::LOOKUP);
            assert_eq!(profile.insert(), schema::INSERT_IF_ABSENT);
        }
    }

    #[test]
    fn test_postgres_numbering_is_increasing() {
        let profile = compile("postgres").unwrap();
        assert_eq!(profile.dialect(), Dialect::Postgres);

        assert_eq!(numbered_markers(profile.lookup()), vec![1]);
        assert_eq!(numbered_markers(profile.insert()), vec![1, 2, 3, 4, 5]);
        assert!(profile.insert().contains("SELECT $1, $2, $3, $4"));
        assert!(profile.insert().contains("WHERE barcode = $5"));
    }

    #[test]
    fn test_rewrite_numbers_past_nine() {
        let sql = "?".repeat(11);
        let rewritten = rewrite_placeholders(&sql, PlaceholderStyle::Numbered { prefix: ":var" });
        assert!(rewritten.starts_with(":var1:var2"));
        assert!(rewritten.ends_with(":var10:var11"));
    }

    #[test]
    fn test_compile_is_deterministic() {
        for dialect in Dialect::all() {
            assert_eq!(compile(dialect.as_str()).unwrap(), compile(dialect.as_str()).unwrap());
        }
    }
}
