//! Canonical type system and cross-vocabulary normalization
//!
//! The same logical column type is spelled differently by the database
//! catalog (`character varying`, `int4`), by the ORM (`String`, `Integer`)
//! and by the hand-written documentation. Every raw token is reduced to a
//! [`CanonicalType`] before two sources are compared.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Vocabulary a raw type token is spelled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vocabulary {
    /// Database catalog spellings (`character varying`, `int4`, `timestamptz`)
    Native,

    /// ORM column type class names (`String`, `Integer`, `DateTime`)
    Orm,

    /// Schema documentation (native spellings, any case)
    Doc,
}

impl std::fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Orm => write!(f, "orm"),
            Self::Doc => write!(f, "doc"),
        }
    }
}

/// Normalized type tag used for cross-vocabulary comparison
///
/// Timestamps carry their zone flag: `timestamp with time zone` and
/// `timestamp without time zone` are distinct unless the normalizer is
/// configured to fold them together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalType {
    Integer,
    BigInt,
    Real,
    Double,
    Numeric,
    String,
    Text,
    Boolean,
    Timestamp { with_time_zone: bool },
    Date,
    Time,
    Json,
    Array,
    Inet,
    Unknown,
}

impl CanonicalType {
    /// Zoned timestamp (`timestamptz`, ORM `DateTime`)
    pub const TIMESTAMPTZ: CanonicalType = CanonicalType::Timestamp { with_time_zone: true };

    /// Naive timestamp (`timestamp without time zone`)
    pub const TIMESTAMP: CanonicalType = CanonicalType::Timestamp { with_time_zone: false };

    /// Stable tag name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Real => "real",
            Self::Double => "double",
            Self::Numeric => "numeric",
            Self::String => "string",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Timestamp { with_time_zone: true } => "timestamptz",
            Self::Timestamp { with_time_zone: false } => "timestamp",
            Self::Date => "date",
            Self::Time => "time",
            Self::Json => "json",
            Self::Array => "array",
            Self::Inet => "inet",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a tag name as produced by [`CanonicalType::as_str`]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let canonical = match tag.trim().to_lowercase().as_str() {
            "integer" => Self::Integer,
            "bigint" => Self::BigInt,
            "real" => Self::Real,
            "double" => Self::Double,
            "numeric" => Self::Numeric,
            "string" => Self::String,
            "text" => Self::Text,
            "boolean" => Self::Boolean,
            "timestamptz" => Self::TIMESTAMPTZ,
            "timestamp" => Self::TIMESTAMP,
            "date" => Self::Date,
            "time" => Self::Time,
            "json" => Self::Json,
            "array" => Self::Array,
            "inet" => Self::Inet,
            "unknown" => Self::Unknown,
            _ => return None,
        };
        Some(canonical)
    }
}

impl std::fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Synonym tables mapping raw type tokens onto canonical types
///
/// Lookup order is: array notation, the vocabulary-specific table, then the
/// shared cross-vocabulary table. Documentation is written by hand in either
/// spelling, so the doc vocabulary consults the native table and then the
/// ORM table. Unrecognized tokens map to
/// [`CanonicalType::Unknown`] and never raise.
#[derive(Debug, Clone)]
pub struct Normalizer {
    native: HashMap<String, CanonicalType>,
    orm: HashMap<String, CanonicalType>,
    shared: HashMap<String, CanonicalType>,
    naive_timestamps_match_tz: bool,
}

impl Normalizer {
    /// Create a normalizer with the built-in synonym tables
    pub fn new() -> Self {
        Self {
            native: table(NATIVE_SYNONYMS),
            orm: table(ORM_SYNONYMS),
            shared: table(SHARED_SYNONYMS),
            naive_timestamps_match_tz: false,
        }
    }

    /// Add an entry to the shared synonym table
    pub fn with_synonym(mut self, raw: &str, canonical: CanonicalType) -> Self {
        self.shared.insert(lookup_key(raw), canonical);
        self
    }

    /// Treat `timestamp without time zone` as equivalent to `timestamptz`
    pub fn with_naive_timestamps_match_tz(mut self, enabled: bool) -> Self {
        self.naive_timestamps_match_tz = enabled;
        self
    }

    /// Canonicalize a raw type token from the given vocabulary
    pub fn normalize(&self, raw: &str, vocabulary: Vocabulary) -> CanonicalType {
        let key = lookup_key(raw);
        if key.is_empty() {
            return CanonicalType::Unknown;
        }

        let canonical = if key.ends_with("[]") {
            CanonicalType::Array
        } else if let Some(found) = self.lookup(&key, vocabulary) {
            found
        } else if vocabulary != Vocabulary::Orm && self.is_udt_array(&key) {
            // Catalog array element notation: _int4 is int4[]
            CanonicalType::Array
        } else {
            CanonicalType::Unknown
        };

        match canonical {
            CanonicalType::Timestamp { .. } if self.naive_timestamps_match_tz => CanonicalType::TIMESTAMPTZ,
            other => other,
        }
    }

    /// Check whether two raw tokens denote the same canonical type
    ///
    /// Two unknown tokens match by default; unknown against a known type
    /// does not.
    pub fn equivalent(&self, a: &str, vocab_a: Vocabulary, b: &str, vocab_b: Vocabulary) -> bool {
        self.normalize(a, vocab_a) == self.normalize(b, vocab_b)
    }

    fn lookup(&self, key: &str, vocabulary: Vocabulary) -> Option<CanonicalType> {
        let tables = match vocabulary {
            Vocabulary::Native => [Some(&self.native), None, Some(&self.shared)],
            Vocabulary::Orm => [Some(&self.orm), None, Some(&self.shared)],
            Vocabulary::Doc => [Some(&self.native), Some(&self.orm), Some(&self.shared)],
        };
        tables.into_iter().flatten().find_map(|t| t.get(key).copied())
    }

    fn is_udt_array(&self, key: &str) -> bool {
        match key.strip_prefix('_') {
            Some(element) => self.native.contains_key(element) || self.shared.contains_key(element),
            None => false,
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonicalize with the built-in synonym tables
pub fn normalize(raw: &str, vocabulary: Vocabulary) -> CanonicalType {
    static DEFAULT: OnceLock<Normalizer> = OnceLock::new();
    DEFAULT.get_or_init(Normalizer::new).normalize(raw, vocabulary)
}

/// Remove every parenthesized segment from a type token
///
/// `varchar(255)` becomes `varchar`, `numeric(10, 2)[]` becomes `numeric[]`.
pub fn strip_length(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for ch in raw.chars() {
        match ch {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Extract the first parenthesized length/precision argument of a type token
///
/// `varchar(255)` yields `Some("255")`, `numeric(10, 2)` yields `Some("10,2")`.
pub fn length_or_precision(raw: &str) -> Option<String> {
    let open = raw.find('(')?;
    let close = raw[open..].find(')')? + open;
    let inner: Vec<&str> = raw[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if inner.is_empty() {
        None
    } else {
        Some(inner.join(","))
    }
}

fn lookup_key(raw: &str) -> String {
    strip_length(raw)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn table(entries: &[(&str, CanonicalType)]) -> HashMap<String, CanonicalType> {
    entries
        .iter()
        .map(|(raw, canonical)| (raw.to_string(), *canonical))
        .collect()
}

const SHARED_SYNONYMS: &[(&str, CanonicalType)] = &[
    ("integer", CanonicalType::Integer),
    ("int", CanonicalType::Integer),
    ("int4", CanonicalType::Integer),
    ("bigint", CanonicalType::BigInt),
    ("int8", CanonicalType::BigInt),
    ("biginteger", CanonicalType::BigInt),
    ("real", CanonicalType::Real),
    ("double precision", CanonicalType::Double),
    ("float8", CanonicalType::Double),
    ("float", CanonicalType::Double),
    ("numeric", CanonicalType::Numeric),
    ("varchar", CanonicalType::String),
    ("character varying", CanonicalType::String),
    ("string", CanonicalType::String),
    ("text", CanonicalType::Text),
    ("boolean", CanonicalType::Boolean),
    ("timestamp with time zone", CanonicalType::TIMESTAMPTZ),
    ("timestamptz", CanonicalType::TIMESTAMPTZ),
    ("datetime", CanonicalType::TIMESTAMPTZ),
    ("date", CanonicalType::Date),
    ("time", CanonicalType::Time),
    ("json", CanonicalType::Json),
    ("jsonb", CanonicalType::Json),
    ("array", CanonicalType::Array),
    ("inet", CanonicalType::Inet),
];

const NATIVE_SYNONYMS: &[(&str, CanonicalType)] = &[
    ("smallint", CanonicalType::Integer),
    ("int2", CanonicalType::Integer),
    ("serial", CanonicalType::Integer),
    ("serial4", CanonicalType::Integer),
    ("smallserial", CanonicalType::Integer),
    ("serial2", CanonicalType::Integer),
    ("bigserial", CanonicalType::BigInt),
    ("serial8", CanonicalType::BigInt),
    ("float4", CanonicalType::Real),
    ("decimal", CanonicalType::Numeric),
    ("character", CanonicalType::String),
    ("char", CanonicalType::String),
    ("bpchar", CanonicalType::String),
    ("name", CanonicalType::String),
    ("citext", CanonicalType::Text),
    ("bool", CanonicalType::Boolean),
    ("timestamp", CanonicalType::TIMESTAMP),
    ("timestamp without time zone", CanonicalType::TIMESTAMP),
    ("time without time zone", CanonicalType::Time),
    ("time with time zone", CanonicalType::Time),
    ("timetz", CanonicalType::Time),
    ("cidr", CanonicalType::Inet),
];

// Keys are lowercased class names
const ORM_SYNONYMS: &[(&str, CanonicalType)] = &[
    ("smallinteger", CanonicalType::Integer),
    ("double", CanonicalType::Double),
    ("double_precision", CanonicalType::Double),
    ("decimal", CanonicalType::Numeric),
    ("unicode", CanonicalType::String),
    ("unicodetext", CanonicalType::Text),
    ("timestamp", CanonicalType::TIMESTAMPTZ),
    ("cidr", CanonicalType::Inet),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonym_pairs_are_equivalent() {
        let n = Normalizer::new();
        assert!(n.equivalent("varchar", Vocabulary::Native, "String", Vocabulary::Orm));
        assert!(n.equivalent("character varying", Vocabulary::Native, "String", Vocabulary::Orm));
        assert!(n.equivalent("timestamp with time zone", Vocabulary::Native, "timestamptz", Vocabulary::Native));
        assert!(n.equivalent("timestamptz", Vocabulary::Native, "DateTime", Vocabulary::Orm));
        assert!(n.equivalent("double precision", Vocabulary::Native, "Float", Vocabulary::Orm));
        assert!(n.equivalent("float8", Vocabulary::Native, "Float", Vocabulary::Orm));
        assert!(n.equivalent("jsonb", Vocabulary::Native, "JSON", Vocabulary::Orm));
        assert!(n.equivalent("int4", Vocabulary::Native, "Integer", Vocabulary::Orm));
        assert!(n.equivalent("int8", Vocabulary::Native, "BigInteger", Vocabulary::Orm));
        assert!(n.equivalent("numeric", Vocabulary::Native, "Numeric", Vocabulary::Orm));
    }

    #[test]
    fn doc_accepts_orm_spellings() {
        let n = Normalizer::new();
        assert_eq!(n.normalize("SmallInteger", Vocabulary::Doc), CanonicalType::Integer);
        assert_eq!(n.normalize("UnicodeText", Vocabulary::Doc), CanonicalType::Text);
        assert_eq!(n.normalize("Double", Vocabulary::Doc), CanonicalType::Double);
        assert!(n.equivalent("SmallInteger", Vocabulary::Doc, "smallint", Vocabulary::Native));

        // native spelling wins where both tables know the token
        assert_eq!(n.normalize("timestamp", Vocabulary::Doc), CanonicalType::TIMESTAMP);
        assert_eq!(n.normalize("timestamp", Vocabulary::Orm), CanonicalType::TIMESTAMPTZ);
        assert_eq!(n.normalize("Double", Vocabulary::Native), CanonicalType::Unknown);
    }

    #[test]
    fn length_suffix_is_ignored() {
        assert_eq!(normalize("varchar(255)", Vocabulary::Native), CanonicalType::String);
        assert_eq!(normalize("VARCHAR(255)", Vocabulary::Doc), CanonicalType::String);
        assert_eq!(normalize("NUMERIC(3, 1)", Vocabulary::Doc), CanonicalType::Numeric);
        assert_eq!(normalize("character varying(100)", Vocabulary::Native), CanonicalType::String);
    }

    #[test]
    fn naive_and_zoned_timestamps_are_distinct_by_default() {
        assert_eq!(normalize("timestamp without time zone", Vocabulary::Native), CanonicalType::TIMESTAMP);
        assert_eq!(normalize("TIMESTAMP WITH TIME ZONE", Vocabulary::Doc), CanonicalType::TIMESTAMPTZ);
        assert_ne!(
            normalize("timestamp without time zone", Vocabulary::Native),
            normalize("timestamp with time zone", Vocabulary::Native)
        );

        let folded = Normalizer::new().with_naive_timestamps_match_tz(true);
        assert!(folded.equivalent(
            "timestamp without time zone",
            Vocabulary::Native,
            "DateTime",
            Vocabulary::Orm
        ));
    }

    #[test]
    fn array_notations() {
        assert_eq!(normalize("integer[]", Vocabulary::Native), CanonicalType::Array);
        assert_eq!(normalize("_int4", Vocabulary::Native), CanonicalType::Array);
        assert_eq!(normalize("ARRAY", Vocabulary::Native), CanonicalType::Array);
        assert_eq!(normalize("ARRAY", Vocabulary::Orm), CanonicalType::Array);
        assert_eq!(normalize("VARCHAR(20)[]", Vocabulary::Doc), CanonicalType::Array);
    }

    #[test]
    fn unknown_tokens_do_not_raise() {
        assert_eq!(normalize("tsvector", Vocabulary::Native), CanonicalType::Unknown);
        assert_eq!(normalize("Vector", Vocabulary::Orm), CanonicalType::Unknown);
        assert_eq!(normalize("", Vocabulary::Doc), CanonicalType::Unknown);

        let n = Normalizer::new();
        assert!(n.equivalent("tsvector", Vocabulary::Native, "TSVECTOR", Vocabulary::Orm));
        assert!(!n.equivalent("tsvector", Vocabulary::Native, "Text", Vocabulary::Orm));
    }

    #[test]
    fn extra_synonyms_extend_shared_table() {
        let n = Normalizer::new().with_synonym("uuid", CanonicalType::String);
        assert_eq!(n.normalize("UUID", Vocabulary::Native), CanonicalType::String);
        assert_eq!(n.normalize("Uuid", Vocabulary::Orm), CanonicalType::String);
    }

    #[test]
    fn normalization_is_pure() {
        for raw in ["varchar(10)", "Float", "timestamptz", "mystery"] {
            assert_eq!(normalize(raw, Vocabulary::Native), normalize(raw, Vocabulary::Native));
        }
    }

    #[test]
    fn length_extraction() {
        assert_eq!(length_or_precision("varchar(255)"), Some("255".to_string()));
        assert_eq!(length_or_precision("numeric(10, 2)"), Some("10,2".to_string()));
        assert_eq!(length_or_precision("text"), None);
        assert_eq!(strip_length("numeric(10, 2)[]"), "numeric[]");
    }

    #[test]
    fn canonical_tags_roundtrip() {
        for tag in ["integer", "timestamptz", "timestamp", "unknown", "inet"] {
            assert_eq!(CanonicalType::from_tag(tag).map(|t| t.as_str()), Some(tag));
        }
        assert_eq!(CanonicalType::from_tag("nope"), None);
    }
}
