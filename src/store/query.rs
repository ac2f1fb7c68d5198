//! Templated SELECT query construction.
//!
//! Query shape is static text owned by the caller; every value that must be
//! embedded is routed through a method that escapes or validates it, so no
//! raw external string ever reaches the query body.

use std::fmt::Write;

use crate::twin::vocab;

/// Builder separating static query shape from interpolated values.
pub struct QueryBuilder {
    buf: String,
}

impl QueryBuilder {
    /// Starts a query with the `ts`/`tsd` prefix header every templated
    /// query shares.
    #[must_use]
    pub fn with_prefixes() -> Self {
        let mut buf = String::new();
        let _ = writeln!(buf, "PREFIX ts: <{}>", vocab::SCHEMA_NS);
        let _ = writeln!(buf, "PREFIX tsd: <{}>", vocab::DATA_NS);
        buf.push('\n');
        Self { buf }
    }

    /// Appends static query text.
    #[must_use]
    pub fn raw(mut self, part: &str) -> Self {
        self.buf.push_str(part);
        self
    }

    /// Appends a quoted, escaped string literal.
    #[must_use]
    pub fn literal(mut self, value: &str) -> Self {
        let _ = write!(self.buf, "\"{}\"", escape_literal(value));
        self
    }

    /// Appends a quoted, escaped, lowercased string literal, for
    /// case-insensitive CONTAINS filters.
    #[must_use]
    pub fn lower_literal(self, value: &str) -> Self {
        let lowered = value.to_lowercase();
        self.literal(&lowered)
    }

    /// Appends an IRI reference.
    #[must_use]
    pub fn iri(mut self, value: &str) -> Self {
        let _ = write!(self.buf, "<{}>", escape_iri(value));
        self
    }

    /// Appends a numeric value.
    #[must_use]
    pub fn number(mut self, value: f64) -> Self {
        let _ = write!(self.buf, "{value}");
        self
    }

    /// Appends a non-negative integer, for LIMIT/OFFSET clauses.
    #[must_use]
    pub fn count(mut self, value: usize) -> Self {
        let _ = write!(self.buf, "{value}");
        self
    }

    /// Returns the assembled query text.
    #[must_use]
    pub fn build(self) -> String {
        self.buf
    }
}

/// Escapes a value for embedding inside a double-quoted SPARQL literal.
#[must_use]
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Strips characters that would break out of an IRI reference.
pub(crate) fn escape_iri(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | ' '))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{escape_literal, QueryBuilder};

    #[test]
    fn builder_assembles_shape_and_values() {
        let query = QueryBuilder::with_prefixes()
            .raw("SELECT ?s WHERE { ?s ts:name ")
            .literal("alpha \"beta\"")
            .raw(" } LIMIT ")
            .count(10)
            .build();
        assert!(query.starts_with("PREFIX ts: <http://twin.dtd/ontology#>"));
        assert!(query.contains(r#""alpha \"beta\"""#));
        assert!(query.ends_with("LIMIT 10"));
    }

    #[test]
    fn literals_cannot_break_out() {
        assert_eq!(
            escape_literal(r#"x" . ?s ?p ?o . FILTER("y"#),
            r#"x\" . ?s ?p ?o . FILTER(\"y"#
        );
        assert_eq!(escape_literal("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn iris_lose_delimiters() {
        let query = QueryBuilder::with_prefixes()
            .raw("SELECT ?s WHERE { ")
            .iri("http://iodt2.com/x> <http://evil")
            .raw(" ?p ?o }")
            .build();
        assert!(query.contains("<http://iodt2.com/xhttp://evil>"));
    }
}
