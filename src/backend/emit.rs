//! The per-field rendering loop shared by schema-driven triggers
//!
//! Every emitter fetches the bound table's ordered fields, keeps the ones
//! its [`Selection`] asks for, renders one fragment per field and joins the
//! fragments. `None` means there was nothing to render (no table bound, the
//! schema lookup failed, or no field selected); the caller then falls back
//! to its placeholder text.

use crate::control::GenerationRun;
use crate::schema::FieldMeta;
use crate::util::join_continued;

/// Which fields an emitter renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    Keys,
    NonKeys,
}

/// How rendered fragments are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    /// All on one line
    Inline(&'static str),
    /// One fragment per line, continuation lines aligned under the token,
    /// the separator at the end of every line but the last
    Continued(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldEmitter {
    selection: Selection,
    join: Join,
}

impl FieldEmitter {
    pub const fn new(selection: Selection, join: Join) -> Self {
        Self { selection, join }
    }

    /// Comma-newline list of every field
    pub const fn columns() -> Self {
        Self::new(Selection::All, Join::Continued(","))
    }

    /// One line per field
    pub const fn statements() -> Self {
        Self::new(Selection::All, Join::Continued(""))
    }

    pub const fn keys(mut self) -> Self {
        self.selection = Selection::Keys;
        self
    }

    pub const fn non_keys(mut self) -> Self {
        self.selection = Selection::NonKeys;
        self
    }

    /// Selected fields of the bound table, `None` when there are none
    pub fn fields(&self, run: &mut GenerationRun<'_>) -> Option<Vec<FieldMeta>> {
        let fields = run.table_fields(self.selection == Selection::Keys)?;
        let fields: Vec<FieldMeta> = match self.selection {
            Selection::NonKeys => fields.into_iter().filter(|f| !f.is_key).collect(),
            _ => fields,
        };
        (!fields.is_empty()).then_some(fields)
    }

    /// Render with `render(position, field)`, continuation lines aligned
    /// with the current token
    pub fn emit<F>(&self, run: &mut GenerationRun<'_>, render: F) -> Option<String>
    where
        F: FnMut(usize, &FieldMeta) -> String,
    {
        let indent = run.context().token_column;
        self.emit_at(run, indent, render)
    }

    /// Like [`emit`](Self::emit), with an explicit continuation indent
    pub fn emit_at<F>(
        &self,
        run: &mut GenerationRun<'_>,
        indent: usize,
        render: F,
    ) -> Option<String>
    where
        F: FnMut(usize, &FieldMeta) -> String,
    {
        let fields = self.fields(run)?;
        Some(self.join_fields(&fields, indent, render))
    }

    /// Render an already fetched field list
    pub fn join_fields<F>(&self, fields: &[FieldMeta], indent: usize, mut render: F) -> String
    where
        F: FnMut(usize, &FieldMeta) -> String,
    {
        let parts: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, f)| render(i, f))
            .collect();
        match self.join {
            Join::Inline(separator) => parts.join(separator),
            Join::Continued(separator) => join_continued(&parts, separator, indent),
        }
    }
}

/// `:QUAL.NAME` when a qualifier is given, else `:NAME`
pub fn host_var(field: &FieldMeta, qualifier: Option<&str>) -> String {
    match qualifier {
        Some(q) => format!(":{}.{}", q, field.cobol_name()),
        None => format!(":{}", field.cobol_name()),
    }
}

/// Trimmed parameter at `index`; blank counts as absent
pub fn param(params: &[String], index: usize) -> Option<&str> {
    params
        .get(index)
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
}

/// `indent` spaces
pub fn pad(indent: usize) -> String {
    " ".repeat(indent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;

    fn fields() -> Vec<FieldMeta> {
        vec![
            FieldMeta::new("A", DataType::Char, 1).key(),
            FieldMeta::new("B", DataType::Char, 1),
        ]
    }

    #[test]
    fn test_host_var() {
        let field = FieldMeta::new("POLICY_NO", DataType::Char, 10);
        assert_eq!(host_var(&field, None), ":POLICY-NO");
        assert_eq!(host_var(&field, Some("DCL-RATE")), ":DCL-RATE.POLICY-NO");
    }

    #[test]
    fn test_param_skips_blank() {
        let params = vec!["A".to_string(), "  ".to_string()];
        assert_eq!(param(&params, 0), Some("A"));
        assert_eq!(param(&params, 1), None);
        assert_eq!(param(&params, 2), None);
    }

    #[test]
    fn test_join_styles() {
        let columns = FieldEmitter::columns().join_fields(&fields(), 4, |_, f| f.cobol_name());
        assert_eq!(columns, "A,\n    B");
        let inline = FieldEmitter::new(Selection::All, Join::Inline(", "))
            .join_fields(&fields(), 4, |i, f| format!("{}{}", i, f.cobol_name()));
        assert_eq!(inline, "0A, 1B");
    }
}
