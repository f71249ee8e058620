//! Per-run generation state
//!
//! Every generation call (the top-level template or a nested sub-template)
//! gets its own [`GenerationContext`]. Contexts live in a [`ContextArena`]
//! and point at their parent by [`ContextId`], which keeps nested runs an
//! explicit stack instead of recursion over shared mutable state.
//!
//! Values that triggers read or update during a run (program name, linkage
//! prefix, scratch slots) are fields here, never process-wide state, so
//! independent runs cannot interfere.

use crate::schema::FieldMeta;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;

/// Index of a context within its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(usize);

impl ContextId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Business values shared by a run and inherited by its sub-templates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusinessContext {
    /// Insurance line code (e.g. `BOP`, `WC`)
    pub insurance_line: String,
    /// Process-type tag (e.g. `RATE`, `EDIT`)
    pub process_type: String,
    pub program_name: String,
    /// Compared by the `<` and `!` directives
    pub linkage_prefix: String,
}

/// The table a template region is generated for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableBinding {
    pub name: String,
    pub index: usize,
    /// Fields supplied by the caller; when `None` they come from the schema
    pub fields: Option<Vec<FieldMeta>>,
}

impl TableBinding {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            fields: None,
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldMeta>) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// Mutable state of one generation call
#[derive(Debug, Clone)]
pub struct GenerationContext {
    id: ContextId,
    parent: Option<ContextId>,
    depth: usize,
    template: String,
    is_main: bool,
    output: String,
    pub business: BusinessContext,
    pub table: Option<TableBinding>,
    pub scratch: BTreeMap<String, String>,
    /// Line currently being resolved (1-based)
    pub line_number: usize,
    /// Raw text of the token currently being resolved
    pub current_token: Option<String>,
    /// Character column where the current token starts
    pub token_column: usize,
    pub started_at: DateTime<Local>,
}

impl GenerationContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn parent(&self) -> Option<ContextId> {
        self.parent
    }

    /// 0 for the top-level run
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn is_main(&self) -> bool {
        self.is_main
    }

    /// Name of the bound output target
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn insurance_line(&self) -> &str {
        &self.business.insurance_line
    }

    pub fn process_type(&self) -> &str {
        &self.business.process_type
    }

    pub fn program_name(&self) -> &str {
        &self.business.program_name
    }

    pub fn linkage_prefix(&self) -> &str {
        &self.business.linkage_prefix
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table.as_ref().map(|t| t.name.as_str())
    }

    pub fn bind_table(&mut self, table: TableBinding) {
        self.table = Some(table);
    }

    pub fn scratch(&self, slot: &str) -> Option<&str> {
        self.scratch
            .get(&slot.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn set_scratch(&mut self, slot: &str, value: impl Into<String>) {
        self.scratch.insert(slot.to_ascii_uppercase(), value.into());
    }
}

/// Stack-ordered storage for a run's contexts
#[derive(Debug)]
pub struct ContextArena {
    contexts: Vec<GenerationContext>,
}

impl ContextArena {
    /// Arena holding a single top-level context
    pub fn new(
        template: impl Into<String>,
        output: impl Into<String>,
        business: BusinessContext,
        is_main: bool,
    ) -> Self {
        let root = GenerationContext {
            id: ContextId(0),
            parent: None,
            depth: 0,
            template: template.into(),
            is_main,
            output: output.into(),
            business,
            table: None,
            scratch: BTreeMap::new(),
            line_number: 0,
            current_token: None,
            token_column: 0,
            started_at: Local::now(),
        };
        Self {
            contexts: vec![root],
        }
    }

    pub fn root(&self) -> ContextId {
        ContextId(0)
    }

    pub fn get(&self, id: ContextId) -> &GenerationContext {
        &self.contexts[id.0]
    }

    pub fn get_mut(&mut self, id: ContextId) -> &mut GenerationContext {
        &mut self.contexts[id.0]
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Push a context for a sub-template of `parent`.
    ///
    /// A non-main child inherits the parent's business values, table
    /// binding and scratch slots. A main child starts from the top-level
    /// business values with no table bound.
    pub fn spawn_child(
        &mut self,
        parent: ContextId,
        template: impl Into<String>,
        is_main: bool,
    ) -> ContextId {
        let id = ContextId(self.contexts.len());
        let parent_ctx = self.get(parent);
        let (business, table, scratch) = if is_main {
            let root = self.get(self.root());
            (root.business.clone(), None, BTreeMap::new())
        } else {
            (
                parent_ctx.business.clone(),
                parent_ctx.table.clone(),
                parent_ctx.scratch.clone(),
            )
        };
        let child = GenerationContext {
            id,
            parent: Some(parent),
            depth: parent_ctx.depth + 1,
            template: template.into(),
            is_main,
            output: parent_ctx.output.clone(),
            business,
            table,
            scratch,
            line_number: 0,
            current_token: None,
            token_column: 0,
            started_at: parent_ctx.started_at,
        };
        self.contexts.push(child);
        id
    }

    /// Drop a finished child and everything pushed after it
    pub fn release(&mut self, id: ContextId) {
        if id.0 > 0 {
            self.contexts.truncate(id.0);
        }
    }

    /// `id` followed by its parent chain up to the root
    pub fn ancestry(&self, id: ContextId) -> impl Iterator<Item = &GenerationContext> {
        let mut next = Some(id);
        std::iter::from_fn(move || {
            let ctx = self.get(next?);
            next = ctx.parent;
            Some(ctx)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> ContextArena {
        ContextArena::new(
            "rate.cbt",
            "PGUOBK3.cbl",
            BusinessContext {
                insurance_line: "BOP".into(),
                process_type: "RATE".into(),
                program_name: "PGUOBK3".into(),
                linkage_prefix: "LK".into(),
            },
            true,
        )
    }

    #[test]
    fn test_child_inherits_parent_context() {
        let mut arena = arena();
        let root = arena.root();
        arena.get_mut(root).bind_table(TableBinding::new("BOP_RATE", 3));
        arena.get_mut(root).set_scratch("ws", "X");
        arena.get_mut(root).business.linkage_prefix = "ABC".into();

        let child = arena.spawn_child(root, "frag.cbt", false);
        let ctx = arena.get(child);
        assert_eq!(ctx.parent(), Some(root));
        assert_eq!(ctx.depth(), 1);
        assert!(!ctx.is_main());
        assert_eq!(ctx.table_name(), Some("BOP_RATE"));
        assert_eq!(ctx.scratch("WS"), Some("X"));
        assert_eq!(ctx.linkage_prefix(), "ABC");
        assert_eq!(ctx.output(), "PGUOBK3.cbl");
    }

    #[test]
    fn test_main_child_does_not_inherit_table() {
        let mut arena = arena();
        let root = arena.root();
        arena.get_mut(root).bind_table(TableBinding::new("BOP_RATE", 3));
        let mid = arena.spawn_child(root, "mid.cbt", false);
        arena.get_mut(mid).business.program_name = "CHANGED".into();

        let main = arena.spawn_child(mid, "main2.cbt", true);
        let ctx = arena.get(main);
        assert!(ctx.is_main());
        assert_eq!(ctx.table_name(), None);
        assert_eq!(ctx.program_name(), "PGUOBK3");
        assert_eq!(ctx.depth(), 2);
    }

    #[test]
    fn test_child_changes_do_not_leak_to_parent() {
        let mut arena = arena();
        let root = arena.root();
        let child = arena.spawn_child(root, "frag.cbt", false);
        arena.get_mut(child).set_scratch("A", "1");
        arena.release(child);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.get(root).scratch("A"), None);
    }

    #[test]
    fn test_ancestry_walks_to_root() {
        let mut arena = arena();
        let root = arena.root();
        let a = arena.spawn_child(root, "a.cbt", false);
        let b = arena.spawn_child(a, "b.cbt", false);
        let templates: Vec<_> = arena.ancestry(b).map(|c| c.template()).collect();
        assert_eq!(templates, ["b.cbt", "a.cbt", "rate.cbt"]);
    }

    #[test]
    fn test_release_root_is_noop() {
        let mut arena = arena();
        arena.release(arena.root());
        assert_eq!(arena.len(), 1);
    }
}
