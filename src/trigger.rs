//! Triggers and trigger registries
//!
//! A trigger is a named macro handler. Given the running generation and the
//! token's parameters it returns replacement text (or nothing), and declares
//! whether that text replaces only its own token or the whole output line.
//!
//! Registries map normalized names to triggers. Each output backend has its
//! own registry, so the same name can mean different things per target or
//! be absent altogether. Registries are built once and shared read-only;
//! triggers keep no mutable state of their own.

use crate::control::GenerationRun;
use crate::error::Result;
use crate::line::normalize_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named macro handler
pub trait Trigger: Send + Sync {
    /// Registry name (upper case)
    fn name(&self) -> &str;

    /// One-line description shown by `rategen triggers`
    fn summary(&self) -> &str {
        ""
    }

    /// Produce replacement text. `Ok(None)` deletes the token (or, for a
    /// line-replacing trigger, suppresses the line). Errors abort the run
    /// and are reserved for resource failures.
    fn resolve(&self, run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>>;

    /// Whether the result supersedes the entire output line
    fn replaces_entire_line(&self) -> bool {
        false
    }

    /// Upper bound on pipe-form parameters consumed from the line
    fn max_params(&self) -> Option<usize> {
        None
    }
}

/// Resolver signature used by [`FnTrigger`]
pub type ResolveFn = fn(&mut GenerationRun<'_>, &[String]) -> Result<Option<String>>;

/// A trigger backed by a plain function
#[derive(Clone, Copy)]
pub struct FnTrigger {
    name: &'static str,
    summary: &'static str,
    whole_line: bool,
    max_params: Option<usize>,
    resolve: ResolveFn,
}

impl FnTrigger {
    /// Token-replacing trigger
    pub const fn token(
        name: &'static str,
        summary: &'static str,
        max_params: Option<usize>,
        resolve: ResolveFn,
    ) -> Self {
        Self {
            name,
            summary,
            whole_line: false,
            max_params,
            resolve,
        }
    }

    /// Line-replacing trigger
    pub const fn line(
        name: &'static str,
        summary: &'static str,
        max_params: Option<usize>,
        resolve: ResolveFn,
    ) -> Self {
        Self {
            name,
            summary,
            whole_line: true,
            max_params,
            resolve,
        }
    }
}

impl Trigger for FnTrigger {
    fn name(&self) -> &str {
        self.name
    }

    fn summary(&self) -> &str {
        self.summary
    }

    fn resolve(&self, run: &mut GenerationRun<'_>, params: &[String]) -> Result<Option<String>> {
        (self.resolve)(run, params)
    }

    fn replaces_entire_line(&self) -> bool {
        self.whole_line
    }

    fn max_params(&self) -> Option<usize> {
        self.max_params
    }
}

/// Case-insensitive name -> trigger table
#[derive(Clone, Default)]
pub struct TriggerRegistry {
    label: String,
    triggers: HashMap<String, Arc<dyn Trigger>>,
}

impl TriggerRegistry {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            triggers: HashMap::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Add a trigger, returning the one it replaced
    pub fn register(&mut self, trigger: impl Trigger + 'static) -> Option<Arc<dyn Trigger>> {
        self.register_arc(Arc::new(trigger))
    }

    pub fn register_arc(&mut self, trigger: Arc<dyn Trigger>) -> Option<Arc<dyn Trigger>> {
        self.triggers.insert(normalize_name(trigger.name()), trigger)
    }

    pub fn with(mut self, trigger: impl Trigger + 'static) -> Self {
        self.register(trigger);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Trigger> {
        self.triggers.get(&normalize_name(name)).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.triggers.contains_key(&normalize_name(name))
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.triggers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Triggers sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &dyn Trigger> {
        let mut entries: Vec<_> = self.triggers.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, t)| t.as_ref())
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

impl fmt::Debug for TriggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerRegistry")
            .field("label", &self.label)
            .field("triggers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(_: &mut GenerationRun<'_>, _: &[String]) -> Result<Option<String>> {
        Ok(Some("X".into()))
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry =
            TriggerRegistry::new("test").with(FnTrigger::token("PGM", "program", Some(0), fixed));
        assert!(registry.contains("pgm"));
        assert!(registry.contains(" Pgm "));
        assert_eq!(registry.get("PgM").map(|t| t.name()), Some("PGM"));
        assert!(registry.get("LOB").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = TriggerRegistry::new("test");
        assert!(registry
            .register(FnTrigger::token("A", "", None, fixed))
            .is_none());
        let replaced = registry.register(FnTrigger::line("a", "", None, fixed));
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.get("A").unwrap().replaces_entire_line());
    }

    #[test]
    fn test_names_sorted() {
        let registry = TriggerRegistry::new("test")
            .with(FnTrigger::token("ZED", "", None, fixed))
            .with(FnTrigger::token("<", "", None, fixed))
            .with(FnTrigger::token("ALPHA", "", None, fixed));
        assert_eq!(registry.names(), ["<", "ALPHA", "ZED"]);
        let iterated: Vec<_> = registry.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(iterated, ["<", "ALPHA", "ZED"]);
    }

    #[test]
    fn test_defaults() {
        let trigger = FnTrigger::token("T", "", None, fixed);
        assert!(!trigger.replaces_entire_line());
        assert_eq!(trigger.max_params(), None);
        assert_eq!(format!("{:?}", TriggerRegistry::new("x").with(trigger)),
            "TriggerRegistry { label: \"x\", triggers: [\"T\"] }");
    }
}
