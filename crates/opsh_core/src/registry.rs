//! Hierarchical command registry and the longest-match resolver.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::definition::{Candidate, CommandDefinition};
use crate::error::{RegistryError, ResolveError};

/// Separator between levels of a qualified id.
pub const ID_SEPARATOR: &str = ":";

/// Result of resolving a word sequence.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Number of leading words consumed by the command path
    pub depth: usize,
    /// Qualified id of the matched definition
    pub id: String,
    pub definition: Rc<CommandDefinition>,
}

/// Definitions keyed by qualified id (`widgets`, `widgets:list`, ...).
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, Rc<CommandDefinition>>,
    top_level: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition and its whole subcommand tree.
    ///
    /// Nothing is inserted when any id in the tree collides.
    pub fn register(&mut self, definition: CommandDefinition) -> Result<(), RegistryError> {
        let mut pending = Vec::new();
        collect(&definition, None, &mut pending)?;

        let mut seen = std::collections::HashSet::new();
        for (id, _) in &pending {
            if self.entries.contains_key(id) || !seen.insert(id.clone()) {
                return Err(RegistryError::Duplicate { id: id.clone() });
            }
        }

        self.top_level.push(definition.name.clone());
        for (id, def) in pending {
            debug!(%id, "registered command");
            self.entries.insert(id, def);
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Rc<CommandDefinition>> {
        self.entries.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enabled top-level commands in registration order.
    pub fn top_level(&self) -> Vec<Candidate> {
        self.top_level
            .iter()
            .filter_map(|id| self.entries.get(id))
            .filter(|def| !def.is_disabled())
            .map(|def| Candidate::new(&def.name).with_description(&def.description))
            .collect()
    }

    /// Enabled direct children of `id`.
    pub fn subcommands(&self, id: &str) -> Vec<Candidate> {
        let Some(def) = self.entries.get(id) else {
            return Vec::new();
        };
        def.subcommands
            .iter()
            .filter(|child| !child.is_disabled())
            .map(|child| Candidate::new(&child.name).with_description(&child.description))
            .collect()
    }

    /// Greedy longest match of `words` against registered ids.
    ///
    /// A disabled top-level command hides its whole subtree.
    pub fn resolve<S: AsRef<str>>(&self, words: &[S]) -> Result<Resolution, ResolveError> {
        let words: Vec<&str> = words.iter().map(AsRef::as_ref).collect();
        let Some(first) = words.first() else {
            return Err(ResolveError::NotFound {
                command: String::new(),
            });
        };

        if let Some(root) = self.entries.get(*first) {
            if root.is_disabled() {
                return Err(ResolveError::Disabled {
                    command: first.to_string(),
                });
            }
        }

        for depth in (1..=words.len()).rev() {
            let id = words[..depth].join(ID_SEPARATOR);
            if let Some(def) = self.entries.get(&id) {
                if def.is_disabled() {
                    continue;
                }
                debug!(%id, depth, "resolved command");
                return Ok(Resolution {
                    depth,
                    id,
                    definition: Rc::clone(def),
                });
            }
        }

        Err(ResolveError::NotFound {
            command: words.join(" "),
        })
    }
}

fn collect(
    definition: &CommandDefinition,
    parent: Option<&str>,
    out: &mut Vec<(String, Rc<CommandDefinition>)>,
) -> Result<(), RegistryError> {
    let name = &definition.name;
    if name.is_empty() || name.contains(ID_SEPARATOR) || name.contains(' ') {
        return Err(RegistryError::InvalidName { name: name.clone() });
    }

    let id = match parent {
        Some(parent) => format!("{parent}{ID_SEPARATOR}{name}"),
        None => name.clone(),
    };
    out.push((id.clone(), Rc::new(definition.clone())));
    for child in &definition.subcommands {
        collect(child, Some(&id), out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::definition::ArgumentDef;

    fn widgets() -> CommandDefinition {
        CommandDefinition::new("widgets", "Manage widgets")
            .subcommand(CommandDefinition::new("list", "List widgets"))
            .subcommand(
                CommandDefinition::new("download", "Download a widget")
                    .argument(ArgumentDef::new("id")),
            )
    }

    #[test]
    fn test_register_walks_tree() {
        let mut registry = Registry::new();
        registry.register(widgets()).unwrap();
        assert!(registry.contains("widgets"));
        assert!(registry.contains("widgets:list"));
        assert!(registry.contains("widgets:download"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_duplicate_registration_fails_atomically() {
        let mut registry = Registry::new();
        registry.register(widgets()).unwrap();
        let err = registry.register(widgets()).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                id: "widgets".into()
            }
        );
        assert_eq!(registry.top_level().len(), 1);
    }

    #[test]
    fn test_duplicate_child_names() {
        let def = CommandDefinition::new("a", "")
            .subcommand(CommandDefinition::new("b", ""))
            .subcommand(CommandDefinition::new("b", ""));
        let mut registry = Registry::new();
        assert!(matches!(
            registry.register(def),
            Err(RegistryError::Duplicate { id }) if id == "a:b"
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_names() {
        let mut registry = Registry::new();
        assert!(registry
            .register(CommandDefinition::new("a:b", ""))
            .is_err());
        assert!(registry.register(CommandDefinition::new("", "")).is_err());
    }

    #[test]
    fn test_resolve_longest_match() {
        let mut registry = Registry::new();
        registry.register(widgets()).unwrap();

        let r = registry.resolve(&["widgets", "download", "abc"]).unwrap();
        assert_eq!(r.depth, 2);
        assert_eq!(r.id, "widgets:download");

        let r = registry.resolve(&["widgets", "nope"]).unwrap();
        assert_eq!(r.depth, 1);

        assert!(matches!(
            registry.resolve(&["gadgets"]),
            Err(ResolveError::NotFound { .. })
        ));
        assert!(registry.resolve::<&str>(&[]).is_err());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut registry = Registry::new();
        registry.register(widgets()).unwrap();
        let words = ["widgets", "list"];
        let a = registry.resolve(&words).unwrap();
        let b = registry.resolve(&words).unwrap();
        assert_eq!((a.depth, a.id), (b.depth, b.id));
    }

    #[test]
    fn test_disabled_root_hides_subtree() {
        let mut registry = Registry::new();
        registry.register(widgets().disabled_when(|| true)).unwrap();
        assert!(registry.contains("widgets:list"));
        assert!(matches!(
            registry.resolve(&["widgets", "list"]),
            Err(ResolveError::Disabled { .. })
        ));
        assert!(registry.top_level().is_empty());
    }

    #[test]
    fn test_disabled_child_falls_back_to_parent() {
        let toggle = std::rc::Rc::new(Cell::new(true));
        let flag = toggle.clone();
        let def = CommandDefinition::new("themes", "")
            .subcommand(CommandDefinition::new("publish", "").disabled_when(move || flag.get()));
        let mut registry = Registry::new();
        registry.register(def).unwrap();

        assert_eq!(registry.resolve(&["themes", "publish"]).unwrap().depth, 1);
        assert!(registry.subcommands("themes").is_empty());

        toggle.set(false);
        assert_eq!(registry.resolve(&["themes", "publish"]).unwrap().depth, 2);
        assert_eq!(registry.subcommands("themes").len(), 1);
    }
}
