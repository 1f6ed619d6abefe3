//! Label arena for branch targets.
//!
//! Labels are interned by name and referenced by stable `LabelId` handles,
//! so pushing more labels never invalidates an existing reference. A label's
//! code offset starts out unresolved and is written exactly once, when the
//! instruction defining it is realized.

use std::collections::HashMap;

/// Stable handle into a [`LabelArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(u32);

impl LabelId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named code position, unresolved until its defining instruction has
/// been realized. Offsets are relative to the start of the code body.
#[derive(Debug)]
pub struct Label {
    pub name: String,
    pub offset: Option<u32>,
}

/// Error type for label resolution.
#[derive(Debug, PartialEq, Eq)]
pub enum LabelError {
    DefinedTwice(String),
}

impl std::fmt::Display for LabelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelError::DefinedTwice(name) => {
                write!(f, "label `{}` is defined more than once", name)
            }
        }
    }
}

impl std::error::Error for LabelError {}

/// Owner of all labels in a compilation.
///
/// Single-writer-then-reader: offsets are written during realization and
/// only read during encoding.
#[derive(Debug, Default)]
pub struct LabelArena {
    labels: Vec<Label>,
    by_name: HashMap<String, LabelId>,
}

impl LabelArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a label name. Idempotent: a name that was already seen
    /// returns its existing handle.
    pub fn intern(&mut self, name: &str) -> LabelId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }

        let id = LabelId(self.labels.len() as u32);
        self.labels.push(Label {
            name: name.to_string(),
            offset: None,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Look up a label by name without creating it.
    pub fn lookup(&self, name: &str) -> Option<LabelId> {
        self.by_name.get(name).copied()
    }

    /// Record the code offset of a label's defining instruction.
    /// A label may only be defined once.
    pub fn resolve(&mut self, id: LabelId, offset: u32) -> Result<(), LabelError> {
        let label = &mut self.labels[id.index()];
        if label.offset.is_some() {
            return Err(LabelError::DefinedTwice(label.name.clone()));
        }
        label.offset = Some(offset);
        Ok(())
    }

    pub fn name(&self, id: LabelId) -> &str {
        &self.labels[id.index()].name
    }

    pub fn offset(&self, id: LabelId) -> Option<u32> {
        self.labels[id.index()].offset
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut arena = LabelArena::new();
        let a = arena.intern("loop");
        let b = arena.intern("done");
        let c = arena.intern("loop");

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_lookup() {
        let mut arena = LabelArena::new();
        let id = arena.intern("loop");

        assert_eq!(arena.lookup("loop"), Some(id));
        assert_eq!(arena.lookup("missing"), None);
    }

    #[test]
    fn test_resolve_once() {
        let mut arena = LabelArena::new();
        let id = arena.intern("loop");
        assert_eq!(arena.offset(id), None);

        arena.resolve(id, 12).unwrap();
        assert_eq!(arena.offset(id), Some(12));
    }

    #[test]
    fn test_resolve_twice_fails() {
        let mut arena = LabelArena::new();
        let id = arena.intern("loop");
        arena.resolve(id, 0).unwrap();

        assert_eq!(
            arena.resolve(id, 4),
            Err(LabelError::DefinedTwice("loop".to_string()))
        );
    }
}
