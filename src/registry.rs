//! Object registry (§3.3, §4.3): allocation, lazy resolution, dirty/new
//! tracking, name interning, reverse lookup.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{PDFError, Result};
use crate::object_parser::ObjectSource;
use crate::objects::{Name, PDFObject, Reference};

/// Name-interning table, shared (by `Rc`) between a `Registry` and whatever
/// `ObjectSource` backs it, so both sides intern into the same table without
/// a reference cycle between them (§3.2: "interned globally within a
/// registry").
#[derive(Clone)]
pub(crate) struct NameTable(Rc<RefCell<HashMap<Box<[u8]>, Rc<str>>>>);

impl NameTable {
    pub(crate) fn new() -> Self {
        Self(Rc::new(RefCell::new(HashMap::new())))
    }

    pub(crate) fn intern(&self, bytes: &[u8]) -> Name {
        let mut table = self.0.borrow_mut();
        if let Some(existing) = table.get(bytes) {
            return Name(existing.clone());
        }
        let text = String::from_utf8_lossy(bytes).into_owned();
        let rc: Rc<str> = Rc::from(text);
        table.insert(Box::from(bytes), rc.clone());
        Name(rc)
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Unresolved { offset: u64 },
    UnresolvedCompressed { stream_obj: u32, index: u32 },
    /// `resolve` marks a slot `Loading` on entry so reference cycles return
    /// the in-progress value instead of recursing forever (§4.3).
    Loading,
    Loaded { value: PDFObject, dirty: bool },
    New { value: PDFObject },
    Free { next_free: u32, generation: u16 },
}

/// Owns every indirect object of one document. Single-threaded by contract
/// (§4.3): callers parsing independent documents in parallel must use
/// distinct registries.
pub struct Registry {
    source: Option<Rc<dyn ObjectSource>>,
    entries: HashMap<u32, Entry>,
    next_object_number: u32,
    names: NameTable,
    warnings: RefCell<Vec<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            source: None,
            entries: HashMap::new(),
            next_object_number: 1,
            names: NameTable::new(),
            warnings: RefCell::new(Vec::new()),
        }
    }

    /// Builds a registry backed by `source`, sharing `names` as the single
    /// interning table both sides use.
    pub fn with_source(source: Rc<dyn ObjectSource>, names: NameTable) -> Self {
        Self { source: Some(source), names, ..Self::new() }
    }

    pub(crate) fn name_table(&self) -> NameTable {
        self.names.clone()
    }

    /// Registers a known-on-disk, not-yet-parsed object at `offset`.
    pub fn register_unresolved(&mut self, object_number: u32, offset: u64) {
        self.entries.insert(object_number, Entry::Unresolved { offset });
        self.next_object_number = self.next_object_number.max(object_number + 1);
    }

    pub fn register_unresolved_compressed(&mut self, object_number: u32, stream_obj: u32, index: u32) {
        self.entries
            .insert(object_number, Entry::UnresolvedCompressed { stream_obj, index });
        self.next_object_number = self.next_object_number.max(object_number + 1);
    }

    pub fn register_free(&mut self, object_number: u32, next_free: u32, generation: u16) {
        self.entries.insert(object_number, Entry::Free { next_free, generation });
        self.next_object_number = self.next_object_number.max(object_number + 1);
    }

    /// Allocates the next object number and stores `value` as `New` (always
    /// dirty, per §3.3's lifecycle note).
    pub fn allocate(&mut self, value: PDFObject) -> Reference {
        let object_number = self.next_object_number;
        self.next_object_number += 1;
        self.entries.insert(object_number, Entry::New { value });
        Reference::new(object_number, 0)
    }

    /// Resolves a reference to its value, parsing lazily on first access.
    pub fn resolve(&mut self, reference: Reference) -> Result<PDFObject> {
        let object_number = reference.object_number;
        match self.entries.get(&object_number) {
            Some(Entry::Loaded { value, .. }) | Some(Entry::New { value }) => return Ok(value.clone()),
            Some(Entry::Loading) => {
                return Err(PDFError::InvariantViolation("reference cycle resolved before value was installed"));
            }
            Some(Entry::Free { .. }) | None => {
                return Err(PDFError::BrokenReference { obj_num: object_number, gen_num: reference.generation });
            }
            Some(Entry::Unresolved { .. }) | Some(Entry::UnresolvedCompressed { .. }) => {}
        }

        let prior = self.entries.insert(object_number, Entry::Loading);
        let value = match prior {
            Some(Entry::Unresolved { offset }) => self.parse_at_offset(object_number, offset),
            Some(Entry::UnresolvedCompressed { stream_obj, index }) => {
                self.parse_from_object_stream(stream_obj, index)
            }
            _ => unreachable!("checked above"),
        };

        match value {
            Ok(value) => {
                self.entries.insert(object_number, Entry::Loaded { value: value.clone(), dirty: false });
                Ok(value)
            }
            Err(err) => {
                // Leave the slot `Loading`-free so a retry is possible, but
                // don't silently resurrect a broken offset as Unresolved.
                self.entries.remove(&object_number);
                Err(err)
            }
        }
    }

    fn parse_at_offset(&mut self, expected_number: u32, offset: u64) -> Result<PDFObject> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| PDFError::InvariantViolation("resolve called on a registry with no backing source"))?;
        source.parse_indirect_object(expected_number, offset)
    }

    fn parse_from_object_stream(&mut self, stream_obj: u32, index: u32) -> Result<PDFObject> {
        let stream_value = self.resolve(Reference::new(stream_obj, 0))?;
        let stream = stream_value
            .as_stream()
            .ok_or_else(|| PDFError::malformed(0, format!("object stream {} is not a stream", stream_obj)))?
            .clone();
        let source = self
            .source
            .clone()
            .ok_or_else(|| PDFError::InvariantViolation("resolve called on a registry with no backing source"))?;
        source.parse_compressed_object(&stream, index)
    }

    /// Marks an already-loaded object dirty, e.g. after a field mutation.
    pub fn mark_dirty(&mut self, object_number: u32) -> Result<()> {
        match self.entries.get_mut(&object_number) {
            Some(Entry::Loaded { dirty, .. }) => {
                *dirty = true;
                Ok(())
            }
            Some(Entry::New { .. }) => Ok(()),
            _ => Err(PDFError::InvariantViolation("mark_dirty on an unloaded or free slot")),
        }
    }

    pub fn set(&mut self, object_number: u32, value: PDFObject) -> Result<()> {
        match self.entries.get(&object_number) {
            Some(Entry::Free { .. }) => {
                return Err(PDFError::InvariantViolation("attempted to write a free slot"));
            }
            _ => {}
        }
        self.entries.insert(object_number, Entry::Loaded { value, dirty: true });
        Ok(())
    }

    /// Transitions the given object numbers (the just-written dirty/new
    /// set of a successful incremental save) to clean `Loaded` entries, so
    /// a subsequent save sees them as persisted rather than re-appending
    /// them (§4.8: "Dirty/new flags on the registry are cleared; new
    /// entries transition to loaded with their recorded offsets").
    pub fn commit_written(&mut self, object_numbers: &[u32]) {
        for &num in object_numbers {
            let value = match self.entries.get(&num) {
                Some(Entry::New { value }) | Some(Entry::Loaded { value, dirty: true }) => value.clone(),
                _ => continue,
            };
            self.entries.insert(num, Entry::Loaded { value, dirty: false });
        }
    }

    /// True if `object_number` was registered by [`Self::allocate`] and has
    /// never been written before (as opposed to a preexisting object that
    /// was loaded and then mutated) — distinguishes the two dirty-reasons
    /// that `dirty_objects` otherwise conflates (§4.8 step 3).
    pub fn is_new(&self, object_number: u32) -> bool {
        matches!(self.entries.get(&object_number), Some(Entry::New { .. }))
    }

    /// Object numbers with pending mutations, for incremental writes.
    pub fn dirty_objects(&self) -> Vec<u32> {
        self.entries
            .iter()
            .filter(|(_, e)| matches!(e, Entry::Loaded { dirty: true, .. } | Entry::New { .. }))
            .map(|(n, _)| *n)
            .collect()
    }

    /// All live (non-free) object numbers, for complete writes after GC has
    /// pruned the unreachable ones from the caller's root set.
    pub fn live_objects(&self) -> Vec<u32> {
        self.entries
            .iter()
            .filter(|(_, e)| !matches!(e, Entry::Free { .. } | Entry::Loading))
            .map(|(n, _)| *n)
            .collect()
    }

    pub fn highest_object_number(&self) -> u32 {
        self.next_object_number.saturating_sub(1)
    }

    /// Interns `bytes` as a name, returning the shared handle. Two names
    /// with equal bytes share identity within this registry (§3.2).
    pub fn intern_name(&self, bytes: &[u8]) -> Name {
        self.names.intern(bytes)
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.borrow_mut().push(message);
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    /// Finds the reference of an already-registered object whose value is
    /// `needle` by pointer identity on shared streams, falling back to
    /// structural equality for everything else — used when a newly built
    /// child object must be embedded by reference into its parent (§4.3).
    pub fn find_reference(&self, needle: &PDFObject) -> Option<Reference> {
        self.entries.iter().find_map(|(num, entry)| match entry {
            Entry::Loaded { value, .. } | Entry::New { value } if value == needle => {
                Some(Reference::new(*num, 0))
            }
            _ => None,
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::PDFNumber;

    #[test]
    fn allocate_is_always_dirty_and_monotonic() {
        let mut reg = Registry::new();
        let a = reg.allocate(PDFObject::Null);
        let b = reg.allocate(PDFObject::Null);
        assert_eq!(a.object_number, 1);
        assert_eq!(b.object_number, 2);
        assert_eq!(reg.dirty_objects().len(), 2);
    }

    #[test]
    fn intern_name_shares_identity() {
        let reg = Registry::new();
        let a = reg.intern_name(b"Type");
        let b = reg.intern_name(b"Type");
        assert!(Rc::ptr_eq(&a.0, &b.0));
    }

    #[test]
    fn resolve_without_source_on_unresolved_slot_errors() {
        let mut reg = Registry::new();
        reg.register_unresolved(5, 100);
        let err = reg.resolve(Reference::new(5, 0)).unwrap_err();
        assert!(matches!(err, PDFError::InvariantViolation(_)));
    }

    #[test]
    fn resolve_on_free_slot_is_broken_reference() {
        let mut reg = Registry::new();
        reg.register_free(7, 0, 0);
        let err = reg.resolve(Reference::new(7, 0)).unwrap_err();
        assert!(matches!(err, PDFError::BrokenReference { obj_num: 7, .. }));
    }

    #[test]
    fn set_on_free_slot_is_invariant_violation() {
        let mut reg = Registry::new();
        reg.register_free(7, 0, 0);
        let err = reg.set(7, PDFObject::Number(PDFNumber::Int(1))).unwrap_err();
        assert!(matches!(err, PDFError::InvariantViolation(_)));
    }
}
