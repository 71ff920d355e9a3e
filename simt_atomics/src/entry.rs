//! Generation entries and the arena that holds them.

use tracing::trace;

use crate::catalog::{AxisCatalog, Operation, Scope, Width};
use crate::error::{Error, Result};
use crate::pointer;
use crate::synth::Ladder;
use crate::template::Leaf;

/// Width slot 0 is "no width axis"; slots 1..=4 are 8..=64 bits.
const WIDTH_SLOTS: usize = 1 + Width::ALL.len();

/// Dense index over scope × operation × width slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey(u16);

impl EntryKey {
    pub const SPACE: usize = Scope::ALL.len() * Operation::COUNT * WIDTH_SLOTS;

    pub fn new(scope: Scope, operation: Operation, width: Option<Width>) -> Self {
        let slot = width.map_or(0, |w| w.index() + 1);
        let dense = (scope.index() * Operation::COUNT + operation.index()) * WIDTH_SLOTS + slot;
        Self(dense as u16)
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One specialized dispatch function of the emitted unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationEntry {
    pub key: EntryKey,
    pub scope: Scope,
    pub operation: Operation,
    pub width: Option<Width>,
    pub ladder: Ladder,
}

impl GenerationEntry {
    pub fn new(scope: Scope, operation: Operation, width: Option<Width>) -> Result<Self> {
        let malformed = |reason: &str| Error::MalformedLadder {
            operation,
            scope,
            reason: reason.to_string(),
        };
        let ladder = match (operation, width) {
            (Operation::Fence, None) => Ladder::for_fence(scope)?,
            (Operation::Load, Some(width)) => Ladder::for_load(scope, width)?,
            (Operation::Store, Some(width)) => Ladder::for_store(scope, width)?,
            (Operation::Rmw(op), Some(width)) => {
                Ladder::for_rmw(operation, scope, width, op.native())?
            }
            (Operation::Pointer(op), None) => pointer::ladder(op, scope)?,
            (_, None) => return Err(malformed("operation needs a width")),
            (_, Some(_)) => return Err(malformed("operation has no width axis")),
        };
        Ok(Self {
            key: EntryKey::new(scope, operation, width),
            scope,
            operation,
            width,
            ladder,
        })
    }

    /// Name of the emitted entry point.
    pub fn name(&self) -> String {
        match (self.operation, self.width) {
            (Operation::Fence, _) => format!("atomic_thread_fence_{}", self.scope),
            (Operation::Pointer(op), _) => format!("atomic_{}_ptr_{}", op.name(), self.scope),
            (op, Some(width)) => format!("atomic_{}_{}_{}", op.name(), width.bits(), self.scope),
            (op, None) => format!("atomic_{}_{}", op.name(), self.scope),
        }
    }

    /// Compare-and-swap dispatches on the combination of two orders.
    pub fn dispatches_on_pair(&self) -> bool {
        matches!(
            self.operation,
            Operation::Rmw(crate::catalog::RmwOp::CompareExchange)
        )
    }

    pub fn leaves(&self) -> Vec<Leaf> {
        self.ladder.leaves()
    }
}

/// Arena of every entry, in emission order, plus a dense key index.
#[derive(Clone, Debug)]
pub struct EntryTable {
    entries: Vec<GenerationEntry>,
    slots: Vec<Option<u32>>,
}

impl EntryTable {
    /// Walks scope, then operation, then width.
    pub fn build(catalog: &AxisCatalog) -> Result<Self> {
        catalog.validate()?;
        let mut table = Self {
            entries: Vec::new(),
            slots: vec![None; EntryKey::SPACE],
        };
        for &scope in &catalog.scopes {
            for operation in catalog.operations() {
                for width in catalog.widths_for(operation) {
                    table.insert(GenerationEntry::new(scope, operation, width)?)?;
                }
            }
        }
        Ok(table)
    }

    fn insert(&mut self, entry: GenerationEntry) -> Result<()> {
        let slot = &mut self.slots[entry.key.index()];
        if slot.is_some() {
            return Err(Error::DuplicateEntry(entry.name()));
        }
        *slot = Some(self.entries.len() as u32);
        trace!(entry = %entry.name(), key = entry.key.index(), "registered entry");
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(
        &self,
        scope: Scope,
        operation: Operation,
        width: Option<Width>,
    ) -> Option<&GenerationEntry> {
        self.by_key(EntryKey::new(scope, operation, width))
    }

    pub fn by_key(&self, key: EntryKey) -> Option<&GenerationEntry> {
        let index = (*self.slots.get(key.index())?)?;
        self.entries.get(index as usize)
    }

    pub fn by_name(&self, name: &str) -> Option<&GenerationEntry> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerationEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
