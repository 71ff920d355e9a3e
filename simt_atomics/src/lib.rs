/// Scopes, widths and operations the table is generated over.
pub mod catalog;
/// Dispatch functions and leaves rendered into one Rust source unit.
pub mod emit;
/// The dense-key arena of generation entries.
pub mod entry;
pub mod error;
/// Memory orders, their strength lattice and instruction semantics.
pub mod ordering;
/// Pointer `fetch_add`/`fetch_sub` on top of the 64-bit `add` leaves.
pub mod pointer;
/// Host simulator for checking dispatch plans without a device.
pub mod sim;
/// Escalation ladders: which leaves each memory order runs.
pub mod synth;
/// Native PTX instruction templates.
pub mod template;

pub use catalog::{AxisCatalog, Operation, PointerOp, RmwOp, Scope, Width};
pub use emit::{Emitter, GeneratedUnit};
pub use entry::{EntryKey, EntryTable, GenerationEntry};
pub use error::{DispatchFault, Error, Result, SimFault};
pub use ordering::MemoryOrder;
pub use synth::Ladder;
pub use template::Leaf;

/// Builds and renders the unit for `catalog`.
pub fn generate(catalog: &AxisCatalog) -> Result<String> {
    Emitter::new(catalog).emit()?.render()
}
