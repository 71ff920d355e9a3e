//! Host-side execution of dispatch plans.
//!
//! Each function here resolves the runtime order the same way the emitted
//! `match` does and then runs the resulting leaves against a [`LeafMachine`].
//! A fault means the device code would have trapped; nothing was executed.

use num_traits::{PrimInt, WrappingAdd, WrappingNeg};

use crate::catalog::{NativeRmw, Operation, PointerOp, RmwOp};
use crate::entry::GenerationEntry;
use crate::error::SimFault;
use crate::pointer::byte_delta;
use crate::template::Leaf;

/// Something that can execute one leaf at a time.
pub trait LeafMachine<C> {
    /// Runs `leaf` and returns the value the instruction produces: the old
    /// memory contents for accesses, unspecified for fences.
    fn execute(&mut self, leaf: &Leaf, operand: C, compare: C) -> C;
}

/// A single memory word that records every leaf executed against it.
#[derive(Clone, Debug, Default)]
pub struct SimCell<C> {
    value: C,
    trace: Vec<Leaf>,
}

impl<C: PrimInt + WrappingAdd> SimCell<C> {
    pub fn new(value: C) -> Self {
        Self {
            value,
            trace: Vec::new(),
        }
    }

    pub fn value(&self) -> C {
        self.value
    }

    pub fn trace(&self) -> &[Leaf] {
        &self.trace
    }

    pub fn take_trace(&mut self) -> Vec<Leaf> {
        std::mem::take(&mut self.trace)
    }
}

impl<C: PrimInt + WrappingAdd> LeafMachine<C> for SimCell<C> {
    fn execute(&mut self, leaf: &Leaf, operand: C, compare: C) -> C {
        self.trace.push(*leaf);
        let old = self.value;
        match *leaf {
            Leaf::Fence { .. } | Leaf::Load { .. } => {}
            Leaf::Store { .. } => self.value = operand,
            Leaf::Rmw { op, .. } => {
                self.value = match op {
                    NativeRmw::Exch => operand,
                    NativeRmw::Cas if old == compare => operand,
                    NativeRmw::Cas => old,
                    NativeRmw::Add => old.wrapping_add(&operand),
                    NativeRmw::And => old & operand,
                    NativeRmw::Or => old | operand,
                    NativeRmw::Xor => old ^ operand,
                }
            }
        }
        old
    }
}

fn wrong_entry(entry: &GenerationEntry, expected: &'static str) -> SimFault {
    SimFault::WrongEntry {
        entry: entry.name(),
        expected,
    }
}

fn expect_kind(
    entry: &GenerationEntry,
    ok: bool,
    expected: &'static str,
) -> Result<(), SimFault> {
    if ok {
        Ok(())
    } else {
        Err(wrong_entry(entry, expected))
    }
}

/// Runs `plan`, returning what the last non-fence leaf produced.
fn run<C: Copy, M: LeafMachine<C>>(
    machine: &mut M,
    plan: &[Leaf],
    operand: C,
    compare: C,
) -> Option<C> {
    let mut result = None;
    for leaf in plan {
        let value = machine.execute(leaf, operand, compare);
        if !leaf.is_fence() {
            result = Some(value);
        }
    }
    result
}

pub fn thread_fence<C, M>(
    entry: &GenerationEntry,
    machine: &mut M,
    memorder: i32,
) -> Result<(), SimFault>
where
    C: PrimInt,
    M: LeafMachine<C>,
{
    expect_kind(entry, entry.operation == Operation::Fence, "fence")?;
    let plan = entry.ladder.resolve(memorder)?;
    run(machine, &plan, C::zero(), C::zero());
    Ok(())
}

pub fn load<C, M>(entry: &GenerationEntry, machine: &mut M, memorder: i32) -> Result<C, SimFault>
where
    C: PrimInt,
    M: LeafMachine<C>,
{
    expect_kind(entry, entry.operation == Operation::Load, "load")?;
    let plan = entry.ladder.resolve(memorder)?;
    Ok(run(machine, &plan, C::zero(), C::zero()).unwrap_or_else(C::zero))
}

pub fn store<C, M>(
    entry: &GenerationEntry,
    machine: &mut M,
    val: C,
    memorder: i32,
) -> Result<(), SimFault>
where
    C: PrimInt,
    M: LeafMachine<C>,
{
    expect_kind(entry, entry.operation == Operation::Store, "store")?;
    let plan = entry.ladder.resolve(memorder)?;
    run(machine, &plan, val, C::zero());
    Ok(())
}

/// Exchange and the fetch ops. Returns the previous value.
pub fn fetch<C, M>(
    entry: &GenerationEntry,
    machine: &mut M,
    val: C,
    memorder: i32,
) -> Result<C, SimFault>
where
    C: PrimInt + WrappingNeg,
    M: LeafMachine<C>,
{
    let op = match entry.operation {
        Operation::Rmw(op) if op != RmwOp::CompareExchange => op,
        _ => return Err(wrong_entry(entry, "exchange or fetch")),
    };
    let plan = entry.ladder.resolve(memorder)?;
    let operand = if op.negates_operand() {
        val.wrapping_neg()
    } else {
        val
    };
    Ok(run(machine, &plan, operand, C::zero()).unwrap_or_else(C::zero))
}

/// Strong compare-and-swap. On failure `expected` receives the value found
/// in memory; on success it is left alone.
pub fn compare_exchange<C, M>(
    entry: &GenerationEntry,
    machine: &mut M,
    expected: &mut C,
    desired: C,
    success: i32,
    failure: i32,
) -> Result<bool, SimFault>
where
    C: PrimInt,
    M: LeafMachine<C>,
{
    expect_kind(entry, entry.dispatches_on_pair(), "compare_exchange")?;
    let plan = entry.ladder.resolve_pair(success, failure)?;
    let old = run(machine, &plan, desired, *expected).unwrap_or(*expected);
    let swapped = old == *expected;
    if !swapped {
        *expected = old;
    }
    Ok(swapped)
}

/// Pointer `fetch_add`/`fetch_sub` on a cell holding an address. Returns the
/// previous address.
pub fn pointer_fetch<M>(
    entry: &GenerationEntry,
    machine: &mut M,
    elements: i64,
    elem_size: u64,
    memorder: i32,
) -> Result<u64, SimFault>
where
    M: LeafMachine<u64>,
{
    let op: PointerOp = match entry.operation {
        Operation::Pointer(op) => op,
        _ => return Err(wrong_entry(entry, "pointer")),
    };
    let plan = entry.ladder.resolve(memorder)?;
    let delta = byte_delta(op, elements, elem_size);
    Ok(run(machine, &plan, delta, 0).unwrap_or(0))
}
