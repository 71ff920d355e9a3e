//! The finite axes the table is generated over, with the PTX metadata each
//! axis value carries.

use core::fmt;

use crate::error::{Error, Result};

/// Set of threads across which an atomic operation's guarantee applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Block,
    Device,
    System,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Block, Scope::Device, Scope::System];

    pub fn name(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Device => "device",
            Self::System => "system",
        }
    }

    /// PTX `.scope` qualifier.
    pub fn qualifier(self) -> &'static str {
        match self {
            Self::Block => "cta",
            Self::Device => "gpu",
            Self::System => "sys",
        }
    }

    pub fn fence_instruction(self, strength: FenceStrength) -> String {
        format!("fence.{}.{};", strength.qualifier(), self.qualifier())
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FenceStrength {
    SeqCst,
    AcqRel,
}

impl FenceStrength {
    pub const ALL: [FenceStrength; 2] = [FenceStrength::SeqCst, FenceStrength::AcqRel];

    pub fn qualifier(self) -> &'static str {
        match self {
            Self::SeqCst => "sc",
            Self::AcqRel => "acq_rel",
        }
    }
}

/// `asm!` register class used to move an operand of a given width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegisterClass {
    Reg16,
    Reg32,
    Reg64,
}

impl RegisterClass {
    pub fn asm_class(self) -> &'static str {
        match self {
            Self::Reg16 => "reg16",
            Self::Reg32 => "reg32",
            Self::Reg64 => "reg64",
        }
    }

    /// Integer type the value lives in while it sits in a register.
    pub fn carrier(self) -> &'static str {
        match self {
            Self::Reg16 => "u16",
            Self::Reg32 => "u32",
            Self::Reg64 => "u64",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    pub const ALL: [Width; 4] = [Width::W8, Width::W16, Width::W32, Width::W64];

    pub fn bits(self) -> u32 {
        match self {
            Self::W8 => 8,
            Self::W16 => 16,
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }

    pub fn bytes(self) -> usize {
        self.bits() as usize / 8
    }

    /// There is no 8-bit register class; bytes travel in a 32-bit register.
    pub fn register_class(self) -> RegisterClass {
        match self {
            Self::W8 | Self::W32 => RegisterClass::Reg32,
            Self::W16 => RegisterClass::Reg16,
            Self::W64 => RegisterClass::Reg64,
        }
    }

    /// Type of the value in memory.
    pub fn memory_type(self) -> &'static str {
        match self {
            Self::W8 => "u8",
            Self::W16 => "u16",
            Self::W32 => "u32",
            Self::W64 => "u64",
        }
    }

    pub fn supports_rmw(self) -> bool {
        matches!(self, Self::W32 | Self::W64)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Read-modify-write instructions the hardware actually has.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativeRmw {
    Exch,
    Cas,
    Add,
    And,
    Or,
    Xor,
}

impl NativeRmw {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Exch => "exch",
            Self::Cas => "cas",
            Self::Add => "add",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
        }
    }

    /// `add` is typed arithmetic; everything else works on raw bits.
    pub fn type_suffix(self, width: Width) -> String {
        match self {
            Self::Add => format!("u{}", width.bits()),
            _ => format!("b{}", width.bits()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RmwOp {
    Exchange,
    CompareExchange,
    FetchAdd,
    FetchSub,
    FetchAnd,
    FetchOr,
    FetchXor,
}

impl RmwOp {
    pub const ALL: [RmwOp; 7] = [
        RmwOp::Exchange,
        RmwOp::CompareExchange,
        RmwOp::FetchAdd,
        RmwOp::FetchSub,
        RmwOp::FetchAnd,
        RmwOp::FetchOr,
        RmwOp::FetchXor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Exchange => "exchange",
            Self::CompareExchange => "compare_exchange",
            Self::FetchAdd => "fetch_add",
            Self::FetchSub => "fetch_sub",
            Self::FetchAnd => "fetch_and",
            Self::FetchOr => "fetch_or",
            Self::FetchXor => "fetch_xor",
        }
    }

    pub fn native(self) -> NativeRmw {
        match self {
            Self::Exchange => NativeRmw::Exch,
            Self::CompareExchange => NativeRmw::Cas,
            Self::FetchAdd | Self::FetchSub => NativeRmw::Add,
            Self::FetchAnd => NativeRmw::And,
            Self::FetchOr => NativeRmw::Or,
            Self::FetchXor => NativeRmw::Xor,
        }
    }

    /// There is no native subtract; `fetch_sub` adds the negated operand.
    pub fn negates_operand(self) -> bool {
        matches!(self, Self::FetchSub)
    }

    /// `fetch_sub` borrows the `add` leaves instead of owning a template.
    pub fn has_own_template(self) -> bool {
        !self.negates_operand()
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerOp {
    FetchAdd,
    FetchSub,
}

impl PointerOp {
    pub const ALL: [PointerOp; 2] = [PointerOp::FetchAdd, PointerOp::FetchSub];

    pub fn name(self) -> &'static str {
        match self {
            Self::FetchAdd => "fetch_add",
            Self::FetchSub => "fetch_sub",
        }
    }

    pub fn negates_operand(self) -> bool {
        matches!(self, Self::FetchSub)
    }
}

/// Kind of a generated entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Fence,
    Load,
    Store,
    Rmw(RmwOp),
    Pointer(PointerOp),
}

impl Operation {
    pub const COUNT: usize = 3 + RmwOp::ALL.len() + PointerOp::ALL.len();

    pub fn name(self) -> &'static str {
        match self {
            Self::Fence => "thread_fence",
            Self::Load => "load",
            Self::Store => "store",
            Self::Rmw(op) => op.name(),
            Self::Pointer(op) => op.name(),
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Fence => 0,
            Self::Load => 1,
            Self::Store => 2,
            Self::Rmw(op) => 3 + op.index(),
            Self::Pointer(PointerOp::FetchAdd) => 3 + RmwOp::ALL.len(),
            Self::Pointer(PointerOp::FetchSub) => 4 + RmwOp::ALL.len(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pointer(op) => write!(f, "pointer {}", op.name()),
            other => f.write_str(other.name()),
        }
    }
}

/// Literal axis data the generator walks.
///
/// Every list is walked in the order given here, which is what makes the
/// emitted unit deterministic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AxisCatalog {
    pub scopes: Vec<Scope>,
    pub load_widths: Vec<Width>,
    pub store_widths: Vec<Width>,
    pub rmw_widths: Vec<Width>,
    pub rmw_ops: Vec<RmwOp>,
    pub pointer_ops: Vec<PointerOp>,
}

impl Default for AxisCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl AxisCatalog {
    pub fn standard() -> Self {
        Self {
            scopes: Scope::ALL.to_vec(),
            load_widths: Width::ALL.to_vec(),
            store_widths: Width::ALL.to_vec(),
            rmw_widths: vec![Width::W32, Width::W64],
            rmw_ops: RmwOp::ALL.to_vec(),
            pointer_ops: PointerOp::ALL.to_vec(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(width) = self.rmw_widths.iter().find(|w| !w.supports_rmw()) {
            return Err(Error::InvalidCatalog(format!(
                "{width}-bit operands have no native read-modify-write"
            )));
        }
        has_no_repeats("scopes", &self.scopes)?;
        has_no_repeats("load widths", &self.load_widths)?;
        has_no_repeats("store widths", &self.store_widths)?;
        has_no_repeats("rmw widths", &self.rmw_widths)?;
        has_no_repeats("rmw operations", &self.rmw_ops)?;
        has_no_repeats("pointer operations", &self.pointer_ops)?;
        Ok(())
    }

    /// Width slots an operation is generated for. `None` is the slot of
    /// operations without a width axis.
    pub fn widths_for(&self, operation: Operation) -> Vec<Option<Width>> {
        match operation {
            Operation::Fence | Operation::Pointer(_) => vec![None],
            Operation::Load => self.load_widths.iter().copied().map(Some).collect(),
            Operation::Store => self.store_widths.iter().copied().map(Some).collect(),
            Operation::Rmw(_) => self.rmw_widths.iter().copied().map(Some).collect(),
        }
    }

    /// Operations in emission order.
    pub fn operations(&self) -> Vec<Operation> {
        let mut ops = vec![Operation::Fence, Operation::Load, Operation::Store];
        ops.extend(self.rmw_ops.iter().copied().map(Operation::Rmw));
        ops.extend(self.pointer_ops.iter().copied().map(Operation::Pointer));
        ops
    }
}

fn has_no_repeats<T: PartialEq + fmt::Debug>(axis: &str, values: &[T]) -> Result<()> {
    for (i, value) in values.iter().enumerate() {
        if values[..i].contains(value) {
            return Err(Error::InvalidCatalog(format!("{axis} list repeats {value:?}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_valid() {
        AxisCatalog::standard().validate().expect("standard catalog");
    }

    #[test]
    fn narrow_rmw_is_rejected() {
        let mut catalog = AxisCatalog::standard();
        catalog.rmw_widths.push(Width::W16);
        assert!(matches!(catalog.validate(), Err(Error::InvalidCatalog(_))));
    }

    #[test]
    fn repeated_scope_is_rejected() {
        let mut catalog = AxisCatalog::standard();
        catalog.scopes.push(Scope::Block);
        assert!(matches!(catalog.validate(), Err(Error::InvalidCatalog(_))));
    }

    #[test]
    fn operation_indices_are_dense() {
        let ops = AxisCatalog::standard().operations();
        assert_eq!(ops.len(), Operation::COUNT);
        for (i, op) in ops.iter().enumerate() {
            assert_eq!(op.index(), i, "{op}");
        }
    }

    #[test]
    fn register_classes_follow_width() {
        assert_eq!(Width::W8.register_class(), RegisterClass::Reg32);
        assert_eq!(Width::W16.register_class(), RegisterClass::Reg16);
        assert_eq!(Width::W32.register_class(), RegisterClass::Reg32);
        assert_eq!(Width::W64.register_class(), RegisterClass::Reg64);
    }

    #[test]
    fn fence_instructions_carry_scope_qualifier() {
        assert_eq!(Scope::Block.fence_instruction(FenceStrength::SeqCst), "fence.sc.cta;");
        assert_eq!(Scope::Device.fence_instruction(FenceStrength::AcqRel), "fence.acq_rel.gpu;");
        assert_eq!(Scope::System.fence_instruction(FenceStrength::SeqCst), "fence.sc.sys;");
    }

    #[test]
    fn fetch_sub_borrows_add() {
        assert_eq!(RmwOp::FetchSub.native(), NativeRmw::Add);
        assert!(!RmwOp::FetchSub.has_own_template());
        assert!(RmwOp::ALL.iter().filter(|op| op.negates_operand()).count() == 1);
        assert_eq!(NativeRmw::Add.type_suffix(Width::W32), "u32");
        assert_eq!(NativeRmw::Cas.type_suffix(Width::W64), "b64");
    }
}
