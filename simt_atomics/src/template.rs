//! Leaf templates: one native PTX instruction per (scope, width, semantics,
//! operation) the hardware supports directly. Leaves never branch and never
//! escalate; stronger orderings are assembled out of them by [`crate::synth`].

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use crate::catalog::{FenceStrength, NativeRmw, Scope, Width};
use crate::error::{Error, Result};
use crate::ordering::{Semantics, Strength};

/// Loads only come in relaxed and acquire flavours.
pub const LOAD_SEMANTICS: [Semantics; 2] = [Semantics::Relaxed, Semantics::Acquire];
/// Stores only come in relaxed and release flavours.
pub const STORE_SEMANTICS: [Semantics; 2] = [Semantics::Relaxed, Semantics::Release];
/// `atom` takes every semantics except sequential consistency.
pub const RMW_SEMANTICS: [Semantics; 4] = Semantics::ALL;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Leaf {
    Fence {
        scope: Scope,
        strength: FenceStrength,
    },
    Load {
        scope: Scope,
        width: Width,
        sem: Semantics,
    },
    Store {
        scope: Scope,
        width: Width,
        sem: Semantics,
    },
    Rmw {
        scope: Scope,
        width: Width,
        sem: Semantics,
        op: NativeRmw,
    },
}

impl Leaf {
    pub fn fence(scope: Scope, strength: FenceStrength) -> Leaf {
        Leaf::Fence { scope, strength }
    }

    pub fn load(scope: Scope, width: Width, sem: Semantics) -> Result<Leaf> {
        if !LOAD_SEMANTICS.contains(&sem) {
            return Err(Error::UnsupportedLeaf {
                kind: "ld",
                sem,
                width,
            });
        }
        Ok(Leaf::Load { scope, width, sem })
    }

    pub fn store(scope: Scope, width: Width, sem: Semantics) -> Result<Leaf> {
        if !STORE_SEMANTICS.contains(&sem) {
            return Err(Error::UnsupportedLeaf {
                kind: "st",
                sem,
                width,
            });
        }
        Ok(Leaf::Store { scope, width, sem })
    }

    pub fn rmw(scope: Scope, width: Width, sem: Semantics, op: NativeRmw) -> Result<Leaf> {
        if !width.supports_rmw() || !RMW_SEMANTICS.contains(&sem) {
            return Err(Error::UnsupportedLeaf {
                kind: op.mnemonic(),
                sem,
                width,
            });
        }
        Ok(Leaf::Rmw {
            scope,
            width,
            sem,
            op,
        })
    }

    /// `None` for fences.
    pub fn semantics(&self) -> Option<Semantics> {
        match *self {
            Leaf::Fence { .. } => None,
            Leaf::Load { sem, .. } | Leaf::Store { sem, .. } | Leaf::Rmw { sem, .. } => Some(sem),
        }
    }

    pub fn is_fence(&self) -> bool {
        matches!(self, Leaf::Fence { .. })
    }

    /// Ordering guarantees executing this leaf contributes.
    pub fn strength(&self) -> Strength {
        match *self {
            Leaf::Fence {
                strength: FenceStrength::SeqCst,
                ..
            } => Strength {
                acquire: true,
                release: true,
                seq_cst: true,
            },
            Leaf::Fence {
                strength: FenceStrength::AcqRel,
                ..
            } => Strength {
                acquire: true,
                release: true,
                seq_cst: false,
            },
            Leaf::Load { sem, .. } | Leaf::Store { sem, .. } | Leaf::Rmw { sem, .. } => {
                sem.strength()
            }
        }
    }

    pub fn symbol(&self) -> String {
        match *self {
            Leaf::Fence { scope, strength } => {
                format!("simt_fence_{}_{}", strength.qualifier(), scope.name())
            }
            Leaf::Load { scope, width, sem } => {
                format!("simt_load_{}_{}_{}", sem.qualifier(), width.bits(), scope.name())
            }
            Leaf::Store { scope, width, sem } => {
                format!("simt_store_{}_{}_{}", sem.qualifier(), width.bits(), scope.name())
            }
            Leaf::Rmw {
                scope,
                width,
                sem,
                op,
            } => format!(
                "simt_{}_{}_{}_{}",
                op.mnemonic(),
                sem.qualifier(),
                width.bits(),
                scope.name()
            ),
        }
    }

    pub fn ident(&self) -> Ident {
        format_ident!("{}", self.symbol())
    }

    /// The `asm!` template string for this leaf.
    pub fn instruction(&self) -> String {
        match *self {
            Leaf::Fence { scope, strength } => scope.fence_instruction(strength),
            Leaf::Load { scope, width, sem } => format!(
                "ld.{}.{}.b{} {{0}}, [{{1}}];",
                sem.qualifier(),
                scope.qualifier(),
                width.bits()
            ),
            Leaf::Store { scope, width, sem } => format!(
                "st.{}.{}.b{} [{{0}}], {{1}};",
                sem.qualifier(),
                scope.qualifier(),
                width.bits()
            ),
            Leaf::Rmw {
                scope,
                width,
                sem,
                op,
            } => {
                let operands = match op {
                    NativeRmw::Cas => "{0}, [{1}], {2}, {3}",
                    _ => "{0}, [{1}], {2}",
                };
                format!(
                    "atom.{}.{}.{}.{} {};",
                    sem.qualifier(),
                    scope.qualifier(),
                    op.mnemonic(),
                    op.type_suffix(width),
                    operands
                )
            }
        }
    }

    /// The leaf as a private `unsafe fn` wrapping exactly one `asm!`.
    pub fn item(&self) -> TokenStream {
        let ident = self.ident();
        let instruction = self.instruction();
        match *self {
            Leaf::Fence { .. } => quote! {
                #[inline(always)]
                unsafe fn #ident() {
                    unsafe { core::arch::asm!(#instruction, options(nostack)) }
                }
            },
            Leaf::Load { width, .. } => {
                let (mem, carrier, reg) = operand_types(width);
                quote! {
                    #[inline(always)]
                    unsafe fn #ident(ptr: *const #mem) -> #carrier {
                        let dst: #carrier;
                        unsafe {
                            core::arch::asm!(
                                #instruction,
                                out(#reg) dst,
                                in(reg64) ptr,
                                options(nostack)
                            )
                        };
                        dst
                    }
                }
            }
            Leaf::Store { width, .. } => {
                let (mem, carrier, reg) = operand_types(width);
                quote! {
                    #[inline(always)]
                    unsafe fn #ident(ptr: *mut #mem, src: #carrier) {
                        unsafe {
                            core::arch::asm!(
                                #instruction,
                                in(reg64) ptr,
                                in(#reg) src,
                                options(nostack)
                            )
                        }
                    }
                }
            }
            Leaf::Rmw {
                width,
                op: NativeRmw::Cas,
                ..
            } => {
                let (mem, carrier, reg) = operand_types(width);
                quote! {
                    #[inline(always)]
                    unsafe fn #ident(ptr: *mut #mem, cmp: #carrier, op: #carrier) -> #carrier {
                        let dst: #carrier;
                        unsafe {
                            core::arch::asm!(
                                #instruction,
                                out(#reg) dst,
                                in(reg64) ptr,
                                in(#reg) cmp,
                                in(#reg) op,
                                options(nostack)
                            )
                        };
                        dst
                    }
                }
            }
            Leaf::Rmw { width, .. } => {
                let (mem, carrier, reg) = operand_types(width);
                quote! {
                    #[inline(always)]
                    unsafe fn #ident(ptr: *mut #mem, op: #carrier) -> #carrier {
                        let dst: #carrier;
                        unsafe {
                            core::arch::asm!(
                                #instruction,
                                out(#reg) dst,
                                in(reg64) ptr,
                                in(#reg) op,
                                options(nostack)
                            )
                        };
                        dst
                    }
                }
            }
        }
    }
}

fn operand_types(width: Width) -> (Ident, Ident, Ident) {
    let class = width.register_class();
    (
        format_ident!("{}", width.memory_type()),
        format_ident!("{}", class.carrier()),
        format_ident!("{}", class.asm_class()),
    )
}
