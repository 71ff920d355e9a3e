//! Walks the entry table and turns it into one Rust source unit.
//!
//! Layout of the unit: the prelude (memory order constants, the trap, the
//! carrier copy helpers and the compare-and-swap order table), then for every
//! entry the leaves it needs that were not emitted yet followed by the entry
//! itself.

use std::collections::HashSet;

use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};
use tracing::{debug, info};

use crate::catalog::{AxisCatalog, Operation, RmwOp, Width};
use crate::entry::{EntryTable, GenerationEntry};
use crate::error::{Error, Result};
use crate::ordering::MemoryOrder;
use crate::pointer;
use crate::synth::Ladder;
use crate::template::Leaf;

const HEADER: &str = "\
// @generated by simt_atomics_gen. Do not edit.
//
// Scoped PTX atomics. Include from an nvptx64 crate that enables
// `#![feature(asm_experimental_arch)]`.

";

pub struct Emitter<'a> {
    catalog: &'a AxisCatalog,
}

/// The emitted unit before rendering, with the table it was built from.
pub struct GeneratedUnit {
    table: EntryTable,
    items: Vec<TokenStream>,
    leaf_count: usize,
}

impl<'a> Emitter<'a> {
    pub fn new(catalog: &'a AxisCatalog) -> Self {
        Self { catalog }
    }

    pub fn emit(&self) -> Result<GeneratedUnit> {
        let table = EntryTable::build(self.catalog)?;
        let with_cas = table.iter().any(GenerationEntry::dispatches_on_pair);
        let mut items = prelude(with_cas);
        let mut emitted: HashSet<Leaf> = HashSet::new();

        for entry in table.iter() {
            let mut fresh = 0;
            for leaf in entry.leaves() {
                if emitted.insert(leaf) {
                    items.push(leaf.item());
                    fresh += 1;
                }
            }
            items.push(entry_item(entry)?);
            debug!(entry = %entry.name(), fresh_leaves = fresh, "emitted entry");
        }

        info!(
            entries = table.len(),
            leaves = emitted.len(),
            "generated scoped atomic table"
        );
        Ok(GeneratedUnit {
            table,
            items,
            leaf_count: emitted.len(),
        })
    }
}

impl GeneratedUnit {
    pub fn table(&self) -> &EntryTable {
        &self.table
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Source text of the unit. Fails if the text does not parse as a Rust
    /// file, which would mean a template is broken.
    pub fn render(&self) -> Result<String> {
        let mut out = String::from(HEADER);
        for item in &self.items {
            out.push_str(&item.to_string());
            out.push_str("\n\n");
        }
        syn::parse_file(&out).map_err(|e| Error::MalformedUnit(e.to_string()))?;
        Ok(out)
    }
}

fn order_path(order: MemoryOrder) -> TokenStream {
    let name = format_ident!("{}", order.const_name());
    quote!(memorder::#name)
}

/// `stronger_memorder` is only needed, and only emitted, alongside a
/// compare-and-swap entry.
fn prelude(with_cas: bool) -> Vec<TokenStream> {
    let consts = MemoryOrder::ALL.iter().map(|order| {
        let name = format_ident!("{}", order.const_name());
        let raw = Literal::i32_unsuffixed(order.raw());
        quote!(pub const #name: i32 = #raw;)
    });

    let mut pairs = Vec::new();
    for success in MemoryOrder::ALL {
        for failure in MemoryOrder::ALL {
            let (s, f) = (order_path(success), order_path(failure));
            let combined = order_path(MemoryOrder::stronger(success, failure));
            pairs.push(quote!((#s, #f) => #combined,));
        }
    }

    let mut items = vec![
        quote! {
            /// Memory order values every entry point takes. Anything else traps.
            pub mod memorder {
                #(#consts)*
            }
        },
        quote! {
            #[cold]
            #[inline(never)]
            fn invalid_memorder() -> ! {
                unsafe { core::arch::asm!("trap;", options(noreturn, nostack)) }
            }
        },
        quote! {
            #[inline(always)]
            unsafe fn to_carrier<T: Copy, C: Copy + Default>(val: &T) -> C {
                let mut carrier = C::default();
                unsafe {
                    core::ptr::copy_nonoverlapping(
                        val as *const T as *const u8,
                        &mut carrier as *mut C as *mut u8,
                        core::mem::size_of::<T>(),
                    )
                };
                carrier
            }
        },
        quote! {
            #[inline(always)]
            unsafe fn from_carrier<C: Copy, T: Copy>(carrier: &C) -> T {
                let mut val = core::mem::MaybeUninit::<T>::uninit();
                unsafe {
                    core::ptr::copy_nonoverlapping(
                        carrier as *const C as *const u8,
                        val.as_mut_ptr() as *mut u8,
                        core::mem::size_of::<T>(),
                    );
                    val.assume_init()
                }
            }
        },
    ];
    if with_cas {
        items.push(quote! {
            /// The single order a compare-and-swap runs with: the weakest order at
            /// least as strong as both the success and the failure order.
            #[inline]
            fn stronger_memorder(success: i32, failure: i32) -> i32 {
                match (success, failure) {
                    #(#pairs)*
                    _ => invalid_memorder(),
                }
            }
        });
    }
    items
}

/// The escalation `match` for one ladder. Fences are called directly;
/// `call` renders the statement for every other leaf.
pub(crate) fn dispatch(
    selector: TokenStream,
    ladder: &Ladder,
    call: impl Fn(&Leaf) -> TokenStream,
) -> TokenStream {
    let arms = ladder.arms().into_iter().map(|arm| {
        let patterns = arm.orders.iter().map(|order| order_path(*order));
        let steps = arm.plan.iter().map(|leaf| {
            if leaf.is_fence() {
                let fence = leaf.ident();
                quote!(unsafe { #fence() };)
            } else {
                call(leaf)
            }
        });
        quote! {
            #(#patterns)|* => {
                #(#steps)*
            }
        }
    });
    quote! {
        match #selector {
            #(#arms)*
            _ => invalid_memorder(),
        }
    }
}

fn entry_item(entry: &GenerationEntry) -> Result<TokenStream> {
    let needs_width = || Error::MalformedUnit(format!("{} has no width", entry.name()));
    let item = match entry.operation {
        Operation::Fence => fence_entry(entry),
        Operation::Load => load_entry(entry, entry.width.ok_or_else(needs_width)?),
        Operation::Store => store_entry(entry, entry.width.ok_or_else(needs_width)?),
        Operation::Rmw(RmwOp::CompareExchange) => {
            cas_entry(entry, entry.width.ok_or_else(needs_width)?)
        }
        Operation::Rmw(op) => rmw_entry(entry, op, entry.width.ok_or_else(needs_width)?),
        Operation::Pointer(op) => pointer::entry_item(entry, op),
    };
    Ok(item)
}

fn size_check(width: Width) -> TokenStream {
    let bytes = Literal::usize_unsuffixed(width.bytes());
    quote!(const { assert!(core::mem::size_of::<T>() == #bytes) };)
}

fn width_types(width: Width) -> (proc_macro2::Ident, proc_macro2::Ident) {
    (
        format_ident!("{}", width.memory_type()),
        format_ident!("{}", width.register_class().carrier()),
    )
}

fn fence_entry(entry: &GenerationEntry) -> TokenStream {
    let name = format_ident!("{}", entry.name());
    let doc = format!("Thread fence at {} scope.", entry.scope);
    let body = dispatch(quote!(memorder), &entry.ladder, |_| TokenStream::new());
    quote! {
        #[doc = #doc]
        #[inline]
        pub fn #name(memorder: i32) {
            #body
        }
    }
}

fn load_entry(entry: &GenerationEntry, width: Width) -> TokenStream {
    let name = format_ident!("{}", entry.name());
    let doc = format!("Atomic {width}-bit load at {} scope.", entry.scope);
    let (mem, carrier) = width_types(width);
    let check = size_check(width);
    let body = dispatch(quote!(memorder), &entry.ladder, |leaf| {
        let leaf = leaf.ident();
        quote!(tmp = unsafe { #leaf(ptr) };)
    });
    quote! {
        #[doc = #doc]
        #[inline]
        pub unsafe fn #name<T: Copy>(ptr: *const T, memorder: i32) -> T {
            #check
            let ptr = ptr.cast::<#mem>();
            let tmp: #carrier;
            #body
            unsafe { from_carrier(&tmp) }
        }
    }
}

fn store_entry(entry: &GenerationEntry, width: Width) -> TokenStream {
    let name = format_ident!("{}", entry.name());
    let doc = format!("Atomic {width}-bit store at {} scope.", entry.scope);
    let (mem, carrier) = width_types(width);
    let check = size_check(width);
    let body = dispatch(quote!(memorder), &entry.ladder, |leaf| {
        let leaf = leaf.ident();
        quote!(unsafe { #leaf(ptr, tmp) };)
    });
    quote! {
        #[doc = #doc]
        #[inline]
        pub unsafe fn #name<T: Copy>(ptr: *mut T, val: T, memorder: i32) {
            #check
            let ptr = ptr.cast::<#mem>();
            let tmp: #carrier = unsafe { to_carrier(&val) };
            #body
        }
    }
}

fn rmw_entry(entry: &GenerationEntry, op: RmwOp, width: Width) -> TokenStream {
    let name = format_ident!("{}", entry.name());
    let doc = format!(
        "Atomic {width}-bit `{}` at {} scope, returning the previous value.",
        op.name(),
        entry.scope
    );
    let (mem, carrier) = width_types(width);
    let check = size_check(width);
    let negate = op.negates_operand().then(|| quote!(tmp = tmp.wrapping_neg();));
    let body = dispatch(quote!(memorder), &entry.ladder, |leaf| {
        let leaf = leaf.ident();
        quote!(tmp = unsafe { #leaf(ptr, tmp) };)
    });
    quote! {
        #[doc = #doc]
        #[inline]
        pub unsafe fn #name<T: Copy>(ptr: *mut T, val: T, memorder: i32) -> T {
            #check
            let ptr = ptr.cast::<#mem>();
            let mut tmp: #carrier = unsafe { to_carrier(&val) };
            #negate
            #body
            unsafe { from_carrier(&tmp) }
        }
    }
}

fn cas_entry(entry: &GenerationEntry, width: Width) -> TokenStream {
    let name = format_ident!("{}", entry.name());
    let doc = format!(
        "Atomic {width}-bit compare-and-swap at {} scope. On failure `expected` \
         receives the value found in memory.",
        entry.scope
    );
    let (mem, carrier) = width_types(width);
    let check = size_check(width);
    let body = dispatch(quote!(stronger_memorder(success, failure)), &entry.ladder, |leaf| {
        let leaf = leaf.ident();
        quote!(old = unsafe { #leaf(ptr, cmp, tmp) };)
    });
    quote! {
        #[doc = #doc]
        #[inline]
        pub unsafe fn #name<T: Copy>(
            ptr: *mut T,
            expected: &mut T,
            desired: T,
            success: i32,
            failure: i32,
        ) -> bool {
            #check
            let ptr = ptr.cast::<#mem>();
            let tmp: #carrier = unsafe { to_carrier(&desired) };
            let cmp: #carrier = unsafe { to_carrier(&*expected) };
            let old: #carrier;
            #body
            let ret = old == cmp;
            if !ret {
                *expected = unsafe { from_carrier(&old) };
            }
            ret
        }
    }
}
