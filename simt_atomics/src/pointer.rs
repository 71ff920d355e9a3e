//! Atomic pointer arithmetic.
//!
//! The pointer is treated as a 64-bit integer: the element offset is negated
//! for `fetch_sub`, scaled by the element size and then added with the 64-bit
//! `add` leaves, so pointer entries share their leaves with `fetch_add` on
//! 64-bit integers.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::catalog::{NativeRmw, Operation, PointerOp, Scope, Width};
use crate::emit::dispatch;
use crate::entry::GenerationEntry;
use crate::error::Result;
use crate::synth::Ladder;

pub fn ladder(op: PointerOp, scope: Scope) -> Result<Ladder> {
    Ladder::for_rmw(Operation::Pointer(op), scope, Width::W64, NativeRmw::Add)
}

/// Byte delta added to the stored address for an offset of `elements`.
/// Wraps modulo 2^64 like the emitted code.
pub fn byte_delta(op: PointerOp, elements: i64, elem_size: u64) -> u64 {
    let mut delta = elements as u64;
    if op.negates_operand() {
        delta = delta.wrapping_neg();
    }
    delta.wrapping_mul(elem_size)
}

pub(crate) fn entry_item(entry: &GenerationEntry, op: PointerOp) -> TokenStream {
    let name = format_ident!("{}", entry.name());
    let doc = format!(
        "Atomic pointer `{}` by `val` elements at {} scope, returning the previous pointer.",
        op.name(),
        entry.scope
    );
    let negate = op.negates_operand().then(|| quote!(tmp = tmp.wrapping_neg();));
    let body = dispatch(quote!(memorder), &entry.ladder, |leaf| {
        let leaf = leaf.ident();
        quote!(tmp = unsafe { #leaf(ptr, tmp) };)
    });
    quote! {
        #[doc = #doc]
        #[inline]
        pub unsafe fn #name<T>(ptr: *mut *mut T, val: isize, memorder: i32) -> *mut T {
            let ptr = ptr.cast::<u64>();
            let mut tmp = val as u64;
            #negate
            tmp = tmp.wrapping_mul(core::mem::size_of::<T>() as u64);
            #body
            tmp as usize as *mut T
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AxisCatalog;
    use crate::entry::EntryTable;
    use crate::ordering::MemoryOrder;

    #[test]
    fn pointer_ladder_reuses_64_bit_add() {
        let table = EntryTable::build(&AxisCatalog::standard()).unwrap();
        for scope in Scope::ALL {
            let pointer = table.get(scope, Operation::Pointer(PointerOp::FetchSub), None).unwrap();
            let integer = table
                .get(scope, Operation::Rmw(crate::catalog::RmwOp::FetchAdd), Some(Width::W64))
                .unwrap();
            assert_eq!(pointer.leaves(), integer.leaves());
        }
    }

    #[test]
    fn byte_delta_scales_and_negates() {
        assert_eq!(byte_delta(PointerOp::FetchAdd, 3, 8), 24);
        assert_eq!(byte_delta(PointerOp::FetchSub, 3, 8), 24u64.wrapping_neg());
        assert_eq!(byte_delta(PointerOp::FetchAdd, -1, 4), 4u64.wrapping_neg());
        assert_eq!(byte_delta(PointerOp::FetchSub, -2, 16), 32);
        assert_eq!(byte_delta(PointerOp::FetchAdd, 5, 0), 0);
    }

    #[test]
    fn pointer_entry_scales_before_dispatch() {
        let operation = Operation::Pointer(PointerOp::FetchSub);
        let entry = GenerationEntry::new(Scope::System, operation, None).unwrap();
        let item: syn::ItemFn = syn::parse2(entry_item(&entry, PointerOp::FetchSub)).unwrap();
        assert_eq!(item.sig.ident, "atomic_fetch_sub_ptr_system");
        assert_eq!(item.sig.inputs.len(), 3);

        let text = quote!(#item).to_string();
        let negate = text.find("wrapping_neg").unwrap();
        let scale = text.find("wrapping_mul").unwrap();
        let dispatch = text.find("match memorder").unwrap();
        assert!(negate < scale && scale < dispatch);
        assert!(text.contains("simt_add_acq_rel_64_system"));
    }

    #[test]
    fn pointer_entries_accept_every_order() {
        let ladder = ladder(PointerOp::FetchAdd, Scope::Block).unwrap();
        assert!(MemoryOrder::ALL.iter().all(|order| ladder.accepts(*order)));
    }
}
