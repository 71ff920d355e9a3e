use std::collections::HashSet;

use quote::ToTokens;
use simt_atomics::{AxisCatalog, EntryTable, MemoryOrder, generate};
use syn::{Expr, ExprMatch, Item, ItemFn, Pat, Stmt, Visibility};

fn parsed() -> syn::File {
    let text = generate(&AxisCatalog::standard()).expect("standard catalog renders");
    syn::parse_file(&text).expect("rendered unit parses")
}

fn functions(file: &syn::File) -> impl Iterator<Item = &ItemFn> {
    file.items.iter().filter_map(|item| match item {
        Item::Fn(f) => Some(f),
        _ => None,
    })
}

fn is_pub(f: &ItemFn) -> bool {
    matches!(f.vis, Visibility::Public(_))
}

fn dispatch_match(f: &ItemFn) -> &ExprMatch {
    f.block
        .stmts
        .iter()
        .find_map(|stmt| match stmt {
            Stmt::Expr(Expr::Match(m), _) => Some(m),
            _ => None,
        })
        .unwrap_or_else(|| panic!("{} has no dispatch match", f.sig.ident))
}

fn calls_trap(expr: &Expr) -> bool {
    match expr {
        Expr::Call(call) => {
            matches!(&*call.func, Expr::Path(p) if p.path.is_ident("invalid_memorder"))
        }
        _ => false,
    }
}

#[test]
fn entry_points_match_the_table_in_order() {
    let file = parsed();
    let table = EntryTable::build(&AxisCatalog::standard()).unwrap();
    let emitted: Vec<String> = functions(&file)
        .filter(|f| is_pub(f))
        .map(|f| f.sig.ident.to_string())
        .collect();
    let expected: Vec<String> = table.iter().map(|e| e.name()).collect();
    assert_eq!(emitted.len(), 75);
    assert_eq!(emitted, expected);
}

#[test]
fn every_dispatch_ends_in_a_trap() {
    let file = parsed();
    for f in functions(&file).filter(|f| is_pub(f)) {
        let dispatch = dispatch_match(f);
        let last = dispatch.arms.last().unwrap();
        assert!(matches!(last.pat, Pat::Wild(_)), "{}", f.sig.ident);
        assert!(calls_trap(&last.body), "{}", f.sig.ident);
    }
}

#[test]
fn leaves_are_private_and_unique() {
    let file = parsed();
    let mut seen = HashSet::new();
    for f in functions(&file).filter(|f| !is_pub(f)) {
        assert!(seen.insert(f.sig.ident.to_string()), "{} emitted twice", f.sig.ident);
    }
    assert!(seen.contains("simt_cas_acq_rel_64_system"));
    assert!(seen.contains("simt_load_relaxed_8_block"));
    assert!(seen.contains("invalid_memorder"));
}

#[test]
fn loads_never_match_release_and_stores_never_match_acquire() {
    let file = parsed();
    for f in functions(&file).filter(|f| is_pub(f)) {
        let name = f.sig.ident.to_string();
        let patterns: String = dispatch_match(f)
            .arms
            .iter()
            .map(|arm| arm.pat.to_token_stream().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        if name.starts_with("atomic_load_") {
            assert!(!patterns.contains("RELEASE") && !patterns.contains("ACQ_REL"), "{name}");
        }
        if name.starts_with("atomic_store_") {
            assert!(!patterns.contains("ACQUIRE") && !patterns.contains("CONSUME"), "{name}");
            assert!(!patterns.contains("ACQ_REL"), "{name}");
        }
    }
}

#[test]
fn stronger_memorder_covers_every_pair() {
    let file = parsed();
    let f = functions(&file)
        .find(|f| f.sig.ident == "stronger_memorder")
        .unwrap();
    let dispatch = dispatch_match(f);
    let n = MemoryOrder::ALL.len();
    assert_eq!(dispatch.arms.len(), n * n + 1);

    let first = dispatch.arms[0].pat.to_token_stream().to_string();
    assert_eq!(first.matches("RELAXED").count(), 2, "{first}");
}

#[test]
fn memorder_constants_use_the_runtime_numbering() {
    let file = parsed();
    let module = file
        .items
        .iter()
        .find_map(|item| match item {
            Item::Mod(m) if m.ident == "memorder" => Some(m),
            _ => None,
        })
        .unwrap();
    let (_, items) = module.content.as_ref().unwrap();
    assert_eq!(items.len(), MemoryOrder::ALL.len());
    for (item, order) in items.iter().zip(MemoryOrder::ALL) {
        let Item::Const(c) = item else { panic!("not a const") };
        assert_eq!(c.ident, order.const_name());
        assert_eq!(c.expr.to_token_stream().to_string(), order.raw().to_string());
    }
}

#[test]
fn rendering_is_deterministic() {
    let catalog = AxisCatalog::standard();
    assert_eq!(generate(&catalog).unwrap(), generate(&catalog).unwrap());
}

#[test]
fn reduced_catalog_only_emits_what_it_names() {
    let mut catalog = AxisCatalog::standard();
    catalog.rmw_ops.clear();
    catalog.pointer_ops.clear();
    let text = generate(&catalog).unwrap();
    let file = syn::parse_file(&text).unwrap();
    let names: Vec<String> = functions(&file)
        .filter(|f| is_pub(f))
        .map(|f| f.sig.ident.to_string())
        .collect();
    assert_eq!(names.len(), 3 * (1 + 4 + 4));
    assert!(!text.contains("simt_add_"));
    assert!(names.iter().all(|n| !n.contains("fetch")));
}
