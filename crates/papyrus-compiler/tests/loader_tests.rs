//! Loader behavior: search order, caching, cyclic imports, teardown.

mod common;

use std::path::PathBuf;
use std::rc::Rc;

use papyrus_core::config::CompilerConfig;
use papyrus_core::diagnostics::Diagnostics;
use papyrus_compiler::loader::ScriptLoader;
use papyrus_compiler::ty::{Ty, TyKind};

use common::{loc, script_with, touch, TestFrontend};

fn loader_with(config: CompilerConfig, frontend: TestFrontend) -> ScriptLoader {
    ScriptLoader::new(Rc::new(config), Box::new(frontend))
}

#[test]
fn missing_script_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let mut loader = loader_with(CompilerConfig::default(), TestFrontend::new());
    let mut diags = Diagnostics::new();

    let result = loader.load_script("Nothing", dir.path(), &mut diags).unwrap();
    assert!(result.is_none());
}

#[test]
fn extensions_probe_psc_then_pas_then_pex() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "A.pas");
    touch(dir.path(), "A.pex");

    let frontend = TestFrontend::new().with_script("a", |p| script_with(p, "A", &[], &[]));
    let log = frontend.log();
    let mut loader = loader_with(CompilerConfig::default(), frontend);
    let mut diags = Diagnostics::new();

    loader.load_script("A", dir.path(), &mut diags).unwrap().unwrap();
    assert_eq!(log.kinds(), vec!["pas"]);
}

#[test]
fn source_wins_over_assembly() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "A.psc");
    touch(dir.path(), "A.pas");

    let frontend = TestFrontend::new().with_script("a", |p| script_with(p, "A", &[], &[]));
    let log = frontend.log();
    let mut loader = loader_with(CompilerConfig::default(), frontend);
    let mut diags = Diagnostics::new();

    loader.load_script("A", dir.path(), &mut diags).unwrap().unwrap();
    assert_eq!(log.kinds(), vec!["psc"]);
}

#[test]
fn loading_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "A.psc");

    let frontend = TestFrontend::new().with_script("a", |p| script_with(p, "A", &[], &[]));
    let log = frontend.log();
    let mut loader = loader_with(CompilerConfig::default(), frontend);
    let mut diags = Diagnostics::new();

    let first = loader.load_script("A", dir.path(), &mut diags).unwrap().unwrap();
    let second = loader.load_script("a", dir.path(), &mut diags).unwrap().unwrap();

    assert!(Rc::ptr_eq(&first, &second));
    // The second lookup came from the per-directory cache.
    assert_eq!(log.kinds(), vec!["psc"]);
    assert_eq!(loader.loaded_count(), 1);
}

#[test]
fn import_directories_are_searched_in_order() {
    let base = tempfile::tempdir().unwrap();
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    touch(first.path(), "Util.psc");
    touch(second.path(), "Util.psc");

    let frontend = TestFrontend::new().with_script("util", |p| script_with(p, "Util", &[], &[]));
    let log = frontend.log();
    let config = CompilerConfig {
        import_directories: vec![first.path().to_path_buf(), second.path().to_path_buf()],
        ..CompilerConfig::default()
    };
    let mut loader = loader_with(config, frontend);
    let mut diags = Diagnostics::new();

    loader.load_script("Util", base.path(), &mut diags).unwrap().unwrap();

    let calls = log.calls();
    assert_eq!(calls.len(), 1);
    let loaded_from = PathBuf::from(&calls[0].1);
    assert_eq!(loaded_from.parent().unwrap(), first.path());
}

#[test]
fn colon_names_reach_subdirectories() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("Lib")).unwrap();
    touch(&dir.path().join("Lib"), "Helper.psc");

    let frontend = TestFrontend::new().with_script("helper", |p| script_with(p, "Helper", &[], &[]));
    let mut loader = loader_with(CompilerConfig::default(), frontend);
    let mut diags = Diagnostics::new();

    let script = loader.load_script("Lib:Helper", dir.path(), &mut diags).unwrap();
    assert!(script.is_some());
}

#[test]
fn cyclic_imports_resolve_through_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "A.psc");
    touch(dir.path(), "B.psc");

    let frontend = TestFrontend::new()
        .with_script("a", |p| {
            script_with(p, "A", &["B"], &[Ty::unresolved(loc("A.psc"), "B")])
        })
        .with_script("b", |p| {
            script_with(p, "B", &["A"], &[Ty::unresolved(loc("B.psc"), "A")])
        });
    let mut loader = loader_with(CompilerConfig::default(), frontend);
    let mut diags = Diagnostics::new();

    let a = loader.load_script("A", dir.path(), &mut diags).unwrap().unwrap();
    let b = loader.load_script("B", dir.path(), &mut diags).unwrap().unwrap();

    assert_eq!(diags.error_count(), 0);
    assert_eq!(loader.loaded_count(), 2);

    // A's variable resolved to B's object and vice versa.
    let a_var = a.objects[0].variables[0].ty.borrow().clone();
    match a_var.kind {
        TyKind::Object(ref obj) => assert!(Rc::ptr_eq(obj, &b.objects[0])),
        other => panic!("A's variable should resolve to B, got {:?}", other),
    }
    let b_var = b.objects[0].variables[0].ty.borrow().clone();
    match b_var.kind {
        TyKind::Object(ref obj) => assert!(Rc::ptr_eq(obj, &a.objects[0])),
        other => panic!("B's variable should resolve to A, got {:?}", other),
    }
}

#[test]
fn duplicate_import_warns_w4002_once() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "C.psc");
    touch(dir.path(), "Util.psc");

    let frontend = TestFrontend::new()
        .with_script("c", |p| script_with(p, "C", &["Util", "util"], &[]))
        .with_script("util", |p| script_with(p, "Util", &[], &[]));
    let mut loader = loader_with(CompilerConfig::default(), frontend);
    let mut diags = Diagnostics::new();

    loader.load_script("C", dir.path(), &mut diags).unwrap().unwrap();

    assert_eq!(diags.error_count(), 0);
    assert_eq!(diags.warning_count(), 1);
    let rendered = format!("{}", diags.reports()[0]);
    assert!(rendered.contains("W4002"), "unexpected report: {}", rendered);
}

#[test]
fn failed_reference_semantic_tears_down_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "D.psc");

    let frontend = TestFrontend::new().with_script("d", |p| {
        script_with(p, "D", &[], &[Ty::unresolved(loc("D.psc"), "NoSuchType")])
    });
    let mut loader = loader_with(CompilerConfig::default(), frontend);
    let mut diags = Diagnostics::new();

    let result = loader.load_script("D", dir.path(), &mut diags);
    assert!(result.is_err());
    assert_eq!(loader.loaded_count(), 0);
}

#[test]
fn assembly_scripts_resolve_decompiled_struct_names() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "W.pas");
    touch(dir.path(), "Other.psc");

    let frontend = TestFrontend::new()
        .with_script("w", |p| {
            script_with(p, "W", &[], &[Ty::unresolved(loc("W.pas"), "Other#Pos")])
        })
        .with_script("other", |p| {
            let mut script = script_with(p, "Other", &[], &[]);
            let object = Rc::get_mut(&mut script.objects[0]).unwrap();
            object.structs.push(Rc::new(
                papyrus_compiler::ast::StructDef::new(loc("Other.psc"), "Pos"),
            ));
            script
        });
    let mut loader = loader_with(CompilerConfig::default(), frontend);
    let mut diags = Diagnostics::new();

    let w = loader.load_script("W", dir.path(), &mut diags).unwrap().unwrap();
    let var_ty = w.objects[0].variables[0].ty.borrow().clone();
    match var_ty.kind {
        TyKind::Struct(ref s) => assert_eq!(s.name, "Pos"),
        other => panic!("expected the decompiled struct ref to resolve, got {:?}", other),
    }
}
