use super::*;
use crate::graph::DependencyGraph;
use crate::module::{Package, Superclass};

const DIR: &str = "http://host/test-project-dir/";

fn id(name: &str) -> ModuleId {
    ModuleId::new(format!("{}{}", DIR, name))
}

/// file1 imports y from file2 and exports x = y + 2; file3 is a global script
/// exporting the global z; file4 default-exports a class
fn project() -> MemorySourceProvider {
    MemorySourceProvider::new()
        .with(
            &format!("{}file1.js", DIR),
            ModuleSource::new()
                .import("./file2.js", &["y"])
                .export_var("x", Expr::add(Expr::reference("y"), Expr::number(2.0))),
        )
        .with(
            &format!("{}file2.js", DIR),
            ModuleSource::new().export_var("y", Expr::number(1.0)),
        )
        .with(
            &format!("{}file3.js", DIR),
            ModuleSource::global(Some("z"))
                .var("zzz", Expr::number(4.0))
                .set_global("z", Expr::div(Expr::reference("zzz"), Expr::number(2.0))),
        )
        .with(
            &format!("{}file4.js", DIR),
            ModuleSource::new().export_default_class("Foo", None),
        )
        .with(
            &format!("{}a.js", DIR),
            ModuleSource::new()
                .import("./b.js", &["Bar"])
                .export_class("Foo", None),
        )
        .with(
            &format!("{}b.js", DIR),
            ModuleSource::new()
                .import("./a.js", &["Foo"])
                .export_class("Bar", Some("Foo")),
        )
}

fn loader_with(provider: MemorySourceProvider) -> Loader {
    Loader::new("test", Arc::new(ModuleRegistry::new()), Arc::new(provider))
}

#[tokio::test]
async fn test_recorder_exposes_module_state() {
    let loader = loader_with(project());
    let file1 = loader.import(&id("file1.js")).await.unwrap();

    assert_eq!(file1.recorder().get("y"), Some(Value::Number(1.0)));
    assert_eq!(file1.recorder().get("x"), Some(Value::Number(3.0)));
    assert_eq!(file1.state(), ModuleState::Ready);
    assert_eq!(loader.module(&id("file2.js")).state(), ModuleState::Ready);
}

#[tokio::test]
async fn test_redefine_affects_only_named_binding() {
    let loader = loader_with(project());
    let file1 = loader.import(&id("file1.js")).await.unwrap();

    file1.define("y", Value::Number(2.0)).await.unwrap();
    file1.define("newVar", Value::Number(3.0)).await.unwrap();

    assert_eq!(file1.recorder().get("y"), Some(Value::Number(2.0)));
    assert_eq!(file1.recorder().get("newVar"), Some(Value::Number(3.0)));
    assert_eq!(file1.recorder().get("x"), Some(Value::Number(3.0)));
}

#[tokio::test]
async fn test_undefine_survives_later_imports() {
    let loader = loader_with(project());
    let file1 = loader.import(&id("file1.js")).await.unwrap();

    file1.undefine("y").await.unwrap();
    assert_eq!(file1.recorder().get("y"), None);
    assert_eq!(file1.recorder().get("x"), Some(Value::Number(3.0)));

    loader.import(&id("file4.js")).await.unwrap();
    assert_eq!(file1.recorder().get("y"), None);
}

#[tokio::test]
async fn test_class_export_is_recorded() {
    let loader = loader_with(project());
    let file4 = loader.import(&id("file4.js")).await.unwrap();

    let exports = loader.exports(&id("file4.js"));
    assert_eq!(exports.len(), 1);
    let (name, exported) = &exports[0];
    assert_eq!(name, "default");
    assert_eq!(Some(exported.clone()), file4.recorder().get("Foo"));
    assert!(exported.as_class().is_some());
}

#[tokio::test]
async fn test_default_import_as_superclass() {
    let provider = project().with(
        &format!("{}sub.js", DIR),
        ModuleSource::new()
            .import_default("./file4.js", "Base")
            .export_class("Sub", Some("Base")),
    );
    let loader = loader_with(provider);
    let sub = loader.import(&id("sub.js")).await.unwrap();
    let foo = loader.module(&id("file4.js")).recorder().get("Foo").unwrap();
    assert_eq!(sub.recorder().get("Base"), Some(foo.clone()));

    let class = sub.recorder().get("Sub").unwrap();
    let meta = loader.registry().classes().lookup_metadata(class.as_class().unwrap()).unwrap();
    assert_eq!(meta.superclass, Superclass::Resolved(foo));
}

#[tokio::test]
async fn test_global_module_records_local_state() {
    let loader = loader_with(project());
    let file3 = loader.import(&id("file3.js")).await.unwrap();

    assert_eq!(file3.recorder().get("zzz"), Some(Value::Number(4.0)));
    assert_eq!(file3.recorder().get("z"), None);
    assert_eq!(loader.global().get("z"), Some(Value::Number(2.0)));

    let exports = loader.exports(&id("file3.js"));
    assert!(exports.contains(&("z".to_string(), Value::Number(2.0))));
    assert!(exports.contains(&("default".to_string(), Value::Number(2.0))));
}

#[tokio::test]
async fn test_imports_from_global_module() {
    let provider = project()
        .with(
            &format!("{}user.js", DIR),
            ModuleSource::new()
                .import("./file3.js", &["z"])
                .import_default("./file3.js", "half")
                .var("w", Expr::add(Expr::reference("z"), Expr::reference("half"))),
        )
        .with(
            &format!("{}reader.js", DIR),
            ModuleSource::new()
                .import("./file3.js", &[])
                .var("g", Expr::reference("z")),
        );
    let loader = loader_with(provider);

    let user = loader.import(&id("user.js")).await.unwrap();
    assert_eq!(user.recorder().get("w"), Some(Value::Number(4.0)));

    // Unbound names fall back to the loader global
    let reader = loader.import(&id("reader.js")).await.unwrap();
    assert_eq!(reader.recorder().get("g"), Some(Value::Number(2.0)));
}

#[tokio::test]
async fn test_classes_have_module_metadata() {
    let loader = loader_with(project());
    loader
        .registry()
        .register_package(loader.id(), Package::new("test-project-1", None, DIR));
    let file4 = loader.import(&id("file4.js")).await.unwrap();

    let foo = file4.recorder().get("Foo").unwrap();
    let meta = loader.registry().classes().lookup_metadata(foo.as_class().unwrap()).unwrap();
    assert_eq!(meta.superclass, Superclass::Base);
    assert_eq!(meta.module, id("file4.js"));

    let package = meta.package.unwrap();
    assert_eq!(package.name, "test-project-1");
    assert_eq!(package.version, None);
    assert_eq!(package.path_in_package, "./file4.js");
}

#[tokio::test]
async fn test_package_registered_after_load_is_patched_in() {
    let loader = loader_with(project());
    let file4 = loader.import(&id("file4.js")).await.unwrap();
    let foo = file4.recorder().get("Foo").unwrap();
    let classes = loader.registry().classes();

    assert!(classes.lookup_metadata(foo.as_class().unwrap()).unwrap().package.is_none());

    loader
        .registry()
        .register_package(loader.id(), Package::new("test-project-1", Some("0.1.0".into()), DIR));
    let package = classes.lookup_metadata(foo.as_class().unwrap()).unwrap().package.unwrap();
    assert_eq!(package.version.as_deref(), Some("0.1.0"));
}

async fn assert_cyclic_superclass(first: &str, second: &str) {
    let loader = loader_with(project());
    loader.import(&id(first)).await.unwrap();
    loader.import(&id(second)).await.unwrap();

    let a = loader.module(&id("a.js"));
    let b = loader.module(&id("b.js"));
    let foo = a.recorder().get("Foo").unwrap();
    let bar = b.recorder().get("Bar").unwrap();

    let meta = loader.registry().classes().lookup_metadata(bar.as_class().unwrap()).unwrap();
    assert_eq!(meta.superclass, Superclass::Resolved(foo.clone()));
    assert_eq!(meta.module, id("b.js"));

    // Imports missing during the cycle are filled in once it settles
    assert_eq!(b.recorder().get("Foo"), Some(foo));
    assert_eq!(a.recorder().get("Bar"), Some(bar));
}

#[tokio::test]
async fn test_mutually_dependent_modules_a_first() {
    assert_cyclic_superclass("a.js", "b.js").await;
}

#[tokio::test]
async fn test_mutually_dependent_modules_b_first() {
    assert_cyclic_superclass("b.js", "a.js").await;
}

#[tokio::test]
async fn test_superclass_pending_while_cycle_unsettled() {
    let provider = MemorySourceProvider::new()
        .with("/p/a.js", ModuleSource::new().import("./b.js", &[]).class("Foo", None))
        .with(
            "/p/b.js",
            ModuleSource::new()
                .import("./a.js", &["Foo"])
                .class("Bar", Some("Foo")),
        );
    let loader = loader_with(provider);
    let a = loader.module(&ModuleId::new("/p/a.js"));

    // Evaluate b on its own while a is claimed but has not declared Foo yet
    let init = a.begin_initialization().await.unwrap();
    let b = loader.import(&ModuleId::new("/p/b.js")).await.unwrap();
    let bar = b.recorder().get("Bar").unwrap();
    let classes = loader.registry().classes();

    assert_eq!(
        classes.lookup_metadata(bar.as_class().unwrap()).unwrap().superclass,
        Superclass::Pending { module: ModuleId::new("/p/a.js"), name: "Foo".into() }
    );

    let foo = ClassValue::new("Foo");
    init.module().recorder().define("Foo", foo.clone().into()).unwrap();
    init.finish();
    assert_eq!(
        classes.lookup_metadata(bar.as_class().unwrap()).unwrap().superclass.as_class(),
        Some(&foo)
    );
}

#[tokio::test]
async fn test_reevaluation_keeps_old_bindings() {
    let provider = Arc::new(project());
    let loader = Loader::new("test", Arc::new(ModuleRegistry::new()), provider.clone());
    let file2 = loader.import(&id("file2.js")).await.unwrap();
    let recorder = Arc::clone(file2.recorder());

    provider.insert(id("file2.js"), ModuleSource::new().export_var("z", Expr::number(5.0)));
    let again = loader.reevaluate(&id("file2.js")).await.unwrap();

    assert!(Arc::ptr_eq(&file2, &again));
    assert!(Arc::ptr_eq(&recorder, again.recorder()));
    assert_eq!(recorder.get("z"), Some(Value::Number(5.0)));
    assert_eq!(recorder.get("y"), Some(Value::Number(1.0)));
}

#[tokio::test]
async fn test_class_redefinition_reannotates() {
    let provider = Arc::new(project());
    let loader = Loader::new("test", Arc::new(ModuleRegistry::new()), provider.clone());
    let file4 = loader.import(&id("file4.js")).await.unwrap();
    let old = file4.recorder().get("Foo").unwrap();

    provider.insert(
        id("file4.js"),
        ModuleSource::new()
            .export_class("Foo", Some("Base"))
            .var("Base", Expr::number(0.0)),
    );
    loader.reevaluate(&id("file4.js")).await.unwrap();
    let new = file4.recorder().get("Foo").unwrap();
    assert_ne!(old, new);

    let classes = loader.registry().classes();
    assert_eq!(
        classes.lookup_metadata(new.as_class().unwrap()).unwrap().superclass,
        Superclass::Resolved(Value::Number(0.0))
    );
    assert_eq!(
        classes.lookup_metadata(old.as_class().unwrap()).unwrap().superclass,
        Superclass::Base
    );
}

#[tokio::test]
async fn test_unresolved_imports_are_holes() {
    let provider = MemorySourceProvider::new()
        .with(
            "/p/main.js",
            ModuleSource::new()
                .import("lodash", &[])
                .import_type("./types.js")
                .import("./dep.js", &["v"])
                .var("w", Expr::reference("v")),
        )
        .with("/p/dep.js", ModuleSource::new().export_var("v", Expr::string("dep")));
    let loader = loader_with(provider);
    let main = loader.import(&ModuleId::new("/p/main.js")).await.unwrap();
    assert_eq!(main.recorder().get("w"), Some(Value::str("dep")));

    let snapshot = loader.snapshot();
    let LoaderSnapshot::Modern(modern) = &snapshot else {
        panic!("loader snapshots are modern");
    };
    assert_eq!(modern.records[&ModuleId::new("/p/main.js")].dependencies.len(), 3);

    let graph = DependencyGraph::from_snapshot(&snapshot);
    assert_eq!(graph.dependencies_of(&ModuleId::new("/p/main.js")), &[ModuleId::new("/p/dep.js")]);
    assert!(graph.dependencies_of(&ModuleId::new("/p/dep.js")).is_empty());
}

/// Maps some bare specifiers to the reserved empty module
struct EmptyMapping(MemorySourceProvider);

#[async_trait::async_trait]
impl SourceProvider for EmptyMapping {
    fn resolve(&self, specifier: &str, parent: &ModuleId) -> Option<ModuleId> {
        match specifier {
            "fs" => Some(ModuleId::pseudo(EMPTY_SENTINEL, "fs")),
            "path" => Some(ModuleId::new(EMPTY_SENTINEL)),
            _ => self.0.resolve(specifier, parent),
        }
    }

    async fn fetch(&self, id: &ModuleId) -> Result<ModuleSource> {
        self.0.fetch(id).await
    }
}

#[tokio::test]
async fn test_imports_of_the_empty_module_are_holes() {
    let provider = EmptyMapping(
        MemorySourceProvider::new()
            .with(
                "/p/main.js",
                ModuleSource::new()
                    .import("fs", &["readFile"])
                    .import("path", &[])
                    .import("./dep.js", &["v"]),
            )
            .with("/p/dep.js", ModuleSource::new().export_var("v", Expr::number(1.0))),
    );
    let loader = Loader::new("test", Arc::new(ModuleRegistry::new()), Arc::new(provider));

    let main = loader.import(&ModuleId::new("/p/main.js")).await.unwrap();
    assert_eq!(main.recorder().get("v"), Some(Value::Number(1.0)));
    assert_eq!(main.recorder().get("readFile"), None);

    let keys: Vec<ModuleId> = loader
        .registry()
        .modules(loader.id())
        .iter()
        .map(|m| m.id().clone())
        .collect();
    assert_eq!(keys, vec![ModuleId::new("/p/dep.js"), ModuleId::new("/p/main.js")]);

    let LoaderSnapshot::Modern(modern) = loader.snapshot() else {
        panic!("loader snapshots are modern");
    };
    assert_eq!(
        modern.records[&ModuleId::new("/p/main.js")].dependencies,
        vec![DependencySlot::Hole, DependencySlot::Hole, DependencySlot::resolved("/p/dep.js")]
    );

    assert!(matches!(
        loader.import(&ModuleId::pseudo(EMPTY_SENTINEL, "fs")).await,
        Err(Error::ModuleNotFound(_))
    ));
    assert_eq!(loader.registry().modules(loader.id()).len(), 2);
}

#[tokio::test]
async fn test_custom_empty_sentinel() {
    let source = ModuleSource::new().import("/@nothing", &[]);
    let provider = MemorySourceProvider::new().with("/p/main.js", source);
    let loader = loader_with(provider).with_empty_sentinel("/@nothing");

    loader.import(&ModuleId::new("/p/main.js")).await.unwrap();
    assert!(loader.registry().get(loader.id(), &ModuleId::new("/@nothing")).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cycle_entered_from_both_ends_concurrently() {
    let loader = Arc::new(loader_with(project()));
    let from_a = tokio::spawn({
        let loader = Arc::clone(&loader);
        async move { loader.import(&id("a.js")).await.map(|_| ()) }
    });
    let from_b = tokio::spawn({
        let loader = Arc::clone(&loader);
        async move { loader.import(&id("b.js")).await.map(|_| ()) }
    });
    from_a.await.unwrap().unwrap();
    from_b.await.unwrap().unwrap();

    let a = loader.module(&id("a.js"));
    let b = loader.module(&id("b.js"));
    a.quiesce().await;
    b.quiesce().await;
    assert_eq!(a.state(), ModuleState::Ready);
    assert_eq!(b.state(), ModuleState::Ready);

    let foo = a.recorder().get("Foo").unwrap();
    let bar = b.recorder().get("Bar").unwrap();
    let meta = loader.registry().classes().lookup_metadata(bar.as_class().unwrap()).unwrap();
    assert_eq!(meta.superclass, Superclass::Resolved(foo.clone()));

    // Another top-level import settles links the race left open
    loader.import(&id("a.js")).await.unwrap();
    assert_eq!(b.recorder().get("Foo"), Some(foo));
    assert_eq!(a.recorder().get("Bar"), Some(bar));
}

#[tokio::test]
async fn test_failed_evaluation_keeps_partial_state() {
    let provider = MemorySourceProvider::new().with(
        "/p/bad.js",
        ModuleSource::new()
            .var("ok", Expr::number(1.0))
            .var("broken", Expr::add(Expr::number(1.0), Expr::string("x")))
            .var("never", Expr::number(2.0)),
    );
    let loader = loader_with(provider);
    let err = loader.import(&ModuleId::new("/p/bad.js")).await.unwrap_err();
    assert!(matches!(err, Error::TypeMismatch(_)));

    let module = loader.module(&ModuleId::new("/p/bad.js"));
    assert_eq!(module.state(), ModuleState::Fresh);
    assert_eq!(module.recorder().get("ok"), Some(Value::Number(1.0)));
    assert_eq!(module.recorder().get("never"), None);
}

#[tokio::test]
async fn test_missing_source_and_unbound_names() {
    let provider = MemorySourceProvider::new().with(
        "/p/a.js",
        ModuleSource::new().var("x", Expr::reference("nowhere")),
    );
    let loader = loader_with(provider);

    assert!(matches!(
        loader.import(&ModuleId::new("/p/missing.js")).await,
        Err(Error::ModuleNotFound(_))
    ));
    assert!(matches!(
        loader.import(&ModuleId::new("/p/a.js")).await,
        Err(Error::Unbound { .. })
    ));
}

#[tokio::test]
async fn test_teardown_releases_modules() {
    let loader = loader_with(project());
    let before = loader.import(&id("file1.js")).await.unwrap();

    assert_eq!(loader.teardown().await, 2);
    assert!(loader.registry().get(loader.id(), &id("file1.js")).is_none());
    assert!(DependencyGraph::from_snapshot(&loader.snapshot()).is_empty());

    let after = loader.import(&id("file1.js")).await.unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.recorder().get("x"), Some(Value::Number(3.0)));
}
