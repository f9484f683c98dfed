use super::*;
use crate::config::DumpKind;
use pretty_assertions::assert_eq;
use weft_ir::{body, FieldDecl, MethodDecl, MethodKey, MethodSig, Receiver, Ty, Value};

fn describe() -> MethodKey {
    MethodKey::new("describe", MethodSig::nullary(Ty::Str))
}

fn tile() -> TypeDecl {
    TypeDecl::class("Tile")
        .method(MethodDecl::constructor([]).body(|_, _| Ok(Value::Void)))
        .method(MethodDecl::new("describe", MethodSig::nullary(Ty::Str)).body(|_, _| Ok(Value::str("tile"))))
}

/// `describe` prefixes whatever precedes it.
fn shiny() -> TypeDecl {
    TypeDecl::trait_decl("Shiny")
        .extends("Tile")
        .field(FieldDecl::private("polish", Ty::Int))
        .method(
            MethodDecl::new("describe", MethodSig::nullary(Ty::Str))
                .calls_super(describe())
                .body(|this, _| {
                    let inner = this.invoke(&Trait::super_bridge(&Symbol::new("Shiny"), &describe()), &[])?;
                    Ok(Value::str(&format!("shiny {}", inner.as_str().unwrap_or_default())))
                }),
        )
}

fn decls() -> Arc<DeclTable> {
    Arc::new(
        DeclTable::new()
            .with(tile())
            .with(shiny())
            .with(TypeDecl::trait_decl("Named").field(FieldDecl::public("name", Ty::Str)))
            .with(TypeDecl::trait_decl("Labelled").extends("Tile").implements("Named"))
            .with(TypeDecl::trait_decl("Ping").implements("Pong"))
            .with(TypeDecl::trait_decl("Pong").implements("Ping")),
    )
}

fn composer() -> Composer {
    Composer::new(decls()).unwrap()
}

fn register(composer: &Composer, name: &str) -> Result<Arc<Trait>, ComposeError> {
    let decl = composer.declaration(&Symbol::new(name)).unwrap();
    composer.register_trait(&decl)
}

#[test]
fn infos_are_cached() {
    let composer = composer();
    let object = composer.class_info(&Symbol::object()).unwrap().unwrap();
    assert_eq!(object.name, "Object");

    let first = composer.class_info(&Symbol::new("Tile")).unwrap().unwrap();
    let second = composer.class_info(&Symbol::new("Tile")).unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(composer.class_info(&Symbol::new("Nowhere")).unwrap().is_none());
}

#[test]
fn info_bodies_are_published() {
    let composer = composer();
    let entry = EntryPoint::new("Tile", describe());
    assert!(composer.loader().entry(&entry).is_none());
    composer.class_info(&Symbol::new("Tile")).unwrap();
    assert!(composer.loader().entry(&entry).is_some());
}

#[test]
fn traits_register_once_with_their_parents() {
    let composer = composer();
    let labelled = register(&composer, "Labelled").unwrap();
    let again = register(&composer, "Labelled").unwrap();
    assert!(Arc::ptr_eq(&labelled, &again));

    let named = composer.trait_info(&Symbol::new("Named")).unwrap();
    assert!(Arc::ptr_eq(&labelled.parent_traits[0], &named));
}

#[test]
fn trait_bodies_are_published() {
    let composer = composer();
    let shiny = register(&composer, "Shiny").unwrap();
    let entry = static_entry(&shiny.name, &describe());
    assert!(composer.loader().entry(&entry).is_some());
}

#[test]
fn cyclic_parents_are_rejected() {
    let composer = composer();
    let err = register(&composer, "Ping").unwrap_err();
    assert_eq!(
        err,
        ComposeError::CyclicTraits {
            chain: vec!["Ping".into(), "Pong".into(), "Ping".into()],
        }
    );
    assert_eq!(err.to_string(), "cyclic parent traits: Ping -> Pong -> Ping");
    assert!(composer.trait_info(&Symbol::new("Ping")).is_none());
    assert!(composer.trait_info(&Symbol::new("Pong")).is_none());
}

struct Renamer;

impl LanguageExtractor for Renamer {
    fn name(&self) -> &str {
        "renamer"
    }

    fn sort_index(&self) -> i32 {
        -1
    }

    fn obtain_info(&self, _: &TypeDecl, _: &dyn ExtractCx) -> Result<Option<ClassInfo>, ComposeError> {
        Ok(None)
    }

    fn build_trait(&self, decl: &TypeDecl, _: &dyn ExtractCx) -> Result<Option<Trait>, ComposeError> {
        Ok((decl.name == "Shiny").then(|| Trait::new("Dull", "Tile")))
    }
}

#[test]
fn extractors_must_keep_the_trait_name() {
    let composer = Composer::builder(decls())
        .extractor(Arc::new(Renamer))
        .build()
        .unwrap();
    assert!(composer.extractor("renamer").is_some());
    assert_eq!(
        register(&composer, "Shiny").unwrap_err(),
        ComposeError::TraitNameMismatch {
            expected: "Shiny".into(),
            found: "Dull".into(),
        }
    );
}

#[test]
fn duplicate_extractors_fail_the_build() {
    let err = Composer::builder(decls())
        .extractor(Arc::new(TraitLangExtractor))
        .build()
        .unwrap_err();
    assert!(matches!(err, ComposeError::DuplicateExtractor { .. }));
}

#[test]
fn composites_link_and_run() {
    let composer = composer();
    register(&composer, "Shiny").unwrap();
    let name = Symbol::new("Tile_t$$0");
    let ty = composer
        .compile_composite(&name, &Symbol::new("Tile"), &[Symbol::new("Shiny")])
        .unwrap();
    assert!(Arc::ptr_eq(&ty, &composer.get_defined(&name).unwrap()));

    let mut instance = ty.instantiate(&MethodKey::constructor([]), &[]).unwrap();
    assert_eq!(instance.invoke(&describe(), &[]).unwrap(), Value::str("shiny tile"));
    assert_eq!(instance.field("Shiny$$polish"), Some(&Value::Int(0)));
    assert!(instance.is_instance_of("Shiny"));
}

#[test]
fn composites_need_registered_traits() {
    let composer = composer();
    let err = composer
        .compile_composite(&Symbol::new("Tile_t$$0"), &Symbol::new("Tile"), &[Symbol::new("Shiny")])
        .unwrap_err();
    assert_eq!(err, ComposeError::UnregisteredTrait { name: "Shiny".into() });
}

#[test]
fn dump_directory_receives_listings() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("dump");
    let composer = Composer::builder(decls())
        .config(ComposerConfig::default().with_dump(&dir, DumpKind::Text))
        .build()
        .unwrap();
    register(&composer, "Shiny").unwrap();
    composer
        .compile_composite(&Symbol::new("Tile_t$$0"), &Symbol::new("Tile"), &[Symbol::new("Shiny")])
        .unwrap();

    let listing = std::fs::read_to_string(dir.join("Tile_t$$0.txt")).unwrap();
    assert!(listing.starts_with("composite Tile_t$$0 extends Tile"));
}

#[test]
fn closures_filter_annotations() {
    let composer = Composer::builder(decls())
        .annotation_filter(Arc::new(|_: &Symbol, value: &Symbol| value == "CLIENT"))
        .build()
        .unwrap();
    assert!(composer.filter_annotation(&Symbol::new("SideOnly"), &Symbol::new("CLIENT")));
    assert!(!composer.filter_annotation(&Symbol::new("SideOnly"), &Symbol::new("SERVER")));
}

#[test]
fn bodies_see_the_composite_receiver() {
    let table = DeclTable::new().with(tile()).with(
        TypeDecl::trait_decl("Who").extends("Tile").method(
            MethodDecl::new("who", MethodSig::nullary(Ty::Str))
                .with_body(body(|this, _| Ok(Value::str(this.type_name().as_str())))),
        ),
    );
    let composer = Composer::new(Arc::new(table)).unwrap();
    register(&composer, "Who").unwrap();
    let ty = composer
        .compile_composite(&Symbol::new("Tile_w$$0"), &Symbol::new("Tile"), &[Symbol::new("Who")])
        .unwrap();
    let mut instance = ty.instantiate(&MethodKey::constructor([]), &[]).unwrap();
    assert_eq!(instance.call("who", &[]).unwrap(), Value::str("Tile_w$$0"));
}
