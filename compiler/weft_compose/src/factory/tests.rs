use super::*;
use crate::composer::DeclTable;
use crate::extract::{ExtractCx, LanguageExtractor, TraitLangExtractor};
use pretty_assertions::assert_eq;
use rustc_hash::FxHashSet;
use weft_ir::{MethodDecl, MethodSig, Receiver, Trait};

fn unit_ctor(params: impl IntoIterator<Item = Ty>) -> MethodDecl {
    MethodDecl::constructor(params).body(|_, _| Ok(Value::Void))
}

fn answer(name: &str, value: i64) -> MethodDecl {
    MethodDecl::new(name, MethodSig::nullary(Ty::Int)).body(move |_, _| Ok(Value::Int(value)))
}

fn table() -> DeclTable {
    DeclTable::new()
        .with(TypeDecl::class("Block").method(unit_ctor([])))
        .with(
            TypeDecl::class("Tile")
                .extends("Block")
                .method(unit_ctor([]))
                .method(unit_ctor([Ty::Int])),
        )
        .with(TypeDecl::class("Stone").method(unit_ctor([])))
        .with(TypeDecl::trait_decl("Glow").extends("Tile").method(answer("glow", 1)))
        .with(TypeDecl::trait_decl("Spark").extends("Block").method(answer("spark", 2)))
        .with(TypeDecl::trait_decl("Free").method(answer("free", 3)))
        .with(TypeDecl::trait_decl("Rogue").extends("Stone"))
        .with(TypeDecl::trait_decl("Drifter").extends("Tile"))
        .with(
            TypeDecl::trait_decl("Needy").extends("Tile").method(
                MethodDecl::new("lost", MethodSig::nullary(Ty::Int))
                    .calls_super(MethodKey::new("lost", MethodSig::nullary(Ty::Int)))
                    .body(|_, _| Ok(Value::Int(0))),
            ),
        )
        .with(TypeDecl::trait_decl("Shifter").extends("Tile"))
}

fn composer() -> Arc<Composer> {
    Arc::new(Composer::new(Arc::new(table())).unwrap())
}

fn factory(params: impl IntoIterator<Item = Ty>) -> TraitFactory {
    let shape = FactoryShape::new("create", params).unwrap();
    TraitFactory::new(composer(), "Tile", shape, "part").unwrap()
}

fn set(factory: &TraitFactory, names: &[&str]) -> TraitSet {
    names.iter().map(|n| factory.register_trait(*n).unwrap()).collect()
}

#[test]
fn trait_sets_ignore_order() {
    let factory = factory([]);
    let forward = set(&factory, &["Glow", "Spark", "Glow"]);
    let backward = set(&factory, &["Spark", "Glow"]);

    assert_eq!(forward, backward);
    assert_eq!(forward.len(), 2);
    assert_eq!(forward.to_string(), "{Glow, Spark}");
    assert_eq!(backward.to_string(), "{Spark, Glow}");

    let hashed: FxHashSet<TraitSet> = [forward, backward].into_iter().collect();
    assert_eq!(hashed.len(), 1);
}

#[test]
fn shapes_are_validated() {
    let err = FactoryShape::new("", []).unwrap_err();
    assert!(matches!(err, ComposeError::InvalidFactoryShape { .. }));

    let err = FactoryShape::new("create", [Ty::Int, Ty::Void]).unwrap_err();
    assert_eq!(
        err,
        ComposeError::InvalidFactoryShape {
            shape: "create(int, void)".into(),
            reason: "parameter 1 is void".into(),
        }
    );
}

#[test]
fn base_must_resolve() {
    let shape = FactoryShape::new("create", []).unwrap();
    let err = TraitFactory::new(composer(), "Missing", shape, "part").unwrap_err();
    assert_eq!(err, ComposeError::UnknownType { name: "Missing".into() });
}

#[test]
fn trait_parents_must_be_base_ancestors() {
    let factory = factory([]);
    assert!(factory.register_trait("Glow").is_ok());
    assert!(factory.register_trait("Spark").is_ok());
    assert!(factory.register_trait("Free").is_ok());

    assert_eq!(
        factory.register_trait("Rogue").unwrap_err(),
        ComposeError::ParentMismatch {
            trait_name: "Rogue".into(),
            parent: "Stone".into(),
            base: "Tile".into(),
        }
    );
    assert!(factory.composer().trait_info(&Symbol::new("Rogue")).is_none());
    assert_eq!(
        factory.register_trait("Nowhere").unwrap_err(),
        ComposeError::UnknownType { name: "Nowhere".into() }
    );
}

#[test]
fn registration_is_idempotent() {
    let factory = factory([]);
    let first = factory.register_trait("Glow").unwrap();
    let second = factory.register_trait("Glow").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.name(), "Glow");
}

#[test]
fn construct_caches_per_set() {
    let factory = factory([]);
    let first = factory.construct(&set(&factory, &["Glow", "Spark"])).unwrap();
    let second = factory.construct(&set(&factory, &["Spark", "Glow"])).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let ty = factory.compiled_type(&set(&factory, &["Glow", "Spark"])).unwrap();
    assert!(Arc::ptr_eq(&ty, first.composite()));
    assert_eq!(ty.name(), "Tile_part$$0");
    assert_eq!(
        factory.traits_for_type(ty.name()),
        Some(set(&factory, &["Glow", "Spark"]))
    );

    let other = factory.construct(&set(&factory, &["Glow"])).unwrap();
    assert_eq!(other.composite().name(), "Tile_part$$1");
}

#[test]
fn factories_construct_instances() {
    let factory = factory([Ty::Int]);
    let made = factory.construct(&set(&factory, &["Glow", "Free"])).unwrap();
    assert_eq!(made.shape().to_string(), "create(int)");

    let mut instance = made.construct(&[Value::Int(7)]).unwrap();
    assert_eq!(instance.call("glow", &[]).unwrap(), Value::Int(1));
    assert_eq!(instance.call("free", &[]).unwrap(), Value::Int(3));
    assert!(instance.is_instance_of("Block"));

    let err = made.construct(&[Value::str("seven")]).unwrap_err();
    assert!(matches!(err, RuntimeError::ArgumentType { index: 0, .. }));
}

#[test]
fn empty_set_is_a_plain_subclass() {
    let factory = factory([]);
    let made = factory.construct(&TraitSet::new()).unwrap();
    let ty = made.composite();
    assert!(ty.def().composed.is_empty());
    assert!(ty.is_subtype_of("Tile"));
    assert!(made.construct(&[]).is_ok());
}

#[test]
fn shape_must_match_a_constructor() {
    let factory = factory([Ty::Str]);
    let err = factory.construct(&set(&factory, &["Glow"])).unwrap_err();
    assert_eq!(
        err,
        ComposeError::FactoryShapeMismatch {
            composite: "Tile_part$$0".into(),
            shape: "create(str)".into(),
        }
    );
}

#[test]
fn keys_belong_to_their_factory() {
    let composer = composer();
    let shape = FactoryShape::new("create", []).unwrap();
    let tiles = TraitFactory::new(Arc::clone(&composer), "Tile", shape.clone(), "a").unwrap();
    let blocks = TraitFactory::new(composer, "Block", shape, "b").unwrap();

    let spark = blocks.register_trait("Spark").unwrap();
    let err = tiles.construct(&[spark].into_iter().collect()).unwrap_err();
    assert_eq!(err, ComposeError::UnregisteredTrait { name: "Spark".into() });
}

/// Moves `Shifter` onto `Stone` in its structural info and `Drifter` onto
/// `Stone` in its built trait; everything else goes to the trait extractor.
struct Relocating;

impl LanguageExtractor for Relocating {
    fn name(&self) -> &str {
        "relocating"
    }

    fn sort_index(&self) -> i32 {
        -1
    }

    fn obtain_info(&self, decl: &TypeDecl, cx: &dyn ExtractCx) -> Result<Option<ClassInfo>, ComposeError> {
        if decl.name != "Shifter" {
            return TraitLangExtractor.obtain_info(decl, cx);
        }
        let mut info = ClassInfo::from_decl(decl);
        info.superclass = Some(Symbol::new("Stone"));
        Ok(Some(info))
    }

    fn build_trait(&self, decl: &TypeDecl, cx: &dyn ExtractCx) -> Result<Option<Trait>, ComposeError> {
        if decl.name == "Drifter" {
            return Ok(Some(Trait::new("Drifter", "Stone")));
        }
        TraitLangExtractor.build_trait(decl, cx)
    }
}

#[test]
fn resolved_parents_are_checked_against_the_base() {
    let composer = Composer::builder(Arc::new(table()))
        .extractor(Arc::new(Relocating))
        .build()
        .unwrap();
    let shape = FactoryShape::new("create", []).unwrap();
    let factory = TraitFactory::new(Arc::new(composer), "Tile", shape, "part").unwrap();

    for name in ["Shifter", "Drifter"] {
        assert_eq!(
            factory.register_trait(name).unwrap_err(),
            ComposeError::ParentMismatch {
                trait_name: name.into(),
                parent: "Stone".into(),
                base: "Tile".into(),
            }
        );
    }
    assert!(factory.register_trait("Glow").is_ok());
}

#[test]
fn failed_compiles_leave_no_slot() {
    let factory = factory([]);
    let needy = set(&factory, &["Needy"]);
    for _ in 0..2 {
        let err = factory.construct(&needy).unwrap_err();
        assert!(matches!(err, ComposeError::MissingSuperTarget { .. }));
        assert!(factory.compiled.lock().is_empty());
        assert!(factory.compiled_type(&needy).is_none());
    }

    factory.construct(&set(&factory, &["Glow"])).unwrap();
    assert_eq!(factory.compiled.lock().len(), 1);
}
