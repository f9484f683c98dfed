//! Marker-driven trait selection.
//!
//! A marker is any type that can appear in an object's hierarchy. Each
//! marker maps to at most one trait per [`Side`]; the traits for an object
//! type are those of every marker found while walking the type itself, its
//! interfaces, then its superclass.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use weft_ir::Symbol;
use weft_stack::ensure_sufficient_stack;

use crate::error::ComposeError;
use crate::factory::{TraitFactory, TraitKey, TraitSet};

/// Where a trait applies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    fn index(self) -> usize {
        match self {
            Side::Client => 0,
            Side::Server => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Client => "client",
            Side::Server => "server",
        })
    }
}

/// Per-side marker registry over a [`TraitFactory`].
pub struct SidedTraits {
    factory: Arc<TraitFactory>,
    /// Marker to trait, indexed by [`Side::index`].
    markers: [RwLock<FxHashMap<Symbol, TraitKey>>; 2],
    cache: RwLock<LookupCache>,
}

/// Cached lookups plus a per-side generation bumped on every new marker.
/// A walk only caches its result if its side's generation did not move.
#[derive(Default)]
struct LookupCache {
    generation: [u64; 2],
    traits: FxHashMap<(Symbol, Side), TraitSet>,
}

impl SidedTraits {
    pub fn new(factory: Arc<TraitFactory>) -> Self {
        SidedTraits {
            factory,
            markers: Default::default(),
            cache: RwLock::new(LookupCache::default()),
        }
    }

    pub fn factory(&self) -> &Arc<TraitFactory> {
        &self.factory
    }

    /// Apply `client` on the client side and `server` on the server side
    /// wherever `marker` appears.
    pub fn register(
        &self,
        marker: impl Into<Symbol>,
        client: Option<&str>,
        server: Option<&str>,
    ) -> Result<(), ComposeError> {
        let marker = marker.into();
        if let Some(name) = client {
            self.register_side(Side::Client, &marker, name)?;
        }
        if let Some(name) = server {
            self.register_side(Side::Server, &marker, name)?;
        }
        Ok(())
    }

    /// Apply `name` on both sides wherever `marker` appears.
    pub fn register_common(&self, marker: impl Into<Symbol>, name: &str) -> Result<(), ComposeError> {
        self.register(marker, Some(name), Some(name))
    }

    fn register_side(&self, side: Side, marker: &Symbol, name: &str) -> Result<(), ComposeError> {
        let key = self.factory.register_trait(name)?;
        let mut markers = self.markers[side.index()].write();
        match markers.get(marker) {
            Some(existing) if *existing == key => {
                tracing::debug!(%marker, %side, trait_name = %key, "marker already registered");
            }
            Some(existing) => {
                tracing::error!(
                    %marker,
                    %side,
                    existing = %existing,
                    new = %key,
                    "marker already maps to a different trait, ignoring"
                );
            }
            None => {
                markers.insert(marker.clone(), key);
                let mut cache = self.cache.write();
                cache.generation[side.index()] += 1;
                cache.traits.retain(|(_, s), _| *s != side);
            }
        }
        Ok(())
    }

    /// The trait registered for `marker` on `side`.
    pub fn marker(&self, marker: &Symbol, side: Side) -> Option<TraitKey> {
        self.markers[side.index()].read().get(marker).cloned()
    }

    /// Traits of every marker in the hierarchy of `ty`.
    pub fn traits_for(&self, ty: &Symbol, side: Side) -> Result<TraitSet, ComposeError> {
        let cache_key = (ty.clone(), side);
        let generation = {
            let cache = self.cache.read();
            if let Some(traits) = cache.traits.get(&cache_key) {
                return Ok(traits.clone());
            }
            cache.generation[side.index()]
        };

        let mut seen = FxHashSet::default();
        let mut traits = TraitSet::new();
        self.collect(ty, side, &mut seen, &mut traits)?;
        tracing::trace!(%ty, %side, %traits, "traits for type");

        let mut cache = self.cache.write();
        if cache.generation[side.index()] != generation {
            tracing::debug!(%ty, %side, "markers changed during lookup, not caching");
            return Ok(traits);
        }
        Ok(cache.traits.entry(cache_key).or_insert(traits).clone())
    }

    fn collect(
        &self,
        ty: &Symbol,
        side: Side,
        seen: &mut FxHashSet<Symbol>,
        out: &mut TraitSet,
    ) -> Result<(), ComposeError> {
        if !seen.insert(ty.clone()) {
            return Ok(());
        }
        if let Some(key) = self.marker(ty, side) {
            out.insert(key);
        }
        let Some(info) = self.factory.composer().class_info(ty)? else {
            return Ok(());
        };
        for parent in info.interfaces.iter().chain(info.superclass.iter()) {
            ensure_sufficient_stack(|| self.collect(parent, side, seen, out))?;
        }
        Ok(())
    }
}

impl fmt::Debug for SidedTraits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SidedTraits")
            .field("base", self.factory.base())
            .field("client", &self.markers[0].read().len())
            .field("server", &self.markers[1].read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::{Composer, DeclSource, DeclTable};
    use parking_lot::Mutex;
    use std::sync::mpsc;
    use crate::factory::FactoryShape;
    use pretty_assertions::assert_eq;
    use weft_ir::TypeDecl;

    fn table() -> DeclTable {
        DeclTable::new()
            .with(TypeDecl::class("Tile"))
            .with(TypeDecl::interface("Lit"))
            .with(TypeDecl::interface("Warm").implements("Lit"))
            .with(TypeDecl::class("Part"))
            .with(TypeDecl::class("Lamp").extends("Part").implements("Warm"))
            .with(TypeDecl::class("Stove").extends("Lamp").implements("Hot"))
            .with(TypeDecl::interface("Hot"))
            .with(TypeDecl::trait_decl("Glow").extends("Tile"))
            .with(TypeDecl::trait_decl("Heat").extends("Tile"))
            .with(TypeDecl::trait_decl("Sound").extends("Tile"))
    }

    fn sided_over(source: Arc<dyn DeclSource>) -> SidedTraits {
        let composer = Arc::new(Composer::new(source).unwrap());
        let shape = FactoryShape::new("create", []).unwrap();
        let factory = TraitFactory::new(composer, "Tile", shape, "part").unwrap();
        SidedTraits::new(Arc::new(factory))
    }

    fn sided() -> SidedTraits {
        sided_over(Arc::new(table()))
    }

    fn names(traits: &TraitSet) -> Vec<&str> {
        traits.iter().map(|k| k.name().as_str()).collect()
    }

    #[test]
    fn markers_are_found_across_the_hierarchy() {
        let sided = sided();
        sided.register_common("Lit", "Glow").unwrap();
        sided.register("Hot", None, Some("Heat")).unwrap();
        sided.register("Part", Some("Sound"), None).unwrap();

        let stove = Symbol::new("Stove");
        assert_eq!(names(&sided.traits_for(&stove, Side::Server).unwrap()), ["Heat", "Glow"]);
        assert_eq!(names(&sided.traits_for(&stove, Side::Client).unwrap()), ["Glow", "Sound"]);
        assert!(sided.traits_for(&Symbol::new("Tile"), Side::Client).unwrap().is_empty());
        assert!(sided.traits_for(&Symbol::new("Unknown"), Side::Client).unwrap().is_empty());
    }

    #[test]
    fn markers_keep_their_first_trait() {
        let sided = sided();
        sided.register_common("Lit", "Glow").unwrap();
        sided.register_common("Lit", "Heat").unwrap();
        let lit = Symbol::new("Lit");
        assert_eq!(sided.marker(&lit, Side::Client).unwrap().name(), "Glow");
        assert_eq!(sided.marker(&lit, Side::Server).unwrap().name(), "Glow");
    }

    #[test]
    fn new_markers_refresh_cached_lookups() {
        let sided = sided();
        let lamp = Symbol::new("Lamp");
        assert!(sided.traits_for(&lamp, Side::Client).unwrap().is_empty());
        sided.register_common("Warm", "Glow").unwrap();
        assert_eq!(names(&sided.traits_for(&lamp, Side::Client).unwrap()), ["Glow"]);
    }

    #[test]
    fn unknown_traits_fail_registration() {
        let sided = sided();
        let err = sided.register_common("Lit", "Missing").unwrap_err();
        assert_eq!(err, ComposeError::UnknownType { name: "Missing".into() });
        assert!(sided.marker(&Symbol::new("Lit"), Side::Client).is_none());
    }

    /// Parks the first lookup of `Lamp` until released.
    struct Gated {
        table: DeclTable,
        gate: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
    }

    impl DeclSource for Gated {
        fn declaration(&self, name: &Symbol) -> Option<Arc<TypeDecl>> {
            if name.as_str() == "Lamp" {
                let gate = self.gate.lock().take();
                if let Some((entered, release)) = gate {
                    entered.send(()).unwrap();
                    release.recv().unwrap();
                }
            }
            self.table.declaration(name)
        }
    }

    #[test]
    fn registration_during_a_lookup_is_not_lost() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let sided = sided_over(Arc::new(Gated {
            table: table(),
            gate: Mutex::new(Some((entered_tx, release_rx))),
        }));
        let lamp = Symbol::new("Lamp");

        std::thread::scope(|s| {
            let lookup = s.spawn(|| sided.traits_for(&lamp, Side::Client).unwrap());
            entered_rx.recv().unwrap();
            sided.register_common("Lamp", "Glow").unwrap();
            release_tx.send(()).unwrap();
            assert!(lookup.join().unwrap().is_empty());
        });

        assert_eq!(names(&sided.traits_for(&lamp, Side::Client).unwrap()), ["Glow"]);
    }
}
