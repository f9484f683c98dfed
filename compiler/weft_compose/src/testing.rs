//! Shared test fixtures.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use weft_ir::{ClassInfo, Symbol, TypeDecl};

use crate::ancestry::StructuralInfoProvider;
use crate::error::ComposeError;

/// Resolves from a fixed set of declarations.
pub(crate) struct Infos(FxHashMap<Symbol, Arc<ClassInfo>>);

impl Infos {
    pub(crate) fn new(decls: impl IntoIterator<Item = TypeDecl>) -> Self {
        let mut map: FxHashMap<Symbol, Arc<ClassInfo>> = decls
            .into_iter()
            .map(|d| (d.name.clone(), Arc::new(ClassInfo::from_decl(&d))))
            .collect();
        map.insert(Symbol::object(), Arc::new(ClassInfo::root()));
        Infos(map)
    }

    pub(crate) fn get(&self, name: &str) -> Arc<ClassInfo> {
        Arc::clone(&self.0[name])
    }
}

impl StructuralInfoProvider for Infos {
    fn resolve(&self, name: &Symbol) -> Result<Option<Arc<ClassInfo>>, ComposeError> {
        Ok(self.0.get(name).cloned())
    }
}
