//! Runtime loaders.
//!
//! A loader owns two tables: the code table of entry points the composer
//! publishes method bodies under, and the table of defined composite types.
//! Defining a type decodes its binary definition and links it against the
//! code table.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use weft_ir::{MethodBody, Symbol};

use crate::assemble::{BinaryAssembler, BincodeAssembler};
use crate::def::EntryPoint;
use crate::error::ComposeError;
use crate::runtime::{CompositeType, TypeHandle};

/// Defines composite types from assembled bytes.
pub trait RuntimeLoader: Send + Sync {
    /// Decode, link and register the type `name`.
    ///
    /// A name can be defined once; redefining it is an error.
    fn define(&self, name: &Symbol, binary: &[u8]) -> Result<TypeHandle, ComposeError>;

    fn get_defined(&self, name: &Symbol) -> Option<TypeHandle>;

    /// Publish `body` as the code of `entry`. The first body published for
    /// an entry stays.
    fn define_entry(&self, entry: EntryPoint, body: MethodBody);

    fn entry(&self, entry: &EntryPoint) -> Option<MethodBody>;
}

/// Keeps everything in process memory.
pub struct InMemoryLoader {
    assembler: Arc<dyn BinaryAssembler>,
    entries: RwLock<FxHashMap<EntryPoint, MethodBody>>,
    types: RwLock<FxHashMap<Symbol, TypeHandle>>,
}

impl InMemoryLoader {
    pub fn new(assembler: Arc<dyn BinaryAssembler>) -> Self {
        InMemoryLoader {
            assembler,
            entries: RwLock::new(FxHashMap::default()),
            types: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn defined_count(&self) -> usize {
        self.types.read().len()
    }
}

impl Default for InMemoryLoader {
    fn default() -> Self {
        InMemoryLoader::new(Arc::new(BincodeAssembler::new()))
    }
}

impl RuntimeLoader for InMemoryLoader {
    #[tracing::instrument(level = "trace", skip(self, binary), fields(len = binary.len()))]
    fn define(&self, name: &Symbol, binary: &[u8]) -> Result<TypeHandle, ComposeError> {
        if self.types.read().contains_key(name) {
            return Err(ComposeError::AlreadyDefined {
                name: name.to_string(),
            });
        }

        let def = self.assembler.disassemble(name.as_str(), binary)?;
        if &def.name != name {
            return Err(ComposeError::Assembly {
                name: name.to_string(),
                reason: format!("binary defines `{}`", def.name),
            });
        }
        let ty = {
            let entries = self.entries.read();
            Arc::new(CompositeType::link(def, |entry| entries.get(entry).cloned())?)
        };

        let mut types = self.types.write();
        if types.contains_key(name) {
            return Err(ComposeError::AlreadyDefined {
                name: name.to_string(),
            });
        }
        types.insert(name.clone(), Arc::clone(&ty));
        Ok(ty)
    }

    fn get_defined(&self, name: &Symbol) -> Option<TypeHandle> {
        self.types.read().get(name).cloned()
    }

    fn define_entry(&self, entry: EntryPoint, body: MethodBody) {
        self.entries.write().entry(entry).or_insert(body);
    }

    fn entry(&self, entry: &EntryPoint) -> Option<MethodBody> {
        self.entries.read().get(entry).cloned()
    }
}
