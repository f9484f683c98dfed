//! Trait composition for weft.
//!
//! Given a base type and a set of traits, this crate synthesizes one
//! composite type that extends the base and carries every trait's fields
//! and methods, then caches it so the same set is never composed twice.
//!
//! # Pipeline
//!
//! - `linearize`: flatten trait dependency graphs into composition order
//! - `synthesize`: emit a symbolic [`CompositeDef`] (slots, constructors,
//!   super bridges, claimed methods, covariant bridges, inherited methods)
//! - `assemble`: encode the definition as a versioned binary
//! - `loader`: decode the binary and link it against published method
//!   bodies, producing a runtime [`CompositeType`]
//!
//! [`Composer`] ties these together with the trait registry and the
//! structural-info cache; [`TraitFactory`] adds the per-base compiled-type
//! and factory caches on top.

mod trace;

mod ancestry;
mod assemble;
mod composer;
mod config;
mod debug;
mod def;
mod error;
mod extract;
mod factory;
mod linearize;
mod loader;
mod runtime;
mod sided;
mod synthesize;

#[cfg(test)]
mod testing;

pub use ancestry::{all_methods, all_parents, extends, find_public_impl, is_assignable, StructuralInfoProvider};
pub use assemble::{BinaryAssembler, BincodeAssembler, FORMAT_VERSION, MAGIC};
pub use composer::{Composer, ComposerBuilder, DeclSource, DeclTable};
pub use config::{ComposerConfig, DumpConfig, DumpKind, DUMP_DIR_VAR, DUMP_KIND_VAR, LOG_LEVEL_VAR};
pub use debug::{Debugger, DumpDebugger, NullDebugger};
pub use def::{CompositeDef, CtorDef, EntryPoint, Frame, MethodDef, SlotDef, Target};
pub use error::{ComposeError, ErrorKind};
pub use extract::{
    AnnotationFilter, ExtractCx, ExtractorSet, HostExtractor, KeepAll, LanguageExtractor, TraitLangExtractor,
    DEFAULT_SORT_INDEX,
};
pub use factory::{Factory, FactoryShape, TraitFactory, TraitKey, TraitSet};
pub use linearize::{linearize, linearize_all};
pub use loader::{InMemoryLoader, RuntimeLoader};
pub use runtime::{CompositeType, Instance, TypeHandle};
pub use sided::{Side, SidedTraits};
pub use synthesize::{static_entry, synthesize};
pub use trace::{init_tracing, LOG_FILTER_VAR};
