//! Member model for the weft trait composer.
//!
//! This crate holds the data every other stage passes around:
//!
//! - `Symbol`, `Ty`, `MethodSig`, `MethodKey`: names and signatures
//! - `TypeDecl`: a host-language type declaration, the raw input handed to
//!   language extractors
//! - `ClassInfo`/`MethodInfo`: structural info used for ancestry and
//!   super/bridge resolution
//! - `Trait`/`FieldContribution`/`TraitMethod`: the members a trait
//!   contributes to a composite type
//! - `Value`, `MethodBody`, `Receiver`: the runtime side of method bodies
//!
//! Everything here is immutable once built and shared by `Arc`.

mod decl;
mod flags;
mod info;
mod model;
mod symbol;
mod ty;
mod value;

pub use decl::{Annotation, FieldDecl, MethodDecl, TypeDecl};
pub use flags::{ClassFlags, MemberFlags};
pub use info::{ClassInfo, MethodInfo};
pub use model::{FieldContribution, Trait, TraitMethod, Visibility};
pub use symbol::{Symbol, CONSTRUCTOR, INITIALIZER};
pub use ty::{MethodKey, MethodSig, Params, Ty};
pub use value::{body, MethodBody, Receiver, RuntimeError, Value};
