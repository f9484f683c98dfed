//! Language-extractor dispatch.
//!
//! A language extractor turns a raw [`TypeDecl`] into structural info and,
//! when the declaration is usable as a trait, into a [`Trait`]. Extractors
//! are tried in sort order; the first to answer wins.
//!
//! # Design
//!
//! - Extractors are supplied explicitly by the caller and sorted once, at
//!   composer build time, by `sort_index` (stable for equal indices)
//! - The host extractor is always present and always last
//! - Names are unique; a duplicate fails the build instead of shadowing
//! - Extractors reach back into the composer only through [`ExtractCx`]

mod host;
mod trait_lang;


use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use weft_ir::{ClassInfo, MethodDecl, MethodKey, Symbol, Trait, TraitMethod, TypeDecl};

use crate::error::ComposeError;

pub use host::HostExtractor;
pub use trait_lang::TraitLangExtractor;

/// Sort index of extractors that do not pick one.
pub const DEFAULT_SORT_INDEX: i32 = 1000;

/// Translates declarations of one source language.
pub trait LanguageExtractor: Send + Sync {
    /// Unique name.
    fn name(&self) -> &str;

    /// Smaller indices are tried first.
    fn sort_index(&self) -> i32 {
        DEFAULT_SORT_INDEX
    }

    /// Structural info for `decl`, or `None` if this extractor does not
    /// handle it.
    fn obtain_info(&self, decl: &TypeDecl, cx: &dyn ExtractCx)
        -> Result<Option<ClassInfo>, ComposeError>;

    /// A trait built from `decl`, or `None` if this extractor does not
    /// handle it. Errors reject the declaration outright.
    fn build_trait(&self, decl: &TypeDecl, cx: &dyn ExtractCx) -> Result<Option<Trait>, ComposeError>;
}

/// What an extractor may ask the composer while it runs.
pub trait ExtractCx {
    fn class_info(&self, name: &Symbol) -> Result<Option<Arc<ClassInfo>>, ComposeError>;

    fn declaration(&self, name: &Symbol) -> Option<Arc<TypeDecl>>;

    /// Register the trait `name` depends on, recursively, and return it.
    fn register_parent(&self, name: &Symbol) -> Result<Arc<Trait>, ComposeError>;

    /// Whether a method annotated `ty` with `value` is excluded from its
    /// trait.
    fn filter_annotation(&self, ty: &Symbol, value: &Symbol) -> bool;
}

/// Environment policy deciding which annotated methods to leave out of a
/// trait.
pub trait AnnotationFilter: Send + Sync {
    fn filter(&self, ty: &Symbol, value: &Symbol) -> bool;
}

impl<F> AnnotationFilter for F
where
    F: Fn(&Symbol, &Symbol) -> bool + Send + Sync,
{
    fn filter(&self, ty: &Symbol, value: &Symbol) -> bool {
        self(ty, value)
    }
}

/// Excludes nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct KeepAll;

impl AnnotationFilter for KeepAll {
    fn filter(&self, _ty: &Symbol, _value: &Symbol) -> bool {
        false
    }
}

/// The sorted extractor list with a by-name index.
pub struct ExtractorSet {
    extractors: Vec<Arc<dyn LanguageExtractor>>,
    by_name: FxHashMap<String, usize>,
}

impl ExtractorSet {
    /// Sort `custom`, append the host extractor, and check names.
    pub fn new(custom: Vec<Arc<dyn LanguageExtractor>>) -> Result<Self, ComposeError> {
        let mut extractors = custom;
        extractors.sort_by_key(|e| e.sort_index());
        extractors.push(Arc::new(HostExtractor));

        let mut by_name = FxHashMap::default();
        for (i, e) in extractors.iter().enumerate() {
            if by_name.insert(e.name().to_owned(), i).is_some() {
                return Err(ComposeError::DuplicateExtractor {
                    name: e.name().to_owned(),
                    index: e.sort_index(),
                });
            }
        }
        tracing::debug!(
            extractors = ?extractors.iter().map(|e| e.name()).collect::<Vec<_>>(),
            "language extractors"
        );
        Ok(ExtractorSet { extractors, by_name })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn LanguageExtractor>> {
        self.extractors.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn LanguageExtractor>> {
        self.by_name.get(name).map(|&i| &self.extractors[i])
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl fmt::Debug for ExtractorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.extractors.iter().map(|e| (e.name(), e.sort_index())))
            .finish()
    }
}

/// Reject `decl` as a trait.
pub(crate) fn invalid(decl: &TypeDecl, reason: impl Into<String>) -> ComposeError {
    ComposeError::InvalidTrait {
        trait_name: decl.name.to_string(),
        reason: reason.into(),
    }
}

/// Fill in the initializer, methods and super calls of `t` from `decl`.
///
/// Methods for which `excluded` holds contribute nothing, not even their
/// super calls.
pub(crate) fn add_methods<F>(decl: &TypeDecl, mut t: Trait, excluded: F) -> Result<Trait, ComposeError>
where
    F: Fn(&MethodDecl) -> bool,
{
    let mut supers: Vec<MethodKey> = Vec::new();
    for m in &decl.methods {
        if m.key.is_constructor() {
            if m.key.sig.arity() > 0 {
                return Err(invalid(
                    decl,
                    format!("constructor `{}` takes arguments", m.key.sig),
                ));
            }
            t.initializer = m.body.clone();
            continue;
        }
        if excluded(m) {
            continue;
        }
        for key in &m.super_calls {
            if !supers.contains(key) {
                supers.push(key.clone());
            }
        }
        if m.is_private() || m.is_static() || m.is_abstract() {
            continue;
        }
        if let Some(body) = &m.body {
            t.methods.push(TraitMethod {
                key: m.key.clone(),
                body: body.clone(),
            });
        }
    }
    t.supers = supers;
    Ok(t)
}
