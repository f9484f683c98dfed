//! Extractor for trait-language declarations.
//!
//! Trait-language traits are declarations flagged [`ClassFlags::TRAIT`].
//! Unlike host classes they may declare public fields and depend on other
//! traits through their interface list; those parents are registered before
//! the trait itself.
//!
//! [`ClassFlags::TRAIT`]: weft_ir::ClassFlags::TRAIT

use weft_ir::{ClassInfo, FieldContribution, MethodDecl, Symbol, Trait, TypeDecl};

use super::{add_methods, ExtractCx, LanguageExtractor};
use crate::error::ComposeError;

#[derive(Copy, Clone, Debug, Default)]
pub struct TraitLangExtractor;

fn filtered(m: &MethodDecl, cx: &dyn ExtractCx) -> bool {
    m.annotations.iter().any(|a| {
        a.value
            .as_ref()
            .is_some_and(|value| cx.filter_annotation(&a.ty, value))
    })
}

impl LanguageExtractor for TraitLangExtractor {
    fn name(&self) -> &str {
        "trait"
    }

    fn sort_index(&self) -> i32 {
        0
    }

    fn obtain_info(
        &self,
        decl: &TypeDecl,
        _cx: &dyn ExtractCx,
    ) -> Result<Option<ClassInfo>, ComposeError> {
        Ok(decl.is_trait().then(|| ClassInfo::from_decl(decl)))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(name = %decl.name))]
    fn build_trait(&self, decl: &TypeDecl, cx: &dyn ExtractCx) -> Result<Option<Trait>, ComposeError> {
        if !decl.is_trait() {
            return Ok(None);
        }

        let mut t = Trait::new(
            decl.name.clone(),
            decl.superclass.clone().unwrap_or_else(Symbol::object),
        );

        for iface in &decl.interfaces {
            let is_trait = cx.class_info(iface)?.is_some_and(|info| info.is_trait());
            if is_trait {
                t.parent_traits.push(cx.register_parent(iface)?);
            }
        }

        for field in decl.fields.iter().filter(|f| !f.is_static()) {
            t.fields.push(if field.is_private() {
                FieldContribution::private(field.name.clone(), field.ty.clone())
            } else {
                FieldContribution::public(field.name.clone(), field.ty.clone())
            });
        }

        add_methods(decl, t, |m| {
            let excluded = filtered(m, cx);
            if excluded {
                tracing::debug!(method = %m.key, "excluded by annotation filter");
            }
            excluded
        })
        .map(Some)
    }
}
