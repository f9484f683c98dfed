//! Extractor for plain host-language classes.

use weft_ir::{ClassInfo, FieldContribution, Symbol, Trait, TypeDecl};

use super::{add_methods, invalid, ExtractCx, LanguageExtractor};
use crate::error::ComposeError;

/// Handles every declaration. A class used as a trait must be concrete,
/// keep its instance state private, and be constructible without
/// arguments.
#[derive(Copy, Clone, Debug, Default)]
pub struct HostExtractor;

impl LanguageExtractor for HostExtractor {
    fn name(&self) -> &str {
        "host"
    }

    fn sort_index(&self) -> i32 {
        i32::MAX
    }

    fn obtain_info(
        &self,
        decl: &TypeDecl,
        _cx: &dyn ExtractCx,
    ) -> Result<Option<ClassInfo>, ComposeError> {
        Ok(Some(ClassInfo::from_decl(decl)))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(name = %decl.name))]
    fn build_trait(&self, decl: &TypeDecl, _cx: &dyn ExtractCx) -> Result<Option<Trait>, ComposeError> {
        if decl.is_interface() {
            return Err(invalid(decl, "interfaces cannot be traits"));
        }
        if decl.is_abstract() {
            return Err(invalid(decl, "abstract classes cannot be traits"));
        }

        let mut t = Trait::new(
            decl.name.clone(),
            decl.superclass.clone().unwrap_or_else(Symbol::object),
        );

        for field in decl.fields.iter().filter(|f| !f.is_static()) {
            if !field.is_private() {
                return Err(invalid(decl, format!("field `{}` must be private", field.name)));
            }
            t = t.with_field(FieldContribution::private(field.name.clone(), field.ty.clone()));
        }

        add_methods(decl, t, |_| false).map(Some)
    }
}
