//! Ancestry walks over structural info.
//!
//! Types name their ancestors; a [`StructuralInfoProvider`] turns a name into
//! info. The walks here are the only place the composer looks at the type
//! hierarchy, so all of them share one rule: an ancestor no provider knows is
//! skipped, not an error. A base type or trait that cannot be resolved at
//! all is reported by the caller.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use weft_ir::{ClassInfo, MethodInfo, MethodKey, Symbol, Ty};
use weft_stack::ensure_sufficient_stack;

use crate::error::ComposeError;

/// Resolves type names to structural info.
pub trait StructuralInfoProvider {
    /// Info for `name`, or `None` if no declaration source knows it.
    fn resolve(&self, name: &Symbol) -> Result<Option<Arc<ClassInfo>>, ComposeError>;

    /// Like [`resolve`](Self::resolve), but a miss is an error.
    fn require(&self, name: &Symbol) -> Result<Arc<ClassInfo>, ComposeError> {
        self.resolve(name)?
            .ok_or_else(|| ComposeError::unknown(name))
    }
}

/// `info` and every transitive ancestor, each once.
///
/// Pre-order: a type comes before its parents, the superclass branch before
/// the interfaces.
pub fn all_parents<P>(provider: &P, info: &Arc<ClassInfo>) -> Result<Vec<Arc<ClassInfo>>, ComposeError>
where
    P: StructuralInfoProvider + ?Sized,
{
    fn walk<P: StructuralInfoProvider + ?Sized>(
        provider: &P,
        info: &Arc<ClassInfo>,
        seen: &mut FxHashSet<Symbol>,
        out: &mut Vec<Arc<ClassInfo>>,
    ) -> Result<(), ComposeError> {
        if !seen.insert(info.name.clone()) {
            return Ok(());
        }
        out.push(Arc::clone(info));
        for parent in info.parents() {
            match provider.resolve(parent)? {
                Some(parent) => {
                    ensure_sufficient_stack(|| walk(provider, &parent, seen, out))?;
                }
                None => tracing::trace!(ty = %info.name, %parent, "skipping unresolved ancestor"),
            }
        }
        Ok(())
    }

    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    walk(provider, info, &mut seen, &mut out)?;
    Ok(out)
}

/// Every method declared on `info` or an ancestor, nearest first.
pub fn all_methods<P>(provider: &P, info: &Arc<ClassInfo>) -> Result<Vec<MethodInfo>, ComposeError>
where
    P: StructuralInfoProvider + ?Sized,
{
    Ok(all_parents(provider, info)?
        .iter()
        .flat_map(|ancestor| ancestor.methods.iter().cloned())
        .collect())
}

/// The nearest concrete, non-private, non-static implementation of `key`,
/// searching `info` itself first.
pub fn find_public_impl<P>(
    provider: &P,
    info: &Arc<ClassInfo>,
    key: &MethodKey,
) -> Result<Option<MethodInfo>, ComposeError>
where
    P: StructuralInfoProvider + ?Sized,
{
    for ancestor in all_parents(provider, info)? {
        if let Some(m) = ancestor.find_method(key).filter(|m| m.is_public_impl()) {
            return Ok(Some(m.clone()));
        }
    }
    Ok(None)
}

/// Whether `target` is `info` or on its superclass chain.
///
/// Interfaces are not consulted: a trait's concrete parent must be a class
/// the base actually extends.
pub fn extends<P>(provider: &P, info: &Arc<ClassInfo>, target: &Symbol) -> Result<bool, ComposeError>
where
    P: StructuralInfoProvider + ?Sized,
{
    if target.is_object() {
        return Ok(true);
    }
    let mut current = Some(Arc::clone(info));
    let mut seen = FxHashSet::default();
    while let Some(info) = current {
        if &info.name == target {
            return Ok(true);
        }
        if !seen.insert(info.name.clone()) {
            break;
        }
        current = match info.superclass.as_ref() {
            Some(superclass) => provider.resolve(superclass)?,
            None => None,
        };
    }
    Ok(false)
}

/// Whether a value of type `from` may be used where `to` is expected.
pub fn is_assignable<P>(provider: &P, from: &Ty, to: &Ty) -> Result<bool, ComposeError>
where
    P: StructuralInfoProvider + ?Sized,
{
    match (from, to) {
        _ if from == to => Ok(true),
        (Ty::Str | Ty::Object(_), Ty::Object(root)) if root.is_object() => Ok(true),
        (Ty::Object(from), Ty::Object(to)) => match provider.resolve(from)? {
            Some(info) => Ok(all_parents(provider, &info)?
                .iter()
                .any(|ancestor| &ancestor.name == to)),
            None => Ok(false),
        },
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Infos;
    use pretty_assertions::assert_eq;
    use weft_ir::{MethodDecl, MethodSig, TypeDecl, Value};

    fn noop() -> MethodDecl {
        MethodDecl::new("tick", MethodSig::unit()).body(|_, _| Ok(Value::Void))
    }

    fn hierarchy() -> Infos {
        Infos::new([
            TypeDecl::interface("Renderable"),
            TypeDecl::interface("Ticking").implements("Renderable"),
            TypeDecl::class("Tile").implements("Ticking").method(noop()),
            TypeDecl::class("Chest")
                .extends("Tile")
                .implements("Renderable")
                .method(MethodDecl::new("tick", MethodSig::unit())),
        ])
    }

    #[test]
    fn parents_are_preorder_and_unique() {
        let infos = hierarchy();
        let names: Vec<String> = all_parents(&infos, &infos.get("Chest"))
            .unwrap()
            .iter()
            .map(|i| i.name.to_string())
            .collect();
        assert_eq!(names, ["Chest", "Tile", "Object", "Ticking", "Renderable"]);
    }

    #[test]
    fn unresolved_ancestors_are_skipped() {
        let infos = Infos::new([TypeDecl::class("Lone").implements("Missing")]);
        let parents = all_parents(&infos, &infos.get("Lone")).unwrap();
        assert_eq!(parents.len(), 2);
    }

    #[test]
    fn public_impl_skips_abstract_redeclaration() {
        let infos = hierarchy();
        let key = MethodKey::new("tick", MethodSig::unit());
        let found = find_public_impl(&infos, &infos.get("Chest"), &key)
            .unwrap()
            .expect("Tile implements tick");
        assert_eq!(found.owner, "Tile");
        assert_eq!(all_methods(&infos, &infos.get("Chest")).unwrap().len(), 2);
    }

    #[test]
    fn extends_follows_superclasses_only() {
        let infos = hierarchy();
        let chest = infos.get("Chest");
        assert!(extends(&infos, &chest, &Symbol::new("Tile")).unwrap());
        assert!(extends(&infos, &chest, &Symbol::object()).unwrap());
        assert!(!extends(&infos, &chest, &Symbol::new("Renderable")).unwrap());
        assert!(!extends(&infos, &infos.get("Tile"), &Symbol::new("Chest")).unwrap());
    }

    #[test]
    fn assignability() {
        let infos = hierarchy();
        let chest = Ty::object("Chest");
        assert!(is_assignable(&infos, &chest, &Ty::object("Tile")).unwrap());
        assert!(is_assignable(&infos, &chest, &Ty::object("Renderable")).unwrap());
        assert!(is_assignable(&infos, &Ty::Str, &Ty::object("Object")).unwrap());
        assert!(!is_assignable(&infos, &Ty::object("Tile"), &chest).unwrap());
        assert!(!is_assignable(&infos, &Ty::Int, &Ty::Float).unwrap());
    }
}
