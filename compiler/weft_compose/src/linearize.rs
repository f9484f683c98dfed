//! Trait linearization.
//!
//! The linearization of a trait is the linearizations of its parent traits,
//! in declaration order, followed by the trait itself, keeping only the first
//! occurrence of each name. For a set of traits the per-trait results are
//! concatenated in set order and deduplicated the same way.
//!
//! # Design
//!
//! Deduplicating a concatenation is equivalent to a post-order walk that
//! skips names it has already emitted: a name is emitted only after every
//! parent of it, so a skipped subtree was emitted in full earlier. The walk
//! is what runs here; `naive` in the tests is the concatenation.
//!
//! A trait reachable from itself has no linearization and is rejected with
//! [`ComposeError::CyclicTraits`] instead of looping.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use weft_ir::{Symbol, Trait};
use weft_stack::ensure_sufficient_stack;

use crate::error::ComposeError;

/// Composition order for a single trait.
pub fn linearize(t: &Arc<Trait>) -> Result<Vec<Arc<Trait>>, ComposeError> {
    linearize_all(std::slice::from_ref(t))
}

/// Composition order for `traits`, in the given order.
pub fn linearize_all<'a, I>(traits: I) -> Result<Vec<Arc<Trait>>, ComposeError>
where
    I: IntoIterator<Item = &'a Arc<Trait>>,
{
    let mut walk = Walk::default();
    for t in traits {
        walk.visit(t)?;
    }
    Ok(walk.out)
}

#[derive(Default)]
struct Walk {
    emitted: FxHashSet<Symbol>,
    path: Vec<Symbol>,
    out: Vec<Arc<Trait>>,
}

impl Walk {
    fn visit(&mut self, t: &Arc<Trait>) -> Result<(), ComposeError> {
        if self.emitted.contains(&t.name) {
            return Ok(());
        }
        if let Some(start) = self.path.iter().position(|n| n == &t.name) {
            let chain = self.path[start..]
                .iter()
                .chain(std::iter::once(&t.name))
                .map(ToString::to_string)
                .collect();
            return Err(ComposeError::CyclicTraits { chain });
        }

        self.path.push(t.name.clone());
        for parent in &t.parent_traits {
            ensure_sufficient_stack(|| self.visit(parent))?;
        }
        self.path.pop();

        self.emitted.insert(t.name.clone());
        self.out.push(Arc::clone(t));
        Ok(())
    }
}
