//! Composite type definitions.
//!
//! A `CompositeDef` is the symbolic description of a synthesized type: its
//! storage slots, constructors and method table. Method targets name code by
//! [`EntryPoint`] rather than holding it, so a definition can be assembled to
//! bytes, dumped, and linked again by a loader that owns the code table.

use std::fmt;

use serde::{Deserialize, Serialize};
use weft_ir::{MemberFlags, MethodKey, MethodSig, Symbol, Ty};

/// A piece of linkable code: a method `key` declared on `owner`.
///
/// Trait implementation entries are declared on the trait under their
/// static name (`tick$`); inherited implementations on the declaring type
/// under their own key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryPoint {
    pub owner: Symbol,
    pub key: MethodKey,
}

impl EntryPoint {
    pub fn new(owner: impl Into<Symbol>, key: MethodKey) -> Self {
        EntryPoint {
            owner: owner.into(),
            key,
        }
    }

    /// The trait initializer, `$init$() -> void` on `owner`.
    pub fn initializer(owner: impl Into<Symbol>) -> Self {
        EntryPoint::new(
            owner,
            MethodKey::new(weft_ir::Trait::initializer_name(), MethodSig::unit()),
        )
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.key)
    }
}

/// Operand and local sizing of one member, computed at assembly.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Receiver plus parameters.
    pub locals: u16,
    /// Deepest operand stack the member's dispatch needs.
    pub stack: u16,
}

/// A storage slot on the composite.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDef {
    pub name: Symbol,
    pub ty: Ty,
    /// Trait that contributed the slot.
    pub owner: Symbol,
    pub private: bool,
}

/// A composite constructor.
///
/// Runs the base constructor with the caller's arguments, then every
/// initializer with none, in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtorDef {
    pub key: MethodKey,
    /// `None` when the base constructor has no body to run.
    pub base: Option<EntryPoint>,
    pub initializers: Vec<EntryPoint>,
    pub frame: Frame,
}

/// How a method-table entry is carried out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// Call a trait's static implementation entry, receiver first.
    Static(EntryPoint),
    /// Call an ancestor implementation without virtual dispatch.
    Special(EntryPoint),
    /// Read slot `n`.
    GetField(u32),
    /// Write slot `n`.
    SetField(u32),
    /// Re-dispatch on the receiver under another key.
    Virtual(MethodKey),
}

impl Target {
    /// The code this target links against, if any.
    pub fn entry(&self) -> Option<&EntryPoint> {
        match self {
            Target::Static(entry) | Target::Special(entry) => Some(entry),
            Target::GetField(_) | Target::SetField(_) | Target::Virtual(_) => None,
        }
    }
}

/// A method-table entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDef {
    pub key: MethodKey,
    pub flags: MemberFlags,
    pub target: Target,
    pub frame: Frame,
}

impl MethodDef {
    pub fn new(key: MethodKey, target: Target) -> Self {
        MethodDef {
            key,
            flags: MemberFlags::empty(),
            target,
            frame: Frame::default(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: MemberFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[inline]
    pub fn is_bridge(&self) -> bool {
        self.flags.contains(MemberFlags::BRIDGE)
    }
}

/// A synthesized composite type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeDef {
    pub name: Symbol,
    pub base: Symbol,
    /// The selected traits, in the order they were requested.
    pub interfaces: Vec<Symbol>,
    /// Linearized traits, in composition order.
    pub composed: Vec<Symbol>,
    /// Every type an instance is also an instance of.
    pub supertypes: Vec<Symbol>,
    pub slots: Vec<SlotDef>,
    pub constructors: Vec<CtorDef>,
    pub methods: Vec<MethodDef>,
}

impl CompositeDef {
    pub fn method(&self, key: &MethodKey) -> Option<&MethodDef> {
        self.methods.iter().find(|m| &m.key == key)
    }

    /// Method-table entries named `name`, in emission order.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodDef> + 'a {
        self.methods.iter().filter(move |m| m.key.name == name)
    }

    pub fn constructor(&self, key: &MethodKey) -> Option<&CtorDef> {
        self.constructors.iter().find(|c| &c.key == key)
    }

    pub fn slot(&self, name: &str) -> Option<(u32, &SlotDef)> {
        self.slots
            .iter()
            .enumerate()
            .find(|(_, s)| s.name == name)
            .and_then(|(i, s)| Some((u32::try_from(i).ok()?, s)))
    }

    /// Every entry point the definition links against.
    pub fn entries(&self) -> impl Iterator<Item = &EntryPoint> {
        let ctors = self
            .constructors
            .iter()
            .flat_map(|c| c.base.iter().chain(c.initializers.iter()));
        ctors.chain(self.methods.iter().filter_map(|m| m.target.entry()))
    }
}

impl fmt::Display for CompositeDef {
    /// Listing used by text dumps.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "composite {} extends {}", self.name, self.base)?;
        if !self.interfaces.is_empty() {
            let names: Vec<&str> = self.interfaces.iter().map(Symbol::as_str).collect();
            writeln!(f, "  implements {}", names.join(", "))?;
        }
        for (i, slot) in self.slots.iter().enumerate() {
            let vis = if slot.private { "private" } else { "public" };
            writeln!(f, "  slot #{i} {vis} {}: {} ({})", slot.name, slot.ty, slot.owner)?;
        }
        for ctor in &self.constructors {
            writeln!(
                f,
                "  ctor {} [locals={} stack={}]",
                ctor.key.sig, ctor.frame.locals, ctor.frame.stack
            )?;
            match &ctor.base {
                Some(base) => writeln!(f, "    special {base}")?,
                None => writeln!(f, "    special <empty>")?,
            }
            for init in &ctor.initializers {
                writeln!(f, "    static {init}")?;
            }
        }
        for m in &self.methods {
            write!(f, "  method {}", m.key)?;
            if !m.flags.is_empty() {
                write!(f, " {:?}", m.flags)?;
            }
            writeln!(f, " [locals={} stack={}]", m.frame.locals, m.frame.stack)?;
            match &m.target {
                Target::Static(entry) => writeln!(f, "    static {entry}")?,
                Target::Special(entry) => writeln!(f, "    special {entry}")?,
                Target::GetField(slot) => writeln!(f, "    getfield #{slot}")?,
                Target::SetField(slot) => writeln!(f, "    putfield #{slot}")?,
                Target::Virtual(key) => writeln!(f, "    virtual {key}")?,
            }
        }
        Ok(())
    }
}
