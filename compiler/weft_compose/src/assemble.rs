//! Binary assembly of composite definitions.
//!
//! The assembler is the only component that knows the binary format; the
//! loader and dump debugger go through it to read definitions back.
//!
//! # Format
//!
//! ```text
//! magic    b"WEFT"
//! version  u16, little endian
//! payload  bincode-encoded CompositeDef
//! ```
//!
//! Frames are computed while assembling, so a definition handed to
//! [`BinaryAssembler::assemble`] may leave them zeroed.

use crate::def::{CompositeDef, Frame, Target};
use crate::error::ComposeError;

pub const MAGIC: &[u8; 4] = b"WEFT";
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = MAGIC.len() + 2;

/// Turns definitions into loadable bytes and back.
pub trait BinaryAssembler: Send + Sync {
    fn assemble(&self, def: &CompositeDef) -> Result<Vec<u8>, ComposeError>;

    /// Decode bytes produced by [`assemble`](Self::assemble). `name` is only
    /// used for error reporting.
    fn disassemble(&self, name: &str, bytes: &[u8]) -> Result<CompositeDef, ComposeError>;
}

/// The default assembler: a short header followed by a bincode payload.
#[derive(Copy, Clone, Debug, Default)]
pub struct BincodeAssembler;

impl BincodeAssembler {
    pub fn new() -> Self {
        BincodeAssembler
    }
}

fn frame_for(arity: usize, target: Option<&Target>) -> Result<Frame, String> {
    let locals = u16::try_from(arity + 1).map_err(|_| format!("{arity} parameters"))?;
    let stack = match target {
        Some(Target::GetField(_)) => 1,
        Some(Target::SetField(_)) => 2,
        Some(Target::Static(_) | Target::Special(_) | Target::Virtual(_)) | None => locals,
    };
    Ok(Frame { locals, stack })
}

fn with_frames(def: &CompositeDef) -> Result<CompositeDef, ComposeError> {
    let fail = |reason: String| ComposeError::Assembly {
        name: def.name.to_string(),
        reason,
    };
    let mut def = def.clone();
    for ctor in &mut def.constructors {
        ctor.frame = frame_for(ctor.key.sig.arity(), None).map_err(fail)?;
    }
    for m in &mut def.methods {
        m.frame = frame_for(m.key.sig.arity(), Some(&m.target)).map_err(fail)?;
    }
    Ok(def)
}

impl BinaryAssembler for BincodeAssembler {
    #[tracing::instrument(level = "trace", skip_all, fields(composite = %def.name))]
    fn assemble(&self, def: &CompositeDef) -> Result<Vec<u8>, ComposeError> {
        let def = with_frames(def)?;
        let payload = bincode::serialize(&def).map_err(|e| ComposeError::Assembly {
            name: def.name.to_string(),
            reason: e.to_string(),
        })?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&payload);
        tracing::trace!(len = bytes.len(), "assembled");
        Ok(bytes)
    }

    fn disassemble(&self, name: &str, bytes: &[u8]) -> Result<CompositeDef, ComposeError> {
        let fail = |reason: String| ComposeError::Assembly {
            name: name.to_owned(),
            reason,
        };
        let Some((magic, rest)) = bytes.split_first_chunk::<4>() else {
            return Err(fail("truncated header".to_owned()));
        };
        if magic != MAGIC {
            return Err(fail("bad magic".to_owned()));
        }
        let Some((version, payload)) = rest.split_first_chunk::<2>() else {
            return Err(fail("truncated header".to_owned()));
        };
        let version = u16::from_le_bytes(*version);
        if version != FORMAT_VERSION {
            return Err(fail(format!("unsupported format version {version}")));
        }
        bincode::deserialize(payload).map_err(|e| fail(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{CtorDef, EntryPoint, MethodDef, SlotDef};
    use pretty_assertions::assert_eq;
    use weft_ir::{MemberFlags, MethodKey, MethodSig, Symbol, Ty};

    fn sample() -> CompositeDef {
        let bump = MethodKey::new("bump", MethodSig::new([Ty::Int, Ty::Int], Ty::Void));
        CompositeDef {
            name: Symbol::new("Tile_counter$$0"),
            base: Symbol::new("Tile"),
            interfaces: vec![Symbol::new("Counter")],
            composed: vec![Symbol::new("Counter")],
            supertypes: vec![Symbol::new("Tile"), Symbol::object(), Symbol::new("Counter")],
            slots: vec![SlotDef {
                name: Symbol::new("Counter$$value"),
                ty: Ty::Int,
                owner: Symbol::new("Counter"),
                private: true,
            }],
            constructors: vec![CtorDef {
                key: MethodKey::constructor([Ty::Str]),
                base: Some(EntryPoint::new("Tile", MethodKey::constructor([Ty::Str]))),
                initializers: vec![EntryPoint::initializer("Counter")],
                frame: Frame::default(),
            }],
            methods: vec![
                MethodDef::new(
                    MethodKey::new("Counter$$value", MethodSig::nullary(Ty::Int)),
                    Target::GetField(0),
                ),
                MethodDef::new(
                    MethodKey::new("Counter$$value_$eq", MethodSig::new([Ty::Int], Ty::Void)),
                    Target::SetField(0),
                ),
                MethodDef::new(
                    bump.clone(),
                    Target::Static(EntryPoint::new("Counter", MethodKey::new("bump$", bump.sig.clone()))),
                )
                .with_flags(MemberFlags::SYNTHETIC),
            ],
        }
    }

    #[test]
    fn frames_follow_arity() {
        let assembler = BincodeAssembler::new();
        let bytes = assembler.assemble(&sample()).unwrap();
        assert_eq!(&bytes[..4], MAGIC);

        let def = assembler.disassemble("Tile_counter$$0", &bytes).unwrap();
        let frames: Vec<Frame> = def.methods.iter().map(|m| m.frame).collect();
        assert_eq!(
            frames,
            [
                Frame { locals: 1, stack: 1 },
                Frame { locals: 2, stack: 2 },
                Frame { locals: 3, stack: 3 },
            ]
        );
        assert_eq!(def.constructors[0].frame, Frame { locals: 2, stack: 2 });
    }

    #[test]
    fn decoded_matches_input_apart_from_frames() {
        let assembler = BincodeAssembler::new();
        let original = sample();
        let mut decoded = assembler
            .disassemble("x", &assembler.assemble(&original).unwrap())
            .unwrap();
        for m in &mut decoded.methods {
            m.frame = Frame::default();
        }
        for c in &mut decoded.constructors {
            c.frame = Frame::default();
        }
        assert_eq!(decoded, original);
    }

    #[test]
    fn rejects_foreign_bytes() {
        let assembler = BincodeAssembler::new();
        let err = assembler.disassemble("x", b"JAVA\x01\x00").unwrap_err();
        assert!(err.to_string().contains("bad magic"));

        let err = assembler.disassemble("x", b"WE").unwrap_err();
        assert!(err.to_string().contains("truncated"));

        let mut bytes = assembler.assemble(&sample()).unwrap();
        bytes[4] = 9;
        let err = assembler.disassemble("x", &bytes).unwrap_err();
        assert!(err.to_string().contains("version 9"));
    }
}
