//! Hooks observing every defined composite.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use weft_ir::Symbol;

use crate::assemble::{BinaryAssembler, BincodeAssembler};
use crate::config::{DumpConfig, DumpKind};

/// Receives a copy of every composite binary just before it is defined.
///
/// A debugger must not fail composition: problems are logged and swallowed.
pub trait Debugger: Send + Sync {
    fn define(&self, name: &Symbol, binary: &[u8]);
}

/// Does nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullDebugger;

impl Debugger for NullDebugger {
    fn define(&self, _name: &Symbol, _binary: &[u8]) {}
}

/// Writes one file per composite into a directory.
///
/// The directory is emptied when the debugger is created. Text dumps that
/// cannot be decoded fall back to the raw bytes.
pub struct DumpDebugger {
    dir: PathBuf,
    kind: DumpKind,
    assembler: Arc<dyn BinaryAssembler>,
}

impl DumpDebugger {
    pub fn new(config: &DumpConfig) -> Self {
        Self::with_assembler(config, Arc::new(BincodeAssembler::new()))
    }

    pub fn with_assembler(config: &DumpConfig, assembler: Arc<dyn BinaryAssembler>) -> Self {
        if config.dir.exists() {
            if let Err(err) = fs::remove_dir_all(&config.dir) {
                tracing::error!(dir = %config.dir.display(), %err, "failed to clear dump directory");
            }
        }
        if let Err(err) = fs::create_dir_all(&config.dir) {
            tracing::error!(dir = %config.dir.display(), %err, "failed to create dump directory");
        }
        DumpDebugger {
            dir: config.dir.clone(),
            kind: config.kind,
            assembler,
        }
    }

    fn path(&self, name: &Symbol, kind: DumpKind) -> PathBuf {
        self.dir.join(format!("{}.{}", name.flattened(), kind.extension()))
    }

    fn dump_binary(&self, name: &Symbol, binary: &[u8]) {
        let path = self.path(name, DumpKind::Binary);
        if let Err(err) = fs::write(&path, binary) {
            tracing::error!(path = %path.display(), %err, "failed to dump composite");
        }
    }
}

impl Debugger for DumpDebugger {
    fn define(&self, name: &Symbol, binary: &[u8]) {
        match self.kind {
            DumpKind::Binary => self.dump_binary(name, binary),
            DumpKind::Text => match self.assembler.disassemble(name.as_str(), binary) {
                Ok(def) => {
                    let path = self.path(name, DumpKind::Text);
                    if let Err(err) = fs::write(&path, def.to_string()) {
                        tracing::error!(path = %path.display(), %err, "failed to dump composite");
                    }
                }
                Err(err) => {
                    tracing::error!(composite = %name, %err, "text dump failed, dumping binary");
                    self.dump_binary(name, binary);
                }
            },
        }
    }
}
