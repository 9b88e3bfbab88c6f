//! The `CodeGen` struct: the mutable state threaded through every stage
//! of compilation.
//!
//! This is owned by a single [`crate::codegen::program::compile_program`]
//! call (spec.md §5: "process-wide mutable state... owned exclusively by
//! the compilation driver"), not by a process-wide static, so nothing
//! here needs thread-local storage or a `OnceLock` — tests compile many
//! small programs back to back in one process without interference.

use crate::codegen::emitter::AsmEmitter;
use crate::codegen::globals::GlobalTable;
use crate::codegen::header::HeaderAccumulator;
use crate::codegen::virtual_stack::AbstractStack;
use crate::config::CompilerConfig;
use crate::label::LabelAllocator;

pub struct CodeGen {
    pub emitter: AsmEmitter,
    pub header: HeaderAccumulator,
    pub labels: LabelAllocator,
    pub globals: GlobalTable,
    pub abstract_stack: AbstractStack,
    pub config: CompilerConfig,
}

impl CodeGen {
    pub fn new(config: CompilerConfig) -> Self {
        CodeGen {
            emitter: AsmEmitter::new(),
            header: HeaderAccumulator::new(),
            labels: LabelAllocator::new(),
            globals: GlobalTable::new(),
            abstract_stack: AbstractStack::new(),
            config,
        }
    }
}
