//! The structured function builder.
//!
//! Lowering code appends instructions through [`FunctionBuilder::emit`],
//! declares forward jump targets with [`FunctionBuilder::new_label`] /
//! [`FunctionBuilder::bind`], and requests result slots with
//! [`FunctionBuilder::alloc_temp`]. The builder materializes temporaries
//! into `::tempN` locals on first write, recycles them through a per-type
//! free list once consumed, drops self-assignments, and tracks the source
//! location of every appended instruction. [`FunctionBuilder::finish`]
//! rewrites labels into signed instruction offsets and moves the result
//! into a [`PexFunction`].

use papyrus_core::diagnostics::Diagnostics;
use papyrus_core::error::Fatal;
use papyrus_core::location::FileLocation;
use rustc_hash::FxHashMap;

use crate::ty::Ty;

use super::file::{PexFile, PexString};
use super::function::{PexDebugFunctionInfo, PexFunction, PexLocalVariable};
use super::instruction::Instruction;
use super::opcode::Opcode;
use super::value::{Label, PexValue, TempVar};

#[derive(Debug)]
struct TempSlot {
    ty: PexString,
    local: Option<PexString>,
}

pub struct FunctionBuilder<'a> {
    file: &'a mut PexFile,
    diags: &'a mut Diagnostics,
    instructions: Vec<Instruction>,
    instruction_locations: Vec<FileLocation>,
    locals: Vec<PexLocalVariable>,
    labels: Vec<Option<usize>>,
    temps: Vec<TempSlot>,
    /// Recyclable `::tempN` locals, keyed by type.
    free_temps: FxHashMap<PexString, Vec<PexString>>,
    /// Type of every `::tempN` local, for free-list bookkeeping.
    temp_types: FxHashMap<PexString, PexString>,
    temp_counter: u32,
    current_location: FileLocation,
}

impl<'a> FunctionBuilder<'a> {
    pub fn new(file: &'a mut PexFile, diags: &'a mut Diagnostics, location: FileLocation) -> Self {
        Self {
            file,
            diags,
            instructions: Vec::new(),
            instruction_locations: Vec::new(),
            locals: Vec::new(),
            labels: Vec::new(),
            temps: Vec::new(),
            free_temps: FxHashMap::default(),
            temp_types: FxHashMap::default(),
            temp_counter: 0,
            current_location: location,
        }
    }

    /// The source location recorded for subsequently emitted instructions.
    pub fn set_location(&mut self, location: FileLocation) {
        self.current_location = location;
    }

    pub fn location(&self) -> &FileLocation {
        &self.current_location
    }

    pub fn file(&mut self) -> &mut PexFile {
        self.file
    }

    pub fn diags(&mut self) -> &mut Diagnostics {
        self.diags
    }

    pub fn intern(&mut self, s: &str) -> PexString {
        self.file.get_string(s)
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Allocate a label with no target yet.
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() as u32 - 1)
    }

    /// Bind `label` to the next instruction to be emitted.
    pub fn bind(&mut self, label: Label) {
        self.labels[label.0 as usize] = Some(self.instructions.len());
    }

    /// Allocate a temporary slot of the given type. A concrete local is
    /// attached the first time the temp appears in a destination operand.
    pub fn alloc_temp(&mut self, ty: &Ty) -> TempVar {
        let ty = self.file.get_string(&ty.to_string());
        self.temps.push(TempSlot { ty, local: None });
        TempVar(self.temps.len() as u32 - 1)
    }

    /// The cached `::nonevar` local, allocated on first use.
    pub fn none_local(&mut self, location: &FileLocation) -> PexValue {
        let name = self.file.get_string("::nonevar");
        if self.locals.iter().any(|l| l.name == name) {
            return PexValue::Identifier(name);
        }
        self.allocate_local("::nonevar", &Ty::none(location.clone()))
    }

    /// Add a named local of the given type.
    pub fn allocate_local(&mut self, name: &str, ty: &Ty) -> PexValue {
        let name = self.file.get_string(name);
        let ty = self.file.get_string(&ty.to_string());
        self.locals.push(PexLocalVariable { name, ty });
        PexValue::Identifier(name)
    }

    /// Append an instruction.
    ///
    /// Operand temps that have been materialized are rewritten to their
    /// locals and their locals returned to the free list; the destination
    /// operand (per the opcode's dest index) gets a recycled or fresh
    /// `::tempN` local attached.
    pub fn emit(&mut self, mut instr: Instruction) -> Result<(), Fatal> {
        for i in 0..instr.args.len() {
            self.resolve_operand(&mut instr.args[i])?;
        }
        for i in 0..instr.variadic_args.len() {
            self.resolve_operand(&mut instr.variadic_args[i])?;
        }

        if let Some(idx) = instr.opcode.dest_arg_index() {
            if let PexValue::Temp(t) = instr.args[idx] {
                let ty = self.temps[t.0 as usize].ty;
                let recycled = self.free_temps.get_mut(&ty).and_then(|v| v.pop());
                let name = match recycled {
                    Some(name) => name,
                    None => {
                        let name = self.file.get_string(&format!("::temp{}", self.temp_counter));
                        self.temp_counter += 1;
                        self.temp_types.insert(name, ty);
                        self.locals.push(PexLocalVariable { name, ty });
                        name
                    }
                };
                self.temps[t.0 as usize].local = Some(name);
                instr.args[idx] = PexValue::Identifier(name);
            }
        }

        for v in instr.args.iter().chain(instr.variadic_args.iter()) {
            if let PexValue::Temp(_) = v {
                return Err(self
                    .diags
                    .logical_fatal("Attempted to use a temporary var before it has been assigned!"));
            }
        }

        // Dead self-assignments produce nothing.
        if instr.opcode == Opcode::Assign {
            if let (PexValue::Identifier(dst), PexValue::Identifier(src)) = (instr.args[0], instr.args[1]) {
                if dst == src {
                    return Ok(());
                }
            }
        }

        self.instruction_locations.push(self.current_location.clone());
        self.instructions.push(instr);
        Ok(())
    }

    fn resolve_operand(&mut self, v: &mut PexValue) -> Result<(), Fatal> {
        if let PexValue::Invalid = v {
            return Err(self.diags.fatal(
                &self.current_location,
                "Attempted to use an invalid value as a value! \
                 (perhaps you tried to use the return value of a function that doesn't return?)",
            ));
        }
        if let PexValue::Temp(t) = *v {
            if let Some(name) = self.temps[t.0 as usize].local {
                *v = PexValue::Identifier(name);
            }
        }
        self.free_value_if_temp(v);
        Ok(())
    }

    /// Return a consumed `::tempN` operand's local to the free list.
    fn free_value_if_temp(&mut self, v: &PexValue) {
        let name = match v {
            PexValue::Identifier(name) => *name,
            _ => return,
        };
        if let Some(&ty) = self.temp_types.get(&name) {
            self.free_temps.entry(ty).or_default().push(name);
        }
    }

    /// Finalize: resolve labels to signed offsets, verify every temp was
    /// materialized, transfer instructions and locals to `func`, and emit
    /// the 16-bit instruction-to-line debug map.
    pub fn finish(
        mut self,
        func: &mut PexFunction,
        debug_info: &mut PexDebugFunctionInfo,
    ) -> Result<(), Fatal> {
        for i in 0..self.instructions.len() {
            for arg in self.instructions[i].args.iter_mut() {
                if let PexValue::Label(l) = *arg {
                    match self.labels[l.0 as usize] {
                        Some(target) => *arg = PexValue::Integer(target as i32 - i as i32),
                        None => return Err(self.diags.logical_fatal("Unresolved label!")),
                    }
                }
            }
        }

        if self.labels.iter().any(|l| l.is_none()) {
            return Err(self.diags.logical_fatal("Unused unresolved label!"));
        }

        if self.temps.iter().any(|t| t.local.is_none()) {
            return Err(self.diags.logical_fatal("Unresolved temp var!"));
        }

        func.instructions = std::mem::take(&mut self.instructions);
        func.locals = std::mem::take(&mut self.locals);

        debug_info.instruction_line_map.reserve(self.instruction_locations.len());
        for loc in &self.instruction_locations {
            if loc.line > u16::MAX as u32 {
                return Err(self.diags.fatal(
                    loc,
                    "The file has too many lines for the debug info to be able to map correctly!",
                ));
            }
            debug_info.instruction_line_map.push(loc.line as u16);
        }

        Ok(())
    }
}
