//! IR builder - positioned instruction emission into an `IrModule`

use super::inst::*;
use crate::common::{CompileError, CompileResult};
use crate::types::IrType;
use std::collections::HashSet;

/// Index of a function inside the module being built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub usize);

/// Builds an IR module one instruction at a time
pub struct IrBuilder {
    module: IrModule,
    current_func: Option<FunctionId>,
    current_block: Option<BlockId>,
    temp_counter: u32,
    string_counter: u32,
}

impl IrBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            module: IrModule::new(name),
            current_func: None,
            current_block: None,
            temp_counter: 0,
            string_counter: 0,
        }
    }

    pub fn module(&self) -> &IrModule {
        &self.module
    }

    pub fn finish(self) -> IrModule {
        self.module
    }

    // === Types and globals ===

    /// Declare an opaque named struct; no-op when it already exists
    pub fn declare_struct(&mut self, name: &str) {
        if self.module.struct_def(name).is_none() {
            self.module.structs.push(IrStruct {
                name: name.to_string(),
                fields: None,
            });
        }
    }

    /// Give a struct its body, declaring it first if needed
    pub fn define_struct(&mut self, name: &str, fields: Vec<IrType>) {
        self.declare_struct(name);
        if let Some(def) = self.module.structs.iter_mut().find(|s| s.name == name) {
            def.fields = Some(fields);
        }
    }

    pub fn struct_fields(&self, name: &str) -> Option<&[IrType]> {
        self.module.struct_def(name)?.fields.as_deref()
    }

    pub fn add_global(&mut self, global: IrGlobal) {
        self.module.globals.push(global);
    }

    /// Intern a string literal as a constant byte array global
    pub fn add_string(&mut self, bytes: Vec<u8>) -> (Value, IrType) {
        let name = format!(".str.{}", self.string_counter);
        self.string_counter += 1;
        let ty = IrType::array(IrType::int(8), bytes.len() as u64);
        self.module.globals.push(IrGlobal {
            name: name.clone(),
            ty: ty.clone(),
            init: Some(GlobalInit::Bytes(bytes)),
            constant: true,
        });
        (Value::Global(name), ty)
    }

    // === Functions ===

    pub fn declare_function(
        &mut self,
        name: &str,
        params: Vec<IrType>,
        return_type: IrType,
        exported: bool,
    ) -> FunctionId {
        let mut func = IrFunction::new(name.to_string(), params, return_type);
        func.exported = exported;
        self.module.functions.push(func);
        FunctionId(self.module.functions.len() - 1)
    }

    pub fn function(&self, id: FunctionId) -> &IrFunction {
        &self.module.functions[id.0]
    }

    pub fn function_id(&self, name: &str) -> Option<FunctionId> {
        self.module
            .functions
            .iter()
            .position(|f| f.name == name)
            .map(FunctionId)
    }

    /// Start emitting the body of `id`; returns the entry block
    pub fn begin_body(&mut self, id: FunctionId) -> BlockId {
        self.module.functions[id.0].blocks.clear();
        self.current_func = Some(id);
        self.temp_counter = 0;
        let entry = self.append_block("entry");
        self.position_at_end(entry);
        entry
    }

    pub fn end_body(&mut self) {
        self.current_func = None;
        self.current_block = None;
    }

    /// Drop a partially emitted body, leaving the function as a declaration
    pub fn discard_body(&mut self, id: FunctionId) {
        self.module.functions[id.0].blocks.clear();
        self.end_body();
    }

    pub fn current_function(&self) -> Option<FunctionId> {
        self.current_func
    }

    // === Blocks ===

    pub fn append_block(&mut self, name: &str) -> BlockId {
        let Some(func) = self.current_func.map(|id| &mut self.module.functions[id.0]) else {
            return BlockId(usize::MAX);
        };
        let id = BlockId(func.blocks.len());
        let name = if id.0 == 0 { name.to_string() } else { format!("{}{}", name, id.0) };
        func.blocks.push(IrBlock::new(id, name));
        id
    }

    pub fn position_at_end(&mut self, block: BlockId) {
        self.current_block = Some(block);
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.current_block
    }

    fn block(&self, id: BlockId) -> Option<&IrBlock> {
        let func = self.current_func?;
        self.module.functions[func.0].blocks.get(id.0)
    }

    fn block_mut(&mut self, id: BlockId) -> Option<&mut IrBlock> {
        let func = self.current_func?;
        self.module.functions[func.0].blocks.get_mut(id.0)
    }

    pub fn block_is_empty(&self, id: BlockId) -> bool {
        self.block(id).is_some_and(IrBlock::is_empty)
    }

    pub fn is_terminated(&self, id: BlockId) -> bool {
        self.block(id).is_some_and(IrBlock::is_terminated)
    }

    /// Whether the insertion block already ends in a terminator
    pub fn current_is_terminated(&self) -> bool {
        self.current_block.is_some_and(|b| self.is_terminated(b))
    }

    /// Whether control can flow from the entry block to `target`
    ///
    /// Branches on a constant condition only follow the taken edge.
    pub fn is_reachable(&self, target: BlockId) -> bool {
        let Some(func) = self.current_func.map(|id| &self.module.functions[id.0]) else {
            return false;
        };
        let mut seen = vec![false; func.blocks.len()];
        let mut pending = vec![BlockId(0)];
        while let Some(id) = pending.pop() {
            if id == target {
                return true;
            }
            let Some(block) = func.blocks.get(id.0) else {
                continue;
            };
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            let successors = match &block.terminator {
                Some(Terminator::Branch { cond: Value::Int(n), then_block, else_block }) => {
                    vec![if *n != 0 { *then_block } else { *else_block }]
                }
                Some(term) => term.successors(),
                None => Vec::new(),
            };
            pending.extend(successors);
        }
        false
    }

    // === Instructions ===

    fn new_temp(&mut self) -> Temp {
        let t = Temp(self.temp_counter);
        self.temp_counter += 1;
        t
    }

    fn emit(&mut self, inst: Inst) {
        if let Some(block) = self.current_block {
            if let Some(block) = self.block_mut(block) {
                block.insts.push(inst);
            }
        }
    }

    /// Stack slot placed among the allocas at the head of the entry block
    pub fn build_entry_alloca(&mut self, ty: IrType) -> Value {
        let dst = self.new_temp();
        if let Some(entry) = self.block_mut(BlockId(0)) {
            let at = entry
                .insts
                .iter()
                .take_while(|i| matches!(i, Inst::Alloca { .. }))
                .count();
            entry.insts.insert(at, Inst::Alloca { dst, ty });
        }
        Value::Temp(dst)
    }

    pub fn build_load(&mut self, ty: IrType, addr: Value) -> Value {
        let dst = self.new_temp();
        self.emit(Inst::Load { dst, ty, addr });
        Value::Temp(dst)
    }

    pub fn build_store(&mut self, ty: IrType, addr: Value, src: Value) {
        self.emit(Inst::Store { ty, addr, src });
    }

    pub fn build_binary(
        &mut self,
        op: BinOp,
        ty: IrType,
        signed: bool,
        left: Value,
        right: Value,
    ) -> Value {
        let dst = self.new_temp();
        self.emit(Inst::Binary { dst, op, ty, signed, left, right });
        Value::Temp(dst)
    }

    pub fn build_compare(
        &mut self,
        op: CmpOp,
        ty: IrType,
        signed: bool,
        left: Value,
        right: Value,
    ) -> Value {
        let dst = self.new_temp();
        self.emit(Inst::Compare { dst, op, ty, signed, left, right });
        Value::Temp(dst)
    }

    pub fn build_unary(&mut self, op: UnOp, ty: IrType, src: Value) -> Value {
        let dst = self.new_temp();
        self.emit(Inst::Unary { dst, op, ty, src });
        Value::Temp(dst)
    }

    pub fn build_cast(&mut self, kind: CastKind, from: IrType, to: IrType, src: Value) -> Value {
        let dst = self.new_temp();
        self.emit(Inst::Cast { dst, kind, from, to, src });
        Value::Temp(dst)
    }

    pub fn build_field_addr(&mut self, struct_name: &str, base: Value, index: usize) -> Value {
        let dst = self.new_temp();
        self.emit(Inst::FieldAddr {
            dst,
            struct_name: struct_name.to_string(),
            base,
            index,
        });
        Value::Temp(dst)
    }

    pub fn build_elem_addr(&mut self, element: IrType, base: Value, index: Value) -> Value {
        let dst = self.new_temp();
        self.emit(Inst::ElemAddr { dst, element, base, index });
        Value::Temp(dst)
    }

    /// Emit a call; void calls yield `Value::Undef`
    pub fn build_call(&mut self, func: Value, args: Vec<Value>, return_type: IrType) -> Value {
        if return_type.is_void() {
            self.emit(Inst::Call { dst: None, func, args, return_type });
            return Value::Undef;
        }
        let dst = self.new_temp();
        self.emit(Inst::Call { dst: Some(dst), func, args, return_type });
        Value::Temp(dst)
    }

    /// End the insertion block
    pub fn terminate(&mut self, term: Terminator) -> CompileResult<()> {
        let Some(id) = self.current_block else {
            return Err(CompileError::codegen("no insertion block for terminator"));
        };
        let Some(block) = self.block_mut(id) else {
            return Err(CompileError::codegen("insertion block does not exist"));
        };
        if block.terminator.is_some() {
            return Err(CompileError::codegen(format!(
                "block `{}` is already terminated",
                block.name
            )));
        }
        block.terminator = Some(term);
        Ok(())
    }
}

/// Check structural well-formedness of a finished module
pub fn verify(module: &IrModule) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();
    let defined: HashSet<&str> = module
        .structs
        .iter()
        .filter(|s| s.fields.is_some())
        .map(|s| s.name.as_str())
        .collect();

    let check_type = |ty: &IrType, context: &str, problems: &mut Vec<String>| {
        let mut names = Vec::new();
        ty.referenced_structs(&mut names);
        for name in names {
            if !defined.contains(name) {
                problems.push(format!("{}: struct `%{}` has no body", context, name));
            }
        }
    };

    for def in &module.structs {
        for field in def.fields.iter().flatten() {
            check_type(field, &format!("struct %{}", def.name), &mut problems);
        }
    }
    for global in &module.globals {
        check_type(&global.ty, &format!("global @{}", global.name), &mut problems);
    }

    for func in module.functions.iter().filter(|f| !f.is_declaration()) {
        let context = format!("function @{}", func.name);
        for param in &func.params {
            check_type(param, &context, &mut problems);
        }
        check_type(&func.return_type, &context, &mut problems);

        for block in &func.blocks {
            for inst in &block.insts {
                for ty in inst.types() {
                    check_type(ty, &context, &mut problems);
                }
                if let Inst::FieldAddr { struct_name, .. } = inst {
                    if !defined.contains(struct_name.as_str()) {
                        problems.push(format!(
                            "{}: field access into undefined struct `%{}`",
                            context, struct_name
                        ));
                    }
                }
            }
            match &block.terminator {
                None => problems.push(format!("{}: block `{}` is not terminated", context, block.name)),
                Some(term) => {
                    for target in term.successors() {
                        if target.0 >= func.blocks.len() {
                            problems.push(format!(
                                "{}: block `{}` branches to missing block {}",
                                context, block.name, target.0
                            ));
                        }
                    }
                }
            }
        }
    }

    if problems.is_empty() { Ok(()) } else { Err(problems) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_function() {
        let mut b = IrBuilder::new("test");
        let f = b.declare_function("main", vec![], IrType::int(32), true);
        b.begin_body(f);
        let sum = b.build_binary(BinOp::Add, IrType::int(32), true, Value::Int(2), Value::Int(3));
        b.terminate(Terminator::Return(Some(sum))).unwrap();
        b.end_body();

        let module = b.finish();
        assert!(verify(&module).is_ok());
        let text = module.to_string();
        assert!(text.contains("export func @main() -> i32"));
        assert!(text.contains("t0 = sadd i32 2, 3"));
        assert!(text.contains("ret t0"));
    }

    #[test]
    fn test_entry_allocas_stay_grouped() {
        let mut b = IrBuilder::new("test");
        let f = b.declare_function("f", vec![], IrType::void(), false);
        b.begin_body(f);
        let slot = b.build_entry_alloca(IrType::int(32));
        b.build_store(IrType::int(32), slot, Value::Int(1));
        let next = b.append_block("body");
        b.position_at_end(next);
        b.build_entry_alloca(IrType::int(8));

        let entry = &b.module().functions[0].blocks[0];
        assert!(matches!(entry.insts[0], Inst::Alloca { .. }));
        assert!(matches!(entry.insts[1], Inst::Alloca { .. }));
        assert!(matches!(entry.insts[2], Inst::Store { .. }));
    }

    #[test]
    fn test_double_terminate_is_rejected() {
        let mut b = IrBuilder::new("test");
        let f = b.declare_function("f", vec![], IrType::void(), false);
        b.begin_body(f);
        b.terminate(Terminator::Return(None)).unwrap();
        assert!(b.terminate(Terminator::Unreachable).is_err());
    }

    #[test]
    fn test_reachability_follows_constant_branches() {
        let mut b = IrBuilder::new("test");
        let f = b.declare_function("f", vec![], IrType::void(), false);
        b.begin_body(f);
        let taken = b.append_block("taken");
        let skipped = b.append_block("skipped");
        let orphan = b.append_block("orphan");
        b.terminate(Terminator::Branch { cond: Value::Int(1), then_block: taken, else_block: skipped })
            .unwrap();

        assert!(b.is_reachable(BlockId(0)));
        assert!(b.is_reachable(taken));
        assert!(!b.is_reachable(skipped));
        assert!(!b.is_reachable(orphan));
    }

    #[test]
    fn test_verify_reports_problems() {
        let mut b = IrBuilder::new("test");
        b.declare_struct("Opaque");
        let f = b.declare_function("f", vec![IrType::ptr(IrType::structure("Opaque"))], IrType::void(), false);
        b.begin_body(f);
        b.append_block("dangling");
        b.terminate(Terminator::Jump(BlockId(7))).unwrap();

        let problems = verify(b.module()).unwrap_err();
        assert!(problems.iter().any(|p| p.contains("%Opaque")));
        assert!(problems.iter().any(|p| p.contains("missing block 7")));
        assert!(problems.iter().any(|p| p.contains("dangling1")));
    }

    #[test]
    fn test_discard_body_leaves_declaration() {
        let mut b = IrBuilder::new("test");
        let f = b.declare_function("f", vec![], IrType::void(), false);
        b.begin_body(f);
        b.build_call(Value::Function("g".into()), vec![], IrType::void());
        b.discard_body(f);
        assert!(b.function(f).is_declaration());
        assert!(b.current_block().is_none());
    }
}
