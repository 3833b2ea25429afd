//! End-to-end analyzer scenarios: source in, IR and diagnostics out

use super::*;
use crate::common::{ErrorKind, Span};
use crate::frontend::parser::Parser;
use crate::ir::{BinOp, GlobalInit, Inst, IrFunction, Terminator};
use crate::types::IrType;
use pretty_assertions::assert_eq;

fn parse(source: &str) -> Module {
    Parser::new(source).parse_module().unwrap()
}

fn compile(source: &str) -> (IrModule, Diagnostics) {
    let module = parse(source);
    let analysis = analyze(&module, "test");
    (analysis.module, analysis.diagnostics)
}

fn function<'m>(module: &'m IrModule, name: &str) -> &'m IrFunction {
    module
        .function(name)
        .unwrap_or_else(|| panic!("function `{}` missing from\n{}", name, module))
}

fn messages(diagnostics: &Diagnostics) -> Vec<String> {
    diagnostics.iter().map(|e| format!("{:?}: {}", e.kind, e.message)).collect()
}

fn has_block(func: &IrFunction, prefix: &str) -> bool {
    func.blocks.iter().any(|b| b.name.starts_with(prefix))
}

fn calls(func: &IrFunction) -> Vec<String> {
    func.insts()
        .filter_map(|inst| match inst {
            Inst::Call { func: Value::Function(name), .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_constant_arguments_need_no_cast_instructions() {
    let (module, diagnostics) = compile(
        "func add(a: int, b: int) => int { return a + b }\n\
         func main() => int { return add(2, 3) }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));

    let add = function(&module, "add");
    let binaries: Vec<_> = add
        .insts()
        .filter_map(|inst| match inst {
            Inst::Binary { op, ty, signed, .. } => Some((*op, ty.clone(), *signed)),
            _ => None,
        })
        .collect();
    assert_eq!(binaries, vec![(BinOp::Add, IrType::int(32), true)]);

    for name in ["add", "main"] {
        let casts = function(&module, name).insts().filter(|i| matches!(i, Inst::Cast { .. })).count();
        assert_eq!(casts, 0, "unexpected cast in `{}`", name);
    }
    assert_eq!(calls(function(&module, "main")), vec!["add".to_string()]);
}

#[test]
fn test_single_return_is_emitted_in_place() {
    let (module, diagnostics) = compile(
        "func one(x: int) => int { return x }\n\
         func two(x: int) => int {\n\
             if x > 0 { return 1 }\n\
             return 2\n\
         }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));

    let one = function(&module, "one");
    assert_eq!(one.returns(), 1);
    assert!(!has_block(one, "return"));

    let two = function(&module, "two");
    assert_eq!(two.returns(), 1);
    assert!(has_block(two, "return"));
    let jumps_to_exit = two
        .blocks
        .iter()
        .filter(|b| matches!(&b.terminator, Some(Terminator::Jump(t)) if two.blocks[t.0].name.starts_with("return")))
        .count();
    assert_eq!(jumps_to_exit, 2);
}

#[test]
fn test_missing_return_is_reported() {
    let (module, diagnostics) = compile("func f() => int { let x = 1 }");
    assert_eq!(diagnostics.count(ErrorKind::NoReturn), 1);
    assert!(function(&module, "f").is_declaration());
}

#[test]
fn test_condition_must_be_boolean() {
    let (_, diagnostics) = compile("func f(x: int) { if x { } }\nfunc g(x: int) { while x + 1 { } }");
    assert_eq!(diagnostics.count(ErrorKind::NotBoolean), 2);
}

#[test]
fn test_empty_branches_route_to_merge() {
    let (module, diagnostics) = compile("func f(c: bool) { if c { } else { } }");
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));

    let f = function(&module, "f");
    assert!(!has_block(f, "then"));
    assert!(!has_block(f, "else"));
    match &f.blocks[0].terminator {
        Some(Terminator::Branch { then_block, else_block, .. }) => {
            assert_eq!(then_block, else_block);
            assert!(f.blocks[then_block.0].name.starts_with("endif"));
        }
        other => panic!("expected a branch, found {:?}", other),
    }
}

#[test]
fn test_empty_merge_block_becomes_loop_header() {
    let (module, diagnostics) = compile(
        "func reuse(c: bool) {\n\
             if c { }\n\
             while c { }\n\
         }\n\
         func fresh(c: bool) { while c { } }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));

    let reuse = function(&module, "reuse");
    assert!(!has_block(reuse, "while"));
    let header = reuse.blocks.iter().find(|b| b.name.starts_with("endif")).unwrap();
    assert!(matches!(
        &header.terminator,
        Some(Terminator::Branch { then_block, .. }) if *then_block == header.id
    ));

    let fresh = function(&module, "fresh");
    assert!(has_block(fresh, "while"));
    assert!(matches!(fresh.blocks[0].terminator, Some(Terminator::Jump(_))));
}

#[test]
fn test_break_outside_loop() {
    let (_, diagnostics) = compile("func f() { break }");
    assert_eq!(diagnostics.count(ErrorKind::InvalidOperation), 1);
}

#[test]
fn test_dot_chains() {
    let (module, diagnostics) = compile(
        "template Point {\n\
             x: int\n\
             y: int\n\
             func sum(self) => int { return self.x + self.y }\n\
             func origin() => int { return 0 }\n\
             func move_to(self, x: int) { self.x = x }\n\
         }\n\
         func total(p: &Point) => int {\n\
             p.move_to(3)\n\
             return p.sum() + Point.origin() + p.x\n\
         }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));

    assert_eq!(
        calls(function(&module, "total")),
        vec!["Point.move_to".to_string(), "Point.sum".to_string(), "Point.origin".to_string()]
    );
    let field_reads = function(&module, "Point.sum")
        .insts()
        .filter(|i| matches!(i, Inst::FieldAddr { struct_name, .. } if struct_name == "Point"))
        .count();
    assert_eq!(field_reads, 2);
}

#[test]
fn test_member_access_errors() {
    let (_, diagnostics) = compile(
        "template Point {\n\
             x: int\n\
             func sum(self) => int { return x }\n\
         }\n\
         func a() => int { return Point.sum() }\n\
         func b(n: int) => int { return n.x }",
    );
    assert_eq!(diagnostics.count(ErrorKind::NonInstance), 3, "{:?}", messages(&diagnostics));
}

#[test]
fn test_argument_checks() {
    let (_, diagnostics) = compile(
        "func take(a: int) { }\n\
         func few() { take() }\n\
         func wrong() { take(1.5) }\n\
         func value() { let n = 3\n n() }",
    );
    assert_eq!(diagnostics.count(ErrorKind::ArgCountMismatch), 1);
    assert_eq!(diagnostics.count(ErrorKind::NoImplicitCast), 1);
    assert_eq!(diagnostics.count(ErrorKind::NonFunction), 1);
}

#[test]
fn test_assigning_constants_is_rejected() {
    let (_, diagnostics) = compile(
        "const LIMIT = 10\n\
         func a() { LIMIT = 3 }\n\
         func b() { const x = 1\n x = 2 }\n\
         func c(n: int) { let y = n\n y = 4 }",
    );
    assert_eq!(diagnostics.count(ErrorKind::ConstViolation), 2, "{:?}", messages(&diagnostics));
    assert_eq!(diagnostics.len(), 2);
}

#[test]
fn test_error_aborts_only_its_declaration() {
    let (module, diagnostics) = compile(
        "func broken() => int { return missing }\n\
         func fine() => int { return 1 }\n\
         template Bad { field: Nowhere }\n\
         template Good { n: int }",
    );
    assert_eq!(diagnostics.count(ErrorKind::CannotFind), 1);
    assert_eq!(diagnostics.count(ErrorKind::UnknownType), 1);
    assert!(function(&module, "broken").is_declaration());
    assert!(!function(&module, "fine").is_declaration());
    assert!(module.struct_def("Good").and_then(|s| s.fields.as_ref()).is_some());
}

#[test]
fn test_forward_references() {
    let (module, diagnostics) = compile(
        "func first() => int { return second() }\n\
         func second() => int { return LIMIT }\n\
         const LIMIT: int = 7\n\
         template A { b: B }\n\
         template B { n: int }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    assert_eq!(calls(function(&module, "first")), vec!["second".to_string()]);
    assert_eq!(
        module.struct_def("A").and_then(|s| s.fields.clone()),
        Some(vec![IrType::structure("B".to_string())])
    );
}

#[test]
fn test_literal_narrowing() {
    let (module, diagnostics) = compile(
        "func f() { let a: uint8 = 300 }\n\
         const WRAPPED: uint8 = 300 as uint8",
    );
    assert_eq!(diagnostics.count(ErrorKind::NoImplicitCast), 1);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(module.global("WRAPPED").and_then(|g| g.init.clone()), Some(GlobalInit::Int(44)));
}

fn returned_value(func: &IrFunction) -> Option<Value> {
    func.blocks.iter().find_map(|b| match &b.terminator {
        Some(Terminator::Return(value)) => value.clone(),
        _ => None,
    })
}

#[test]
fn test_constant_arithmetic_folds_exactly() {
    let (module, diagnostics) = compile(
        "func a() => int { return 200 + 100 }\n\
         func b() => int { return 1 - 2 }\n\
         func c() => int {\n\
             let x: int = 255 + 1\n\
             return x\n\
         }\n\
         func d(x: int) => int { return x + 70000 }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    assert_eq!(returned_value(function(&module, "a")), Some(Value::Int(300)));
    assert_eq!(returned_value(function(&module, "b")), Some(Value::Int(-1)));

    let stored: Vec<Value> = function(&module, "c")
        .insts()
        .filter_map(|inst| match inst {
            Inst::Store { ty, src, .. } if *ty == IrType::int(32) => Some(src.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(stored, vec![Value::Int(256)]);

    let d = function(&module, "d");
    assert!(d.insts().all(|i| !matches!(i, Inst::Cast { .. })));
    assert!(d.insts().any(|i| matches!(
        i,
        Inst::Binary { op: BinOp::Add, ty, right: Value::Int(70000), .. } if *ty == IrType::int(32)
    )));
}

#[test]
fn test_constant_overflow_is_reported() {
    let (_, diagnostics) = compile("func f() => uint64 { return 18446744073709551615 + 1 }");
    assert_eq!(diagnostics.count(ErrorKind::InvalidOperation), 1, "{:?}", messages(&diagnostics));
}

#[test]
fn test_reachable_end_needs_a_return() {
    let (module, diagnostics) = compile(
        "func open(c: bool) => int { if c { return 1 } }\n\
         func closed(c: bool) => int { if c { return 1 } else { return 2 } }\n\
         func forever() => int { while true { return 1 } }",
    );
    assert_eq!(diagnostics.count(ErrorKind::NoReturn), 1, "{:?}", messages(&diagnostics));
    assert_eq!(diagnostics.len(), 1);
    assert!(function(&module, "open").is_declaration());
    assert!(!function(&module, "closed").is_declaration());
    assert!(!function(&module, "forever").is_declaration());
}

#[test]
fn test_templates_cannot_contain_themselves() {
    let (module, diagnostics) = compile(
        "template A { b: B }\n\
         template B { a: A }\n\
         template N { kids: [N; 2] }\n\
         template Link { next: &Link\n items: [int; 2] }",
    );
    assert_eq!(diagnostics.count(ErrorKind::InvalidOperation), 2, "{:?}", messages(&diagnostics));
    assert_eq!(diagnostics.len(), 2);
    assert!(messages(&diagnostics).iter().any(|m| m.contains("B -> A -> B")));
    assert!(messages(&diagnostics).iter().any(|m| m.contains("N -> N")));
    assert!(module.struct_def("Link").and_then(|s| s.fields.as_ref()).is_some());
}

#[test]
fn test_logical_operators_short_circuit() {
    let (module, diagnostics) = compile(
        "func both(a: bool, b: bool) => bool { return a && b }\n\
         func either(a: bool, b: bool) => bool { return a || b }\n\
         func never(b: bool) => bool { return false && b }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));

    for (name, rhs_on_true) in [("both", true), ("either", false)] {
        let func = function(&module, name);
        assert!(has_block(func, "rhs"));
        assert!(has_block(func, "endlogic"));
        let Some(Terminator::Branch { then_block, .. }) = &func.blocks[0].terminator else {
            panic!("`{}` should branch on its left operand", name);
        };
        assert_eq!(func.blocks[then_block.0].name.starts_with("rhs"), rhs_on_true);
    }

    let never = function(&module, "never");
    assert!(!has_block(never, "rhs"));
    assert_eq!(returned_value(never), Some(Value::Int(0)));
}

#[test]
fn test_duplicates_are_rejected() {
    let (_, diagnostics) = compile(
        "func f() { }\n\
         func f() { }\n\
         func g() { let x = 1\n let x = 2 }",
    );
    assert_eq!(diagnostics.count(ErrorKind::AlreadyFound), 2);
}

#[test]
fn test_shadowing_in_nested_block() {
    let (module, diagnostics) = compile(
        "func f(x: int) => int {\n\
             let y = x\n\
             {\n\
                 let x = 2.5\n\
             }\n\
             return x + y\n\
         }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    let sums: Vec<IrType> = function(&module, "f")
        .insts()
        .filter_map(|inst| match inst {
            Inst::Binary { op: BinOp::Add, ty, .. } => Some(ty.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(sums, vec![IrType::int(32)]);
}

#[test]
fn test_initializer_lists() {
    let (_, diagnostics) = compile(
        "template Point { x: int\n y: int }\n\
         func named() => Point { let p: Point = { y: 2, x: 1 }\n return p }\n\
         func positional() => Point { let p: Point = { 1, 2 }\n return p }\n\
         func too_many() { let p: Point = { 1, 2, 3 } }\n\
         func unknown() { let p: Point = { z: 1 } }\n\
         func array() { let a: [int; 3] = [1, 2, 3] }\n\
         func short() { let a: [int; 3] = [1, 2] }",
    );
    assert_eq!(diagnostics.count(ErrorKind::ArgCountMismatch), 2, "{:?}", messages(&diagnostics));
    assert_eq!(diagnostics.count(ErrorKind::CannotFind), 1);
    assert_eq!(diagnostics.len(), 3);
}

// === Conformance ===

const SHAPE: &str = "spec Shape {\n\
         type Unit\n\
         func area(self) => int\n\
         func name(self) => int\n\
         func scale(self, by: int)\n\
     }\n\
     template Square { side: int }\n";

#[test]
fn test_every_missing_member_is_reported() {
    let source = format!(
        "{}action Shape in Square {{\n\
             func area(self) => int {{ return self.side * self.side }}\n\
         }}",
        SHAPE
    );
    let (_, diagnostics) = compile(&source);
    assert_eq!(diagnostics.count(ErrorKind::NotImplemented), 3, "{:?}", messages(&diagnostics));
    assert_eq!(diagnostics.count(ErrorKind::ConformanceFailed), 1);
    let aggregate = diagnostics.iter().find(|e| e.kind == ErrorKind::ConformanceFailed).unwrap();
    assert!(aggregate.fatal);
    assert!(aggregate.message.contains("3 problem(s)"));
}

#[test]
fn test_signature_mismatches_are_reported() {
    let source = format!(
        "{}action Shape in Square {{\n\
             type Unit = int\n\
             func area(self) => uint8 {{ return 1 }}\n\
             func name() => int {{ return 0 }}\n\
             func scale(self, by: int) {{ self.side = self.side * by }}\n\
         }}",
        SHAPE
    );
    let (_, diagnostics) = compile(&source);
    assert_eq!(diagnostics.count(ErrorKind::ArgMismatch), 2, "{:?}", messages(&diagnostics));
    assert_eq!(diagnostics.count(ErrorKind::NotImplemented), 0);
    assert_eq!(diagnostics.count(ErrorKind::ConformanceFailed), 1);
}

#[test]
fn test_associated_types_substitute_into_signatures() {
    let (module, diagnostics) = compile(
        "spec Measured {\n\
             type Unit\n\
             func size(self) => Unit\n\
         }\n\
         template Rope { len: uint16 }\n\
         action Measured in Rope {\n\
             type Unit = uint16\n\
             func size(self) => uint16 { return self.len }\n\
         }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    assert_eq!(function(&module, "Rope.size").return_type, IrType::int(16));
}

// === Generics ===

const SPECS: &str = "spec Show { func show(self) => int }\n\
     spec Hash { func hash(self) => int }\n";

#[test]
fn test_constraint_failures_are_collected() {
    let source = format!(
        "{}template Plain {{ n: int }}\n\
         template Pair<A: Show + Hash, B: Show> {{ a: A; b: B }}\n\
         func f() {{ let p: Pair<Plain, Plain> }}",
        SPECS
    );
    let module = parse(&source);
    let analysis = analyze(&module, "test");

    let failures: Vec<_> = analysis.diagnostics.iter().filter(|e| e.kind == ErrorKind::ConstraintFailed).collect();
    assert_eq!(failures.len(), 4, "{:?}", messages(&analysis.diagnostics));
    assert_eq!(failures.iter().filter(|e| e.fatal).count(), 1);
    let aggregate = failures.iter().find(|e| e.fatal).unwrap();
    assert!(aggregate.message.contains("3 constraint(s)"));
    assert_eq!(aggregate.notes.len(), 1);

    let root = analysis.scopes.root();
    assert!(analysis.scopes.find_child(root, "Pair<Plain, Plain>").is_none());
}

#[test]
fn test_scalars_and_bound_templates_satisfy_constraints() {
    let source = format!(
        "{}template Holder {{ item: Box<Thing>\n count: Box<int> }}\n\
         template Box<T: Show> {{ value: T }}\n\
         template Thing {{ n: int }}\n\
         action Show in Thing {{ func show(self) => int {{ return self.n }} }}",
        SPECS
    );
    let (module, diagnostics) = compile(&source);
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    assert!(module.struct_def("Box<Thing>").is_some());
    assert!(module.struct_def("Box<int>").is_some());
    assert!(!function(&module, "Thing.show").is_declaration());
}

#[test]
fn test_generic_arity() {
    let (_, diagnostics) = compile(
        "template Box<T> { value: T }\n\
         template Point { x: int }\n\
         func a() { let b: Box<int, int> }\n\
         func b() { let p: Point<int> }\n\
         func c() { let b: Box }",
    );
    assert_eq!(diagnostics.count(ErrorKind::ArgCountMismatch), 3, "{:?}", messages(&diagnostics));
}

#[test]
fn test_instances_are_memoized() {
    let module = parse(
        "template Box<T> { value: T\n func get(self) => T { return self.value } }\n\
         func a() => int { let b: Box<int> = { 4 }\n return b.get() }\n\
         func c() { let b: Box<int>\n let d: Box<bool> }",
    );
    let mut sema = Sema::new("test");
    sema.run(&module);
    assert!(sema.diagnostics().is_empty(), "{:?}", messages(sema.diagnostics()));

    let generic = sema.tree().find_child(sema.tree().root(), "Box").unwrap();
    assert_eq!(sema.instances_of(generic).len(), 2);

    let first = sema.resolve_generic(generic, vec![Ty::int(32, true)], Span::default()).unwrap();
    let second = sema.resolve_generic(generic, vec![Ty::int(32, true)], Span::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(sema.instances_of(generic).len(), 2);

    let analysis = sema.finish();
    assert!(!function(&analysis.module, "Box<int>.get").is_declaration());
    assert_eq!(calls(function(&analysis.module, "a")), vec!["Box<int>.get".to_string()]);
}

#[test]
fn test_direct_instantiation_creates_distinct_layouts() {
    let module = parse(&format!(
        "{}template Wrapper<T: Show> {{ inner: T\n count: int }}",
        SPECS
    ));
    let mut sema = Sema::new("test");
    sema.run(&module);

    let generic = sema.tree().find_child(sema.tree().root(), "Wrapper").unwrap();
    let args = [Ty::int(8, false)];
    let first = sema.instantiate(generic, &args, Span::default()).unwrap();
    let second = sema.instantiate(generic, &args, Span::default()).unwrap();
    assert_ne!(first, second);

    let (Ty::Struct { name: a, .. }, Ty::Struct { name: b, .. }) = (&first, &second) else {
        panic!("expected template instances, found {} and {}", first, second);
    };
    assert_eq!(a, "Wrapper<uint8>");
    assert_eq!(b, "Wrapper<uint8>#2");
    assert_eq!(sema.builder().struct_fields(a), sema.builder().struct_fields(b));
    assert_eq!(
        sema.builder().struct_fields(a),
        Some(&[IrType::int(8), IrType::int(32)][..])
    );
    assert!(sema.diagnostics().is_empty());
}

#[test]
fn test_actions_on_generics_apply_to_every_instance() {
    let (module, diagnostics) = compile(&format!(
        "{}template Cell<T> {{ value: T }}\n\
         action Show in Cell {{ func show(self) => int {{ return 1 }} }}\n\
         func f() {{ let a: Cell<int>\n let b: Cell<bool>\n let n = a.show() + b.show() }}",
        SPECS
    ));
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    assert!(!function(&module, "Cell<int>.show").is_declaration());
    assert!(!function(&module, "Cell<bool>.show").is_declaration());
}

#[test]
fn test_generic_alias() {
    let (module, diagnostics) = compile(
        "type Grid<T> = [T; 4]\n\
         func f() => uint8 { let g: Grid<uint8> = [1, 2, 3, 4]\n return g[2] }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    assert!(!function(&module, "f").is_declaration());
}

// === Packages, exports and function values ===

#[test]
fn test_package_members_and_exports() {
    let (module, diagnostics) = compile(
        "package geo {\n\
             export template Point { x: int }\n\
             export func origin() => int { return 0 }\n\
             func hidden() { }\n\
         }\n\
         func f(p: geo.Point) => int { return p.x + geo.origin() }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    assert!(module.struct_def("geo.Point").is_some());
    assert!(function(&module, "geo.origin").exported);
    assert!(!function(&module, "geo.hidden").exported);
    assert_eq!(calls(function(&module, "f")), vec!["geo.origin".to_string()]);
}

#[test]
fn test_function_values_and_extern_functions() {
    let (module, diagnostics) = compile(
        "func putc(c: int) => int\n\
         func twice(f: func(int) => int, x: int) => int { return f(f(x)) }\n\
         func g() => int {\n\
             let h = putc\n\
             return twice(h, 1)\n\
         }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    assert!(function(&module, "putc").is_declaration());

    let indirect = function(&module, "twice")
        .insts()
        .filter(|i| matches!(i, Inst::Call { func: Value::Temp(_), .. }))
        .count();
    assert_eq!(indirect, 2);
    assert_eq!(calls(function(&module, "g")), vec!["twice".to_string()]);
}

#[test]
fn test_alias_of_instance_is_a_namespace() {
    let (module, diagnostics) = compile(
        "template Box<T> {\n\
             value: T\n\
             func make() => int { return 7 }\n\
         }\n\
         type IntBox = Box<int>\n\
         func f() => int { return IntBox.make() }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    assert_eq!(calls(function(&module, "f")), vec!["Box<int>.make".to_string()]);
}

#[test]
fn test_self_type_and_initializer_return() {
    let (module, diagnostics) = compile(
        "template Vec2 {\n\
             x: int\n\
             y: int\n\
             func add(self, other: Self) => Self {\n\
                 return { x: self.x + other.x, y: self.y + other.y }\n\
             }\n\
         }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    let add = function(&module, "Vec2.add");
    assert_eq!(add.return_type, IrType::structure("Vec2"));
    assert_eq!(add.params.len(), 2);
}

#[test]
fn test_loops_with_continue_and_pointers() {
    let (module, diagnostics) = compile(
        "func count(n: int) => int {\n\
             let i: int = 0\n\
             while i < n {\n\
                 i = i + 1\n\
                 if i == 2 { continue }\n\
             }\n\
             return i\n\
         }\n\
         func poke() => int {\n\
             let a: int = 1\n\
             let p = &a\n\
             *p = 5\n\
             return *p\n\
         }",
    );
    assert!(diagnostics.is_empty(), "{:?}", messages(&diagnostics));
    assert!(has_block(function(&module, "count"), "while"));
    assert!(!function(&module, "poke").is_declaration());
}
