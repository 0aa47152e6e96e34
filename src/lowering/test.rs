use super::*;
use crate::analyzer;
use crate::ir::{Local, PrintFormat};
use crate::lexer;
use crate::parser;

// --- Helpers ---

fn parse_src(source: &str) -> Program {
    let (tokens, lex_errors) = lexer::tokenize(source);
    assert!(lex_errors.is_empty(), "lexing failed: {:?}", lex_errors);
    let (program, parse_errors) = parser::parse(&tokens);
    assert!(parse_errors.is_empty(), "parsing failed: {:?}", parse_errors);
    program
}

fn checked(source: &str) -> Program {
    let mut program = parse_src(source);
    let report = analyzer::check(&mut program);
    assert!(report.is_success(), "analysis failed: {:?}", report.diagnostics);
    program
}

fn lower_with(source: &str, options: &CompileOptions) -> IrModule {
    let program = checked(source);
    match lower(&program, options) {
        Ok(module) => module,
        Err(errors) => panic!("lowering failed: {errors:?}"),
    }
}

/// Lowers a valid program with default options.
fn lower_ok(source: &str) -> IrModule {
    lower_with(source, &CompileOptions::default())
}

/// Lowers a checked program that must fail to lower.
fn lower_err(source: &str) -> Vec<LoweringError> {
    let program = checked(source);
    match lower(&program, &CompileOptions::default()) {
        Ok(module) => panic!("expected lowering errors, got\n{module}"),
        Err(errors) => errors,
    }
}

/// The function's instructions as trimmed text lines.
fn listing(module: &IrModule, name: &str) -> Vec<String> {
    let function = module
        .function(name)
        .unwrap_or_else(|| panic!("no function named {name}"));
    function
        .instructions
        .iter()
        .map(|i| i.to_string().trim().to_string())
        .collect()
}

fn lines(text: &str) -> Vec<String> {
    text.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect()
}

// --- Control flow ---

#[test]
fn test_if_else_shape() {
    let module = lower_ok(
        "function pick(cond: bool)\n  var a = 0\n  if cond { a = 1 } else { a = 2 }\n  return a\nend",
    );
    let expected = lines(
        "PARAM [rbp-8], 0
         CONST r0, 0
         STORE [rbp-16], r0
         LOAD r0, [rbp-8]
         JUMP_IF_NOT L_ELSE_0, r0
         CONST r0, 1
         STORE [rbp-16], r0
         JUMP L_END_IF_0
         L_ELSE_0:
         CONST r0, 2
         STORE [rbp-16], r0
         L_END_IF_0:
         LOAD r0, [rbp-16]
         RETURN r0  ; pick
         CONST r0, 0
         RETURN r0  ; pick",
    );
    assert_eq!(listing(&module, "pick"), expected);
}

#[test]
fn test_if_without_else_jumps_to_end() {
    let module = lower_ok("var go = true\nif go { print(1) }");
    let listing = listing(&module, "main");
    assert!(listing.contains(&"JUMP_IF_NOT L_END_IF_0, r0".to_string()), "{listing:?}");
    assert!(!listing.iter().any(|l| l.contains("L_ELSE")));
}

#[test]
fn test_labels_are_unique_module_wide() {
    let module = lower_ok(
        "function f(x: int)\n  if x > 1 { return 1 } else { return 2 }\nend\n\
         function g(x: int)\n  if x > 1 { return 1 } elif x > 0 { return 2 } else { return 3 }\nend\n\
         var flag = true\nif flag { print(1) } else { print(2) }",
    );
    let mut labels: Vec<&str> = module
        .functions
        .iter()
        .flat_map(|f| f.instructions.iter())
        .filter(|i| i.opcode == Opcode::Label)
        .filter_map(|i| i.label())
        .collect();
    let total = labels.len();
    labels.sort_unstable();
    labels.dedup();
    assert_eq!(labels.len(), total, "duplicate labels: {labels:?}");
    assert_eq!(total, 8);
}

#[test]
fn test_while_with_break_and_continue() {
    let module = lower_ok("var i = 0\nwhile i < 3\n  i += 1\n  if i == 2 { continue }\n  break\nend");
    let listing = listing(&module, "main");
    let jumps_to = |label: &str| listing.iter().filter(|l| **l == format!("JUMP {label}")).count();
    assert_eq!(listing.iter().filter(|l| *l == "L_WHILE_START_0:").count(), 1);
    // `continue` plus the back edge.
    assert_eq!(jumps_to("L_WHILE_START_0"), 2);
    assert_eq!(jumps_to("L_WHILE_END_0"), 1);
}

#[test]
fn test_do_while_shape() {
    let module = lower_ok("var n = 0\ndo\n  n += 1\nend while n < 3");
    let listing = listing(&module, "main");
    let start = listing.iter().position(|l| l == "L_DO_START_0:").expect("start label");
    let cond = listing.iter().position(|l| l == "L_DO_COND_0:").expect("condition label");
    let end = listing.iter().position(|l| l == "L_DO_END_0:").expect("end label");
    assert!(start < cond && cond < end);
    assert_eq!(listing[end - 2], "JUMP_IF_NOT L_DO_END_0, r0");
    assert_eq!(listing[end - 1], "JUMP L_DO_START_0");
}

#[test]
fn test_for_range_is_a_counted_loop() {
    let module = lower_ok("for i in range(3) { print(i) }");
    let expected = lines(
        "CONST r0, 0
         STORE [rbp-8], r0
         CONST r0, 3
         STORE [rbp-16], r0
         L_FOR_START_0:
         LOAD r0, [rbp-8]
         PUSH r0
         LOAD r0, [rbp-16]
         POP r1
         LT r0, r1, r0
         JUMP_IF_NOT L_FOR_END_0, r0
         LOAD r0, [rbp-8]
         PRINT.int r0
         L_FOR_STEP_0:
         LOAD r0, [rbp-8]
         PUSH r0
         CONST r0, 1
         POP r1
         ADD r0, r1, r0
         STORE [rbp-8], r0
         JUMP L_FOR_START_0
         L_FOR_END_0:
         CONST r0, 0
         RETURN r0  ; main",
    );
    assert_eq!(listing(&module, "main"), expected);

    let main = module.entry().expect("entry function");
    assert_eq!(
        main.locals,
        vec![
            Local {
                name: "i".into(),
                offset: -8
            },
            Local {
                name: "%range_end0".into(),
                offset: -16
            },
        ]
    );
}

#[test]
fn test_ternary_labels() {
    let module = lower_ok("var flag = true\nvar n = flag ? 1 : 2");
    let listing = listing(&module, "main");
    let expected = lines(
        "LOAD r0, @flag
         JUMP_IF_NOT L_TERN_ELSE_0, r0
         CONST r0, 1
         JUMP L_TERN_END_0
         L_TERN_ELSE_0:
         CONST r0, 2
         L_TERN_END_0:
         STORE @n, r0",
    );
    assert_eq!(listing[2..10], expected[..]);
}

// --- Expressions ---

#[test]
fn test_binary_operands_go_through_the_stack() {
    let module = lower_ok("var x = 1 + 2 * 3");
    let expected = lines(
        "CONST r0, 1
         PUSH r0
         CONST r0, 2
         PUSH r0
         CONST r0, 3
         POP r1
         MUL r0, r1, r0
         POP r1
         ADD r0, r1, r0
         STORE @x, r0
         CONST r0, 0
         RETURN r0  ; main",
    );
    assert_eq!(listing(&module, "main"), expected);
}

#[test]
fn test_every_binary_operator_has_an_opcode() {
    let module = lower_ok(
        "var a = 1\nvar b = 2\nvar c = a - b / a % b\nvar d = a == b || a != b && a <= b\nvar e = a >= b || a > b",
    );
    let listing = listing(&module, "main");
    for mnemonic in ["SUB", "DIV", "MOD", "EQ", "OR", "NE", "AND", "LE", "GE", "GT"] {
        assert!(
            listing.iter().any(|l| l.starts_with(&format!("{mnemonic} "))),
            "missing {mnemonic} in {listing:?}"
        );
    }
}

#[test]
fn test_unary_and_constants() {
    let module = lower_ok("var b = !true\nvar n = -4\nvar f = 2.5\nvar z = null\nvar h = 0x10\nvar e = 1e2");
    let listing = listing(&module, "main");
    let expected = lines(
        "CONST r0, 1
         NOT r0, r0
         STORE @b, r0
         CONST r0, 4
         NEG r0, r0
         STORE @n, r0
         CONST r0, 2.5
         STORE @f, r0
         CONST r0, 0
         STORE @z, r0
         CONST r0, 16
         STORE @h, r0
         CONST r0, 100.0
         STORE @e, r0",
    );
    assert_eq!(listing[..14], expected[..]);
}

#[test]
fn test_compound_assignment() {
    let module = lower_ok("var t = 1\nt *= 2");
    let listing = listing(&module, "main");
    let expected = lines(
        "LOAD r0, @t
         PUSH r0
         CONST r0, 2
         POP r1
         MUL r0, r1, r0
         STORE @t, r0",
    );
    assert_eq!(listing[2..8], expected[..]);
}

#[test]
fn test_chained_assignment_stores_twice() {
    let module = lower_ok("var a = 0\nvar b = 0\na = b = 7");
    let listing = listing(&module, "main");
    assert_eq!(listing[4..7], lines("CONST r0, 7\nSTORE @b, r0\nSTORE @a, r0")[..]);
}

// --- Functions and calls ---

#[test]
fn test_call_pushes_arguments_and_drops_them() {
    let module = lower_ok("function add(a, b) { return a + b }\nvar s = add(1, 2)\nfunction ping() { return 0 }\nping()");
    let expected = lines(
        "CONST r0, 2
         PUSH r0
         CONST r0, 1
         PUSH r0
         CALL add, 2
         DROP 2
         STORE @s, r0
         CALL ping, 0
         CONST r0, 0
         RETURN r0  ; main",
    );
    assert_eq!(listing(&module, "main"), expected);

    let add = lines(
        "PARAM [rbp-8], 0
         PARAM [rbp-16], 1
         LOAD r0, [rbp-8]
         PUSH r0
         LOAD r0, [rbp-16]
         POP r1
         ADD r0, r1, r0
         RETURN r0  ; add
         CONST r0, 0
         RETURN r0  ; add",
    );
    assert_eq!(listing(&module, "add"), add);
    assert_eq!(module.function("add").map(|f| f.params.clone()), Some(vec!["a".into(), "b".into()]));
}

#[test]
fn test_functions_follow_the_entry_in_declaration_order() {
    let module = lower_ok("var r = later(1)\nfunction later(x) { return x }\nfunction other() { return 2 }");
    let names: Vec<&str> = module.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["main", "later", "other"]);
    assert_eq!(module.entry_point, "main");
}

#[test]
fn test_user_main_is_absorbed_into_the_entry() {
    let module = lower_ok("var g = 1\nfunction main() { print(g) }\nprint(\"top\")");
    assert_eq!(module.functions.len(), 1);
    let expected = lines(
        "CONST r0, 1
         STORE @g, r0
         CONST r0, .LC0
         PRINT.string r0
         LOAD r0, @g
         PRINT.int r0
         CONST r0, 0
         RETURN r0  ; main",
    );
    assert_eq!(listing(&module, "main"), expected);
}

#[test]
fn test_custom_entry_point() {
    let options = CompileOptions {
        entry_point: "start".to_string(),
        ..CompileOptions::default()
    };
    let module = lower_with("function start() { print(1) }\nprint(0)", &options);
    assert_eq!(module.entry_point, "start");
    assert_eq!(module.functions.len(), 1);
    assert_eq!(listing(&module, "start")[..2], lines("CONST r0, 0\nPRINT.int r0")[..]);
}

#[test]
fn test_globals_and_locals() {
    let module = lower_ok(
        "var count = 0\nfunction bump() { count += 1 }\nfunction shadow() {\n  var count = 5\n  return count\n}",
    );
    assert_eq!(
        module.globals,
        vec![crate::ir::Global {
            name: "count".into(),
            data_type: DataType::Int
        }]
    );
    assert_eq!(listing(&module, "bump")[0], "LOAD r0, @count");
    assert!(listing(&module, "shadow").contains(&"LOAD r0, [rbp-8]".to_string()));
}

#[test]
fn test_open_types_are_emitted_as_generic() {
    let module = lower_ok("var r = later(1)\nfunction later(x) { return x }");
    assert_eq!(module.globals[0].data_type, DataType::Generic);
    assert!(
        module
            .functions
            .iter()
            .all(|f| f.return_type != DataType::Auto && f.return_type != DataType::Unknown)
    );
}

#[test]
fn test_block_locals_live_in_the_frame() {
    let module = lower_ok("{ var t = 1 }\n{ var t = 2 }");
    let main = module.entry().expect("entry function");
    assert!(module.globals.is_empty());
    // Sibling scopes never share a slot.
    assert_eq!(main.frame_size(), 16);
}

#[test]
fn test_return_types_come_from_analysis() {
    let module = lower_ok("function s(): string { return \"x\" }\nfunction v() { print(1) }");
    assert_eq!(module.function("main").map(|f| f.return_type), Some(DataType::Int));
    assert_eq!(module.function("s").map(|f| f.return_type), Some(DataType::String));
    assert_eq!(module.function("v").map(|f| f.return_type), Some(DataType::Void));
}

#[test]
fn test_print_format_follows_argument_type() {
    let module = lower_ok("print(1.5)\nprint(true)\nfunction id(x) { return x }\nprint(id(1))");
    let formats: Vec<PrintFormat> = module
        .entry()
        .expect("entry function")
        .instructions
        .iter()
        .filter_map(|i| match i.opcode {
            Opcode::Print(format) => Some(format),
            _ => None,
        })
        .collect();
    assert_eq!(formats, vec![PrintFormat::Float, PrintFormat::Bool, PrintFormat::Dynamic]);
}

#[test]
fn test_embed_becomes_inline() {
    let module = lower_ok("#embed python\nprint(1)\n#endembed");
    let main = module.entry().expect("entry function");
    let inline = &main.instructions[0];
    assert_eq!(inline.opcode, Opcode::Inline);
    assert_eq!(inline.src1, Some(Value::Text("python".into())));
    assert!(matches!(&inline.src2, Some(Value::Text(code)) if code.contains("print")));
}

// --- String pool ---

#[test]
fn test_string_pool_dedupes_by_default() {
    let module = lower_ok("print(\"hi\")\nprint(\"hi\")\nprint(\"yo\")");
    let labels: Vec<(&str, &str)> = module
        .strings
        .iter()
        .map(|s| (s.label.as_str(), s.value.as_str()))
        .collect();
    assert_eq!(labels, vec![(".LC0", "hi"), (".LC1", "yo")]);
}

#[test]
fn test_string_pool_without_dedupe_keeps_labels_distinct() {
    let options = CompileOptions {
        dedupe_strings: false,
        ..CompileOptions::default()
    };
    let module = lower_with("print(\"hi\")\nprint(\"hi\")", &options);
    assert_eq!(module.strings.len(), 2);
    assert_eq!(module.string(".LC0"), Some("hi"));
    assert_eq!(module.string(".LC1"), Some("hi"));
    let listing = listing(&module, "main");
    assert_eq!(listing[0], "CONST r0, .LC0");
    assert_eq!(listing[2], "CONST r0, .LC1");
}

#[test]
fn test_string_pool_unit() {
    let mut pool = StringPool::new(true);
    assert!(pool.is_empty());
    assert_eq!(pool.intern("a"), ".LC0");
    assert_eq!(pool.intern("b"), ".LC1");
    assert_eq!(pool.intern("a"), ".LC0");
    assert_eq!(pool.len(), 2);
    assert_eq!(pool.get(".LC1"), Some("b"));
}

// --- Frame ---

#[test]
fn test_frame_scopes_and_offsets() {
    let mut frame = Frame::new();
    assert_eq!(frame.allocate("a"), -8);
    frame.enter_scope();
    assert_eq!(frame.allocate("a"), -16);
    assert_eq!(frame.lookup("a"), Some(-16));
    let hidden = frame.allocate_hidden("tmp");
    assert_eq!(hidden, -24);
    assert_eq!(frame.lookup("%tmp0"), None);
    frame.exit_scope();
    assert_eq!(frame.lookup("a"), Some(-8));

    let reserved = frame.reserve("late");
    assert_eq!(frame.lookup("late"), None);
    frame.bind("late", reserved);
    assert_eq!(frame.lookup("late"), Some(-32));
    assert_eq!(frame.into_locals().len(), 4);
}

// --- Errors ---

#[test]
fn test_unsupported_constructs() {
    let errors = lower_err("try { throw 1 } catch e { }\nvar xs = [1]\nvar ys = [2]\nfor y in ys { print(y) }");
    let constructs: Vec<&str> = errors
        .iter()
        .map(|e| match e {
            LoweringError::Unsupported { construct, .. } => *construct,
            other => panic!("unexpected error {other:?}"),
        })
        .collect();
    assert_eq!(
        constructs,
        vec!["try statements", "array literals", "array literals", "iteration over collections"]
    );
}

#[test]
fn test_nested_functions_are_unsupported() {
    let errors = lower_err("function outer()\n  function inner() { return 1 }\n  return inner()\nend");
    assert!(matches!(
        errors[0],
        LoweringError::Unsupported {
            construct: "nested function declarations",
            ..
        }
    ));
}

#[test]
fn test_unchecked_programs_hit_internal_errors() {
    let program = parse_src("ghost = 1\nbreak\nmissing()");
    let errors = lower(&program, &CompileOptions::default()).expect_err("should fail");
    assert!(matches!(&errors[0], LoweringError::UnresolvedSymbol { name, .. } if name == "ghost"));
    assert!(matches!(&errors[1], LoweringError::OutsideLoop { keyword: "break", .. }));
    assert!(matches!(&errors[2], LoweringError::UnresolvedFunction { name, .. } if name == "missing"));
    assert!(errors.iter().all(LoweringError::is_internal));
}

#[test]
fn test_lowering_errors_become_diagnostics() {
    let internal: Diagnostic = LoweringError::UnresolvedSymbol {
        name: "x".into(),
        span: Span::new(0, 1),
    }
    .into();
    assert_eq!(internal.code(), "E0300");
    assert_eq!(internal.message(), "unresolved symbol 'x' reached lowering");
    assert_eq!(internal.notes().len(), 1);

    let unsupported: Diagnostic = LoweringError::Unsupported {
        construct: "try statements",
        span: Span::new(2, 5),
    }
    .into();
    assert_eq!(unsupported.code(), "E0301");
    assert_eq!(unsupported.span(), Span::new(2, 5));
}

#[test]
fn test_independent_runs_number_labels_the_same() {
    let source = "var x = 1\nif x > 0 { print(x) }\nwhile x < 3 { x += 1 }";
    assert_eq!(lower_ok(source), lower_ok(source));
}

#[test]
fn test_module_dump() {
    let module = lower_ok("var greeting = \"hi\"\nprint(greeting)");
    let expected = "; entry: main\n\
                    .LC0: \"hi\"\n\
                    global @greeting: string\n\
                    \n\
                    function main() -> int  ; frame 0\n    CONST r0, .LC0\n    STORE @greeting, r0\n    LOAD r0, @greeting\n    PRINT.string r0\n    CONST r0, 0\n    RETURN r0  ; main\n";
    assert_eq!(module.to_string(), expected);
}
