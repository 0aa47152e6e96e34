use super::*;
use crate::analyzer::DataType;
use crate::parser::ast::StmtKind;

fn codes(compilation: &Compilation) -> Vec<&str> {
    compilation.diagnostics.iter().map(|d| d.code()).collect()
}

#[test]
fn test_clean_program_produces_a_module() {
    let compilation = compile("var x = 1\nprint(x)", &CompileOptions::default());
    assert!(!compilation.has_errors());
    assert!(compilation.diagnostics.is_empty());

    let module = compilation.into_result().expect("module");
    assert_eq!(module.entry_point, "main");
    assert_eq!(module.globals.len(), 1);
}

#[test]
fn test_types_are_written_back_into_the_program() {
    let compilation = compile("var f = 1.5\nfunction two() { return 2 }", &CompileOptions::default());
    let StmtKind::VarDecl(decl) = &compilation.program.statements[0].kind else {
        panic!("expected a declaration");
    };
    assert_eq!(decl.data_type, DataType::Float);
    let StmtKind::Function(function) = &compilation.program.statements[1].kind else {
        panic!("expected a function");
    };
    assert_eq!(function.return_type, DataType::Int);
}

#[test]
fn test_analysis_errors_block_lowering() {
    let compilation = compile("print(y)", &CompileOptions::default());
    assert!(compilation.has_errors());
    assert!(compilation.module.is_none());
    assert_eq!(codes(&compilation), vec!["E0200"]);
}

#[test]
fn test_every_stage_reports_in_one_run() {
    let compilation = compile("var a = $ 1\nvar = 2\nprint(ghost)", &CompileOptions::default());
    assert_eq!(codes(&compilation), vec!["E0000", "E0100", "E0200"]);
    assert_eq!(compilation.diagnostics.error_count(), 3);
    assert!(compilation.module.is_none());
}

#[test]
fn test_unsupported_constructs_surface_as_diagnostics() {
    let compilation = compile("var xs = [1, 2]", &CompileOptions::default());
    assert_eq!(codes(&compilation), vec!["E0301"]);
    assert!(compilation.module.is_none());

    let diagnostics = compilation.into_result().expect_err("lowering should fail");
    assert_eq!(diagnostics.messages(), vec!["[line 1:10] E0301: array literals cannot be lowered to IR"]);
}

#[test]
fn test_messages_carry_line_and_column() {
    let compilation = compile("var x = 1\nprint(y)", &CompileOptions::default());
    assert_eq!(
        compilation.diagnostics.messages(),
        vec!["[line 2:7] E0200: Undefined variable 'y'"]
    );
}

#[test]
fn test_rendered_report_names_the_code() {
    let compilation = compile("const PI = 3\nPI = 4", &CompileOptions::default());
    let rendered = compilation.diagnostics.render("demo.sub");
    assert!(rendered.contains("E0208"), "{rendered}");
    assert!(rendered.contains("Cannot assign to const variable 'PI'"), "{rendered}");
    assert!(rendered.contains("demo.sub"), "{rendered}");
}

#[test]
fn test_options_reach_lowering() {
    let options = CompileOptions {
        dedupe_strings: false,
        entry_point: "start".to_string(),
    };
    let compilation = compile("print(\"a\")\nprint(\"a\")", &options);
    let module = compilation.into_result().expect("module");
    assert_eq!(module.entry_point, "start");
    assert_eq!(module.strings.len(), 2);
}

#[test]
fn test_tokens_are_kept() {
    let compilation = compile("var x = 1", &CompileOptions::default());
    // var, x, =, 1, EOF
    assert_eq!(compilation.tokens.len(), 5);
}

#[test]
fn test_broken_line_leaves_no_partial_declaration() {
    let compilation = compile("const K = (1 +\n", &CompileOptions::default());
    assert_eq!(codes(&compilation), vec!["E0100"]);
    assert!(compilation.program.statements.is_empty());

    // The declaration is gone, so the later use is reported too; nothing compiles.
    let compilation = compile("var n: int = 2 3\nprint(n)\n", &CompileOptions::default());
    assert_eq!(codes(&compilation), vec!["E0100", "E0200"]);
    assert!(compilation.module.is_none());
}

#[test]
fn test_oversized_integer_stops_before_lowering() {
    let compilation = compile("var n = 99999999999999999999", &CompileOptions::default());
    assert_eq!(codes(&compilation), vec!["E0004"]);
    assert!(compilation.module.is_none());
}

#[test]
fn test_void_value_is_rejected_before_lowering() {
    let compilation = compile("function f() { print(1) }\nvar r = f()", &CompileOptions::default());
    assert_eq!(codes(&compilation), vec!["E0202"]);
    assert!(compilation.module.is_none());
}
