use super::ast::*;
use super::*;
use crate::lexer;

// --- Helpers ---

fn parse_source(source: &str) -> (Program, Vec<Diagnostic>) {
    let (tokens, lex_errors) = lexer::tokenize(source);
    assert!(lex_errors.is_empty(), "lexing failed: {:?}", lex_errors);
    parse(&tokens)
}

/// Parses source that must be syntactically valid.
fn parse_ok(source: &str) -> Program {
    let (program, errors) = parse_source(source);
    assert!(errors.is_empty(), "expected no syntax errors, got {:?}", errors);
    program
}

/// Parses source that must contain at least one syntax error.
fn parse_err(source: &str) -> (Program, Vec<Diagnostic>) {
    let (program, errors) = parse_source(source);
    assert!(!errors.is_empty(), "expected syntax errors for {source:?}");
    (program, errors)
}

fn single(source: &str) -> StmtKind {
    let mut program = parse_ok(source);
    assert_eq!(program.statements.len(), 1, "{:?}", program.statements);
    program.statements.remove(0).kind
}

fn name(expr: &Expr) -> &str {
    expr.as_identifier().expect("expected an identifier")
}

fn number(expr: &Expr) -> &str {
    match &expr.kind {
        ExprKind::Literal(Literal::Number(text)) => text,
        other => panic!("expected a number literal, got {other:?}"),
    }
}

fn binary(expr: &Expr) -> (BinaryOp, &Expr, &Expr) {
    match &expr.kind {
        ExprKind::Binary { op, left, right } => (*op, left, right),
        other => panic!("expected a binary expression, got {other:?}"),
    }
}

fn assignment(kind: &StmtKind) -> &AssignStmt {
    match kind {
        StmtKind::Assign(assign) => assign,
        other => panic!("expected an assignment, got {other:?}"),
    }
}

// --- Expressions ---

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    let stmt = single("x = 1 + 2 * 3");
    let assign = assignment(&stmt);
    assert_eq!(name(&assign.target), "x");
    assert_eq!(assign.op, None);

    let (op, left, right) = binary(&assign.value);
    assert_eq!(op, BinaryOp::Add);
    assert_eq!(number(left), "1");
    let (inner, two, three) = binary(right);
    assert_eq!(inner, BinaryOp::Mul);
    assert_eq!((number(two), number(three)), ("2", "3"));
}

#[test]
fn test_assignment_is_right_associative() {
    let stmt = single("a = b = c");
    let assign = assignment(&stmt);
    assert_eq!(name(&assign.target), "a");
    match &assign.value.kind {
        ExprKind::Assign { target, value } => {
            assert_eq!(name(target), "b");
            assert_eq!(name(value), "c");
        }
        other => panic!("expected nested assignment, got {other:?}"),
    }
}

#[test]
fn test_binary_operators_are_left_associative() {
    let StmtKind::Expr(expr) = single("a - b - c") else {
        panic!("expected an expression statement");
    };
    let (op, left, right) = binary(&expr);
    assert_eq!(op, BinaryOp::Sub);
    assert_eq!(name(right), "c");
    let (inner, a, b) = binary(left);
    assert_eq!(inner, BinaryOp::Sub);
    assert_eq!((name(a), name(b)), ("a", "b"));
}

#[test]
fn test_precedence_ladder() {
    // || < && < == < < < + < *
    let StmtKind::Expr(expr) = single("a || b && c == d < e + f * g") else {
        panic!("expected an expression statement");
    };
    let (or, _, rest) = binary(&expr);
    assert_eq!(or, BinaryOp::Or);
    let (and, _, rest) = binary(rest);
    assert_eq!(and, BinaryOp::And);
    let (eq, _, rest) = binary(rest);
    assert_eq!(eq, BinaryOp::Eq);
    let (lt, _, rest) = binary(rest);
    assert_eq!(lt, BinaryOp::Lt);
    let (add, _, rest) = binary(rest);
    assert_eq!(add, BinaryOp::Add);
    let (mul, _, _) = binary(rest);
    assert_eq!(mul, BinaryOp::Mul);
}

#[test]
fn test_unary_binds_tighter_than_binary() {
    let StmtKind::Expr(expr) = single("-x * !y") else {
        panic!("expected an expression statement");
    };
    let (op, left, right) = binary(&expr);
    assert_eq!(op, BinaryOp::Mul);
    assert!(matches!(left.kind, ExprKind::Unary { op: UnaryOp::Neg, .. }));
    assert!(matches!(right.kind, ExprKind::Unary { op: UnaryOp::Not, .. }));
}

#[test]
fn test_ternary() {
    let stmt = single("x = ready ? 1 : 2");
    let assign = assignment(&stmt);
    match &assign.value.kind {
        ExprKind::Ternary {
            condition,
            then_branch,
            else_branch,
        } => {
            assert_eq!(name(condition), "ready");
            assert_eq!(number(then_branch), "1");
            assert_eq!(number(else_branch), "2");
        }
        other => panic!("expected a ternary, got {other:?}"),
    }
}

#[test]
fn test_postfix_chain() {
    let StmtKind::Expr(expr) = single("a.b[0](1, 2)") else {
        panic!("expected an expression statement");
    };
    let ExprKind::Call { callee, args } = &expr.kind else {
        panic!("expected a call, got {:?}", expr.kind);
    };
    assert_eq!(args.len(), 2);
    let ExprKind::Index { object, index } = &callee.kind else {
        panic!("expected an index access");
    };
    assert_eq!(number(index), "0");
    let ExprKind::Member { object, property } = &object.kind else {
        panic!("expected a member access");
    };
    assert_eq!(name(object), "a");
    assert_eq!(property.name, "b");
}

#[test]
fn test_array_and_object_literals() {
    let StmtKind::VarDecl(decl) = single("var xs = [1, 2, 3,]") else {
        panic!("expected a declaration");
    };
    let Some(Expr { kind: ExprKind::Array(items), .. }) = &decl.initializer else {
        panic!("expected an array literal");
    };
    assert_eq!(items.len(), 3);

    let StmtKind::VarDecl(decl) = single("var point = {x: 1, \"y\": 2}") else {
        panic!("expected a declaration");
    };
    let Some(Expr { kind: ExprKind::Object(entries), .. }) = &decl.initializer else {
        panic!("expected an object literal");
    };
    let keys: Vec<&str> = entries.iter().map(|(key, _)| key.name.as_str()).collect();
    assert_eq!(keys, vec!["x", "y"]);
}

#[test]
fn test_expression_spans() {
    let StmtKind::Expr(expr) = single("foo + bar") else {
        panic!("expected an expression statement");
    };
    assert_eq!(expr.span, Span::new(0, 9));
    assert_eq!(expr.ty, crate::analyzer::DataType::Unknown);
}

// --- Statements ---

#[test]
fn test_declarations() {
    let program = parse_ok("var a\nlet b: int = 1\nconst C = \"c\"");
    let decls: Vec<&VarDecl> = program
        .statements
        .iter()
        .map(|s| match &s.kind {
            StmtKind::VarDecl(decl) => decl,
            other => panic!("expected a declaration, got {other:?}"),
        })
        .collect();
    assert_eq!(decls.len(), 3);
    assert_eq!(decls[0].kind, DeclKind::Var);
    assert!(decls[0].initializer.is_none());
    assert_eq!(decls[1].kind, DeclKind::Let);
    assert_eq!(decls[1].annotation.as_ref().map(|a| a.name.as_str()), Some("int"));
    assert!(decls[2].is_const());
}

#[test]
fn test_const_without_initializer_parses() {
    // Rejected later by the analyzer, not by the parser.
    let StmtKind::VarDecl(decl) = single("const Q") else {
        panic!("expected a declaration");
    };
    assert!(decl.is_const());
    assert!(decl.initializer.is_none());
}

#[test]
fn test_function_keyword_and_brace_forms() {
    let program = parse_ok(
        "function add(a: int, b): int\n    return a + b\nend\n\nfunction noop() { }\n",
    );
    assert_eq!(program.statements.len(), 2);

    let StmtKind::Function(add) = &program.statements[0].kind else {
        panic!("expected a function");
    };
    assert_eq!(add.name.name, "add");
    assert_eq!(add.params.len(), 2);
    assert_eq!(add.params[0].annotation.as_ref().map(|a| a.name.as_str()), Some("int"));
    assert!(add.params[1].annotation.is_none());
    assert_eq!(add.return_annotation.as_ref().map(|a| a.name.as_str()), Some("int"));
    assert!(matches!(add.body.statements[0].kind, StmtKind::Return(Some(_))));

    let StmtKind::Function(noop) = &program.statements[1].kind else {
        panic!("expected a function");
    };
    assert!(noop.body.statements.is_empty());
}

#[test]
fn test_arrow_return_annotation() {
    let StmtKind::Function(f) = single("function f() -> string { return \"x\" }") else {
        panic!("expected a function");
    };
    assert_eq!(f.return_annotation.map(|a| a.name), Some("string".to_string()));
}

#[test]
fn test_elif_chain_is_right_leaning() {
    let source = "if a\n  x = 1\nelif b\n  x = 2\nelif c\n  x = 3\nelse\n  x = 4\nend";
    let StmtKind::If(top) = single(source) else {
        panic!("expected an if statement");
    };
    assert_eq!(name(&top.condition), "a");

    let first = top.else_branch.expect("missing first elif");
    let StmtKind::If(elif_b) = first.kind else {
        panic!("elif should nest as an if statement");
    };
    assert_eq!(name(&elif_b.condition), "b");

    let second = elif_b.else_branch.expect("missing second elif");
    let StmtKind::If(elif_c) = second.kind else {
        panic!("elif should nest as an if statement");
    };
    assert_eq!(name(&elif_c.condition), "c");

    let last = elif_c.else_branch.expect("missing else");
    let StmtKind::Block(else_block) = last.kind else {
        panic!("else should be a block");
    };
    assert_eq!(else_block.statements.len(), 1);
}

#[test]
fn test_braced_if_else() {
    let StmtKind::If(stmt) = single("if cond { a } else { b }") else {
        panic!("expected an if statement");
    };
    assert_eq!(stmt.then_block.statements.len(), 1);
    assert!(matches!(
        stmt.else_branch.map(|s| s.kind),
        Some(StmtKind::Block(_))
    ));
}

#[test]
fn test_for_range_forms() {
    let StmtKind::For(stmt) = single("for i in range(10)\n  print(i)\nend") else {
        panic!("expected a for loop");
    };
    assert_eq!(stmt.variable.name, "i");
    let ForIterable::Range(range) = &stmt.iterable else {
        panic!("range(...) should become a range");
    };
    assert!(range.start.is_none());
    assert_eq!(number(&range.end), "10");

    let StmtKind::For(stmt) = single("for i in range(2, n) { }") else {
        panic!("expected a for loop");
    };
    let ForIterable::Range(range) = &stmt.iterable else {
        panic!("range(...) should become a range");
    };
    assert_eq!(range.start.as_ref().map(number), Some("2"));
    assert_eq!(name(&range.end), "n");

    let StmtKind::For(stmt) = single("for i in 1..5 { }") else {
        panic!("expected a for loop");
    };
    assert!(matches!(stmt.iterable, ForIterable::Range(_)));

    let StmtKind::For(stmt) = single("for item in items { }") else {
        panic!("expected a for loop");
    };
    assert!(matches!(&stmt.iterable, ForIterable::Collection(e) if name(e) == "items"));
}

#[test]
fn test_loops() {
    assert!(matches!(single("while x < 3\n  x += 1\nend"), StmtKind::While(_)));
    assert!(matches!(single("while x { x = x - 1 }"), StmtKind::While(_)));

    let StmtKind::DoWhile(stmt) = single("do\n  x += 1\nend while x < 10") else {
        panic!("expected do-while");
    };
    assert_eq!(stmt.body.statements.len(), 1);
    assert!(matches!(single("do { x = 1 } while false"), StmtKind::DoWhile(_)));
}

#[test]
fn test_break_continue_return() {
    let program = parse_ok("while true\n  break\n  continue\n  return\n  return 1\nend");
    let StmtKind::While(stmt) = &program.statements[0].kind else {
        panic!("expected a while loop");
    };
    let kinds: Vec<&StmtKind> = stmt.body.statements.iter().map(|s| &s.kind).collect();
    assert!(matches!(kinds[0], StmtKind::Break));
    assert!(matches!(kinds[1], StmtKind::Continue));
    assert!(matches!(kinds[2], StmtKind::Return(None)));
    assert!(matches!(kinds[3], StmtKind::Return(Some(_))));
}

#[test]
fn test_try_catch_finally_and_throw() {
    let StmtKind::Try(stmt) =
        single("try\n  throw \"bad\"\ncatch err\n  print(err)\nfinally\n  done()\nend")
    else {
        panic!("expected try");
    };
    assert!(matches!(stmt.body.statements[0].kind, StmtKind::Throw(_)));
    let catch = stmt.catch.expect("missing catch");
    assert_eq!(catch.binding.map(|b| b.name), Some("err".to_string()));
    assert!(stmt.finally.is_some());

    let StmtKind::Try(stmt) = single("try { a() } catch (e) { b() }") else {
        panic!("expected try");
    };
    assert!(stmt.catch.is_some());
    assert!(stmt.finally.is_none());
}

#[test]
fn test_class_declaration() {
    let StmtKind::Class(class) = single("class Point\n  var x = 0\n  function norm() { return x }\nend")
    else {
        panic!("expected a class");
    };
    assert_eq!(class.name.name, "Point");
    assert_eq!(class.body.statements.len(), 2);
}

#[test]
fn test_compound_assignment() {
    let stmt = single("total *= 2");
    let assign = assignment(&stmt);
    assert_eq!(assign.op, Some(BinaryOp::Mul));
    assert_eq!(name(&assign.target), "total");
}

#[test]
fn test_separators_and_blank_lines() {
    let program = parse_ok("\n\nvar a = 1; var b = 2\n\n;\nprint(a)\n");
    assert_eq!(program.statements.len(), 3);
}

#[test]
fn test_nested_brace_block() {
    let program = parse_ok("{\n  var x = 1\n  { var y = 2 }\n}");
    let StmtKind::Block(block) = &program.statements[0].kind else {
        panic!("expected a block");
    };
    assert_eq!(block.statements.len(), 2);
    assert!(matches!(block.statements[1].kind, StmtKind::Block(_)));
}

#[test]
fn test_embed_block_is_opaque() {
    let StmtKind::Embed(embed) = single("#embed python\nprint('hi')\nx = 1\n#endembed") else {
        panic!("expected an embed block");
    };
    assert_eq!(embed.language, "python");
    assert_eq!(embed.code, "print ( \"hi\" )\nx = 1");
}

#[test]
fn test_hash_line_is_a_comment() {
    let program = parse_ok("# a note about x\nvar x = 1");
    assert_eq!(program.statements.len(), 1);
}

// --- Errors and recovery ---

#[test]
fn test_recovery_skips_to_next_line() {
    let (program, errors) = parse_err("var = 5\nvar y = 2");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code(), "E0100");
    assert!(errors[0].message().contains("identifier"), "{}", errors[0].message());
    assert!(errors[0].message().contains("found '='"), "{}", errors[0].message());

    assert_eq!(program.statements.len(), 1);
    let StmtKind::VarDecl(decl) = &program.statements[0].kind else {
        panic!("expected the second declaration to survive");
    };
    assert_eq!(decl.name.name, "y");
}

#[test]
fn test_recovery_stops_at_statement_keyword() {
    // The whole of `x = )` is dropped, up to `var`.
    let (program, errors) = parse_err("x = ) var y = 2");
    assert_eq!(errors.len(), 1);
    assert_eq!(program.statements.len(), 1);
    let StmtKind::VarDecl(decl) = &program.statements[0].kind else {
        panic!("expected only the declaration to survive");
    };
    assert_eq!(decl.name.name, "y");
}

#[test]
fn test_unfinished_initializer_drops_the_declaration() {
    let (program, errors) = parse_err("const K = (1 +
var z = 3");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code(), "E0100");
    assert_eq!(program.statements.len(), 1);
    let StmtKind::VarDecl(decl) = &program.statements[0].kind else {
        panic!("expected the next line to survive");
    };
    assert_eq!(decl.name.name, "z");
}

#[test]
fn test_trailing_tokens_fail_the_whole_line() {
    let (program, errors) = parse_err("var n: int = 2 3
print(n)");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message().contains("found number '3'"), "{}", errors[0].message());
    assert_eq!(program.statements.len(), 1);
    assert!(matches!(program.statements[0].kind, StmtKind::Expr(_)));

    let (program, errors) = parse_err("print(1 2)");
    assert_eq!(errors.len(), 1);
    assert!(program.statements.is_empty());
}

#[test]
fn test_statements_need_a_separator() {
    let (program, errors) = parse_err("x = 1 y = 2");
    assert_eq!(errors.len(), 1);
    assert!(program.statements.is_empty());

    // Closers and `;` end a statement too.
    let program = parse_ok("if a { x = 1 }; y = 2");
    assert_eq!(program.statements.len(), 2);
}

#[test]
fn test_root_exists_when_everything_fails() {
    let (program, errors) = parse_err("+ + +\n) )");
    assert!(program.statements.is_empty());
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_stray_end_is_reported() {
    let (program, errors) = parse_err("end\nvar x = 1");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code(), "E0101");
    assert_eq!(program.statements.len(), 1);
}

#[test]
fn test_missing_end_is_reported() {
    let (_, errors) = parse_err("while x\n  y = 1\n");
    assert!(errors.iter().all(|e| e.code() == "E0100"));
}

#[test]
fn test_error_inside_block_keeps_block() {
    let (program, errors) = parse_err("while x {\n  y = = 1\n  z = 2\n}");
    assert_eq!(errors.len(), 1);
    let StmtKind::While(stmt) = &program.statements[0].kind else {
        panic!("the loop itself should survive");
    };
    // Only `z = 2` is left; nothing of the broken line is kept.
    assert_eq!(stmt.body.statements.len(), 1);
    let StmtKind::Assign(assign) = &stmt.body.statements[0].kind else {
        panic!("expected the assignment to z");
    };
    assert_eq!(name(&assign.target), "z");
}

#[test]
fn test_brace_body_on_next_line() {
    let StmtKind::Function(f) = single("function h()
{
  return 1
}") else {
        panic!("expected a function");
    };
    assert_eq!(f.body.statements.len(), 1);

    let StmtKind::While(stmt) = single("while x
{ y = 1 }") else {
        panic!("expected a while loop");
    };
    assert_eq!(stmt.body.statements.len(), 1);

    assert!(matches!(single("if x
{ y = 1 }
else { y = 2 }"), StmtKind::If(_)));
}
