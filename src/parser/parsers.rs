// src/parser/parsers.rs

use chumsky::input::ValueInput;
use chumsky::prelude::*;
use chumsky::recovery::via_parser;

use super::ast::*;
use crate::analyzer::DataType;
use crate::lexer::{Operator, TokenKind};
use crate::utils::Span;

pub(super) type ParseError<'a> = extra::Err<Rich<'a, TokenKind, Span>>;

/// The parts of an `if` chain before it is folded into nested nodes.
type IfParts = (((Expr, Block), Vec<(Expr, Block, Span)>), Option<Block>);

enum Postfix {
    Call(Vec<Expr>),
    Index(Expr),
    Member(Identifier),
}

fn operator<'a, I>(op: Operator) -> impl Parser<'a, I, TokenKind, ParseError<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = Span>,
{
    just(TokenKind::Op(op))
}

fn keyword_ident<'a, I>(word: &str) -> impl Parser<'a, I, TokenKind, ParseError<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = Span>,
{
    just(TokenKind::Ident(word.to_string()))
}

fn identifier<'a, I>() -> impl Parser<'a, I, Identifier, ParseError<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = Span>,
{
    select! {
        TokenKind::Ident(name) = e => Identifier { name, span: e.span() },
    }
    .labelled("identifier")
}

fn type_annotation<'a, I>() -> impl Parser<'a, I, TypeAnnotation, ParseError<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = Span>,
{
    select! {
        TokenKind::IntType = e => TypeAnnotation::new("int", e.span()),
        TokenKind::FloatType = e => TypeAnnotation::new("float", e.span()),
        TokenKind::StringType = e => TypeAnnotation::new("string", e.span()),
        TokenKind::BoolType = e => TypeAnnotation::new("bool", e.span()),
        TokenKind::AutoType = e => TypeAnnotation::new("auto", e.span()),
        TokenKind::VoidType = e => TypeAnnotation::new("void", e.span()),
        TokenKind::Null = e => TypeAnnotation::new("null", e.span()),
        TokenKind::Function = e => TypeAnnotation::new("function", e.span()),
        TokenKind::Ident(name) = e => TypeAnnotation { name, span: e.span() },
    }
    .labelled("type")
}

fn fold_binary(left: Expr, (op, right): (BinaryOp, Expr)) -> Expr {
    let span = left.span.join(right.span);
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

/// Expressions, lowest precedence first:
/// assignment, ternary, `||`, `&&`, equality, relational, additive, multiplicative,
/// prefix `!`/`-`, postfix call/index/member, primary.
pub(super) fn expr_parser<'a, I>() -> impl Parser<'a, I, Expr, ParseError<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = Span>,
{
    recursive(|expr| {
        // --- 1. Primary expressions ---

        let literal = select! {
            TokenKind::Number(text) => Literal::Number(text),
            TokenKind::Str(value) => Literal::Str(value),
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            TokenKind::Null => Literal::Null,
        }
        .map_with(|literal, e| Expr::new(ExprKind::Literal(literal), e.span()))
        .labelled("literal");

        let variable = select! { TokenKind::Ident(name) => name }
            .map_with(|name, e| Expr::new(ExprKind::Identifier(name), e.span()))
            .labelled("identifier");

        let items = expr
            .clone()
            .separated_by(just(TokenKind::Comma))
            .allow_trailing()
            .collect::<Vec<_>>();

        let array = items
            .clone()
            .delimited_by(just(TokenKind::LBracket), just(TokenKind::RBracket))
            .map_with(|elements, e| Expr::new(ExprKind::Array(elements), e.span()));

        // `{` only starts an object here; at statement level it opens a block first.
        let key = select! {
            TokenKind::Ident(name) = e => Identifier { name, span: e.span() },
            TokenKind::Str(name) = e => Identifier { name, span: e.span() },
        };
        let object = key
            .then_ignore(just(TokenKind::Colon))
            .then(expr.clone())
            .separated_by(just(TokenKind::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(TokenKind::LBrace), just(TokenKind::RBrace))
            .map_with(|entries, e| Expr::new(ExprKind::Object(entries), e.span()));

        let parenthesized = expr
            .clone()
            .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen));

        let primary = choice((literal, variable, parenthesized, array, object)).boxed();

        // --- 2. Postfix and prefix ---

        // Postfix forms chain left to right: `a.b[0]()`.
        let postfix_op = choice((
            items
                .clone()
                .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen))
                .map(Postfix::Call),
            expr.clone()
                .delimited_by(just(TokenKind::LBracket), just(TokenKind::RBracket))
                .map(Postfix::Index),
            just(TokenKind::Dot)
                .ignore_then(identifier())
                .map(Postfix::Member),
        ))
        .map_with(|postfix, e| (postfix, e.span()));

        let postfix = primary
            .foldl(postfix_op.repeated(), |target, (postfix, span): (Postfix, Span)| {
                let span = target.span.join(span);
                let target = Box::new(target);
                let kind = match postfix {
                    Postfix::Call(args) => ExprKind::Call { callee: target, args },
                    Postfix::Index(index) => ExprKind::Index {
                        object: target,
                        index: Box::new(index),
                    },
                    Postfix::Member(property) => ExprKind::Member {
                        object: target,
                        property,
                    },
                };
                Expr::new(kind, span)
            })
            .boxed();

        let prefix_op = choice((
            operator(Operator::Bang).to(UnaryOp::Not),
            operator(Operator::Minus).to(UnaryOp::Neg),
        ))
        .map_with(|op, e| (op, e.span()));

        let unary = prefix_op
            .repeated()
            .foldr(postfix, |(op, span): (UnaryOp, Span), operand: Expr| {
                let span = span.join(operand.span);
                Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                )
            })
            .boxed();

        // --- 3. Binary operators, tightest first ---
        // Each level folds left, so `a - b - c` is `(a - b) - c`.

        let product_op = select! {
            TokenKind::Op(Operator::Star) => BinaryOp::Mul,
            TokenKind::Op(Operator::Slash) => BinaryOp::Div,
            TokenKind::Op(Operator::Percent) => BinaryOp::Mod,
        };
        let product = unary
            .clone()
            .foldl(product_op.then(unary).repeated(), fold_binary)
            .boxed();

        let sum_op = select! {
            TokenKind::Op(Operator::Plus) => BinaryOp::Add,
            TokenKind::Op(Operator::Minus) => BinaryOp::Sub,
        };
        let sum = product
            .clone()
            .foldl(sum_op.then(product).repeated(), fold_binary)
            .boxed();

        let relation_op = select! {
            TokenKind::Op(Operator::Lt) => BinaryOp::Lt,
            TokenKind::Op(Operator::Gt) => BinaryOp::Gt,
            TokenKind::Op(Operator::LtEq) => BinaryOp::Le,
            TokenKind::Op(Operator::GtEq) => BinaryOp::Ge,
        };
        let relation = sum
            .clone()
            .foldl(relation_op.then(sum).repeated(), fold_binary)
            .boxed();

        let equality_op = select! {
            TokenKind::Op(Operator::EqEq) => BinaryOp::Eq,
            TokenKind::Op(Operator::NotEq) => BinaryOp::Ne,
        };
        let equality = relation
            .clone()
            .foldl(equality_op.then(relation).repeated(), fold_binary)
            .boxed();

        let logical_and = equality
            .clone()
            .foldl(
                operator(Operator::AndAnd).to(BinaryOp::And).then(equality).repeated(),
                fold_binary,
            )
            .boxed();

        let logical_or = logical_and
            .clone()
            .foldl(
                operator(Operator::OrOr).to(BinaryOp::Or).then(logical_and).repeated(),
                fold_binary,
            )
            .boxed();

        // --- 4. Ternary and assignment ---

        // Both branches recurse into the full grammar, so `?:` nests to the right.
        let ternary = logical_or
            .then(
                just(TokenKind::Question)
                    .ignore_then(expr.clone())
                    .then_ignore(just(TokenKind::Colon))
                    .then(expr.clone())
                    .or_not(),
            )
            .map(|(condition, branches)| match branches {
                Some((then_branch, else_branch)) => {
                    let span = condition.span.join(else_branch.span);
                    Expr::new(
                        ExprKind::Ternary {
                            condition: Box::new(condition),
                            then_branch: Box::new(then_branch),
                            else_branch: Box::new(else_branch),
                        },
                        span,
                    )
                }
                None => condition,
            });

        // The value recurses into `expr`, which makes `a = b = c` right associative.
        // Whether the target is assignable is the analyzer's call.
        ternary
            .then(operator(Operator::Assign).ignore_then(expr).or_not())
            .map(|(target, value)| match value {
                Some(value) => {
                    let span = target.span.join(value.span);
                    Expr::new(
                        ExprKind::Assign {
                            target: Box::new(target),
                            value: Box::new(value),
                        },
                        span,
                    )
                }
                None => target,
            })
            .labelled("expression")
    })
}

fn build_if(parts: IfParts) -> StmtKind {
    let (((condition, then_block), elifs), else_block) = parts;
    let mut else_branch = else_block.map(|block| {
        let span = block.span;
        Box::new(Node::new(StmtKind::Block(block), span))
    });
    for (elif_condition, elif_block, clause_span) in elifs.into_iter().rev() {
        let span = match &else_branch {
            Some(next) => clause_span.join(next.span),
            None => clause_span,
        };
        let nested = IfStmt {
            condition: elif_condition,
            then_block: elif_block,
            else_branch,
        };
        else_branch = Some(Box::new(Node::new(StmtKind::If(nested), span)));
    }
    StmtKind::If(IfStmt {
        condition,
        then_block,
        else_branch,
    })
}

/// Rebuilds embedded foreign code from its tokens, one space between tokens on a line.
fn embedded_text(tokens: Vec<TokenKind>) -> String {
    let mut text = String::new();
    for token in tokens {
        if token == TokenKind::Newline {
            if !text.is_empty() {
                text.push('\n');
            }
            continue;
        }
        if !text.is_empty() && !text.ends_with('\n') {
            text.push(' ');
        }
        text.push_str(&token.to_string());
    }
    text.trim_end().to_string()
}

/// Statements. `None` stands for a statement that produced no node: a `#` comment line,
/// or a malformed statement that recovery discarded.
pub(super) fn statement_parser<'a, I>() -> impl Parser<'a, I, Option<Stmt>, ParseError<'a>> + Clone
where
    I: ValueInput<'a, Token = TokenKind, Span = Span>,
{
    let expr = expr_parser().boxed();

    recursive(|stmt| {
        let separator = just(TokenKind::Newline)
            .or(just(TokenKind::Semicolon))
            .ignored();
        let newlines = just(TokenKind::Newline).repeated();

        let body = choice((separator.to(None::<Stmt>), stmt))
            .repeated()
            .collect::<Vec<Option<Stmt>>>()
            .map_with(|items, e| Block {
                statements: items.into_iter().flatten().collect(),
                span: e.span(),
            })
            .boxed();

        let brace_block = just(TokenKind::LBrace)
            .ignore_then(body.clone())
            .then_ignore(just(TokenKind::RBrace))
            .map_with(|block, e| Block {
                span: e.span(),
                ..block
            })
            .boxed();

        let keyword_block = body.clone().then_ignore(just(TokenKind::End)).boxed();

        // A header's `{` may sit on the next line; anything else opens a keyword body.
        let header_brace = newlines.clone().ignore_then(brace_block.clone()).boxed();
        let block_like = choice((header_brace.clone(), keyword_block.clone())).boxed();

        let annotation = just(TokenKind::Colon).ignore_then(type_annotation());

        // --- declarations ---

        let decl_kind = select! {
            TokenKind::Var => DeclKind::Var,
            TokenKind::Let => DeclKind::Let,
            TokenKind::Const => DeclKind::Const,
        };
        let var_decl = decl_kind
            .then(identifier())
            .then(annotation.clone().or_not())
            .then(operator(Operator::Assign).ignore_then(expr.clone()).or_not())
            .map(|(((kind, name), annotation), initializer)| {
                StmtKind::VarDecl(VarDecl {
                    kind,
                    name,
                    annotation,
                    initializer,
                    data_type: DataType::Unknown,
                })
            });

        let param = identifier()
            .then(annotation.clone().or_not())
            .map_with(|(name, annotation), e| Param {
                name,
                annotation,
                span: e.span(),
            });
        let params = param
            .separated_by(just(TokenKind::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen));
        let return_annotation = just(TokenKind::Colon)
            .or(operator(Operator::ThinArrow))
            .ignore_then(type_annotation());

        let function = just(TokenKind::Function)
            .ignore_then(identifier())
            .then(params)
            .then(return_annotation.or_not())
            .then(block_like.clone())
            .map(|(((name, params), return_annotation), body)| {
                StmtKind::Function(FunctionDecl {
                    name,
                    params,
                    return_annotation,
                    body,
                    return_type: DataType::Unknown,
                })
            });

        let class = just(TokenKind::Class)
            .ignore_then(identifier())
            .then(block_like.clone())
            .map(|(name, body)| StmtKind::Class(ClassDecl { name, body }));

        // --- control flow ---
        // Each construct has a braced form and a keyword form closed by `end`.

        let braced_if = just(TokenKind::If)
            .ignore_then(expr.clone())
            .then(header_brace.clone())
            .then(
                newlines
                    .clone()
                    .ignore_then(just(TokenKind::Elif))
                    .ignore_then(expr.clone())
                    .then(brace_block.clone())
                    .map_with(|(condition, block), e| (condition, block, e.span()))
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .then(
                newlines
                    .clone()
                    .ignore_then(just(TokenKind::Else))
                    .ignore_then(brace_block.clone())
                    .or_not(),
            );

        let keyword_if = just(TokenKind::If)
            .ignore_then(expr.clone())
            .then(body.clone())
            .then(
                just(TokenKind::Elif)
                    .ignore_then(expr.clone())
                    .then(body.clone())
                    .map_with(|(condition, block), e| (condition, block, e.span()))
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .then(just(TokenKind::Else).ignore_then(body.clone()).or_not())
            .then_ignore(just(TokenKind::End));

        let if_stmt = choice((braced_if, keyword_if)).map(build_if);

        let range_call = keyword_ident("range")
            .ignore_then(
                expr.clone()
                    .then(just(TokenKind::Comma).ignore_then(expr.clone()).or_not())
                    .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen)),
            )
            .map_with(|(first, second), e| match second {
                Some(end) => RangeExpr {
                    start: Some(first),
                    end,
                    span: e.span(),
                },
                None => RangeExpr {
                    start: None,
                    end: first,
                    span: e.span(),
                },
            });
        let iterable = choice((
            range_call.map(ForIterable::Range),
            expr.clone()
                .then(just(TokenKind::DotDot).ignore_then(expr.clone()).or_not())
                .map_with(|(first, end), e| match end {
                    Some(end) => ForIterable::Range(RangeExpr {
                        start: Some(first),
                        end,
                        span: e.span(),
                    }),
                    None => ForIterable::Collection(first),
                }),
        ));
        let for_stmt = just(TokenKind::For)
            .ignore_then(identifier())
            .then_ignore(keyword_ident("in").labelled("'in'"))
            .then(iterable)
            .then(block_like.clone())
            .map(|((variable, iterable), body)| {
                StmtKind::For(ForStmt {
                    variable,
                    iterable,
                    body,
                })
            });

        let while_stmt = just(TokenKind::While)
            .ignore_then(expr.clone())
            .then(block_like.clone())
            .map(|(condition, body)| StmtKind::While(WhileStmt { condition, body }));

        let do_while = just(TokenKind::Do)
            .ignore_then(block_like.clone())
            .then_ignore(newlines.clone())
            .then_ignore(just(TokenKind::While))
            .then(expr.clone())
            .map(|(body, condition)| StmtKind::DoWhile(DoWhileStmt { body, condition }));

        let catch_binding = identifier()
            .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen))
            .or(identifier())
            .or_not();
        let braced_try = just(TokenKind::Try)
            .ignore_then(header_brace.clone())
            .then(
                newlines
                    .clone()
                    .ignore_then(just(TokenKind::Catch))
                    .ignore_then(catch_binding.clone())
                    .then(brace_block.clone())
                    .or_not(),
            )
            .then(
                newlines
                    .clone()
                    .ignore_then(just(TokenKind::Finally))
                    .ignore_then(brace_block.clone())
                    .or_not(),
            );
        let keyword_try = just(TokenKind::Try)
            .ignore_then(body.clone())
            .then(
                just(TokenKind::Catch)
                    .ignore_then(catch_binding)
                    .then(body.clone())
                    .or_not(),
            )
            .then(just(TokenKind::Finally).ignore_then(body.clone()).or_not())
            .then_ignore(just(TokenKind::End));
        let try_stmt = choice((braced_try, keyword_try)).map(|((body, catch), finally)| {
            StmtKind::Try(TryStmt {
                body,
                catch: catch.map(|(binding, body)| CatchClause { binding, body }),
                finally,
            })
        });

        let throw = just(TokenKind::Throw)
            .ignore_then(expr.clone())
            .map(StmtKind::Throw);

        let ret = just(TokenKind::Return)
            .ignore_then(expr.clone().or_not())
            .map(StmtKind::Return);

        // --- simple statements ---

        let compound_op = select! {
            TokenKind::Op(Operator::PlusAssign) => BinaryOp::Add,
            TokenKind::Op(Operator::MinusAssign) => BinaryOp::Sub,
            TokenKind::Op(Operator::StarAssign) => BinaryOp::Mul,
            TokenKind::Op(Operator::SlashAssign) => BinaryOp::Div,
            TokenKind::Op(Operator::PercentAssign) => BinaryOp::Mod,
        };
        let compound_assign = expr
            .clone()
            .then(compound_op)
            .then(expr.clone())
            .map(|((target, op), value)| {
                StmtKind::Assign(AssignStmt {
                    target,
                    op: Some(op),
                    value,
                })
            });

        // A top-level `=` becomes an assignment statement; nested ones stay expressions.
        let expression = expr.clone().map(|expr| match expr {
            Expr {
                kind: ExprKind::Assign { target, value },
                ..
            } => StmtKind::Assign(AssignStmt {
                target: *target,
                op: None,
                value: *value,
            }),
            other => StmtKind::Expr(other),
        });

        let statement = choice((
            var_decl,
            function,
            class,
            if_stmt,
            for_stmt,
            while_stmt,
            do_while,
            try_stmt,
            throw,
            ret,
            just(TokenKind::Break).to(StmtKind::Break),
            just(TokenKind::Continue).to(StmtKind::Continue),
            brace_block.map(StmtKind::Block),
            compound_assign,
            expression,
        ))
        .map_with(|kind, e| Some(Node::new(kind, e.span())));

        // `#embed <language> ... #endembed`; any other `#` line is a comment.
        let embed_end = just(TokenKind::Hash).then(just(TokenKind::EndEmbed));
        let embed = just(TokenKind::Hash)
            .ignore_then(just(TokenKind::Embed))
            .ignore_then(
                any()
                    .filter(|t: &TokenKind| !t.is_separator() && *t != TokenKind::Hash)
                    .map(|t: TokenKind| t.to_string())
                    .labelled("language name"),
            )
            .then(
                any()
                    .and_is(embed_end.clone().not())
                    .repeated()
                    .collect::<Vec<TokenKind>>(),
            )
            .then_ignore(embed_end)
            .map_with(|(language, tokens), e| {
                let code = embedded_text(tokens);
                Some(Node::new(StmtKind::Embed(EmbedCode { language, code }), e.span()))
            });
        let hash_comment = just(TokenKind::Hash)
            .then(any().filter(|t: &TokenKind| *t != TokenKind::Newline).repeated())
            .to(None::<Stmt>);

        // Discard the failed statement up to the next separator or statement keyword.
        let recovery = any()
            .filter(|t: &TokenKind| !t.closes_block() && !t.is_separator())
            .then(
                any()
                    .filter(|t: &TokenKind| {
                        !t.is_separator() && !t.starts_statement() && !t.closes_block()
                    })
                    .repeated(),
            )
            .to(None::<Stmt>);

        // A statement must end at a separator, a block closer, a `#` comment or the end of
        // input. A line that only parses in part then fails as a whole and recovery drops it.
        let terminator = choice((
            any()
                .filter(|t: &TokenKind| t.is_separator() || t.closes_block() || *t == TokenKind::Hash)
                .ignored(),
            end(),
        ))
        .rewind()
        .labelled("end of statement");

        choice((embed, hash_comment, statement))
            .then_ignore(terminator)
            .labelled("statement")
            .recover_with(via_parser(recovery))
    })
}

pub(super) fn program_parser<'a, I>() -> impl Parser<'a, I, Program, ParseError<'a>>
where
    I: ValueInput<'a, Token = TokenKind, Span = Span>,
{
    let separator = just(TokenKind::Newline)
        .or(just(TokenKind::Semicolon))
        .ignored();

    // A closer with nothing open: report it and move on.
    let stray_closer = any()
        .filter(|t: &TokenKind| t.closes_block())
        .validate(|token: TokenKind, e, emitter| {
            emitter.emit(Rich::custom(
                e.span(),
                format!("Unexpected {} with no open block", token.describe()),
            ));
            None::<Stmt>
        });

    choice((separator.to(None::<Stmt>), statement_parser(), stray_closer))
        .repeated()
        .collect::<Vec<Option<Stmt>>>()
        .map(|items| Program {
            statements: items.into_iter().flatten().collect(),
        })
        .then_ignore(end())
}
