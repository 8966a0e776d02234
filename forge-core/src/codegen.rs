//! AST-to-source generation
//!
//! Walks a syntax tree and emits canonical source through [`Printer`].
//! The output always re-parses to a tree of the same shape.

use crate::ast::*;
use crate::printer::{FormatConfig, Printer};

/// Binding strength of unary prefixes (`-`, `!`, `await`)
const PREFIX_PREC: u8 = 7;
/// Binding strength of calls, indexing and atoms
const POSTFIX_PREC: u8 = 8;

/// Generate source for a complete program
pub fn print_program(program: &Program, config: &FormatConfig) -> String {
    let mut printer = Printer::new(config.clone());
    print_block_body(&program.stmts, &mut printer);
    printer.finish()
}

/// Generate source for a single expression
pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::new(FormatConfig::default());
    format_expr(expr, &mut printer);
    printer.finish().trim_end().to_string()
}

fn print_block_body(stmts: &[Stmt], p: &mut Printer) {
    let blank_lines = p.config().blank_lines_after_fn;
    for (i, stmt) in stmts.iter().enumerate() {
        format_stmt(stmt, p);
        if matches!(stmt, Stmt::Fn(_)) && i + 1 < stmts.len() {
            p.blank_lines(blank_lines);
        }
    }
}

fn format_block(stmts: &[Stmt], p: &mut Printer) {
    p.writeln("{");
    p.indented(|p| print_block_body(stmts, p));
    p.write("}");
}

fn format_stmt(stmt: &Stmt, p: &mut Printer) {
    match stmt {
        Stmt::Let { name, value, .. } => {
            p.write("let ");
            p.write(name);
            p.write(" = ");
            format_expr(value, p);
            p.writeln(";");
        }
        Stmt::Assign { name, value, .. } => {
            p.write(name);
            p.write(" = ");
            format_expr(value, p);
            p.writeln(";");
        }
        Stmt::SetIndex { target, index, value, .. } => {
            format_operand(target, POSTFIX_PREC, p);
            p.write("[");
            format_expr(index, p);
            p.write("] = ");
            format_expr(value, p);
            p.writeln(";");
        }
        Stmt::Expr(expr) => {
            format_expr(expr, p);
            p.writeln(";");
        }
        Stmt::Return(value, _) => {
            p.write("return");
            if let Some(value) = value {
                p.write(" ");
                format_expr(value, p);
            }
            p.writeln(";");
        }
        Stmt::Fn(decl) => {
            if decl.is_async {
                p.write("async ");
            }
            p.write("fn ");
            p.write(&decl.name);
            p.write("(");
            for (i, param) in decl.params.iter().enumerate() {
                if i > 0 {
                    p.comma();
                }
                p.write(param);
            }
            p.write(") ");
            format_block(&decl.body, p);
            p.newline();
        }
        Stmt::If { .. } => {
            format_if(stmt, p);
            p.newline();
        }
        Stmt::While { condition, body, .. } => {
            p.write("while ");
            format_expr(condition, p);
            p.write(" ");
            format_block(body, p);
            p.newline();
        }
        Stmt::Loop { body, .. } => {
            p.write("loop ");
            format_block(body, p);
            p.newline();
        }
        Stmt::Break(_) => p.writeln("break;"),
        Stmt::Continue(_) => p.writeln("continue;"),
    }
}

/// `if` without the trailing newline, so `else if` chains stay on one line
fn format_if(stmt: &Stmt, p: &mut Printer) {
    let Stmt::If { condition, then_body, else_body, .. } = stmt else {
        return;
    };
    p.write("if ");
    format_expr(condition, p);
    p.write(" ");
    format_block(then_body, p);

    match else_body.as_deref() {
        Some([nested @ Stmt::If { .. }]) => {
            p.write(" else ");
            format_if(nested, p);
        }
        Some(body) => {
            p.write(" else ");
            format_block(body, p);
        }
        None => {}
    }
}

fn precedence(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Binary { op, .. } => op.precedence(),
        ExprKind::Unary { .. } | ExprKind::Await { .. } => PREFIX_PREC,
        _ => POSTFIX_PREC,
    }
}

/// Emit `expr`, parenthesised when it binds looser than `min_prec`
fn format_operand(expr: &Expr, min_prec: u8, p: &mut Printer) {
    if precedence(expr) < min_prec {
        p.write("(");
        format_expr(expr, p);
        p.write(")");
    } else {
        format_expr(expr, p);
    }
}

fn format_expr(expr: &Expr, p: &mut Printer) {
    match &expr.kind {
        ExprKind::Literal(literal) => format_literal(literal, p),
        ExprKind::Ident(name) => p.write(name),
        ExprKind::List { elements } => {
            p.write("[");
            format_list(elements, p);
            p.write("]");
        }
        ExprKind::Binary { left, op, right } => {
            let prec = op.precedence();
            format_operand(left, prec, p);
            p.operator(&op.to_string());
            // Left-associative: an equal-precedence right operand needs parens
            format_operand(right, prec + 1, p);
        }
        ExprKind::Unary { op, expr } => {
            p.write(&op.to_string());
            format_operand(expr, PREFIX_PREC, p);
        }
        ExprKind::Await { expr } => {
            p.write("await ");
            format_operand(expr, PREFIX_PREC, p);
        }
        ExprKind::Call { callee, args } => {
            format_operand(callee, POSTFIX_PREC, p);
            p.write("(");
            format_list(args, p);
            p.write(")");
        }
        ExprKind::Index { expr, index } => {
            format_operand(expr, POSTFIX_PREC, p);
            p.write("[");
            format_expr(index, p);
            p.write("]");
        }
    }
}

fn format_list(items: &[Expr], p: &mut Printer) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            p.comma();
        }
        format_expr(item, p);
    }
}

fn format_literal(literal: &Literal, p: &mut Printer) {
    match literal {
        Literal::Int(n) => p.write(&n.to_string()),
        Literal::Float(f) => p.write(&float_literal(*f)),
        Literal::Bool(b) => p.write(if *b { "true" } else { "false" }),
        Literal::String(s) => p.write(&quote(s)),
        Literal::None => p.write("none"),
    }
}

/// Float text the lexer reads back as a float: always has a fractional part
fn float_literal(f: f64) -> String {
    let text = format!("{:?}", f);
    match text.find('e') {
        Some(pos) if !text[..pos].contains('.') => {
            format!("{}.0{}", &text[..pos], &text[pos..])
        }
        _ => text,
    }
}

/// Quote and escape a string literal
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn round_trip(source: &str) -> String {
        let program = parse(source).unwrap();
        let printed = print_program(&program, &FormatConfig::default());
        let reparsed = parse(&printed).unwrap();
        assert!(program.same_shape(&reparsed), "shape changed:\n{printed}");
        printed
    }

    #[test]
    fn test_let_and_call() {
        let printed = round_trip("let x=1+2*3;print(x,\"a\");");
        assert_eq!(printed, "let x = 1 + 2 * 3;\nprint(x, \"a\");\n");
    }

    #[test]
    fn test_parens_preserved_where_needed() {
        let printed = round_trip("let x = (1 + 2) * 3; let y = 1 - (2 - 3); let z = -(a + b);");
        assert!(printed.contains("(1 + 2) * 3"));
        assert!(printed.contains("1 - (2 - 3)"));
        assert!(printed.contains("-(a + b)"));
    }

    #[test]
    fn test_await_and_postfix() {
        let printed = round_trip("let n = int(await input(\"n? \"))[0];");
        assert!(printed.contains("int(await input(\"n? \"))[0]"));
    }

    #[test]
    fn test_control_flow_layout() {
        let source = "fn f(a,b){if a{return 1;}else if b{return 2;}else{while true{break;}}}f(1,2);";
        let printed = round_trip(source);
        assert!(printed.contains("fn f(a, b) {\n    if a {\n        return 1;\n    } else if b {"));
        assert!(printed.contains("    } else {\n        while true {\n            break;\n        }\n    }\n}\n\nf(1, 2);"));
    }

    #[test]
    fn test_string_escapes_survive() {
        round_trip(r#"print("tab\there \"quoted\" back\\slash\n");"#);
    }

    #[test]
    fn test_float_literals() {
        assert_eq!(float_literal(3.0), "3.0");
        assert_eq!(float_literal(1e-7), "1.0e-7");
        round_trip("let f = 2.5; let g = 0.000001;");
    }
}
