//! Integration tests for forge-core

use forge_core::printer::IndentStyle;
use forge_core::{check, format, parse, rewrite, FormatConfig, RewriteConfig, RewriteResult, SameShape};

fn rewritten_source(source: &str) -> String {
    match rewrite(source, &RewriteConfig::default()) {
        RewriteResult::Ok(unit) => unit.source,
        RewriteResult::Failed(diagnostic) => panic!("rewrite failed: {}", diagnostic),
    }
}

#[test]
fn test_format_function_with_statements() {
    let result = format("fn main(){let x=42;let y=x+10;return y;}", &FormatConfig::default()).unwrap();

    assert!(result.contains("fn main() {"));
    assert!(result.contains("    let x = 42;"));
    assert!(result.contains("    let y = x + 10;"));
    assert!(result.contains("    return y;"));
}

#[test]
fn test_format_with_tabs_and_compact_spacing() {
    let config = FormatConfig { indent_style: IndentStyle::Tabs, ..FormatConfig::compact() };
    let result = format("fn f(a,b){return a+b;}", &config).unwrap();
    assert_eq!(result, "fn f(a,b) {\n\treturn a+b;\n}\n");
}

#[test]
fn test_rewritten_unit_is_reparseable() {
    let source = r#"
        fn greet() {
            let name = input("Your name: ");
            if name == "" {
                return "nobody";
            }
            return name;
        }
        let who = greet();
        while who != "stop" {
            print("Hello,", who);
            who = input();
        }
    "#;
    let unit = rewritten_source(source);
    let program = parse(&unit).unwrap();
    assert_eq!(program.stmts.len(), 2);
    assert!(unit.contains("let name = await input(\"Your name: \");"));
    assert!(unit.contains("who = await input();"));
}

#[test]
fn test_rewrite_is_stable_on_its_own_output() {
    let once = rewritten_source("let a = input(\"a\"); print(a);");
    let again = rewrite(&once, &RewriteConfig { entry: "__outer__".into(), ..Default::default() });
    let RewriteResult::Ok(unit) = again else {
        panic!("second rewrite failed");
    };
    assert_eq!(unit.suspension_points, 0);
    assert!(!unit.source.contains("await await"));
    assert_eq!(parse(&unit.source).unwrap().stmts.len(), 2);
}

#[test]
fn test_rewrite_preserves_non_input_statements() {
    let source = "let xs = [1, 2, 3]; xs[0] = -xs[1] * (2 + 3); print(xs, len(xs) % 2 == 1 && true);";
    let unit = rewritten_source(source);
    let original = parse(source).unwrap();
    let wrapped = parse(&unit).unwrap();

    let forge_core::Stmt::Fn(entry) = &wrapped.stmts[0] else {
        panic!("expected the entry function first");
    };
    assert!(entry.is_async);
    assert!(entry.body.same_shape(&original.stmts));
}

#[test]
fn test_check_collects_errors_across_statements() {
    let errors = check("let a = ;\nprint(1);\nfn (x) { }\nlet ok = 2;").unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors.to_string().starts_with("Found 2 error(s):"));
}
