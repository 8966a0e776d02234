//! # Forge script front-end
//!
//! Forge script is a small brace-delimited scripting language. This crate
//! turns its source into a syntax tree, prints trees back to source, and
//! rewrites scripts so their blocking input calls become suspension points
//! an async runtime can park on.
//!
//! ## Example
//!
//! ```text
//! let name = input("Your name: ");
//! print("Hello,", name);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Script source
//!     ↓ lexer
//! Token Stream
//!     ↓ parser
//! AST
//!     ↓ rewriter (await every input call, wrap in an async entry)
//! AST
//!     ↓ codegen
//! Rewritten unit (source)
//!     ↓ forge-runtime
//! Execution
//! ```

pub mod ast;
pub mod codegen;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod rewriter;

pub use ast::{Expr, ExprKind, FnDecl, Literal, Program, SameShape, Stmt};
pub use codegen::print_program;
pub use config::ForgeConfig;
pub use error::{Error, Errors, Result};
pub use lexer::{Lexer, Span, SpannedToken, Token};
pub use parser::Parser;
pub use printer::FormatConfig;
pub use rewriter::{rewrite, RewriteConfig, RewriteResult, RewrittenUnit};

/// Parse Forge source code into an AST
pub fn parse(source: &str) -> Result<Program> {
    let tokens = Lexer::new(source).tokenize_with_spans()?;
    Parser::new(tokens).parse()
}

/// Parse and report every syntax error instead of only the first
pub fn check(source: &str) -> std::result::Result<Program, Errors> {
    let tokens = Lexer::new(source).tokenize_with_spans()?;
    let (program, errors) = Parser::new(tokens).parse_recovering();
    if errors.is_empty() { Ok(program) } else { Err(errors) }
}

/// Reformat source into its canonical layout
pub fn format(source: &str, config: &FormatConfig) -> Result<String> {
    let program = parse(source)?;
    Ok(print_program(&program, config))
}
