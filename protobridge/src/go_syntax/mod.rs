//! Declaration-level Go source reader: tokens, syntax tree and parser

pub(crate) mod ast;
mod lexer;
mod parser;

pub(crate) use parser::parse_source;
