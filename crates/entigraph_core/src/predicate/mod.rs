//! Predicate language: lexing, parsing and evaluation.
//!
//! A predicate source such as `name BEGINSWITH[c] %@ AND age < 30` is parsed
//! once into a [`Predicate`] tree. Evaluating the tree against an instance
//! never re-parses.

mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::{CompareOp, Predicate, TextOp};
