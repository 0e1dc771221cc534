pub mod ast;
pub mod eval;
pub mod orbit;
pub mod parser;
pub mod report;
pub mod scanner;
