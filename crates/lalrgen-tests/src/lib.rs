pub mod driver;
pub mod grammars;
