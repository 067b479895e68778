pub mod function;
pub mod trigger;
