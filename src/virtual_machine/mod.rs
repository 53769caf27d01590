pub mod errors;
pub mod gas;
pub mod interpreter;
pub mod isa;
