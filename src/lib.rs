pub mod error;
pub mod import;
pub mod options;
pub mod parse;
pub mod validate;
pub mod walk;
pub mod wasm;
