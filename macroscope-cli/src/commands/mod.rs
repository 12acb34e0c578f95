pub mod common;
pub mod deobfuscate;
pub mod deps;
pub mod render;
