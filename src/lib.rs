pub mod bits;
pub mod cpu;
pub mod error;
pub mod image;
pub mod isa;
pub mod mem;
pub mod parsing;
