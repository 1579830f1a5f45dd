#[macro_use]
extern crate bitflags;

pub mod gpu;
