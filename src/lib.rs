// Strum contains all the trait definitions
extern crate strum;
#[macro_use]
extern crate strum_macros;
#[macro_use]
extern crate lazy_static;
extern crate itertools;
extern crate regex;
extern crate thiserror;

pub mod document;
pub mod errors;
pub mod parser;
pub mod record;
pub mod utils;
pub mod zone;

pub fn version() -> &'static str {
    "v0.1.0"
}
