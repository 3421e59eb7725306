//! Tessera ABI crate: contracts shared by the slot scheduler and engine integrations.

pub mod backend;
pub mod media;
pub mod sampling;
pub mod token;

pub use backend::*;
pub use media::*;
pub use sampling::*;
pub use token::*;
