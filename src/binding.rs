//! Type binding registry: host values to driver binds, and wire types to decode actions.

mod decode;
mod encode;

pub use decode::{DecodeAction, DecodePlan, TypeRegistry, WireType};
pub use encode::{Bind, encode, encode_all};
