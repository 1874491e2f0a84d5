//! Hydration layer: capability traits, the decoding engine, and decoders
//! for standard library types.

pub mod codable;
pub mod decode;
pub mod engine;

pub use codable::{Codable, CodableEnum, CustomDecode, Decode, PluginBase, PostDecode};
pub use decode::MapKey;
pub use engine::{Decoder, Hydrator, hydrate_erased};
