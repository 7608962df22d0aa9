//! Protocol module containing the line-oriented frame codec.

pub mod codec;

pub use codec::{decode_frame, encode_frame, CodecError, StructuredMessage};
