//! Equalizer command API
//!
//! Typed operations over the command channel: the channel catalogue, the
//! fixed-point value codecs and the [`EqualizerApi`] facade.

pub mod channels;
pub mod codec;
pub mod equalizer;

pub use channels::Command;
pub use equalizer::EqualizerApi;
