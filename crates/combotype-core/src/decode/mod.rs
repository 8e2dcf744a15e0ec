// Combotype Decode Module
// Key strokes to text fragments, keeping dead-key composition consistent

pub mod deadkeys;
pub mod decoder;
pub mod fragment;

pub use deadkeys::DeadKeyState;
pub use decoder::KeyDecoder;
pub use fragment::TextFragment;
