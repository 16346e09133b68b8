pub mod buffer;
pub mod preprocess;
pub mod synth;
pub mod wav;
