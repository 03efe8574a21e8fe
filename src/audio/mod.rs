pub mod normalizer;

pub use normalizer::{FfmpegNormalizer, Normalizer};
