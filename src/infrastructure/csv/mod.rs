// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Decoding CSV text into nested records with scalar inference

mod decoder;
mod inference;

pub use decoder::{decode, decode_file, HeaderPath};
pub use inference::infer_scalar;
