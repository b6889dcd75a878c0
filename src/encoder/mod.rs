// Text encoders: map text to fixed-length vectors for similarity search.

pub mod hashing;
pub mod onnx;
pub mod traits;

pub use hashing::HashingEncoder;
pub use onnx::SentenceEncoder;
pub use traits::{Embedding, TextEncoder};

/// Scale a vector to unit length in place. Zero vectors are left alone.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
