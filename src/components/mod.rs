pub mod transform;

pub use transform::{HasTransform, Transform};
