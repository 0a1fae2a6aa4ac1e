//! Stable indices into the collections. A handle stays valid for the lifetime
//! of the resource it names and is never reused after removal.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LightHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CameraHandle(pub usize);

macro_rules! slot_index {
    ($($handle:ty),*) => {
        $(
            impl From<usize> for $handle {
                fn from(index: usize) -> Self {
                    Self(index)
                }
            }

            impl From<$handle> for usize {
                fn from(handle: $handle) -> usize {
                    handle.0
                }
            }
        )*
    };
}

slot_index!(TextureHandle, MeshHandle, LightHandle, CameraHandle);
