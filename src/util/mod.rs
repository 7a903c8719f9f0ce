pub mod array3;

pub use array3::Array3;
