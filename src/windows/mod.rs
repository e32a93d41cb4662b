pub mod space;
pub use space::disk_space;
