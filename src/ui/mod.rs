//! Page objects for the admin portal and the engine that navigates them.

pub mod frame;
pub mod navigation;
pub mod product;
mod view;

pub use navigation::{navigate, prerequisite_chain};
pub use view::{bind_path, View};
