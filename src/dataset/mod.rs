pub mod container;
pub mod element;
pub mod reader;

pub use container::{Dataset, SharedContainer};
pub use element::{Element, ElementType};
pub use reader::ContainerReader;
