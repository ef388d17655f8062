pub mod matcher;
pub mod model;
pub mod selector;
