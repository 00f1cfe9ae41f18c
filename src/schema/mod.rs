pub mod draft;
pub mod scene;
pub mod step;
