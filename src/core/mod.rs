pub mod completion;
pub mod config;
pub mod corpus;
pub mod filler;
pub mod selector;
pub mod store;
pub mod submit;
pub mod wizard;
