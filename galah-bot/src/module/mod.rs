pub mod catalog;
pub mod name;
pub mod plots;
pub mod post;
pub mod renderer;
pub mod survey;
