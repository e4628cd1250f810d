pub mod enrollment;
pub mod transition;
