pub mod analyzer;
pub mod compare;
pub mod contour;
