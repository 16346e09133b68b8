pub mod activity;
pub mod autocorr;
pub mod contour;
pub mod fusion;
pub mod notes;
pub mod pitch;
pub mod spectral;
pub mod windowing;
pub mod yin;
