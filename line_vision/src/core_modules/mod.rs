pub mod contour;
pub mod contour_selector;
pub mod direction;
pub mod exploration;
pub mod lateral_controller;
pub mod orientation;
pub mod pixel;
pub mod region;
pub mod segmenter;
pub mod stabilizer;
