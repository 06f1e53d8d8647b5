// ABOUTME: Validated domain types shared across the crate.
// ABOUTME: Currently the repository/tag split of image names.

mod image_name;

pub use image_name::{ImageName, ParseImageNameError};
