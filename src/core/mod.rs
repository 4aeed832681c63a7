pub mod duplicate;
pub mod exif;
pub mod gazetteer;
pub mod image;
pub mod location;
pub mod project;
pub mod resolver;
pub mod scanner;
pub mod web_photo;

#[cfg(test)]
#[path = "../../tests/common/mod.rs"]
mod test_support;
