pub mod categories;
pub mod post_images;
pub mod post_tags;
pub mod posts;
pub mod tags;
pub mod users;
