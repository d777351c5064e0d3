mod identity;

pub use identity::{bearer_token, Identity};
