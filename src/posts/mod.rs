pub mod error;
pub mod handlers;
pub mod store;
pub mod types;
pub mod validation;

pub use error::StoreError;
pub use handlers::{create_post, delete_post, list_posts, show_post, update_post};
pub use store::{PostStore, SharedStore};
pub use types::{PageMeta, Post, PostCollection, PostInput, PostsConfig, PostsQuery};
pub use validation::{ValidationErrors, validate_post_input};
