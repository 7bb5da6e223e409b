pub mod posts;

pub use posts::{PostDraft, PostService};
