pub mod defs;

pub use defs::{
    Embed, FeedViewPost, ListItemView, Page, PostRecord, PostView, ProfileView, SocialClient, StrongRef, Timestamps,
};
