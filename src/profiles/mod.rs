// Profiles module
// Cached profile listings and the follow graph mutations on them

mod store;
mod types;

pub use store::ProfileStore;
pub use types::{FollowResponse, Paginated, Profile, ProfileData};
