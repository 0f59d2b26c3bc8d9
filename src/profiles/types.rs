// Profile listing types and the follow/unfollow cache updates

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A profile as listed by `/profiles/`
///
/// Only the fields the follow graph touches are typed; everything else the
/// server sends is kept in `extra` so in-place updates don't lose it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub followers_count: i64,
    /// Relationship id when the current user follows this profile
    #[serde(default)]
    pub following_id: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    pub fn new(id: u64, followers_count: i64, following_id: Option<u64>) -> Self {
        Self {
            id,
            owner: None,
            followers_count,
            following_id,
            extra: Map::new(),
        }
    }

    /// Record a new follow edge
    /// The count only moves when the relationship id goes from none to some.
    fn mark_followed(&mut self, following_id: u64) {
        if self.following_id.is_none() {
            self.followers_count += 1;
        }
        self.following_id = Some(following_id);
    }

    fn mark_unfollowed(&mut self) {
        if self.following_id.take().is_some() {
            self.followers_count -= 1;
        }
    }
}

/// DRF paginated list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> Default for Paginated<T> {
    fn default() -> Self {
        Self::of(Vec::new())
    }
}

impl<T> Paginated<T> {
    /// A single page holding exactly these results
    pub fn of(results: Vec<T>) -> Self {
        Self {
            count: results.len() as u64,
            next: None,
            previous: None,
            results,
        }
    }
}

/// Response to `POST /followers/`
#[derive(Debug, Clone, Deserialize)]
pub struct FollowResponse {
    pub id: u64,
}

/// Cached profile collections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileData {
    /// Profile(s) of the page currently viewed
    pub page_profile: Paginated<Profile>,
    /// Most-followed profiles
    pub popular_profiles: Paginated<Profile>,
}

impl ProfileData {
    fn matching_mut(&mut self, profile_id: u64) -> impl Iterator<Item = &mut Profile> {
        self.page_profile
            .results
            .iter_mut()
            .chain(self.popular_profiles.results.iter_mut())
            .filter(move |p| p.id == profile_id)
    }

    /// Apply a confirmed follow to every cached copy of the profile
    /// Returns how many entries were updated.
    pub fn apply_follow(&mut self, profile_id: u64, following_id: u64) -> usize {
        let mut updated = 0;
        for profile in self.matching_mut(profile_id) {
            profile.mark_followed(following_id);
            updated += 1;
        }
        updated
    }

    /// Apply a confirmed unfollow to every cached copy of the profile
    pub fn apply_unfollow(&mut self, profile_id: u64) -> usize {
        let mut updated = 0;
        for profile in self.matching_mut(profile_id) {
            profile.mark_unfollowed();
            updated += 1;
        }
        updated
    }
}
