use crate::application::api_keys::StaticApiKey;
use crate::application::posts::PostService;

/// Shared handles every API handler receives.
#[derive(Clone)]
pub struct ApiState {
    pub posts: PostService,
    pub api_key: StaticApiKey,
}

impl ApiState {
    pub fn new(posts: PostService, api_key: StaticApiKey) -> Self {
        Self { posts, api_key }
    }
}
