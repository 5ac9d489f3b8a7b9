use std::sync::Arc;
use std::time::Duration;

use gatehouse_auth::{AreaRegistry, DirectoryRoleResolver, DirectoryStore, RoleResolver, TimeoutResolver};

/// Everything a request handler needs besides the request itself.
pub struct AppServices {
    areas: AreaRegistry,
    resolver: Arc<dyn RoleResolver>,
}

impl AppServices {
    /// Wire the area table to a directory. Every lookup is bounded by
    /// `lookup_timeout`; an overrun denies access like any other outage.
    pub fn new(areas: AreaRegistry, directory: Arc<dyn DirectoryStore>, lookup_timeout: Duration) -> Self {
        let resolver = TimeoutResolver::new(DirectoryRoleResolver::new(directory), lookup_timeout);
        Self {
            areas,
            resolver: Arc::new(resolver),
        }
    }

    pub fn areas(&self) -> &AreaRegistry {
        &self.areas
    }

    pub fn resolver(&self) -> Arc<dyn RoleResolver> {
        self.resolver.clone()
    }
}
