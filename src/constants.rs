//! # Cache Constants
//!
//! TTL catalogue, standard key builders, and tag names shared by the cache
//! service, the query cache, and the default warmup tasks.

/// Default key prefix (overridable via `CACHE_PREFIX`)
pub const DEFAULT_KEY_PREFIX: &str = "portal_cache:";

/// Namespace for tag index sets, inserted between the prefix and the tag name
pub const TAG_NAMESPACE: &str = "tag:";

/// Ping latency under which the store counts as healthy
pub const HEALTHY_LATENCY_THRESHOLD_MS: u64 = 100;

/// TTL catalogue in seconds
pub mod ttl {
    /// Baseline TTL for writes without an explicit one
    pub const CACHE: u64 = 3600;
    pub const SHORT_CACHE: u64 = 300;

    pub const VERY_SHORT: u64 = 60;
    pub const SHORT: u64 = 300;
    pub const MEDIUM: u64 = 900;
    pub const LONG: u64 = 3600;
    pub const VERY_LONG: u64 = 86_400;
    pub const STATIC: u64 = 604_800;
    pub const QUERY: u64 = CACHE;

    /// `static_cache` writes
    pub const STATIC_ENTRY: u64 = 24 * 60 * 60;
    /// `dynamic_cache` writes
    pub const DYNAMIC_ENTRY: u64 = 5 * 60;
}

/// Well-known tag names
pub mod tags {
    pub const QUERIES: &str = "queries";
    pub const STATIC: &str = "static";
    pub const DYNAMIC: &str = "dynamic";

    /// Tag attached to query results that depend on `table`
    pub fn table(table: &str) -> String {
        format!("table:{table}")
    }
}

/// Standard cache key builders
pub mod keys {
    pub const STATIC_CONFIG: &str = "static:config";
    pub const STATIC_MENU: &str = "static:menu";
    pub const STATIC_PERMISSIONS: &str = "static:permissions";

    pub const USERS_ACTIVE_RECENT: &str = "users:active:recent";
    pub const COURSES_POPULAR: &str = "courses:popular";
    pub const BOOKS_POPULAR: &str = "books:popular";
    pub const DASHBOARD_STATS: &str = "dashboard:stats";

    pub fn user(id: &str) -> String {
        format!("user:{id}")
    }

    pub fn user_list(filters: &str) -> String {
        format!("users:list:{filters}")
    }

    pub fn course(id: &str) -> String {
        format!("course:{id}")
    }

    pub fn course_list(filters: &str) -> String {
        format!("courses:list:{filters}")
    }

    pub fn book(id: &str) -> String {
        format!("book:{id}")
    }

    pub fn book_list(filters: &str) -> String {
        format!("books:list:{filters}")
    }

    pub fn query(hash: &str) -> String {
        format!("query:{hash}")
    }

    pub fn session(id: &str) -> String {
        format!("session:{id}")
    }

    pub fn role_list(filters: &str) -> String {
        format!("roles:list:{filters}")
    }

    pub fn institution(id: &str) -> String {
        format!("institution:{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_builders() {
        assert_eq!(keys::user("42"), "user:42");
        assert_eq!(keys::role_list("{}"), "roles:list:{}");
        assert_eq!(keys::query("abc"), "query:abc");
        assert_eq!(tags::table("users"), "table:users");
    }

    #[test]
    fn test_ttl_catalogue_is_ordered() {
        assert!(ttl::VERY_SHORT < ttl::SHORT);
        assert!(ttl::SHORT < ttl::MEDIUM);
        assert!(ttl::MEDIUM < ttl::LONG);
        assert!(ttl::LONG < ttl::VERY_LONG);
        assert!(ttl::VERY_LONG < ttl::STATIC);
    }
}
