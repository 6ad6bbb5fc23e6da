//! The route table: one static list of prefix rules instead of one actix
//! handler per downstream service. Every inbound request is matched against
//! this table by longest-prefix-match plus a method check; the matched entry
//! says which service to forward to, whether a credential is required, and
//! how to rewrite the path for the downstream call.

use actix_web::http::Method;

/// Whether a route requires a verified bearer credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// No credential required; forwarded as-is.
    Public,
    /// A valid bearer credential is required; 403 if absent, 401 if invalid.
    Authed,
}

/// How the matched path is rewritten into the path sent to the downstream
/// service. Kept as an enum rather than inlined so a future service with a
/// different rewrite need doesn't require restructuring the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteRule {
    /// Strip the single leading `/` from the matched path. Every route in
    /// this table uses this rule; the source this gateway descends from
    /// special-cased each service but always arrived at the same result.
    StripLeadingSlash,
}

impl RewriteRule {
    pub fn apply<'a>(&self, path: &'a str) -> &'a str {
        match self {
            RewriteRule::StripLeadingSlash => path.strip_prefix('/').unwrap_or(path),
        }
    }
}

pub struct RouteEntry {
    pub prefix: &'static str,
    pub methods: &'static [Method],
    pub auth_policy: AuthPolicy,
    pub service: &'static str,
    pub rewrite: RewriteRule,
}

macro_rules! methods {
    ($($m:ident),+ $(,)?) => { &[$(Method::$m),+] };
}

/// Order matters only in that a more specific prefix must appear before a
/// shorter prefix it is also a prefix of (e.g. the five public `/auth/...`
/// routes before the catch-all authed `/auth/` rule); [`dispatch`] always
/// picks the longest matching prefix regardless of table order, but listing
/// the specific ones first keeps the table readable top to bottom.
pub static ROUTES: &[RouteEntry] = &[
    RouteEntry { prefix: "/auth/signup", methods: methods![POST], auth_policy: AuthPolicy::Public, service: "auth", rewrite: RewriteRule::StripLeadingSlash },
    RouteEntry { prefix: "/auth/login", methods: methods![POST], auth_policy: AuthPolicy::Public, service: "auth", rewrite: RewriteRule::StripLeadingSlash },
    RouteEntry { prefix: "/auth/refresh", methods: methods![POST], auth_policy: AuthPolicy::Public, service: "auth", rewrite: RewriteRule::StripLeadingSlash },
    RouteEntry { prefix: "/auth/me", methods: methods![GET], auth_policy: AuthPolicy::Public, service: "auth", rewrite: RewriteRule::StripLeadingSlash },
    RouteEntry { prefix: "/auth/logout", methods: methods![POST], auth_policy: AuthPolicy::Public, service: "auth", rewrite: RewriteRule::StripLeadingSlash },
    RouteEntry { prefix: "/auth/", methods: methods![PUT, DELETE], auth_policy: AuthPolicy::Authed, service: "auth", rewrite: RewriteRule::StripLeadingSlash },
    RouteEntry { prefix: "/users/", methods: methods![GET, POST, PUT, DELETE, PATCH], auth_policy: AuthPolicy::Authed, service: "user", rewrite: RewriteRule::StripLeadingSlash },
    RouteEntry { prefix: "/badge/", methods: methods![GET, POST, PUT, DELETE], auth_policy: AuthPolicy::Authed, service: "badge", rewrite: RewriteRule::StripLeadingSlash },
    RouteEntry { prefix: "/feed/", methods: methods![GET, POST, PUT, DELETE], auth_policy: AuthPolicy::Authed, service: "feed", rewrite: RewriteRule::StripLeadingSlash },
    RouteEntry { prefix: "/notification/", methods: methods![GET, POST, PUT, DELETE], auth_policy: AuthPolicy::Authed, service: "notification", rewrite: RewriteRule::StripLeadingSlash },
    RouteEntry { prefix: "/project/", methods: methods![GET, POST, PUT, DELETE], auth_policy: AuthPolicy::Authed, service: "project", rewrite: RewriteRule::StripLeadingSlash },
    RouteEntry { prefix: "/new/", methods: methods![GET, POST, PUT, DELETE], auth_policy: AuthPolicy::Authed, service: "new", rewrite: RewriteRule::StripLeadingSlash },
    RouteEntry { prefix: "/api/v1/messaging/", methods: methods![GET, POST, PUT, DELETE], auth_policy: AuthPolicy::Authed, service: "messaging", rewrite: RewriteRule::StripLeadingSlash },
];

/// The WebSocket route lives outside the table above: actix registers an
/// upgrade handler for it directly rather than routing it through the
/// generic catch-all, since it needs a different extractor set.
pub const MESSAGING_WS_PREFIX: &str = "/api/v1/messaging/ws/";

/// Finds the longest-prefix match for `path` among [`ROUTES`], then checks
/// that `method` is permitted on it. Returns `None` if no route's prefix
/// matches at all (404) or the matched route doesn't allow this method (also
/// surfaced by callers as 404, since this gateway does not attempt `405` with
/// an `Allow` header).
pub fn dispatch(method: &Method, path: &str) -> Option<&'static RouteEntry> {
    ROUTES
        .iter()
        .filter(|r| path.starts_with(r.prefix))
        .max_by_key(|r| r.prefix.len())
        .filter(|r| r.methods.contains(method))
}
