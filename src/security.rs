use subtle::ConstantTimeEq;

/// Constant-time string comparison to prevent timing attacks
/// Use this for comparing the admin token and other sensitive values
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Extract the token from a `Bearer <token>` Authorization header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ").map(str::trim)
}

/// Whether the request carries the shared administrator token.
///
/// This is where the "is the caller an administrator" flag consumed by the
/// editing subsystem is produced; nothing downstream re-checks it.
pub fn is_admin_request(authorization: Option<&str>, admin_token: &str) -> bool {
    if admin_token.is_empty() {
        return false;
    }
    match authorization.and_then(bearer_token) {
        Some(token) => constant_time_compare(token, admin_token),
        None => false,
    }
}
