/// Get environment variable with LEAKLOCK_ prefix, falling back to unprefixed version
///
/// This helper function checks for `LEAKLOCK_{key}` first, then falls back to `{key}`
/// for compatibility with standard environment variable naming.
///
/// # Examples
///
/// ```rust
/// use leaklock::utils::get_env_with_prefix;
///
/// // Checks LEAKLOCK_GRACE_DAYS first, then GRACE_DAYS
/// let grace = get_env_with_prefix("GRACE_DAYS");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("LEAKLOCK_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}
