//! Configuration read from environment variables.

/// Interpret a string value such as "64" as a size. Returns `None` and logs
/// a warning for values which are not non-negative integers.
pub fn str_as_usize(name: &str, s: &str) -> Option<usize> {
    match s.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("unrecognized value \"{}\" for {}", s, name);
            None
        }
    }
}

/// Return the value of a size setting controlled by an environment
/// variable, or `default` if it is unset or invalid.
pub fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|s| str_as_usize(name, &s))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::{env_usize, str_as_usize};

    #[test]
    fn test_str_as_usize() {
        assert_eq!(str_as_usize("TEST", "64"), Some(64));
        assert_eq!(str_as_usize("TEST", " 128 "), Some(128));
        assert_eq!(str_as_usize("TEST", "-1"), None);
        assert_eq!(str_as_usize("TEST", "lots"), None);
    }

    #[test]
    fn test_env_usize_unset() {
        assert_eq!(env_usize("NDSTRIDE_TEST_UNSET_VARIABLE", 7), 7);
    }
}
