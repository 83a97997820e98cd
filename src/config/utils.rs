use std::env;
use std::str::FromStr;

/// Parse an environment variable, returning `Ok(None)` when it is unset
///
/// Surrounding whitespace is ignored. A value that fails to parse is an error
/// naming the variable, rather than a silent fallback to the default.
pub fn env_parsed<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid {name} environment variable: {e}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_parsed_variants() {
        unsafe {
            env::set_var("VOXGATE_TEST_NUMBER", " 42 ");
            env::set_var("VOXGATE_TEST_FRACTION", "0.25");
            env::set_var("VOXGATE_TEST_BAD", "many");
        }

        assert_eq!(env_parsed::<u64>("VOXGATE_TEST_NUMBER"), Ok(Some(42)));
        assert_eq!(env_parsed::<f64>("VOXGATE_TEST_FRACTION"), Ok(Some(0.25)));
        assert_eq!(env_parsed::<u64>("VOXGATE_TEST_UNSET"), Ok(None));

        let err = env_parsed::<u64>("VOXGATE_TEST_BAD").unwrap_err();
        assert!(err.contains("VOXGATE_TEST_BAD"));

        unsafe {
            env::remove_var("VOXGATE_TEST_NUMBER");
            env::remove_var("VOXGATE_TEST_FRACTION");
            env::remove_var("VOXGATE_TEST_BAD");
        }
    }
}
