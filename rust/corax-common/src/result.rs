use crate::error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error of a failed [`verify_arg!`](crate::verify_arg) check.
#[cold]
#[inline(never)]
pub fn failed_arg(name: &str, condition: &str) -> Error {
    Error::invalid_arg(name, format!("requires {condition}"))
}

/// Error of a failed [`verify_data!`](crate::verify_data) check.
#[cold]
#[inline(never)]
pub fn failed_data(element: &str, condition: &str) -> Error {
    Error::invalid_format(element, format!("expected {condition}"))
}

#[cfg(test)]
mod tests {
    use crate::{verify_arg, verify_data};

    use super::*;

    fn checked_len(len: usize) -> Result<usize> {
        verify_data!(len, len <= 8);
        Ok(len)
    }

    fn positive(value: i64) -> Result<i64> {
        verify_arg!(value, value > 0);
        Ok(value)
    }

    #[test]
    fn test_failed_checks_name_the_condition() {
        assert_eq!(checked_len(4).unwrap(), 4);
        let err = checked_len(9).unwrap_err();
        assert!(err.is_invalid_format());
        assert!(err.to_string().contains("len <= 8"));

        assert_eq!(positive(3).unwrap(), 3);
        let err = positive(-1).unwrap_err();
        assert!(!err.is_invalid_format());
        assert_eq!(err.to_string(), "invalid argument value: requires value > 0");
    }
}
