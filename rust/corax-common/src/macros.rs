/// Returns an invalid-argument error from the enclosing function unless `$cond`
/// holds. The error names `$name` and quotes the condition.
#[macro_export]
macro_rules! verify_arg {
    ($name:ident, $cond:expr) => {
        if !($cond) {
            return Err($crate::result::failed_arg(stringify!($name), stringify!($cond)).into());
        }
    };
}

/// Like [`verify_arg!`], for conditions on persisted bytes: a failure is an
/// invalid-format error.
#[macro_export]
macro_rules! verify_data {
    ($element:ident, $cond:expr) => {
        if !($cond) {
            return Err($crate::result::failed_data(stringify!($element), stringify!($cond)).into());
        }
    };
}

/// Unwraps a `Result` inside a function returning `Option<Result<..>>`, returning
/// `Some(Err(..))` on failure.
///
/// Iterators over decoded items use it so that a decode error becomes an item
/// instead of ending the iteration.
#[macro_export]
macro_rules! try_or_ret_some_err {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return Some(Err(err.into())),
        }
    };
}
