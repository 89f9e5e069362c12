//! Conversion of a stored tuple's numeric parts into a caller-chosen type.

/// A numeric type that can be materialized from a stored tuple.
///
/// Integers are derived from the tuple's long, floating point types from its
/// double. The returned flag is `false` when the stored value does not fit the
/// target type; the value is then the truncated bit pattern or the nearest
/// `f32`.
pub trait TupleNumeric: Copy + Default {
    fn from_tuple(long: i64, double: f64) -> (Self, bool);
}

macro_rules! impl_tuple_numeric_int {
    ($($t:ty),*) => {
        $(
            impl TupleNumeric for $t {
                #[inline]
                fn from_tuple(long: i64, _double: f64) -> ($t, bool) {
                    (long as $t, <$t>::try_from(long).is_ok())
                }
            }
        )*
    };
}

impl_tuple_numeric_int!(i32, u32, i16, u16, i8, u8);

impl TupleNumeric for i64 {
    #[inline]
    fn from_tuple(long: i64, _double: f64) -> (i64, bool) {
        (long, true)
    }
}

impl TupleNumeric for u64 {
    /// Reinterprets the stored bits.
    #[inline]
    fn from_tuple(long: i64, _double: f64) -> (u64, bool) {
        (long as u64, true)
    }
}

impl TupleNumeric for f64 {
    #[inline]
    fn from_tuple(_long: i64, double: f64) -> (f64, bool) {
        (double, true)
    }
}

impl TupleNumeric for f32 {
    #[inline]
    fn from_tuple(_long: i64, double: f64) -> (f32, bool) {
        let narrowed = double as f32;
        (narrowed, narrowed as f64 == double || double.is_nan())
    }
}
