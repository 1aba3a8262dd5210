/// Implements arithmetic operator traits for single-field newtypes.
///
/// * `binary` - `Self op Self -> Self`
/// * `inplace` - `Self op= Self`
/// * `scalar` - `Self op i64 -> Self`, for scaling a quantity by a count
#[macro_export]
macro_rules! op {
    (binary $for_struct:ident, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait for $for_struct {
            type Output = Self;

            fn $impl_fn(self, rhs: Self) -> Self::Output {
                Self(self.0.$impl_fn(rhs.0))
            }
        }
    };

    (inplace $for_struct:ident, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait for $for_struct {
            fn $impl_fn(&mut self, rhs: Self) {
                self.0.$impl_fn(rhs.0)
            }
        }
    };

    (scalar $for_struct:ident, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait<i64> for $for_struct {
            type Output = Self;

            fn $impl_fn(self, rhs: i64) -> Self::Output {
                Self(self.0.$impl_fn(rhs))
            }
        }
    };
}
