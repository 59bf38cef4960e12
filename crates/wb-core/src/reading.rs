//! Outcome of a completeness-aware cell read

/// Result of reading a cell while rule conditions are being evaluated
///
/// A guarded read of a cell that has no determined value yet yields
/// `Incomplete` carrying the cell name. The condition adapter that started
/// the evaluation matches on it and skips the condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reading<T> {
    /// The value is known
    Determined(T),
    /// The named cell has no determined value yet
    Incomplete(String),
}

impl<T> Reading<T> {
    /// Wrap a determined value
    pub fn determined(value: impl Into<T>) -> Self {
        Reading::Determined(value.into())
    }

    /// Whether the reading carries a value
    pub fn is_determined(&self) -> bool {
        matches!(self, Reading::Determined(_))
    }

    /// Transform the determined value, keeping incompleteness
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Reading::Determined(v) => Reading::Determined(f(v)),
            Reading::Incomplete(cell) => Reading::Incomplete(cell),
        }
    }

    /// Chain another read, short-circuiting on the first incomplete cell
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Reading<U>) -> Reading<U> {
        match self {
            Reading::Determined(v) => f(v),
            Reading::Incomplete(cell) => Reading::Incomplete(cell),
        }
    }

    /// Convert into an Option, dropping the incomplete cell name
    pub fn ok(self) -> Option<T> {
        match self {
            Reading::Determined(v) => Some(v),
            Reading::Incomplete(_) => None,
        }
    }
}

/// Extracts the value of a [`Reading`] or returns early with the incomplete
/// reading wrapped in `Ok`.
///
/// Intended for rule condition closures returning
/// `Result<Reading<_>, _>`, in the spirit of `std::task::ready!`.
#[macro_export]
macro_rules! determined {
    ($e:expr $(,)?) => {
        match $e {
            $crate::Reading::Determined(v) => v,
            $crate::Reading::Incomplete(cell) => {
                return ::core::result::Result::Ok($crate::Reading::Incomplete(cell));
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(a: Reading<i64>, b: Reading<i64>) -> Result<Reading<i64>, ()> {
        let a = determined!(a);
        let b = determined!(b);
        Ok(Reading::Determined(a + b))
    }

    #[test]
    fn test_determined_macro() {
        assert_eq!(
            add(Reading::Determined(1), Reading::Determined(2)),
            Ok(Reading::Determined(3))
        );
        assert_eq!(
            add(Reading::Determined(1), Reading::Incomplete("b".into())),
            Ok(Reading::Incomplete("b".into()))
        );
    }

    #[test]
    fn test_map_and_then() {
        let r: Reading<i64> = Reading::Determined(2);
        assert_eq!(r.map(|v| v * 10), Reading::Determined(20));

        let r: Reading<i64> = Reading::Incomplete("temp".into());
        assert_eq!(
            r.and_then(|v| Reading::Determined(v + 1)),
            Reading::Incomplete("temp".into())
        );
    }

    #[test]
    fn test_ok() {
        assert_eq!(Reading::<i64>::Determined(5).ok(), Some(5));
        assert_eq!(Reading::<i64>::Incomplete("x".into()).ok(), None);
    }
}
