use std::{fmt, ops::Add, time::SystemTime};

/// A numeric metric value.
///
/// Integers are kept as integers so that counters survive publishing without loss, no matter how
/// large they get. Non-negative integers are always held as [`Number::Unsigned`], and only
/// negative ones as [`Number::Signed`], so `1i32` and `1u64` compare equal. Integers and floats
/// never compare equal to each other.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    /// A non-negative integer.
    Unsigned(u64),

    /// A negative integer.
    Signed(i64),

    /// A floating-point value.
    Float(f64),
}

impl Number {
    /// Returns the value as a `u64`, if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Number::Unsigned(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value as an `i64`, if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Number::Unsigned(v) => i64::try_from(v).ok(),
            Number::Signed(v) => Some(v),
            Number::Float(_) => None,
        }
    }

    /// Returns the value as an `f64`.
    ///
    /// Integers above 2^53 in magnitude are rounded.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Unsigned(v) => v as f64,
            Number::Signed(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    fn as_i128(&self) -> Option<i128> {
        match *self {
            Number::Unsigned(v) => Some(i128::from(v)),
            Number::Signed(v) => Some(i128::from(v)),
            Number::Float(_) => None,
        }
    }

    fn from_i128(v: i128) -> Number {
        if let Ok(v) = u64::try_from(v) {
            Number::Unsigned(v)
        } else if let Ok(v) = i64::try_from(v) {
            Number::Signed(v)
        } else {
            Number::Float(v as f64)
        }
    }
}

/// Integer sums stay integers while they fit in an `i64` or `u64`. Anything else, including any
/// sum involving a float, is computed as an `f64`.
impl Add for Number {
    type Output = Number;

    fn add(self, other: Number) -> Number {
        match (self.as_i128(), other.as_i128()) {
            (Some(a), Some(b)) => Number::from_i128(a + b),
            _ => Number::Float(self.as_f64() + other.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Unsigned(v) => fmt::Display::fmt(v, f),
            Number::Signed(v) => fmt::Display::fmt(v, f),
            Number::Float(v) => fmt::Display::fmt(v, f),
        }
    }
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Number {
                fn from(v: $ty) -> Self {
                    Number::Unsigned(v as u64)
                }
            }
        )*
    };
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Number {
                fn from(v: $ty) -> Self {
                    match u64::try_from(v) {
                        Ok(v) => Number::Unsigned(v),
                        Err(_) => Number::Signed(v as i64),
                    }
                }
            }
        )*
    };
}

impl_from_unsigned!(u8, u16, u32, u64, usize);
impl_from_signed!(i8, i16, i32, i64, isize);

impl From<f32> for Number {
    fn from(v: f32) -> Self {
        Number::Float(f64::from(v))
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}

/// A relative change to a named metric.
///
/// Deltas are published as-is: consumers apply the value on top of whatever they currently hold
/// for the metric, so a negative value decreases it.
#[derive(Clone, Debug, PartialEq)]
pub struct Delta {
    name: String,
    value: Number,
    timestamp: Option<SystemTime>,
}

impl Delta {
    /// Creates a new `Delta` for the given metric name.
    pub fn new<N>(name: N, value: impl Into<Number>) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            value: value.into(),
            timestamp: None,
        }
    }

    /// Attaches a timestamp to this delta.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Name of the metric this delta applies to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Amount to change the metric by.
    pub fn value(&self) -> Number {
        self.value
    }

    /// When the change was observed, if known.
    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp
    }
}

/// An absolute value for a named metric.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricValue {
    name: String,
    value: Number,
    timestamp: Option<SystemTime>,
}

impl MetricValue {
    /// Creates a new `MetricValue` for the given metric name.
    pub fn new<N>(name: N, value: impl Into<Number>) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            value: value.into(),
            timestamp: None,
        }
    }

    /// Attaches a timestamp to this value.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Returns a copy of this value increased by `amount`.
    ///
    /// The name and timestamp are carried over unchanged.
    #[must_use]
    pub fn increment(&self, amount: impl Into<Number>) -> Self {
        Self {
            value: self.value + amount.into(),
            ..self.clone()
        }
    }

    /// Returns a copy of this value with `value` in place of the current one.
    #[must_use]
    pub fn set(&self, value: impl Into<Number>) -> Self {
        Self {
            value: value.into(),
            ..self.clone()
        }
    }

    /// Name of the metric.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value itself.
    pub fn value(&self) -> Number {
        self.value
    }

    /// When the value was observed, if known.
    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::{Delta, MetricValue, Number};

    #[test]
    fn delta_accepts_integer_and_float_values() {
        let d = Delta::new("requests.count", 1);
        assert_eq!(d.name(), "requests.count");
        assert_eq!(d.value(), Number::Unsigned(1));
        assert_eq!(d.timestamp(), None);

        let d = Delta::new(String::from("latency"), -2.5);
        assert_eq!(d.value(), Number::Float(-2.5));

        let d = Delta::new("backlog", -3i64);
        assert_eq!(d.value(), Number::Signed(-3));
    }

    #[test]
    fn large_integers_are_kept_exactly() {
        let big = (1u64 << 53) + 1;
        let value = MetricValue::new("bytes.total", big);
        assert_eq!(value.value().as_u64(), Some(big));

        let delta = Delta::new("bytes.total", u64::MAX);
        assert_eq!(delta.value().as_u64(), Some(u64::MAX));
        assert_eq!(delta.value().as_i64(), None);
    }

    #[test]
    fn signed_and_unsigned_integers_compare_equal() {
        assert_eq!(Number::from(7i32), Number::from(7u64));
        assert_ne!(Number::from(7u64), Number::from(7.0));
    }

    #[test]
    fn addition_stays_integral_while_it_fits() {
        assert_eq!(Number::from(u64::MAX - 1) + Number::from(1), Number::Unsigned(u64::MAX));
        assert_eq!(Number::from(2) + Number::from(-5), Number::Signed(-3));
        assert_eq!(Number::from(u64::MAX) + Number::from(1), Number::Float(2f64.powi(64)));
        assert_eq!(Number::from(1) + Number::from(0.5), Number::Float(1.5));
    }

    #[test]
    fn display_respects_sign_flag() {
        assert_eq!(format!("{:+}", Number::from(1)), "+1");
        assert_eq!(format!("{:+}", Number::from(-2)), "-2");
        assert_eq!(format!("{}", Number::from(42.0)), "42");
    }

    #[test]
    fn value_equality_includes_timestamp() {
        let ts = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let a = MetricValue::new("queue.depth", 42).with_timestamp(ts);
        let b = MetricValue::new("queue.depth", 42).with_timestamp(ts);
        let c = MetricValue::new("queue.depth", 42);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn increment_and_set_leave_original_untouched() {
        let ts = SystemTime::UNIX_EPOCH + Duration::from_secs(5);
        let original = MetricValue::new("queue.depth", 40).with_timestamp(ts);

        let bumped = original.increment(2);
        assert_eq!(bumped.value(), Number::Unsigned(42));
        assert_eq!(bumped.name(), "queue.depth");
        assert_eq!(bumped.timestamp(), Some(ts));

        let replaced = original.set(7.5);
        assert_eq!(replaced.value(), Number::Float(7.5));

        assert_eq!(original.value(), Number::Unsigned(40));
    }
}
