/// A value length as stored on the wire, which is either a defined length
/// containing a `u32` value, or the undefined length that is encoded as
/// `0xFFFFFFFF`.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueLength {
  Defined { length: u32 },
  Undefined,
}

/// The on-the-wire encoding of the undefined length.
///
pub const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

impl ValueLength {
  /// Constructs a value length from the given `u32` value. `0xFFFFFFFF` is
  /// the undefined length, all other values are a defined length.
  ///
  pub fn new(length: u32) -> Self {
    if length == UNDEFINED_LENGTH {
      Self::Undefined
    } else {
      Self::Defined { length }
    }
  }

  /// Converts a value length to its `u32` wire encoding.
  ///
  pub fn to_u32(self) -> u32 {
    match self {
      Self::Defined { length } => length,
      Self::Undefined => UNDEFINED_LENGTH,
    }
  }

  pub const ZERO: ValueLength = ValueLength::Defined { length: 0 };
}

impl std::fmt::Display for ValueLength {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    match self {
      Self::Defined { length } => write!(f, "{} bytes", length),
      Self::Undefined => write!(f, "UNDEFINED"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trip_test() {
    assert_eq!(ValueLength::new(100).to_u32(), 100);
    assert_eq!(
      ValueLength::new(UNDEFINED_LENGTH),
      ValueLength::Undefined
    );
    assert_eq!(ValueLength::Undefined.to_u32(), UNDEFINED_LENGTH);
  }
}
