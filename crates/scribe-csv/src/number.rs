//! Shortest round-trip number formatting in `%g` style.
//!
//! Decimal exponents below -4 or at least 6 switch to exponent notation with
//! a signed, at least two-digit exponent (`1.5e+06`, `2e-05`).

pub(crate) fn format_g(value: f64) -> String {
  if value == 0.0 {
    return if value.is_sign_negative() { "-0".into() } else { "0".into() };
  }

  // `{:e}` yields the shortest round-trip mantissa, e.g. "1.234567e6".
  let sci = format!("{value:e}");
  let (mantissa, exp) = match sci.split_once('e') {
    Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
    None => return sci,
  };

  if (-4..6).contains(&exp) {
    format!("{value}")
  } else {
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.abs())
  }
}

#[cfg(test)]
mod tests {
  use super::format_g;

  #[test]
  fn plain_range() {
    assert_eq!(format_g(20.0), "20");
    assert_eq!(format_g(30.5), "30.5");
    assert_eq!(format_g(-7.25), "-7.25");
    assert_eq!(format_g(123456.0), "123456");
    assert_eq!(format_g(0.0001), "0.0001");
    assert_eq!(format_g(0.1 + 0.2), "0.30000000000000004");
  }

  #[test]
  fn exponent_range() {
    assert_eq!(format_g(1_000_000.0), "1e+06");
    assert_eq!(format_g(1_234_567.0), "1.234567e+06");
    assert_eq!(format_g(0.00002), "2e-05");
    assert_eq!(format_g(-1.5e21), "-1.5e+21");
    assert_eq!(format_g(1e100), "1e+100");
  }
}
