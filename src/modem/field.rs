//! Lenient parsing of reply fields.
//!
//! Reply fields are often followed by units or further comma separated values
//! (e.g. `4.05V` or `0,1`), so only the leading number is parsed.

/// Parse the integer at the start of `text`, ignoring leading whitespace.
pub(crate) fn leading_int(text: &str) -> Option<i32> {
	let text = text.trim_start();
	let end = text
		.char_indices()
		.find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
		.map_or(text.len(), |(i, _)| i);
	text[..end].parse().ok()
}

/// Parse the decimal number at the start of `text`, ignoring leading whitespace.
pub(crate) fn leading_float(text: &str) -> Option<f32> {
	let text = text.trim_start();
	let mut seen_point = false;
	let end = text
		.char_indices()
		.find(|&(i, c)| match c {
			'0'..='9' => false,
			'-' | '+' => i != 0,
			'.' if !seen_point => {
				seen_point = true;
				false
			}
			_ => true,
		})
		.map_or(text.len(), |(i, _)| i);
	text[..end].parse().ok()
}

/// The part of `text` after the first comma, if any.
pub(crate) fn after_comma(text: &str) -> Option<&str> {
	text.split_once(',').map(|(_, rest)| rest)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn leading_int_examples() {
		assert_eq!(leading_int("5"), Some(5));
		assert_eq!(leading_int(" 38\r"), Some(38));
		assert_eq!(leading_int("-12,3"), Some(-12));
		assert_eq!(leading_int("+7"), Some(7));
		assert_eq!(leading_int(""), None);
		assert_eq!(leading_int("x1"), None);
		assert_eq!(leading_int("-"), None);
	}

	#[test]
	fn leading_float_examples() {
		assert_eq!(leading_float("4.05"), Some(4.05));
		assert_eq!(leading_float(" 3.7V"), Some(3.7));
		assert_eq!(leading_float("4"), Some(4.0));
		assert_eq!(leading_float("1.2.3"), Some(1.2));
		assert_eq!(leading_float("V"), None);
	}

	#[test]
	fn after_comma_examples() {
		assert_eq!(after_comma("0,5"), Some("5"));
		assert_eq!(after_comma("1,\"10.0.0.2\""), Some("\"10.0.0.2\""));
		assert_eq!(after_comma("5"), None);
	}
}
