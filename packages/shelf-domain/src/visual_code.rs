//! Short, human-typeable container labels of the form `PP-DDDD-C`.
//!
//! `PP` is a two-letter prefix, `DDDD` is drawn from [`ALPHABET`], and `C` is a checksum
//! character. The alphabet leaves out glyphs that OCR and people confuse with each other
//! (`0`/`O`, `1`/`I`/`L`, `2`/`Z`, `5`/`S`, `8`/`B`, ...).

use std::{fmt, str::FromStr};

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const ALPHABET: &str = "347ACDEFHKMNPRTUVWXY";
pub const DIGITS_LEN: usize = 4;

const CODE_PATTERN: &str = r"^[A-Z]{2}-[347ACDEFHKMNPRTUVWXY]{4}-[347ACDEFHKMNPRTUVWXY]$";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VisualCode {
	code: String,
}
impl VisualCode {
	/// Accepts surrounding whitespace and lowercase input, since codes are typed by hand.
	pub fn parse(raw: &str) -> Result<Self> {
		let code = raw.trim().to_ascii_uppercase();

		if !Regex::new(CODE_PATTERN).map(|re| re.is_match(&code)).unwrap_or(false) {
			return Err(Error::MalformedVisualCode { code });
		}

		let (prefix, digits, found) = split(&code)
			.ok_or_else(|| Error::MalformedVisualCode { code: code.clone() })?;
		let expected = checksum(prefix, digits);

		if found != expected {
			return Err(Error::ChecksumMismatch { code, expected, found });
		}

		Ok(Self { code })
	}

	pub fn as_str(&self) -> &str {
		&self.code
	}

	pub fn prefix(&self) -> &str {
		&self.code[..2]
	}

	pub fn digits(&self) -> &str {
		&self.code[3..3 + DIGITS_LEN]
	}

	pub fn check_char(&self) -> char {
		self.code[self.code.len() - 1..].chars().next().unwrap_or_default()
	}
}
impl FromStr for VisualCode {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		Self::parse(raw)
	}
}
impl TryFrom<String> for VisualCode {
	type Error = Error;

	fn try_from(raw: String) -> Result<Self> {
		Self::parse(&raw)
	}
}
impl From<VisualCode> for String {
	fn from(code: VisualCode) -> Self {
		code.code
	}
}
impl fmt::Display for VisualCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.code)
	}
}

/// Position-weighted sum over `prefix ++ digits`, reduced modulo the alphabet length.
///
/// Characters outside the alphabet contribute their code point modulo the alphabet length, so
/// the function is total over any input.
pub fn checksum(prefix: &str, digits: &str) -> char {
	let alphabet = ALPHABET.as_bytes();
	let sum = prefix
		.chars()
		.chain(digits.chars())
		.enumerate()
		.fold(0_usize, |acc, (position, ch)| acc + (position + 1) * char_value(ch));

	alphabet[sum % alphabet.len()] as char
}

pub fn validate(code: &str) -> bool {
	VisualCode::parse(code).is_ok()
}

pub fn generate_random(prefix: &str) -> Result<VisualCode> {
	generate_with(prefix, &mut rand::thread_rng())
}

pub fn generate_with<R>(prefix: &str, rng: &mut R) -> Result<VisualCode>
where
	R: Rng + ?Sized,
{
	if prefix.len() != 2 || !prefix.bytes().all(|byte| byte.is_ascii_uppercase()) {
		return Err(Error::InvalidPrefix { prefix: prefix.to_string() });
	}

	let alphabet = ALPHABET.as_bytes();
	let digits = (0..DIGITS_LEN)
		.map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
		.collect::<String>();
	let check = checksum(prefix, &digits);

	Ok(VisualCode { code: format!("{prefix}-{digits}-{check}") })
}

fn char_value(ch: char) -> usize {
	match ALPHABET.find(ch) {
		Some(index) => index,
		None => ch as usize % ALPHABET.len(),
	}
}

fn split(code: &str) -> Option<(&str, &str, char)> {
	let mut parts = code.split('-');
	let prefix = parts.next()?;
	let digits = parts.next()?;
	let check = parts.next()?;

	if parts.next().is_some() {
		return None;
	}

	let mut check_chars = check.chars();
	let found = check_chars.next()?;

	if check_chars.next().is_some() {
		return None;
	}

	Some((prefix, digits, found))
}
