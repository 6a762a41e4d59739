use rand::{SeedableRng, rngs::StdRng};
use regex::Regex;

use shelf_domain::{
	Error, VisualCode,
	visual_code::{self, ALPHABET},
};

#[test]
fn checksum_is_deterministic() {
	let first = visual_code::checksum("BX", "1234");

	for _ in 0..100 {
		assert_eq!(visual_code::checksum("BX", "1234"), first);
	}
}

#[test]
fn generated_codes_match_format_and_validate() {
	let pattern = format!("^[A-Z]{{2}}-[{ALPHABET}]{{4}}-[{ALPHABET}]$");
	let re = Regex::new(&pattern).expect("Pattern must compile.");

	for _ in 0..256 {
		let code = visual_code::generate_random("BX").expect("Prefix must be accepted.");

		assert!(re.is_match(code.as_str()), "Unexpected code shape: {code}");
		assert!(visual_code::validate(code.as_str()), "Generated code failed validation: {code}");
		assert_eq!(code.prefix(), "BX");
	}
}

#[test]
fn seeded_generation_is_reproducible() {
	let first = visual_code::generate_with("CT", &mut StdRng::seed_from_u64(7))
		.expect("Prefix must be accepted.");
	let second = visual_code::generate_with("CT", &mut StdRng::seed_from_u64(7))
		.expect("Prefix must be accepted.");

	assert_eq!(first, second);
}

#[test]
fn tampered_checksum_fails_validation() {
	let code = visual_code::generate_random("BX").expect("Prefix must be accepted.");
	let check = code.check_char();
	let replacement = ALPHABET.chars().find(|ch| *ch != check).expect("Alphabet has many chars.");
	let tampered = format!("{}-{}-{replacement}", code.prefix(), code.digits());

	assert!(!visual_code::validate(&tampered));
	assert!(matches!(VisualCode::parse(&tampered), Err(Error::ChecksumMismatch { .. })));
}

#[test]
fn confusable_characters_are_rejected() {
	for code in ["BX-0000-3", "BX-1ILO-3", "bx-3333", "B1-3333-3", ""] {
		assert!(!visual_code::validate(code), "Expected {code:?} to be rejected.");
	}
}

#[test]
fn parse_normalizes_hand_typed_input() {
	let code = visual_code::generate_random("KT").expect("Prefix must be accepted.");
	let typed = format!("  {}  ", code.as_str().to_ascii_lowercase());

	assert_eq!(VisualCode::parse(&typed), Ok(code));
}

#[test]
fn invalid_prefixes_are_rejected() {
	for prefix in ["", "B", "bx", "B1", "BXX"] {
		assert!(matches!(
			visual_code::generate_random(prefix),
			Err(Error::InvalidPrefix { .. })
		));
	}
}

#[test]
fn serde_uses_the_string_form() {
	let code = visual_code::generate_random("BX").expect("Prefix must be accepted.");
	let json = serde_json::to_value(&code).expect("Failed to serialize code.");

	assert_eq!(json, serde_json::Value::String(code.to_string()));

	let back: VisualCode = serde_json::from_value(json).expect("Failed to deserialize code.");

	assert_eq!(back, code);
	assert!(serde_json::from_value::<VisualCode>(serde_json::json!("BX-3333-Q")).is_err());
}
