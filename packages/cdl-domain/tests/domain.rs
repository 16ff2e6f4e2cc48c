use cdl_domain::{
	query::{self, RejectCode},
	similarity::{self, NEUTRAL_SCORE},
	text,
};

#[test]
fn rejects_limits_outside_search_bounds() {
	assert_eq!(query::validate_search("x", 0), Err(RejectCode::RejectLimitOutOfRange));
	assert_eq!(query::validate_search("x", 51), Err(RejectCode::RejectLimitOutOfRange));
	assert!(query::validate_search("x", 1).is_ok());
	assert!(query::validate_search("x", 50).is_ok());
}

#[test]
fn empty_query_wins_over_bad_limit() {
	assert_eq!(query::validate_search("", 0), Err(RejectCode::RejectEmptyQuery));
}

#[test]
fn rejection_messages_name_the_field() {
	assert_eq!(RejectCode::RejectEmptyQuery.message(), "query must be non-empty.");
	assert_eq!(RejectCode::RejectLimitOutOfRange.message(), "limit must be in the range 1-50.");
}

#[test]
fn uncomputable_similarity_falls_back_to_neutral() {
	let query_vec = [0.6_f32, 0.8];

	assert_eq!(similarity::score(&query_vec, None), NEUTRAL_SCORE);
	assert_eq!(similarity::score(&query_vec, Some(&[1.0, 0.0, 0.0])), NEUTRAL_SCORE);
	assert_eq!(similarity::score(&query_vec, Some(&[0.0, 0.0])), NEUTRAL_SCORE);
	assert_eq!(similarity::score(&[], Some(&[])), NEUTRAL_SCORE);
	assert_eq!(similarity::score(&query_vec, Some(&[f32::INFINITY, 1.0])), NEUTRAL_SCORE);
}

#[test]
fn similarity_stays_in_unit_interval() {
	let query_vec = [0.3_f32, -0.7, 0.1, 0.9];
	let docs: [[f32; 4]; 4] = [
		[1.0, 2.0, 3.0, 4.0],
		[-0.3, 0.7, -0.1, -0.9],
		[0.3, -0.7, 0.1, 0.9],
		[5.0, 0.0, 0.0, 0.0],
	];

	for doc in docs {
		let got = similarity::score(&query_vec, Some(&doc));

		assert!((0.0..=1.0).contains(&got), "score {got} out of range for {doc:?}");
	}
}

#[test]
fn identical_vectors_score_one() {
	let vec = [0.1_f32, 0.2, 0.3];
	let got = similarity::score(&vec, Some(&vec));

	assert!((got - 1.0).abs() < 1e-6, "got {got}");
}

#[test]
fn excerpt_takes_a_prefix() {
	let content = "a".repeat(600);

	assert_eq!(text::excerpt(&content, 500).chars().count(), 500);
	assert_eq!(text::excerpt("short", 500), "short");
}

#[test]
fn lists_are_trimmed_and_deduplicated() {
	assert_eq!(
		text::parse_list(" rust, search ,, rust ,ml"),
		vec!["rust".to_string(), "search".to_string(), "ml".to_string()]
	);
	assert!(text::parse_list("  ").is_empty());
	assert_eq!(text::clean_list(["  a ", "", "b"]), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn author_names_keep_order_and_repeats() {
	assert_eq!(
		text::clean_names([" Ann Lee ", "", "Bo", "Ann Lee"]),
		vec!["Ann Lee".to_string(), "Bo".to_string(), "Ann Lee".to_string()]
	);
}

#[test]
fn nul_in_query_is_rejected() {
	assert_eq!(query::validate_search("a\0b", 10), Err(RejectCode::RejectInvalidQuery));
	assert_eq!(
		RejectCode::RejectInvalidQuery.message(),
		"query must not contain NUL characters."
	);
}
