use cdl_config::MAX_SEARCH_LIMIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCode {
	RejectEmptyQuery,
	RejectInvalidQuery,
	RejectLimitOutOfRange,
}
impl RejectCode {
	pub fn message(self) -> String {
		match self {
			Self::RejectEmptyQuery => "query must be non-empty.".to_string(),
			Self::RejectInvalidQuery => "query must not contain NUL characters.".to_string(),
			Self::RejectLimitOutOfRange =>
				format!("limit must be in the range 1-{MAX_SEARCH_LIMIT}."),
		}
	}
}

/// A search request that passed validation. `term` is the trimmed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidSearch<'a> {
	pub term: &'a str,
	pub limit: u32,
}

pub fn validate_search(query: &str, limit: u32) -> Result<ValidSearch<'_>, RejectCode> {
	let term = query.trim();

	if term.is_empty() {
		return Err(RejectCode::RejectEmptyQuery);
	}
	// Postgres text cannot store NUL.
	if term.contains('\0') {
		return Err(RejectCode::RejectInvalidQuery);
	}
	if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
		return Err(RejectCode::RejectLimitOutOfRange);
	}

	Ok(ValidSearch { term, limit })
}

/// Over-fetch size handed to a retrieval stage so it has room to rank before truncation.
pub fn candidate_pool(limit: u32, factor: u32) -> u32 {
	limit.saturating_mul(factor.max(1)).max(limit)
}
