pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if trimmed.starts_with("--") {
			continue;
		}

		match trimmed.strip_prefix("\\ir ").map(str::trim) {
			Some("tables/001_documents.sql") =>
				out.push_str(include_str!("../../../sql/tables/001_documents.sql")),
			_ => out.push_str(line),
		}

		out.push('\n');
	}

	out
}
