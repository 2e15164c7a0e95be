//! Neutralises script injection through tags, attribute and property names, and URL-ish values.

pub(crate) fn no_script(tag: String) -> String {
	if tag.eq_ignore_ascii_case("script") {
		"p".to_owned()
	} else {
		tag
	}
}

/// Inline handlers (`on*`) and `formAction` are moved into inert `data-` attributes.
pub(crate) fn no_on_or_form_action(name: String) -> String {
	let starts_with_on = name.get(..2).map_or(false, |prefix| prefix.eq_ignore_ascii_case("on"));
	if starts_with_on || name.eq_ignore_ascii_case("formAction") {
		format!("data-{}", name)
	} else {
		name
	}
}

pub(crate) fn no_inner_html_or_form_action(name: String) -> String {
	if name == "innerHTML" || name == "formAction" {
		format!("data-{}", name)
	} else {
		name
	}
}

pub(crate) fn no_javascript_or_html_uri(value: String) -> String {
	let trimmed = value.trim_start();
	let dangerous = ["javascript:", "data:text/html"]
		.iter()
		.any(|scheme| trimmed.get(..scheme.len()).map_or(false, |prefix| prefix.eq_ignore_ascii_case(scheme)));
	if dangerous {
		String::new()
	} else {
		value
	}
}
