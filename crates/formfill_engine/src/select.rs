use scraper::{ElementRef, Html, Selector};

use crate::dom;

/// Token separating the selector segments of a path that crosses into shadow trees.
pub const SHADOW_ROOT_SEPARATOR: &str = "::shadow-root";

/// Upper bound on segments in one selector path.
pub const MAX_SELECTOR_SEGMENTS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("no element matches selector `{segment}`")]
    NotFound { segment: String },
    #[error("selected element is a <{tag}>, not a form")]
    NotAForm { tag: String },
    #[error("invalid selector `{segment}`: {message}")]
    InvalidSelector { segment: String, message: String },
    #[error("selector path has {depth} segments (max {max})")]
    PathTooDeep { depth: usize, max: usize },
}

/// Resolve a selector path to a `<form>` element.
///
/// Each segment is matched against the descendants of the current scope,
/// starting at `<body>`, with every compound of the segment inside that scope.
/// Shadow trees are not searched. When the match hosts a declarative shadow
/// root, scope moves to the shadow tree's first element. An empty segment
/// keeps the scope.
pub fn resolve_form<'a>(document: &'a Html, path: &str) -> Result<ElementRef<'a>, SelectionError> {
    let segments: Vec<&str> = path.split(SHADOW_ROOT_SEPARATOR).map(str::trim).collect();
    if segments.len() > MAX_SELECTOR_SEGMENTS {
        return Err(SelectionError::PathTooDeep {
            depth: segments.len(),
            max: MAX_SELECTOR_SEGMENTS,
        });
    }

    let mut scope = body_or_root(document);
    for segment in segments {
        if segment.is_empty() {
            continue;
        }
        let selector = scoped_selector(segment)?;
        let found = dom::descendant_elements(scope)
            .find(|candidate| selector.matches_with_scope(candidate, Some(scope)))
            .ok_or_else(|| SelectionError::NotFound {
                segment: segment.to_string(),
            })?;

        scope = match dom::shadow_template(found) {
            Some(template) => {
                dom::template_first_element(template).ok_or_else(|| SelectionError::NotFound {
                    segment: format!("{segment}{SHADOW_ROOT_SEPARATOR}"),
                })?
            }
            None => found,
        };
    }

    if dom::tag(scope) != "form" {
        return Err(SelectionError::NotAForm {
            tag: dom::tag(scope).to_string(),
        });
    }
    Ok(scope)
}

/// Parse `segment` with each of its comma-separated alternatives anchored
/// below `:scope`.
fn scoped_selector(segment: &str) -> Result<Selector, SelectionError> {
    let invalid = |message: String| SelectionError::InvalidSelector {
        segment: segment.to_string(),
        message,
    };
    Selector::parse(segment).map_err(|err| invalid(err.to_string()))?;
    let anchored = top_level_alternatives(segment)
        .into_iter()
        .map(|alternative| format!(":scope {}", alternative.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    Selector::parse(&anchored).map_err(|err| invalid(err.to_string()))
}

/// Split a selector list on commas that are outside brackets, parentheses
/// and quoted strings.
fn top_level_alternatives(segment: &str) -> Vec<&str> {
    let mut alternatives = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (index, ch) in segment.char_indices() {
        match (quote, ch) {
            (Some(open), ch) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                alternatives.push(&segment[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    alternatives.push(&segment[start..]);
    alternatives
}

fn body_or_root(document: &Html) -> ElementRef<'_> {
    let root = document.root_element();
    dom::descendant_elements(root)
        .find(|element| dom::tag(*element) == "body")
        .unwrap_or(root)
}

#[cfg(test)]
mod tests {
    use super::top_level_alternatives;

    #[test]
    fn alternatives_split_only_on_top_level_commas() {
        assert_eq!(
            top_level_alternatives(r#"form.a, :is(div, p) form, [data-x="1,2"]"#),
            vec!["form.a", " :is(div, p) form", r#" [data-x="1,2"]"#]
        );
    }
}
