//! Text helpers behind the container's error messages: dependency-chain
//! rendering, type-name shortening, and "did you mean?" scoring.

use tracing::trace;

/// Joins a dependency chain into a single arrow-separated line.
///
/// # Examples
/// ```
/// use tarkib_support::rendering::render_chain;
///
/// let chain = ["Api", "Repo", "Pool", "Api"];
/// assert_eq!(render_chain(&chain), "Api → Repo → Pool → Api");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    let mut rendered = String::new();
    for (i, entry) in chain.iter().enumerate() {
        if i > 0 {
            rendered.push_str(" → ");
        }
        rendered.push_str(entry.as_ref());
    }
    rendered
}

/// Strips module paths from a type name while keeping its generic
/// structure intact.
///
/// ```
/// use tarkib_support::rendering::shorten_type_name;
///
/// assert_eq!(
///     shorten_type_name("my_app::services::user::UserService"),
///     "UserService"
/// );
/// assert_eq!(
///     shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>"),
///     "Arc<dyn Logger>"
/// );
/// ```
pub fn shorten_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut start = 0;
    for (i, ch) in full.char_indices() {
        // Path segments end at generic/tuple punctuation; everything
        // between two delimiters is one `a::b::C` path.
        if matches!(ch, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']') {
            out.push_str(last_path_segment(&full[start..i]));
            out.push(ch);
            start = i + ch.len_utf8();
        }
    }
    out.push_str(last_path_segment(&full[start..]));
    out
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Ranks registered type names by similarity to a requested one.
///
/// Comparison happens on the shortened, lowercased names: exact matches
/// first, then substring containment, then small edit distances. Names
/// further apart than a third of their length are not offered at all —
/// a wild guess is worse than no suggestion.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    limit: usize,
) -> Vec<String> {
    let wanted = shorten_type_name(requested).to_ascii_lowercase();

    let mut scored: Vec<(usize, &str)> = Vec::new();
    for &candidate in available {
        let short = shorten_type_name(candidate).to_ascii_lowercase();
        let score = if short == wanted {
            0
        } else if short.contains(&wanted) || wanted.contains(&short) {
            1
        } else {
            let distance = edit_distance(&wanted, &short);
            if distance * 3 > wanted.len().max(short.len()) {
                continue;
            }
            1 + distance
        };
        scored.push((score, candidate));
    }

    trace!(
        requested,
        candidates = scored.len(),
        "scored suggestion candidates"
    );

    scored.sort_by_key(|(score, _)| *score);
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}

// Levenshtein distance over chars, single rolling row.
fn edit_distance(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    let mut row: Vec<usize> = (0..=b_len).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let substitute = if ca == cb { diag } else { diag + 1 };
            diag = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(diag + 1);
        }
    }
    row[b_len]
}
