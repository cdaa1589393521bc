use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Splits a `TokenStream` into comma-separated arguments.
///
/// Each argument is returned as a `Vec<TokenTree>`.
/// Commas at the top level are used as separators.
///
/// Commas nested in `()`, `[]` or `{}` are kept, since those arrive as a
/// single group token. Commas between angle brackets are not: wrap such
/// expressions in parentheses.
pub(crate) fn split_args(input: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    for token in input {
        match &token {
            TokenTree::Punct(p) if p.as_char() == ',' => {
                if !current.is_empty() {
                    args.push(current);
                    current = Vec::new();
                }
            }
            _ => current.push(token),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Converts a slice of tokens into a Rust source string.
///
/// This function preserves token order and inserts spaces
/// between consecutive identifiers and literals to avoid accidental
/// token merging (e.g. `foo bar` vs `foobar`, `1 as u8` vs `1as`).
pub(crate) fn tokens_to_string(tokens: &[TokenTree]) -> String {
    let mut out = String::new();
    let mut prev_was_word = false;

    for t in tokens {
        let is_word = matches!(t, TokenTree::Ident(_) | TokenTree::Literal(_));

        if prev_was_word && is_word {
            out.push(' ');
        }

        out.push_str(&t.to_string());
        prev_was_word = is_word;
    }

    out
}

/// Reads `key = <usize>` from a comma-separated attribute argument list.
pub(crate) fn usize_arg(attr: &TokenStream, key: &str) -> Option<usize> {
    let attr = attr.to_string();

    attr.split(',').find_map(|part| {
        let value = part.trim().strip_prefix(key)?;
        let value = value.trim_start().strip_prefix('=')?;
        value.trim().replace('_', "").parse::<usize>().ok()
    })
}

/// Replaces the body of the function in `item` with the result of `wrap`.
///
/// `wrap` receives the original body as source text. Returns `None` if no
/// body block is found.
pub(crate) fn rewrite_body(
    item: TokenStream,
    wrap: impl FnOnce(&str) -> String,
) -> Option<Vec<TokenTree>> {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let pos = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))?;

    let body = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let stream = wrap(&body).parse::<TokenStream>().ok()?;
    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream));

    Some(tokens)
}

/// Builds the `DriverBuilder` expression for the attribute arguments.
pub(crate) fn driver_expr(attr: &TokenStream) -> String {
    let mut builder = String::from("::vow::DriverBuilder::new()");

    if let Some(n) = usize_arg(attr, "max_tasks_per_drain") {
        builder.push_str(&format!(".max_tasks_per_drain({n})"));
    }

    builder.push_str(".build()");
    builder
}

/// Expands to a `compile_error!` with `msg`.
pub(crate) fn compile_error(msg: &str) -> TokenStream {
    format!("compile_error!({msg:?});").parse().unwrap()
}
