mod utils;

use proc_macro::{TokenStream, TokenTree};

/// Joins deferreds of possibly different types into one deferred tuple.
///
/// `all!(a, b, c)` fulfills with `(va, vb, vc)` once every input fulfills,
/// or rejects with the first rejection. It expands to nested
/// `::vow::zip` calls.
#[proc_macro]
pub fn all(input: TokenStream) -> TokenStream {
    let exprs = utils::split_args(input)
        .iter()
        .map(|tokens| utils::tokens_to_string(tokens))
        .collect::<Vec<_>>();

    let output = match exprs.len() {
        0 => String::from("::vow::Deferred::resolved(())"),
        1 => format!("::vow::Deferred::map(&({}), |__v1| (__v1,))", exprs[0]),
        2 => format!("::vow::zip(({}), ({}))", exprs[0], exprs[1]),
        count => {
            let mut zipped = format!("({})", exprs[0]);
            let mut pattern = String::from("__v1");

            for (i, expr) in exprs.iter().enumerate().skip(1) {
                zipped = format!("::vow::zip({zipped}, ({expr}))");
                pattern = format!("({pattern}, __v{})", i + 1);
            }

            let tuple = (1..=count)
                .map(|i| format!("__v{i}"))
                .collect::<Vec<_>>()
                .join(", ");

            format!("::vow::Deferred::map(&{zipped}, |{pattern}| ({tuple}))")
        }
    };

    match output.parse::<TokenStream>() {
        Ok(ts) => ts,
        Err(err) => utils::compile_error(&format!("all macro error: {err}")),
    }
}

/// Runs `main` with a driver and drains the task queue before returning.
///
/// Accepts `max_tasks_per_drain = N`.
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let driver = utils::driver_expr(&attr);

    match utils::rewrite_body(item, |body| drive(&driver, body)) {
        Some(tokens) => tokens.into_iter().collect(),
        None => utils::compile_error("#[vow::main] expects a function with a body"),
    }
}

/// Marks a test that runs with a driver and drains the task queue after the
/// body returns.
///
/// Unhandled rejections left behind by the body therefore fail the test.
/// Accepts `max_tasks_per_drain = N`.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let driver = utils::driver_expr(&attr);

    let Some(tokens) = utils::rewrite_body(item, |body| drive(&driver, body)) else {
        return utils::compile_error("#[vow::test] expects a function with a body");
    };

    let test_attr: TokenStream = "#[test]".parse().unwrap();
    let mut result: Vec<TokenTree> = test_attr.into_iter().collect();
    result.extend(tokens);

    result.into_iter().collect()
}

fn drive(driver: &str, body: &str) -> String {
    format!(
        "{{
            let __vow_driver = {driver};
            let __vow_output = (move || {{ {body} }})();
            if let ::core::result::Result::Err(err) = __vow_driver.run_until_idle() {{
                panic!(\"task queue did not drain: {{}}\", err);
            }}
            __vow_output
        }}"
    )
}
