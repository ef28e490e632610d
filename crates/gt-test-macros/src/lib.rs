//! `#[graphql_test]`: async GraphQL tests on the shared test runtime.
//!
//! ```ignore
//! #[graphql_test]
//! async fn hello() { /* ... */ }
//!
//! #[graphql_test(init_tracing)]
//! async fn logged() { /* ... */ }
//!
//! #[graphql_test(crate_path = "testkit")]
//! async fn renamed_dependency() { /* ... */ }
//! ```
//!
//! The test body runs through `runtime::run_test`, so a test host and the
//! tasks it spawned shut down while the runtime is still alive.
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::Parser, punctuated::Punctuated, spanned::Spanned, Expr, ExprLit, ItemFn, Lit, Meta,
    Path, Token,
};

/// Marks an async function as a test that runs on the shared runtime.
///
/// Options:
/// - `init_tracing`: install the test tracing subscriber first.
/// - `crate_path = "..."`: path of the testkit crate when it was renamed.
#[proc_macro_attribute]
pub fn graphql_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr.into(), item.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct TestOptions {
    init_tracing: bool,
    crate_path: Path,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            init_tracing: false,
            crate_path: syn::parse_quote!(::graphql_testkit),
        }
    }
}

fn parse_options(attr: TokenStream2) -> syn::Result<TestOptions> {
    let mut options = TestOptions::default();
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(attr)?;

    for meta in metas {
        match meta {
            Meta::Path(path) if path.is_ident("init_tracing") => options.init_tracing = true,
            Meta::NameValue(pair) if pair.path.is_ident("crate_path") => {
                let Expr::Lit(ExprLit {
                    lit: Lit::Str(path), ..
                }) = &pair.value
                else {
                    return Err(syn::Error::new(
                        pair.value.span(),
                        "crate_path expects a string literal",
                    ));
                };
                options.crate_path = path.parse()?;
            }
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "unknown graphql_test option; expected `init_tracing` or `crate_path = \"...\"`",
                ))
            }
        }
    }
    Ok(options)
}

fn check_signature(test_fn: &ItemFn) -> syn::Result<()> {
    let sig = &test_fn.sig;
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(
            sig.fn_token.span(),
            "graphql_test functions must be async",
        ));
    }
    if !sig.inputs.is_empty() {
        return Err(syn::Error::new(
            sig.inputs.span(),
            "graphql_test functions take no arguments",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "graphql_test functions cannot be generic",
        ));
    }
    Ok(())
}

fn expand(attr: TokenStream2, item: TokenStream2) -> syn::Result<TokenStream2> {
    let options = parse_options(attr)?;
    let test_fn: ItemFn = syn::parse2(item)?;
    check_signature(&test_fn)?;

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = test_fn;
    let name = sig.ident;
    let output = sig.output;
    let testkit = options.crate_path;
    let tracing = options
        .init_tracing
        .then(|| quote!(#testkit::telemetry::init_test_tracing();));

    Ok(quote! {
        #(#attrs)*
        #[test]
        #vis fn #name() #output {
            #tracing
            #testkit::runtime::run_test(async move #block)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expanded(attr: TokenStream2, item: TokenStream2) -> String {
        expand(attr, item).expect("expand").to_string()
    }

    #[test]
    fn test_runs_body_on_shared_runtime() {
        let text = expanded(quote!(), quote!(async fn hello() { assert!(true); }));

        assert!(text.contains("test"));
        assert!(text.contains("graphql_testkit"));
        assert!(text.contains("run_test"));
        assert!(!text.contains("init_test_tracing"));
    }

    #[test]
    fn test_init_tracing_option() {
        let text = expanded(quote!(init_tracing), quote!(async fn logged() {}));
        assert!(text.contains("telemetry"));
        assert!(text.contains("init_test_tracing"));
    }

    #[test]
    fn test_crate_path_option() {
        let text = expanded(
            quote!(crate_path = "testkit", init_tracing),
            quote!(async fn renamed() {}),
        );

        assert!(text.contains("testkit"));
        assert!(text.contains("init_test_tracing"));
        assert!(!text.contains("graphql_testkit"));
    }

    #[test]
    fn test_return_type_is_kept() {
        let text = expanded(
            quote!(),
            quote!(async fn fallible() -> Result<(), String> { Ok(()) }),
        );
        assert!(text.contains("fallible"));
        assert!(text.contains("String"));
    }

    #[test]
    fn test_rejections() {
        assert!(expand(quote!(), quote!(fn not_async() {})).is_err());
        assert!(expand(quote!(), quote!(async fn with_args(x: u8) {})).is_err());
        assert!(expand(quote!(), quote!(async fn generic<T>() {})).is_err());
        assert!(expand(quote!(verbose), quote!(async fn unknown() {})).is_err());
        assert!(expand(quote!(crate_path = 1), quote!(async fn bad_path() {})).is_err());
    }
}
