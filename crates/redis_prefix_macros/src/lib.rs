//! Procedural macros for redis_prefix
//!
//! This crate provides procedural macros for the redis_prefix test shim:
//! - `#[prefix_test]`: Attribute macro that turns a function into a test and
//!   hands it the test's own name
//!
//! These macros are re-exported by the main `redis_prefix` crate and should
//! typically be used through that interface.
//!
//! # Examples
//!
//! ## Async test
//!
//! ```ignore
//! use redis_prefix::prelude::*;
//!
//! #[prefix_test]
//! async fn balance_is_isolated(t: TestName) {
//!     let mut client = Client::new(MemoryStore::new().connection());
//!     client.add_hook(PrefixHook::new(&t));
//!     client.set("user:1:balance", "150").await.unwrap();
//! }
//! ```
//!
//! ## Explicit name
//!
//! ```ignore
//! use redis_prefix::prelude::*;
//!
//! #[prefix_test(name = "TestRaceCondition")]
//! fn builds_hook(t: TestName) {
//!     assert_eq!(PrefixHook::new(&t).prefix(), "TestRaceCondition");
//! }
//! ```
//!
//! ## Multi-threaded runtime
//!
//! ```ignore
//! use redis_prefix::prelude::*;
//!
//! #[prefix_test(flavor = "multi_thread")]
//! async fn runs_on_worker_threads(t: TestName) {
//!     let _hook = PrefixHook::new(&t);
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::Parser, parse_macro_input, punctuated::Punctuated, Expr, ExprLit, FnArg, ItemFn, Lit,
    LitStr, Meta, Pat, PatType, Token, Type,
};

/// Arguments parsed from the `#[prefix_test(...)]` attribute
struct PrefixTestArgs {
    name: Option<LitStr>,
    flavor: Option<LitStr>,
}

impl PrefixTestArgs {
    /// Parse arguments from the attribute token stream
    fn parse(attr: TokenStream2) -> syn::Result<Self> {
        let mut name = None;
        let mut flavor = None;

        if !attr.is_empty() {
            let parser = Punctuated::<Meta, Token![,]>::parse_terminated;
            let metas = parser.parse2(attr)?;

            for meta in metas {
                let nv = match meta {
                    Meta::NameValue(nv) => nv,
                    other => {
                        return Err(syn::Error::new_spanned(
                            other,
                            "Expected key = \"...\" format",
                        ));
                    }
                };

                let ident = nv
                    .path
                    .get_ident()
                    .ok_or_else(|| syn::Error::new_spanned(&nv.path, "Expected simple identifier"))?
                    .to_string();

                let Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                }) = &nv.value
                else {
                    return Err(syn::Error::new_spanned(
                        &nv.value,
                        format!("Expected string literal for {}", ident),
                    ));
                };

                match ident.as_str() {
                    "name" => {
                        if lit.value().is_empty() {
                            return Err(syn::Error::new_spanned(lit, "Test name cannot be empty"));
                        }
                        name = Some(lit.clone());
                    }
                    "flavor" => {
                        if !matches!(lit.value().as_str(), "current_thread" | "multi_thread") {
                            return Err(syn::Error::new_spanned(
                                lit,
                                "Expected \"current_thread\" or \"multi_thread\"",
                            ));
                        }
                        flavor = Some(lit.clone());
                    }
                    _ => {
                        return Err(syn::Error::new_spanned(
                            &nv.path,
                            format!("Unknown attribute '{}'", ident),
                        ));
                    }
                }
            }
        }

        Ok(Self { name, flavor })
    }
}

/// The single parameter a test may take to receive its name
struct NameParam {
    pat: Pat,
    ty: Type,
}

impl NameParam {
    /// Parse the optional name parameter from the function signature
    fn from_fn_args(inputs: &Punctuated<FnArg, Token![,]>) -> syn::Result<Option<Self>> {
        if inputs.len() > 1 {
            return Err(syn::Error::new_spanned(
                inputs,
                "#[prefix_test] functions take at most one parameter",
            ));
        }

        match inputs.first() {
            None => Ok(None),
            Some(FnArg::Typed(PatType { pat, ty, .. })) => match &**pat {
                Pat::Ident(_) | Pat::Wild(_) => Ok(Some(Self {
                    pat: (**pat).clone(),
                    ty: (**ty).clone(),
                })),
                _ => Err(syn::Error::new_spanned(
                    pat,
                    "Only simple parameter names are supported",
                )),
            },
            Some(receiver @ FnArg::Receiver(_)) => Err(syn::Error::new_spanned(
                receiver,
                "Self parameter not supported in #[prefix_test]",
            )),
        }
    }
}

/// Validate the function signature
fn validate_function(func: &ItemFn, args: &PrefixTestArgs) -> syn::Result<()> {
    if !func.sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &func.sig.generics,
            "#[prefix_test] functions cannot be generic",
        ));
    }

    if func.sig.asyncness.is_none() {
        if let Some(flavor) = &args.flavor {
            return Err(syn::Error::new_spanned(
                flavor,
                "flavor requires an async function",
            ));
        }
    }

    Ok(())
}

/// Attribute macro for tests that namespace store keys by test name
///
/// The function becomes a test (`#[tokio::test]` when async, `#[test]`
/// otherwise). If it declares a parameter, that parameter is bound to a
/// `redis_prefix::TestName` holding the test's module path and function
/// name, ready to pass to `PrefixHook::new`.
///
/// # Arguments
///
/// * `name` - Optional test name (defaults to `module_path!()::fn_name`)
/// * `flavor` - Optional tokio runtime flavor for async tests
///
/// # Requirements
///
/// * At most one parameter, of type `TestName`
/// * No generics or `self` receiver
///
/// Other attributes such as `#[should_panic]` or `#[ignore]` are kept.
///
/// # Example
///
/// ```ignore
/// use redis_prefix::prelude::*;
///
/// #[prefix_test]
/// async fn counter_starts_at_one(t: TestName) {
///     let mut client = Client::new(MemoryStore::new().connection());
///     client.add_hook(PrefixHook::new(&t));
///     assert_eq!(client.incr("counter").await.unwrap(), 1);
/// }
/// ```
#[proc_macro_attribute]
pub fn prefix_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);

    match expand_prefix_test(attr.into(), input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Core expansion logic for the prefix_test macro
fn expand_prefix_test(attr: TokenStream2, input_fn: ItemFn) -> syn::Result<TokenStream2> {
    let args = PrefixTestArgs::parse(attr)?;
    validate_function(&input_fn, &args)?;

    let param = NameParam::from_fn_args(&input_fn.sig.inputs)?;

    let ItemFn {
        attrs,
        vis,
        mut sig,
        block,
    } = input_fn;
    let fn_name = sig.ident.clone();
    sig.inputs = Punctuated::new();

    let test_attr = match (&sig.asyncness, &args.flavor) {
        (None, _) => quote! { #[test] },
        (Some(_), None) => quote! { #[::tokio::test] },
        (Some(_), Some(flavor)) => quote! { #[::tokio::test(flavor = #flavor)] },
    };

    let binding = param.map(|NameParam { pat, ty }| {
        let name = match &args.name {
            Some(lit) => quote! { #lit },
            None => quote! { concat!(module_path!(), "::", stringify!(#fn_name)) },
        };
        quote! {
            let #pat: #ty = ::redis_prefix::TestName::new(#name);
        }
    });

    Ok(quote! {
        #test_attr
        #(#attrs)*
        #vis #sig {
            #binding
            #block
        }
    })
}
