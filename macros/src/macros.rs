//! Procedural macros for the tripwire instrumentation toolkit.
//!
//! - `#[trigger]`: instruments a free function so every call is broadcast to
//!   the global registry before the body runs.
//! - `#[action]`: binds a function as an action to triggers declared elsewhere.
//!
//! Usage:
//! ```rust,ignore
//! use tripwire::{CallRecord, Result, enter_debugger, trigger};
//!
//! fn is_even(record: &CallRecord) -> bool {
//!     record.arg::<u64>(0).is_some_and(|n| n % 2 == 0)
//! }
//!
//! #[trigger]
//! fn plain(n: u64) -> Result<u64> { Ok(n) }
//!
//! #[trigger(action = enter_debugger)]
//! fn stops(n: u64) -> Result<u64> { Ok(n) }
//!
//! #[trigger(actions = [log_call, count_call], conditions = [is_even])]
//! fn gated(n: u64, #[kwarg] depth: u32) -> Result<u64> { Ok(n + depth as u64) }
//!
//! #[action(triggers = [PLAIN, GATED], conditions = [is_even])]
//! fn watch(record: &CallRecord) -> Result<()> { Ok(()) }
//! ```
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use proc_macro2::{Span, TokenTree};
use syn::{
    Expr, ExprArray, FnArg, Ident, ItemFn, LitStr, Pat, PatType, ReturnType, Signature, Type,
    meta::ParseNestedMeta, parse_macro_input, spanned::Spanned,
};

#[derive(Default)]
struct TriggerArgs {
    name: Option<LitStr>,
    actions: Vec<Expr>,
    conditions: Vec<Expr>,
}

impl TriggerArgs {
    fn parse(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("action") {
            self.actions.push(meta.value()?.parse()?);
        } else if meta.path.is_ident("actions") {
            let list: ExprArray = meta.value()?.parse()?;
            self.actions.extend(list.elems);
        } else if meta.path.is_ident("conditions") {
            let list: ExprArray = meta.value()?.parse()?;
            self.conditions.extend(list.elems);
        } else {
            return Err(meta.error("expected `name`, `action`, `actions` or `conditions`"));
        }
        Ok(())
    }
}

#[derive(Default)]
struct ActionArgs {
    triggers: Vec<Expr>,
    conditions: Vec<Expr>,
}

impl ActionArgs {
    fn parse(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("triggers") {
            let list: ExprArray = meta.value()?.parse()?;
            self.triggers.extend(list.elems);
        } else if meta.path.is_ident("conditions") {
            let list: ExprArray = meta.value()?.parse()?;
            self.conditions.extend(list.elems);
        } else {
            return Err(meta.error("expected `triggers` or `conditions`"));
        }
        Ok(())
    }
}

struct Param {
    ident: Ident,
    ty: Type,
    kwarg: bool,
}

/// Instruments a free function as a trigger.
///
/// Generates a `static` named after the function in upper case
/// (`fn fib` gets `static FIB: tripwire::Trigger`); use `FIB.id()` to register
/// more actions against it. Arguments:
///
/// - `action = expr`: fire this action on every call (repeatable)
/// - `actions = [a, b, ..]`: one consumer per action, in order
/// - `conditions = [p, q, ..]`: predicates gating all of the above
/// - `name = "..."`: display name, defaults to the function name
///
/// Parameters marked `#[kwarg]` are recorded as keyword arguments. The
/// function must return `Result<T, E>` with `E: From<tripwire::Error> + Display`,
/// and its parameters must be owned `Clone + Debug + Send + Sync` values.
#[proc_macro_attribute]
pub fn trigger(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = TriggerArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(meta));
    parse_macro_input!(attr with parser);
    let func = parse_macro_input!(item as ItemFn);

    expand(args, func)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Binds a free function as an action to triggers declared elsewhere.
///
/// Generates a `static` named after the function in upper case
/// (`fn watch` gets `static WATCH: tripwire::Binding`). Calling `WATCH.bind()`
/// registers the function on the global registry, once. Arguments:
///
/// - `triggers = [FIB, ..]`: `static` triggers generated by `#[trigger]`
/// - `conditions = [p, q, ..]`: predicates gating the action
///
/// The function must have the signature `fn(&CallRecord) -> tripwire::Result<()>`
/// and stays callable as is.
#[proc_macro_attribute]
pub fn action(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = ActionArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(meta));
    parse_macro_input!(attr with parser);
    let func = parse_macro_input!(item as ItemFn);

    expand_action(args, func)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_action(args: ActionArgs, func: ItemFn) -> syn::Result<TokenStream2> {
    let sig = &func.sig;
    check_signature(sig, "#[action]")?;
    match sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) => {
            return Err(syn::Error::new(receiver.span(), "#[action] only supports free functions"));
        }
        Some(FnArg::Typed(_)) if sig.inputs.len() == 1 => {}
        _ => {
            return Err(syn::Error::new(
                sig.inputs.span(),
                "#[action] functions take exactly one `&CallRecord` parameter",
            ));
        }
    }
    if args.triggers.is_empty() {
        return Err(syn::Error::new(Span::call_site(), "#[action] needs `triggers = [..]`"));
    }

    let vis = &func.vis;
    let ident = &sig.ident;
    let name = ident.to_string();
    let static_ident = format_ident!("{}", name.to_uppercase());
    let static_doc = format!("Binding of [`{ident}`].");
    let triggers = &args.triggers;
    let conditions = &args.conditions;

    Ok(quote! {
        #func

        #[doc = #static_doc]
        #vis static #static_ident: ::tripwire::Binding = {
            fn setup(registry: &::tripwire::Registry) {
                registry.register_at_base(::tripwire::Consumer::new(
                    ::tripwire::action(#ident),
                    ::std::vec![#(::std::clone::Clone::clone(::tripwire::Trigger::id(&#triggers))),*],
                    ::std::vec![#(::tripwire::Condition::new(#conditions)),*],
                ));
            }
            ::tripwire::Binding::new(#name, setup)
        };
    })
}

fn check_signature(sig: &Signature, attr: &str) -> syn::Result<()> {
    if let Some(constness) = &sig.constness {
        return Err(syn::Error::new(constness.span(), format!("{attr} does not support const functions")));
    }
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new(asyncness.span(), format!("{attr} does not support async functions")));
    }
    if let Some(unsafety) = &sig.unsafety {
        return Err(syn::Error::new(unsafety.span(), format!("{attr} does not support unsafe functions")));
    }
    if let Some(abi) = &sig.abi {
        return Err(syn::Error::new(abi.span(), format!("{attr} does not support extern functions")));
    }
    if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
        return Err(syn::Error::new(sig.generics.span(), format!("{attr} does not support generic functions")));
    }
    Ok(())
}

fn contains_impl_trait(tokens: TokenStream2) -> bool {
    tokens.into_iter().any(|token| match token {
        TokenTree::Ident(ident) => ident == "impl",
        TokenTree::Group(group) => contains_impl_trait(group.stream()),
        _ => false,
    })
}

fn expand(args: TriggerArgs, func: ItemFn) -> syn::Result<TokenStream2> {
    let sig = &func.sig;
    check_signature(sig, "#[trigger]")?;
    if let ReturnType::Default = sig.output {
        return Err(syn::Error::new(sig.span(), "#[trigger] functions must return a Result"));
    }

    let params = sig
        .inputs
        .iter()
        .map(param)
        .collect::<syn::Result<Vec<_>>>()?;

    let attrs = &func.attrs;
    let vis = &func.vis;
    let ident = &sig.ident;
    let output = &sig.output;
    let block = &func.block;
    let name = args
        .name
        .map(|lit| lit.value())
        .unwrap_or_else(|| ident.to_string());
    let static_ident = format_ident!("{}", ident.to_string().to_uppercase());
    let static_doc = format!("Trigger of [`{ident}`].");

    let trigger_init = if args.actions.is_empty() {
        quote! { ::tripwire::Trigger::new(#name) }
    } else {
        let actions = &args.actions;
        let conditions = &args.conditions;
        quote! {{
            fn setup(registry: &::tripwire::Registry, id: &::tripwire::TriggerId) {
                ::tripwire::Decorator::new(
                    ::std::vec![#(::tripwire::Condition::new(#conditions)),*],
                    ::std::vec![#(::tripwire::action(#actions)),*],
                )
                .attach(registry, id);
            }
            ::tripwire::Trigger::with_setup(#name, setup)
        }}
    };

    let idents: Vec<_> = params.iter().map(|p| &p.ident).collect();
    let types: Vec<_> = params.iter().map(|p| &p.ty).collect();
    let recorders = params.iter().map(|p| {
        let ident = &p.ident;
        if p.kwarg {
            let key = ident.to_string();
            quote! { .kwarg(#key, ::std::clone::Clone::clone(#ident)) }
        } else {
            quote! { .arg(::std::clone::Clone::clone(#ident)) }
        }
    });

    let inner_inputs = sig.inputs.iter().map(|input| {
        let mut input = input.clone();
        if let FnArg::Typed(pat) = &mut input {
            pat.attrs.retain(|a| !a.path().is_ident("kwarg"));
        }
        input
    });

    Ok(quote! {
        #[doc = #static_doc]
        #vis static #static_ident: ::tripwire::Trigger = #trigger_init;

        #(#attrs)*
        #vis fn #ident(#(#idents: #types),*) #output {
            fn __tripwire_body(#(#inner_inputs),*) #output #block

            ::tripwire::intercept_static(
                &#static_ident,
                (#(#idents,)*),
                |__args: &(#(#types,)*)| {
                    let (#(#idents,)*) = __args;
                    ::tripwire::CallArgs::new() #(#recorders)*
                },
                |(#(#idents,)*): (#(#types,)*)| __tripwire_body(#(#idents),*),
            )
        }
    })
}

fn param(input: &FnArg) -> syn::Result<Param> {
    let PatType { attrs, pat, ty, .. } = match input {
        FnArg::Typed(pat_type) => pat_type,
        FnArg::Receiver(receiver) => {
            return Err(syn::Error::new(receiver.span(), "#[trigger] only supports free functions"));
        }
    };
    let ident = match pat.as_ref() {
        Pat::Ident(pat_ident) if pat_ident.by_ref.is_none() && pat_ident.subpat.is_none() => {
            pat_ident.ident.clone()
        }
        other => {
            return Err(syn::Error::new(other.span(), "#[trigger] parameters must be plain identifiers"));
        }
    };
    if contains_impl_trait(quote!(#ty)) {
        return Err(syn::Error::new(ty.span(), "#[trigger] parameters cannot use `impl Trait`"));
    }
    Ok(Param {
        ident,
        ty: (**ty).clone(),
        kwarg: attrs.iter().any(|a| a.path().is_ident("kwarg")),
    })
}
