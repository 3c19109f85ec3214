//! Procedural macros for `convroute`.
//!
//! - `#[controller]` scans an inherent `impl` block for `handle_*` methods and
//!   emits a `Controller` implementation whose operations carry the canonical
//!   `Handle<Verb><Action>` identifier of each method.
//! - `#[derive(Describe)]` emits a structural type description honouring the
//!   serde attributes that change the wire shape (`rename`, `rename_all`,
//!   `skip`, `default`, `skip_serializing_if`).

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
    Attribute, Data, DeriveInput, Expr, ExprLit, Fields, Ident, ImplItem, ItemImpl, Lit, LitStr,
    Meta, Path, Result as SynResult, Token, Type,
};

// ---------------------------------------------------------------------------
// #[controller]
// ---------------------------------------------------------------------------

struct ControllerArgs {
    name: Option<LitStr>,
    middleware: Option<Ident>,
}

impl Parse for ControllerArgs {
    fn parse(input: ParseStream) -> SynResult<Self> {
        let mut args = ControllerArgs {
            name: None,
            middleware: None,
        };
        while !input.is_empty() {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            match key.to_string().as_str() {
                "name" => args.name = Some(input.parse()?),
                "middleware" => args.middleware = Some(input.parse()?),
                other => {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("unexpected controller option `{other}`"),
                    ))
                }
            }
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(args)
    }
}

#[derive(Default)]
struct RouteArgs {
    request: Option<Type>,
    response: Option<Type>,
    description: Option<LitStr>,
    name: Option<LitStr>,
}

impl Parse for RouteArgs {
    fn parse(input: ParseStream) -> SynResult<Self> {
        let mut args = RouteArgs::default();
        while !input.is_empty() {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            match key.to_string().as_str() {
                "request" => args.request = Some(input.parse()?),
                "response" => args.response = Some(input.parse()?),
                "description" => args.description = Some(input.parse()?),
                "name" => args.name = Some(input.parse()?),
                other => {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("unexpected route option `{other}`"),
                    ))
                }
            }
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(args)
    }
}

/// `handle_get_user_by_id` -> `HandleGetUserById`. Identifiers already in
/// `Handle...` form are kept verbatim.
fn canonical_identifier(method: &str) -> Option<String> {
    if method.starts_with("Handle") {
        return Some(method.to_string());
    }
    if !method.starts_with("handle_") {
        return None;
    }
    let pascal = method
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<String>();
    Some(pascal)
}

fn self_type_name(ty: &Type) -> Option<String> {
    if let Type::Path(p) = ty {
        return p.path.segments.last().map(|s| s.ident.to_string());
    }
    None
}

#[proc_macro_attribute]
pub fn controller(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ControllerArgs);
    let mut input = parse_macro_input!(item as ItemImpl);

    if input.trait_.is_some() {
        return syn::Error::new(
            Span::call_site(),
            "#[controller] must be placed on an inherent impl block",
        )
        .to_compile_error()
        .into();
    }

    let self_ty = input.self_ty.clone();
    let type_name = match (&args.name, self_type_name(&self_ty)) {
        (Some(lit), _) => lit.value(),
        (None, Some(name)) => name,
        (None, None) => {
            return syn::Error::new(Span::call_site(), "cannot infer controller type name")
                .to_compile_error()
                .into()
        }
    };

    let mut operations = Vec::new();
    for item in &mut input.items {
        let ImplItem::Fn(method) = item else { continue };

        let mut route_args = RouteArgs::default();
        let mut kept = Vec::with_capacity(method.attrs.len());
        for attr in method.attrs.drain(..) {
            if attr.path().is_ident("route") {
                match attr.parse_args::<RouteArgs>() {
                    Ok(parsed) => route_args = parsed,
                    Err(err) => return err.to_compile_error().into(),
                }
            } else {
                kept.push(attr);
            }
        }
        method.attrs = kept;

        let method_ident = method.sig.ident.clone();
        let Some(identifier) = canonical_identifier(&method_ident.to_string()) else {
            continue;
        };

        let mut op = quote! {
            ::convroute::controller::Operation::method(&self, #identifier, Self::#method_ident)
        };
        if let Some(ty) = &route_args.request {
            op = quote! { #op.request::<#ty>() };
        }
        if let Some(ty) = &route_args.response {
            op = quote! { #op.response::<#ty>() };
        }
        if let Some(desc) = &route_args.description {
            op = quote! { #op.describe(#desc) };
        }
        if let Some(name) = &route_args.name {
            op = quote! { #op.named(#name) };
        }
        operations.push(op);
    }

    let middleware_fn = args.middleware.as_ref().map(|ident| {
        quote! {
            fn middleware(&self) -> ::std::vec::Vec<::convroute::pipeline::MiddlewareRef> {
                Self::#ident(self)
            }
        }
    });

    let (impl_generics, _, where_clause) = input.generics.split_for_impl();
    let expanded = quote! {
        #input

        impl #impl_generics ::convroute::controller::Controller for #self_ty #where_clause {
            fn type_name(&self) -> &str {
                #type_name
            }

            fn operations(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::vec::Vec<::convroute::controller::Operation> {
                ::std::vec![#(#operations),*]
            }

            #middleware_fn
        }
    };
    TokenStream::from(expanded)
}

// ---------------------------------------------------------------------------
// #[derive(Describe)]
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SerdeFieldAttrs {
    rename: Option<String>,
    skip: bool,
    optional: bool,
}

fn lit_str_value(expr: &Expr) -> Option<String> {
    if let Expr::Lit(ExprLit {
        lit: Lit::Str(s), ..
    }) = expr
    {
        return Some(s.value());
    }
    None
}

fn nested_metas(attr: &Attribute) -> Vec<Meta> {
    attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
        .map(|p| p.into_iter().collect())
        .unwrap_or_default()
}

fn field_attrs(attrs: &[Attribute]) -> SerdeFieldAttrs {
    let mut out = SerdeFieldAttrs::default();
    for attr in attrs {
        let is_serde = attr.path().is_ident("serde");
        let is_describe = attr.path().is_ident("describe");
        if !is_serde && !is_describe {
            continue;
        }
        for meta in nested_metas(attr) {
            match &meta {
                Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                    out.rename = lit_str_value(&nv.value);
                }
                Meta::NameValue(nv) if nv.path.is_ident("skip_serializing_if") => {
                    out.optional = true;
                }
                Meta::NameValue(nv) if nv.path.is_ident("default") => {
                    out.optional = true;
                }
                Meta::Path(p) if p.is_ident("default") || p.is_ident("optional") => {
                    out.optional = true;
                }
                Meta::Path(p) if p.is_ident("skip") || p.is_ident("skip_serializing") => {
                    out.skip = true;
                }
                _ => {}
            }
        }
    }
    out
}

fn container_rename_all(attrs: &[Attribute]) -> Option<String> {
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        for meta in nested_metas(attr) {
            if let Meta::NameValue(nv) = &meta {
                if nv.path.is_ident("rename_all") {
                    return lit_str_value(&nv.value);
                }
            }
        }
    }
    None
}

fn split_words(ident: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for (i, c) in ident.chars().enumerate() {
        if c == '_' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if i > 0 && c.is_ascii_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn apply_rename_all(rule: &str, ident: &str) -> String {
    let words = split_words(ident);
    match rule {
        "lowercase" => words.concat(),
        "UPPERCASE" => words.concat().to_ascii_uppercase(),
        "camelCase" => words
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
            .collect(),
        "PascalCase" => words.iter().map(|w| capitalize(w)).collect(),
        "snake_case" => words.join("_"),
        "SCREAMING_SNAKE_CASE" => words.join("_").to_ascii_uppercase(),
        "kebab-case" => words.join("-"),
        "SCREAMING-KEBAB-CASE" => words.join("-").to_ascii_uppercase(),
        _ => ident.to_string(),
    }
}

fn is_option(ty: &Type) -> bool {
    if let Type::Path(p) = ty {
        if let Some(seg) = p.path.segments.last() {
            return seg.ident == "Option";
        }
    }
    false
}

#[proc_macro_derive(Describe, attributes(describe))]
pub fn derive_describe(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    match expand_describe(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_describe(input: &DeriveInput) -> SynResult<TokenStream2> {
    let ident = &input.ident;
    let name = ident.to_string();
    let krate: Path = syn::parse_quote!(::convroute::schema);

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(syn::parse_quote!(#krate::Describe));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => {
                let rename_all = container_rename_all(&input.attrs);
                let mut fields = Vec::new();
                for field in &named.named {
                    let attrs = field_attrs(&field.attrs);
                    if attrs.skip {
                        continue;
                    }
                    let Some(field_ident) = field.ident.as_ref() else {
                        continue;
                    };
                    let raw = field_ident.to_string();
                    let declared = raw.trim_start_matches("r#").to_string();
                    let serialized = match (&attrs.rename, &rename_all) {
                        (Some(explicit), _) => explicit.clone(),
                        (None, Some(rule)) => apply_rename_all(rule, &declared),
                        (None, None) => declared.clone(),
                    };
                    let optional = attrs.optional || is_option(&field.ty);
                    let ty = &field.ty;
                    fields.push(quote! {
                        #krate::FieldDescriptor::new(
                            #declared,
                            #serialized,
                            <#ty as #krate::Describe>::describe,
                        )
                        .optional(#optional)
                    });
                }
                quote! {
                    #krate::TypeDescriptor::object_at(
                        ::std::any::type_name::<Self>(),
                        #name,
                        ::std::vec![#(#fields),*],
                    )
                }
            }
            Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                let inner = &unnamed.unnamed[0].ty;
                quote! { <#inner as #krate::Describe>::describe() }
            }
            _ => {
                return Err(syn::Error::new(
                    Span::call_site(),
                    "Describe supports structs with named fields and newtypes",
                ))
            }
        },
        Data::Enum(data) => {
            let rename_all = container_rename_all(&input.attrs);
            let mut variants = Vec::new();
            for variant in &data.variants {
                if !matches!(variant.fields, Fields::Unit) {
                    return Err(syn::Error::new_spanned(
                        &variant.ident,
                        "Describe supports unit-only enums",
                    ));
                }
                let attrs = field_attrs(&variant.attrs);
                if attrs.skip {
                    continue;
                }
                let declared = variant.ident.to_string();
                let serialized = match (&attrs.rename, &rename_all) {
                    (Some(explicit), _) => explicit.clone(),
                    (None, Some(rule)) => apply_rename_all(rule, &declared),
                    (None, None) => declared,
                };
                variants.push(serialized);
            }
            quote! {
                #krate::TypeDescriptor::enumeration(
                    #name,
                    ::std::vec![#(::std::string::String::from(#variants)),*],
                )
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new(
                Span::call_site(),
                "Describe cannot be derived for unions",
            ))
        }
    };

    Ok(quote! {
        impl #impl_generics #krate::Describe for #ident #ty_generics #where_clause {
            fn describe() -> #krate::TypeDescriptor {
                #body
            }
        }
    })
}
