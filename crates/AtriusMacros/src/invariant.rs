use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, LitStr, Meta, MetaList, MetaNameValue, Token};

/// Parsed `#[fhir_invariant(key, severity, human, expr, path)]`.
pub(crate) struct InvariantLit {
    key: LitStr,
    severity: LitStr,
    human: LitStr,
    expr: LitStr,
    path: LitStr,
}

pub(crate) fn parse_fhir_invariant(attr: &Attribute) -> syn::Result<InvariantLit> {
    let Meta::List(MetaList { tokens, .. }) = attr.meta.clone() else {
        return Err(syn::Error::new(attr.span(), "expected #[fhir_invariant(...)]"));
    };

    let parser = Punctuated::<MetaNameValue, Token![,]>::parse_terminated;
    let list = parser.parse2(tokens)?;

    let mut key = None;
    let mut severity = None;
    let mut human = None;
    let mut expr = None;
    let mut path = None;

    for nv in list {
        let span = nv.span();
        let ident = nv
            .path
            .get_ident()
            .map(|i| i.to_string())
            .unwrap_or_default();

        let lit = match nv.value {
            syn::Expr::Lit(syn::ExprLit { lit: syn::Lit::Str(s), .. }) => s,
            _ => return Err(syn::Error::new(span, "expected string literal")),
        };

        match ident.as_str() {
            "key" => key = Some(lit),
            "severity" => severity = Some(lit),
            "human" => human = Some(lit),
            "expr" => expr = Some(lit),
            "path" => path = Some(lit),
            _ => return Err(syn::Error::new(span, "unknown fhir_invariant field")),
        }
    }

    let missing = |name: &str| {
        syn::Error::new(attr.span(), format!("missing required fhir_invariant field: {name}"))
    };

    let severity = severity.ok_or_else(|| missing("severity"))?;
    if !matches!(severity.value().as_str(), "rule" | "warning") {
        return Err(syn::Error::new(severity.span(), "severity must be \"rule\" or \"warning\""));
    }

    Ok(InvariantLit {
        key: key.ok_or_else(|| missing("key"))?,
        severity,
        human: human.ok_or_else(|| missing("human"))?,
        expr: expr.ok_or_else(|| missing("expr"))?,
        path: path.ok_or_else(|| missing("path"))?,
    })
}

pub(crate) fn parse_invariants(attrs: &[Attribute]) -> syn::Result<Vec<InvariantLit>> {
    attrs
        .iter()
        .filter(|a| a.path().is_ident("fhir_invariant"))
        .map(parse_fhir_invariant)
        .collect()
}

impl InvariantLit {
    /// Const-constructible `Invariant` literal.
    pub(crate) fn to_tokens(&self) -> TokenStream {
        let InvariantLit { key, severity, human, expr, path } = self;
        let level = match severity.value().as_str() {
            "warning" => quote! { ::atrius_fhir_model::support::ConstraintLevel::Warning },
            _ => quote! { ::atrius_fhir_model::support::ConstraintLevel::Rule },
        };
        quote! {
            ::atrius_fhir_model::support::Invariant {
                key: #key,
                severity: #level,
                human: #human,
                expr: #expr,
                path: #path,
            }
        }
    }
}
