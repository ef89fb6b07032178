//=============================================================================
// Type Analysis Helper Functions
//=============================================================================

use syn::{GenericArgument, PathArguments, Type, TypePath};

/// Returns the single generic argument of `Wrapper<T>` when the last path segment of
/// `ty` is `wrapper`.
///
/// ```rust,ignore
/// // generic_inner(Option<Vec<Coding>>, "Option") => Some(Vec<Coding>)
/// // generic_inner(Coding, "Option")              => None
/// ```
fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(TypePath { path, qself: None }) = ty else {
        return None;
    };
    let segment = path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

pub(crate) fn option_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Option")
}

pub(crate) fn vec_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Vec")
}

pub(crate) fn box_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Box")
}

/// Last path identifier of a type, e.g. `BackboneLayer` for `crate::layer::BackboneLayer`.
pub(crate) fn last_ident(ty: &Type) -> Option<String> {
    let Type::Path(TypePath { path, .. }) = ty else {
        return None;
    };
    path.segments.last().map(|s| s.ident.to_string())
}

/// `String` is the only plain Rust scalar a node field may hold (element ids,
/// extension urls, narrative xhtml).
pub(crate) fn is_rust_string(ty: &Type) -> bool {
    let Type::Path(TypePath { path, qself: None }) = ty else {
        return false;
    };
    path.segments.len() == 1
        && path.segments[0].ident == "String"
        && path.segments[0].arguments.is_none()
}
