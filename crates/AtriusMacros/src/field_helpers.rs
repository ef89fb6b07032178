use heck::ToLowerCamelCase;
use syn::ext::IdentExt;
use syn::{Attribute, Ident, LitInt, LitStr};

/// Field-level `#[fhir(...)]` options.
///
/// ```rust,ignore
/// #[fhir(layer)]                 // capability layer (Element/Backbone/Resource/DomainResource)
/// #[fhir(choice)]                // Option<ChoiceEnum> or ChoiceEnum
/// #[fhir(rename = "valueSet")]   // FHIR name when camelCase conversion is not enough
/// #[fhir(min = 1)]               // minimum cardinality of a list
/// #[fhir(attribute)]             // plain string that does not count as a child
/// ```
#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub layer: bool,
    pub choice: bool,
    pub attribute: bool,
    pub rename: Option<String>,
    pub min: Option<u32>,
}

pub(crate) fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("fhir")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("layer") {
                out.layer = true;
            } else if meta.path.is_ident("choice") {
                out.choice = true;
            } else if meta.path.is_ident("attribute") {
                out.attribute = true;
            } else if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                out.rename = Some(lit.value());
            } else if meta.path.is_ident("min") {
                let lit: LitInt = meta.value()?.parse()?;
                out.min = Some(lit.base10_parse()?);
            } else {
                return Err(meta.error("unsupported field option in #[fhir(...)]"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// Struct-level `#[fhir(...)]` options of a node.
#[derive(Default)]
pub(crate) struct TypeAttrs {
    pub type_name: Option<String>,
    /// Groups of fields of which exactly one must be present.
    pub one_of: Vec<Vec<Ident>>,
    /// Groups of fields of which at most one may be present.
    pub at_most_one: Vec<Vec<Ident>>,
    /// `fn(&Node, &mut Violations)` hooks run after construction.
    pub validate: Vec<syn::Path>,
}

fn parse_ident_group(meta: &syn::meta::ParseNestedMeta) -> syn::Result<Vec<Ident>> {
    let mut group = Vec::new();
    meta.parse_nested_meta(|inner| {
        let ident = inner
            .path
            .get_ident()
            .cloned()
            .ok_or_else(|| inner.error("expected a field name"))?;
        group.push(ident);
        Ok(())
    })?;
    if group.len() < 2 {
        return Err(meta.error("a field group needs at least two fields"));
    }
    Ok(group)
}

pub(crate) fn parse_type_attrs(attrs: &[Attribute]) -> syn::Result<TypeAttrs> {
    let mut out = TypeAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("fhir")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("type_name") {
                let lit: LitStr = meta.value()?.parse()?;
                out.type_name = Some(lit.value());
            } else if meta.path.is_ident("one_of") {
                out.one_of.push(parse_ident_group(&meta)?);
            } else if meta.path.is_ident("at_most_one") {
                out.at_most_one.push(parse_ident_group(&meta)?);
            } else if meta.path.is_ident("validate") {
                out.validate.push(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unsupported type option in #[fhir(...)]"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// Enum-level `#[fhir(...)]` options of a choice union.
#[derive(Default)]
pub(crate) struct ChoiceAttrs {
    /// Field name the choice is stored under, e.g. `value` for `value[x]`.
    pub base_name: Option<String>,
    /// The union of every admissible datatype; converts to itself.
    pub open: bool,
}

pub(crate) fn parse_choice_attrs(attrs: &[Attribute]) -> syn::Result<ChoiceAttrs> {
    let mut out = ChoiceAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("fhir")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("base_name") {
                let lit: LitStr = meta.value()?.parse()?;
                out.base_name = Some(lit.value());
            } else if meta.path.is_ident("open") {
                out.open = true;
            } else {
                return Err(meta.error("unsupported choice option in #[fhir(...)]"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// Determines the FHIR name of a field.
///
/// An explicit `#[fhir(rename = "...")]` wins; otherwise the Rust identifier is unrawed
/// and converted from `snake_case` to `camelCase`.
///
/// ```rust,ignore
/// // pub implicit_rules: Option<Uri>  => "implicitRules"
/// // pub r#type: PropertyType         => "type"
/// ```
pub(crate) fn get_effective_field_name(ident: &Ident, attrs: &FieldAttrs) -> String {
    match &attrs.rename {
        Some(name) => name.clone(),
        None => ident.unraw().to_string().to_lower_camel_case(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn camel_cases_and_unraws() {
        let attrs = FieldAttrs::default();
        let ident: Ident = parse_quote!(value_set);
        assert_eq!(get_effective_field_name(&ident, &attrs), "valueSet");
        let ident: Ident = parse_quote!(r#type);
        assert_eq!(get_effective_field_name(&ident, &attrs), "type");
    }

    #[test]
    fn parses_groups_and_hooks() {
        let item: syn::DeriveInput = parse_quote! {
            #[fhir(type_name = "ConceptMap.group.element", one_of(code, value_set))]
            #[fhir(validate = check_no_map)]
            struct Element {}
        };
        let attrs = parse_type_attrs(&item.attrs).unwrap();
        assert_eq!(attrs.type_name.as_deref(), Some("ConceptMap.group.element"));
        assert_eq!(attrs.one_of[0].len(), 2);
        assert_eq!(attrs.validate.len(), 1);
    }
}
