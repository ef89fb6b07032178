//! Capability layers.
//!
//! Instead of an inheritance chain, every node type is composed of exactly one layer that
//! carries the fields it shares with its kind:
//!
//! | layer                   | fields                                                     |
//! |-------------------------|------------------------------------------------------------|
//! | [`ElementLayer`]        | `id`, `extension`                                          |
//! | [`BackboneLayer`]       | Element + `modifierExtension`                              |
//! | [`ResourceLayer`]       | `id`, `meta`, `implicitRules`, `language`                  |
//! | [`DomainResourceLayer`] | Resource + `text`, `contained`, `extension`, `modifierExtension` |
//!
//! Each layer has a builder counterpart, and the capability traits ([`Element`],
//! [`Resource`], ... and their `*Builder` twins) give typed access to the layer fields of
//! any node or builder composed on it.

use std::fmt;

use crate::builder::Violations;
use crate::datatypes::{Extension, Meta, Narrative};
use crate::node::{FieldInfo, FieldKind, Max, Node};
use crate::primitive::{Code, Uri};
use crate::r5::AnyResource;
use crate::visitor::Walker;

/// A fixed field set shared by a family of node types.
pub trait Layer: Clone + fmt::Debug + Send + Sync + 'static {
    type Builder: Clone + fmt::Debug + Default;

    /// The layer's fields in traversal order.
    const FIELDS: &'static [FieldInfo];

    const IS_RESOURCE: bool = false;

    fn walk<'t>(&'t self, walker: &mut Walker<'_, 't>);

    fn has_children(&self) -> bool;

    /// Builder holding this layer's current values.
    fn seed(&self) -> Self::Builder;

    fn freeze(builder: Self::Builder, violations: &mut Violations) -> Self;
}

const fn field(name: &'static str, max: Max, kind: FieldKind) -> FieldInfo {
    FieldInfo {
        name,
        min: 0,
        max,
        kind,
        constraints: &[],
    }
}

const ID: FieldInfo = field("id", Max::One, FieldKind::Scalar);
const EXTENSION: FieldInfo = field("extension", Max::Many, FieldKind::Node);
const MODIFIER_EXTENSION: FieldInfo = field("modifierExtension", Max::Many, FieldKind::Node);
const META: FieldInfo = field("meta", Max::One, FieldKind::Node);
const IMPLICIT_RULES: FieldInfo = field("implicitRules", Max::One, FieldKind::Node);
const LANGUAGE: FieldInfo = field("language", Max::One, FieldKind::Node);
const TEXT: FieldInfo = field("text", Max::One, FieldKind::Node);
const CONTAINED: FieldInfo = field("contained", Max::Many, FieldKind::Node);

//=============================================================================
// Element
//=============================================================================

#[derive(Debug, Clone, Default)]
pub struct ElementLayer {
    id: Option<String>,
    extension: Vec<Extension>,
}

impl ElementLayer {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn extension(&self) -> &[Extension] {
        &self.extension
    }
}

#[derive(Debug, Clone, Default)]
pub struct ElementLayerBuilder {
    id: Option<String>,
    extension: Vec<Option<Extension>>,
}

impl Layer for ElementLayer {
    type Builder = ElementLayerBuilder;

    const FIELDS: &'static [FieldInfo] = &[ID, EXTENSION];

    fn walk<'t>(&'t self, walker: &mut Walker<'_, 't>) {
        walker.scalar("id", self.id.as_deref());
        walker.list("extension", &self.extension);
    }

    fn has_children(&self) -> bool {
        !self.extension.is_empty()
    }

    fn seed(&self) -> ElementLayerBuilder {
        ElementLayerBuilder {
            id: self.id.clone(),
            extension: self.extension.iter().cloned().map(Some).collect(),
        }
    }

    fn freeze(builder: ElementLayerBuilder, violations: &mut Violations) -> Self {
        Self {
            id: builder.id,
            extension: violations.list("extension", builder.extension, 0),
        }
    }
}

//=============================================================================
// BackboneElement
//=============================================================================

#[derive(Debug, Clone, Default)]
pub struct BackboneLayer {
    element: ElementLayer,
    modifier_extension: Vec<Extension>,
}

impl BackboneLayer {
    pub fn element(&self) -> &ElementLayer {
        &self.element
    }

    pub fn modifier_extension(&self) -> &[Extension] {
        &self.modifier_extension
    }
}

#[derive(Debug, Clone, Default)]
pub struct BackboneLayerBuilder {
    element: ElementLayerBuilder,
    modifier_extension: Vec<Option<Extension>>,
}

impl BackboneLayerBuilder {
    pub fn element_mut(&mut self) -> &mut ElementLayerBuilder {
        &mut self.element
    }
}

impl Layer for BackboneLayer {
    type Builder = BackboneLayerBuilder;

    const FIELDS: &'static [FieldInfo] = &[ID, EXTENSION, MODIFIER_EXTENSION];

    fn walk<'t>(&'t self, walker: &mut Walker<'_, 't>) {
        self.element.walk(walker);
        walker.list("modifierExtension", &self.modifier_extension);
    }

    fn has_children(&self) -> bool {
        self.element.has_children() || !self.modifier_extension.is_empty()
    }

    fn seed(&self) -> BackboneLayerBuilder {
        BackboneLayerBuilder {
            element: self.element.seed(),
            modifier_extension: self.modifier_extension.iter().cloned().map(Some).collect(),
        }
    }

    fn freeze(builder: BackboneLayerBuilder, violations: &mut Violations) -> Self {
        Self {
            element: ElementLayer::freeze(builder.element, violations),
            modifier_extension: violations.list("modifierExtension", builder.modifier_extension, 0),
        }
    }
}

//=============================================================================
// Resource
//=============================================================================

#[derive(Debug, Clone, Default)]
pub struct ResourceLayer {
    id: Option<String>,
    meta: Option<Meta>,
    implicit_rules: Option<Uri>,
    language: Option<Code>,
}

impl ResourceLayer {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceLayerBuilder {
    id: Option<String>,
    meta: Option<Meta>,
    implicit_rules: Option<Uri>,
    language: Option<Code>,
}

impl Layer for ResourceLayer {
    type Builder = ResourceLayerBuilder;

    const FIELDS: &'static [FieldInfo] = &[ID, META, IMPLICIT_RULES, LANGUAGE];

    const IS_RESOURCE: bool = true;

    fn walk<'t>(&'t self, walker: &mut Walker<'_, 't>) {
        walker.scalar("id", self.id.as_deref());
        walker.optional("meta", self.meta.as_ref());
        walker.optional("implicitRules", self.implicit_rules.as_ref());
        walker.optional("language", self.language.as_ref());
    }

    fn has_children(&self) -> bool {
        self.id.is_some()
            || self.meta.is_some()
            || self.implicit_rules.is_some()
            || self.language.is_some()
    }

    fn seed(&self) -> ResourceLayerBuilder {
        ResourceLayerBuilder {
            id: self.id.clone(),
            meta: self.meta.clone(),
            implicit_rules: self.implicit_rules.clone(),
            language: self.language.clone(),
        }
    }

    fn freeze(builder: ResourceLayerBuilder, _violations: &mut Violations) -> Self {
        Self {
            id: builder.id,
            meta: builder.meta,
            implicit_rules: builder.implicit_rules,
            language: builder.language,
        }
    }
}

//=============================================================================
// DomainResource
//=============================================================================

#[derive(Debug, Clone, Default)]
pub struct DomainResourceLayer {
    resource: ResourceLayer,
    text: Option<Narrative>,
    contained: Vec<AnyResource>,
    extension: Vec<Extension>,
    modifier_extension: Vec<Extension>,
}

impl DomainResourceLayer {
    pub fn resource(&self) -> &ResourceLayer {
        &self.resource
    }
}

#[derive(Debug, Clone, Default)]
pub struct DomainResourceLayerBuilder {
    resource: ResourceLayerBuilder,
    text: Option<Narrative>,
    contained: Vec<Option<AnyResource>>,
    extension: Vec<Option<Extension>>,
    modifier_extension: Vec<Option<Extension>>,
}

impl DomainResourceLayerBuilder {
    pub fn resource_mut(&mut self) -> &mut ResourceLayerBuilder {
        &mut self.resource
    }
}

impl Layer for DomainResourceLayer {
    type Builder = DomainResourceLayerBuilder;

    const FIELDS: &'static [FieldInfo] = &[
        ID,
        META,
        IMPLICIT_RULES,
        LANGUAGE,
        TEXT,
        CONTAINED,
        EXTENSION,
        MODIFIER_EXTENSION,
    ];

    const IS_RESOURCE: bool = true;

    fn walk<'t>(&'t self, walker: &mut Walker<'_, 't>) {
        self.resource.walk(walker);
        walker.optional("text", self.text.as_ref());
        walker.list("contained", &self.contained);
        walker.list("extension", &self.extension);
        walker.list("modifierExtension", &self.modifier_extension);
    }

    fn has_children(&self) -> bool {
        self.resource.has_children()
            || self.text.is_some()
            || !self.contained.is_empty()
            || !self.extension.is_empty()
            || !self.modifier_extension.is_empty()
    }

    fn seed(&self) -> DomainResourceLayerBuilder {
        DomainResourceLayerBuilder {
            resource: self.resource.seed(),
            text: self.text.clone(),
            contained: self.contained.iter().cloned().map(Some).collect(),
            extension: self.extension.iter().cloned().map(Some).collect(),
            modifier_extension: self.modifier_extension.iter().cloned().map(Some).collect(),
        }
    }

    fn freeze(builder: DomainResourceLayerBuilder, violations: &mut Violations) -> Self {
        Self {
            resource: ResourceLayer::freeze(builder.resource, violations),
            text: builder.text,
            contained: violations.list("contained", builder.contained, 0),
            extension: violations.list("extension", builder.extension, 0),
            modifier_extension: violations.list("modifierExtension", builder.modifier_extension, 0),
        }
    }
}

//=============================================================================
// Capability traits on nodes
//=============================================================================

pub trait Element: Node {
    fn element_layer(&self) -> &ElementLayer;

    fn id(&self) -> Option<&str> {
        self.element_layer().id()
    }

    fn extension(&self) -> &[Extension] {
        self.element_layer().extension()
    }

    /// Extensions with the given url, in order.
    fn extensions_by_url<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a Extension> {
        self.extension().iter().filter(move |e| e.url() == url)
    }
}

pub trait BackboneElement: Element {
    fn backbone_layer(&self) -> &BackboneLayer;

    fn modifier_extension(&self) -> &[Extension] {
        self.backbone_layer().modifier_extension()
    }
}

pub trait Resource: Node {
    fn resource_layer(&self) -> &ResourceLayer;

    fn id(&self) -> Option<&str> {
        self.resource_layer().id()
    }

    fn meta(&self) -> Option<&Meta> {
        self.resource_layer().meta.as_ref()
    }

    fn implicit_rules(&self) -> Option<&Uri> {
        self.resource_layer().implicit_rules.as_ref()
    }

    fn language(&self) -> Option<&Code> {
        self.resource_layer().language.as_ref()
    }
}

pub trait DomainResource: Resource {
    fn domain_resource_layer(&self) -> &DomainResourceLayer;

    fn text(&self) -> Option<&Narrative> {
        self.domain_resource_layer().text.as_ref()
    }

    fn contained(&self) -> &[AnyResource] {
        &self.domain_resource_layer().contained
    }

    fn extension(&self) -> &[Extension] {
        &self.domain_resource_layer().extension
    }

    fn modifier_extension(&self) -> &[Extension] {
        &self.domain_resource_layer().modifier_extension
    }
}

//=============================================================================
// Capability traits on builders
//=============================================================================

pub trait ElementBuilder: Sized {
    fn element_layer_mut(&mut self) -> &mut ElementLayerBuilder;

    fn id(mut self, id: impl Into<String>) -> Self {
        self.element_layer_mut().id = Some(id.into());
        self
    }

    fn clear_id(mut self) -> Self {
        self.element_layer_mut().id = None;
        self
    }

    /// Appends one extension; a `None` item is rejected by `build()`.
    fn add_extension(mut self, extension: impl Into<Option<Extension>>) -> Self {
        self.element_layer_mut().extension.push(extension.into());
        self
    }

    fn extend_extension(mut self, extensions: impl IntoIterator<Item = Extension>) -> Self {
        self.element_layer_mut()
            .extension
            .extend(extensions.into_iter().map(Some));
        self
    }

    /// Replaces the accumulated extensions.
    fn extension(mut self, extensions: impl IntoIterator<Item = Extension>) -> Self {
        self.element_layer_mut().extension = extensions.into_iter().map(Some).collect();
        self
    }
}

pub trait BackboneElementBuilder: ElementBuilder {
    fn backbone_layer_mut(&mut self) -> &mut BackboneLayerBuilder;

    fn add_modifier_extension(mut self, extension: impl Into<Option<Extension>>) -> Self {
        self.backbone_layer_mut().modifier_extension.push(extension.into());
        self
    }

    fn extend_modifier_extension(mut self, extensions: impl IntoIterator<Item = Extension>) -> Self {
        self.backbone_layer_mut()
            .modifier_extension
            .extend(extensions.into_iter().map(Some));
        self
    }

    fn modifier_extension(mut self, extensions: impl IntoIterator<Item = Extension>) -> Self {
        self.backbone_layer_mut().modifier_extension = extensions.into_iter().map(Some).collect();
        self
    }
}

pub trait ResourceBuilder: Sized {
    fn resource_layer_mut(&mut self) -> &mut ResourceLayerBuilder;

    fn id(mut self, id: impl Into<String>) -> Self {
        self.resource_layer_mut().id = Some(id.into());
        self
    }

    fn clear_id(mut self) -> Self {
        self.resource_layer_mut().id = None;
        self
    }

    fn meta(mut self, meta: impl Into<Option<Meta>>) -> Self {
        self.resource_layer_mut().meta = meta.into();
        self
    }

    fn implicit_rules(mut self, implicit_rules: impl Into<Option<Uri>>) -> Self {
        self.resource_layer_mut().implicit_rules = implicit_rules.into();
        self
    }

    fn language(mut self, language: impl Into<Option<Code>>) -> Self {
        self.resource_layer_mut().language = language.into();
        self
    }
}

pub trait DomainResourceBuilder: ResourceBuilder {
    fn domain_resource_layer_mut(&mut self) -> &mut DomainResourceLayerBuilder;

    fn text(mut self, text: impl Into<Option<Narrative>>) -> Self {
        self.domain_resource_layer_mut().text = text.into();
        self
    }

    fn add_contained(mut self, resource: impl Into<Option<AnyResource>>) -> Self {
        self.domain_resource_layer_mut().contained.push(resource.into());
        self
    }

    fn extend_contained(mut self, resources: impl IntoIterator<Item = AnyResource>) -> Self {
        self.domain_resource_layer_mut()
            .contained
            .extend(resources.into_iter().map(Some));
        self
    }

    fn contained(mut self, resources: impl IntoIterator<Item = AnyResource>) -> Self {
        self.domain_resource_layer_mut().contained = resources.into_iter().map(Some).collect();
        self
    }

    fn add_extension(mut self, extension: impl Into<Option<Extension>>) -> Self {
        self.domain_resource_layer_mut().extension.push(extension.into());
        self
    }

    fn extend_extension(mut self, extensions: impl IntoIterator<Item = Extension>) -> Self {
        self.domain_resource_layer_mut()
            .extension
            .extend(extensions.into_iter().map(Some));
        self
    }

    fn extension(mut self, extensions: impl IntoIterator<Item = Extension>) -> Self {
        self.domain_resource_layer_mut().extension = extensions.into_iter().map(Some).collect();
        self
    }

    fn add_modifier_extension(mut self, extension: impl Into<Option<Extension>>) -> Self {
        self.domain_resource_layer_mut().modifier_extension.push(extension.into());
        self
    }

    fn extend_modifier_extension(mut self, extensions: impl IntoIterator<Item = Extension>) -> Self {
        self.domain_resource_layer_mut()
            .modifier_extension
            .extend(extensions.into_iter().map(Some));
        self
    }

    fn modifier_extension(mut self, extensions: impl IntoIterator<Item = Extension>) -> Self {
        self.domain_resource_layer_mut().modifier_extension =
            extensions.into_iter().map(Some).collect();
        self
    }
}
