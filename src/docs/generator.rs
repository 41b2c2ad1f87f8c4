//! Markdown API reference rendered from the JSON schemas of the API types
//!
//! Output layout per group/version:
//!
//! ```text
//! <h2 id="core.gardener.cloud/v1beta1">core.gardener.cloud/v1beta1</h2>
//! Resource Types: <ul><li><a href="#core.gardener.cloud/v1beta1.Shoot">Shoot</a></li></ul>
//! <h3 id="core.gardener.cloud/v1beta1.Shoot">Shoot</h3>
//! <table> apiVersion, kind, metadata, spec, status </table>
//! <h3 id="core.gardener.cloud/v1beta1.ShootSpec">ShootSpec</h3>
//! ...
//! ```

use indexmap::IndexMap;
use schemars::gen::{SchemaGenerator, SchemaSettings};
use schemars::schema::{InstanceType, Schema, SchemaObject, SingleOrVec};
use schemars::JsonSchema;
use std::fmt::Write as _;
use tracing::debug;

use crate::apis::ApiKind;

const DEFINITIONS_PATH: &str = "#/definitions/";

/// Root-level row of a resource type table
struct RootField {
    name: &'static str,
    type_: String,
    description: String,
    optional: bool,
}

/// A resource type and the body types that document it
struct ResourceDoc {
    kind: &'static str,
    description: String,
    fields: Vec<RootField>,
    /// Body type whose fields sit at the root of the object
    inlined: Option<String>,
}

struct GroupVersionDoc {
    generator: SchemaGenerator,
    resources: Vec<ResourceDoc>,
}

/// Collects API kinds and renders their reference documentation
pub struct ReferenceGenerator {
    groups: IndexMap<String, GroupVersionDoc>,
}

impl Default for ReferenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceGenerator {
    pub fn new() -> Self {
        Self {
            groups: IndexMap::new(),
        }
    }

    /// A generator with every kind of this crate registered
    pub fn with_all_kinds() -> Self {
        let mut generator = Self::new();
        for kind in ApiKind::ALL {
            generator.add_kind(kind);
        }
        generator
    }

    /// Register a kind, its body types are documented with it
    pub fn add_kind(&mut self, kind: ApiKind) {
        use crate::apis::core::{v1, v1beta1};
        use crate::apis::{operations, operator, resources, security, seedmanagement, settings};

        let api_version = kind.api_version();
        let group = self
            .groups
            .entry(api_version.clone())
            .or_insert_with(|| GroupVersionDoc {
                generator: SchemaSettings::draft07().into_generator(),
                resources: Vec::new(),
            });
        let gen = &mut group.generator;

        let resource = match kind {
            ApiKind::Shoot => with_spec::<v1beta1::ShootSpec, v1beta1::ShootStatus>(gen, kind),
            ApiKind::Seed => with_spec::<v1beta1::SeedSpec, v1beta1::SeedStatus>(gen, kind),
            ApiKind::CloudProfile => with_spec::<v1beta1::CloudProfileSpec, ()>(gen, kind),
            ApiKind::ControllerRegistration => {
                with_spec::<v1beta1::ControllerRegistrationSpec, ()>(gen, kind)
            }
            ApiKind::ControllerInstallation => with_spec::<
                v1beta1::ControllerInstallationSpec,
                v1beta1::ControllerInstallationStatus,
            >(gen, kind),
            ApiKind::ControllerDeployment => top_level::<v1::ControllerDeploymentData>(gen, kind),
            ApiKind::Project => with_spec::<v1beta1::ProjectSpec, v1beta1::ProjectStatus>(gen, kind),
            ApiKind::Quota => with_spec::<v1beta1::QuotaSpec, ()>(gen, kind),
            ApiKind::SecretBinding => top_level::<v1beta1::SecretBindingData>(gen, kind),
            ApiKind::Garden => {
                with_spec::<operator::v1alpha1::GardenSpec, operator::v1alpha1::GardenStatus>(gen, kind)
            }
            ApiKind::ManagedSeed => with_spec::<
                seedmanagement::v1alpha1::ManagedSeedSpec,
                seedmanagement::v1alpha1::ManagedSeedStatus,
            >(gen, kind),
            ApiKind::ManagedSeedSet => with_spec::<
                seedmanagement::v1alpha1::ManagedSeedSetSpec,
                seedmanagement::v1alpha1::ManagedSeedSetStatus,
            >(gen, kind),
            ApiKind::Gardenlet => with_spec::<
                seedmanagement::v1alpha1::GardenletSpec,
                seedmanagement::v1alpha1::GardenletStatus,
            >(gen, kind),
            ApiKind::Bastion => with_spec::<
                operations::v1alpha1::BastionSpec,
                operations::v1alpha1::BastionStatus,
            >(gen, kind),
            ApiKind::ManagedResource => with_spec::<
                resources::v1alpha1::ManagedResourceSpec,
                resources::v1alpha1::ManagedResourceStatus,
            >(gen, kind),
            ApiKind::CredentialsBinding => {
                top_level::<security::v1alpha1::CredentialsBindingData>(gen, kind)
            }
            ApiKind::OpenIDConnectPreset => {
                with_spec::<settings::v1alpha1::OpenIDConnectPresetSpec, ()>(gen, kind)
            }
            ApiKind::ClusterOpenIDConnectPreset => {
                with_spec::<settings::v1alpha1::ClusterOpenIDConnectPresetSpec, ()>(gen, kind)
            }
        };
        debug!(%kind, "Registered kind for reference docs");
        group.resources.push(resource);
    }

    /// Render the Markdown reference of every registered group/version
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("<p>Packages:</p>\n<ul>\n");
        for api_version in self.groups.keys() {
            let _ = writeln!(out, "<li>\n<a href=\"#{0}\">{0}</a>\n</li>", api_version);
        }
        out.push_str("</ul>\n");

        for (api_version, group) in &self.groups {
            let _ = writeln!(out, "<h2 id=\"{0}\">{0}</h2>", api_version);
            out.push_str("<p>\n<p>Resource Types:</p>\n<ul>");
            for resource in &group.resources {
                let _ = write!(
                    out,
                    "<li>\n<a href=\"#{}.{}\">{}</a>\n</li>",
                    api_version, resource.kind, resource.kind
                );
            }
            out.push_str("</ul>\n");

            let definitions = group.generator.definitions();
            for resource in &group.resources {
                let body = resource
                    .inlined
                    .as_deref()
                    .and_then(|name| definitions.get(name));
                render_resource(&mut out, api_version, resource, body);
            }

            let mut names: Vec<&String> = definitions
                .keys()
                .filter(|name| !is_external(name))
                .filter(|name| !group.resources.iter().any(|r| r.inlined.as_ref() == Some(*name)))
                .collect();
            names.sort();
            for name in names {
                if let Schema::Object(schema) = &definitions[name.as_str()] {
                    render_type(&mut out, api_version, name, schema);
                }
            }
        }
        out
    }
}

fn with_spec<Spec: JsonSchema, Status: JsonSchema>(
    gen: &mut SchemaGenerator,
    kind: ApiKind,
) -> ResourceDoc {
    let spec = gen.subschema_for::<Spec>();
    let description = referenced_description(gen, &spec);
    let mut fields = root_fields(kind);
    fields.push(RootField {
        name: "spec",
        type_: type_of(kind, &spec),
        description: "Spec contains the specification of this object.".into(),
        optional: true,
    });
    // `()` marks kinds without a status subresource
    if Status::schema_name() != <()>::schema_name() {
        let status = gen.subschema_for::<Status>();
        fields.push(RootField {
            name: "status",
            type_: type_of(kind, &status),
            description: "Most recently observed status of this object.".into(),
            optional: true,
        });
    }
    ResourceDoc {
        kind: kind.kind(),
        description,
        fields,
        inlined: None,
    }
}

fn top_level<Data: JsonSchema>(gen: &mut SchemaGenerator, kind: ApiKind) -> ResourceDoc {
    let data = gen.subschema_for::<Data>();
    let description = referenced_description(gen, &data);
    ResourceDoc {
        kind: kind.kind(),
        description,
        fields: root_fields(kind),
        inlined: reference_name(&data).map(str::to_string),
    }
}

fn root_fields(kind: ApiKind) -> Vec<RootField> {
    vec![
        RootField {
            name: "apiVersion",
            type_: "string".into(),
            description: format!("<code>{}</code>", kind.api_version()),
            optional: false,
        },
        RootField {
            name: "kind",
            type_: "string".into(),
            description: format!("<code>{}</code>", kind.kind()),
            optional: false,
        },
        RootField {
            name: "metadata",
            type_: "<em>Kubernetes meta/v1.ObjectMeta</em>".into(),
            description: "Standard object metadata.".into(),
            optional: true,
        },
    ]
}

fn referenced_description(gen: &SchemaGenerator, schema: &Schema) -> String {
    reference_name(schema)
        .and_then(|name| gen.definitions().get(name))
        .and_then(|s| match s {
            Schema::Object(o) => o.metadata.as_ref()?.description.clone(),
            Schema::Bool(_) => None,
        })
        .unwrap_or_default()
}

fn type_of(kind: ApiKind, schema: &Schema) -> String {
    render_type_ref(&kind.api_version(), schema)
}

/// Type names from foreign crates carry their package path, e.g.
/// `io.k8s.apimachinery.pkg.apis.meta.v1.LabelSelector`
fn is_external(name: &str) -> bool {
    name.contains('.')
}

fn reference_name(schema: &Schema) -> Option<&str> {
    match schema {
        Schema::Object(o) => {
            if let Some(r) = &o.reference {
                return r.strip_prefix(DEFINITIONS_PATH);
            }
            // Described or optional references are wrapped in allOf/anyOf
            let subschemas = o.subschemas.as_ref()?;
            subschemas
                .all_of
                .iter()
                .chain(subschemas.any_of.iter())
                .flatten()
                .find_map(reference_name)
        }
        Schema::Bool(_) => None,
    }
}

fn single_type(o: &SchemaObject) -> Option<InstanceType> {
    match o.instance_type.as_ref()? {
        SingleOrVec::Single(t) => Some(**t),
        SingleOrVec::Vec(types) => types.iter().copied().find(|t| *t != InstanceType::Null),
    }
}

fn render_type_ref(api_version: &str, schema: &Schema) -> String {
    if let Some(name) = reference_name(schema) {
        return if is_external(name) {
            let short = name.rsplit('.').next().unwrap_or(name);
            format!("<em>Kubernetes {}</em>", short)
        } else {
            format!("<em><a href=\"#{}.{}\">{}</a></em>", api_version, name, name)
        };
    }
    let Schema::Object(o) = schema else {
        return "object".into();
    };
    match single_type(o) {
        Some(InstanceType::Array) => {
            let inner = o
                .array
                .as_ref()
                .and_then(|a| a.items.as_ref())
                .and_then(|items| match items {
                    SingleOrVec::Single(s) => Some(render_type_ref(api_version, s)),
                    SingleOrVec::Vec(v) => v.first().map(|s| render_type_ref(api_version, s)),
                })
                .unwrap_or_else(|| "object".into());
            format!("[]{}", inner)
        }
        Some(InstanceType::Object) => match o
            .object
            .as_ref()
            .and_then(|obj| obj.additional_properties.as_deref())
        {
            Some(Schema::Object(value)) => format!(
                "map[string]{}",
                render_type_ref(api_version, &Schema::Object(value.clone()))
            ),
            _ => "object".into(),
        },
        Some(InstanceType::Integer) => o.format.clone().unwrap_or_else(|| "integer".into()),
        Some(InstanceType::Number) => "number".into(),
        Some(InstanceType::Boolean) => "bool".into(),
        Some(InstanceType::String) => "string".into(),
        Some(InstanceType::Null) | None => "object".into(),
    }
}

fn render_resource(out: &mut String, api_version: &str, resource: &ResourceDoc, body: Option<&Schema>) {
    let _ = writeln!(out, "<h3 id=\"{}.{}\">{}</h3>", api_version, resource.kind, resource.kind);
    if !resource.description.is_empty() {
        let _ = writeln!(out, "<p>\n<p>{}</p>\n</p>", resource.description);
    }
    out.push_str(TABLE_HEAD);
    for field in &resource.fields {
        render_row(out, field.name, &field.type_, field.optional, &field.description);
    }
    if let Some(Schema::Object(body)) = body {
        render_properties(out, api_version, body);
    }
    out.push_str(TABLE_FOOT);
}

fn render_type(out: &mut String, api_version: &str, name: &str, schema: &SchemaObject) {
    let _ = writeln!(out, "<h3 id=\"{}.{}\">{}</h3>", api_version, name, name);
    if let Some(description) = schema.metadata.as_ref().and_then(|m| m.description.as_ref()) {
        let _ = writeln!(out, "<p>\n<p>{}</p>\n</p>", description);
    }

    let values = enum_values(schema);
    if !values.is_empty() {
        out.push_str("<p>(<code>string</code> alias)</p>\n<table>\n<thead>\n<tr>\n<th>Value</th>\n</tr>\n</thead>\n<tbody>");
        for value in values {
            let _ = write!(out, "<tr><td><p>&#34;{}&#34;</p></td></tr>", value);
        }
        out.push_str("</tbody>\n</table>\n");
        return;
    }

    if schema.object.is_some() {
        out.push_str(TABLE_HEAD);
        render_properties(out, api_version, schema);
        out.push_str(TABLE_FOOT);
    }
}

/// Values of a unit enum; documented variants are split into `oneOf` branches
fn enum_values(schema: &SchemaObject) -> Vec<String> {
    let mut values = Vec::new();
    let mut collect = |s: &SchemaObject| {
        for value in s.enum_values.iter().flatten() {
            values.push(value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()));
        }
    };
    collect(schema);
    if let Some(one_of) = schema.subschemas.as_ref().and_then(|s| s.one_of.as_ref()) {
        for branch in one_of {
            if let Schema::Object(o) = branch {
                collect(o);
            }
        }
    }
    values
}

fn render_properties(out: &mut String, api_version: &str, schema: &SchemaObject) {
    let Some(object) = &schema.object else {
        return;
    };
    for (field, subschema) in &object.properties {
        let description = match subschema {
            Schema::Object(o) => o
                .metadata
                .as_ref()
                .and_then(|m| m.description.clone())
                .unwrap_or_default(),
            Schema::Bool(_) => String::new(),
        };
        render_row(
            out,
            field,
            &render_type_ref(api_version, subschema),
            !object.required.contains(field),
            &description,
        );
    }
}

const TABLE_HEAD: &str = "<table>\n<thead>\n<tr>\n<th>Field</th>\n<th>Description</th>\n</tr>\n</thead>\n<tbody>\n";
const TABLE_FOOT: &str = "</tbody>\n</table>\n";

fn render_row(out: &mut String, name: &str, type_: &str, optional: bool, description: &str) {
    let _ = write!(out, "<tr>\n<td>\n<code>{}</code></br>\n{}\n</td>\n<td>\n", name, type_);
    if optional {
        out.push_str("<em>(Optional)</em>\n");
    }
    if !description.is_empty() {
        let _ = writeln!(out, "<p>{}</p>", description);
    }
    out.push_str("</td>\n</tr>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::lint::lint_reference;

    #[test]
    fn test_render_shoot_reference() {
        let mut generator = ReferenceGenerator::new();
        generator.add_kind(ApiKind::Shoot);
        let markdown = generator.render();

        assert!(markdown.contains("<h2 id=\"core.gardener.cloud/v1beta1\">"));
        assert!(markdown.contains("<h3 id=\"core.gardener.cloud/v1beta1.Shoot\">Shoot</h3>"));
        assert!(markdown.contains("<h3 id=\"core.gardener.cloud/v1beta1.ShootSpec\">ShootSpec</h3>"));
        assert!(markdown.contains("<a href=\"#core.gardener.cloud/v1beta1.ShootSpec\">ShootSpec</a>"));
        assert!(markdown.contains("<code>kubernetes</code>"));
    }

    #[test]
    fn test_generated_reference_passes_lint() {
        let markdown = ReferenceGenerator::with_all_kinds().render();
        let findings = lint_reference(&markdown);
        assert!(findings.is_empty(), "{:?}", findings);
    }

    #[test]
    fn test_top_level_kind_has_no_spec_row() {
        let mut generator = ReferenceGenerator::new();
        generator.add_kind(ApiKind::SecretBinding);
        let markdown = generator.render();
        let section = markdown
            .split("<h3 id=\"core.gardener.cloud/v1beta1.SecretBinding\">")
            .nth(1)
            .unwrap();
        let table = section.split("</table>").next().unwrap();
        assert!(table.contains("<code>apiVersion</code>"));
        assert!(table.contains("<code>secretRef</code>"));
        assert!(!table.contains("<code>spec</code>"));
        assert!(!markdown.contains("SecretBindingData\">"));
    }
}
