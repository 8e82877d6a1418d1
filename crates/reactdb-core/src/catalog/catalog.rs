//! Compiled catalog.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::association::{AssociationResolver, LinkRelation, LINK_KEY};
use super::metadata::{shadow_key, PrimaryKeysMap, SelectMetaData};
use super::registry::SchemaRegistry;
use super::schema::SchemaDefinition;
use super::types::{AssociationKind, RdbType};
use crate::error::{QueryError, SchemaError};

/// Immutable, validated schema metadata for one database.
#[derive(Debug, Clone)]
pub struct Catalog {
    name: String,
    /// Table names in registration order.
    order: Vec<String>,
    tables: HashMap<String, SelectMetaData>,
    primary_keys: PrimaryKeysMap,
    links: BTreeMap<String, LinkRelation>,
}

impl Catalog {
    /// Validate every registered schema and resolve its associations.
    ///
    /// Each schema is checked for alias conflicts, then association kinds,
    /// then row types. Association targets are resolved once every schema
    /// has passed. No partial catalog is ever returned.
    pub fn compile(name: impl Into<String>, registry: SchemaRegistry) -> Result<Self, SchemaError> {
        let name = name.into();
        let schemas = registry.into_schemas();

        let mut seen = HashSet::new();
        let mut kinds: Vec<Vec<AssociationKind>> = Vec::with_capacity(schemas.len());
        let mut types: Vec<BTreeMap<String, RdbType>> = Vec::with_capacity(schemas.len());

        for schema in &schemas {
            if !seen.insert(schema.table.as_str()) {
                return Err(SchemaError::DuplicateTable(schema.table.clone()));
            }
            check_aliases(schema)?;
            kinds.push(parse_kinds(schema)?);
            types.push(parse_types(schema)?);

            if schema.get_field(&schema.primary_key).is_none() {
                return Err(SchemaError::MissingPrimaryKey {
                    field: schema.primary_key.clone(),
                    table: schema.table.clone(),
                });
            }
        }

        let primary_keys: PrimaryKeysMap = schemas
            .iter()
            .map(|s| (s.table.clone(), s.primary_key.clone()))
            .collect();

        let mut tables = HashMap::with_capacity(schemas.len());
        let mut order = Vec::with_capacity(schemas.len());
        let mut links = BTreeMap::new();

        for ((schema, kinds), fields) in schemas.iter().zip(kinds).zip(types) {
            let mut virtual_meta = BTreeMap::new();
            for (spec, kind) in schema.virtuals.iter().zip(kinds) {
                if !primary_keys.contains_key(&spec.target) {
                    return Err(SchemaError::UnresolvedAssociation {
                        field: spec.name.clone(),
                        table: schema.table.clone(),
                        target: spec.target.clone(),
                    });
                }
                if kind == AssociationKind::ManyToMany && spec.local_key.is_some() {
                    return Err(SchemaError::LinkedLocalKey {
                        field: spec.name.clone(),
                        table: schema.table.clone(),
                    });
                }
                let descriptor =
                    AssociationResolver::resolve(&schema.table, &schema.primary_key, kind, spec);
                if let Some(link) = descriptor.link() {
                    links.entry(link.name.clone()).or_insert_with(|| link.clone());
                }
                virtual_meta.insert(spec.name.clone(), descriptor);
            }

            order.push(schema.table.clone());
            tables.insert(
                schema.table.clone(),
                SelectMetaData {
                    table: schema.table.clone(),
                    primary_key: schema.primary_key.clone(),
                    fields,
                    virtual_meta,
                },
            );
        }

        if let Some(link) = links.keys().find(|l| primary_keys.contains_key(*l)) {
            return Err(SchemaError::DuplicateTable(link.clone()));
        }

        tracing::debug!(
            catalog = %name,
            tables = order.len(),
            links = links.len(),
            "catalog compiled"
        );

        Ok(Self {
            name,
            order,
            tables,
            primary_keys,
            links,
        })
    }

    /// Catalog name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metadata for a table.
    pub fn table(&self, table: &str) -> Option<&SelectMetaData> {
        self.tables.get(table)
    }

    /// Metadata for a table, failing if it was never compiled.
    pub fn require(&self, table: &str) -> Result<&SelectMetaData, QueryError> {
        self.table(table)
            .ok_or_else(|| QueryError::NonExistentTable(table.to_string()))
    }

    /// Primary-key field of a table.
    pub fn primary_key(&self, table: &str) -> Option<&str> {
        self.primary_keys.get(table).map(String::as_str)
    }

    /// Primary keys of every declared table.
    pub fn primary_keys(&self) -> &PrimaryKeysMap {
        &self.primary_keys
    }

    /// Declared table names, in registration order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Derived many-to-many link relations.
    pub fn link_relations(&self) -> impl Iterator<Item = &LinkRelation> {
        self.links.values()
    }

    /// Every relation the store must hold, as `(name, primary key)`.
    pub fn store_layout(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|t| self.primary_keys.get(t).map(|pk| (t.clone(), pk.clone())))
            .chain(
                self.links
                    .keys()
                    .map(|name| (name.clone(), LINK_KEY.to_string())),
            )
            .collect()
    }
}

/// Every declared name, and the shadow key of every hidden field, must be
/// unique within the schema.
fn check_aliases(schema: &SchemaDefinition) -> Result<(), SchemaError> {
    let shadows = schema
        .fields
        .iter()
        .filter(|field| {
            field
                .type_tag
                .parse::<RdbType>()
                .map_or(false, |ty| ty.is_hidden())
        })
        .map(|field| shadow_key(&field.name));

    let mut names = HashSet::new();
    for name in schema
        .declared_names()
        .into_iter()
        .map(str::to_string)
        .chain(shadows)
    {
        if names.contains(&name) {
            return Err(SchemaError::AliasConflict {
                field: name,
                table: schema.table.clone(),
            });
        }
        names.insert(name);
    }
    Ok(())
}

fn parse_kinds(schema: &SchemaDefinition) -> Result<Vec<AssociationKind>, SchemaError> {
    schema
        .virtuals
        .iter()
        .map(|spec| {
            spec.kind_tag
                .parse()
                .map_err(|_| SchemaError::UnexpectedAssociation {
                    kind: spec.kind_tag.clone(),
                    field: spec.name.clone(),
                    table: schema.table.clone(),
                })
        })
        .collect()
}

fn parse_types(schema: &SchemaDefinition) -> Result<BTreeMap<String, RdbType>, SchemaError> {
    schema
        .fields
        .iter()
        .map(|field| {
            field
                .type_tag
                .parse()
                .map(|ty| (field.name.clone(), ty))
                .map_err(|_| SchemaError::InvalidRowType {
                    ty: field.type_tag.clone(),
                    field: field.name.clone(),
                    table: schema.table.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Cardinality, FieldSpec, VirtualFieldSpec};

    fn task() -> SchemaDefinition {
        SchemaDefinition::new("Task", "_id")
            .with_field(FieldSpec::typed("_id", RdbType::String))
            .with_field(FieldSpec::typed("content", RdbType::String))
            .with_field(FieldSpec::typed("_projectId", RdbType::String))
            .with_field(FieldSpec::typed("created", RdbType::DateTime))
            .with_virtual(
                VirtualFieldSpec::one_to_one("project", "Project").with_local_key("_projectId"),
            )
            .with_virtual(VirtualFieldSpec::many_to_many("tags", "Tag"))
    }

    fn project() -> SchemaDefinition {
        SchemaDefinition::new("Project", "_id")
            .with_field(FieldSpec::typed("_id", RdbType::String))
            .with_field(FieldSpec::typed("name", RdbType::String))
    }

    fn tag() -> SchemaDefinition {
        SchemaDefinition::new("Tag", "_id").with_field(FieldSpec::typed("_id", RdbType::String))
    }

    fn compile(schemas: Vec<SchemaDefinition>) -> Result<Catalog, SchemaError> {
        schemas
            .into_iter()
            .fold(SchemaRegistry::new(), SchemaRegistry::with_schema)
            .compile()
    }

    #[test]
    fn test_compile_builds_metadata() {
        let catalog = compile(vec![task(), project(), tag()]).unwrap();

        assert_eq!(catalog.name(), "reactdb");
        assert_eq!(
            catalog.table_names().collect::<Vec<_>>(),
            vec!["Task", "Project", "Tag"]
        );
        assert_eq!(catalog.primary_key("Task"), Some("_id"));

        let meta = catalog.table("Task").unwrap();
        assert!(meta.has_field("content"));
        assert!(meta.has_virtual("project"));
        assert!(meta.is_hidden("created"));

        let project = meta.virtual_field("project").unwrap();
        assert_eq!(project.cardinality(), Cardinality::Single);
        assert_eq!(project.local_key(), "_projectId");

        let links: Vec<_> = catalog.link_relations().map(|l| l.name.clone()).collect();
        assert_eq!(links, vec!["Tag@Task"]);
        assert!(catalog
            .store_layout()
            .contains(&("Tag@Task".to_string(), LINK_KEY.to_string())));
    }

    #[test]
    fn test_alias_conflict() {
        let schema = SchemaDefinition::new("Test", "id")
            .with_field(FieldSpec::typed("id", RdbType::String))
            .with_virtual(VirtualFieldSpec::one_to_one("id", "Test"));

        assert_eq!(
            compile(vec![schema]).unwrap_err(),
            SchemaError::AliasConflict {
                field: "id".into(),
                table: "Test".into()
            }
        );
    }

    #[test]
    fn test_shadow_key_conflicts_with_declared_field() {
        let schema = SchemaDefinition::new("Event", "_id")
            .with_field(FieldSpec::typed("_id", RdbType::String))
            .with_field(FieldSpec::typed("at", RdbType::DateTime))
            .with_field(FieldSpec::typed("__hidden__at", RdbType::String));

        assert_eq!(
            compile(vec![schema]).unwrap_err(),
            SchemaError::AliasConflict {
                field: "__hidden__at".into(),
                table: "Event".into()
            }
        );
    }

    #[test]
    fn test_many_to_many_rejects_local_key() {
        let owner = SchemaDefinition::new("A", "id")
            .with_field(FieldSpec::typed("id", RdbType::String))
            .with_field(FieldSpec::typed("code", RdbType::String))
            .with_virtual(VirtualFieldSpec::many_to_many("bs", "B").with_local_key("code"));
        let target =
            SchemaDefinition::new("B", "id").with_field(FieldSpec::typed("id", RdbType::String));

        assert_eq!(
            compile(vec![owner, target]).unwrap_err(),
            SchemaError::LinkedLocalKey {
                field: "bs".into(),
                table: "A".into()
            }
        );
    }

    #[test]
    fn test_alias_conflict_checked_before_kinds_and_types() {
        let schema = SchemaDefinition::new("Test", "id")
            .with_field(FieldSpec::new("id", "float128"))
            .with_field(FieldSpec::new("id", "string"))
            .with_virtual(VirtualFieldSpec::new("other", "manyToOne", "Test"));

        assert!(matches!(
            compile(vec![schema]),
            Err(SchemaError::AliasConflict { .. })
        ));
    }

    #[test]
    fn test_unexpected_association_before_row_type() {
        let schema = SchemaDefinition::new("Test", "id")
            .with_field(FieldSpec::new("id", "float128"))
            .with_virtual(VirtualFieldSpec::new("other", "manyToOne", "Test"));

        assert_eq!(
            compile(vec![schema]).unwrap_err(),
            SchemaError::UnexpectedAssociation {
                kind: "manyToOne".into(),
                field: "other".into(),
                table: "Test".into()
            }
        );
    }

    #[test]
    fn test_invalid_row_type() {
        let schema = SchemaDefinition::new("Test", "id")
            .with_field(FieldSpec::typed("id", RdbType::String))
            .with_field(FieldSpec::new("price", "float128"));

        assert_eq!(
            compile(vec![schema]).unwrap_err(),
            SchemaError::InvalidRowType {
                ty: "float128".into(),
                field: "price".into(),
                table: "Test".into()
            }
        );
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(
            compile(vec![project(), project()]).unwrap_err(),
            SchemaError::DuplicateTable("Project".into())
        );

        assert!(matches!(
            compile(vec![task(), project()]),
            Err(SchemaError::UnresolvedAssociation { target, .. }) if target == "Tag"
        ));

        let keyless = SchemaDefinition::new("Keyless", "id")
            .with_field(FieldSpec::typed("name", RdbType::String));
        assert!(matches!(
            compile(vec![keyless]),
            Err(SchemaError::MissingPrimaryKey { field, .. }) if field == "id"
        ));
    }

    #[test]
    fn test_require_unknown_table() {
        let catalog = compile(vec![project()]).unwrap();
        assert_eq!(
            catalog.require("NON_EXISTENT_FOO_TABLE").unwrap_err(),
            QueryError::NonExistentTable("NON_EXISTENT_FOO_TABLE".into())
        );
    }
}
