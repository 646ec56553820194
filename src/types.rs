//! The Data-Type Table: a run-scoped registry of complex SIARD types
//! (distinct, user-defined, array), keyed by `(schema, name)`.

use indexmap::IndexMap;

/// A type reference as it appears on a column or a udt attribute.
#[derive(Debug, Clone, Default)]
pub struct TypeAttribute {
    pub name: Option<String>,
    pub type_: Option<String>,
    pub type_schema: Option<String>,
    pub type_name: Option<String>,
    pub cardinality: u32,
    pub base: Option<String>,
}

/// The first-matching-rule extended category of a `TypeAttribute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedCategory {
    Simple,
    Array,
    Udt,
    Distinct,
    Unknown,
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().map(|s| !s.is_empty()).unwrap_or(false)
}

impl TypeAttribute {
    pub fn extended_category(&self) -> ExtendedCategory {
        if self.cardinality > 0 {
            ExtendedCategory::Array
        } else if non_empty(&self.type_) {
            ExtendedCategory::Simple
        } else if non_empty(&self.type_schema) || non_empty(&self.type_name) {
            ExtendedCategory::Udt
        } else if non_empty(&self.base) {
            ExtendedCategory::Distinct
        } else {
            ExtendedCategory::Unknown
        }
    }

    /// Rewrites this attribute to reference a registered complex type by
    /// `(schema, name)`, clearing the fields that made it look like
    /// something else. Used when an array is lifted out of an attribute
    /// (spec §4.D) and the enclosing attribute now points at the
    /// generated array type.
    pub fn rewrite_as_reference(&mut self, schema: &str, name: &str) {
        self.type_schema = Some(schema.to_string());
        self.type_name = Some(name.to_string());
        self.cardinality = 0;
        self.type_ = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Distinct,
    Udt,
    Array,
}

#[derive(Debug, Clone)]
pub struct TypeNode {
    pub schema: String,
    pub name: String,
    pub category: TypeCategory,
    /// Empty for distinct (the single synthetic `base` attribute lives at
    /// index 0 anyway), one synthetic attribute for arrays, one per field
    /// for udt, in declared order.
    pub attributes: Vec<TypeAttribute>,
}

impl TypeNode {
    pub fn distinct(schema: &str, name: &str, base: &str) -> Self {
        TypeNode {
            schema: schema.to_string(),
            name: name.to_string(),
            category: TypeCategory::Distinct,
            attributes: vec![TypeAttribute {
                base: Some(base.to_string()),
                ..Default::default()
            }],
        }
    }

    pub fn udt(schema: &str, name: &str, attributes: Vec<TypeAttribute>) -> Self {
        TypeNode {
            schema: schema.to_string(),
            name: name.to_string(),
            category: TypeCategory::Udt,
            attributes,
        }
    }

    pub fn array(schema: &str, name: &str, element: TypeAttribute) -> Self {
        TypeNode {
            schema: schema.to_string(),
            name: name.to_string(),
            category: TypeCategory::Array,
            attributes: vec![element],
        }
    }

    /// The single synthetic attribute carrying an array's element type and
    /// cardinality, or a distinct type's base.
    pub fn element(&self) -> &TypeAttribute {
        &self.attributes[0]
    }
}

/// A reference to an array's element type: either a simple SIARD type
/// string, or a complex type by `(schema, name)`.
pub enum ElementType<'a> {
    Simple(&'a str),
    Complex { schema: &'a str, name: &'a str },
}

#[derive(Default)]
pub struct TypeTable {
    types: IndexMap<(String, String), TypeNode>,
    insert_count: u64,
    anon_array_count: u64,
}

impl TypeTable {
    pub fn new() -> Self {
        TypeTable::default()
    }

    /// Inserts `node` under `(schema, name)`. A reinsert under the same
    /// key overwrites the previous entry but keeps its original insertion
    /// position (matching `IndexMap::insert`'s semantics).
    pub fn register(&mut self, schema: &str, name: &str, node: TypeNode) {
        self.types.insert((schema.to_string(), name.to_string()), node);
        self.insert_count += 1;
    }

    pub fn lookup(&self, schema: &str, name: &str) -> Option<&TypeNode> {
        self.types.get(&(schema.to_string(), name.to_string()))
    }

    /// Registers a new anonymous array type and returns its generated
    /// name, `ARRAY<cardinality>_<subname>_<counter>`, with `counter`
    /// global across the table.
    pub fn register_array(
        &mut self,
        schema: &str,
        subname: &str,
        element: ElementType<'_>,
        cardinality: u32,
    ) -> String {
        let generated_name = format!(
            "ARRAY{}_{}_{}",
            cardinality, subname, self.anon_array_count
        );
        self.anon_array_count += 1;

        let element_attr = match element {
            ElementType::Simple(ty) => TypeAttribute {
                type_: Some(ty.to_string()),
                cardinality,
                ..Default::default()
            },
            ElementType::Complex { schema, name } => TypeAttribute {
                type_schema: Some(schema.to_string()),
                type_name: Some(name.to_string()),
                cardinality,
                ..Default::default()
            },
        };

        let node = TypeNode::array(schema, &generated_name, element_attr);
        self.register(schema, &generated_name, node);
        generated_name
    }

    pub fn insert_count(&self) -> u64 {
        self.insert_count
    }

    pub fn anon_array_count(&self) -> u64 {
        self.anon_array_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_category_follows_first_matching_rule() {
        let array = TypeAttribute {
            cardinality: 3,
            ..Default::default()
        };
        assert_eq!(array.extended_category(), ExtendedCategory::Array);

        let simple = TypeAttribute {
            type_: Some("INTEGER".into()),
            ..Default::default()
        };
        assert_eq!(simple.extended_category(), ExtendedCategory::Simple);

        let udt = TypeAttribute {
            type_schema: Some("S".into()),
            type_name: Some("P".into()),
            ..Default::default()
        };
        assert_eq!(udt.extended_category(), ExtendedCategory::Udt);

        let distinct = TypeAttribute {
            base: Some("INTEGER".into()),
            ..Default::default()
        };
        assert_eq!(distinct.extended_category(), ExtendedCategory::Distinct);

        assert_eq!(TypeAttribute::default().extended_category(), ExtendedCategory::Unknown);
    }

    #[test]
    fn register_and_lookup_round_trip() {
        let mut table = TypeTable::new();
        table.register("S", "P", TypeNode::distinct("S", "P", "INTEGER"));
        assert!(table.lookup("S", "P").is_some());
        assert!(table.lookup("S", "Q").is_none());
    }

    #[test]
    fn register_array_generates_unique_names() {
        let mut table = TypeTable::new();
        let name1 = table.register_array("S", "x", ElementType::Simple("INTEGER"), 3);
        let name2 = table.register_array("S", "x", ElementType::Simple("INTEGER"), 2);

        assert_eq!(name1, "ARRAY3_x_0");
        assert_eq!(name2, "ARRAY2_x_1");
        assert_ne!(name1, name2);
        assert_eq!(table.lookup("S", &name1).unwrap().element().cardinality, 3);
    }

    #[test]
    fn reinsert_overwrites_existing_entry() {
        let mut table = TypeTable::new();
        table.register("S", "P", TypeNode::distinct("S", "P", "INTEGER"));
        table.register("S", "P", TypeNode::distinct("S", "P", "VARCHAR(8)"));
        assert_eq!(
            table.lookup("S", "P").unwrap().element().base.as_deref(),
            Some("VARCHAR(8)")
        );
    }
}
