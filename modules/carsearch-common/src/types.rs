use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Structured query ---

/// A free-text car search translated into search-engine parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StructuredQuery {
    /// Free-text search term. Null unless filter_by and sort_by cannot express the intent.
    #[serde(default)]
    pub query: Option<String>,
    /// Filter expression over the car fields, e.g. `make:[Honda,BMW] && year:>2014`.
    #[serde(default)]
    pub filter_by: Option<String>,
    /// Up to 3 comma-separated `field:asc` or `field:desc` pairs.
    #[serde(default)]
    pub sort_by: Option<String>,
}

impl StructuredQuery {
    /// No term, filter or sort: match everything.
    pub fn is_unconstrained(&self) -> bool {
        self.query.is_none() && self.filter_by.is_none() && self.sort_by.is_none()
    }
}

// --- Field catalog ---

/// Enumerated values of a facet field, as shown to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValues {
    pub values: Vec<String>,
    /// The field has more distinct values than were listed.
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub data_type: String,
    pub filterable: bool,
    pub sortable: bool,
    pub facet: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<EnumValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let data_type = data_type.into();
        Self {
            name: name.into(),
            sortable: is_numeric_type(&data_type),
            data_type,
            filterable: true,
            facet: false,
            enum_values: None,
            description: None,
        }
    }

    pub fn facet(mut self) -> Self {
        self.facet = true;
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_numeric(&self) -> bool {
        is_numeric_type(&self.data_type)
    }
}

/// Numeric schema types sort by default.
pub fn is_numeric_type(data_type: &str) -> bool {
    matches!(
        data_type,
        "int32" | "int64" | "float" | "int32[]" | "int64[]" | "float[]"
    )
}

/// The searchable fields of a collection, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCatalog {
    pub fields: Vec<FieldDescriptor>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }
}

// --- Cars ---

/// One record of the car dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    #[serde(default)]
    pub id: Option<String>,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(default)]
    pub engine_fuel_type: Option<String>,
    #[serde(default)]
    pub engine_hp: Option<f64>,
    #[serde(default)]
    pub engine_cylinders: Option<i32>,
    #[serde(default)]
    pub transmission_type: Option<String>,
    #[serde(default)]
    pub driven_wheels: Option<String>,
    #[serde(default)]
    pub number_of_doors: Option<i32>,
    #[serde(default)]
    pub market_category: Vec<String>,
    #[serde(default)]
    pub vehicle_size: Option<String>,
    #[serde(default)]
    pub vehicle_style: Option<String>,
    #[serde(default)]
    pub highway_mpg: Option<i32>,
    #[serde(default)]
    pub city_mpg: Option<i32>,
    #[serde(default)]
    pub popularity: Option<i32>,
    pub msrp: i32,
}

// --- Search results ---

/// Parameters actually sent to the index, after defaults were applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub q: String,
    pub filter_by: String,
    pub sort_by: String,
}

/// One page of matching cars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub found: u64,
    pub page: u32,
    pub per_page: u32,
    pub hits: Vec<Car>,
    pub next_page: Option<u32>,
}

/// `page + 1` while earlier pages have not covered `found`.
pub fn next_page(page: u32, per_page: u32, found: u64) -> Option<u32> {
    if u64::from(page) * u64::from(per_page) < found {
        Some(page + 1)
    } else {
        None
    }
}
