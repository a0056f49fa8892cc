use carsearch_common::{FieldCatalog, FieldDescriptor};

use crate::grammar::MAX_SORT_FIELDS;

/// Instruction and request text for one translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const MORE_VALUES_NOTE: &str = "There are more enum values for this field";

const FILTER_SYNTAX: &str = r#"## Filtering (for the filter_by property) ##

Matching values: The syntax is {fieldName} followed by the match operator : and a string value or an array of string values separated by commas. Do not wrap values in double or single quotes. Examples:
 - model:prius
 - make:[BMW,Nissan] returns cars manufactured by BMW OR Nissan.

Numeric filters: Use :[min..max] for ranges, or the comparison operators :>, :<, :>=, :<=, :=. Examples:
 - year:[2000..2020]
 - highway_mpg:>40
 - msrp:=30000

Multiple conditions: Separate conditions with &&. Examples:
 - engine_hp:>100 && vehicle_size:[Compact,Midsize]
 - market_category:=Luxury && market_category:=Performance

OR conditions across fields: Use || only for different fields. Examples:
 - vehicle_size:Large || vehicle_style:Wagon
 - (vehicle_size:Large || vehicle_style:Wagon) && year:>2010

If the same field is filtered on several values in an || (OR) operation, use the multi-value syntax instead. For example:
`make:BMW || make:Honda || make:Ford`
must be written as:
`make:[BMW,Honda,Ford]`

Negation: Use :!= to exclude values. Examples:
 - make:!=Nissan
 - make:!=[Nissan,BMW]

If a string value contains parentheses, surround the value with backticks. For example, the value "premium unleaded (required)" is written as:
 - engine_fuel_type:`premium unleaded (required)`
 - engine_fuel_type:!=`premium unleaded (required)`"#;

const SORTING_HINTS: &str = r#"Sorting hints:
 - When the user asks for something like "good mileage", sort by highway_mpg and/or city_mpg.
 - When the user asks for something like "powerful", sort by engine_hp.
 - When the user asks for something like "latest", sort by year."#;

const OUTPUT_INSTRUCTIONS: &str = "Provide valid JSON with the correct filter and sort format. Only include properties with non-null values. Do not add extra text or explanations.";

/// Assemble the prompt for `raw_query`. Pure: the same catalog and query
/// always give the same text.
pub fn build_prompt(catalog: &FieldCatalog, raw_query: &str) -> Prompt {
    let system = format!(
        "You are assisting a user in searching for cars. Convert their query into the appropriate search query format based on the instructions below.

### Query Syntax ###

{FILTER_SYNTAX}

Only use fields marked Filter = Yes in filter_by. Enum values list the most common values of a field; prefer them when they match what the user means.

## Sorting (for the sort_by property) ##

You can sort by at most {MAX_SORT_FIELDS} fields at a time, and only by fields marked Sort = Yes. The syntax is {{fieldName}}: followed by asc (ascending) or desc (descending). When sorting by several fields, separate them with a comma. Examples:
 - msrp:desc
 - year:asc,city_mpg:desc

{SORTING_HINTS}

## Car properties ##

{table}

### Query (for the query property) ###
Include query only if both filter_by and sort_by are inadequate.

### Output Instructions ###

{OUTPUT_INSTRUCTIONS}",
        table = render_catalog_table(catalog),
    );

    Prompt {
        system,
        user: raw_query.to_string(),
    }
}

/// Markdown table of the catalog: non-facet fields first, then facet fields
/// with their enumerated values, each group in schema order.
pub fn render_catalog_table(catalog: &FieldCatalog) -> String {
    let mut lines = vec![
        "| Name | Data Type | Filter | Sort | Enum Values | Description |".to_string(),
        "|------|-----------|--------|------|-------------|-------------|".to_string(),
    ];

    let (facets, plain): (Vec<&FieldDescriptor>, Vec<&FieldDescriptor>) =
        catalog.iter().partition(|f| f.facet);

    for field in plain.into_iter().chain(facets) {
        lines.push(render_row(field));
    }

    lines.join("\n")
}

fn render_row(field: &FieldDescriptor) -> String {
    let enums = match &field.enum_values {
        Some(e) if !e.values.is_empty() => e.values.join(", "),
        _ => "N/A".to_string(),
    };

    let mut description = field.description.clone().unwrap_or_default();
    if field.enum_values.as_ref().is_some_and(|e| e.has_more) {
        if !description.is_empty() {
            description.push(' ');
        }
        description.push_str(MORE_VALUES_NOTE);
    }

    format!(
        "| {} | {} | {} | {} | {} | {} |",
        field.name,
        field.data_type,
        yes_no(field.filterable),
        yes_no(field.sortable),
        enums,
        description,
    )
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}
