use std::fmt;

use carsearch_common::FieldCatalog;

use super::GrammarError;

/// The index rejects more sort fields than this.
pub const MAX_SORT_FIELDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub fields: Vec<SortField>,
}

impl SortSpec {
    pub fn validate(&self, catalog: &FieldCatalog) -> Result<(), GrammarError> {
        for sort in &self.fields {
            let field = catalog
                .field(&sort.field)
                .ok_or_else(|| GrammarError::UnknownField(sort.field.clone()))?;
            if !field.sortable {
                return Err(GrammarError::NotSortable(sort.field.clone()));
            }
        }
        Ok(())
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, sort) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", sort.field, sort.direction.as_str())?;
        }
        Ok(())
    }
}

/// Parse `field:asc,field:desc`. Direction is case-insensitive.
pub fn parse_sort(input: &str) -> Result<SortSpec, GrammarError> {
    if input.trim().is_empty() {
        return Err(GrammarError::Empty);
    }

    let mut fields = Vec::new();
    for entry in input.split(',') {
        let entry = entry.trim();
        let (field, direction) = entry
            .split_once(':')
            .ok_or_else(|| GrammarError::MalformedSort(entry.to_string()))?;
        let (field, direction) = (field.trim(), direction.trim());

        let valid_name = !field.is_empty()
            && field
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !valid_name {
            return Err(GrammarError::MalformedSort(entry.to_string()));
        }

        let direction = match direction.to_ascii_lowercase().as_str() {
            "asc" => Direction::Asc,
            "desc" => Direction::Desc,
            _ => {
                return Err(GrammarError::InvalidSortDirection {
                    field: field.to_string(),
                    direction: direction.to_string(),
                })
            }
        };

        fields.push(SortField {
            field: field.to_string(),
            direction,
        });
    }

    if fields.len() > MAX_SORT_FIELDS {
        return Err(GrammarError::TooManySortFields {
            found: fields.len(),
        });
    }

    Ok(SortSpec { fields })
}

#[cfg(test)]
mod tests {
    use super::*;
    use carsearch_common::FieldDescriptor;

    fn catalog() -> FieldCatalog {
        FieldCatalog::new(vec![
            FieldDescriptor::new("make", "string").facet(),
            FieldDescriptor::new("year", "int32"),
            FieldDescriptor::new("engine_hp", "float"),
            FieldDescriptor::new("highway_mpg", "int32"),
            FieldDescriptor::new("msrp", "int32"),
        ])
    }

    #[test]
    fn parses_and_renders_canonically() {
        let sort = parse_sort("year:DESC, engine_hp:asc").unwrap();
        assert_eq!(sort.fields.len(), 2);
        assert_eq!(sort.fields[0].direction, Direction::Desc);
        assert_eq!(sort.to_string(), "year:desc,engine_hp:asc");
        assert_eq!(parse_sort(&sort.to_string()).unwrap(), sort);
    }

    #[test]
    fn three_fields_is_the_limit() {
        assert!(parse_sort("year:desc,engine_hp:desc,msrp:asc").is_ok());
        assert_eq!(
            parse_sort("year:desc,engine_hp:desc,msrp:asc,highway_mpg:desc"),
            Err(GrammarError::TooManySortFields { found: 4 })
        );
    }

    #[test]
    fn rejects_malformed_entries() {
        assert_eq!(parse_sort(""), Err(GrammarError::Empty));
        assert_eq!(
            parse_sort("year"),
            Err(GrammarError::MalformedSort("year".into()))
        );
        assert_eq!(
            parse_sort("year:desc,"),
            Err(GrammarError::MalformedSort("".into()))
        );
        assert_eq!(
            parse_sort("year:newest"),
            Err(GrammarError::InvalidSortDirection {
                field: "year".into(),
                direction: "newest".into()
            })
        );
    }

    #[test]
    fn validate_requires_sortable_catalog_fields() {
        let catalog = catalog();
        assert_eq!(parse_sort("year:desc").unwrap().validate(&catalog), Ok(()));
        assert_eq!(
            parse_sort("make:asc").unwrap().validate(&catalog),
            Err(GrammarError::NotSortable("make".into()))
        );
        assert_eq!(
            parse_sort("color:asc").unwrap().validate(&catalog),
            Err(GrammarError::UnknownField("color".into()))
        );
    }
}
