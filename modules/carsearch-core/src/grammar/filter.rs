use std::fmt;

use carsearch_common::FieldCatalog;

use super::GrammarError;

type Result<T> = std::result::Result<T, GrammarError>;

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// `field:value`
    Match,
    /// `field:=value`
    Exact,
    /// `field:!=value`
    NotEqual,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparator {
    fn as_str(&self) -> &'static str {
        match self {
            Comparator::Match => "",
            Comparator::Exact => "=",
            Comparator::NotEqual => "!=",
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
        }
    }

    fn is_ordering(&self) -> bool {
        matches!(
            self,
            Comparator::Gt | Comparator::Gte | Comparator::Lt | Comparator::Lte
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    /// `min..max`, only inside a list.
    Range { min: String, max: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Single(FilterValue),
    List(Vec<FilterValue>),
}

impl Operand {
    pub fn values(&self) -> &[FilterValue] {
        match self {
            Operand::Single(v) => std::slice::from_ref(v),
            Operand::List(vs) => vs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub comparator: Comparator,
    pub operand: Operand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Condition(Condition),
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
}

impl FilterExpr {
    fn and(mut parts: Vec<FilterExpr>) -> Self {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            FilterExpr::And(parts)
        }
    }

    fn or(mut parts: Vec<FilterExpr>) -> Self {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            FilterExpr::Or(parts)
        }
    }

    /// All conditions, depth first.
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out);
        out
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        match self {
            FilterExpr::Condition(c) => out.push(c),
            FilterExpr::And(parts) | FilterExpr::Or(parts) => {
                for p in parts {
                    p.collect_conditions(out);
                }
            }
        }
    }

    /// Field names referenced, in order of first appearance.
    pub fn fields(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for c in self.conditions() {
            if !out.contains(&c.field.as_str()) {
                out.push(&c.field);
            }
        }
        out
    }

    /// True when some `||` joins two positive matches on the same field,
    /// which should have been written as `field:[a,b]`.
    pub fn has_same_field_disjunction(&self) -> bool {
        match self {
            FilterExpr::Condition(_) => false,
            FilterExpr::And(parts) => parts.iter().any(Self::has_same_field_disjunction),
            FilterExpr::Or(parts) => {
                let mut seen: Vec<(&str, Comparator)> = Vec::new();
                for p in parts {
                    if let Some(key) = mergeable_key(p) {
                        if seen.contains(&key) {
                            return true;
                        }
                        seen.push(key);
                    }
                }
                parts.iter().any(Self::has_same_field_disjunction)
            }
        }
    }

    /// Flatten nested groups of the same kind and rewrite same-field
    /// disjunctions (`make:BMW || make:Honda`) into the multi-value form
    /// (`make:[BMW,Honda]`). The result matches the same documents.
    pub fn normalize(self) -> Self {
        match self {
            FilterExpr::Condition(c) => FilterExpr::Condition(c),
            FilterExpr::And(parts) => {
                let mut flat = Vec::with_capacity(parts.len());
                for p in parts {
                    match p.normalize() {
                        FilterExpr::And(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                FilterExpr::and(flat)
            }
            FilterExpr::Or(parts) => {
                let mut flat = Vec::with_capacity(parts.len());
                for p in parts {
                    match p.normalize() {
                        FilterExpr::Or(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                FilterExpr::or(merge_same_field(flat))
            }
        }
    }

    /// Check every condition against the catalog: fields must exist and be
    /// filterable, ordering comparisons and ranges need numeric fields, and
    /// every value given for a numeric field must be a number. Ordering
    /// comparisons take a single value. Enumerated values are not enforced.
    pub fn validate(&self, catalog: &FieldCatalog) -> Result<()> {
        for c in self.conditions() {
            let field = catalog
                .field(&c.field)
                .ok_or_else(|| GrammarError::UnknownField(c.field.clone()))?;
            if !field.filterable {
                return Err(GrammarError::NotFilterable(c.field.clone()));
            }

            let has_range = c
                .operand
                .values()
                .iter()
                .any(|v| matches!(v, FilterValue::Range { .. }));

            if (c.comparator.is_ordering() || has_range) && !field.is_numeric() {
                return Err(GrammarError::NonNumericComparison(c.field.clone()));
            }

            if c.comparator.is_ordering() && matches!(c.operand, Operand::List(_)) {
                return Err(GrammarError::OrderingOnList(c.field.clone()));
            }

            if field.is_numeric() {
                for v in c.operand.values() {
                    if let FilterValue::Text(t) = v {
                        if t.parse::<f64>().is_err() {
                            return Err(GrammarError::InvalidNumber {
                                field: c.field.clone(),
                                value: t.clone(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn mergeable_key(expr: &FilterExpr) -> Option<(&str, Comparator)> {
    match expr {
        FilterExpr::Condition(c) if matches!(c.comparator, Comparator::Match | Comparator::Exact) => {
            Some((c.field.as_str(), c.comparator))
        }
        _ => None,
    }
}

fn merge_same_field(parts: Vec<FilterExpr>) -> Vec<FilterExpr> {
    let mut out: Vec<FilterExpr> = Vec::with_capacity(parts.len());

    for part in parts {
        let key = mergeable_key(&part).map(|(f, c)| (f.to_string(), c));
        let target = key.and_then(|(field, comparator)| {
            out.iter().position(|e| {
                mergeable_key(e).is_some_and(|(f, c)| f == field && c == comparator)
            })
        });

        match (target, part) {
            (Some(idx), FilterExpr::Condition(incoming)) => {
                if let FilterExpr::Condition(existing) = &mut out[idx] {
                    let mut values = existing.operand.values().to_vec();
                    for v in incoming.operand.values() {
                        if !values.contains(v) {
                            values.push(v.clone());
                        }
                    }
                    existing.operand = Operand::List(values);
                }
            }
            (_, part) => out.push(part),
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Values that would parse differently when written bare: structural
/// characters, ranges, a leading comparator, surrounding whitespace.
fn needs_backticks(value: &str) -> bool {
    value.chars().any(|c| matches!(c, '(' | ')' | '[' | ']' | ',' | '&' | '|'))
        || value.contains("..")
        || value.starts_with(['=', '!', '<', '>'])
        || value != value.trim()
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(t) if needs_backticks(t) => write!(f, "`{t}`"),
            FilterValue::Text(t) => f.write_str(t),
            FilterValue::Range { min, max } => write!(f, "{min}..{max}"),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.comparator.as_str())?;
        match &self.operand {
            Operand::Single(v) => write!(f, "{v}"),
            Operand::List(vs) => {
                f.write_str("[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (parts, sep) = match self {
            FilterExpr::Condition(c) => return write!(f, "{c}"),
            FilterExpr::And(parts) => (parts, " && "),
            FilterExpr::Or(parts) => (parts, " || "),
        };
        for (i, p) in parts.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            match p {
                FilterExpr::Condition(c) => write!(f, "{c}")?,
                nested => write!(f, "({nested})")?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a `filter_by` expression. `&&` binds tighter than `||`.
pub fn parse_filter(input: &str) -> Result<FilterExpr> {
    if input.trim().is_empty() {
        return Err(GrammarError::Empty);
    }
    let mut parser = Parser { src: input, pos: 0 };
    let expr = parser.parse_or()?;
    parser.skip_ws();
    if parser.pos < input.len() {
        let rest = parser.rest();
        if rest.starts_with(')') {
            return Err(GrammarError::UnbalancedParen(parser.pos));
        }
        return Err(GrammarError::Unexpected {
            offset: parser.pos,
            found: rest.chars().take(16).collect(),
        });
    }
    Ok(expr)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<FilterExpr> {
        let mut parts = vec![self.parse_and()?];
        while self.eat("||") {
            parts.push(self.parse_and()?);
        }
        Ok(FilterExpr::or(parts))
    }

    fn parse_and(&mut self) -> Result<FilterExpr> {
        let mut parts = vec![self.parse_primary()?];
        while self.eat("&&") {
            parts.push(self.parse_primary()?);
        }
        Ok(FilterExpr::and(parts))
    }

    fn parse_primary(&mut self) -> Result<FilterExpr> {
        self.skip_ws();
        let open = self.pos;
        if self.eat("(") {
            let inner = self.parse_or()?;
            if !self.eat(")") {
                return Err(GrammarError::UnbalancedParen(open));
            }
            return Ok(inner);
        }
        self.parse_condition().map(FilterExpr::Condition)
    }

    fn parse_condition(&mut self) -> Result<Condition> {
        self.skip_ws();
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(GrammarError::ExpectedField(start));
        }
        let field = self.src[start..start + len].to_string();
        self.pos += len;

        if !self.eat(":") {
            return Err(GrammarError::ExpectedColon(field));
        }

        let comparator = self.parse_comparator();

        let operand = if self.eat("[") {
            let mut values = Vec::new();
            loop {
                values.push(self.parse_value(&field, true)?);
                if self.eat(",") {
                    continue;
                }
                if self.eat("]") {
                    break;
                }
                return Err(GrammarError::UnterminatedList(field));
            }
            Operand::List(values)
        } else {
            Operand::Single(self.parse_value(&field, false)?)
        };

        Ok(Condition {
            field,
            comparator,
            operand,
        })
    }

    fn parse_comparator(&mut self) -> Comparator {
        const COMPARATORS: [(&str, Comparator); 6] = [
            ("!=", Comparator::NotEqual),
            (">=", Comparator::Gte),
            ("<=", Comparator::Lte),
            (">", Comparator::Gt),
            ("<", Comparator::Lt),
            ("=", Comparator::Exact),
        ];
        for (token, comparator) in COMPARATORS {
            if self.eat(token) {
                return comparator;
            }
        }
        Comparator::Match
    }

    fn parse_value(&mut self, field: &str, in_list: bool) -> Result<FilterValue> {
        self.skip_ws();

        if let Some(quoted) = self.rest().strip_prefix('`') {
            let end = quoted
                .find('`')
                .ok_or_else(|| GrammarError::UnterminatedBacktick(field.to_string()))?;
            let text = quoted[..end].to_string();
            self.pos += end + 2;
            if text.is_empty() {
                return Err(GrammarError::EmptyValue(field.to_string()));
            }
            return Ok(FilterValue::Text(text));
        }

        let rest = self.rest();
        let end = if in_list {
            rest.find([',', ']']).unwrap_or(rest.len())
        } else {
            [rest.find("&&"), rest.find("||"), rest.find(')')]
                .into_iter()
                .flatten()
                .min()
                .unwrap_or(rest.len())
        };
        let raw = rest[..end].trim();
        self.pos += end;

        if raw.is_empty() {
            return Err(GrammarError::EmptyValue(field.to_string()));
        }

        if in_list {
            if let Some((min, max)) = raw.split_once("..") {
                let (min, max) = (min.trim(), max.trim());
                if min.parse::<f64>().is_err() || max.parse::<f64>().is_err() {
                    return Err(GrammarError::InvalidRange {
                        field: field.to_string(),
                        value: raw.to_string(),
                    });
                }
                return Ok(FilterValue::Range {
                    min: min.to_string(),
                    max: max.to_string(),
                });
            }
        }

        Ok(FilterValue::Text(raw.to_string()))
    }
}
