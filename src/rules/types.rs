//! core types for the rule system

use std::fmt;

use serde::Serialize;

/// classification a condition filters on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PropertyKind {
    /// symbolic built-in category
    Category,
    /// family name of the element's type
    FamilyName,
    /// type name
    TypeName,
    /// workset name, resolved through the workset table
    Workset,
    /// element name
    Name,
    /// current value of a named attribute, as text
    Parameter(String),
    /// unrecognized token; evaluates as a no-op
    Unknown(String),
}

impl PropertyKind {
    /// parse a property token (case-insensitive, spaces and underscores ignored)
    pub fn parse(token: &str) -> Self {
        let trimmed = token.trim();

        if let Some((prefix, name)) = trimmed.split_once(':') {
            let prefix = normalize(prefix);
            if (prefix == "parameter" || prefix == "param") && !name.trim().is_empty() {
                return PropertyKind::Parameter(name.trim().to_string());
            }
        }

        match normalize(trimmed).as_str() {
            "category" | "cat" => PropertyKind::Category,
            "familyname" | "family" => PropertyKind::FamilyName,
            "typename" | "type" => PropertyKind::TypeName,
            "workset" | "worksetname" => PropertyKind::Workset,
            "name" | "elementname" => PropertyKind::Name,
            _ => PropertyKind::Unknown(trimmed.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, PropertyKind::Unknown(_))
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Category => write!(f, "Category"),
            PropertyKind::FamilyName => write!(f, "FamilyName"),
            PropertyKind::TypeName => write!(f, "TypeName"),
            PropertyKind::Workset => write!(f, "Workset"),
            PropertyKind::Name => write!(f, "Name"),
            PropertyKind::Parameter(name) => write!(f, "Parameter:{}", name),
            PropertyKind::Unknown(token) => write!(f, "{}", token),
        }
    }
}

/// comparison operators supported in conditions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Comparator {
    /// Equals, Equal, =, ==
    Equals,
    /// NotEqual, NotEquals, !=, <>
    NotEqual,
    /// Contains
    Contains,
    /// NotContains, DoesNotContain
    NotContains,
    /// Exists, with a "true"/"false" value
    Exists,
    /// unrecognized token; evaluates as a no-op
    Unknown(String),
}

impl Comparator {
    /// parse a comparator token (case-insensitive)
    pub fn parse(token: &str) -> Self {
        let trimmed = token.trim();
        match normalize(trimmed).as_str() {
            "equals" | "equal" | "eq" | "=" | "==" => Comparator::Equals,
            "notequal" | "notequals" | "ne" | "!=" | "<>" => Comparator::NotEqual,
            "contains" => Comparator::Contains,
            "notcontains" | "doesnotcontain" => Comparator::NotContains,
            "exists" | "exist" => Comparator::Exists,
            _ => Comparator::Unknown(trimmed.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Comparator::Unknown(_))
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::Equals => write!(f, "Equals"),
            Comparator::NotEqual => write!(f, "NotEqual"),
            Comparator::Contains => write!(f, "Contains"),
            Comparator::NotContains => write!(f, "NotContains"),
            Comparator::Exists => write!(f, "Exists"),
            Comparator::Unknown(token) => write!(f, "{}", token),
        }
    }
}

fn normalize(token: &str) -> String {
    token
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// one (property, comparator, value) filter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Condition {
    pub property: PropertyKind,
    pub comparator: Comparator,
    /// always text; `Exists` reads it as a "true"/"false" literal
    pub value: String,
}

impl Condition {
    pub fn new(property: PropertyKind, comparator: Comparator, value: impl Into<String>) -> Self {
        Self {
            property,
            comparator,
            value: value.into(),
        }
    }

    /// build a condition from raw table cells
    pub fn parse(property: &str, comparator: &str, value: &str) -> Self {
        Self::new(
            PropertyKind::parse(property),
            Comparator::parse(comparator),
            value.trim(),
        )
    }

    /// first unrecognized token, if any
    pub fn unknown_token(&self) -> Option<&str> {
        match (&self.property, &self.comparator) {
            (PropertyKind::Unknown(token), _) => Some(token),
            (_, Comparator::Unknown(token)) => Some(token),
            _ => None,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} \"{}\"", self.property, self.comparator, self.value)
    }
}

/// a compiled rule: all conditions ANDed, one attribute write
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleDefinition {
    /// rule group key (flat form) or `attribute=value` (wide form)
    pub label: String,
    pub target_attribute: String,
    pub target_value: String,
    pub conditions: Vec<Condition>,
}

impl RuleDefinition {
    pub fn new(
        label: impl Into<String>,
        target_attribute: impl Into<String>,
        target_value: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            target_attribute: target_attribute.into(),
            target_value: target_value.into(),
            conditions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// true when the rule targets the given attribute/value pair
    pub fn targets(&self, attribute: &str, value: &str) -> bool {
        self.target_attribute == attribute && self.target_value == value
    }

    /// no conditions = every element in the population matches
    pub fn is_unconditional(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl fmt::Display for RuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} = \"{}\" when ",
            self.label, self.target_attribute, self.target_value
        )?;
        if self.conditions.is_empty() {
            return write!(f, "always");
        }
        for (i, c) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, " and ")?;
            }
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}
