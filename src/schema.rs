use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;

use crate::store::RecordStore;

/// Floor width for text columns; numeric columns always get their full width.
const TEXT_MIN_WIDTH: u16 = 5;

/// Closed set of column types the UI knows how to render and edit.
/// Anything else in the schema is a fatal configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Real,
}

impl FieldType {
    /// Classify a declared SQL column type.
    pub fn from_declared(declared: &str) -> Result<Self> {
        match declared.trim().to_ascii_uppercase().as_str() {
            "TEXT" => Ok(Self::Text),
            "INTEGER" | "INT" => Ok(Self::Integer),
            "REAL" => Ok(Self::Real),
            other => Err(eyre!("unsupported column type '{}'", other)),
        }
    }

    /// Check that `text` survives coercion to this type losslessly.
    ///
    /// Integer fields must round-trip through integer parsing; the error
    /// carries the value that will actually be stored so it can be shown as
    /// a warning. Text never fails, and real coercion is silent by design.
    pub fn check(&self, text: &str) -> std::result::Result<(), CoercionError> {
        match self {
            Self::Integer => {
                if text.is_empty() {
                    return Ok(());
                }
                let coerced = integer_prefix(text);
                if coerced.to_string() == text {
                    Ok(())
                } else {
                    Err(CoercionError {
                        ftype: *self,
                        stored: coerced.to_string(),
                    })
                }
            }
            Self::Text | Self::Real => Ok(()),
        }
    }
}

/// Field text that will not survive numeric coercion unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionError {
    pub ftype: FieldType,
    /// The value as it will actually be persisted.
    pub stored: String,
}

/// Parse the leading integer prefix of `text` (optional sign, then digits),
/// ignoring everything after the first non-digit. Empty or non-numeric
/// input yields 0, matching what the store will write.
pub fn integer_prefix(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let mut chars = trimmed.chars();
    let mut digits = String::new();
    let mut rest = trimmed;
    if let Some(c) = chars.next() {
        if c == '-' || c == '+' {
            if c == '-' {
                digits.push(c);
            }
            rest = chars.as_str();
        }
    }
    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            break;
        }
    }
    digits.parse().unwrap_or(0)
}

/// Parse the leading real-number prefix of `text`. Same prefix semantics as
/// [`integer_prefix`], with at most one decimal point.
pub fn real_prefix(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let mut prefix = String::new();
    let mut seen_dot = false;
    for (i, c) in trimmed.char_indices() {
        if c.is_ascii_digit() {
            prefix.push(c);
        } else if c == '.' && !seen_dot {
            seen_dot = true;
            prefix.push(c);
        } else if (c == '-' || c == '+') && i == 0 {
            prefix.push(c);
        } else {
            break;
        }
    }
    prefix.parse().unwrap_or(0.0)
}

/// Descriptor for one editable, displayable column of the target table.
///
/// The field set is built once at startup and is structurally immutable for
/// the session; only `value` (while editing) and `width` (every layout
/// pass) change afterwards.
#[derive(Debug, Clone)]
pub struct Field {
    /// Column name, unique, in schema order.
    pub name: String,
    /// Human-readable label; label-table override or capitalized name.
    pub description: String,
    pub ftype: FieldType,
    /// Whether the schema permits an absent value.
    pub optional: bool,
    /// In-progress text while the field is being edited.
    pub value: String,
    /// Rendered length of the longest existing value, computed at startup.
    pub longest: u16,
    pub minwidth: u16,
    pub maxwidth: u16,
    /// Render width for the current pass; 0 means dropped from this pass.
    pub width: u16,
}

impl Field {
    pub fn new(
        name: String,
        description: String,
        ftype: FieldType,
        optional: bool,
        longest: u16,
    ) -> Self {
        let minwidth = match ftype {
            // Numeric values are misleading when clipped, so their floor is
            // their full rendered width.
            FieldType::Integer | FieldType::Real => longest.max(1),
            FieldType::Text => TEXT_MIN_WIDTH,
        };
        let maxwidth = longest
            .max(description.chars().count() as u16)
            .max(minwidth);
        Self {
            name,
            description,
            ftype,
            optional,
            value: String::new(),
            longest,
            minwidth,
            maxwidth,
            width: 0,
        }
    }
}

/// Build the ordered field set from the store's schema.
///
/// The row-identifier column is excluded; every remaining column must carry
/// one of the supported types or introspection fails.
pub fn introspect(store: &RecordStore) -> Result<Vec<Field>> {
    let mut fields = Vec::new();
    for column in store.introspect_schema()? {
        if column.pk {
            continue;
        }
        let ftype = FieldType::from_declared(&column.declared)
            .wrap_err_with(|| format!("column '{}'", column.name))?;
        let description = match store.lookup_label(&column.name)? {
            Some(label) => label,
            None => capitalize(&column.name),
        };
        let longest = store.max_rendered_length(&column.name, ftype)?;
        log::debug!(
            "field '{}' ({:?}) longest={} optional={}",
            column.name,
            ftype,
            longest,
            !column.notnull
        );
        fields.push(Field::new(
            column.name,
            description,
            ftype,
            !column.notnull,
            longest,
        ));
    }
    if fields.is_empty() {
        return Err(eyre!(
            "table '{}' has no editable columns",
            store.table_name()
        ));
    }
    Ok(fields)
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
