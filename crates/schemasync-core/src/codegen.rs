//! Model-definition code generation.
//!
//! Renders a [`Schema`] as Rust source: one `#[derive(Table)]` struct per
//! table, with `#[column(...)]` attributes carrying everything the field type
//! cannot express.

use crate::schema::{Column, LogicalType, Schema, Table};

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where", "while",
    "abstract", "become", "box", "do", "final", "gen", "macro", "override", "priv", "try",
    "typeof", "unsized", "virtual", "yield",
];

/// Generates Rust model definitions for every table, in table name order.
#[must_use]
pub fn generate_model_code(schema: &Schema) -> String {
    schema
        .tables()
        .map(render_table)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_table(table: &Table) -> String {
    let mut out = String::new();
    out.push_str("#[derive(Debug, Clone, Table)]\n");
    out.push_str(&format!("#[table(name = \"{}\")]\n", escape_str(&table.name)));
    out.push_str(&format!("pub struct {} {{\n", struct_name(&table.name)));
    for column in &table.columns {
        let attrs = column_attributes(column);
        if !attrs.is_empty() {
            out.push_str(&format!("    #[column({})]\n", attrs.join(", ")));
        }
        out.push_str(&format!(
            "    pub {}: {},\n",
            field_name(&column.name),
            field_type(column)
        ));
    }
    out.push_str("}\n");
    out
}

fn column_attributes(column: &Column) -> Vec<String> {
    let mut attrs = Vec::new();
    if field_name(&column.name).trim_start_matches("r#") != column.name {
        attrs.push(format!("name = \"{}\"", escape_str(&column.name)));
    }
    if column.primary_key {
        attrs.push("primary_key".to_string());
    }
    if column.auto_increment {
        attrs.push("autoincrement".to_string());
    }
    if column.nullable {
        attrs.push("nullable".to_string());
    }
    if let LogicalType::Other(_) = column.logical_type {
        if let Some(ref engine_type) = column.engine_type {
            attrs.push(format!("sql_type = \"{}\"", escape_str(engine_type)));
        }
    }
    if let Some(size) = column.size {
        attrs.push(format!("size = {size}"));
    }
    if let Some(ref default) = column.default {
        attrs.push(format!("default = \"{}\"", escape_str(default)));
    }
    if let Some(ref index) = column.index {
        let key = if index.unique { "unique_index" } else { "index" };
        attrs.push(format!("{key} = \"{}\"", escape_str(&index.name)));
    }
    if let Some(ref comment) = column.comment {
        attrs.push(format!("comment = \"{}\"", escape_str(comment)));
    }
    if let Some(ref extra) = column.extra {
        attrs.push(format!("extra = \"{}\"", escape_str(extra)));
    }
    attrs
}

fn field_type(column: &Column) -> String {
    let base = match column.logical_type {
        LogicalType::Int8 => "i8",
        LogicalType::Int16 => "i16",
        LogicalType::Int32 => "i32",
        LogicalType::Int64 => "i64",
        LogicalType::UInt8 => "u8",
        LogicalType::UInt16 => "u16",
        LogicalType::UInt32 => "u32",
        LogicalType::UInt64 => "u64",
        LogicalType::Bool => "bool",
        LogicalType::Float32 => "f32",
        LogicalType::Float64 => "f64",
        LogicalType::String | LogicalType::Other(_) => "String",
        LogicalType::Binary => "Vec<u8>",
        LogicalType::Timestamp => "chrono::NaiveDateTime",
    };
    if column.nullable {
        format!("Option<{base}>")
    } else {
        base.to_string()
    }
}

/// `order_items` becomes `OrderItems`.
fn struct_name(table: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = true;
    for ch in table.chars() {
        if ch.is_ascii_alphanumeric() {
            if capitalize_next {
                result.push(ch.to_ascii_uppercase());
                capitalize_next = false;
            } else {
                result.push(ch);
            }
        } else {
            capitalize_next = true;
        }
    }
    if result.is_empty() || result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, 'T');
    }
    result
}

/// `UserID` becomes `user_id`; keywords get a raw prefix.
fn field_name(column: &str) -> String {
    let mut result = String::new();
    let mut prev_lower = false;
    for ch in column.chars() {
        if ch.is_ascii_alphanumeric() {
            if ch.is_ascii_uppercase() && prev_lower {
                result.push('_');
            }
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            result.push(ch.to_ascii_lowercase());
        } else {
            if !result.ends_with('_') {
                result.push('_');
            }
            prev_lower = false;
        }
    }
    if result.is_empty() || result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    if KEYWORDS.contains(&result.as_str()) {
        result.insert_str(0, "r#");
    }
    result
}

fn escape_str(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
