//! Configuration pretty-printing
// (c) 2025 Ross Younger

use super::Manager;
use crate::cli::styles::use_colours;

use figment::{value::Value, Metadata};
use heck::ToUpperCamelCase;
use serde::Deserialize;
use std::fmt::{Debug, Display};
use struct_field_names_as_array::FieldNamesAsSlice;
use tabled::{
    settings::{object::Rows, style::Style, Color},
    Table, Tabled,
};

/// Data type used when rendering the config table
#[derive(Tabled)]
struct PrettyConfig {
    field: String,
    value: String,
    source: String,
}

impl PrettyConfig {
    fn render_source(meta: Option<&Metadata>) -> String {
        if let Some(m) = meta {
            m.source
                .as_ref()
                .map_or_else(|| m.name.to_string(), figment::Source::to_string)
        } else {
            String::new()
        }
    }

    fn render_value(value: &Value) -> String {
        match value {
            Value::String(_tag, s) => s.to_string(),
            Value::Char(_tag, c) => c.to_string(),
            Value::Bool(_tag, b) => b.to_string(),
            Value::Num(_tag, num) => {
                if let Some(i) = num.to_i128() {
                    i.to_string()
                } else if let Some(u) = num.to_u128() {
                    u.to_string()
                } else if let Some(ff) = num.to_f64() {
                    ff.to_string()
                } else {
                    "<number>".into()
                }
            }
            Value::Empty(_tag, _) => "<empty>".into(),
            Value::Dict(_tag, _dict) => "<table>".into(),
            Value::Array(_tag, vec) => {
                format!(
                    "[{}]",
                    vec.iter()
                        .map(PrettyConfig::render_value)
                        .collect::<Vec<_>>()
                        .join(",")
                )
            }
        }
    }

    fn new<F: Into<String>>(field: F, value: &Value, meta: Option<&Metadata>) -> Self {
        Self {
            field: field.into(),
            value: PrettyConfig::render_value(value),
            source: PrettyConfig::render_source(meta),
        }
    }
}

/// Pretty-printing type wrapper to Manager
#[derive(Debug)]
pub struct DisplayAdapter<'a> {
    /// Data source
    source: &'a Manager,
    /// The fields we want to output
    fields: Vec<&'static str>,
}

impl Manager {
    /// Creates a `DisplayAdapter` for this struct.
    ///
    /// # Returns
    /// An ephemeral structure implementing `Display`.
    #[must_use]
    pub fn to_display_adapter<'de, T>(&self) -> DisplayAdapter<'_>
    where
        T: Deserialize<'de> + FieldNamesAsSlice,
    {
        let mut fields = T::FIELD_NAMES_AS_SLICE.to_vec();
        fields.sort_unstable();
        DisplayAdapter {
            source: self,
            fields,
        }
    }
}

impl Display for DisplayAdapter<'_> {
    /// Formats the fields of the configuration with where each one came from.
    ///
    /// N.B. This function uses CLI styling.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = &self.source.data;

        let mut output = Vec::<PrettyConfig>::new();
        for field in &self.fields {
            if let Ok(value) = data.find_value(field) {
                let meta = data.get_metadata(value.tag());
                output.push(PrettyConfig::new(field.to_upper_camel_case(), &value, meta));
            }
        }
        let mut writable = Table::new(output);
        let _ = writable.with(Style::sharp());
        if use_colours() {
            let _ = writable.modify(Rows::first(), Color::FG_CYAN);
        }
        write!(f, "{writable}")
    }
}

#[cfg(test)]
mod test {
    use crate::config::{Configuration, ConfigurationOverrides, Manager};
    use assertables::assert_contains;

    #[test]
    fn display_shows_sources() {
        let mut mgr = Manager::without_files();
        mgr.merge_provider(ConfigurationOverrides {
            deadline: Some(17),
            ..Default::default()
        });
        let s = mgr.to_display_adapter::<Configuration>().to_string();
        assert_contains!(s, "Device");
        assert_contains!(s, "/dev/ttyUSB0");
        assert_contains!(s, "HandshakeAttempts");
        assert_contains!(s, "default");
        assert_contains!(s, "17");
        assert_contains!(s, "command line");
    }
}
