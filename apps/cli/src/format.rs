//! Plain-text rendering helpers.

use filestore_protocol::{CustomMetadata, MetadataValue};

pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

pub(crate) fn format_metadata_value(entry: &CustomMetadata) -> String {
    match &entry.value {
        MetadataValue::StringValue(s) => s.clone(),
        MetadataValue::NumericValue(n) => n.to_string(),
        MetadataValue::StringListValue(list) => list.values.join(", "),
    }
}

/// `value` or `-` when absent.
pub(crate) fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
