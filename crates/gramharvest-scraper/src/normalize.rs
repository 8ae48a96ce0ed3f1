//! Normalization from extracted [`PostRecord`]s to flat
//! [`NormalizedPost`] rows.
//!
//! List fields become comma-joined text and the nested location becomes
//! four scalar columns appended after every other column. The function is
//! total: any record normalizes, whatever it has populated.

use gramharvest_core::{
    FieldValue, Location, NormalizedPost, PostField, PostRecord, Scalar, LOCATION_COLUMNS,
    TIMESTAMP_FORMAT,
};

/// Separator used when joining list fields into one cell.
pub const LIST_SEPARATOR: &str = ",";

/// Normalizes every record of one harvest, preserving order.
#[must_use]
pub fn normalize_posts(records: Vec<PostRecord>) -> Vec<NormalizedPost> {
    records.into_iter().map(normalize_post).collect()
}

/// Flattens one record.
///
/// If the record's schema includes the location field, the four
/// `loc_*` columns are always present, empty when the post has no
/// location; the composite column itself never appears in the output.
#[must_use]
pub fn normalize_post(record: PostRecord) -> NormalizedPost {
    let mut row = NormalizedPost::default();
    let mut location: Option<Option<Location>> = None;

    for (field, value) in record.into_fields() {
        if field == PostField::Location {
            location = Some(match value {
                FieldValue::Location(loc) => Some(loc),
                _ => None,
            });
            continue;
        }
        row.push(field.column(), to_scalar(value));
    }

    if let Some(location) = location {
        push_location(&mut row, location);
    }
    row
}

fn to_scalar(value: FieldValue) -> Scalar {
    match value {
        FieldValue::Empty => Scalar::Empty,
        FieldValue::Text(s) => Scalar::Text(s),
        FieldValue::Integer(n) => Scalar::Integer(n),
        FieldValue::Timestamp(ts) => Scalar::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
        FieldValue::List(items) if items.is_empty() => Scalar::Empty,
        FieldValue::List(items) => Scalar::Text(items.join(LIST_SEPARATOR)),
        // Only reachable for a location value stored under another field.
        FieldValue::Location(loc) => Scalar::Text(loc.name),
    }
}

fn push_location(row: &mut NormalizedPost, location: Option<Location>) {
    let [id_col, lat_col, lng_col, name_col] = LOCATION_COLUMNS;
    match location {
        Some(loc) => {
            row.push(id_col, Scalar::Text(loc.id));
            row.push(lat_col, loc.lat.map_or(Scalar::Empty, Scalar::Float));
            row.push(lng_col, loc.lng.map_or(Scalar::Empty, Scalar::Float));
            row.push(
                name_col,
                if loc.name.is_empty() {
                    Scalar::Empty
                } else {
                    Scalar::Text(loc.name)
                },
            );
        }
        None => {
            for col in LOCATION_COLUMNS {
                row.push(col, Scalar::Empty);
            }
        }
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
