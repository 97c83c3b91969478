use serde::ser::{Serialize, SerializeMap, Serializer};

/// One source row: an ordered mapping of header name to raw string value.
///
/// Field order follows the CSV header and is preserved through JSON
/// serialization. Values are kept verbatim; no numeric or boolean typing is
/// inferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Pairs a data row with the header names.
    ///
    /// A short row yields empty strings for the missing trailing fields; an
    /// over-long row drops the values beyond the header width.
    pub fn from_row(header: &[String], row: &csv::StringRecord) -> Self {
        let fields = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), row.get(i).unwrap_or("").to_string()))
            .collect();
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_row_preserves_order() {
        let header = header(&["id", "value", "unit"]);
        let row = csv::StringRecord::from(vec!["1", "10", "celsius"]);
        let record = Record::from_row(&header, &row);

        let fields: Vec<_> = record.iter().collect();
        assert_eq!(
            fields,
            vec![("id", "1"), ("value", "10"), ("unit", "celsius")]
        );
        assert_eq!(record.get("value"), Some("10"));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_short_row_fills_empty_strings() {
        let header = header(&["id", "value", "unit"]);
        let row = csv::StringRecord::from(vec!["1"]);
        let record = Record::from_row(&header, &row);

        assert_eq!(record.len(), 3);
        assert_eq!(record.get("value"), Some(""));
        assert_eq!(record.get("unit"), Some(""));
    }

    #[test]
    fn test_long_row_drops_extras() {
        let header = header(&["id", "value"]);
        let row = csv::StringRecord::from(vec!["1", "10", "surplus"]);
        let record = Record::from_row(&header, &row);

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("id"), Some("1"));
        assert_eq!(record.get("value"), Some("10"));
    }

    #[test]
    fn test_values_stay_strings() {
        let header = header(&["count", "enabled"]);
        let row = csv::StringRecord::from(vec!["42", "true"]);
        let record = Record::from_row(&header, &row);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"count":"42","enabled":"true"}"#);
    }
}
