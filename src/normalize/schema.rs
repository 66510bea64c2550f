use std::collections::HashMap;

/// The ten output columns, in output order.
pub const CANONICAL_HEADERS: [&str; 10] = [
    "Created Date",
    "Closed Date",
    "Complaint Type",
    "Descriptor",
    "Borough",
    "Incident Zip",
    "Status",
    "Resolution Description",
    "Latitude",
    "Longitude",
];

/// Column lookup for one input file.
///
/// - `exact`: original header -> column index
/// - `folded`: lowercased header -> original header
///
/// Duplicate headers resolve to the *last* occurrence in both maps, so
/// `["borough", "BOROUGH"]` answers `Borough` from the second column.
#[derive(Debug, Default)]
pub struct HeaderMap {
    exact: HashMap<String, usize>,
    folded: HashMap<String, String>,
}

impl HeaderMap {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = HeaderMap::default();
        for (idx, h) in headers.into_iter().enumerate() {
            let h = h.as_ref();
            map.exact.insert(h.to_string(), idx);
            map.folded.insert(h.to_lowercase(), h.to_string());
        }
        map
    }

    /// Column index for `name`: exact header first, then case-insensitive.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        if let Some(&idx) = self.exact.get(name) {
            return Some(idx);
        }
        self.folded
            .get(&name.to_lowercase())
            .and_then(|orig| self.exact.get(orig))
            .copied()
    }

    /// Resolve every canonical column, in canonical order.
    pub fn canonical_indices(&self) -> [Option<usize>; 10] {
        CANONICAL_HEADERS.map(|name| self.resolve(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_beats_folded() {
        // "BOROUGH" comes last so it owns the folded slot, but the exact
        // header still wins for the canonical name.
        let map = HeaderMap::new(["Borough", "BOROUGH"]);
        assert_eq!(map.resolve("Borough"), Some(0));
        assert_eq!(map.resolve("borough"), Some(1));
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let map = HeaderMap::new(["CREATED DATE", "complaint type"]);
        assert_eq!(map.resolve("Created Date"), Some(0));
        assert_eq!(map.resolve("Complaint Type"), Some(1));
        assert_eq!(map.resolve("Borough"), None);
    }

    #[test]
    fn test_duplicates_last_wins() {
        let map = HeaderMap::new(["status", "Borough", "STATUS"]);
        assert_eq!(map.resolve("Status"), Some(2));

        let map = HeaderMap::new(["Status", "x", "Status"]);
        assert_eq!(map.resolve("Status"), Some(2));
    }

    #[test]
    fn test_canonical_indices_order() {
        let map = HeaderMap::new(["Longitude", "Unique Key", "created date"]);
        let idx = map.canonical_indices();
        assert_eq!(idx[0], Some(2));
        assert_eq!(idx[9], Some(0));
        assert!(idx[1..9].iter().all(Option::is_none));
    }
}
