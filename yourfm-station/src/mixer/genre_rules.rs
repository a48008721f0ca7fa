//! Genre compatibility rules
//!
//! A station genre resolves to one or more genre families; each family names
//! genre substrings that do not belong on such a station. Candidate artists
//! whose genres hit that blocklist are kept off the discovery pool, except
//! when any of their genres overlaps what the user selected: explicit
//! selection always wins.
//!
//! All comparisons are case-insensitive substring matches in either
//! direction, after folding `-` and `_` to spaces (`hip-hop` == `hip hop`).

/// Lowercase, trim, and fold separators so catalog tags and user labels compare
pub fn normalize_genre(genre: &str) -> String {
    genre
        .trim()
        .to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Either string contains the other; empty strings never match
pub fn substring_match(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}

fn normalize_all<S: AsRef<str>>(genres: &[S]) -> Vec<String> {
    genres
        .iter()
        .map(|g| normalize_genre(g.as_ref()))
        .filter(|g| !g.is_empty())
        .collect()
}

/// Whether any candidate genre substring-matches any target genre
///
/// A candidate with no reported genres cannot be proven incompatible and
/// counts as overlapping.
pub fn genre_overlaps<S: AsRef<str>, T: AsRef<str>>(candidate: &[S], targets: &[T]) -> bool {
    let candidate = normalize_all(candidate);
    if candidate.is_empty() {
        return true;
    }
    let targets = normalize_all(targets);
    candidate
        .iter()
        .any(|c| targets.iter().any(|t| substring_match(c, t)))
}

/// A coarse genre grouping and the genres incompatible with it
#[derive(Debug, Clone, PartialEq)]
pub struct GenreFamily {
    pub name: String,
    /// Substrings that place a station genre in this family
    pub keys: Vec<String>,
    /// Genre substrings that must not appear on this family's stations
    pub blocked: Vec<String>,
}

impl GenreFamily {
    pub fn new(name: &str, keys: &[&str], blocked: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keys: keys.iter().map(|k| normalize_genre(k)).collect(),
            blocked: blocked.iter().map(|b| normalize_genre(b)).collect(),
        }
    }

    /// Station genre (normalized) belongs to this family
    fn matches(&self, station_genre: &str) -> bool {
        self.keys.iter().any(|k| substring_match(k, station_genre))
    }
}

/// Family table used by the blocklist filter
#[derive(Debug, Clone, PartialEq)]
pub struct GenreRules {
    families: Vec<GenreFamily>,
}

impl Default for GenreRules {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GenreRules {
    pub fn new(families: Vec<GenreFamily>) -> Self {
        Self { families }
    }

    /// Built-in family table
    pub fn builtin() -> Self {
        Self::new(vec![
            GenreFamily::new(
                "rock",
                &["rock", "punk", "grunge"],
                &[
                    "hip hop", "rap", "trap", "reggaeton", "latin", "k pop", "country", "edm",
                    "house", "techno", "dancehall", "r&b", "urbano",
                ],
            ),
            GenreFamily::new(
                "metal",
                &["metal", "djent", "thrash", "doom"],
                &[
                    "pop", "hip hop", "rap", "trap", "reggaeton", "latin", "country", "r&b",
                    "soul", "funk", "edm", "house", "dance", "dancehall", "urbano", "disco",
                ],
            ),
            GenreFamily::new(
                "hip-hop",
                &["hip hop", "rap", "trap", "drill", "grime"],
                &[
                    "metal", "country", "bluegrass", "classical", "punk", "hardcore", "folk",
                    "emo",
                ],
            ),
            GenreFamily::new(
                "pop",
                &["pop"],
                &[
                    "metal", "hardcore", "death", "grindcore", "thrash", "noise", "deathcore",
                ],
            ),
            GenreFamily::new(
                "country",
                &["country", "americana", "bluegrass"],
                &[
                    "metal", "hip hop", "rap", "trap", "techno", "edm", "house", "reggaeton",
                    "k pop", "drill", "dubstep",
                ],
            ),
            GenreFamily::new(
                "electronic",
                &["electronic", "edm", "house", "techno", "trance", "dance", "dubstep"],
                &["country", "bluegrass", "metal", "folk", "americana", "gospel"],
            ),
            GenreFamily::new(
                "jazz",
                &["jazz", "bebop", "swing"],
                &["metal", "trap", "reggaeton", "edm", "hardcore", "drill", "dubstep"],
            ),
            GenreFamily::new(
                "classical",
                &["classical", "orchestra", "baroque", "opera"],
                &[
                    "metal", "hip hop", "rap", "trap", "punk", "reggaeton", "edm", "drill",
                    "dubstep",
                ],
            ),
            GenreFamily::new(
                "folk",
                &["folk", "singer songwriter", "acoustic"],
                &["metal", "trap", "edm", "reggaeton", "techno", "drill", "dubstep"],
            ),
            GenreFamily::new(
                "latin",
                &["latin", "reggaeton", "salsa", "bachata", "cumbia"],
                &["metal", "country", "bluegrass", "hardcore", "punk"],
            ),
            GenreFamily::new(
                "r&b",
                &["r&b", "r n b", "rnb", "soul", "funk"],
                &["metal", "hardcore", "punk", "country", "bluegrass", "grindcore"],
            ),
        ])
    }

    pub fn families(&self) -> &[GenreFamily] {
        &self.families
    }

    /// Names of the families a station genre resolves to
    pub fn families_for(&self, station_genre: &str) -> Vec<&str> {
        let genre = normalize_genre(station_genre);
        self.families
            .iter()
            .filter(|f| f.matches(&genre))
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Union of the blocked lists of every family the station resolves to,
    /// minus entries that themselves match a station genre
    pub fn blocked_set<S: AsRef<str>>(&self, station_genres: &[S]) -> Vec<String> {
        let station = normalize_all(station_genres);
        let mut blocked: Vec<String> = Vec::new();

        for genre in &station {
            for family in self.families.iter().filter(|f| f.matches(genre)) {
                for entry in &family.blocked {
                    if !blocked.contains(entry) {
                        blocked.push(entry.clone());
                    }
                }
            }
        }

        blocked.retain(|entry| !station.iter().any(|s| substring_match(entry, s)));
        blocked
    }

    /// First candidate genre that the station blocks, if any
    pub fn blocking_genre<S: AsRef<str>, T: AsRef<str>>(
        &self,
        candidate_genres: &[S],
        station_genres: &[T],
    ) -> Option<String> {
        let candidate = normalize_all(candidate_genres);
        if candidate.is_empty() {
            return None;
        }

        let station = normalize_all(station_genres);
        let selected = candidate
            .iter()
            .any(|c| station.iter().any(|s| substring_match(c, s)));
        if selected {
            return None;
        }

        let blocked = self.blocked_set(&station);
        candidate
            .into_iter()
            .find(|c| blocked.iter().any(|b| substring_match(c, b)))
    }

    pub fn is_blocked<S: AsRef<str>, T: AsRef<str>>(
        &self,
        candidate_genres: &[S],
        station_genres: &[T],
    ) -> bool {
        self.blocking_genre(candidate_genres, station_genres).is_some()
    }
}
