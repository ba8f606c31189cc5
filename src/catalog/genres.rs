//! Genre classification.
//!
//! Google Books categories ("Fiction / Science Fiction / General") and
//! OpenLibrary subjects ("Space warfare", "series:Dune") are noisy. This
//! module maps them onto a fixed vocabulary of curated genres by
//! case-insensitive substring matching against a static pattern table.

use std::collections::HashSet;

/// Maximum number of genres kept per book.
pub const MAX_GENRES: usize = 5;

/// The curated genre vocabulary.
pub const CURATED_GENRES: [&str; 34] = [
    "Fiction",
    "Literary Fiction",
    "Science Fiction",
    "Fantasy",
    "Mystery",
    "Thriller",
    "Horror",
    "Romance",
    "Historical Fiction",
    "Young Adult",
    "Children's",
    "Graphic Novels",
    "Poetry",
    "Drama",
    "Classics",
    "Biography",
    "Memoir",
    "History",
    "Science",
    "Technology",
    "Business",
    "Self-Help",
    "Psychology",
    "Philosophy",
    "Religion",
    "Politics",
    "Travel",
    "Cooking",
    "Art",
    "Music",
    "Health & Fitness",
    "True Crime",
    "Humor",
    "Nature",
];

/// Lowercase pattern → curated genre. A pattern must start on a word
/// boundary but may end mid-word (`poem` matches "poems").
/// Order is significant: within one input string, genres are emitted in
/// table order.
const GENRE_PATTERNS: &[(&str, &str)] = &[
    // Speculative
    ("fiction / science fiction", "Science Fiction"),
    ("science fiction", "Science Fiction"),
    ("sci-fi", "Science Fiction"),
    ("space opera", "Science Fiction"),
    ("dystopia", "Science Fiction"),
    ("cyberpunk", "Science Fiction"),
    ("fiction / fantasy", "Fantasy"),
    ("fantasy", "Fantasy"),
    ("magic", "Fantasy"),
    ("dragons", "Fantasy"),
    ("wizards", "Fantasy"),
    ("fiction / horror", "Horror"),
    ("horror", "Horror"),
    ("ghost stories", "Horror"),
    ("vampires", "Horror"),
    // Crime and suspense
    ("fiction / mystery", "Mystery"),
    ("mystery", "Mystery"),
    ("detective", "Mystery"),
    ("crime fiction", "Mystery"),
    ("fiction / thrillers", "Thriller"),
    ("thriller", "Thriller"),
    ("suspense", "Thriller"),
    ("espionage", "Thriller"),
    ("true crime", "True Crime"),
    ("murder -- case studies", "True Crime"),
    // Other fiction
    ("fiction / romance", "Romance"),
    ("romance", "Romance"),
    ("love stories", "Romance"),
    ("fiction / historical", "Historical Fiction"),
    ("historical fiction", "Historical Fiction"),
    ("fiction / literary", "Literary Fiction"),
    ("literary fiction", "Literary Fiction"),
    ("fiction / classics", "Classics"),
    ("classic literature", "Classics"),
    ("classics", "Classics"),
    ("fiction / general", "Fiction"),
    ("general fiction", "Fiction"),
    ("fiction in english", "Fiction"),
    ("american fiction", "Fiction"),
    ("english fiction", "Fiction"),
    ("young adult", "Young Adult"),
    ("teen", "Young Adult"),
    ("juvenile fiction", "Children's"),
    ("juvenile nonfiction", "Children's"),
    ("children's", "Children's"),
    ("picture books", "Children's"),
    ("comics & graphic novels", "Graphic Novels"),
    ("graphic novel", "Graphic Novels"),
    ("comic books", "Graphic Novels"),
    ("manga", "Graphic Novels"),
    ("poetry", "Poetry"),
    ("poems", "Poetry"),
    ("drama", "Drama"),
    ("plays", "Drama"),
    ("humor", "Humor"),
    ("humour", "Humor"),
    ("satire", "Humor"),
    // Nonfiction
    ("biography & autobiography", "Biography"),
    ("biography", "Biography"),
    ("memoir", "Memoir"),
    ("autobiography", "Memoir"),
    ("history", "History"),
    ("science / ", "Science"),
    ("physics", "Science"),
    ("biology", "Science"),
    ("chemistry", "Science"),
    ("astronomy", "Science"),
    ("mathematics", "Science"),
    ("computers", "Technology"),
    ("technology", "Technology"),
    ("programming", "Technology"),
    ("engineering", "Technology"),
    ("business & economics", "Business"),
    ("business", "Business"),
    ("economics", "Business"),
    ("management", "Business"),
    ("self-help", "Self-Help"),
    ("self help", "Self-Help"),
    ("personal growth", "Self-Help"),
    ("psychology", "Psychology"),
    ("philosophy", "Philosophy"),
    ("religion", "Religion"),
    ("christianity", "Religion"),
    ("spirituality", "Religion"),
    ("political science", "Politics"),
    ("politics", "Politics"),
    ("travel", "Travel"),
    ("cooking", "Cooking"),
    ("cookbooks", "Cooking"),
    ("recipes", "Cooking"),
    ("art / ", "Art"),
    ("painting", "Art"),
    ("photography", "Art"),
    ("music", "Music"),
    ("health & fitness", "Health & Fitness"),
    ("nutrition", "Health & Fitness"),
    ("exercise", "Health & Fitness"),
    ("nature", "Nature"),
    ("natural history", "Nature"),
    ("animals", "Nature"),
];

/// Priority used to pick a single display genre, most specific first.
const PRIMARY_PRIORITY: &[&str] = &[
    "Science Fiction",
    "Fantasy",
    "Mystery",
    "Thriller",
    "Horror",
    "Romance",
    "Historical Fiction",
    "Graphic Novels",
    "Young Adult",
    "Children's",
    "True Crime",
    "Literary Fiction",
    "Classics",
    "Poetry",
    "Drama",
    "Biography",
    "Memoir",
    "History",
    "Science",
    "Technology",
    "Business",
    "Psychology",
    "Philosophy",
    "Religion",
    "Politics",
    "Self-Help",
    "Health & Fitness",
    "Cooking",
    "Travel",
    "Art",
    "Music",
    "Nature",
    "Humor",
    "Fiction",
];

/// Map provider categories and subjects onto curated genres.
///
/// Categories are scanned before subjects. The result holds no duplicates
/// and at most [`MAX_GENRES`] entries, in first-seen order.
pub fn classify_genres<C, S>(categories: &[C], subjects: &[S]) -> Vec<String>
where
    C: AsRef<str>,
    S: AsRef<str>,
{
    let inputs = categories
        .iter()
        .map(AsRef::as_ref)
        .chain(subjects.iter().map(AsRef::as_ref));

    let mut seen = HashSet::new();
    let mut genres = Vec::new();

    for input in inputs {
        let lowered = input.to_lowercase();
        for (pattern, genre) in GENRE_PATTERNS {
            if matches_at_word_start(&lowered, pattern) && seen.insert(*genre) {
                genres.push(genre.to_string());
                if genres.len() == MAX_GENRES {
                    return genres;
                }
            }
        }
    }
    genres
}

fn matches_at_word_start(haystack: &str, pattern: &str) -> bool {
    haystack.match_indices(pattern).any(|(at, _)| {
        haystack[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

/// Pick the genre to display for a classified set.
pub fn primary_genre<S: AsRef<str>>(genres: &[S]) -> Option<&str> {
    PRIMARY_PRIORITY
        .iter()
        .find_map(|candidate| {
            genres
                .iter()
                .map(AsRef::as_ref)
                .find(|g| g == candidate)
        })
        .or_else(|| genres.first().map(AsRef::as_ref))
}

/// Whether `label` belongs to the curated vocabulary.
pub fn is_curated(label: &str) -> bool {
    CURATED_GENRES.contains(&label)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: &[&str] = &[];

    #[test]
    fn patterns_only_produce_curated_genres() {
        for (pattern, genre) in GENRE_PATTERNS {
            assert!(is_curated(genre), "{genre} is not curated");
            assert_eq!(*pattern, pattern.to_lowercase());
        }
        for genre in PRIMARY_PRIORITY {
            assert!(is_curated(genre));
        }
        assert_eq!(PRIMARY_PRIORITY.len(), CURATED_GENRES.len());
    }

    #[test]
    fn google_category_maps_case_insensitively() {
        let genres = classify_genres(&["FICTION / Science Fiction / Space Opera"], NONE);
        assert_eq!(genres, vec!["Science Fiction"]);
    }

    #[test]
    fn deduplicates_across_categories_and_subjects() {
        let genres = classify_genres(
            &["Fiction / Fantasy / Epic"],
            &["Fantasy fiction", "Magic", "Dragons"],
        );
        assert_eq!(genres, vec!["Fantasy"]);
    }

    #[test]
    fn caps_at_five_in_first_seen_order() {
        let genres = classify_genres(
            &["Fiction / Mystery & Detective"],
            &[
                "Science fiction",
                "Horror tales",
                "Love stories",
                "History",
                "Cooking",
                "Travel",
            ],
        );
        assert_eq!(
            genres,
            vec!["Mystery", "Science Fiction", "Horror", "Romance", "History"]
        );
    }

    #[test]
    fn patterns_do_not_match_inside_words() {
        assert_eq!(
            classify_genres(NONE, &["Great Britain -- History -- Nineteenth century"]),
            vec!["History"]
        );
        assert!(classify_genres(NONE, &["Computer displays", "Canteens"]).is_empty());
        assert!(classify_genres(NONE, &["Prehistory"]).is_empty());
    }

    #[test]
    fn short_patterns_still_match_whole_words() {
        assert_eq!(classify_genres(NONE, &["Teen fiction"]), vec!["Young Adult"]);
        assert_eq!(classify_genres(NONE, &["English drama", "Plays"]), vec!["Drama"]);
        assert_eq!(classify_genres(&["Poems"], NONE), vec!["Poetry"]);
    }

    #[test]
    fn unknown_inputs_yield_nothing() {
        assert!(classify_genres(&["Zzz"], &["series:Foo"]).is_empty());
        assert!(classify_genres(NONE, NONE).is_empty());
    }

    #[test]
    fn primary_genre_uses_priority() {
        assert_eq!(primary_genre(&["History", "Fantasy"]), Some("Fantasy"));
        assert_eq!(primary_genre(&["Fiction", "Classics"]), Some("Classics"));
        assert_eq!(primary_genre(&["Not A Genre"]), Some("Not A Genre"));
        assert_eq!(primary_genre::<&str>(&[]), None);
    }
}
