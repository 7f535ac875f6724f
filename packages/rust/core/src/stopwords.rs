//! Stopword sets for relevance preprocessing.

use std::collections::HashSet;
use std::path::Path;

use askweb_shared::{AskWebError, Result};

/// Standard English stopword list (179 words).
const ENGLISH: [&str; 179] = [
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves",
    "you", "you're", "you've", "you'll", "you'd", "your", "yours", "yourself",
    "yourselves", "he", "him", "his", "himself", "she", "she's", "her",
    "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this",
    "that", "that'll", "these", "those", "am", "is", "are", "was",
    "were", "be", "been", "being", "have", "has", "had", "having",
    "do", "does", "did", "doing", "a", "an", "the", "and",
    "but", "if", "or", "because", "as", "until", "while", "of",
    "at", "by", "for", "with", "about", "against", "between", "into",
    "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under",
    "again", "further", "then", "once", "here", "there", "when", "where",
    "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only",
    "own", "same", "so", "than", "too", "very", "s", "t",
    "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain",
    "aren", "aren't", "couldn", "couldn't", "didn", "didn't", "doesn", "doesn't",
    "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn", "isn't",
    "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won",
    "won't", "wouldn", "wouldn't",
];

/// A lowercase stopword set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stopwords(HashSet<String>);

impl Stopwords {
    pub fn english() -> Self {
        Self(ENGLISH.iter().map(|w| (*w).to_string()).collect())
    }

    /// Load one word per line. Blank lines and `#` comments are ignored.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AskWebError::io(path, e))?;
        let words: HashSet<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_lowercase)
            .collect();

        if words.is_empty() {
            return Err(AskWebError::config(format!(
                "stopword file {} contains no words",
                path.display()
            )));
        }
        Ok(Self(words))
    }

    /// Use the file at `path` if given, the English list otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::english()),
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_list() {
        let sw = Stopwords::english();
        assert_eq!(sw.len(), 179);
        assert!(sw.contains("the"));
        assert!(sw.contains("wouldn't"));
        assert!(!sw.contains("photosynthesis"));
    }

    #[test]
    fn from_file_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stop.txt");
        std::fs::write(&path, "# custom list\nThe\n\n  plant \n").unwrap();

        let sw = Stopwords::from_file(&path).unwrap();
        assert_eq!(sw.len(), 2);
        assert!(sw.contains("the"));
        assert!(sw.contains("plant"));
    }

    #[test]
    fn empty_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stop.txt");
        std::fs::write(&path, "# nothing here\n").unwrap();

        assert!(matches!(
            Stopwords::from_file(&path).unwrap_err(),
            AskWebError::Config { .. }
        ));
    }

    #[test]
    fn load_defaults_to_english() {
        assert_eq!(Stopwords::load(None).unwrap(), Stopwords::english());
    }
}
